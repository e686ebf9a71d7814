use glam::{Mat4, Quat, Vec2, Vec3};
use wgpu::util::DeviceExt;

use manikin_core::controller::clamp_pitch;

use crate::scene::CameraRigMode;

const MOUSE_SENSITIVITY: f32 = 0.002;
const ORBIT_PIVOT_HEIGHT: f32 = 1.5;
const ORBIT_DISTANCE: f32 = 6.0;
const FOLLOW_OFFSET: Vec3 = Vec3::new(0.0, 6.0, -8.0);
const FOLLOW_FOCUS_HEIGHT: f32 = 1.0;

/// Look-around state accumulated from mouse deltas. In orbit mode the
/// rig is a pivot above the player with the camera six units back and
/// pitch clamped; in follow mode the camera keeps a fixed offset and
/// pitch accumulates unclamped.
#[derive(Debug, Clone)]
pub struct CameraRig {
    pub yaw: f32,
    pub pitch: f32,
    pub mode: CameraRigMode,
}

impl CameraRig {
    pub fn new(mode: CameraRigMode) -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            mode,
        }
    }

    /// Accumulate a pointer-motion delta.
    pub fn apply_look(&mut self, delta: Vec2) {
        self.yaw += delta.x * MOUSE_SENSITIVITY;
        self.pitch += delta.y * MOUSE_SENSITIVITY;
        if self.mode == CameraRigMode::Orbit {
            self.pitch = clamp_pitch(self.pitch);
        }
    }

    /// Eye position and focus point for the current player position.
    pub fn view(&self, player_position: Vec3) -> (Vec3, Vec3) {
        match self.mode {
            CameraRigMode::Orbit => {
                let pivot = player_position + Vec3::new(0.0, ORBIT_PIVOT_HEIGHT, 0.0);
                let rotation =
                    Quat::from_rotation_y(self.yaw) * Quat::from_rotation_x(self.pitch);
                let eye = pivot + rotation * Vec3::new(0.0, 0.0, -ORBIT_DISTANCE);
                (eye, pivot)
            }
            CameraRigMode::Follow => {
                let focus = player_position + Vec3::new(0.0, FOLLOW_FOCUS_HEIGHT, 0.0);
                let eye = player_position + Quat::from_rotation_y(self.yaw) * FOLLOW_OFFSET;
                (eye, focus)
            }
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_projection: [[f32; 4]; 4],
    pub position: [f32; 4],
    pub sun_direction: [f32; 4],
    pub ambient: [f32; 4],
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self {
            view_projection: Mat4::IDENTITY.to_cols_array_2d(),
            position: [0.0; 4],
            sun_direction: [-0.4, -0.8, -0.4, 0.0],
            ambient: [0.25, 0.25, 0.3, 0.0],
        }
    }
}

/// Manages the camera uniform buffer and bind group.
pub struct CameraState {
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraState {
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Camera Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let uniform = CameraUniform::default();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Uniform Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        CameraState {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Update the camera uniform for this frame.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        queue: &wgpu::Queue,
        eye: Vec3,
        focus: Vec3,
        fov_degrees: f32,
        near: f32,
        far: f32,
        viewport_width: u32,
        viewport_height: u32,
        sun_direction: Vec3,
        ambient: Vec3,
    ) {
        let view = Mat4::look_at_rh(eye, focus, Vec3::Y);
        let projection = Mat4::perspective_rh(
            fov_degrees.to_radians(),
            viewport_width as f32 / viewport_height.max(1) as f32,
            near,
            far,
        );
        let view_projection = projection * view;

        self.uniform = CameraUniform {
            view_projection: view_projection.to_cols_array_2d(),
            position: [eye.x, eye.y, eye.z, 1.0],
            sun_direction: [sun_direction.x, sun_direction.y, sun_direction.z, 0.0],
            ambient: [ambient.x, ambient.y, ambient.z, 0.0],
        };

        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manikin_core::controller::PITCH_LIMIT;

    #[test]
    fn test_orbit_pitch_clamps_exactly() {
        let mut rig = CameraRig::new(CameraRigMode::Orbit);
        // 2000 * 10px * 0.002 = 40 radians of raw motion
        for _ in 0..2000 {
            rig.apply_look(Vec2::new(0.0, 10.0));
        }
        assert_eq!(rig.pitch, PITCH_LIMIT);

        for _ in 0..4000 {
            rig.apply_look(Vec2::new(0.0, -10.0));
        }
        assert_eq!(rig.pitch, -PITCH_LIMIT);
    }

    #[test]
    fn test_follow_pitch_unclamped() {
        let mut rig = CameraRig::new(CameraRigMode::Follow);
        for _ in 0..2000 {
            rig.apply_look(Vec2::new(0.0, 10.0));
        }
        assert!(rig.pitch > PITCH_LIMIT);
    }

    #[test]
    fn test_orbit_eye_keeps_distance() {
        let mut rig = CameraRig::new(CameraRigMode::Orbit);
        rig.apply_look(Vec2::new(150.0, 40.0));
        let player = Vec3::new(3.0, 1.0, -2.0);
        let (eye, pivot) = rig.view(player);
        assert!(((eye - pivot).length() - ORBIT_DISTANCE).abs() < 1e-4);
        assert!((pivot - (player + Vec3::new(0.0, ORBIT_PIVOT_HEIGHT, 0.0))).length() < 1e-6);
    }

    #[test]
    fn test_yaw_orbits_the_eye() {
        let mut rig = CameraRig::new(CameraRigMode::Orbit);
        let (eye_before, _) = rig.view(Vec3::ZERO);
        rig.apply_look(Vec2::new(500.0, 0.0));
        let (eye_after, _) = rig.view(Vec3::ZERO);
        assert!((eye_before - eye_after).length() > 0.5);
    }

    #[test]
    fn test_follow_offset_is_fixed() {
        let rig = CameraRig::new(CameraRigMode::Follow);
        let (eye_a, _) = rig.view(Vec3::ZERO);
        let (eye_b, _) = rig.view(Vec3::new(10.0, 0.0, 5.0));
        let delta = eye_b - eye_a;
        assert!((delta - Vec3::new(10.0, 0.0, 5.0)).length() < 1e-5);
    }
}
