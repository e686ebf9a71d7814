//! Per-frame character movement math.
//!
//! Everything here is pure arithmetic over `glam` vectors so the two
//! controller variants can be exercised without a window, a GPU, or a
//! physics world. The client crate feeds these functions input state and
//! writes the results into rapier bodies and ECS transforms.

use glam::{Vec2, Vec3};

/// Grounded test slack above the controller's rest height.
pub const GROUND_EPSILON: f32 = 0.01;

/// Pitch clamp for the orbit camera, in radians.
pub const PITCH_LIMIT: f32 = 1.2;

/// Horizontal velocity smoothing factor for the dynamic controller.
pub const VELOCITY_LERP: f32 = 0.2;

/// Heading smoothing factor for the dynamic controller.
pub const HEADING_LERP: f32 = 0.2;

/// The dynamic controller's speed is expressed in per-frame units and
/// normalized to a 60 Hz reference frame rate.
const FRAME_RATE_REFERENCE: f32 = 60.0;

/// Horizontal basis vectors for a given yaw: `forward` points along the
/// look direction projected to the ground plane, `right` is 90 degrees
/// clockwise from it. Both are unit length for any yaw.
pub fn heading_basis(yaw: f32) -> (Vec3, Vec3) {
    let forward = Vec3::new(yaw.sin(), 0.0, yaw.cos());
    let right = Vec3::new(
        (yaw + std::f32::consts::FRAC_PI_2).sin(),
        0.0,
        (yaw + std::f32::consts::FRAC_PI_2).cos(),
    );
    (forward, right)
}

/// World-space movement direction from a 2D input axis (x = strafe,
/// y = forward) and the camera yaw. Returns `Vec3::ZERO` when the axis is
/// zero; never normalizes a zero-length vector.
pub fn move_direction(axis: Vec2, yaw: f32) -> Vec3 {
    let (forward, right) = heading_basis(yaw);
    let combined = forward * axis.y + right * axis.x;
    if combined.length_squared() > 0.0 {
        combined.normalize()
    } else {
        Vec3::ZERO
    }
}

/// Facing angle for a non-zero movement direction.
pub fn facing_from(move_dir: Vec3) -> f32 {
    move_dir.x.atan2(move_dir.z)
}

/// Clamp a look pitch to the orbit camera's range.
pub fn clamp_pitch(pitch: f32) -> f32 {
    pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT)
}

/// Lerp the horizontal components of `current` toward `target`, keeping
/// the vertical component untouched.
pub fn smooth_horizontal(current: Vec3, target: Vec3, factor: f32) -> Vec3 {
    Vec3::new(
        current.x + (target.x - current.x) * factor,
        current.y,
        current.z + (target.z - current.z) * factor,
    )
}

/// Move `current` a fraction of the way toward `target`, taking the short
/// way around the circle.
pub fn approach_angle(current: f32, target: f32, factor: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let mut delta = (target - current) % TAU;
    if delta > PI {
        delta -= TAU;
    }
    if delta < -PI {
        delta += TAU;
    }
    current + delta * factor
}

/// What a kinematic controller step wants applied to the body.
#[derive(Debug, Clone, Copy)]
pub struct KinematicStep {
    /// Desired displacement for this frame, to be resolved against
    /// collisions by the physics world.
    pub displacement: Vec3,
    /// New facing for the visual root, present only when there was input.
    pub heading: Option<f32>,
}

/// Variant 1: collision-aware kinematic movement with manual gravity.
///
/// The grounded test compares the body's height against the rest height
/// plus [`GROUND_EPSILON`] rather than using contact detection. Good
/// enough for a flat demo ground, wrong on slopes.
#[derive(Debug, Clone)]
pub struct KinematicController {
    pub speed: f32,
    pub sprint_multiplier: f32,
    pub gravity: f32,
    pub jump_force: f32,
    /// Height of the collider center when resting on flat ground.
    pub rest_height: f32,
    pub velocity_y: f32,
    pub grounded: bool,
}

impl Default for KinematicController {
    fn default() -> Self {
        Self {
            speed: 5.0,
            sprint_multiplier: 1.8,
            gravity: -20.0,
            jump_force: 8.0,
            rest_height: 1.0,
            velocity_y: 0.0,
            grounded: false,
        }
    }
}

impl KinematicController {
    /// Advance one frame. `position_y` is the body's current height,
    /// `jump_held` whether the jump key is down this frame.
    pub fn step(
        &mut self,
        axis: Vec2,
        yaw: f32,
        jump_held: bool,
        sprint_held: bool,
        position_y: f32,
        dt: f32,
    ) -> KinematicStep {
        let dir = move_direction(axis, yaw);

        self.velocity_y += self.gravity * dt;
        self.grounded = position_y <= self.rest_height + GROUND_EPSILON;
        if self.grounded {
            self.velocity_y = 0.0;
            if jump_held {
                self.velocity_y = self.jump_force;
            }
        }

        let speed = if sprint_held {
            self.speed * self.sprint_multiplier
        } else {
            self.speed
        };

        let mut displacement = dir * speed * dt;
        displacement.y = self.velocity_y * dt;

        let heading = (dir != Vec3::ZERO).then(|| facing_from(dir));

        KinematicStep {
            displacement,
            heading,
        }
    }
}

/// What a dynamic controller step wants applied to the rigid body.
#[derive(Debug, Clone, Copy)]
pub struct DynamicStep {
    /// New linear velocity, vertical component preserved from the body.
    pub velocity: Vec3,
    /// Apply the jump impulse this frame.
    pub jump: bool,
    /// Smoothed body yaw.
    pub heading: f32,
}

/// Variant 2: a dynamic rigid body steered by velocity smoothing.
///
/// Jumping is gated by `can_jump`, which re-arms whenever the body drops
/// below `rearm_height` — a positional stand-in for contact detection,
/// same caveat as the kinematic grounded test.
#[derive(Debug, Clone)]
pub struct DynamicController {
    /// Per-frame speed, scaled by the 60 Hz reference rate.
    pub speed: f32,
    pub jump_impulse: f32,
    pub rearm_height: f32,
    pub can_jump: bool,
    pub heading: f32,
}

impl Default for DynamicController {
    fn default() -> Self {
        Self {
            speed: 0.1,
            jump_impulse: 6.0,
            rearm_height: 2.05,
            can_jump: false,
            heading: 0.0,
        }
    }
}

impl DynamicController {
    /// Advance one frame given the body's current state. `jump_pressed`
    /// must be an edge, not a level, or a held key would consume the
    /// re-armed jump instantly.
    pub fn step(
        &mut self,
        axis: Vec2,
        yaw: f32,
        jump_pressed: bool,
        current_velocity: Vec3,
        position_y: f32,
    ) -> DynamicStep {
        if position_y <= self.rearm_height {
            self.can_jump = true;
        }

        let dir = move_direction(axis, yaw);
        let target = dir * self.speed * FRAME_RATE_REFERENCE;
        let velocity = smooth_horizontal(current_velocity, target, VELOCITY_LERP);

        let jump = jump_pressed && self.can_jump;
        if jump {
            self.can_jump = false;
        }

        if dir != Vec3::ZERO {
            self.heading = approach_angle(self.heading, facing_from(dir), HEADING_LERP);
        }

        DynamicStep {
            velocity,
            jump,
            heading: self.heading,
        }
    }
}

/// Cosmetic limb swing angles, a stateless function of elapsed time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimbSwing {
    pub arm: f32,
    pub leg: f32,
}

const SWING_FREQUENCY: f32 = 8.0;
const ARM_AMPLITUDE: f32 = 0.6;
const LEG_AMPLITUDE: f32 = 0.8;

/// Swing angles at time `t` seconds. Idle characters hold their limbs
/// still.
pub fn limb_swing(t: f32, moving: bool) -> LimbSwing {
    if !moving {
        return LimbSwing { arm: 0.0, leg: 0.0 };
    }
    let phase = (t * SWING_FREQUENCY).sin();
    LimbSwing {
        arm: phase * ARM_AMPLITUDE,
        leg: phase * LEG_AMPLITUDE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI, TAU};

    #[test]
    fn test_basis_orthonormal_over_yaw_range() {
        for i in 0..64 {
            let yaw = TAU * i as f32 / 64.0;
            let (forward, right) = heading_basis(yaw);
            assert!((forward.length() - 1.0).abs() < 1e-5, "yaw={}", yaw);
            assert!((right.length() - 1.0).abs() < 1e-5, "yaw={}", yaw);
            assert!(forward.dot(right).abs() < 1e-5, "yaw={}", yaw);
        }
    }

    #[test]
    fn test_forward_at_zero_yaw_is_plus_z() {
        let dir = move_direction(Vec2::new(0.0, 1.0), 0.0);
        assert!((dir - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn test_no_input_means_zero_move_and_no_heading() {
        let dir = move_direction(Vec2::ZERO, 1.3);
        assert_eq!(dir, Vec3::ZERO);
        assert!(!dir.x.is_nan() && !dir.z.is_nan());

        let mut cc = KinematicController::default();
        let step = cc.step(Vec2::ZERO, 0.7, false, false, 1.0, 1.0 / 60.0);
        assert_eq!(step.heading, None);
        assert_eq!(step.displacement.x, 0.0);
        assert_eq!(step.displacement.z, 0.0);
    }

    #[test]
    fn test_diagonal_input_is_normalized() {
        let dir = move_direction(Vec2::new(1.0, 1.0), 0.0);
        assert!((dir.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_grounded_jump_sets_exact_jump_force() {
        let mut cc = KinematicController::default();
        let dt = 1.0 / 60.0;
        cc.step(Vec2::ZERO, 0.0, true, false, 1.0, dt);
        assert_eq!(cc.velocity_y, cc.jump_force);
        assert!(cc.grounded);
    }

    #[test]
    fn test_airborne_velocity_decreases_by_gravity_each_frame() {
        let mut cc = KinematicController {
            velocity_y: 4.0,
            ..Default::default()
        };
        let dt = 1.0 / 60.0;
        cc.step(Vec2::ZERO, 0.0, false, false, 5.0, dt);
        assert!((cc.velocity_y - (4.0 + cc.gravity * dt)).abs() < 1e-6);
        assert!(!cc.grounded);

        let before = cc.velocity_y;
        cc.step(Vec2::ZERO, 0.0, false, false, 5.0, dt);
        assert!((cc.velocity_y - (before + cc.gravity * dt)).abs() < 1e-6);
    }

    #[test]
    fn test_grounded_within_epsilon_threshold() {
        let mut cc = KinematicController::default();
        let dt = 1.0 / 60.0;
        cc.step(Vec2::ZERO, 0.0, false, false, 1.009, dt);
        assert!(cc.grounded);
        cc.step(Vec2::ZERO, 0.0, false, false, 1.02, dt);
        assert!(!cc.grounded);
    }

    #[test]
    fn test_kinematic_heading_faces_movement() {
        let mut cc = KinematicController::default();
        let step = cc.step(Vec2::new(0.0, 1.0), 0.0, false, false, 1.0, 1.0 / 60.0);
        let heading = step.heading.unwrap();
        // Forward along +z at yaw 0 -> atan2(0, 1) = 0
        assert!(heading.abs() < 1e-6);
    }

    #[test]
    fn test_pitch_clamps_exactly_at_limit() {
        let mut pitch = 0.0;
        for _ in 0..2000 {
            pitch = clamp_pitch(pitch + 0.01);
        }
        assert_eq!(pitch, PITCH_LIMIT);
        for _ in 0..4000 {
            pitch = clamp_pitch(pitch - 0.01);
        }
        assert_eq!(pitch, -PITCH_LIMIT);
    }

    #[test]
    fn test_velocity_smoothing_single_step() {
        let vel = smooth_horizontal(Vec3::ZERO, Vec3::new(6.0, 0.0, 0.0), VELOCITY_LERP);
        assert!((vel - Vec3::new(1.2, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_smoothing_preserves_vertical_velocity() {
        let current = Vec3::new(0.0, -3.5, 0.0);
        let vel = smooth_horizontal(current, Vec3::new(6.0, 0.0, 6.0), VELOCITY_LERP);
        assert_eq!(vel.y, -3.5);
    }

    #[test]
    fn test_approach_angle_takes_short_way_around() {
        // From just below +pi to just above -pi: short way crosses the seam.
        let next = approach_angle(PI - 0.1, -PI + 0.1, 1.0);
        assert!((facing_delta(next, -PI + 0.1)).abs() < 1e-5);

        let halfway = approach_angle(0.0, FRAC_PI_2, 0.5);
        assert!((halfway - FRAC_PI_2 * 0.5).abs() < 1e-6);
    }

    fn facing_delta(a: f32, b: f32) -> f32 {
        let mut d = (a - b) % TAU;
        if d > PI {
            d -= TAU;
        }
        if d < -PI {
            d += TAU;
        }
        d
    }

    #[test]
    fn test_dynamic_jump_gating() {
        let mut dc = DynamicController::default();
        // Below the rearm height: jump fires and disarms.
        let step = dc.step(Vec2::ZERO, 0.0, true, Vec3::ZERO, 2.0);
        assert!(step.jump);
        assert!(!dc.can_jump);

        // Airborne above the rearm height: pressing jump does nothing.
        let step = dc.step(Vec2::ZERO, 0.0, true, Vec3::ZERO, 3.0);
        assert!(!step.jump);

        // Back below: re-armed.
        let step = dc.step(Vec2::ZERO, 0.0, true, Vec3::ZERO, 2.04);
        assert!(step.jump);
    }

    #[test]
    fn test_dynamic_target_velocity_is_frame_rate_normalized() {
        let mut dc = DynamicController {
            speed: 0.1,
            ..Default::default()
        };
        // speed 0.1 * 60 = 6 m/s target; one smoothing step from rest.
        let step = dc.step(Vec2::new(0.0, 1.0), 0.0, false, Vec3::ZERO, 1.0);
        assert!((step.velocity.z - 1.2).abs() < 1e-5);
        assert!(step.velocity.x.abs() < 1e-5);
    }

    #[test]
    fn test_limb_swing_idle_is_zero() {
        assert_eq!(limb_swing(12.34, false), LimbSwing { arm: 0.0, leg: 0.0 });
    }

    #[test]
    fn test_limb_swing_bounded() {
        for i in 0..200 {
            let s = limb_swing(i as f32 * 0.05, true);
            assert!(s.arm.abs() <= ARM_AMPLITUDE + 1e-6);
            assert!(s.leg.abs() <= LEG_AMPLITUDE + 1e-6);
        }
    }
}
