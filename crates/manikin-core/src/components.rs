use glam::{Mat4, Quat, Vec3};

/// Transform component. Present on every entity.
#[derive(Debug, Clone)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub world_matrix: Mat4,
    pub parent: Option<hecs::Entity>,
    pub dirty: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            world_matrix: Mat4::IDENTITY,
            parent: None,
            dirty: true,
        }
    }
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn child_of(parent: hecs::Entity, position: Vec3) -> Self {
        Self {
            position,
            parent: Some(parent),
            ..Default::default()
        }
    }
}

/// Newtype handle into the mesh cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub usize);

/// Identifies this entity as a mesh to render, with a flat color.
#[derive(Debug, Clone)]
pub struct MeshRenderer {
    pub mesh_handle: MeshHandle,
    pub color: [f32; 4],
}

/// Camera component.
#[derive(Debug, Clone)]
pub struct Camera {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub role: CameraRole,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CameraRole {
    Main,
    Other(String),
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 200.0,
            role: CameraRole::Main,
        }
    }
}

/// Player marker component. Yaw/pitch are the look angles driven by the
/// camera rig; height/radius describe the collider capsule.
#[derive(Debug, Clone)]
pub struct Player {
    pub yaw: f32,
    pub pitch: f32,
    pub height: f32,
    pub radius: f32,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            height: 2.0,
            radius: 0.5,
        }
    }
}

/// Visual-root marker: this node carries the character's facing, rotated
/// toward the movement heading independently of the collider.
#[derive(Debug, Clone, Default)]
pub struct Heading {
    pub yaw: f32,
}

/// Which body part a rig limb is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimbKind {
    Arm,
    Leg,
}

/// Cosmetic limb component. `side` is +1 for left, -1 for right so
/// opposite limbs swing in counter-phase.
#[derive(Debug, Clone)]
pub struct Limb {
    pub kind: LimbKind,
    pub side: f32,
}

/// Tag component storing the entity's scene id string.
#[derive(Debug, Clone)]
pub struct EntityId(pub String);

/// Tag component for searchable tags.
#[derive(Debug, Clone)]
pub struct Tags(pub Vec<String>);

/// Marker component: entity is hidden from rendering.
pub struct Hidden;
