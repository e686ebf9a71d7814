use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

#[derive(Debug)]
pub enum SceneError {
    IoError(std::io::Error),
    ParseError(serde_yaml::Error),
    InheritanceCycle(String),
    MissingParent(String),
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IoError(e) => write!(f, "IO error: {}", e),
            Self::ParseError(e) => write!(f, "YAML parse error: {}", e),
            Self::InheritanceCycle(id) => write!(f, "Inheritance cycle detected at entity '{}'", id),
            Self::MissingParent(id) => write!(f, "Entity extends missing parent '{}'", id),
        }
    }
}

// --- Serde types for the scene YAML schema ---

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SceneFile {
    pub name: String,
    #[serde(default)]
    pub settings: SceneSettings,
    #[serde(default)]
    pub entities: Vec<EntityDef>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SceneSettings {
    #[serde(default = "default_clear_color")]
    pub clear_color: [f32; 3],
    #[serde(default = "default_gravity")]
    pub gravity: [f32; 3],
    #[serde(default = "default_sun_direction")]
    pub sun_direction: [f32; 3],
    #[serde(default = "default_ambient")]
    pub ambient_light: [f32; 3],
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            clear_color: default_clear_color(),
            gravity: default_gravity(),
            sun_direction: default_sun_direction(),
            ambient_light: default_ambient(),
        }
    }
}

fn default_clear_color() -> [f32; 3] {
    [0.6, 0.8, 1.0]
}

fn default_gravity() -> [f32; 3] {
    [0.0, -9.81, 0.0]
}

fn default_sun_direction() -> [f32; 3] {
    [-1.0, -2.0, -1.0]
}

fn default_ambient() -> [f32; 3] {
    [0.25, 0.25, 0.3]
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EntityDef {
    pub id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub components: ComponentMap,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ComponentMap {
    #[serde(default)]
    pub transform: Option<TransformDef>,
    #[serde(default)]
    pub mesh_renderer: Option<MeshRendererDef>,
    #[serde(default)]
    pub camera: Option<CameraDef>,
    #[serde(default)]
    pub rigid_body: Option<RigidBodyDef>,
    #[serde(default)]
    pub collider: Option<ColliderDef>,
    #[serde(default)]
    pub character_controller: Option<CharacterControllerDef>,
    /// Absorbs unknown component types for forward compatibility.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransformDef {
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default)]
    pub rotation: [f32; 3],
    #[serde(default = "default_scale")]
    pub scale: [f32; 3],
    /// Scene id of the parent entity in the transform tree, if any.
    #[serde(default)]
    pub parent: Option<String>,
}

fn default_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

/// Procedural shape specifier for the mesh renderer and colliders.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeDef {
    Box { size: [f32; 3] },
    Sphere { diameter: f32 },
    Capsule { height: f32, radius: f32 },
    Ground { width: f32, depth: f32 },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MeshRendererDef {
    pub shape: ShapeDef,
    #[serde(default = "default_color")]
    pub color: [f32; 3],
}

fn default_color() -> [f32; 3] {
    [0.8, 0.8, 0.8]
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CameraDef {
    #[serde(default = "default_fov")]
    pub fov: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
}

fn default_fov() -> f32 {
    75.0
}
fn default_near() -> f32 {
    0.1
}
fn default_far() -> f32 {
    200.0
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RigidBodyDef {
    #[serde(default = "default_body_type")]
    pub body_type: String,
    #[serde(default = "default_mass")]
    pub mass: f32,
    #[serde(default)]
    pub restitution: f32,
    #[serde(default = "default_friction")]
    pub friction: f32,
}

fn default_body_type() -> String {
    "static".to_string()
}
fn default_mass() -> f32 {
    1.0
}
fn default_friction() -> f32 {
    0.5
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ColliderDef {
    pub shape: ShapeDef,
}

/// Which movement variant drives the player and how the camera rigs up.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CharacterControllerDef {
    #[serde(default = "default_mode")]
    pub mode: ControllerMode,
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
    #[serde(default = "default_sprint")]
    pub sprint_multiplier: f32,
    #[serde(default = "default_jump")]
    pub jump: f32,
    #[serde(default = "default_height")]
    pub height: f32,
    #[serde(default = "default_radius")]
    pub radius: f32,
    #[serde(default)]
    pub camera: CameraRigMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerMode {
    Kinematic,
    Dynamic,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraRigMode {
    /// Pivot above the player, pitch clamped, camera 6 units back.
    #[default]
    Orbit,
    /// Fixed offset from the player, no smoothing, pitch unclamped.
    Follow,
}

fn default_mode() -> ControllerMode {
    ControllerMode::Kinematic
}
fn default_move_speed() -> f32 {
    5.0
}
fn default_sprint() -> f32 {
    1.8
}
fn default_jump() -> f32 {
    8.0
}
fn default_height() -> f32 {
    2.0
}
fn default_radius() -> f32 {
    0.5
}

/// Load and parse a scene YAML file, resolving entity inheritance.
pub fn load_scene(path: &Path) -> Result<SceneFile, SceneError> {
    let contents = std::fs::read_to_string(path).map_err(SceneError::IoError)?;
    parse_scene(&contents)
}

/// Parse scene YAML from a string, resolving entity inheritance.
pub fn parse_scene(contents: &str) -> Result<SceneFile, SceneError> {
    let mut scene: SceneFile = serde_yaml::from_str(contents).map_err(SceneError::ParseError)?;
    scene.entities = resolve_inheritance(&scene.entities)?;
    Ok(scene)
}

/// Resolve `extends` references: walk each entity's inheritance chain
/// and merge ancestors in, nearest first. Child fields override parent
/// fields. Cycles and missing parents are errors.
fn resolve_inheritance(entities: &[EntityDef]) -> Result<Vec<EntityDef>, SceneError> {
    let entity_map: HashMap<&str, &EntityDef> =
        entities.iter().map(|e| (e.id.as_str(), e)).collect();

    let mut resolved = Vec::with_capacity(entities.len());

    for entity in entities {
        let mut merged = entity.clone();
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(entity.id.as_str());

        let mut next = entity.extends.as_deref();
        while let Some(parent_id) = next {
            if !visited.insert(parent_id) {
                return Err(SceneError::InheritanceCycle(parent_id.to_string()));
            }
            let parent = entity_map
                .get(parent_id)
                .ok_or_else(|| SceneError::MissingParent(parent_id.to_string()))?;

            merged = merge_entity(parent, &merged);
            next = parent.extends.as_deref();
        }

        merged.extends = None;
        resolved.push(merged);
    }

    Ok(resolved)
}

/// Merge parent entity components into child. Child fields win.
fn merge_entity(parent: &EntityDef, child: &EntityDef) -> EntityDef {
    let mut merged = child.clone();
    merged.extends = None; // resolved

    if merged.components.transform.is_none() {
        merged.components.transform = parent.components.transform.clone();
    }
    if merged.components.mesh_renderer.is_none() {
        merged.components.mesh_renderer = parent.components.mesh_renderer.clone();
    }
    if merged.components.camera.is_none() {
        merged.components.camera = parent.components.camera.clone();
    }
    if merged.components.rigid_body.is_none() {
        merged.components.rigid_body = parent.components.rigid_body.clone();
    }
    if merged.components.collider.is_none() {
        merged.components.collider = parent.components.collider.clone();
    }
    if merged.components.character_controller.is_none() {
        merged.components.character_controller = parent.components.character_controller.clone();
    }

    for (key, value) in &parent.components.extra {
        merged
            .components
            .extra
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }

    if merged.tags.is_empty() {
        merged.tags = parent.tags.clone();
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scene() {
        let yaml = r#"
name: "Test Scene"
settings:
  clear_color: [0.6, 0.8, 1.0]
entities:
  - id: main_camera
    components:
      transform:
        position: [0, 2, -5]
      camera:
        fov: 75
  - id: ground
    components:
      transform:
        position: [0, 0, 0]
      mesh_renderer:
        shape: { kind: ground, width: 50, depth: 50 }
        color: [0.35, 0.55, 0.3]
      collider:
        shape: { kind: box, size: [50, 0.1, 50] }
  - id: player
    components:
      transform:
        position: [0, 1, 0]
      character_controller:
        mode: kinematic
        move_speed: 5
        jump: 8
"#;
        let scene = parse_scene(yaml).unwrap();
        assert_eq!(scene.name, "Test Scene");
        assert_eq!(scene.entities.len(), 3);
        assert!(scene.entities[0].components.camera.is_some());
        assert_eq!(
            scene.entities[1].components.mesh_renderer.as_ref().unwrap().shape,
            ShapeDef::Ground {
                width: 50.0,
                depth: 50.0
            }
        );
        let cc = scene.entities[2]
            .components
            .character_controller
            .as_ref()
            .unwrap();
        assert_eq!(cc.mode, ControllerMode::Kinematic);
        assert_eq!(cc.jump, 8.0);
        // Unset fields fall back to defaults.
        assert_eq!(cc.camera, CameraRigMode::Orbit);
        assert_eq!(cc.radius, 0.5);
    }

    #[test]
    fn test_inheritance() {
        let yaml = r#"
name: "Inheritance Test"
entities:
  - id: crate_base
    components:
      transform:
        position: [0, 0.5, 0]
      mesh_renderer:
        shape: { kind: box, size: [1, 1, 1] }
        color: [0.6, 0.45, 0.3]
      collider:
        shape: { kind: box, size: [1, 1, 1] }
  - id: crate_02
    extends: crate_base
    components:
      transform:
        position: [3, 0.5, 4]
"#;
        let scene = parse_scene(yaml).unwrap();
        let crate_02 = &scene.entities[1];
        assert!(crate_02.components.mesh_renderer.is_some());
        assert!(crate_02.components.collider.is_some());
        assert_eq!(
            crate_02.components.transform.as_ref().unwrap().position,
            [3.0, 0.5, 4.0]
        );
    }

    #[test]
    fn test_missing_parent_is_error() {
        let yaml = r#"
name: "Broken"
entities:
  - id: orphan
    extends: nonexistent
"#;
        let err = parse_scene(yaml).unwrap_err();
        assert!(matches!(err, SceneError::MissingParent(_)));
    }

    #[test]
    fn test_self_extends_is_cycle() {
        let yaml = r#"
name: "Cycle"
entities:
  - id: ouroboros
    extends: ouroboros
"#;
        let err = parse_scene(yaml).unwrap_err();
        assert!(matches!(err, SceneError::InheritanceCycle(_)));
    }

    #[test]
    fn test_indirect_cycle_is_error() {
        let yaml = r#"
name: "Cycle"
entities:
  - id: alpha
    extends: beta
  - id: beta
    extends: alpha
"#;
        let err = parse_scene(yaml).unwrap_err();
        assert!(matches!(err, SceneError::InheritanceCycle(_)));
    }

    #[test]
    fn test_three_level_chain_inherits_grandparent() {
        let yaml = r#"
name: "Chain"
entities:
  - id: base
    components:
      mesh_renderer:
        shape: { kind: box, size: [1, 1, 1] }
        color: [0.6, 0.45, 0.3]
  - id: mid
    extends: base
    components:
      collider:
        shape: { kind: box, size: [1, 1, 1] }
  - id: leaf
    extends: mid
    components:
      transform:
        position: [2, 0.5, 0]
"#;
        let scene = parse_scene(yaml).unwrap();
        let leaf = &scene.entities[2];
        assert!(leaf.extends.is_none());
        // Nearest ancestor's component and the grandparent's both arrive.
        assert!(leaf.components.collider.is_some());
        assert!(leaf.components.mesh_renderer.is_some());
        assert_eq!(
            leaf.components.transform.as_ref().unwrap().position,
            [2.0, 0.5, 0.0]
        );
    }

    #[test]
    fn test_unknown_components_preserved() {
        let yaml = r#"
name: "Forward Compat"
entities:
  - id: player
    components:
      transform:
        position: [0, 0, 0]
      script:
        source: logic/player.lua
"#;
        let scene = parse_scene(yaml).unwrap();
        assert!(scene.entities[0].components.extra.contains_key("script"));
    }
}
