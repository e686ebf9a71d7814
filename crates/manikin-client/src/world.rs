use std::collections::HashMap;

use glam::{Quat, Vec3};

use manikin_core::components::{
    Camera, CameraRole, EntityId, Heading, Hidden, Limb, LimbKind, MeshHandle, MeshRenderer,
    Player, Tags, Transform,
};

use crate::scene::{CharacterControllerDef, EntityDef, SceneFile, SceneSettings, ShapeDef};

/// The ECS world plus the id registry built from the loaded scene.
pub struct SceneWorld {
    pub world: hecs::World,
    pub entity_registry: HashMap<String, hecs::Entity>,
    pub settings: SceneSettings,
    pub scene_name: String,
}

impl SceneWorld {
    pub fn new() -> Self {
        Self {
            world: hecs::World::new(),
            entity_registry: HashMap::new(),
            settings: SceneSettings::default(),
            scene_name: String::new(),
        }
    }

    /// Spawn every entity in the scene file. `make_mesh` resolves a shape
    /// to a mesh handle so this stays independent of the GPU.
    pub fn spawn_all_entities<F>(&mut self, scene: &SceneFile, make_mesh: &mut F)
    where
        F: FnMut(&ShapeDef) -> MeshHandle,
    {
        self.settings = scene.settings.clone();
        self.scene_name = scene.name.clone();

        for def in &scene.entities {
            let entity = self.spawn_entity(def, make_mesh);
            self.entity_registry.insert(def.id.clone(), entity);
        }

        // Parent references may point forward, so wire them up after
        // every entity exists.
        for def in &scene.entities {
            let Some(transform_def) = &def.components.transform else {
                continue;
            };
            let Some(parent_id) = &transform_def.parent else {
                continue;
            };
            let Some(&parent) = self.entity_registry.get(parent_id.as_str()) else {
                tracing::warn!(
                    "Entity '{}' references missing transform parent '{}'",
                    def.id,
                    parent_id
                );
                continue;
            };
            let entity = self.entity_registry[&def.id];
            if let Ok(mut transform) = self.world.get::<&mut Transform>(entity) {
                transform.parent = Some(parent);
            }
        }

        tracing::info!(
            "Spawned {} entities from scene '{}'",
            scene.entities.len(),
            scene.name
        );
    }

    fn spawn_entity<F>(&mut self, def: &EntityDef, make_mesh: &mut F) -> hecs::Entity
    where
        F: FnMut(&ShapeDef) -> MeshHandle,
    {
        let mut builder = hecs::EntityBuilder::new();
        builder.add(EntityId(def.id.clone()));
        if !def.tags.is_empty() {
            builder.add(Tags(def.tags.clone()));
        }

        let transform = match &def.components.transform {
            Some(t) => Transform {
                position: Vec3::from_array(t.position),
                rotation: euler_degrees_to_quat(t.rotation),
                scale: Vec3::from_array(t.scale),
                ..Default::default()
            },
            None => Transform::default(),
        };
        builder.add(transform);

        if let Some(mr) = &def.components.mesh_renderer {
            builder.add(MeshRenderer {
                mesh_handle: make_mesh(&mr.shape),
                color: [mr.color[0], mr.color[1], mr.color[2], 1.0],
            });
        }

        if let Some(cam) = &def.components.camera {
            builder.add(Camera {
                fov_degrees: cam.fov,
                near: cam.near,
                far: cam.far,
                role: CameraRole::Main,
            });
        }

        self.world.spawn(builder.build())
    }

    /// Build the six-part blocky character under `root` (the collider
    /// entity). The collider capsule itself is hidden; a visual root
    /// carrying the movement heading sits at its local origin with the
    /// torso, head, arms, and legs parented underneath.
    pub fn spawn_character_rig<F>(
        &mut self,
        root: hecs::Entity,
        controller: &CharacterControllerDef,
        make_mesh: &mut F,
    ) -> hecs::Entity
    where
        F: FnMut(&ShapeDef) -> MeshHandle,
    {
        let capsule_mesh = make_mesh(&ShapeDef::Capsule {
            height: controller.height,
            radius: controller.radius,
        });
        let _ = self.world.insert(
            root,
            (
                Hidden,
                MeshRenderer {
                    mesh_handle: capsule_mesh,
                    color: [1.0, 1.0, 1.0, 1.0],
                },
                Player {
                    yaw: 0.0,
                    pitch: 0.0,
                    height: controller.height,
                    radius: controller.radius,
                },
            ),
        );

        let visual_root = self.world.spawn((
            Transform::child_of(root, Vec3::ZERO),
            Heading::default(),
        ));

        let torso_color = [0.2, 0.45, 0.8, 1.0];
        let torso_mesh = make_mesh(&ShapeDef::Box {
            size: [0.8, 1.2, 0.4],
        });
        self.world.spawn((
            Transform::child_of(visual_root, Vec3::new(0.0, 1.2, 0.0)),
            MeshRenderer {
                mesh_handle: torso_mesh,
                color: torso_color,
            },
        ));

        let head_mesh = make_mesh(&ShapeDef::Sphere { diameter: 0.6 });
        self.world.spawn((
            Transform::child_of(visual_root, Vec3::new(0.0, 2.0, 0.0)),
            MeshRenderer {
                mesh_handle: head_mesh,
                color: [0.9, 0.75, 0.6, 1.0],
            },
        ));

        let arm_mesh = make_mesh(&ShapeDef::Box {
            size: [0.25, 1.0, 0.25],
        });
        let leg_mesh = make_mesh(&ShapeDef::Box {
            size: [0.3, 1.0, 0.3],
        });

        // side = +1 left, -1 right: opposite limbs swing in counter-phase.
        for side in [1.0_f32, -1.0] {
            self.world.spawn((
                Transform::child_of(visual_root, Vec3::new(-0.7 * side, 1.2, 0.0)),
                MeshRenderer {
                    mesh_handle: arm_mesh,
                    color: torso_color,
                },
                Limb {
                    kind: LimbKind::Arm,
                    side,
                },
            ));
            self.world.spawn((
                Transform::child_of(visual_root, Vec3::new(-0.3 * side, 0.2, 0.0)),
                MeshRenderer {
                    mesh_handle: leg_mesh,
                    color: [0.25, 0.25, 0.3, 1.0],
                },
                Limb {
                    kind: LimbKind::Leg,
                    side,
                },
            ));
        }

        visual_root
    }

    /// Entity for the first camera in the world, if any.
    pub fn main_camera(&self) -> Option<hecs::Entity> {
        self.world
            .query::<&Camera>()
            .iter()
            .find(|(_, cam)| cam.role == CameraRole::Main)
            .map(|(entity, _)| entity)
    }
}

impl Default for SceneWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Rotate every heading-carrying entity (the character's visual root)
/// to face its current yaw. The controllers only write `Heading`; this
/// is the one place facing reaches the transform tree.
pub fn apply_headings(world: &mut hecs::World) {
    for (_entity, (heading, transform)) in world.query_mut::<(&Heading, &mut Transform)>() {
        transform.rotation = Quat::from_rotation_y(heading.yaw);
        transform.dirty = true;
    }
}

/// Scene files author rotation as XYZ euler degrees.
pub fn euler_degrees_to_quat(degrees: [f32; 3]) -> Quat {
    Quat::from_euler(
        glam::EulerRot::XYZ,
        degrees[0].to_radians(),
        degrees[1].to_radians(),
        degrees[2].to_radians(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{parse_scene, CameraRigMode, ControllerMode};

    fn mesh_counter() -> impl FnMut(&ShapeDef) -> MeshHandle {
        let mut next = 0;
        move |_shape: &ShapeDef| {
            let handle = MeshHandle(next);
            next += 1;
            handle
        }
    }

    fn test_controller() -> CharacterControllerDef {
        CharacterControllerDef {
            mode: ControllerMode::Kinematic,
            move_speed: 5.0,
            sprint_multiplier: 1.8,
            jump: 8.0,
            height: 2.0,
            radius: 0.5,
            camera: CameraRigMode::Orbit,
        }
    }

    #[test]
    fn test_spawn_registers_ids_and_parents() {
        let yaml = r#"
name: "Parents"
entities:
  - id: root
    components:
      transform:
        position: [1, 0, 0]
  - id: child
    components:
      transform:
        position: [0, 2, 0]
        parent: root
"#;
        let scene = parse_scene(yaml).unwrap();
        let mut sw = SceneWorld::new();
        sw.spawn_all_entities(&scene, &mut mesh_counter());

        assert_eq!(sw.entity_registry.len(), 2);
        let root = sw.entity_registry["root"];
        let child = sw.entity_registry["child"];
        let child_transform = sw.world.get::<&Transform>(child).unwrap();
        assert_eq!(child_transform.parent, Some(root));
        let root_transform = sw.world.get::<&Transform>(root).unwrap();
        assert_eq!(root_transform.position, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_missing_parent_leaves_entity_unparented() {
        let yaml = r#"
name: "Orphan"
entities:
  - id: child
    components:
      transform:
        parent: nowhere
"#;
        let scene = parse_scene(yaml).unwrap();
        let mut sw = SceneWorld::new();
        sw.spawn_all_entities(&scene, &mut mesh_counter());
        let child = sw.entity_registry["child"];
        assert!(sw.world.get::<&Transform>(child).unwrap().parent.is_none());
    }

    #[test]
    fn test_character_rig_has_six_parts() {
        let mut sw = SceneWorld::new();
        let root = sw.world.spawn((Transform::at(Vec3::new(0.0, 1.0, 0.0)),));
        let visual_root = sw.spawn_character_rig(root, &test_controller(), &mut mesh_counter());

        // Root is hidden, carries the capsule mesh.
        assert!(sw.world.get::<&Hidden>(root).is_ok());
        assert!(sw.world.get::<&MeshRenderer>(root).is_ok());
        assert!(sw.world.get::<&Player>(root).is_ok());
        assert!(sw.world.get::<&Heading>(visual_root).is_ok());

        // Six visible parts: torso, head, two arms, two legs.
        let visible = sw
            .world
            .query::<&MeshRenderer>()
            .without::<&Hidden>()
            .iter()
            .count();
        assert_eq!(visible, 6);

        let limbs: Vec<(LimbKind, f32)> = sw
            .world
            .query::<&Limb>()
            .iter()
            .map(|(_, limb)| (limb.kind, limb.side))
            .collect();
        assert_eq!(limbs.len(), 4);
        assert_eq!(
            limbs.iter().filter(|(kind, _)| *kind == LimbKind::Arm).count(),
            2
        );
        let side_sum: f32 = limbs.iter().map(|(_, side)| side).sum();
        assert_eq!(side_sum, 0.0);
    }

    #[test]
    fn test_rig_part_offsets() {
        let mut sw = SceneWorld::new();
        let root = sw.world.spawn((Transform::at(Vec3::new(0.0, 1.0, 0.0)),));
        let visual_root = sw.spawn_character_rig(root, &test_controller(), &mut mesh_counter());

        let mut heights: Vec<f32> = sw
            .world
            .query::<(&Transform, &MeshRenderer)>()
            .without::<&Hidden>()
            .iter()
            .filter(|(_, (t, _))| t.parent == Some(visual_root))
            .map(|(_, (t, _))| t.position.y)
            .collect();
        heights.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(heights, vec![0.2, 0.2, 1.2, 1.2, 1.2, 2.0]);
    }

    #[test]
    fn test_heading_drives_visual_root_rotation() {
        let mut sw = SceneWorld::new();
        let root = sw.world.spawn((Transform::at(Vec3::new(0.0, 1.0, 0.0)),));
        let visual_root = sw.spawn_character_rig(root, &test_controller(), &mut mesh_counter());

        sw.world
            .get::<&mut Heading>(visual_root)
            .unwrap()
            .yaw = std::f32::consts::FRAC_PI_2;
        apply_headings(&mut sw.world);

        let t = sw.world.get::<&Transform>(visual_root).unwrap();
        let facing = t.rotation * Vec3::Z;
        assert!((facing - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn test_euler_degrees_roundtrip() {
        let q = euler_degrees_to_quat([0.0, 90.0, 0.0]);
        let rotated = q * Vec3::Z;
        assert!((rotated - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn test_main_camera_lookup() {
        let yaml = r#"
name: "Cam"
entities:
  - id: cam
    components:
      transform:
        position: [0, 2, -5]
      camera:
        fov: 60
"#;
        let scene = parse_scene(yaml).unwrap();
        let mut sw = SceneWorld::new();
        sw.spawn_all_entities(&scene, &mut mesh_counter());
        assert_eq!(sw.main_camera(), Some(sw.entity_registry["cam"]));
    }
}
