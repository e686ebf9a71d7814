use std::collections::HashMap;

use glam::{Quat, Vec3};
use rapier3d::control::{CharacterAutostep, CharacterLength, KinematicCharacterController};
use rapier3d::prelude::*;

use manikin_core::components::Transform;

use crate::scene::ShapeDef;

/// Rigid body component attached to entities.
#[derive(Debug, Clone)]
pub struct RigidBodyComp {
    pub handle: RigidBodyHandle,
    pub body_type: PhysicsBodyType,
}

/// Collider component attached to entities.
#[derive(Debug, Clone)]
pub struct ColliderComp {
    pub handle: ColliderHandle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PhysicsBodyType {
    Dynamic,
    Static,
    Kinematic,
}

/// Central physics world state.
pub struct PhysicsWorld {
    pub gravity: Vec3,
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub integration_params: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,

    // Mapping from Rapier handles to ECS entities
    pub body_to_entity: HashMap<RigidBodyHandle, hecs::Entity>,

    // Character controller used for kinematic movement resolution
    pub character_controller: KinematicCharacterController,
}

impl PhysicsWorld {
    pub fn new(gravity: Vec3) -> Self {
        let mut character_controller = KinematicCharacterController::default();
        character_controller.max_slope_climb_angle = 45.0_f32.to_radians();
        character_controller.min_slope_slide_angle = 30.0_f32.to_radians();
        character_controller.autostep = Some(CharacterAutostep {
            max_height: CharacterLength::Absolute(0.3),
            min_width: CharacterLength::Absolute(0.2),
            include_dynamic_bodies: false,
        });
        character_controller.snap_to_ground = Some(CharacterLength::Absolute(0.1));

        Self {
            gravity,
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_params: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            body_to_entity: HashMap::new(),
            character_controller,
        }
    }

    /// Add a static rigid body + collider (ground, obstacles).
    pub fn add_static_body(
        &mut self,
        entity: hecs::Entity,
        position: Vec3,
        rotation: Quat,
        shape: &ShapeDef,
        restitution: f32,
        friction: f32,
    ) -> (RigidBodyHandle, ColliderHandle) {
        let rb = RigidBodyBuilder::fixed()
            .translation(vector![position.x, position.y, position.z])
            .rotation(quat_to_angvector(rotation))
            .build();
        let rb_handle = self.rigid_body_set.insert(rb);

        let collider = shape_to_collider(shape)
            .restitution(restitution)
            .friction(friction)
            .build();
        let col_handle =
            self.collider_set
                .insert_with_parent(collider, rb_handle, &mut self.rigid_body_set);

        self.body_to_entity.insert(rb_handle, entity);

        (rb_handle, col_handle)
    }

    /// Add a dynamic rigid body + collider. Rotation-locked bodies are
    /// used for the dynamic character so the capsule never tips over;
    /// its yaw is written explicitly each frame instead.
    pub fn add_dynamic_body(
        &mut self,
        entity: hecs::Entity,
        position: Vec3,
        shape: &ShapeDef,
        mass: f32,
        restitution: f32,
        friction: f32,
        lock_rotations: bool,
    ) -> (RigidBodyHandle, ColliderHandle) {
        let mut builder = RigidBodyBuilder::dynamic()
            .translation(vector![position.x, position.y, position.z]);
        if lock_rotations {
            builder = builder.lock_rotations();
        }
        let rb_handle = self.rigid_body_set.insert(builder.build());

        let collider = shape_to_collider(shape)
            .mass(mass)
            .restitution(restitution)
            .friction(friction)
            .build();
        let col_handle =
            self.collider_set
                .insert_with_parent(collider, rb_handle, &mut self.rigid_body_set);

        self.body_to_entity.insert(rb_handle, entity);

        (rb_handle, col_handle)
    }

    /// Add a kinematic capsule body for the character controller.
    pub fn add_character_body(
        &mut self,
        entity: hecs::Entity,
        position: Vec3,
        half_height: f32,
        radius: f32,
    ) -> (RigidBodyHandle, ColliderHandle) {
        let rb = RigidBodyBuilder::kinematic_position_based()
            .translation(vector![position.x, position.y, position.z])
            .build();
        let rb_handle = self.rigid_body_set.insert(rb);

        let collider = ColliderBuilder::capsule_y(half_height, radius).build();
        let col_handle =
            self.collider_set
                .insert_with_parent(collider, rb_handle, &mut self.rigid_body_set);

        self.body_to_entity.insert(rb_handle, entity);

        (rb_handle, col_handle)
    }

    /// Step the physics simulation and refresh the query pipeline.
    pub fn step(&mut self, dt: f32) {
        self.integration_params.dt = dt;
        let gravity = vector![self.gravity.x, self.gravity.y, self.gravity.z];

        self.physics_pipeline.step(
            &gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Rebuild the query pipeline without stepping. Needed before the
    /// first `move_character` after spawning bodies.
    pub fn refresh_queries(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    /// Move a character controller and return the effective movement plus
    /// the grounded flag rapier derived from the resolution.
    pub fn move_character(
        &mut self,
        rb_handle: RigidBodyHandle,
        col_handle: ColliderHandle,
        desired_movement: Vec3,
        dt: f32,
    ) -> (Vec3, bool) {
        let body = &self.rigid_body_set[rb_handle];
        let collider = &self.collider_set[col_handle];

        let movement = self.character_controller.move_shape(
            dt,
            &self.rigid_body_set,
            &self.collider_set,
            &self.query_pipeline,
            collider.shape(),
            body.position(),
            vector![
                desired_movement.x,
                desired_movement.y,
                desired_movement.z
            ],
            QueryFilter::default().exclude_rigid_body(rb_handle),
            |_| {},
        );

        let grounded = movement.grounded;
        let effective = Vec3::new(
            movement.translation.x,
            movement.translation.y,
            movement.translation.z,
        );

        let current_pos = body.position().translation;
        let new_pos = vector![
            current_pos.x + effective.x,
            current_pos.y + effective.y,
            current_pos.z + effective.z
        ];

        if let Some(body) = self.rigid_body_set.get_mut(rb_handle) {
            let mut new_iso = *body.position();
            new_iso.translation = new_pos.into();
            body.set_next_kinematic_position(new_iso);
            // Kinematic targets only take effect on the next pipeline
            // step; write the pose directly so the same-frame transform
            // sync sees it.
            body.set_position(new_iso, true);
        }

        (effective, grounded)
    }

    /// Current translation of a body.
    pub fn body_position(&self, rb_handle: RigidBodyHandle) -> Vec3 {
        let pos = self.rigid_body_set[rb_handle].position().translation;
        Vec3::new(pos.x, pos.y, pos.z)
    }

    /// Current linear velocity of a body.
    pub fn linear_velocity(&self, rb_handle: RigidBodyHandle) -> Vec3 {
        let vel = self.rigid_body_set[rb_handle].linvel();
        Vec3::new(vel.x, vel.y, vel.z)
    }

    /// Overwrite a body's linear velocity.
    pub fn set_linear_velocity(&mut self, rb_handle: RigidBodyHandle, velocity: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(rb_handle) {
            body.set_linvel(vector![velocity.x, velocity.y, velocity.z], true);
        }
    }

    /// Apply a vertical impulse (jump).
    pub fn apply_vertical_impulse(&mut self, rb_handle: RigidBodyHandle, impulse: f32) {
        if let Some(body) = self.rigid_body_set.get_mut(rb_handle) {
            body.apply_impulse(vector![0.0, impulse, 0.0], true);
        }
    }

    /// Sync physics body poses back to ECS transforms.
    pub fn sync_to_ecs(&self, world: &mut hecs::World) {
        for (rb_handle, &entity) in &self.body_to_entity {
            if let Some(body) = self.rigid_body_set.get(*rb_handle) {
                if let Ok(mut transform) = world.get::<&mut Transform>(entity) {
                    let pos = body.position().translation;
                    let rot = body.position().rotation;
                    transform.position = Vec3::new(pos.x, pos.y, pos.z);
                    transform.rotation = Quat::from_xyzw(rot.i, rot.j, rot.k, rot.w);
                    transform.dirty = true;
                }
            }
        }
    }
}

fn shape_to_collider(shape: &ShapeDef) -> ColliderBuilder {
    match shape {
        ShapeDef::Box { size } => {
            ColliderBuilder::cuboid(size[0] / 2.0, size[1] / 2.0, size[2] / 2.0)
        }
        ShapeDef::Sphere { diameter } => ColliderBuilder::ball(diameter / 2.0),
        ShapeDef::Capsule { height, radius } => {
            ColliderBuilder::capsule_y((height / 2.0 - radius).max(0.05), *radius)
        }
        // The visual ground quad sits at y = 0; the collider slab hangs
        // below it so bodies rest exactly at the visual surface.
        ShapeDef::Ground { width, depth } => {
            ColliderBuilder::cuboid(width / 2.0, 0.1, depth / 2.0)
                .translation(vector![0.0, -0.1, 0.0])
        }
    }
}

fn quat_to_angvector(q: Quat) -> rapier3d::na::Vector3<f32> {
    let (axis, angle) = q.to_axis_angle();
    vector![axis.x * angle, axis.y * angle, axis.z * angle]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_ground(pw: &mut PhysicsWorld, world: &mut hecs::World) {
        let ground = world.spawn(());
        pw.add_static_body(
            ground,
            Vec3::ZERO,
            Quat::IDENTITY,
            &ShapeDef::Ground {
                width: 50.0,
                depth: 50.0,
            },
            0.0,
            0.5,
        );
    }

    #[test]
    fn test_physics_world_creation() {
        let pw = PhysicsWorld::new(Vec3::new(0.0, -9.81, 0.0));
        assert_eq!(pw.rigid_body_set.len(), 0);
        assert_eq!(pw.collider_set.len(), 0);
    }

    #[test]
    fn test_add_static_body() {
        let mut world = hecs::World::new();
        let entity = world.spawn(());
        let mut pw = PhysicsWorld::new(Vec3::new(0.0, -9.81, 0.0));

        let (rb, _col) = pw.add_static_body(
            entity,
            Vec3::ZERO,
            Quat::IDENTITY,
            &ShapeDef::Box {
                size: [20.0, 0.2, 20.0],
            },
            0.0,
            0.5,
        );

        assert_eq!(pw.rigid_body_set.len(), 1);
        assert_eq!(pw.collider_set.len(), 1);
        assert_eq!(pw.body_to_entity[&rb], entity);
    }

    #[test]
    fn test_character_lands_on_ground() {
        let mut world = hecs::World::new();
        let mut pw = PhysicsWorld::new(Vec3::new(0.0, -9.81, 0.0));
        flat_ground(&mut pw, &mut world);

        let player = world.spawn(());
        // Capsule half-height 0.5 + radius 0.5: bottom is 1.0 below center.
        let (rb, col) = pw.add_character_body(player, Vec3::new(0.0, 3.0, 0.0), 0.5, 0.5);
        pw.refresh_queries();

        let (effective, grounded) =
            pw.move_character(rb, col, Vec3::new(0.0, -5.0, 0.0), 1.0 / 60.0);

        // Falls 2.0 to rest with the capsule bottom on the ground slab.
        assert!(grounded);
        assert!(effective.y < -1.8 && effective.y > -2.2, "y = {}", effective.y);

        let pos = pw.body_position(rb);
        assert!((pos.y - 1.0).abs() < 0.1, "rest height {}", pos.y);
    }

    #[test]
    fn test_character_walks_without_sinking() {
        let mut world = hecs::World::new();
        let mut pw = PhysicsWorld::new(Vec3::new(0.0, -9.81, 0.0));
        flat_ground(&mut pw, &mut world);

        let player = world.spawn(());
        let (rb, col) = pw.add_character_body(player, Vec3::new(0.0, 1.0, 0.0), 0.5, 0.5);
        pw.refresh_queries();

        let dt = 1.0 / 60.0;
        for _ in 0..30 {
            let desired = Vec3::new(5.0 * dt, -9.81 * dt * dt, 0.0);
            pw.move_character(rb, col, desired, dt);
        }

        let pos = pw.body_position(rb);
        assert!(pos.x > 1.0, "walked to {}", pos.x);
        assert!(pos.y > 0.85, "sank to {}", pos.y);
    }

    #[test]
    fn test_dynamic_body_velocity_roundtrip() {
        let mut world = hecs::World::new();
        let entity = world.spawn(());
        let mut pw = PhysicsWorld::new(Vec3::new(0.0, -9.81, 0.0));

        let (rb, _col) = pw.add_dynamic_body(
            entity,
            Vec3::new(0.0, 2.0, 0.0),
            &ShapeDef::Capsule {
                height: 2.0,
                radius: 0.5,
            },
            10.0,
            0.0,
            0.5,
            true,
        );

        pw.set_linear_velocity(rb, Vec3::new(3.0, 0.0, -1.0));
        let vel = pw.linear_velocity(rb);
        assert!((vel - Vec3::new(3.0, 0.0, -1.0)).length() < 1e-5);

        pw.apply_vertical_impulse(rb, 20.0);
        // impulse / mass = 2 m/s upward
        assert!((pw.linear_velocity(rb).y - 2.0).abs() < 1e-3);
    }

}
