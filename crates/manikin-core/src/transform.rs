use glam::Mat4;
use hecs::World;

use crate::components::Transform;

/// Propagate the transform tree: roots first, then children against
/// their parent's world matrix. One level of nesting resolves per pass;
/// the rig is at most two levels deep (player -> visual root -> limbs)
/// so two child passes are run.
pub fn propagate(world: &mut World) {
    let mut root_updates: Vec<(hecs::Entity, Mat4)> = Vec::new();
    for (entity, transform) in world.query_mut::<&Transform>() {
        if transform.parent.is_none() {
            root_updates.push((entity, local_matrix(transform)));
        }
    }
    apply(world, &root_updates);

    for _ in 0..2 {
        let mut links: Vec<(hecs::Entity, hecs::Entity, Mat4)> = Vec::new();
        for (entity, transform) in world.query_mut::<&Transform>() {
            if let Some(parent) = transform.parent {
                links.push((entity, parent, local_matrix(transform)));
            }
        }

        let mut child_updates: Vec<(hecs::Entity, Mat4)> = Vec::new();
        for (entity, parent, local) in &links {
            if let Ok(parent_t) = world.get::<&Transform>(*parent) {
                child_updates.push((*entity, parent_t.world_matrix * *local));
            }
        }
        apply(world, &child_updates);
    }
}

fn local_matrix(transform: &Transform) -> Mat4 {
    Mat4::from_scale_rotation_translation(
        transform.scale,
        transform.rotation,
        transform.position,
    )
}

fn apply(world: &mut World, updates: &[(hecs::Entity, Mat4)]) {
    for (entity, world_matrix) in updates {
        if let Ok(mut transform) = world.get::<&mut Transform>(*entity) {
            transform.world_matrix = *world_matrix;
            transform.dirty = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_child_inherits_parent_translation() {
        let mut world = World::new();
        let parent = world.spawn((Transform::at(Vec3::new(1.0, 2.0, 3.0)),));
        let child = world.spawn((Transform::child_of(parent, Vec3::new(0.0, 1.0, 0.0)),));

        propagate(&mut world);

        let t = world.get::<&Transform>(child).unwrap();
        let world_pos = t.world_matrix.transform_point3(Vec3::ZERO);
        assert!((world_pos - Vec3::new(1.0, 3.0, 3.0)).length() < 1e-5);
    }

    #[test]
    fn test_two_levels_resolve() {
        let mut world = World::new();
        let root = world.spawn((Transform::at(Vec3::new(5.0, 0.0, 0.0)),));
        let mid = world.spawn((Transform::child_of(root, Vec3::new(0.0, 1.5, 0.0)),));
        let leaf = world.spawn((Transform::child_of(mid, Vec3::new(0.0, 0.0, -6.0)),));

        propagate(&mut world);

        let t = world.get::<&Transform>(leaf).unwrap();
        let world_pos = t.world_matrix.transform_point3(Vec3::ZERO);
        assert!((world_pos - Vec3::new(5.0, 1.5, -6.0)).length() < 1e-5);
    }

    #[test]
    fn test_parent_rotation_rotates_child_offset() {
        let mut world = World::new();
        let parent_transform = Transform {
            rotation: glam::Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            ..Default::default()
        };
        let parent = world.spawn((parent_transform,));
        let child = world.spawn((Transform::child_of(parent, Vec3::new(0.0, 0.0, 1.0)),));

        propagate(&mut world);

        let t = world.get::<&Transform>(child).unwrap();
        let world_pos = t.world_matrix.transform_point3(Vec3::ZERO);
        assert!((world_pos - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-5);
    }
}
