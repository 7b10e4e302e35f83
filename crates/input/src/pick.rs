//! Ray picks and proximity queries over the world's bounding spheres.

use glam::Vec3;
use handspace_dispatch::{NearbyObject, RayHit, RayPick};
use handspace_kernel::World;

/// Distance along a unit ray to a sphere, or `None` on a miss. A ray starting
/// inside the sphere hits at distance 0.
fn ray_sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = origin - center;
    let b = oc.dot(direction);
    let c = oc.length_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    let far = -b + root;
    if far < 0.0 {
        return None;
    }
    Some((-b - root).max(0.0))
}

/// Nearest object hit by the ray within `max_distance`. Ties go to the object
/// earliest in id order.
pub fn ray_pick(world: &World, origin: Vec3, direction: Vec3, max_distance: f32) -> RayPick {
    let Some(direction) = direction.try_normalize() else {
        return RayPick::miss();
    };
    let mut best: Option<RayHit> = None;
    for (id, props) in world.objects() {
        let Some(distance) = ray_sphere(origin, direction, props.position(), props.radius) else {
            continue;
        };
        if distance > max_distance {
            continue;
        }
        if best.is_none_or(|b| distance < b.distance) {
            best = Some(RayHit {
                target: *id,
                kind: props.kind,
                distance,
                point: origin + direction * distance,
            });
        }
    }
    match best {
        Some(hit) => RayPick::hit(hit),
        None => RayPick::miss(),
    }
}

/// Objects whose surface lies within `radius` of `point`, nearest first.
pub fn nearby(world: &World, point: Vec3, radius: f32) -> Vec<NearbyObject> {
    let mut found: Vec<NearbyObject> = world
        .objects()
        .iter()
        .filter_map(|(id, props)| {
            let distance = (props.position().distance(point) - props.radius).max(0.0);
            (distance <= radius).then_some(NearbyObject {
                id: *id,
                kind: props.kind,
                distance,
            })
        })
        .collect();
    found.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use handspace_common::{EntityProperties, ObjectKind};

    #[test]
    fn ray_hits_nearest_sphere() {
        let mut world = World::new();
        let far = world.spawn(EntityProperties::named("far").at(Vec3::new(0.0, 0.0, -5.0)));
        let near = world.spawn(EntityProperties::named("near").at(Vec3::new(0.0, 0.0, -2.0)));

        let pick = ray_pick(&world, Vec3::ZERO, Vec3::NEG_Z, 500.0);
        let hit = pick.hit.unwrap();
        assert_eq!(hit.target, near);
        assert!((hit.distance - 1.9).abs() < 1e-4);
        assert_ne!(hit.target, far);
    }

    #[test]
    fn ray_respects_max_distance_and_direction() {
        let mut world = World::new();
        world.spawn(EntityProperties::named("ahead").at(Vec3::new(0.0, 0.0, -10.0)));

        assert!(!ray_pick(&world, Vec3::ZERO, Vec3::NEG_Z, 5.0).is_hit());
        assert!(!ray_pick(&world, Vec3::ZERO, Vec3::Z, 500.0).is_hit());
        assert!(!ray_pick(&world, Vec3::ZERO, Vec3::ZERO, 500.0).is_hit());
        assert!(ray_pick(&world, Vec3::ZERO, Vec3::NEG_Z * 3.0, 500.0).is_hit());
    }

    #[test]
    fn ray_reports_object_kind() {
        let mut world = World::new();
        let tablet = world.spawn(
            EntityProperties::named("tablet")
                .at(Vec3::new(0.0, 1.0, -1.0))
                .with_kind(ObjectKind::Overlay)
                .with_radius(0.3),
        );
        let pick = ray_pick(&world, Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Z, 500.0);
        assert_eq!(pick.hit_of_kind(ObjectKind::Overlay).map(|h| h.target), Some(tablet));
    }

    #[test]
    fn nearby_measures_to_surface_and_sorts() {
        let mut world = World::new();
        let a = world.spawn(EntityProperties::named("a").at(Vec3::new(0.5, 0.0, 0.0)));
        let b = world.spawn(EntityProperties::named("b").at(Vec3::new(0.2, 0.0, 0.0)));
        world.spawn(EntityProperties::named("c").at(Vec3::new(3.0, 0.0, 0.0)));

        let found = nearby(&world, Vec3::ZERO, 1.0);
        let ids: Vec<_> = found.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![b, a]);
        assert!((found[0].distance - 0.1).abs() < 1e-4);
    }

    #[test]
    fn inside_a_sphere_is_distance_zero() {
        let mut world = World::new();
        let id = world.spawn(EntityProperties::named("big").with_radius(1.0));
        let found = nearby(&world, Vec3::new(0.2, 0.0, 0.0), 0.1);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
        assert_eq!(found[0].distance, 0.0);
        assert_eq!(ray_pick(&world, Vec3::ZERO, Vec3::X, 10.0).hit.map(|h| h.distance), Some(0.0));
    }
}
