use glam::Vec3;
use handspace_common::{EntityId, EntityProperties, Hand};
use handspace_dispatch::{FrameContext, HandInput};

/// `Left<base>` / `Right<base>`.
pub fn module_name(hand: Hand, base: &str) -> String {
    format!("{}{}", hand.prefix(), base)
}

/// Nearest entity within `radius` of the hand whose properties satisfy
/// `accept`. UI surfaces are skipped.
pub(crate) fn nearest_entity(
    ctx: &FrameContext<'_>,
    hand: &HandInput,
    radius: f32,
    accept: impl Fn(&EntityProperties) -> bool,
) -> Option<(EntityId, EntityProperties)> {
    hand.within(radius)
        .filter(|n| !n.kind.is_ui_surface())
        .find_map(|n| {
            let props = ctx.host_ref().properties(n.id)?;
            accept(&props).then_some((n.id, props))
        })
}

/// Distance from `point` to the surface of `props`' bounding sphere.
pub(crate) fn surface_distance(props: &EntityProperties, point: Vec3) -> f32 {
    (props.position().distance(point) - props.radius).max(0.0)
}
