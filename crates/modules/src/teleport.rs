use crate::support::module_name;
use glam::Vec3;
use handspace_common::{EntityId, Hand, Marker, ObjectKind};
use handspace_dispatch::{
    DispatchConfig, DispatchModule, FrameContext, HandInput, ModuleDescriptor, ModuleError,
    ModuleKey, PeerLinker, RunningState, Slot,
};

pub const TELEPORT_PRIORITY: i32 = 80;

/// Where the hand ray would send the avatar.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Destination {
    /// The ray hit nothing.
    Nothing,
    /// Too steep, a UI surface, or otherwise unusable.
    Invalid,
    Seat(EntityId),
    /// Ray hit point on a walkable surface.
    Surface(Vec3),
}

/// Aim with the thumbstick, release to go.
///
/// Pushing the stick past the deadzone takes the hand; the module then tracks
/// what the ray lands on. Releasing the stick over a walkable surface moves
/// the avatar there, over a seat sends it `sit`, anywhere else cancels. Only
/// one hand teleports at a time.
#[derive(Debug, Clone)]
pub struct Teleporter {
    hand: Hand,
    descriptor: ModuleDescriptor,
    deadzone: f32,
    /// Cosine of the steepest walkable slope.
    min_up_dot: f32,
    foot_offset: f32,
    other_hand: Option<ModuleKey>,
    aimed: Destination,
}

impl Teleporter {
    pub const NAME: &'static str = "Teleporter";

    pub fn new(hand: Hand, config: &DispatchConfig) -> Self {
        Self {
            hand,
            descriptor: ModuleDescriptor::new(TELEPORT_PRIORITY, [Slot::hand(hand)]),
            deadzone: config.teleport_deadzone,
            min_up_dot: config.teleport_max_slope_degrees.to_radians().cos(),
            foot_offset: config.avatar_foot_offset,
            other_hand: None,
            aimed: Destination::Nothing,
        }
    }

    fn classify(&self, ctx: &FrameContext<'_>, input: &HandInput) -> Destination {
        let Some(hit) = input.ray_pick.hit else {
            return Destination::Nothing;
        };
        if hit.kind != ObjectKind::Entity {
            return Destination::Invalid;
        }
        let Some(props) = ctx.host_ref().properties(hit.target) else {
            return Destination::Nothing;
        };
        if props.has_marker(Marker::Seat) {
            return Destination::Seat(hit.target);
        }
        // Bounding spheres: the surface normal points away from the center.
        let normal = (hit.point - props.position()).try_normalize().unwrap_or(Vec3::Y);
        if normal.dot(Vec3::Y) < self.min_up_dot {
            Destination::Invalid
        } else {
            Destination::Surface(hit.point)
        }
    }

    fn go(&mut self, ctx: &mut FrameContext<'_>) -> Result<RunningState, ModuleError> {
        match std::mem::replace(&mut self.aimed, Destination::Nothing) {
            Destination::Seat(seat) => {
                tracing::debug!(hand = %self.hand, seat = %seat.short(), "teleport to seat");
                ctx.host().call_method(seat, "sit", &[])?;
            }
            Destination::Surface(point) => {
                let destination = point + Vec3::Y * self.foot_offset;
                tracing::debug!(hand = %self.hand, %destination, "teleport");
                ctx.host().move_avatar(destination)?;
            }
            Destination::Nothing | Destination::Invalid => {
                tracing::debug!(hand = %self.hand, "teleport cancelled");
            }
        }
        Ok(RunningState::idle())
    }
}

impl DispatchModule for Teleporter {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn is_ready(&mut self, ctx: &mut FrameContext<'_>) -> Result<RunningState, ModuleError> {
        self.aimed = Destination::Nothing;
        let other_active = self.other_hand.is_some_and(|key| ctx.claims().is_active(key));
        if other_active || ctx.snapshot().hand(self.hand).thumbstick <= self.deadzone {
            return Ok(RunningState::idle());
        }
        let input = ctx.snapshot().hand(self.hand);
        self.aimed = self.classify(ctx, input);
        Ok(RunningState::active_empty())
    }

    fn run(&mut self, ctx: &mut FrameContext<'_>) -> Result<RunningState, ModuleError> {
        let input = ctx.snapshot().hand(self.hand);
        if input.thumbstick <= self.deadzone {
            return self.go(ctx);
        }
        let aimed = self.classify(ctx, input);
        if aimed != self.aimed {
            tracing::trace!(hand = %self.hand, ?aimed, "teleport target changed");
            self.aimed = aimed;
        }
        Ok(RunningState::active_empty())
    }

    fn link(&mut self, peers: &PeerLinker) {
        self.other_hand = peers.resolve(&module_name(self.hand.other(), Self::NAME));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::support::testing::{aimed, dispatcher_with, step, world_with};
    use handspace_common::EntityProperties;
    use handspace_dispatch::Dispatcher;

    const NAME: &str = "RightTeleporter";

    /// Big sphere whose top touches y = 0 at (0, 0, -4).
    fn floor() -> EntityProperties {
        EntityProperties::named("floor")
            .at(Vec3::new(0.0, -10.0, -4.0))
            .with_radius(10.0)
    }

    fn teleporter() -> Teleporter {
        Teleporter::new(Hand::Right, &DispatchConfig::default())
    }

    #[test]
    fn release_over_floor_moves_avatar() {
        let (mut host, _) = world_with(vec![floor()]);
        let mut d = dispatcher_with(NAME, teleporter());
        let hand = Vec3::new(0.0, 1.0, 0.0);
        let spot = Vec3::new(0.0, 0.0, -4.0);

        step(&mut d, &mut host, aimed(hand, spot, 0.0).with_thumbstick(0.8));
        assert_eq!(d.owner(Slot::RightHand), Some(NAME));
        step(&mut d, &mut host, aimed(hand, spot, 0.0).with_thumbstick(0.8));
        assert!(host.drain_teleports().is_empty());

        let report = step(&mut d, &mut host, aimed(hand, spot, 0.0));
        assert_eq!(report.released, vec![NAME.to_string()]);
        let moves = host.drain_teleports();
        assert_eq!(moves.len(), 1);
        assert!((moves[0] - Vec3::new(0.0, 0.5, -4.0)).length() < 1e-2);
    }

    #[test]
    fn release_over_wall_cancels() {
        let wall = EntityProperties::named("wall")
            .at(Vec3::new(0.0, 1.0, -5.0))
            .with_radius(1.0);
        let (mut host, _) = world_with(vec![wall]);
        let mut d = dispatcher_with(NAME, teleporter());
        let hand = Vec3::new(0.0, 1.0, 0.0);

        step(&mut d, &mut host, aimed(hand, Vec3::new(0.0, 1.0, -5.0), 0.0).with_thumbstick(1.0));
        let report = step(&mut d, &mut host, aimed(hand, Vec3::new(0.0, 1.0, -5.0), 0.0));

        assert_eq!(report.released, vec![NAME.to_string()]);
        assert!(report.failures.is_empty());
        assert!(host.drain_teleports().is_empty());
        assert_eq!(host.avatar_position(), Vec3::ZERO);
    }

    #[test]
    fn release_over_seat_sits() {
        let chair = EntityProperties::named("chair")
            .at(Vec3::new(0.0, 0.5, -3.0))
            .with_radius(0.4)
            .with_marker(Marker::Seat);
        let (mut host, ids) = world_with(vec![chair]);
        let mut d = dispatcher_with(NAME, teleporter());
        let hand = Vec3::new(0.0, 1.0, 0.0);
        let at_chair = Vec3::new(0.0, 0.5, -3.0);

        step(&mut d, &mut host, aimed(hand, at_chair, 0.0).with_thumbstick(0.5));
        step(&mut d, &mut host, aimed(hand, at_chair, 0.0));

        assert_eq!(host.world().calls_on(ids[0]), vec!["sit"]);
        assert!(host.drain_teleports().is_empty());
    }

    #[test]
    fn stick_inside_deadzone_does_nothing() {
        let (mut host, _) = world_with(vec![floor()]);
        let mut d = dispatcher_with(NAME, teleporter());
        let sample = aimed(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, -4.0), 1.0)
            .with_thumbstick(0.1);
        step(&mut d, &mut host, sample);
        assert!(d.owner(Slot::RightHand).is_none());
    }

    #[test]
    fn one_hand_at_a_time() {
        let (mut host, _) = world_with(vec![floor()]);
        let config = DispatchConfig::default();
        let mut d = Dispatcher::new();
        d.enable("LeftTeleporter", Box::new(Teleporter::new(Hand::Left, &config)))
            .unwrap();
        d.enable(NAME, Box::new(Teleporter::new(Hand::Right, &config)))
            .unwrap();
        let sample = aimed(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, -4.0), 0.0)
            .with_thumbstick(0.9);
        host.set_hand(Hand::Left, sample);
        step(&mut d, &mut host, sample);
        step(&mut d, &mut host, sample);

        assert_eq!(d.owner(Slot::LeftHand), Some("LeftTeleporter"));
        assert!(d.owner(Slot::RightHand).is_none());
    }
}
