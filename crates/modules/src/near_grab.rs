use crate::support::nearest_entity;
use glam::Vec3;
use handspace_common::{EntityId, Hand, Marker};
use handspace_dispatch::{
    DispatchConfig, DispatchModule, EntityHost, FrameContext, ModuleDescriptor, ModuleError,
    RunningState, Slot, call_if_present,
};

pub const NEAR_GRAB_PRIORITY: i32 = 140;

#[derive(Debug, Clone, Copy)]
struct Held {
    target: EntityId,
    /// Target position relative to the hand at grab time.
    offset: Vec3,
}

/// Picks up the nearest grabbable entity in reach and carries it with the
/// hand until the trigger is released.
#[derive(Debug, Clone)]
pub struct NearGrabEntity {
    hand: Hand,
    descriptor: ModuleDescriptor,
    trigger_on: f32,
    trigger_off: f32,
    radius: f32,
    haptic_strength: f32,
    haptic_duration_ms: f32,
    held: Option<Held>,
}

impl NearGrabEntity {
    pub const NAME: &'static str = "NearGrabEntity";

    pub fn new(hand: Hand, config: &DispatchConfig) -> Self {
        Self {
            hand,
            descriptor: ModuleDescriptor::new(NEAR_GRAB_PRIORITY, [Slot::hand(hand)]),
            trigger_on: config.trigger_on_value,
            trigger_off: config.trigger_off_value,
            radius: config.near_grab_radius,
            haptic_strength: config.haptic_strength,
            haptic_duration_ms: config.haptic_duration_ms,
            held: None,
        }
    }

    fn release(&mut self, ctx: &mut FrameContext<'_>) -> Result<RunningState, ModuleError> {
        if let Some(held) = self.held.take() {
            tracing::debug!(hand = %self.hand, entity = %held.target.short(), "near grab release");
            call_if_present(ctx.host(), held.target, "releaseGrab", &[self.hand.as_str()])?;
        }
        Ok(RunningState::idle())
    }
}

impl DispatchModule for NearGrabEntity {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn is_ready(&mut self, ctx: &mut FrameContext<'_>) -> Result<RunningState, ModuleError> {
        let input = ctx.snapshot().hand(self.hand);
        let Some(hand_position) = input.position() else {
            return Ok(RunningState::idle());
        };
        if input.trigger <= self.trigger_on {
            return Ok(RunningState::idle());
        }
        let claims = ctx.claims();
        let me = ctx.me();
        let candidate = nearest_entity(ctx, input, self.radius, |p| {
            p.has_marker(Marker::Grabbable) && !p.locked
        })
        .filter(|(id, _)| !claims.is_claimed_by_other(*id, me));
        let Some((target, props)) = candidate else {
            return Ok(RunningState::idle());
        };

        tracing::debug!(hand = %self.hand, entity = %target.short(), "near grab start");
        ctx.host().call_method(target, "startNearGrab", &[self.hand.as_str()])?;
        ctx.host()
            .haptic_pulse(self.hand, self.haptic_strength, self.haptic_duration_ms);
        self.held = Some(Held {
            target,
            offset: props.position() - hand_position,
        });
        Ok(RunningState::active_with([target]))
    }

    fn run(&mut self, ctx: &mut FrameContext<'_>) -> Result<RunningState, ModuleError> {
        let Some(held) = self.held else {
            return Ok(RunningState::idle());
        };
        if !ctx.host_ref().exists(held.target) {
            self.held = None;
            return Ok(RunningState::idle().with_abort([held.target]));
        }
        let input = ctx.snapshot().hand(self.hand);
        if input.trigger < self.trigger_off {
            return self.release(ctx);
        }
        if let Some(hand_position) = input.position() {
            ctx.host().set_position(held.target, hand_position + held.offset)?;
        }
        ctx.host()
            .call_method(held.target, "continueNearGrab", &[self.hand.as_str()])?;
        Ok(RunningState::active_with([held.target]))
    }

    fn has_cleanup(&self) -> bool {
        true
    }

    fn cleanup(&mut self, host: &mut dyn EntityHost) {
        if let Some(held) = self.held.take() {
            if let Err(e) = call_if_present(host, held.target, "releaseGrab", &[self.hand.as_str()]) {
                tracing::warn!(hand = %self.hand, error = %e, "release on teardown failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::support::testing::{aimed, dispatcher_with, step, world_with};
    use handspace_common::EntityProperties;

    const NAME: &str = "RightNearGrabEntity";

    fn cup(at: Vec3) -> EntityProperties {
        EntityProperties::named("cup")
            .at(at)
            .with_radius(0.05)
            .with_marker(Marker::Grabbable)
    }

    #[test]
    fn grab_carries_target_with_hand() {
        let (mut host, ids) = world_with(vec![cup(Vec3::new(0.0, 1.0, -0.1))]);
        let cup = ids[0];
        let mut d = dispatcher_with(NAME, NearGrabEntity::new(Hand::Right, &DispatchConfig::default()));
        let ahead = Vec3::new(0.0, 1.0, -1.0);

        step(&mut d, &mut host, aimed(Vec3::new(0.0, 1.0, 0.0), ahead, 0.8));
        assert_eq!(d.owner(Slot::RightHand), Some(NAME));
        assert_eq!(host.haptics().len(), 1);

        step(&mut d, &mut host, aimed(Vec3::new(0.5, 1.0, 0.0), ahead, 0.8));
        let moved = host.world().get(cup).unwrap().position();
        assert!((moved - Vec3::new(0.5, 1.0, -0.1)).length() < 1e-4);

        step(&mut d, &mut host, aimed(Vec3::new(0.5, 1.0, 0.0), ahead, 0.0));
        assert_eq!(
            host.world().calls_on(cup),
            vec!["startNearGrab", "continueNearGrab", "releaseGrab"]
        );
        assert!(d.owner(Slot::RightHand).is_none());
    }

    #[test]
    fn locked_entities_are_not_grabbed() {
        let (mut host, _) = world_with(vec![cup(Vec3::new(0.0, 1.0, -0.1)).locked()]);
        let mut d = dispatcher_with(NAME, NearGrabEntity::new(Hand::Right, &DispatchConfig::default()));
        step(&mut d, &mut host, aimed(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Z, 1.0));
        assert!(d.owner(Slot::RightHand).is_none());
        assert!(host.haptics().is_empty());
    }

    #[test]
    fn target_held_by_other_hand_is_skipped() {
        let (mut host, ids) = world_with(vec![cup(Vec3::new(0.0, 1.0, -0.1))]);
        let config = DispatchConfig::default();
        let mut d = handspace_dispatch::Dispatcher::new();
        d.enable("LeftNearGrabEntity", Box::new(NearGrabEntity::new(Hand::Left, &config)))
            .unwrap();
        d.enable(NAME, Box::new(NearGrabEntity::new(Hand::Right, &config)))
            .unwrap();

        let sample = aimed(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 1.0, -1.0), 0.8);
        host.set_hand(Hand::Left, sample);
        step(&mut d, &mut host, sample);

        assert_eq!(d.owner(Slot::LeftHand), Some("LeftNearGrabEntity"));
        assert!(d.owner(Slot::RightHand).is_none());
        assert_eq!(host.world().calls_on(ids[0]), vec!["startNearGrab"]);
    }

    #[test]
    fn shutdown_releases_held_target() {
        let (mut host, ids) = world_with(vec![cup(Vec3::new(0.0, 1.0, -0.1))]);
        let mut d = dispatcher_with(NAME, NearGrabEntity::new(Hand::Right, &DispatchConfig::default()));
        step(&mut d, &mut host, aimed(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Z, 0.8));
        d.shutdown(&mut host);
        assert_eq!(host.world().calls_on(ids[0]), vec!["startNearGrab", "releaseGrab"]);
    }
}
