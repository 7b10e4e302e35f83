use crate::support::{module_name, nearest_entity, surface_distance};
use handspace_common::{EntityId, Hand, Marker, ObjectKind};
use handspace_dispatch::{
    DispatchConfig, DispatchModule, EntityHost, FrameContext, ModuleDescriptor, ModuleError,
    ModuleKey, PeerLinker, RunningState, Slot, call_if_present,
};

pub const FAR_GRAB_PRIORITY: i32 = 550;

#[derive(Debug, Clone, Copy)]
struct DistanceHold {
    target: EntityId,
    /// Hand-to-center distance when the target was caught, kept while dragging.
    distance: f32,
}

/// Pulls grabbable entities from a distance along the hand ray.
///
/// Runs in two stages: a search while the trigger is held over an entity,
/// then a hold once the trigger clicks on something grabbable. The search
/// yields as soon as anything grabbable is within arm's reach or the ray
/// lands on a triggerable entity; the hold yields once the target reaches the
/// hand. Only one hand far-grabs at a time.
#[derive(Debug, Clone)]
pub struct FarGrabEntity {
    hand: Hand,
    descriptor: ModuleDescriptor,
    trigger_on: f32,
    trigger_off: f32,
    near_radius: f32,
    haptic_strength: f32,
    haptic_duration_ms: f32,
    other_hand: Option<ModuleKey>,
    hold: Option<DistanceHold>,
}

impl FarGrabEntity {
    pub const NAME: &'static str = "FarGrabEntity";

    pub fn new(hand: Hand, config: &DispatchConfig) -> Self {
        Self {
            hand,
            descriptor: ModuleDescriptor::new(FAR_GRAB_PRIORITY, [Slot::hand(hand)])
                .with_parameter("laser_hand", hand.as_str()),
            trigger_on: config.trigger_on_value,
            trigger_off: config.trigger_off_value,
            near_radius: config.near_grab_radius,
            haptic_strength: config.haptic_strength,
            haptic_duration_ms: config.haptic_duration_ms,
            other_hand: None,
            hold: None,
        }
    }

    fn other_hand_active(&self, ctx: &FrameContext<'_>) -> bool {
        self.other_hand.is_some_and(|key| ctx.claims().is_active(key))
    }

    fn release(&mut self, host: &mut dyn EntityHost) -> Result<RunningState, ModuleError> {
        if let Some(hold) = self.hold.take() {
            tracing::debug!(hand = %self.hand, entity = %hold.target.short(), "distance grab release");
            call_if_present(host, hold.target, "releaseGrab", &[self.hand.as_str()])?;
        }
        Ok(RunningState::idle())
    }

    fn search(&mut self, ctx: &mut FrameContext<'_>) -> Result<RunningState, ModuleError> {
        let input = ctx.snapshot().hand(self.hand);
        let Some(hand_position) = input.position() else {
            return Ok(RunningState::active_empty());
        };
        let reachable = nearest_entity(ctx, input, self.near_radius, |p| {
            p.has_marker(Marker::Grabbable) && !p.locked
        });
        if reachable.is_some() {
            tracing::trace!(hand = %self.hand, "near grab in reach, ending search");
            return Ok(RunningState::idle());
        }
        let Some(hit) = input.ray_pick.hit_of_kind(ObjectKind::Entity) else {
            return Ok(RunningState::active_empty());
        };
        let triggerable = ctx
            .host_ref()
            .properties(hit.target)
            .is_some_and(|p| p.has_marker(Marker::Triggerable));
        if triggerable {
            tracing::trace!(hand = %self.hand, entity = %hit.target.short(), "ray on triggerable, ending search");
            return Ok(RunningState::idle());
        }
        if !input.trigger_click {
            return Ok(RunningState::active_empty());
        }
        let Some(props) = ctx.host_ref().properties(hit.target) else {
            return Ok(RunningState::active_empty());
        };
        if !props.has_marker(Marker::Grabbable) || props.locked {
            return Ok(RunningState::active_empty());
        }
        if ctx.claims().is_claimed_by_other(hit.target, ctx.me()) {
            tracing::debug!(hand = %self.hand, entity = %hit.target.short(), "target claimed elsewhere");
            return Ok(RunningState::active_empty());
        }

        tracing::debug!(
            hand = %self.hand,
            entity = %hit.target.short(),
            distance = hit.distance,
            "distance grab start"
        );
        ctx.host()
            .call_method(hit.target, "startDistanceGrab", &[self.hand.as_str()])?;
        ctx.host()
            .haptic_pulse(self.hand, self.haptic_strength, self.haptic_duration_ms);
        self.hold = Some(DistanceHold {
            target: hit.target,
            distance: props.position().distance(hand_position),
        });
        Ok(RunningState::active_with([hit.target]))
    }

    fn drag(
        &mut self,
        ctx: &mut FrameContext<'_>,
        hold: DistanceHold,
    ) -> Result<RunningState, ModuleError> {
        let Some(props) = ctx.host_ref().properties(hold.target) else {
            self.hold = None;
            return Ok(RunningState::idle().with_abort([hold.target]));
        };
        let Some(pose) = ctx.snapshot().hand(self.hand).pose else {
            return Ok(RunningState::active_with([hold.target]));
        };
        if surface_distance(&props, pose.position) <= self.near_radius {
            tracing::debug!(hand = %self.hand, "target in near range, handing over");
            return self.release(ctx.host());
        }
        let destination = pose.position + pose.pointing() * hold.distance;
        ctx.host().set_position(hold.target, destination)?;
        ctx.host()
            .call_method(hold.target, "continueDistanceGrab", &[self.hand.as_str()])?;
        Ok(RunningState::active_with([hold.target]))
    }
}

impl DispatchModule for FarGrabEntity {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn is_ready(&mut self, ctx: &mut FrameContext<'_>) -> Result<RunningState, ModuleError> {
        let input = ctx.snapshot().hand(self.hand);
        self.hold = None;
        if self.other_hand_active(ctx) {
            return Ok(RunningState::idle());
        }
        let on_entity = input.ray_pick.hit_of_kind(ObjectKind::Entity).is_some();
        if input.trigger > self.trigger_on && on_entity {
            return Ok(RunningState::active_empty());
        }
        Ok(RunningState::idle())
    }

    fn run(&mut self, ctx: &mut FrameContext<'_>) -> Result<RunningState, ModuleError> {
        if ctx.snapshot().hand(self.hand).trigger < self.trigger_off {
            return self.release(ctx.host());
        }
        match self.hold {
            Some(hold) => self.drag(ctx, hold),
            None => self.search(ctx),
        }
    }

    fn link(&mut self, peers: &PeerLinker) {
        self.other_hand = peers.resolve(&module_name(self.hand.other(), Self::NAME));
    }

    fn has_cleanup(&self) -> bool {
        true
    }

    fn cleanup(&mut self, host: &mut dyn EntityHost) {
        if let Err(e) = self.release(host) {
            tracing::warn!(hand = %self.hand, error = %e, "release on teardown failed");
        }
    }
}
