use handspace_common::{EntityId, Hand, Marker, ObjectKind};
use handspace_dispatch::{
    DispatchConfig, DispatchModule, FrameContext, ModuleDescriptor, ModuleError, RunningState,
    Slot, call_if_present,
};

pub const FAR_TRIGGER_PRIORITY: i32 = 520;

/// Fires `startFarTrigger` on a triggerable entity the hand ray points at,
/// then `continueFarTrigger` each frame the trigger stays squeezed on it.
#[derive(Debug, Clone)]
pub struct FarTriggerEntity {
    hand: Hand,
    descriptor: ModuleDescriptor,
    trigger_on: f32,
    trigger_off: f32,
    target: Option<EntityId>,
}

impl FarTriggerEntity {
    pub const NAME: &'static str = "FarTriggerEntity";

    pub fn new(hand: Hand, config: &DispatchConfig) -> Self {
        Self {
            hand,
            descriptor: ModuleDescriptor::new(FAR_TRIGGER_PRIORITY, [Slot::hand(hand)])
                .with_parameter("laser_hand", hand.as_str()),
            trigger_on: config.trigger_on_value,
            trigger_off: config.trigger_off_value,
            target: None,
        }
    }

    fn end(&mut self, ctx: &mut FrameContext<'_>) -> Result<RunningState, ModuleError> {
        if let Some(target) = self.target.take() {
            call_if_present(ctx.host(), target, "stopFarTrigger", &[self.hand.as_str()])?;
        }
        Ok(RunningState::idle())
    }
}

impl DispatchModule for FarTriggerEntity {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn is_ready(&mut self, ctx: &mut FrameContext<'_>) -> Result<RunningState, ModuleError> {
        let input = ctx.snapshot().hand(self.hand);
        if input.trigger <= self.trigger_on {
            return Ok(RunningState::idle());
        }
        let Some(hit) = input.ray_pick.hit_of_kind(ObjectKind::Entity) else {
            return Ok(RunningState::idle());
        };
        let triggerable = ctx
            .host_ref()
            .properties(hit.target)
            .is_some_and(|p| p.has_marker(Marker::Triggerable));
        if !triggerable {
            return Ok(RunningState::idle());
        }
        tracing::debug!(hand = %self.hand, entity = %hit.target.short(), "far trigger start");
        ctx.host().call_method(hit.target, "startFarTrigger", &[self.hand.as_str()])?;
        self.target = Some(hit.target);
        Ok(RunningState::active_with([hit.target]))
    }

    fn run(&mut self, ctx: &mut FrameContext<'_>) -> Result<RunningState, ModuleError> {
        let Some(target) = self.target else {
            return Ok(RunningState::idle());
        };
        if !ctx.host_ref().exists(target) {
            tracing::debug!(hand = %self.hand, entity = %target.short(), "far trigger target vanished");
            self.target = None;
            return Ok(RunningState::idle().with_abort([target]));
        }
        let input = ctx.snapshot().hand(self.hand);
        if input.trigger < self.trigger_off || input.ray_pick.target() != Some(target) {
            return self.end(ctx);
        }
        ctx.host().call_method(target, "continueFarTrigger", &[self.hand.as_str()])?;
        Ok(RunningState::active_with([target]))
    }
}
