use crate::support::nearest_entity;
use handspace_common::{EntityId, Hand, Marker};
use handspace_dispatch::{
    DispatchConfig, DispatchModule, FrameContext, ModuleDescriptor, ModuleError, RunningState,
    Slot, call_if_present,
};

pub const NEAR_TRIGGER_PRIORITY: i32 = 120;

/// Triggers the nearest triggerable entity within reach of the hand.
#[derive(Debug, Clone)]
pub struct NearTriggerEntity {
    hand: Hand,
    descriptor: ModuleDescriptor,
    trigger_on: f32,
    trigger_off: f32,
    radius: f32,
    target: Option<EntityId>,
}

impl NearTriggerEntity {
    pub const NAME: &'static str = "NearTriggerEntity";

    pub fn new(hand: Hand, config: &DispatchConfig) -> Self {
        Self {
            hand,
            descriptor: ModuleDescriptor::new(NEAR_TRIGGER_PRIORITY, [Slot::hand(hand)]),
            trigger_on: config.trigger_on_value,
            trigger_off: config.trigger_off_value,
            radius: config.near_trigger_radius,
            target: None,
        }
    }
}

impl DispatchModule for NearTriggerEntity {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn is_ready(&mut self, ctx: &mut FrameContext<'_>) -> Result<RunningState, ModuleError> {
        let input = ctx.snapshot().hand(self.hand);
        if input.trigger <= self.trigger_on {
            return Ok(RunningState::idle());
        }
        let Some((target, _)) =
            nearest_entity(ctx, input, self.radius, |p| p.has_marker(Marker::Triggerable))
        else {
            return Ok(RunningState::idle());
        };
        ctx.host().call_method(target, "startNearTrigger", &[self.hand.as_str()])?;
        self.target = Some(target);
        Ok(RunningState::active_with([target]))
    }

    fn run(&mut self, ctx: &mut FrameContext<'_>) -> Result<RunningState, ModuleError> {
        let Some(target) = self.target else {
            return Ok(RunningState::idle());
        };
        if !ctx.host_ref().exists(target) {
            self.target = None;
            return Ok(RunningState::idle());
        }
        if ctx.snapshot().hand(self.hand).trigger < self.trigger_off {
            self.target = None;
            call_if_present(ctx.host(), target, "stopNearTrigger", &[self.hand.as_str()])?;
            return Ok(RunningState::idle());
        }
        ctx.host().call_method(target, "continueNearTrigger", &[self.hand.as_str()])?;
        Ok(RunningState::active_with([target]))
    }
}
