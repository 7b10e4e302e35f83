use crate::support::module_name;
use handspace_common::{EntityId, Hand, ObjectKind};
use handspace_dispatch::{
    DispatchConfig, DispatchModule, EntityHost, FrameContext, ModuleDescriptor, ModuleError,
    ModuleKey, PeerLinker, RunningState, Slot, call_if_present,
};

pub const WEB_LASER_PRIORITY: i32 = 550;
const PRESS_HAPTIC_DURATION_MS: f32 = 20.0;

/// Drives web entities with the hand laser as a pointer: hover while the ray
/// is on the page, press and release on trigger click edges.
#[derive(Debug, Clone)]
pub struct WebEntityLaserInput {
    hand: Hand,
    descriptor: ModuleDescriptor,
    trigger_on: f32,
    haptic_strength: f32,
    other_hand: Option<ModuleKey>,
    target: Option<EntityId>,
    pressed: bool,
}

impl WebEntityLaserInput {
    pub const NAME: &'static str = "WebEntityLaserInput";

    pub fn new(hand: Hand, config: &DispatchConfig) -> Self {
        Self {
            hand,
            descriptor: ModuleDescriptor::new(WEB_LASER_PRIORITY, [Slot::hand(hand)])
                .with_parameter("laser_hand", hand.as_str()),
            trigger_on: config.trigger_on_value,
            haptic_strength: config.haptic_strength,
            other_hand: None,
            target: None,
            pressed: false,
        }
    }

    /// End any press and hover on the current page.
    fn leave(&mut self, host: &mut dyn EntityHost) -> Result<(), ModuleError> {
        let Some(target) = self.target.take() else {
            return Ok(());
        };
        let hand = self.hand.as_str();
        if std::mem::take(&mut self.pressed) {
            call_if_present(host, target, "mouseReleaseOnEntity", &[hand])?;
        }
        call_if_present(host, target, "hoverLeaveEntity", &[hand])?;
        Ok(())
    }

    fn enter(&mut self, host: &mut dyn EntityHost, target: EntityId) -> Result<(), ModuleError> {
        host.call_method(target, "hoverEnterEntity", &[self.hand.as_str()])?;
        self.target = Some(target);
        self.pressed = false;
        Ok(())
    }
}

impl DispatchModule for WebEntityLaserInput {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn is_ready(&mut self, ctx: &mut FrameContext<'_>) -> Result<RunningState, ModuleError> {
        self.target = None;
        self.pressed = false;
        if self.other_hand.is_some_and(|key| ctx.claims().is_active(key)) {
            return Ok(RunningState::idle());
        }
        let Some(hit) = ctx.snapshot().hand(self.hand).ray_pick.hit_of_kind(ObjectKind::Web) else {
            return Ok(RunningState::idle());
        };
        let target = hit.target;
        tracing::debug!(hand = %self.hand, page = %target.short(), "laser on web entity");
        self.enter(ctx.host(), target)?;
        Ok(RunningState::active_with([target]))
    }

    fn run(&mut self, ctx: &mut FrameContext<'_>) -> Result<RunningState, ModuleError> {
        let input = ctx.snapshot().hand(self.hand);
        let Some(hit) = input.ray_pick.hit_of_kind(ObjectKind::Web) else {
            self.leave(ctx.host())?;
            return Ok(RunningState::idle());
        };
        if self.target != Some(hit.target) {
            self.leave(ctx.host())?;
            self.enter(ctx.host(), hit.target)?;
        }

        let hand = self.hand.as_str();
        match (input.trigger_click, self.pressed) {
            (true, false) => {
                ctx.host().call_method(hit.target, "mousePressOnEntity", &[hand])?;
                ctx.host()
                    .haptic_pulse(self.hand, self.haptic_strength, PRESS_HAPTIC_DURATION_MS);
                self.pressed = true;
            }
            (true, true) => {
                ctx.host().call_method(hit.target, "holdingClickOnEntity", &[hand])?;
            }
            (false, true) => {
                ctx.host().call_method(hit.target, "mouseReleaseOnEntity", &[hand])?;
                self.pressed = false;
            }
            (false, false) if input.trigger > self.trigger_on => {
                ctx.host().call_method(hit.target, "hoverOverEntity", &[hand])?;
            }
            (false, false) => {}
        }
        Ok(RunningState::active_with([hit.target]))
    }

    fn link(&mut self, peers: &PeerLinker) {
        self.other_hand = peers.resolve(&module_name(self.hand.other(), Self::NAME));
    }

    fn has_cleanup(&self) -> bool {
        true
    }

    fn cleanup(&mut self, host: &mut dyn EntityHost) {
        if let Err(e) = self.leave(host) {
            tracing::warn!(hand = %self.hand, error = %e, "web laser teardown failed");
        }
    }
}
