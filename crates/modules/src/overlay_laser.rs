use handspace_common::{EntityId, Hand, ObjectKind};
use handspace_dispatch::{
    DispatchConfig, DispatchModule, EntityHost, FrameContext, ModuleDescriptor, ModuleError,
    RunningState, Slot, call_if_present,
};

pub const OVERLAY_LASER_PRIORITY: i32 = 200;

/// Laser pointer for overlays (tablets, menus). Forwards trigger clicks to
/// the overlay under the ray as press and release events.
#[derive(Debug, Clone)]
pub struct OverlayLaserInput {
    hand: Hand,
    descriptor: ModuleDescriptor,
    trigger_on: f32,
    trigger_off: f32,
    target: Option<EntityId>,
    pressed: bool,
}

impl OverlayLaserInput {
    pub const NAME: &'static str = "OverlayLaserInput";

    pub fn new(hand: Hand, config: &DispatchConfig) -> Self {
        Self {
            hand,
            descriptor: ModuleDescriptor::new(OVERLAY_LASER_PRIORITY, [Slot::hand(hand)])
                .with_parameter("laser_hand", hand.as_str()),
            trigger_on: config.trigger_on_value,
            trigger_off: config.trigger_off_value,
            target: None,
            pressed: false,
        }
    }

    fn unpress(&mut self, host: &mut dyn EntityHost) -> Result<(), ModuleError> {
        if let (Some(target), true) = (self.target, self.pressed) {
            call_if_present(host, target, "laserRelease", &[self.hand.as_str()])?;
        }
        self.pressed = false;
        Ok(())
    }

    fn exit(&mut self, host: &mut dyn EntityHost) -> Result<RunningState, ModuleError> {
        self.unpress(host)?;
        self.target = None;
        Ok(RunningState::idle())
    }

    /// Send press/release on click edges against the current target.
    fn forward_click(
        &mut self,
        ctx: &mut FrameContext<'_>,
        target: EntityId,
    ) -> Result<(), ModuleError> {
        let click = ctx.snapshot().hand(self.hand).trigger_click;
        if click && !self.pressed {
            ctx.host().call_method(target, "laserPress", &[self.hand.as_str()])?;
            self.pressed = true;
        } else if !click && self.pressed {
            ctx.host().call_method(target, "laserRelease", &[self.hand.as_str()])?;
            self.pressed = false;
        }
        Ok(())
    }
}

impl DispatchModule for OverlayLaserInput {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn is_ready(&mut self, ctx: &mut FrameContext<'_>) -> Result<RunningState, ModuleError> {
        let input = ctx.snapshot().hand(self.hand);
        if input.trigger <= self.trigger_on {
            return Ok(RunningState::idle());
        }
        let Some(hit) = input.ray_pick.hit_of_kind(ObjectKind::Overlay) else {
            return Ok(RunningState::idle());
        };
        self.target = Some(hit.target);
        self.pressed = false;
        self.forward_click(ctx, hit.target)?;
        Ok(RunningState::active_with([hit.target]))
    }

    fn run(&mut self, ctx: &mut FrameContext<'_>) -> Result<RunningState, ModuleError> {
        let input = ctx.snapshot().hand(self.hand);
        if input.trigger < self.trigger_off {
            return self.exit(ctx.host());
        }
        let Some(hit) = input.ray_pick.hit_of_kind(ObjectKind::Overlay) else {
            return self.exit(ctx.host());
        };
        if self.target != Some(hit.target) {
            tracing::debug!(
                hand = %self.hand,
                overlay = %hit.target.short(),
                "laser moved to another overlay"
            );
            self.unpress(ctx.host())?;
            self.target = Some(hit.target);
        }
        self.forward_click(ctx, hit.target)?;
        Ok(RunningState::active_with([hit.target]))
    }
}
