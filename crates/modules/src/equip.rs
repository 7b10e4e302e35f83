use crate::support::nearest_entity;
use glam::Vec3;
use handspace_common::{EntityId, Hand, Marker};
use handspace_dispatch::{
    DispatchConfig, DispatchModule, EntityHost, FrameContext, ModuleDescriptor, ModuleError,
    RunningState, Slot, call_if_present,
};

pub const EQUIP_PRIORITY: i32 = 300;

#[derive(Debug, Clone, Copy)]
struct Equipped {
    target: EntityId,
    offset: Vec3,
    /// `startEquip` is held back until the squeeze that equipped is let go,
    /// so tools do not fire the moment they attach.
    start_pending: bool,
}

/// Attaches an equippable entity to the hand. Claims both the hand and the
/// hand's equip slot; a second squeeze drops the item.
#[derive(Debug, Clone)]
pub struct EquipEntity {
    hand: Hand,
    descriptor: ModuleDescriptor,
    trigger_on: f32,
    trigger_off: f32,
    radius: f32,
    haptic_strength: f32,
    haptic_duration_ms: f32,
    equipped: Option<Equipped>,
    wait_for_release: bool,
}

impl EquipEntity {
    pub const NAME: &'static str = "EquipEntity";

    pub fn new(hand: Hand, config: &DispatchConfig) -> Self {
        Self {
            hand,
            descriptor: ModuleDescriptor::new(EQUIP_PRIORITY, [Slot::hand(hand), Slot::equip(hand)]),
            trigger_on: config.trigger_on_value,
            trigger_off: config.trigger_off_value,
            radius: config.equip_radius,
            haptic_strength: config.haptic_strength,
            haptic_duration_ms: config.haptic_duration_ms,
            equipped: None,
            wait_for_release: false,
        }
    }

    fn squeezed(&self, trigger: f32, secondary: f32) -> bool {
        trigger > self.trigger_on || secondary > self.trigger_on
    }

    fn released(&self, trigger: f32, secondary: f32) -> bool {
        trigger < self.trigger_off && secondary < self.trigger_off
    }

    fn drop_item(&mut self, host: &mut dyn EntityHost) -> Result<(), ModuleError> {
        if let Some(item) = self.equipped.take() {
            tracing::debug!(hand = %self.hand, entity = %item.target.short(), "unequip");
            call_if_present(host, item.target, "releaseEquip", &[self.hand.as_str()])?;
        }
        Ok(())
    }
}

impl DispatchModule for EquipEntity {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn is_ready(&mut self, ctx: &mut FrameContext<'_>) -> Result<RunningState, ModuleError> {
        let input = ctx.snapshot().hand(self.hand);
        if self.released(input.trigger, input.secondary) {
            self.wait_for_release = false;
        }
        if self.wait_for_release || !self.squeezed(input.trigger, input.secondary) {
            return Ok(RunningState::idle());
        }
        let Some(hand_position) = input.position() else {
            return Ok(RunningState::idle());
        };
        let claims = ctx.claims();
        let me = ctx.me();
        let candidate = nearest_entity(ctx, input, self.radius, |p| p.has_marker(Marker::Equippable))
            .filter(|(id, _)| !claims.is_claimed_by_other(*id, me));
        let Some((target, props)) = candidate else {
            return Ok(RunningState::idle());
        };

        tracing::debug!(hand = %self.hand, entity = %target.short(), "equip");
        ctx.host()
            .haptic_pulse(self.hand, self.haptic_strength, self.haptic_duration_ms);
        self.equipped = Some(Equipped {
            target,
            offset: props.position() - hand_position,
            start_pending: true,
        });
        self.wait_for_release = true;
        Ok(RunningState::active_with([target]))
    }

    fn run(&mut self, ctx: &mut FrameContext<'_>) -> Result<RunningState, ModuleError> {
        let Some(mut item) = self.equipped else {
            return Ok(RunningState::idle());
        };
        if !ctx.host_ref().exists(item.target) {
            self.equipped = None;
            return Ok(RunningState::idle());
        }
        let input = ctx.snapshot().hand(self.hand);
        let hand = self.hand.as_str();

        if self.released(input.trigger, input.secondary) {
            if item.start_pending {
                ctx.host().call_method(item.target, "startEquip", &[hand])?;
                item.start_pending = false;
            }
            self.wait_for_release = false;
        } else if !self.wait_for_release && self.squeezed(input.trigger, input.secondary) {
            self.wait_for_release = true;
            self.drop_item(ctx.host())?;
            return Ok(RunningState::idle());
        }

        if let Some(hand_position) = input.position() {
            ctx.host().set_position(item.target, hand_position + item.offset)?;
        }
        if !item.start_pending {
            ctx.host().call_method(item.target, "continueEquip", &[hand])?;
        }
        self.equipped = Some(item);
        Ok(RunningState::active_with([item.target]))
    }

    fn has_cleanup(&self) -> bool {
        true
    }

    fn cleanup(&mut self, host: &mut dyn EntityHost) {
        if let Err(e) = self.drop_item(host) {
            tracing::warn!(hand = %self.hand, error = %e, "unequip on teardown failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::near_grab::NearGrabEntity;
    use crate::support::testing::{aimed, step, world_with};
    use handspace_common::EntityProperties;
    use handspace_dispatch::Dispatcher;

    fn flashlight() -> EntityProperties {
        EntityProperties::named("flashlight")
            .at(Vec3::new(0.0, 1.0, -0.15))
            .with_radius(0.05)
            .with_marker(Marker::Equippable)
    }

    fn equip_dispatcher() -> Dispatcher {
        let mut d = Dispatcher::new();
        d.enable(
            "RightEquipEntity",
            Box::new(EquipEntity::new(Hand::Right, &DispatchConfig::default())),
        )
        .unwrap();
        d
    }

    #[test]
    fn start_is_deferred_until_release_and_second_squeeze_drops() {
        let (mut host, ids) = world_with(vec![flashlight()]);
        let item = ids[0];
        let mut d = equip_dispatcher();
        let hand = Vec3::new(0.0, 1.0, 0.0);
        let aim = Vec3::new(0.0, 1.0, -1.0);

        step(&mut d, &mut host, aimed(hand, aim, 0.9));
        assert_eq!(d.owner(Slot::RightHand), Some("RightEquipEntity"));
        assert_eq!(d.owner(Slot::RightHandEquip), Some("RightEquipEntity"));
        assert_eq!(host.haptics().len(), 1);

        // Still squeezed: nothing sent yet.
        step(&mut d, &mut host, aimed(hand, aim, 0.9));
        assert!(host.world().calls_on(item).is_empty());

        step(&mut d, &mut host, aimed(hand, aim, 0.0));
        step(&mut d, &mut host, aimed(hand, aim, 0.0));
        assert_eq!(host.world().calls_on(item), vec!["startEquip", "continueEquip", "continueEquip"]);

        step(&mut d, &mut host, aimed(hand, aim, 0.9));
        assert_eq!(host.world().calls_on(item).last().copied(), Some("releaseEquip"));
        assert!(d.owner(Slot::RightHand).is_none());

        // The dropping squeeze does not immediately re-equip.
        step(&mut d, &mut host, aimed(hand, aim, 0.9));
        assert!(d.owner(Slot::RightHand).is_none());
    }

    #[test]
    fn equipped_item_follows_hand() {
        let (mut host, ids) = world_with(vec![flashlight()]);
        let mut d = equip_dispatcher();
        let aim = Vec3::new(0.0, 1.0, -1.0);
        step(&mut d, &mut host, aimed(Vec3::new(0.0, 1.0, 0.0), aim, 0.9));
        step(&mut d, &mut host, aimed(Vec3::new(0.0, 2.0, 0.0), aim, 0.0));
        let position = host.world().get(ids[0]).unwrap().position();
        assert!((position - Vec3::new(0.0, 2.0, -0.15)).length() < 1e-4);
    }

    #[test]
    fn near_grab_holding_the_hand_blocks_equip() {
        let cup = EntityProperties::named("cup")
            .at(Vec3::new(0.0, 1.0, -0.1))
            .with_radius(0.05)
            .with_marker(Marker::Grabbable);
        let (mut host, _) = world_with(vec![cup, flashlight()]);
        let config = DispatchConfig::default();
        let mut d = equip_dispatcher();
        d.enable("RightNearGrabEntity", Box::new(NearGrabEntity::new(Hand::Right, &config)))
            .unwrap();

        step(&mut d, &mut host, aimed(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Z, 0.9));
        assert_eq!(d.owner(Slot::RightHand), Some("RightNearGrabEntity"));
        assert!(d.owner(Slot::RightHandEquip).is_none());
        assert_eq!(d.stats("RightEquipEntity").unwrap().is_ready_calls, 0);
    }
}
