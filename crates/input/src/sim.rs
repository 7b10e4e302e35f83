use crate::builder::SnapshotBuilder;
use crate::controller::{ControllerSample, RawInput};
use glam::Vec3;
use handspace_common::{EntityId, EntityProperties, Hand};
use handspace_dispatch::{
    DispatchConfig, EntityHost, HostError, InputSnapshot, SnapshotError, SnapshotSource,
};
use handspace_kernel::World;

/// A haptic pulse requested by a module.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HapticPulse {
    pub hand: Hand,
    pub strength: f32,
    pub duration_ms: f32,
}

/// In-process host: a [`World`] plus scripted controller input.
///
/// Each `capture` builds a snapshot from the current input and then steps
/// the world.
#[derive(Debug)]
pub struct SimHost {
    world: World,
    raw: RawInput,
    builder: SnapshotBuilder,
    delta_time: f32,
    haptics: Vec<HapticPulse>,
    avatar: Vec3,
    /// Avatar destinations since the last drain.
    teleports: Vec<Vec3>,
}

impl SimHost {
    pub fn new(world: World, config: DispatchConfig) -> Self {
        Self {
            world,
            raw: RawInput::default(),
            builder: SnapshotBuilder::new(config),
            delta_time: 1.0 / 90.0,
            haptics: Vec::new(),
            avatar: Vec3::ZERO,
            teleports: Vec::new(),
        }
    }

    pub fn with_delta_time(mut self, delta_time: f32) -> Self {
        self.delta_time = delta_time;
        self
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn input(&self) -> &RawInput {
        &self.raw
    }

    pub fn set_input(&mut self, raw: RawInput) {
        self.raw = raw;
    }

    pub fn set_hand(&mut self, hand: Hand, sample: ControllerSample) {
        *self.raw.hand_mut(hand) = sample;
    }

    pub fn haptics(&self) -> &[HapticPulse] {
        &self.haptics
    }

    pub fn drain_haptics(&mut self) -> Vec<HapticPulse> {
        std::mem::take(&mut self.haptics)
    }

    pub fn avatar_position(&self) -> Vec3 {
        self.avatar
    }

    pub fn drain_teleports(&mut self) -> Vec<Vec3> {
        std::mem::take(&mut self.teleports)
    }
}

impl SnapshotSource for SimHost {
    fn capture(&mut self) -> Result<InputSnapshot, SnapshotError> {
        let snapshot = self.builder.build(&self.world, &self.raw, self.delta_time)?;
        self.world.step();
        Ok(snapshot)
    }
}

impl EntityHost for SimHost {
    fn exists(&self, id: EntityId) -> bool {
        self.world.contains(id)
    }

    fn properties(&self, id: EntityId) -> Option<EntityProperties> {
        self.world.get(id).cloned()
    }

    fn call_method(&mut self, id: EntityId, method: &str, args: &[&str]) -> Result<(), HostError> {
        if self.world.record_call(id, method, args) {
            Ok(())
        } else {
            Err(HostError::NoSuchObject(id))
        }
    }

    fn set_position(&mut self, id: EntityId, position: Vec3) -> Result<(), HostError> {
        if self.world.set_position(id, position) {
            Ok(())
        } else {
            Err(HostError::NoSuchObject(id))
        }
    }

    fn haptic_pulse(&mut self, hand: Hand, strength: f32, duration_ms: f32) {
        tracing::trace!(%hand, strength, duration_ms, "haptic pulse");
        self.haptics.push(HapticPulse {
            hand,
            strength,
            duration_ms,
        });
    }

    fn move_avatar(&mut self, position: Vec3) -> Result<(), HostError> {
        if !position.is_finite() {
            return Err(HostError::CallFailed {
                method: "move_avatar".into(),
                reason: format!("non-finite destination {position}"),
            });
        }
        tracing::debug!(from = %self.avatar, to = %position, "avatar moved");
        self.avatar = position;
        self.teleports.push(position);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handspace_common::Transform;

    #[test]
    fn capture_steps_the_world() {
        let mut host = SimHost::new(World::new(), DispatchConfig::default());
        host.set_hand(
            Hand::Right,
            ControllerSample::tracked(Transform::from_position(Vec3::Y)).with_trigger(0.4),
        );
        let snap = host.capture().unwrap();
        assert_eq!(snap.hand(Hand::Right).trigger, 0.4);
        assert_eq!(host.world().tick(), 1);
    }

    #[test]
    fn calls_on_missing_objects_fail() {
        let mut host = SimHost::new(World::new(), DispatchConfig::default());
        let id = host.world_mut().spawn(EntityProperties::named("lever"));
        assert!(host.call_method(id, "startNearTrigger", &["right"]).is_ok());
        assert_eq!(host.world().calls_on(id), vec!["startNearTrigger"]);

        host.world_mut().despawn(id);
        assert_eq!(
            host.call_method(id, "stopNearTrigger", &["right"]),
            Err(HostError::NoSuchObject(id))
        );
        assert!(!host.exists(id));
        assert!(host.set_position(id, Vec3::ZERO).is_err());
    }

    #[test]
    fn avatar_moves_are_logged() {
        let mut host = SimHost::new(World::new(), DispatchConfig::default());
        host.move_avatar(Vec3::new(0.0, 0.5, -4.0)).unwrap();
        assert_eq!(host.avatar_position(), Vec3::new(0.0, 0.5, -4.0));
        assert!(host.move_avatar(Vec3::splat(f32::NAN)).is_err());
        assert_eq!(host.drain_teleports(), vec![Vec3::new(0.0, 0.5, -4.0)]);
        assert!(host.drain_teleports().is_empty());
    }

    #[test]
    fn haptics_are_logged() {
        let mut host = SimHost::new(World::new(), DispatchConfig::default());
        host.haptic_pulse(Hand::Left, 1.0, 13.0);
        assert_eq!(host.haptics().len(), 1);
        assert_eq!(host.drain_haptics()[0].hand, Hand::Left);
        assert!(host.haptics().is_empty());
    }
}
