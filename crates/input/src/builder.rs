use crate::controller::{ClickDebouncer, ControllerSample, RawInput};
use crate::pick;
use handspace_common::Hand;
use handspace_dispatch::{DispatchConfig, HandInput, InputSnapshot, RayPick, SnapshotError};
use handspace_kernel::World;

/// Turns raw controller samples into validated snapshots, one per frame.
///
/// Holds the per-hand click debouncers, so the same builder must be used for
/// consecutive frames.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    config: DispatchConfig,
    clicks: [ClickDebouncer; 2],
    next_frame: u64,
}

impl SnapshotBuilder {
    pub fn new(config: DispatchConfig) -> Self {
        let click = ClickDebouncer::new(config.click_on_value, config.click_off_value);
        Self {
            config,
            clicks: [click; 2],
            next_frame: 0,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Build the next snapshot. Nothing is updated when the input is rejected.
    pub fn build(
        &mut self,
        world: &World,
        raw: &RawInput,
        delta_time: f32,
    ) -> Result<InputSnapshot, SnapshotError> {
        if delta_time.is_nan() || delta_time < 0.0 {
            return Err(SnapshotError::NegativeDelta(delta_time));
        }
        for hand in Hand::ALL {
            validate(hand, raw.hand(hand))?;
        }

        let mut snapshot = InputSnapshot {
            frame: self.next_frame,
            delta_time,
            ..InputSnapshot::default()
        };
        for hand in Hand::ALL {
            let sample = raw.hand(hand);
            let trigger = sample.trigger.clamp(0.0, 1.0);
            let trigger_click = self.clicks[hand.index()].update(trigger);
            *snapshot.hand_mut(hand) = self.hand_input(world, sample, trigger, trigger_click);
        }
        self.next_frame += 1;
        Ok(snapshot)
    }

    fn hand_input(
        &self,
        world: &World,
        sample: &ControllerSample,
        trigger: f32,
        trigger_click: bool,
    ) -> HandInput {
        let (ray_pick, nearby) = match sample.pose {
            Some(pose) => (
                pick::ray_pick(world, pose.position, pose.pointing(), self.config.pick_max_distance),
                pick::nearby(world, pose.position, self.config.nearby_search_radius),
            ),
            None => (RayPick::miss(), Vec::new()),
        };
        HandInput {
            trigger,
            trigger_click,
            secondary: sample.secondary.clamp(0.0, 1.0),
            thumbstick: sample.thumbstick.clamp(-1.0, 1.0),
            pose: sample.pose,
            ray_pick,
            nearby,
        }
    }
}

fn validate(hand: Hand, sample: &ControllerSample) -> Result<(), SnapshotError> {
    if !sample.trigger.is_finite() {
        return Err(SnapshotError::NonFinite { hand, field: "trigger" });
    }
    if !sample.secondary.is_finite() {
        return Err(SnapshotError::NonFinite { hand, field: "secondary" });
    }
    if !sample.thumbstick.is_finite() {
        return Err(SnapshotError::NonFinite { hand, field: "thumbstick" });
    }
    if sample.pose.is_some_and(|pose| !pose.is_finite()) {
        return Err(SnapshotError::NonFinite { hand, field: "pose" });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use handspace_common::{EntityProperties, Transform};

    fn pointing_forward() -> ControllerSample {
        ControllerSample::tracked(Transform::from_position(Vec3::new(0.0, 1.0, 0.0)))
    }

    #[test]
    fn builds_picks_for_tracked_hands() {
        let mut world = World::new();
        let target = world.spawn(EntityProperties::named("box").at(Vec3::new(0.0, 1.0, -2.0)));
        let mut builder = SnapshotBuilder::new(DispatchConfig::default());
        let raw = RawInput {
            right: pointing_forward().with_trigger(0.6),
            ..RawInput::default()
        };

        let snap = builder.build(&world, &raw, 0.016).unwrap();
        let right = snap.hand(Hand::Right);
        assert_eq!(right.trigger, 0.6);
        assert!(!right.trigger_click);
        assert_eq!(right.ray_pick.target(), Some(target));
        assert!(!snap.hand(Hand::Left).ray_pick.is_hit());
        assert!(snap.hand(Hand::Left).pose.is_none());
    }

    #[test]
    fn frames_are_numbered_and_click_persists() {
        let world = World::new();
        let mut builder = SnapshotBuilder::new(DispatchConfig::default());
        let mut raw = RawInput::default();
        raw.right = pointing_forward().with_trigger(1.0);
        let first = builder.build(&world, &raw, 0.016).unwrap();
        raw.right.trigger = 0.85;
        let second = builder.build(&world, &raw, 0.016).unwrap();

        assert_eq!((first.frame, second.frame), (0, 1));
        assert!(first.hand(Hand::Right).trigger_click);
        assert!(second.hand(Hand::Right).trigger_click);
    }

    #[test]
    fn rejects_non_finite_input() {
        let world = World::new();
        let mut builder = SnapshotBuilder::new(DispatchConfig::default());
        let mut raw = RawInput::default();
        raw.left.trigger = f32::NAN;
        assert_eq!(
            builder.build(&world, &raw, 0.016),
            Err(SnapshotError::NonFinite {
                hand: Hand::Left,
                field: "trigger"
            })
        );

        raw.left.trigger = 0.0;
        raw.right = ControllerSample::tracked(Transform::from_position(Vec3::splat(f32::INFINITY)));
        assert!(matches!(
            builder.build(&world, &raw, 0.016),
            Err(SnapshotError::NonFinite { field: "pose", .. })
        ));

        raw.right = ControllerSample::default().with_thumbstick(f32::NAN);
        assert!(matches!(
            builder.build(&world, &raw, 0.016),
            Err(SnapshotError::NonFinite { field: "thumbstick", .. })
        ));

        let ok = builder.build(&world, &RawInput::default(), 0.016).unwrap();
        assert_eq!(ok.frame, 0);
    }

    #[test]
    fn rejects_negative_delta() {
        let world = World::new();
        let mut builder = SnapshotBuilder::new(DispatchConfig::default());
        assert_eq!(
            builder.build(&world, &RawInput::default(), -1.0),
            Err(SnapshotError::NegativeDelta(-1.0))
        );
    }
}
