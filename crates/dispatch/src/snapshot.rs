use glam::Vec3;
use handspace_common::{EntityId, Hand, ObjectKind, Transform};
use serde::{Deserialize, Serialize};

/// Nearest intersection of a hand ray.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RayHit {
    pub target: EntityId,
    pub kind: ObjectKind,
    pub distance: f32,
    pub point: Vec3,
}

/// Ray-pick result for one hand. `hit` is `None` when the ray hit nothing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RayPick {
    pub hit: Option<RayHit>,
}

impl RayPick {
    pub fn miss() -> Self {
        Self { hit: None }
    }

    pub fn hit(hit: RayHit) -> Self {
        Self { hit: Some(hit) }
    }

    pub fn is_hit(&self) -> bool {
        self.hit.is_some()
    }

    pub fn target(&self) -> Option<EntityId> {
        self.hit.map(|h| h.target)
    }

    /// The hit, if it landed on an object of `kind`.
    pub fn hit_of_kind(&self, kind: ObjectKind) -> Option<&RayHit> {
        self.hit.as_ref().filter(|h| h.kind == kind)
    }
}

/// An object near a hand, with the distance from the hand to its surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearbyObject {
    pub id: EntityId,
    pub kind: ObjectKind,
    pub distance: f32,
}

/// Everything a module may read about one hand in a frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HandInput {
    /// Analog trigger, 0.0 to 1.0.
    pub trigger: f32,
    /// Debounced "trigger crossed the click threshold".
    pub trigger_click: bool,
    /// Analog grip/bumper, 0.0 to 1.0.
    pub secondary: f32,
    /// Forward thumbstick deflection, -1.0 to 1.0.
    pub thumbstick: f32,
    /// Controller pose; `None` when tracking is lost.
    pub pose: Option<Transform>,
    pub ray_pick: RayPick,
    /// Sorted ascending by distance.
    pub nearby: Vec<NearbyObject>,
}

impl HandInput {
    pub fn position(&self) -> Option<Vec3> {
        self.pose.map(|p| p.position)
    }

    pub fn nearest(&self) -> Option<&NearbyObject> {
        self.nearby.first()
    }

    /// Nearby objects within `radius`, nearest first.
    pub fn within(&self, radius: f32) -> impl Iterator<Item = &NearbyObject> {
        self.nearby.iter().take_while(move |n| n.distance <= radius)
    }
}

/// Read-only per-frame input bundle shared by all modules.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InputSnapshot {
    pub frame: u64,
    /// Seconds since the previous frame.
    pub delta_time: f32,
    pub hands: [HandInput; 2],
}

impl InputSnapshot {
    pub fn hand(&self, hand: Hand) -> &HandInput {
        &self.hands[hand.index()]
    }

    pub fn hand_mut(&mut self, hand: Hand) -> &mut HandInput {
        &mut self.hands[hand.index()]
    }
}

/// Errors while assembling a snapshot. These abort the frame.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SnapshotError {
    #[error("non-finite {field} for {hand} hand")]
    NonFinite { hand: Hand, field: &'static str },
    #[error("negative frame delta: {0}")]
    NegativeDelta(f32),
    #[error("host input unavailable: {0}")]
    Unavailable(String),
}

/// Produces the per-frame snapshot from the host's controller and pick APIs.
pub trait SnapshotSource {
    fn capture(&mut self) -> Result<InputSnapshot, SnapshotError>;
}
