use glam::Vec3;
use handspace_common::{EntityId, EntityProperties, Hand};

/// Errors reported by the host runtime.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    /// The entity or overlay no longer exists. Modules treat this as an exit
    /// condition, not a failure.
    #[error("no such object: {0}")]
    NoSuchObject(EntityId),
    #[error("host call {method} failed: {reason}")]
    CallFailed { method: String, reason: String },
    #[error("host does not support {0}")]
    Unsupported(&'static str),
}

/// Capabilities of the host runtime that dispatch modules may use.
///
/// Injected into the dispatcher each frame; modules never reach for ambient
/// globals.
pub trait EntityHost {
    fn exists(&self, id: EntityId) -> bool;

    fn properties(&self, id: EntityId) -> Option<EntityProperties>;

    /// Invoke a named method on an entity's script.
    fn call_method(&mut self, id: EntityId, method: &str, args: &[&str]) -> Result<(), HostError>;

    fn set_position(&mut self, id: EntityId, position: Vec3) -> Result<(), HostError>;

    fn haptic_pulse(&mut self, hand: Hand, strength: f32, duration_ms: f32);

    /// Move the local avatar so its root lands at `position`.
    fn move_avatar(&mut self, _position: Vec3) -> Result<(), HostError> {
        Err(HostError::Unsupported("avatar movement"))
    }
}

/// Call `method` if the target still exists. A vanished target is not an
/// error; returns whether the call happened.
pub fn call_if_present(
    host: &mut dyn EntityHost,
    id: EntityId,
    method: &str,
    args: &[&str],
) -> Result<bool, HostError> {
    match host.call_method(id, method, args) {
        Ok(()) => Ok(true),
        Err(HostError::NoSuchObject(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockHost;

    #[test]
    fn vanished_target_is_not_an_error() {
        let mut host = MockHost::default();
        let id = host.spawn(EntityProperties::named("button"));
        assert_eq!(call_if_present(&mut host, id, "startNearTrigger", &[]), Ok(true));

        host.objects.remove(&id);
        assert_eq!(call_if_present(&mut host, id, "stopNearTrigger", &[]), Ok(false));
        assert_eq!(host.calls.len(), 1);
    }

    #[test]
    fn avatar_movement_is_opt_in() {
        let mut host = MockHost::default();
        assert_eq!(
            host.move_avatar(Vec3::ZERO),
            Err(HostError::Unsupported("avatar movement"))
        );
    }
}
