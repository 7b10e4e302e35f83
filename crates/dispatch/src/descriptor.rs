use crate::slot::Slot;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form configuration understood by the dispatcher or the host
/// (laser-pointer hints and the like).
pub type ModuleParameters = Map<String, Value>;

/// Static declaration of a dispatch module: priority, claimed slots, parameters.
///
/// Lower priority numbers win when several ready modules want the same slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub priority: i32,
    pub slots: Vec<Slot>,
    #[serde(default)]
    pub parameters: ModuleParameters,
    /// Minimum delay between readiness checks requested by the module.
    /// Carried for hosts that throttle; the dispatcher polls every frame.
    #[serde(default)]
    pub sleep_ms_between_runs: u64,
}

impl ModuleDescriptor {
    pub fn new(priority: i32, slots: impl IntoIterator<Item = Slot>) -> Self {
        let mut claimed: Vec<Slot> = Vec::new();
        for slot in slots {
            if !claimed.contains(&slot) {
                claimed.push(slot);
            }
        }
        Self {
            priority,
            slots: claimed,
            parameters: ModuleParameters::new(),
            sleep_ms_between_runs: 100,
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn claims(&self, slot: Slot) -> bool {
        self.slots.contains(&slot)
    }

    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }
}
