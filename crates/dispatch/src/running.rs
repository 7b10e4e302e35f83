use handspace_common::EntityId;
use serde::{Deserialize, Serialize};

/// Result of every `is_ready` / `run` call.
///
/// `targets` are the entities or overlays the module claims this frame; other
/// modules consult them through the claim board to avoid double handling.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunningState {
    pub active: bool,
    pub targets: Vec<EntityId>,
    pub abort_targets: Vec<EntityId>,
}

impl RunningState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn active_empty() -> Self {
        Self {
            active: true,
            ..Self::default()
        }
    }

    pub fn active_with(targets: impl IntoIterator<Item = EntityId>) -> Self {
        Self {
            active: true,
            targets: targets.into_iter().collect(),
            abort_targets: Vec::new(),
        }
    }

    /// Mark `targets` as abandoned this frame, e.g. because they vanished
    /// mid-interaction. Abandoned targets are never claimed.
    pub fn with_abort(mut self, targets: impl IntoIterator<Item = EntityId>) -> Self {
        self.abort_targets.extend(targets);
        self
    }

    pub fn claims(&self, target: EntityId) -> bool {
        self.active && self.targets.contains(&target)
    }
}

/// Lifecycle of a module inside the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModulePhase {
    #[default]
    Idle,
    /// Reported ready this frame, slots not yet granted.
    Ready,
    /// Owns its slots until `run` reports inactive.
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid phase transition: {action} from {from:?}")]
pub struct PhaseError {
    pub from: ModulePhase,
    pub action: &'static str,
}

impl ModulePhase {
    /// Apply the outcome of an `is_ready` call. Only valid from Idle.
    pub fn after_ready_check(self, state: &RunningState) -> Result<ModulePhase, PhaseError> {
        match self {
            ModulePhase::Idle if state.active => Ok(ModulePhase::Ready),
            ModulePhase::Idle => Ok(ModulePhase::Idle),
            from => Err(PhaseError {
                from,
                action: "ready check",
            }),
        }
    }

    /// Hand the module its slots. Only valid from Ready.
    pub fn grant(self) -> Result<ModulePhase, PhaseError> {
        match self {
            ModulePhase::Ready => Ok(ModulePhase::Running),
            from => Err(PhaseError {
                from,
                action: "grant",
            }),
        }
    }

    /// Apply the outcome of a `run` call. Only valid from Running.
    pub fn after_run(self, state: &RunningState) -> Result<ModulePhase, PhaseError> {
        match self {
            ModulePhase::Running if state.active => Ok(ModulePhase::Running),
            ModulePhase::Running => Ok(ModulePhase::Idle),
            from => Err(PhaseError { from, action: "run" }),
        }
    }

    /// Failure, teardown or disable.
    pub fn force_idle(self) -> ModulePhase {
        ModulePhase::Idle
    }

    pub fn is_running(self) -> bool {
        self == ModulePhase::Running
    }
}
