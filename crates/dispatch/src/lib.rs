//! Controller dispatch: modules declare a priority and the hand slots they
//! need, and the [`Dispatcher`] hands each slot to at most one module per
//! frame.

pub mod claims;
pub mod config;
pub mod descriptor;
pub mod dispatcher;
pub mod host;
pub mod module;
pub mod registry;
pub mod running;
pub mod slot;
pub mod snapshot;

#[cfg(test)]
mod testing;

pub use claims::ClaimBoard;
pub use config::{ConfigError, DispatchConfig};
pub use descriptor::{ModuleDescriptor, ModuleParameters};
pub use dispatcher::{DispatchError, Dispatcher, FrameReport, ModuleFailure, ModuleStats};
pub use host::{EntityHost, HostError, call_if_present};
pub use module::{DispatchModule, FrameContext, ModuleError, PeerLinker};
pub use registry::{ModuleKey, ModuleRegistry, RegistryError};
pub use running::{ModulePhase, PhaseError, RunningState};
pub use slot::{ParseSlotError, Slot};
pub use snapshot::{HandInput, InputSnapshot, NearbyObject, RayHit, RayPick, SnapshotError, SnapshotSource};

pub fn crate_info() -> &'static str {
    "handspace-dispatch v0.1.0"
}
