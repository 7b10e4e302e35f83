//! Input gathering: raw controller samples become the per-frame
//! [`InputSnapshot`](handspace_dispatch::InputSnapshot) the dispatcher hands
//! to every module.
//!
//! # Invariants
//! - A snapshot is either fully valid or not produced at all.
//! - Pick and proximity results are deterministic for a given world.

pub mod builder;
pub mod controller;
pub mod pick;
pub mod sim;

pub use builder::SnapshotBuilder;
pub use controller::{ClickDebouncer, ControllerSample, RawInput};
pub use sim::{HapticPulse, SimHost};

pub fn crate_info() -> &'static str {
    "handspace-input v0.1.0"
}
