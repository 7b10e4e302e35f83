//! World Kernel: the entity/overlay table dispatch modules act upon.
//!
//! # Invariants
//! - Iteration order is deterministic (BTreeMap keyed by EntityId).
//! - All state mutations flow through explicit operations and are logged.

pub mod world;

pub use world::{World, WorldEvent};

pub fn crate_info() -> &'static str {
    "handspace-kernel v0.1.0"
}
