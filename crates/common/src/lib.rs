//! Shared types: entity ids, hands, transforms and the property bags hosts
//! hand to dispatch modules.

mod types;

pub use types::{
    EntityId, EntityProperties, Hand, Marker, ObjectKind, ParseHandError, Transform,
};

pub fn crate_info() -> &'static str {
    "handspace-common v0.1.0"
}
