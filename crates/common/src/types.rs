use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for an entity or overlay in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, for log lines and traces.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the two tracked controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub const ALL: [Hand; 2] = [Hand::Left, Hand::Right];

    /// The argument string passed to entity methods (`"left"` / `"right"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Hand::Left => "left",
            Hand::Right => "right",
        }
    }

    pub fn other(self) -> Hand {
        match self {
            Hand::Left => Hand::Right,
            Hand::Right => Hand::Left,
        }
    }

    /// Index into per-hand arrays.
    pub fn index(self) -> usize {
        match self {
            Hand::Left => 0,
            Hand::Right => 1,
        }
    }

    /// Module name prefix, `Left` or `Right`.
    pub fn prefix(self) -> &'static str {
        match self {
            Hand::Left => "Left",
            Hand::Right => "Right",
        }
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown hand: {0:?}")]
pub struct ParseHandError(pub String);

impl FromStr for Hand {
    type Err = ParseHandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(Hand::Left),
            "right" => Ok(Hand::Right),
            _ => Err(ParseHandError(s.to_string())),
        }
    }
}

/// Spatial transform: position, rotation, scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Direction a controller with this transform points along (local -Z).
    pub fn pointing(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite() && self.scale.is_finite()
    }
}

/// What kind of object a pick or proximity query found.
///
/// Web entities and overlays are UI surfaces: grab modules never take them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    #[default]
    Entity,
    Web,
    Overlay,
}

impl ObjectKind {
    pub fn is_ui_surface(self) -> bool {
        matches!(self, ObjectKind::Web | ObjectKind::Overlay)
    }
}

/// Behavior markers an entity advertises to the dispatch modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    Triggerable,
    Grabbable,
    Equippable,
    /// The teleporter sits the avatar here instead of landing on it.
    Seat,
}

/// Property bag describing an object, as returned by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityProperties {
    pub name: String,
    pub kind: ObjectKind,
    pub transform: Transform,
    /// Bounding sphere radius used for picks and proximity.
    pub radius: f32,
    pub markers: BTreeSet<Marker>,
    pub locked: bool,
}

impl Default for EntityProperties {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: ObjectKind::Entity,
            transform: Transform::default(),
            radius: 0.1,
            markers: BTreeSet::new(),
            locked: false,
        }
    }
}

impl EntityProperties {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn with_kind(mut self, kind: ObjectKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.markers.insert(marker);
        self
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    pub fn has_marker(&self, marker: Marker) -> bool {
        self.markers.contains(&marker)
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_uniqueness() {
        let a = EntityId::new();
        let b = EntityId::new();
        assert_ne!(a, b);
        assert_eq!(a.short().len(), 8);
    }

    #[test]
    fn transform_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, Quat::IDENTITY);
        assert_eq!(t.scale, Vec3::ONE);
        assert_eq!(t.pointing(), Vec3::NEG_Z);
    }

    #[test]
    fn hand_parse_and_other() {
        assert_eq!("Left".parse::<Hand>(), Ok(Hand::Left));
        assert_eq!("right".parse::<Hand>(), Ok(Hand::Right));
        assert!("middle".parse::<Hand>().is_err());
        assert_eq!(Hand::Left.other(), Hand::Right);
        assert_eq!(Hand::Right.index(), 1);
    }

    #[test]
    fn properties_builder_sets_markers() {
        let p = EntityProperties::named("button")
            .at(Vec3::new(0.0, 1.0, -2.0))
            .with_marker(Marker::Triggerable);
        assert!(p.has_marker(Marker::Triggerable));
        assert!(!p.has_marker(Marker::Grabbable));
        assert_eq!(p.position().z, -2.0);
        assert!(!p.locked);
    }

    #[test]
    fn ui_surfaces() {
        assert!(ObjectKind::Overlay.is_ui_surface());
        assert!(ObjectKind::Web.is_ui_surface());
        assert!(!ObjectKind::Entity.is_ui_surface());
    }
}
