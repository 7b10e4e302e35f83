use handspace_common::Hand;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A logical input channel that at most one module owns at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Slot {
    LeftHand,
    RightHand,
    LeftHandEquip,
    RightHandEquip,
}

impl Slot {
    pub const ALL: [Slot; 4] = [
        Slot::LeftHand,
        Slot::RightHand,
        Slot::LeftHandEquip,
        Slot::RightHandEquip,
    ];

    pub fn hand(hand: Hand) -> Slot {
        match hand {
            Hand::Left => Slot::LeftHand,
            Hand::Right => Slot::RightHand,
        }
    }

    pub fn equip(hand: Hand) -> Slot {
        match hand {
            Hand::Left => Slot::LeftHandEquip,
            Hand::Right => Slot::RightHandEquip,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::LeftHand => "leftHand",
            Slot::RightHand => "rightHand",
            Slot::LeftHandEquip => "leftHandEquip",
            Slot::RightHandEquip => "rightHandEquip",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown slot: {0:?}")]
pub struct ParseSlotError(pub String);

impl FromStr for Slot {
    type Err = ParseSlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Slot::ALL
            .into_iter()
            .find(|slot| slot.as_str() == s)
            .ok_or_else(|| ParseSlotError(s.to_string()))
    }
}
