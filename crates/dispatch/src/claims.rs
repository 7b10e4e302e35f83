use crate::registry::ModuleKey;
use crate::running::RunningState;
use crate::slot::Slot;
use handspace_common::EntityId;
use std::collections::BTreeMap;

/// Slot ownership plus the latest active state of every module.
///
/// A slot maps to at most one owner by construction. Updated after every
/// module call, so a module sees the decisions of modules evaluated before
/// it in the same frame and the previous frame's state of the rest.
#[derive(Debug, Clone, Default)]
pub struct ClaimBoard {
    owners: BTreeMap<Slot, ModuleKey>,
    states: BTreeMap<ModuleKey, RunningState>,
}

impl ClaimBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(&self, slot: Slot) -> Option<ModuleKey> {
        self.owners.get(&slot).copied()
    }

    pub fn is_free(&self, slot: Slot) -> bool {
        !self.owners.contains_key(&slot)
    }

    pub fn owners(&self) -> &BTreeMap<Slot, ModuleKey> {
        &self.owners
    }

    /// Slots currently held by `key`.
    pub fn slots_of(&self, key: ModuleKey) -> Vec<Slot> {
        self.owners
            .iter()
            .filter(|(_, owner)| **owner == key)
            .map(|(slot, _)| *slot)
            .collect()
    }

    /// Last active state reported by `key`, if it is active.
    pub fn state_of(&self, key: ModuleKey) -> Option<&RunningState> {
        self.states.get(&key)
    }

    pub fn is_active(&self, key: ModuleKey) -> bool {
        self.states.contains_key(&key)
    }

    /// Modules whose active state lists `target`.
    pub fn claimants(&self, target: EntityId) -> impl Iterator<Item = ModuleKey> + '_ {
        self.states
            .iter()
            .filter(move |(_, state)| state.claims(target))
            .map(|(key, _)| *key)
    }

    pub fn is_claimed_by_other(&self, target: EntityId, me: ModuleKey) -> bool {
        self.claimants(target).any(|key| key != me)
    }

    pub(crate) fn record(&mut self, key: ModuleKey, state: &RunningState) {
        if state.active {
            self.states.insert(key, state.clone());
        } else {
            self.states.remove(&key);
        }
    }

    /// Give `key` every slot in `slots`. Callers check the slots are free.
    pub(crate) fn occupy(&mut self, key: ModuleKey, slots: &[Slot]) {
        for slot in slots {
            let previous = self.owners.insert(*slot, key);
            debug_assert!(previous.is_none(), "slot {slot} was already owned");
        }
    }

    /// Drop every slot and state held by `key`. Returns the freed slots.
    pub(crate) fn release(&mut self, key: ModuleKey) -> Vec<Slot> {
        let freed = self.slots_of(key);
        for slot in &freed {
            self.owners.remove(slot);
        }
        self.states.remove(&key);
        freed
    }

    pub(crate) fn clear(&mut self) {
        self.owners.clear();
        self.states.clear();
    }
}
