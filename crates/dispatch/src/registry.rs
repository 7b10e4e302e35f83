use crate::descriptor::ModuleDescriptor;
use crate::module::{DispatchModule, PeerLinker};
use std::collections::BTreeMap;
use std::fmt;

/// Typed handle to a registered module. Never reused within a registry, so
/// a stale key from a disabled module cannot alias a new registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleKey(u64);

impl ModuleKey {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("module {0:?} is already enabled")]
    Duplicate(String),
    #[error("module name must not be empty")]
    EmptyName,
}

struct Entry {
    name: String,
    module: Box<dyn DispatchModule>,
}

/// Table of enabled dispatch modules, keyed by name and by [`ModuleKey`].
///
/// Presence in the table is what "enabled" means; disabling hands the
/// instance back to the caller, who owns its cleanup.
#[derive(Default)]
pub struct ModuleRegistry {
    entries: BTreeMap<ModuleKey, Entry>,
    by_name: BTreeMap<String, ModuleKey>,
    next_key: u64,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `module` under `name`. A name that is already enabled keeps
    /// its original registration and the new module is dropped.
    pub fn enable(
        &mut self,
        name: impl Into<String>,
        module: Box<dyn DispatchModule>,
    ) -> Result<ModuleKey, RegistryError> {
        let name = name.into();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.by_name.contains_key(&name) {
            tracing::warn!(module = %name, "module already enabled, keeping existing registration");
            return Err(RegistryError::Duplicate(name));
        }
        self.next_key += 1;
        let key = ModuleKey(self.next_key);
        tracing::info!(
            module = %name,
            priority = module.descriptor().priority,
            slots = ?module.descriptor().slots,
            "module enabled"
        );
        self.by_name.insert(name.clone(), key);
        self.entries.insert(key, Entry { name, module });
        Ok(key)
    }

    /// Remove `name` from the enabled set and return its instance.
    pub fn disable(&mut self, name: &str) -> Option<Box<dyn DispatchModule>> {
        let key = self.by_name.remove(name)?;
        let entry = self.entries.remove(&key)?;
        tracing::info!(module = %name, "module disabled");
        Some(entry.module)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&dyn DispatchModule> {
        let key = self.by_name.get(name)?;
        self.get(*key)
    }

    pub fn get(&self, key: ModuleKey) -> Option<&dyn DispatchModule> {
        self.entries.get(&key).map(|e| e.module.as_ref())
    }

    pub(crate) fn get_mut(&mut self, key: ModuleKey) -> Option<&mut Box<dyn DispatchModule>> {
        self.entries.get_mut(&key).map(|e| &mut e.module)
    }

    pub fn key_of(&self, name: &str) -> Option<ModuleKey> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, key: ModuleKey) -> Option<&str> {
        self.entries.get(&key).map(|e| e.name.as_str())
    }

    pub fn descriptor(&self, key: ModuleKey) -> Option<&ModuleDescriptor> {
        self.get(key).map(|m| m.descriptor())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries.values().map(|e| e.name.clone()).collect()
    }

    /// Keys sorted by (priority, registration order).
    pub fn ordered_keys(&self) -> Vec<ModuleKey> {
        let mut keys: Vec<(i32, ModuleKey)> = self
            .entries
            .iter()
            .map(|(key, e)| (e.module.descriptor().priority, *key))
            .collect();
        keys.sort();
        keys.into_iter().map(|(_, key)| key).collect()
    }

    pub fn linker(&self) -> PeerLinker {
        PeerLinker::new(self.by_name.clone())
    }

    /// Run the linking step on every module.
    pub(crate) fn link_all(&mut self) {
        let linker = self.linker();
        for entry in self.entries.values_mut() {
            entry.module.link(&linker);
        }
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.by_name.iter()).finish()
    }
}
