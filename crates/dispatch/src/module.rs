use crate::claims::ClaimBoard;
use crate::descriptor::ModuleDescriptor;
use crate::host::{EntityHost, HostError};
use crate::registry::ModuleKey;
use crate::running::RunningState;
use crate::snapshot::InputSnapshot;
use std::collections::BTreeMap;

/// Errors a module may return from `is_ready` / `run`.
///
/// The dispatcher catches these, logs them with the module name and returns
/// the module to Idle.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModuleError {
    #[error(transparent)]
    Host(#[from] HostError),
    #[error("invalid module state: {0}")]
    InvalidState(String),
    #[error("{0}")]
    Other(String),
}

/// What a module sees during one `is_ready` or `run` call.
pub struct FrameContext<'a> {
    snapshot: &'a InputSnapshot,
    host: &'a mut dyn EntityHost,
    claims: &'a ClaimBoard,
    me: ModuleKey,
}

impl<'a> FrameContext<'a> {
    pub fn new(
        snapshot: &'a InputSnapshot,
        host: &'a mut dyn EntityHost,
        claims: &'a ClaimBoard,
        me: ModuleKey,
    ) -> Self {
        Self {
            snapshot,
            host,
            claims,
            me,
        }
    }

    pub fn snapshot(&self) -> &'a InputSnapshot {
        self.snapshot
    }

    pub fn claims(&self) -> &'a ClaimBoard {
        self.claims
    }

    /// Key of the module being called.
    pub fn me(&self) -> ModuleKey {
        self.me
    }

    pub fn host(&mut self) -> &mut dyn EntityHost {
        &mut *self.host
    }

    pub fn host_ref(&self) -> &dyn EntityHost {
        &*self.host
    }
}

/// Name-to-key table handed to modules once after registration changes.
///
/// Modules resolve the peers they coordinate with here and keep the typed
/// [`ModuleKey`], instead of looking names up every frame.
#[derive(Debug, Clone, Default)]
pub struct PeerLinker {
    keys: BTreeMap<String, ModuleKey>,
}

impl PeerLinker {
    pub fn new(keys: BTreeMap<String, ModuleKey>) -> Self {
        Self { keys }
    }

    pub fn resolve(&self, name: &str) -> Option<ModuleKey> {
        let key = self.keys.get(name).copied();
        if key.is_none() {
            tracing::debug!(peer = name, "peer module not registered");
        }
        key
    }
}

/// A stateful input handler driven by the dispatcher.
///
/// `is_ready` is called while the module is Idle and its slots are free;
/// returning an active state grants it those slots. `run` is then called
/// every frame until it returns an inactive state.
pub trait DispatchModule {
    fn descriptor(&self) -> &ModuleDescriptor;

    fn is_ready(&mut self, ctx: &mut FrameContext<'_>) -> Result<RunningState, ModuleError>;

    fn run(&mut self, ctx: &mut FrameContext<'_>) -> Result<RunningState, ModuleError>;

    /// Resolve peer modules. Called before the first frame after any
    /// enable/disable.
    fn link(&mut self, _peers: &PeerLinker) {}

    /// Whether [`DispatchModule::cleanup`] does anything.
    fn has_cleanup(&self) -> bool {
        false
    }

    /// Release host resources. Called on teardown for modules that report
    /// [`DispatchModule::has_cleanup`].
    fn cleanup(&mut self, _host: &mut dyn EntityHost) {}
}
