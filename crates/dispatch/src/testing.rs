//! Recording module and host used by the dispatcher tests.

use crate::descriptor::ModuleDescriptor;
use crate::host::{EntityHost, HostError};
use crate::module::{DispatchModule, FrameContext, ModuleError, PeerLinker};
use crate::registry::ModuleKey;
use crate::running::RunningState;
use crate::slot::Slot;
use glam::Vec3;
use handspace_common::{EntityId, EntityProperties, Hand};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Knobs and counters shared between a test and its [`ScriptedModule`].
#[derive(Default)]
pub struct Script {
    pub ready: Cell<bool>,
    pub keep_running: Cell<bool>,
    pub fail_run: Cell<bool>,
    pub panic_ready: Cell<bool>,
    pub is_ready_calls: Cell<u32>,
    pub run_calls: Cell<u32>,
    pub cleanups: Cell<u32>,
    /// (frame, "is_ready" | "run") in call order.
    pub calls: RefCell<Vec<(u64, &'static str)>>,
    pub targets: RefCell<Vec<EntityId>>,
    /// Reported as abandoned with every state.
    pub aborts: RefCell<Vec<EntityId>>,
    pub peer: RefCell<Option<ModuleKey>>,
}

impl Script {
    pub fn set_ready(&self, ready: bool) {
        self.ready.set(ready);
    }

    pub fn set_keep_running(&self, keep: bool) {
        self.keep_running.set(keep);
    }

    pub fn calls_in_frame(&self, frame: u64) -> Vec<&'static str> {
        self.calls
            .borrow()
            .iter()
            .filter(|(f, _)| *f == frame)
            .map(|(_, c)| *c)
            .collect()
    }
}

pub struct ScriptedModule {
    descriptor: ModuleDescriptor,
    script: Rc<Script>,
    peer_name: Option<String>,
    cleanup: bool,
}

impl ScriptedModule {
    /// A module that becomes ready when `script.ready` is set and keeps
    /// running while `script.keep_running` is set (default: true).
    pub fn new(priority: i32, slots: impl IntoIterator<Item = Slot>) -> (Self, Rc<Script>) {
        let script = Rc::new(Script::default());
        script.keep_running.set(true);
        let module = Self {
            descriptor: ModuleDescriptor::new(priority, slots),
            script: Rc::clone(&script),
            peer_name: None,
            cleanup: false,
        };
        (module, script)
    }

    pub fn with_peer(mut self, name: &str) -> Self {
        self.peer_name = Some(name.to_string());
        self
    }

    pub fn with_cleanup(mut self) -> Self {
        self.cleanup = true;
        self
    }

    fn state(&self, active: bool) -> RunningState {
        let state = if active {
            RunningState::active_with(self.script.targets.borrow().iter().copied())
        } else {
            RunningState::idle()
        };
        state.with_abort(self.script.aborts.borrow().iter().copied())
    }
}

impl DispatchModule for ScriptedModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn is_ready(&mut self, ctx: &mut FrameContext<'_>) -> Result<RunningState, ModuleError> {
        self.script.is_ready_calls.set(self.script.is_ready_calls.get() + 1);
        self.script
            .calls
            .borrow_mut()
            .push((ctx.snapshot().frame, "is_ready"));
        if self.script.panic_ready.get() {
            panic!("scripted readiness panic");
        }
        Ok(self.state(self.script.ready.get()))
    }

    fn run(&mut self, ctx: &mut FrameContext<'_>) -> Result<RunningState, ModuleError> {
        self.script.run_calls.set(self.script.run_calls.get() + 1);
        self.script.calls.borrow_mut().push((ctx.snapshot().frame, "run"));
        if self.script.fail_run.get() {
            return Err(ModuleError::Other("scripted run failure".into()));
        }
        Ok(self.state(self.script.keep_running.get()))
    }

    fn link(&mut self, peers: &PeerLinker) {
        if let Some(name) = &self.peer_name {
            *self.script.peer.borrow_mut() = peers.resolve(name);
        }
    }

    fn has_cleanup(&self) -> bool {
        self.cleanup
    }

    fn cleanup(&mut self, _host: &mut dyn EntityHost) {
        self.script.cleanups.set(self.script.cleanups.get() + 1);
    }
}

/// In-memory host recording method calls.
#[derive(Default)]
pub struct MockHost {
    pub objects: BTreeMap<EntityId, EntityProperties>,
    pub calls: Vec<(EntityId, String)>,
    pub pulses: Vec<Hand>,
}

impl MockHost {
    pub fn spawn(&mut self, props: EntityProperties) -> EntityId {
        let id = EntityId::new();
        self.objects.insert(id, props);
        id
    }
}

impl EntityHost for MockHost {
    fn exists(&self, id: EntityId) -> bool {
        self.objects.contains_key(&id)
    }

    fn properties(&self, id: EntityId) -> Option<EntityProperties> {
        self.objects.get(&id).cloned()
    }

    fn call_method(&mut self, id: EntityId, method: &str, _args: &[&str]) -> Result<(), HostError> {
        if !self.objects.contains_key(&id) {
            return Err(HostError::NoSuchObject(id));
        }
        self.calls.push((id, method.to_string()));
        Ok(())
    }

    fn set_position(&mut self, id: EntityId, position: Vec3) -> Result<(), HostError> {
        let props = self.objects.get_mut(&id).ok_or(HostError::NoSuchObject(id))?;
        props.transform.position = position;
        Ok(())
    }

    fn haptic_pulse(&mut self, hand: Hand, _strength: f32, _duration_ms: f32) {
        self.pulses.push(hand);
    }
}
