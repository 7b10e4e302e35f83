use crate::claims::ClaimBoard;
use crate::host::EntityHost;
use crate::module::{DispatchModule, FrameContext};
use crate::registry::{ModuleKey, ModuleRegistry, RegistryError};
use crate::running::{ModulePhase, RunningState};
use crate::slot::Slot;
use crate::snapshot::{InputSnapshot, SnapshotError, SnapshotSource};
use handspace_common::EntityId;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};

/// Errors that abort a whole frame.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("snapshot construction failed: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Per-module call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModuleStats {
    pub is_ready_calls: u64,
    pub run_calls: u64,
    /// Times the module was granted its slots.
    pub activations: u64,
    pub failures: u64,
}

/// A module callback that returned an error or panicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFailure {
    pub module: String,
    pub call: &'static str,
    pub error: String,
}

/// What happened during one dispatched frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: u64,
    /// Modules whose `run` was called, in call order.
    pub ran: Vec<String>,
    /// Modules that became ready and took their slots.
    pub readied: Vec<String>,
    /// Running modules that yielded (inactive `run` or failure).
    pub released: Vec<String>,
    pub failures: Vec<ModuleFailure>,
    /// (module, target) pairs a module reported abandoning this frame.
    pub aborted: Vec<(String, EntityId)>,
    /// Slot owners at the end of the frame.
    pub owners: BTreeMap<Slot, String>,
}

#[derive(Debug, Clone, Copy, Default)]
struct ModuleRuntime {
    phase: ModulePhase,
    stats: ModuleStats,
}

#[derive(Debug, Clone, Copy)]
enum Call {
    IsReady,
    Run,
}

impl Call {
    fn label(self) -> &'static str {
        match self {
            Call::IsReady => "is_ready",
            Call::Run => "run",
        }
    }
}

/// Frame-driven, single-owner-per-slot scheduler over the module registry.
///
/// Each frame: running modules get `run` (priority order) and free their
/// slots when they yield; then idle modules whose slots are all free get
/// `is_ready` in priority order, and the first to report active takes the
/// slots. Ownership is sticky: a running module is never preempted.
#[derive(Debug, Default)]
pub struct Dispatcher {
    registry: ModuleRegistry,
    claims: ClaimBoard,
    runtime: BTreeMap<ModuleKey, ModuleRuntime>,
    frames: u64,
    needs_link: bool,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(
        &mut self,
        name: impl Into<String>,
        module: Box<dyn DispatchModule>,
    ) -> Result<ModuleKey, RegistryError> {
        let key = self.registry.enable(name, module)?;
        self.runtime.insert(key, ModuleRuntime::default());
        self.needs_link = true;
        Ok(key)
    }

    /// Unregister `name`, release its slots and hand the instance back.
    /// The module's `cleanup` is not called; the caller owns it.
    pub fn disable(&mut self, name: &str) -> Option<Box<dyn DispatchModule>> {
        let key = self.registry.key_of(name)?;
        let freed = self.claims.release(key);
        if !freed.is_empty() {
            tracing::debug!(module = name, ?freed, "disabled module released slots");
        }
        self.runtime.remove(&key);
        self.needs_link = true;
        self.registry.disable(name)
    }

    /// Resolve peer references. Runs automatically before the first frame
    /// after any registration change.
    pub fn link(&mut self) {
        self.registry.link_all();
        self.needs_link = false;
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn claims(&self) -> &ClaimBoard {
        &self.claims
    }

    /// Number of frames dispatched so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn phase(&self, name: &str) -> Option<ModulePhase> {
        let key = self.registry.key_of(name)?;
        self.runtime.get(&key).map(|rt| rt.phase)
    }

    pub fn stats(&self, name: &str) -> Option<ModuleStats> {
        let key = self.registry.key_of(name)?;
        self.runtime.get(&key).map(|rt| rt.stats)
    }

    pub fn owner(&self, slot: Slot) -> Option<&str> {
        self.claims
            .owner(slot)
            .and_then(|key| self.registry.name_of(key))
    }

    /// Capture a snapshot from the host and dispatch it. Snapshot failure is
    /// the only fatal error.
    pub fn tick<H>(&mut self, host: &mut H) -> Result<FrameReport, DispatchError>
    where
        H: SnapshotSource + EntityHost,
    {
        let snapshot = host.capture()?;
        Ok(self.frame(&snapshot, host))
    }

    /// Dispatch one frame against an already-built snapshot.
    pub fn frame(&mut self, snapshot: &InputSnapshot, host: &mut dyn EntityHost) -> FrameReport {
        if self.needs_link {
            self.link();
        }
        let _span = tracing::info_span!("dispatch_frame", frame = snapshot.frame).entered();
        self.frames += 1;

        let mut report = FrameReport {
            frame: snapshot.frame,
            ..FrameReport::default()
        };
        let order = self.registry.ordered_keys();
        let mut called: BTreeSet<ModuleKey> = BTreeSet::new();

        for &key in &order {
            if !self.phase_of(key).is_running() {
                continue;
            }
            called.insert(key);
            let name = self.name_of(key);
            report.ran.push(name.clone());
            match self.call(key, Call::Run, snapshot, host) {
                Ok(state) => {
                    note_aborts(&name, &state, &mut report);
                    self.claims.record(key, &state);
                    let next = match self.phase_of(key).after_run(&state) {
                        Ok(next) => next,
                        Err(e) => {
                            tracing::warn!(module = %name, error = %e, "forcing module idle");
                            ModulePhase::Idle
                        }
                    };
                    self.set_phase(key, next);
                    if !next.is_running() {
                        let freed = self.claims.release(key);
                        tracing::debug!(module = %name, ?freed, "module yielded");
                        report.released.push(name);
                    }
                }
                Err(error) => {
                    self.fail(key, &name, Call::Run, error, &mut report);
                    report.released.push(name);
                }
            }
        }

        for &key in &order {
            if called.contains(&key) || self.phase_of(key) != ModulePhase::Idle {
                continue;
            }
            let Some(slots) = self.registry.descriptor(key).map(|d| d.slots.clone()) else {
                continue;
            };
            if !slots.iter().all(|slot| self.claims.is_free(*slot)) {
                continue;
            }
            let name = self.name_of(key);
            match self.call(key, Call::IsReady, snapshot, host) {
                Ok(state) => {
                    note_aborts(&name, &state, &mut report);
                    let granted = ModulePhase::Idle
                        .after_ready_check(&state)
                        .and_then(|phase| match phase {
                            ModulePhase::Ready => phase.grant(),
                            other => Ok(other),
                        });
                    match granted {
                        Ok(ModulePhase::Running) => {
                            self.claims.occupy(key, &slots);
                            self.claims.record(key, &state);
                            self.set_phase(key, ModulePhase::Running);
                            if let Some(rt) = self.runtime.get_mut(&key) {
                                rt.stats.activations += 1;
                            }
                            tracing::debug!(module = %name, ?slots, targets = state.targets.len(), "module took slots");
                            report.readied.push(name);
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!(module = %name, error = %e, "readiness transition rejected");
                        }
                    }
                }
                Err(error) => self.fail(key, &name, Call::IsReady, error, &mut report),
            }
        }

        report.owners = self
            .claims
            .owners()
            .iter()
            .map(|(slot, key)| (*slot, self.name_of(*key)))
            .collect();
        tracing::trace!(
            ran = report.ran.len(),
            readied = report.readied.len(),
            released = report.released.len(),
            "frame dispatched"
        );
        report
    }

    /// Script teardown: clean up every module that has cleanup, then
    /// unregister everything. Returns the number of modules removed.
    pub fn shutdown(&mut self, host: &mut dyn EntityHost) -> usize {
        let names = self.registry.names();
        let mut removed = 0;
        for name in names {
            if let Some(mut module) = self.disable(&name) {
                if module.has_cleanup() {
                    tracing::debug!(module = %name, "cleanup");
                    module.cleanup(host);
                }
                removed += 1;
            }
        }
        self.claims.clear();
        removed
    }

    fn call(
        &mut self,
        key: ModuleKey,
        call: Call,
        snapshot: &InputSnapshot,
        host: &mut dyn EntityHost,
    ) -> Result<RunningState, String> {
        let Some(module) = self.registry.get_mut(key) else {
            return Err(format!("module {key} is not registered"));
        };
        let mut ctx = FrameContext::new(snapshot, host, &self.claims, key);
        let result = invoke(module.as_mut(), call, &mut ctx);
        if let Some(rt) = self.runtime.get_mut(&key) {
            match call {
                Call::IsReady => rt.stats.is_ready_calls += 1,
                Call::Run => rt.stats.run_calls += 1,
            }
        }
        result
    }

    fn fail(
        &mut self,
        key: ModuleKey,
        name: &str,
        call: Call,
        error: String,
        report: &mut FrameReport,
    ) {
        tracing::warn!(module = name, call = call.label(), %error, "module failed, returning it to idle");
        self.claims.release(key);
        let phase = self.phase_of(key).force_idle();
        self.set_phase(key, phase);
        if let Some(rt) = self.runtime.get_mut(&key) {
            rt.stats.failures += 1;
        }
        report.failures.push(ModuleFailure {
            module: name.to_string(),
            call: call.label(),
            error,
        });
    }

    fn phase_of(&self, key: ModuleKey) -> ModulePhase {
        self.runtime.get(&key).map(|rt| rt.phase).unwrap_or_default()
    }

    fn set_phase(&mut self, key: ModuleKey, phase: ModulePhase) {
        if let Some(rt) = self.runtime.get_mut(&key) {
            rt.phase = phase;
        }
    }

    fn name_of(&self, key: ModuleKey) -> String {
        self.registry
            .name_of(key)
            .map(str::to_string)
            .unwrap_or_else(|| key.to_string())
    }
}

fn note_aborts(name: &str, state: &RunningState, report: &mut FrameReport) {
    for target in &state.abort_targets {
        tracing::debug!(module = name, entity = %target.short(), "target abandoned");
        report.aborted.push((name.to_string(), *target));
    }
}

/// Call into a module, turning both errors and panics into a message.
fn invoke(
    module: &mut dyn DispatchModule,
    call: Call,
    ctx: &mut FrameContext<'_>,
) -> Result<RunningState, String> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match call {
        Call::IsReady => module.is_ready(ctx),
        Call::Run => module.run(ctx),
    }));
    match outcome {
        Ok(Ok(state)) => Ok(state),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
