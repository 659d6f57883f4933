//! Listener lifecycle: wiring the button source, the state machine and the
//! action executor together, with idempotent start/stop and live reload.

use std::{sync::Arc, thread};

use button_store::ButtonStore;
use crossbeam_channel::{Receiver, Sender};
use mousetap::{ButtonKey, ButtonSource, Decision, PressHandler};
use parking_lot::Mutex;
use permissions::PermissionReport;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
    machine::{SequenceMachine, Timing},
    mappings::{MappingTable, SequenceMapping},
};

/// Errors from constructing the listener.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The timer runtime could not be built.
    #[error("timer runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Outcome of a start request.
#[derive(Debug, Clone, Serialize)]
pub struct StartOutcome {
    /// Whether the listener is now running.
    pub success: bool,
    /// Human-readable explanation.
    pub message: String,
    /// Set when the failure is a missing OS permission.
    pub need_permission: bool,
}

/// One single-button binding, for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct SingleBinding {
    /// The bound button.
    pub key: ButtonKey,
    /// The action it triggers.
    pub action: String,
}

/// Snapshot of the listener for status queries.
#[derive(Debug, Clone, Serialize)]
pub struct ListenerStatus {
    /// Whether the hook is installed.
    pub running: bool,
    /// Active single bindings.
    pub singles: Vec<SingleBinding>,
    /// Active sequence bindings.
    pub sequences: Vec<SequenceMapping>,
    /// Last permission probe result, if one was made.
    pub permission: Option<PermissionReport>,
}

/// Injected platform capabilities.
///
/// Production wiring uses the real OS hook, permission probe and injector;
/// tests swap in fakes to drive the whole lifecycle off-hardware.
pub struct EngineDeps {
    /// Builds a fresh button source per start.
    pub source: Box<dyn Fn() -> Box<dyn ButtonSource> + Send + Sync>,
    /// Probes the input-capture permission.
    pub permission: Box<dyn Fn() -> PermissionReport + Send + Sync>,
    /// Executes mapped actions.
    pub executor: keypost::Executor,
}

impl EngineDeps {
    /// Dependencies backed by the real platform.
    pub fn system() -> Self {
        Self {
            source: Box::new(mousetap::system_source),
            permission: Box::new(permissions::input_capture),
            executor: keypost::Executor::system(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Stopped,
    Starting,
    Running,
}

struct ExecHandle {
    tx: Sender<String>,
    worker: thread::JoinHandle<()>,
}

struct Inner {
    phase: Phase,
    machine: Option<Arc<SequenceMachine>>,
    source: Option<Box<dyn ButtonSource>>,
    exec: Option<ExecHandle>,
    permission: Option<PermissionReport>,
    table: MappingTable,
}

struct MachineHandler {
    machine: Arc<SequenceMachine>,
}

impl PressHandler for MachineHandler {
    fn on_press(&self, key: ButtonKey) -> Decision {
        self.machine.on_press(key)
    }
}

/// Owns the full capture pipeline.
///
/// The listener carries a one-worker tokio runtime for debounce timers and
/// a dedicated executor thread for actions, so neither the OS callback nor
/// a timer ever blocks on injection or process spawning.
pub struct MouseListener {
    store: Arc<ButtonStore>,
    deps: EngineDeps,
    timing: Timing,
    runtime: tokio::runtime::Runtime,
    inner: Mutex<Inner>,
}

impl MouseListener {
    /// Build a listener over the given store with default timings.
    pub fn new(store: Arc<ButtonStore>, deps: EngineDeps) -> Result<Self, EngineError> {
        Self::with_timing(store, deps, Timing::default())
    }

    /// Build a listener with explicit recognition timings.
    pub fn with_timing(
        store: Arc<ButtonStore>,
        deps: EngineDeps,
        timing: Timing,
    ) -> Result<Self, EngineError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("button-timer")
            .enable_time()
            .build()?;
        Ok(Self {
            store,
            deps,
            timing,
            runtime,
            inner: Mutex::new(Inner {
                phase: Phase::Stopped,
                machine: None,
                source: None,
                exec: None,
                permission: None,
                table: MappingTable::default(),
            }),
        })
    }

    /// Start capturing, or reload mappings if already running.
    ///
    /// A denied permission is reported in the outcome rather than raised;
    /// the probe result is cached so repeated starts stay cheap and the
    /// cache is dropped on stop to pick up a grant made in the meantime.
    pub fn start(&self) -> StartOutcome {
        let mut inner = self.inner.lock();
        if inner.phase == Phase::Running {
            drop(inner);
            self.reload();
            return StartOutcome {
                success: true,
                message: "listener already running, mappings reloaded".into(),
                need_permission: false,
            };
        }

        inner.phase = Phase::Starting;

        let report = inner
            .permission
            .get_or_insert_with(|| (self.deps.permission)())
            .clone();
        if !report.granted {
            warn!(reason = %report.reason, "listener_start_blocked_on_permission");
            inner.phase = Phase::Stopped;
            return StartOutcome {
                success: false,
                message: report.reason,
                need_permission: true,
            };
        }

        let table = MappingTable::from_records(&self.store.list());
        if table.is_empty() {
            // Start anyway: mappings may be added while we run.
            debug!("starting_with_empty_mapping_table");
        }

        let (tx, rx) = crossbeam_channel::unbounded::<String>();
        let executor = self.deps.executor.clone();
        let worker = match thread::Builder::new()
            .name("action-exec".into())
            .spawn(move || run_actions(rx, executor))
        {
            Ok(w) => w,
            Err(e) => {
                error!(error = %e, "action_executor_spawn_failed");
                inner.phase = Phase::Stopped;
                return StartOutcome {
                    success: false,
                    message: format!("failed to start action executor: {e}"),
                    need_permission: false,
                };
            }
        };

        let machine = Arc::new(SequenceMachine::new(
            table.clone(),
            self.timing,
            self.runtime.handle().clone(),
            tx.clone(),
        ));

        let mut source = (self.deps.source)();
        if let Err(e) = source.register(Arc::new(MachineHandler {
            machine: machine.clone(),
        })) {
            drop(tx);
            let _ = worker.join();
            let need_permission = matches!(e, mousetap::Error::PermissionDenied(_));
            if need_permission {
                // The cached probe said yes but the OS said no; forget it.
                inner.permission = None;
            }
            warn!(error = %e, "listener_start_failed");
            inner.phase = Phase::Stopped;
            return StartOutcome {
                success: false,
                message: e.to_string(),
                need_permission,
            };
        }

        info!(
            singles = table.singles().len(),
            sequences = table.sequences().len(),
            "listener_started"
        );
        inner.phase = Phase::Running;
        inner.machine = Some(machine);
        inner.source = Some(source);
        inner.exec = Some(ExecHandle { tx, worker });
        inner.table = table;
        StartOutcome {
            success: true,
            message: "listener started".into(),
            need_permission: false,
        }
    }

    /// Stop capturing. Safe to call when already stopped.
    ///
    /// Teardown order matters: the machine is reset first so no timer can
    /// fire mid-teardown, then the hook is removed, then the executor
    /// channel is closed and its thread joined.
    pub fn stop(&self) {
        let mut inner = self.inner.lock();
        if inner.phase == Phase::Stopped {
            return;
        }
        if let Some(machine) = inner.machine.take() {
            machine.reset_sync();
        }
        if let Some(mut source) = inner.source.take() {
            source.unregister();
        }
        if let Some(exec) = inner.exec.take() {
            drop(exec.tx);
            if exec.worker.join().is_err() {
                warn!("action_executor_panicked");
            }
        }
        inner.phase = Phase::Stopped;
        inner.permission = None;
        inner.table = MappingTable::default();
        info!("listener_stopped");
    }

    /// Recompile mappings from the store and swap them in.
    ///
    /// When stopped, reload means start: the fresh start reads the store.
    pub fn reload(&self) {
        let inner = self.inner.lock();
        if inner.phase == Phase::Stopped {
            drop(inner);
            let outcome = self.start();
            if !outcome.success {
                warn!(message = %outcome.message, "reload_start_failed");
            }
            return;
        }
        let Some(machine) = inner.machine.clone() else {
            return;
        };
        drop(inner);

        let table = MappingTable::from_records(&self.store.list());
        machine.set_table(table.clone());
        let mut inner = self.inner.lock();
        // Only record the table if we are still the running instance.
        if inner.phase == Phase::Running {
            inner.table = table;
        }
        info!("mappings_reloaded");
    }

    /// Whether the hook is currently installed.
    pub fn is_running(&self) -> bool {
        self.inner.lock().phase == Phase::Running
    }

    /// Snapshot the listener for status reporting.
    pub fn status(&self) -> ListenerStatus {
        let inner = self.inner.lock();
        let mut singles: Vec<SingleBinding> = inner
            .table
            .singles()
            .iter()
            .map(|(key, action)| SingleBinding {
                key: *key,
                action: action.clone(),
            })
            .collect();
        singles.sort_by_key(|b| b.key.ordinal());
        ListenerStatus {
            running: inner.phase == Phase::Running,
            singles,
            sequences: inner.table.sequences().to_vec(),
            permission: inner.permission.clone(),
        }
    }
}

impl Drop for MouseListener {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Executor thread body: drain actions until the channel closes.
fn run_actions(rx: Receiver<String>, executor: keypost::Executor) {
    debug!("action_executor_started");
    while let Ok(action) = rx.recv() {
        if let Err(e) = executor.run(&action) {
            error!(%action, error = %e, "action_failed");
        }
    }
    debug!("action_executor_stopped");
}
