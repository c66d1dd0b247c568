//! Event dispatcher
//!
//! Single-threaded loop that owns every backend, the focus watcher and the
//! handler. Each iteration reports focus changes first, then drains each
//! backend in turn (bounded per backend), feeding events to the handler.
//! Handler sends fan out synchronously to every valid backend.

mod slots;

pub use slots::BackendSlots;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::backend::{Backend, BackendKind};
use crate::config::ScriptWatcher;
use crate::focus::FocusWatcher;
use crate::handler::Handler;

/// Upper bound on events taken from one backend per iteration
pub const MAX_EVENTS_PER_BACKEND: usize = 64;

/// Default time between iterations when nothing wakes the loop
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

/// Backends are drained in this order every iteration
const DRAIN_ORDER: [BackendKind; 2] = [BackendKind::Jack, BackendKind::Alsa];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// No backend and no focus watcher: nothing can ever reach the handler
    Idle,
    Running,
    ShuttingDown,
}

/// What happened during one loop iteration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IterationReport {
    /// Events handed to the handler
    pub delivered: usize,
    /// Whether the focus watcher reported a new title
    pub focus_changed: bool,
    /// A backend still had input after hitting the per-iteration cap
    pub backlog: bool,
}

pub struct Dispatcher {
    backends: BackendSlots,
    watcher: Option<FocusWatcher>,
    handler: Box<dyn Handler>,
    script_watcher: Option<ScriptWatcher>,
    wake: Arc<Notify>,
    interval: Duration,
    state: DispatcherState,
}

impl Dispatcher {
    /// Create a dispatcher; `wake` must be the same `Notify` handed to the
    /// backends so queued input interrupts the interval sleep
    pub fn new(handler: Box<dyn Handler>, wake: Arc<Notify>) -> Self {
        Self {
            backends: BackendSlots::new(),
            watcher: None,
            handler,
            script_watcher: None,
            wake,
            interval: DEFAULT_INTERVAL,
            state: DispatcherState::Idle,
        }
    }

    pub fn with_backend(mut self, backend: Box<dyn Backend>) -> Self {
        self.add_backend(backend);
        self
    }

    pub fn with_focus_watcher(mut self, watcher: FocusWatcher) -> Self {
        self.watcher = Some(watcher);
        self
    }

    pub fn with_script_watcher(mut self, watcher: ScriptWatcher) -> Self {
        self.script_watcher = Some(watcher);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Install a backend in its slot, replacing any previous one of the same kind
    pub fn add_backend(&mut self, backend: Box<dyn Backend>) {
        let kind = backend.kind();
        if self.backends.insert(backend).is_some() {
            warn!("{} backend replaced", kind);
        }
    }

    pub fn backends(&self) -> &BackendSlots {
        &self.backends
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    fn is_idle(&self) -> bool {
        self.backends.is_empty() && self.watcher.is_none()
    }

    /// Run a single loop iteration without waiting
    pub fn iterate(&mut self) -> IterationReport {
        let mut report = IterationReport::default();

        if let Some(watcher) = self.watcher.as_mut() {
            if let Some(title) = watcher.poll() {
                report.focus_changed = true;
                info!("Focus: {}", title);
                if let Err(e) = self.handler.on_focus(&title, &mut self.backends) {
                    error!("window_focus handler failed: {}", e);
                }
            }
        }

        self.backends.check_validity();

        for kind in DRAIN_ORDER {
            let mut drained = 0;
            while drained < MAX_EVENTS_PER_BACKEND {
                let Some(event) = self.backends.receive_from(kind) else {
                    break;
                };
                drained += 1;

                debug!("{} RX {}", kind, event);
                if let Err(e) = self.handler.on_midi(event, &mut self.backends) {
                    error!("midi_recv failed, dropping {}: {}", event, e);
                }
            }
            report.delivered += drained;

            if drained == MAX_EVENTS_PER_BACKEND && self.backends.has_pending(kind) {
                report.backlog = true;
            }
        }

        report
    }

    fn reload_handler(&mut self) {
        match self.handler.reload() {
            Ok(()) => info!("Script reloaded"),
            Err(e) => warn!("Failed to reload script (keeping old one): {}", e),
        }
    }

    /// Loop until `shutdown` resolves
    ///
    /// Iterations run on every interval tick and whenever a backend queues
    /// input. Shutdown is only observed between iterations.
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);

        if self.is_idle() {
            warn!("No MIDI backend or focus watcher active, nothing to do");
            self.state = DispatcherState::Idle;
        } else {
            self.state = DispatcherState::Running;
        }
        info!(
            "Dispatcher running ({} backends, focus tracking {}, interval {:?})",
            self.backends.len(),
            if self.watcher.is_some() { "on" } else { "off" },
            self.interval
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let wake = self.wake.clone();

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => break,

                changed = next_script_change(&mut self.script_watcher) => {
                    match changed {
                        Some(()) => self.reload_handler(),
                        None => {
                            warn!("Script watcher stopped, hot reload disabled");
                            self.script_watcher = None;
                        }
                    }
                    continue;
                }

                _ = wake.notified() => {}

                _ = ticker.tick() => {}
            }

            let report = self.iterate();
            if report.backlog {
                // Come straight back for the rest of the queue
                wake.notify_one();
            }
        }

        self.state = DispatcherState::ShuttingDown;
        info!("Dispatcher stopped");
    }

    /// Release every backend transport
    pub fn shutdown(mut self) {
        self.state = DispatcherState::ShuttingDown;
        let closed = self.backends.close_all();
        debug!("Closed {} backends", closed);
    }
}

async fn next_script_change(watcher: &mut Option<ScriptWatcher>) -> Option<()> {
    match watcher {
        Some(watcher) => watcher.changed().await,
        None => std::future::pending().await,
    }
}
