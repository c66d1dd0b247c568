//! MIDI transport backends (JACK, ALSA sequencer)
//!
//! Each backend owns one transport client with one input and one output
//! port. Transport threads never call into the handler: inbound events are
//! pushed onto a bounded queue that the dispatcher drains on its own thread.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::error;

use crate::error::StartupError;
use crate::midi::MidiEvent;

#[cfg(feature = "alsa")]
pub mod alsa;
#[cfg(feature = "jack")]
pub mod jack;
pub mod queue;

pub use queue::{EventSink, EventSource};

/// Default capacity of the inbound and outbound event queues
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Transport variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Jack,
    Alsa,
}

impl BackendKind {
    /// Whether this binary was built with support for the transport
    pub fn is_compiled_in(self) -> bool {
        match self {
            BackendKind::Jack => cfg!(feature = "jack"),
            BackendKind::Alsa => cfg!(feature = "alsa"),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Jack => write!(f, "JACK"),
            BackendKind::Alsa => write!(f, "ALSA"),
        }
    }
}

/// Settings shared by every backend when it opens its transport
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Client name registered with the transport (shown in patchbays)
    pub client_name: String,
    /// Capacity of the inbound/outbound queues
    pub queue_capacity: usize,
    /// Woken whenever an inbound event is queued
    pub wake: Arc<Notify>,
}

impl BackendConfig {
    pub fn new(client_name: impl Into<String>, wake: Arc<Notify>) -> Self {
        Self {
            client_name: client_name.into(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            wake,
        }
    }
}

/// Common contract over all MIDI transports
///
/// Everything here is non-blocking. `send` on an invalid backend is a silent
/// no-op so callers can broadcast without checking which transports are live.
pub trait Backend {
    fn kind(&self) -> BackendKind;

    /// False if opening failed or the transport shut the client down
    fn is_valid(&self) -> bool;

    /// True if at least one inbound event is queued
    fn has_pending_input(&self) -> bool;

    /// Pop the next inbound event in arrival order
    fn receive(&mut self) -> Option<MidiEvent>;

    /// Best-effort send on the output port
    fn send(&mut self, event: MidiEvent);
}

/// Validity flag shared between a backend and its transport callbacks
///
/// Starts valid (or not) at open time and can only go from valid to invalid,
/// once.
#[derive(Debug, Clone)]
pub struct ValidFlag(Arc<AtomicBool>);

impl ValidFlag {
    pub fn new(valid: bool) -> Self {
        Self(Arc::new(AtomicBool::new(valid)))
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Mark invalid; returns true only for the call that flipped the flag
    pub fn invalidate(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

/// Placeholder for a transport that failed to open
///
/// Permanently invalid: never yields input and ignores sends.
#[derive(Debug)]
pub struct InvalidBackend {
    kind: BackendKind,
}

impl InvalidBackend {
    pub fn new(kind: BackendKind) -> Self {
        Self { kind }
    }
}

impl Backend for InvalidBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn is_valid(&self) -> bool {
        false
    }

    fn has_pending_input(&self) -> bool {
        false
    }

    fn receive(&mut self) -> Option<MidiEvent> {
        None
    }

    fn send(&mut self, _event: MidiEvent) {}
}

/// Open a backend of the given kind
///
/// Transport failures are logged and produce an invalid backend; the caller
/// decides whether that is fatal. The only error is asking for a transport
/// this binary was built without.
pub fn open(kind: BackendKind, config: &BackendConfig) -> Result<Box<dyn Backend>, StartupError> {
    if !kind.is_compiled_in() {
        return Err(StartupError::BackendUnavailable(kind));
    }

    let opened: Result<Box<dyn Backend>, crate::error::BackendError> = match kind {
        #[cfg(feature = "jack")]
        BackendKind::Jack => jack::JackBackend::open(config).map(|b| Box::new(b) as Box<dyn Backend>),
        #[cfg(feature = "alsa")]
        BackendKind::Alsa => alsa::AlsaBackend::open(config).map(|b| Box::new(b) as Box<dyn Backend>),
        #[allow(unreachable_patterns)]
        _ => return Err(StartupError::BackendUnavailable(kind)),
    };

    match opened {
        Ok(backend) => Ok(backend),
        Err(e) => {
            error!("{} backend failed to open: {}", kind, e);
            Ok(Box::new(InvalidBackend::new(kind)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_flag_flips_once() {
        let flag = ValidFlag::new(true);
        let shared = flag.clone();

        assert!(flag.get());
        assert!(shared.invalidate());
        assert!(!flag.get());
        assert!(!shared.invalidate());
        assert!(!flag.invalidate());
    }

    #[test]
    fn test_invalid_backend_is_inert() {
        let mut backend = InvalidBackend::new(BackendKind::Jack);
        assert!(!backend.is_valid());
        assert!(!backend.has_pending_input());
        assert_eq!(backend.receive(), None);
        backend.send(MidiEvent::new(0x90, 60, 100));
        assert_eq!(backend.kind(), BackendKind::Jack);
    }

    #[test]
    fn test_unavailable_backend_is_rejected() {
        let config = BackendConfig::new("test", Arc::new(Notify::new()));
        for kind in [BackendKind::Jack, BackendKind::Alsa] {
            if !kind.is_compiled_in() {
                assert!(matches!(
                    open(kind, &config),
                    Err(StartupError::BackendUnavailable(k)) if k == kind
                ));
            }
        }
    }
}
