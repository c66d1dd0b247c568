//! Bounded hand-off queue between transport threads and the dispatcher
//!
//! The producer side runs on transport threads (JACK process callback, midir
//! input thread) and must never block or log, so overflow is only counted.
//! The consumer side reports the count the next time it is drained.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use tokio::sync::Notify;
use tracing::warn;

use crate::midi::MidiEvent;

/// Create a queue of the given capacity
///
/// `wake` is notified on every successful push; pass `None` for queues the
/// dispatcher does not wait on (outbound queues).
pub fn channel(
    label: impl Into<String>,
    capacity: usize,
    wake: Option<Arc<Notify>>,
) -> (EventSink, EventSource) {
    let (tx, rx) = bounded(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));

    (
        EventSink {
            tx,
            wake,
            dropped: dropped.clone(),
        },
        EventSource {
            label: label.into(),
            rx,
            dropped,
        },
    )
}

/// Producer half, safe to use from realtime threads
#[derive(Clone)]
pub struct EventSink {
    tx: Sender<MidiEvent>,
    wake: Option<Arc<Notify>>,
    dropped: Arc<AtomicU64>,
}

impl EventSink {
    /// Queue an event; returns false if it had to be dropped
    pub fn push(&self, event: MidiEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => {
                if let Some(wake) = &self.wake {
                    wake.notify_one();
                }
                true
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }
}

/// Consumer half, owned by the dispatcher side
pub struct EventSource {
    label: String,
    rx: Receiver<MidiEvent>,
    dropped: Arc<AtomicU64>,
}

impl EventSource {
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Pop the oldest queued event without blocking
    pub fn try_recv(&self) -> Option<MidiEvent> {
        self.report_dropped();
        self.rx.try_recv().ok()
    }

    /// Pop without reporting overflow; for use on realtime threads
    pub fn pop_quiet(&self) -> Option<MidiEvent> {
        self.rx.try_recv().ok()
    }

    /// Take the overflow count accumulated since the last call
    pub fn take_dropped(&self) -> u64 {
        self.dropped.swap(0, Ordering::Relaxed)
    }

    fn report_dropped(&self) {
        let dropped = self.take_dropped();
        if dropped > 0 {
            warn!("{}: queue full, dropped {} MIDI events", self.label, dropped);
        }
    }
}
