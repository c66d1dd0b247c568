//! JACK backend
//!
//! Registers a JACK client with `midi_in`/`midi_out` ports. The realtime
//! process callback copies inbound events to the dispatcher queue and flushes
//! queued outbound events into the output buffer of the same cycle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{queue, Backend, BackendConfig, BackendKind, EventSink, EventSource, ValidFlag};
use crate::error::BackendError;
use crate::midi::MidiEvent;

const INPUT_PORT: &str = "midi_in";
const OUTPUT_PORT: &str = "midi_out";

/// Realtime side: runs on the JACK process thread
struct Process {
    midi_in: jack::Port<jack::MidiIn>,
    midi_out: jack::Port<jack::MidiOut>,
    inbound: EventSink,
    outbound: EventSource,
    write_failures: Arc<AtomicU64>,
}

impl jack::ProcessHandler for Process {
    fn process(&mut self, _: &jack::Client, ps: &jack::ProcessScope) -> jack::Control {
        for raw in self.midi_in.iter(ps) {
            if let Some(event) = MidiEvent::from_bytes(raw.bytes) {
                self.inbound.push(event);
            }
        }

        let mut writer = self.midi_out.writer(ps);
        while let Some(event) = self.outbound.pop_quiet() {
            // No allocation on the process thread
            let bytes = event.to_bytes();
            let raw = jack::RawMidi {
                time: 0,
                bytes: &bytes[..event.wire_len()],
            };
            if writer.write(&raw).is_err() {
                self.write_failures.fetch_add(1, Ordering::Relaxed);
            }
        }

        jack::Control::Continue
    }
}

/// Server notifications; only shutdown matters here
struct Notifications {
    valid: ValidFlag,
}

impl jack::NotificationHandler for Notifications {
    unsafe fn shutdown(&mut self, _status: jack::ClientStatus, _reason: &str) {
        self.valid.invalidate();
    }
}

/// JACK client with one MIDI input and one MIDI output port
pub struct JackBackend {
    client: Option<jack::AsyncClient<Notifications, Process>>,
    inbound: EventSource,
    outbound: EventSink,
    valid: ValidFlag,
    write_failures: Arc<AtomicU64>,
}

impl JackBackend {
    /// Connect to a running JACK server (never starts one)
    pub fn open(config: &BackendConfig) -> Result<Self, BackendError> {
        let (client, status) =
            jack::Client::new(&config.client_name, jack::ClientOptions::NO_START_SERVER)?;
        debug!("JACK client status: {:?}", status);

        let midi_in = client
            .register_port(INPUT_PORT, jack::MidiIn::default())
            .map_err(|e| BackendError::Port(format!("{}: {}", INPUT_PORT, e)))?;
        let midi_out = client
            .register_port(OUTPUT_PORT, jack::MidiOut::default())
            .map_err(|e| BackendError::Port(format!("{}: {}", OUTPUT_PORT, e)))?;

        let (in_sink, inbound) = queue::channel(
            "JACK input",
            config.queue_capacity,
            Some(config.wake.clone()),
        );
        let (outbound, out_source) = queue::channel("JACK output", config.queue_capacity, None);

        let valid = ValidFlag::new(true);
        let write_failures = Arc::new(AtomicU64::new(0));

        let process = Process {
            midi_in,
            midi_out,
            inbound: in_sink,
            outbound: out_source,
            write_failures: write_failures.clone(),
        };
        let notifications = Notifications {
            valid: valid.clone(),
        };

        let client = client.activate_async(notifications, process)?;
        info!(
            "JACK client '{}' active (ports: {}, {})",
            client.as_client().name(),
            INPUT_PORT,
            OUTPUT_PORT
        );

        Ok(Self {
            client: Some(client),
            inbound,
            outbound,
            valid,
            write_failures,
        })
    }
}

impl Backend for JackBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Jack
    }

    fn is_valid(&self) -> bool {
        self.valid.get()
    }

    fn has_pending_input(&self) -> bool {
        !self.inbound.is_empty()
    }

    fn receive(&mut self) -> Option<MidiEvent> {
        self.inbound.try_recv()
    }

    fn send(&mut self, event: MidiEvent) {
        if !self.valid.get() {
            return;
        }

        let failures = self.write_failures.swap(0, Ordering::Relaxed);
        if failures > 0 {
            warn!("JACK output buffer full, {} events were not written", failures);
        }

        if !self.outbound.push(event) {
            warn!("JACK output queue full, dropping {}", event);
        }
    }
}

impl Drop for JackBackend {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            if let Err(e) = client.deactivate() {
                warn!("JACK client deactivate failed: {}", e);
            } else {
                debug!("JACK client closed");
            }
        }
    }
}
