//! ALSA sequencer backend
//!
//! Uses midir's virtual ports so the process shows up as a sequencer client
//! with one writable and one readable port that aconnect/qjackctl can patch.

use midir::os::unix::{VirtualInput, VirtualOutput};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use tracing::{debug, info, trace, warn};

use super::{queue, Backend, BackendConfig, BackendKind, EventSource, ValidFlag};
use crate::error::BackendError;
use crate::midi::{format_hex, MidiEvent};

// SysEx cannot be represented; everything else is delivered as on JACK
const INPUT_IGNORE: Ignore = Ignore::Sysex;

/// ALSA sequencer client with one input and one output port
pub struct AlsaBackend {
    // Dropping the connections closes the sequencer ports
    input: Option<MidiInputConnection<()>>,
    output: Option<MidiOutputConnection>,
    inbound: EventSource,
    valid: ValidFlag,
    port_prefix: String,
}

impl AlsaBackend {
    /// Register the sequencer client and create both virtual ports
    pub fn open(config: &BackendConfig) -> Result<Self, BackendError> {
        let in_name = format!("{} in", config.client_name);
        let out_name = format!("{} out", config.client_name);

        let (sink, inbound) = queue::channel(
            "ALSA input",
            config.queue_capacity,
            Some(config.wake.clone()),
        );

        let mut midi_in = MidiInput::new(&config.client_name)?;
        midi_in.ignore(INPUT_IGNORE);

        let input = midi_in
            .create_virtual(
                &in_name,
                move |_timestamp, data, _| match MidiEvent::from_bytes(data) {
                    Some(event) => {
                        sink.push(event);
                    }
                    None => {
                        trace!("ALSA RX skipped {} byte message: {}", data.len(), format_hex(data));
                    }
                },
                (),
            )
            .map_err(|e| BackendError::Port(format!("{}: {}", in_name, e)))?;

        let midi_out = MidiOutput::new(&config.client_name)?;
        let output = midi_out
            .create_virtual(&out_name)
            .map_err(|e| BackendError::Port(format!("{}: {}", out_name, e)))?;

        info!(
            "ALSA sequencer client '{}' ready (ports: '{}', '{}')",
            config.client_name, in_name, out_name
        );

        Ok(Self {
            input: Some(input),
            output: Some(output),
            inbound,
            valid: ValidFlag::new(true),
            port_prefix: config.client_name.clone(),
        })
    }
}

impl Backend for AlsaBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Alsa
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
        let Some(output) = self.output.as_mut() else {
            return;
        };

        let bytes = event.wire_bytes();
        trace!("ALSA TX -> {} out: {}", self.port_prefix, format_hex(&bytes));
        if let Err(e) = output.send(&bytes) {
            warn!("ALSA send failed: {}", BackendError::from(e));
        }
    }
}

impl Drop for AlsaBackend {
    fn drop(&mut self) {
        if let Some(input) = self.input.take() {
            input.close();
        }
        if let Some(output) = self.output.take() {
            output.close();
        }
        debug!("ALSA sequencer client '{}' closed", self.port_prefix);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realtime_messages_are_not_filtered() {
        let ignored = INPUT_IGNORE as u8;
        assert_ne!(ignored & Ignore::Sysex as u8, 0);
        assert_eq!(ignored & Ignore::ActiveSense as u8, 0);
        assert_eq!(ignored & Ignore::Time as u8, 0);
    }

    #[test]
    fn test_active_sensing_survives_the_queue() {
        let (sink, source) = queue::channel("ALSA input", 4, None);
        let event = MidiEvent::from_bytes(&[0xFE]).unwrap();
        assert!(sink.push(event));

        let received = source.try_recv().unwrap();
        assert_eq!(received, MidiEvent::new(0xFE, 0, 0));
        assert_eq!(received.wire_bytes(), vec![0xFE]);
    }
}
