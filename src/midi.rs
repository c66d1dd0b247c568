//! MIDI event type shared by backends, the dispatcher and handlers
//!
//! Every message that crosses the router is exactly three bytes. Shorter
//! channel/system messages are zero-padded, anything longer (SysEx) is not
//! representable and gets rejected at the transport boundary.

use std::fmt;

/// A single 3-byte MIDI message: status, data1, data2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MidiEvent {
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
}

impl MidiEvent {
    pub const fn new(status: u8, data1: u8, data2: u8) -> Self {
        Self {
            status,
            data1,
            data2,
        }
    }

    /// Build an event from raw transport bytes
    ///
    /// Messages of 1 or 2 bytes are padded with zeros. Returns `None` for empty
    /// input and for anything longer than 3 bytes.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        match *data {
            [status] => Some(Self::new(status, 0, 0)),
            [status, data1] => Some(Self::new(status, data1, 0)),
            [status, data1, data2] => Some(Self::new(status, data1, data2)),
            _ => None,
        }
    }

    pub const fn to_bytes(self) -> [u8; 3] {
        [self.status, self.data1, self.data2]
    }

    /// Number of meaningful bytes on the wire for this status
    ///
    /// Used when writing to transports so a padded program change goes out as
    /// two bytes rather than three.
    pub fn wire_len(&self) -> usize {
        match self.status {
            0xC0..=0xDF | 0xF1 | 0xF3 => 2,
            0xF6..=0xFF => 1,
            _ => 3,
        }
    }

    /// Bytes as they should be written to a transport
    pub fn wire_bytes(&self) -> Vec<u8> {
        self.to_bytes()[..self.wire_len()].to_vec()
    }

    /// Decoded view of this event, if the status byte is recognised
    pub fn message(&self) -> Option<MidiMessage> {
        MidiMessage::parse(self)
    }
}

impl From<[u8; 3]> for MidiEvent {
    fn from(bytes: [u8; 3]) -> Self {
        Self::new(bytes[0], bytes[1], bytes[2])
    }
}

impl fmt::Display for MidiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_hex(&self.to_bytes()))?;
        if let Some(msg) = self.message() {
            write!(f, " => {}", msg)?;
        }
        Ok(())
    }
}

/// MIDI message types that fit in a 3-byte event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },

    /// Note On: channel (0-15), note (0-127), velocity (0-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Polyphonic Key Pressure: channel (0-15), note (0-127), pressure (0-127)
    PolyPressure { channel: u8, note: u8, pressure: u8 },

    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// Program Change: channel (0-15), program (0-127)
    ProgramChange { channel: u8, program: u8 },

    /// Channel Pressure: channel (0-15), pressure (0-127)
    ChannelPressure { channel: u8, pressure: u8 },

    /// Pitch Bend: channel (0-15), value (0-16383, 14-bit)
    PitchBend { channel: u8, value: u16 },

    /// Song Position Pointer
    SongPosition { position: u16 },

    /// Song Select
    SongSelect { song: u8 },

    TimingClock,
    Start,
    Continue,
    Stop,
    ActiveSensing,
    SystemReset,
}

impl MidiMessage {
    /// Decode a 3-byte event
    ///
    /// Running status and SysEx cannot occur in a `MidiEvent`, so only the
    /// fixed-size channel and system messages are recognised.
    pub fn parse(event: &MidiEvent) -> Option<Self> {
        let status = event.status;
        let d1 = event.data1 & 0x7F;
        let d2 = event.data2 & 0x7F;

        if status < 0x80 {
            return None;
        }

        if status < 0xF0 {
            let channel = status & 0x0F;
            return match status & 0xF0 {
                0x80 => Some(MidiMessage::NoteOff {
                    channel,
                    note: d1,
                    velocity: d2,
                }),
                // Note On with velocity 0 is a Note Off
                0x90 if d2 == 0 => Some(MidiMessage::NoteOff {
                    channel,
                    note: d1,
                    velocity: 0,
                }),
                0x90 => Some(MidiMessage::NoteOn {
                    channel,
                    note: d1,
                    velocity: d2,
                }),
                0xA0 => Some(MidiMessage::PolyPressure {
                    channel,
                    note: d1,
                    pressure: d2,
                }),
                0xB0 => Some(MidiMessage::ControlChange {
                    channel,
                    cc: d1,
                    value: d2,
                }),
                0xC0 => Some(MidiMessage::ProgramChange {
                    channel,
                    program: d1,
                }),
                0xD0 => Some(MidiMessage::ChannelPressure {
                    channel,
                    pressure: d1,
                }),
                0xE0 => Some(MidiMessage::PitchBend {
                    channel,
                    value: ((d2 as u16) << 7) | d1 as u16,
                }),
                _ => None,
            };
        }

        match status {
            0xF2 => Some(MidiMessage::SongPosition {
                position: ((d2 as u16) << 7) | d1 as u16,
            }),
            0xF3 => Some(MidiMessage::SongSelect { song: d1 }),
            0xF8 => Some(MidiMessage::TimingClock),
            0xFA => Some(MidiMessage::Start),
            0xFB => Some(MidiMessage::Continue),
            0xFC => Some(MidiMessage::Stop),
            0xFE => Some(MidiMessage::ActiveSensing),
            0xFF => Some(MidiMessage::SystemReset),
            _ => None,
        }
    }

    /// Get the channel for channel messages (0-15), None for system messages
    pub fn channel(&self) -> Option<u8> {
        match *self {
            MidiMessage::NoteOff { channel, .. }
            | MidiMessage::NoteOn { channel, .. }
            | MidiMessage::PolyPressure { channel, .. }
            | MidiMessage::ControlChange { channel, .. }
            | MidiMessage::ProgramChange { channel, .. }
            | MidiMessage::ChannelPressure { channel, .. }
            | MidiMessage::PitchBend { channel, .. } => Some(channel),
            _ => None,
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOff {
                channel,
                note,
                velocity,
            } => write!(f, "NoteOff ch:{} n:{} v:{}", channel + 1, note, velocity),
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => write!(f, "NoteOn ch:{} n:{} v:{}", channel + 1, note, velocity),
            MidiMessage::PolyPressure {
                channel,
                note,
                pressure,
            } => write!(f, "PolyPressure ch:{} n:{} p:{}", channel + 1, note, pressure),
            MidiMessage::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            }
            MidiMessage::ProgramChange { channel, program } => {
                write!(f, "ProgramChange ch:{} p:{}", channel + 1, program)
            }
            MidiMessage::ChannelPressure { channel, pressure } => {
                write!(f, "ChannelPressure ch:{} p:{}", channel + 1, pressure)
            }
            MidiMessage::PitchBend { channel, value } => {
                write!(f, "PitchBend ch:{} v:{}", channel + 1, value)
            }
            _ => write!(f, "{:?}", self),
        }
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_pads_short_messages() {
        assert_eq!(
            MidiEvent::from_bytes(&[0xC1, 5]),
            Some(MidiEvent::new(0xC1, 5, 0))
        );
        assert_eq!(
            MidiEvent::from_bytes(&[0xF8]),
            Some(MidiEvent::new(0xF8, 0, 0))
        );
        assert_eq!(
            MidiEvent::from_bytes(&[0x90, 0x3C, 0x7F]),
            Some(MidiEvent::new(0x90, 0x3C, 0x7F))
        );
    }

    #[test]
    fn test_from_bytes_rejects_sysex_and_empty() {
        assert_eq!(MidiEvent::from_bytes(&[]), None);
        assert_eq!(MidiEvent::from_bytes(&[0xF0, 0x7E, 0x00, 0xF7]), None);
    }

    #[test]
    fn test_wire_bytes_trims_padding() {
        assert_eq!(MidiEvent::new(0xC0, 3, 0).wire_bytes(), vec![0xC0, 3]);
        assert_eq!(MidiEvent::new(0xFA, 0, 0).wire_bytes(), vec![0xFA]);
        assert_eq!(
            MidiEvent::new(0xB0, 7, 100).wire_bytes(),
            vec![0xB0, 7, 100]
        );
    }

    #[test]
    fn test_note_on_velocity_zero() {
        let msg = MidiEvent::new(0x90, 60, 0).message().unwrap();
        assert_eq!(
            msg,
            MidiMessage::NoteOff {
                channel: 0,
                note: 60,
                velocity: 0,
            }
        );
    }

    #[test]
    fn test_pitch_bend() {
        let msg = MidiEvent::new(0xE0, 0x00, 0x40).message().unwrap();
        assert_eq!(
            msg,
            MidiMessage::PitchBend {
                channel: 0,
                value: 8192,
            }
        );
        assert_eq!(msg.channel(), Some(0));
    }

    #[test]
    fn test_display() {
        let event = MidiEvent::new(0x90, 0x3C, 0x7F);
        assert_eq!(event.to_string(), "90 3C 7F => NoteOn ch:1 n:60 v:127");
        assert_eq!(MidiEvent::new(0x12, 0, 0).to_string(), "12 00 00");
    }
}
