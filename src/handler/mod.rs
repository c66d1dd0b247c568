//! User handler boundary
//!
//! The dispatcher calls into a [`Handler`] for every inbound event and focus
//! change. During those calls the handler gets a [`Host`] through which it
//! can emit MIDI or run commands; it never sees the backends themselves.

pub mod exec;
pub mod lua;

pub use exec::{run_external, CommandOutcome};
pub use lua::LuaHandler;

use crate::error::HandlerError;
use crate::midi::MidiEvent;

/// Primitives a handler may call back into while it is being invoked
pub trait Host {
    /// Send an event on every valid backend
    fn send(&mut self, event: MidiEvent);

    /// Run a shell command, logging its output
    fn run_external(&mut self, command: &str) -> CommandOutcome;
}

/// User logic invoked by the dispatcher
pub trait Handler {
    fn on_midi(&mut self, event: MidiEvent, host: &mut dyn Host) -> Result<(), HandlerError>;

    fn on_focus(&mut self, title: &str, host: &mut dyn Host) -> Result<(), HandlerError>;

    /// Re-read the handler's source; on error the previous logic stays active
    fn reload(&mut self) -> Result<(), HandlerError> {
        Ok(())
    }
}
