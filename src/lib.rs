//! midi2input
//!
//! Routes MIDI between JACK / ALSA sequencer ports and a user Lua script,
//! which can also react to desktop window focus changes and run commands.

pub mod backend;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod focus;
pub mod handler;
pub mod midi;
pub mod paths;
pub mod ports;
pub mod startup;

pub use backend::{Backend, BackendConfig, BackendKind};
pub use config::Settings;
pub use dispatcher::{Dispatcher, DispatcherState};
pub use error::{BackendError, HandlerError, StartupError};
pub use focus::FocusWatcher;
pub use handler::{Handler, Host, LuaHandler};
pub use midi::{MidiEvent, MidiMessage};
