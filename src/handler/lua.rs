//! Lua handler
//!
//! Script contract:
//! - `midi_recv(status, data1, data2)` is called for every inbound event
//! - `window_focus(title)` is called when the focused window changes
//! - `midi_send({status, data1, data2})` sends on every active backend
//! - `exec(command)` runs a shell command and returns true on success
//!
//! Both callbacks are optional. The `midi_send` and `exec` globals stay the
//! same function for the life of the state, so scripts may keep their own
//! references (`local send = midi_send`). They reach the dispatcher's host
//! only while a callback is running; `midi_send` from the script's top level
//! is ignored and `exec` there runs the command directly.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use mlua::{Function, IntoLuaMulti, Lua, Table};
use tracing::{debug, info, warn};

use super::{run_external, Handler, Host};
use crate::error::HandlerError;
use crate::midi::MidiEvent;

const MIDI_RECV: &str = "midi_recv";
const WINDOW_FOCUS: &str = "window_focus";
const MIDI_SEND: &str = "midi_send";
const EXEC: &str = "exec";

// Registry slots holding the host-bound functions of the running callback
const BOUND_SEND: &str = "midi2input.bound_send";
const BOUND_EXEC: &str = "midi2input.bound_exec";

pub struct LuaHandler {
    lua: Lua,
    path: Option<PathBuf>,
}

impl LuaHandler {
    /// Load and run a script file
    ///
    /// The file is read as raw bytes, so string literals in any encoding are
    /// kept as written.
    pub fn load(path: &Path) -> Result<Self, HandlerError> {
        let source = std::fs::read(path)?;
        let mut handler = Self::from_source(&path.display().to_string(), source)?;
        handler.path = Some(path.to_path_buf());
        info!("Using: {}", path.display());
        Ok(handler)
    }

    /// Build a handler from script text; `name` only appears in error messages
    pub fn from_source(name: &str, source: impl AsRef<[u8]>) -> Result<Self, HandlerError> {
        let lua = Lua::new();

        let send = lua.create_function(|lua, event: Table| {
            match lua.named_registry_value::<Option<Function>>(BOUND_SEND)? {
                Some(bound) => bound.call::<()>(event),
                None => {
                    debug!("midi_send outside of a callback ignored");
                    Ok(())
                }
            }
        })?;
        let exec = lua.create_function(|lua, command: String| {
            match lua.named_registry_value::<Option<Function>>(BOUND_EXEC)? {
                Some(bound) => bound.call::<bool>(command),
                None => Ok(run_external(&command).is_success()),
            }
        })?;

        let globals = lua.globals();
        globals.set(MIDI_SEND, send)?;
        globals.set(EXEC, exec)?;

        lua.load(source.as_ref()).set_name(name).exec()?;

        if globals.get::<Option<Function>>(MIDI_RECV)?.is_none() {
            warn!("{}: no '{}' function defined, MIDI input will be ignored", name, MIDI_RECV);
        }

        Ok(Self { lua, path: None })
    }

    /// Call a global function with `midi_send`/`exec` routed to `host`
    fn call_with_host(
        &self,
        name: &str,
        args: impl IntoLuaMulti,
        host: &mut dyn Host,
    ) -> Result<(), HandlerError> {
        let Some(func) = self.lua.globals().get::<Option<Function>>(name)? else {
            debug!("'{}' not defined in script, skipping", name);
            return Ok(());
        };

        let host = RefCell::new(host);
        let result = self.lua.scope(|scope| {
            let send = scope.create_function(|_, table: Table| {
                let event = event_from_table(&table)?;
                host.borrow_mut().send(event);
                Ok(())
            })?;
            let exec = scope.create_function(|_, command: String| {
                Ok(host.borrow_mut().run_external(&command).is_success())
            })?;

            self.lua.set_named_registry_value(BOUND_SEND, send)?;
            self.lua.set_named_registry_value(BOUND_EXEC, exec)?;
            func.call::<()>(args)
        });

        // Scoped functions are dead now
        self.lua.unset_named_registry_value(BOUND_SEND)?;
        self.lua.unset_named_registry_value(BOUND_EXEC)?;

        result.map_err(HandlerError::from)
    }
}

fn event_from_table(table: &Table) -> mlua::Result<MidiEvent> {
    Ok(MidiEvent::new(
        table.get::<u8>(1)?,
        table.get::<u8>(2)?,
        table.get::<u8>(3)?,
    ))
}

impl Handler for LuaHandler {
    fn on_midi(&mut self, event: MidiEvent, host: &mut dyn Host) -> Result<(), HandlerError> {
        self.call_with_host(MIDI_RECV, (event.status, event.data1, event.data2), host)
    }

    fn on_focus(&mut self, title: &str, host: &mut dyn Host) -> Result<(), HandlerError> {
        self.call_with_host(WINDOW_FOCUS, title.to_string(), host)
    }

    fn reload(&mut self) -> Result<(), HandlerError> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        *self = Self::load(&path)?;
        Ok(())
    }
}
