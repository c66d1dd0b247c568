//! X11 focused-window provider (EWMH)

use thiserror::Error;
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::errors::{ConnectError, ConnectionError, ReplyError};
use x11rb::protocol::xproto::{Atom, AtomEnum, ConnectionExt, Window};
use x11rb::rust_connection::RustConnection;

use super::WindowProvider;

// WM_NAME may be STRING, COMPOUND_TEXT or UTF8_STRING depending on the client
const LEGACY_TITLE_TYPE: AtomEnum = AtomEnum::ANY;

#[derive(Error, Debug)]
pub enum X11Error {
    #[error("cannot connect to X server: {0}")]
    Connect(#[from] ConnectError),

    #[error("X connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("X request failed: {0}")]
    Reply(#[from] ReplyError),
}

/// Reads `_NET_ACTIVE_WINDOW` from the root window and the title of that
/// window, preferring `_NET_WM_NAME` over the legacy `WM_NAME`
pub struct X11Provider {
    conn: RustConnection,
    root: Window,
    net_active_window: Atom,
    net_wm_name: Atom,
    utf8_string: Atom,
}

impl X11Provider {
    pub fn connect() -> Result<Self, X11Error> {
        let (conn, screen_num) = x11rb::connect(None)?;
        let root = conn.setup().roots[screen_num].root;

        let net_active_window = intern(&conn, b"_NET_ACTIVE_WINDOW")?;
        let net_wm_name = intern(&conn, b"_NET_WM_NAME")?;
        let utf8_string = intern(&conn, b"UTF8_STRING")?;

        Ok(Self {
            conn,
            root,
            net_active_window,
            net_wm_name,
            utf8_string,
        })
    }

    fn active_window(&self) -> Result<Option<Window>, X11Error> {
        let reply = self
            .conn
            .get_property(false, self.root, self.net_active_window, AtomEnum::WINDOW, 0, 1)?
            .reply()?;

        Ok(reply
            .value32()
            .and_then(|mut values| values.next())
            .filter(|window| *window != x11rb::NONE))
    }

    fn window_title(&self, window: Window) -> Result<Option<String>, X11Error> {
        let reply = self
            .conn
            .get_property(false, window, self.net_wm_name, self.utf8_string, 0, u32::MAX)?
            .reply()?;
        if let Some(title) = decode_title(&reply.value) {
            return Ok(Some(title));
        }

        let reply = self
            .conn
            .get_property(false, window, AtomEnum::WM_NAME, LEGACY_TITLE_TYPE, 0, u32::MAX)?
            .reply()?;
        Ok(decode_title(&reply.value))
    }

    fn query(&self) -> Result<Option<String>, X11Error> {
        match self.active_window()? {
            Some(window) => self.window_title(window),
            None => Ok(None),
        }
    }
}

impl WindowProvider for X11Provider {
    fn active_window_title(&mut self) -> Option<String> {
        match self.query() {
            Ok(title) => title,
            Err(e) => {
                // The focused window can vanish between the two requests
                debug!("X11 focus query failed: {}", e);
                None
            }
        }
    }
}

fn intern(conn: &RustConnection, name: &[u8]) -> Result<Atom, X11Error> {
    Ok(conn.intern_atom(false, name)?.reply()?.atom)
}

/// Property bytes to a title; `None` when the property is unset or empty
///
/// Bytes that are not UTF-8 are read as Latin-1, the encoding of `STRING`.
fn decode_title(value: &[u8]) -> Option<String> {
    let end = value.iter().rposition(|b| *b != 0)? + 1;
    let value = &value[..end];
    Some(match std::str::from_utf8(value) {
        Ok(title) => title.to_owned(),
        Err(_) => value.iter().map(|&b| char::from(b)).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_title_accepts_any_type() {
        assert_eq!(LEGACY_TITLE_TYPE, AtomEnum::ANY);
    }

    #[test]
    fn test_decode_title() {
        assert_eq!(decode_title(b""), None);
        assert_eq!(decode_title(b"\0\0"), None);
        assert_eq!(decode_title(b"Ardour\0").as_deref(), Some("Ardour"));
        assert_eq!(decode_title("café.txt".as_bytes()).as_deref(), Some("café.txt"));
        assert_eq!(decode_title(b"caf\xe9.txt").as_deref(), Some("café.txt"));
    }
}
