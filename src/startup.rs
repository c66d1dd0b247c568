//! Startup wiring: script, backends and watchers into a [`Dispatcher`]

use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{info, warn};

use crate::backend::{self, Backend, BackendConfig, BackendKind};
use crate::config::{ScriptWatcher, Settings};
use crate::dispatcher::Dispatcher;
use crate::error::StartupError;
use crate::focus::FocusWatcher;
use crate::handler::LuaHandler;
use crate::paths;

/// Build the dispatcher, opening backends with [`backend::open`]
///
/// Must be called inside a Tokio runtime when hot reload is enabled.
pub fn build_dispatcher(settings: &Settings) -> Result<Dispatcher, StartupError> {
    build_dispatcher_with(settings, backend::open)
}

/// Build the dispatcher with a custom backend opener
///
/// Every backend in `settings` was asked for explicitly, so one that comes
/// back invalid aborts startup. Backends opened before it are closed on the
/// way out.
pub fn build_dispatcher_with<F>(settings: &Settings, mut open: F) -> Result<Dispatcher, StartupError>
where
    F: FnMut(BackendKind, &BackendConfig) -> Result<Box<dyn Backend>, StartupError>,
{
    let script = paths::discover(settings.script.as_deref())?;
    let handler = LuaHandler::load(&script).map_err(|source| StartupError::Script {
        path: script.clone(),
        source,
    })?;

    let wake = Arc::new(Notify::new());
    let backend_config = BackendConfig::new(settings.client_name.clone(), wake.clone());

    let mut dispatcher =
        Dispatcher::new(Box::new(handler), wake).with_interval(settings.interval);

    for &kind in &settings.backends {
        let opened = open(kind, &backend_config)?;
        if !opened.is_valid() {
            return Err(StartupError::BackendOpen(kind));
        }
        info!("{} backend ready as '{}'", kind, settings.client_name);
        dispatcher.add_backend(opened);
    }

    if settings.focus {
        dispatcher = dispatcher.with_focus_watcher(FocusWatcher::platform());
    }

    if settings.hot_reload {
        match ScriptWatcher::new(&script) {
            Ok(watcher) => dispatcher = dispatcher.with_script_watcher(watcher),
            Err(e) => warn!("Hot reload disabled: {:#}", e),
        }
    }

    Ok(dispatcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InvalidBackend;
    use crate::midi::MidiEvent;
    use crate::paths::tests::HomeGuard;
    use serial_test::serial;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    /// Valid backend that records when it is dropped
    struct DropFlagBackend {
        kind: BackendKind,
        dropped: Arc<AtomicBool>,
    }

    impl Backend for DropFlagBackend {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        fn is_valid(&self) -> bool {
            true
        }

        fn has_pending_input(&self) -> bool {
            false
        }

        fn receive(&mut self) -> Option<MidiEvent> {
            None
        }

        fn send(&mut self, _event: MidiEvent) {}
    }

    impl Drop for DropFlagBackend {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    fn settings_with_script(dir: &TempDir, source: &str) -> Settings {
        let script = dir.path().join("router.lua");
        std::fs::write(&script, source).unwrap();
        Settings {
            script: Some(script),
            focus: false,
            hot_reload: false,
            ..Settings::default()
        }
    }

    #[test]
    fn test_invalid_requested_backend_aborts_and_closes_opened_ones() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings_with_script(&dir, "function midi_recv(s, a, b) end");
        settings.enable_backend(BackendKind::Alsa);
        settings.enable_backend(BackendKind::Jack);

        let dropped = Arc::new(AtomicBool::new(false));
        let mut requested = Vec::new();
        let result = build_dispatcher_with(&settings, |kind, config| {
            assert_eq!(config.client_name, "midi2input");
            requested.push(kind);
            match kind {
                BackendKind::Alsa => Ok(Box::new(DropFlagBackend {
                    kind,
                    dropped: dropped.clone(),
                }) as Box<dyn Backend>),
                BackendKind::Jack => Ok(Box::new(InvalidBackend::new(kind)) as Box<dyn Backend>),
            }
        });

        let err = match result {
            Ok(_) => panic!("startup should fail"),
            Err(e) => e,
        };
        assert!(matches!(err, StartupError::BackendOpen(BackendKind::Jack)));
        assert_eq!(err.exit_code(), 5);
        assert_eq!(requested, vec![BackendKind::Alsa, BackendKind::Jack]);
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_opened_backends_are_installed() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings_with_script(&dir, "");
        settings.enable_backend(BackendKind::Jack);

        let dropped = Arc::new(AtomicBool::new(false));
        let dispatcher = build_dispatcher_with(&settings, |kind, _| {
            Ok(Box::new(DropFlagBackend {
                kind,
                dropped: dropped.clone(),
            }) as Box<dyn Backend>)
        })
        .unwrap();

        assert_eq!(dispatcher.backends().len(), 1);
        assert!(dispatcher.backends().get(BackendKind::Jack).is_some());
        assert!(!dropped.load(Ordering::SeqCst));

        dispatcher.shutdown();
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_unavailable_backend_error_is_passed_through() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings_with_script(&dir, "");
        settings.enable_backend(BackendKind::Jack);

        let result = build_dispatcher_with(&settings, |kind, _| {
            Err(StartupError::BackendUnavailable(kind))
        });
        assert_eq!(result.err().map(|e| e.exit_code()), Some(4));
    }

    #[test]
    fn test_broken_script_fails_before_backends_open() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings_with_script(&dir, "function midi_recv(");
        settings.enable_backend(BackendKind::Alsa);

        let result = build_dispatcher_with(&settings, |_, _| -> Result<Box<dyn Backend>, StartupError> {
            panic!("backend opened despite a broken script")
        });
        match result {
            Err(e @ StartupError::Script { .. }) => assert_eq!(e.exit_code(), 3),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("startup should fail"),
        }
    }

    #[test]
    #[serial]
    fn test_missing_script_exits_with_config_not_found() {
        let home = TempDir::new().unwrap();
        let _guard = HomeGuard::set(home.path());

        let settings = Settings {
            script: Some(PathBuf::from("/nonexistent/router.lua")),
            focus: false,
            hot_reload: false,
            ..Settings::default()
        };
        let result = build_dispatcher_with(&settings, |_, _| -> Result<Box<dyn Backend>, StartupError> {
            panic!("backend opened without a script")
        });
        assert_eq!(result.err().map(|e| e.exit_code()), Some(2));
    }
}
