//! Runtime settings for midi2input
//!
//! Built from the command line (see `cli.rs`). The user's routing logic lives
//! in the Lua script, which is located by `paths.rs` and watched for changes
//! by [`ScriptWatcher`].

pub mod watcher;

use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

use crate::backend::BackendKind;
use crate::dispatcher::DEFAULT_INTERVAL;

pub use watcher::ScriptWatcher;

/// Application name; used for the script file name and the default client name
pub const APP_NAME: &str = "midi2input";

/// Everything needed to start the router
#[derive(Debug, Clone)]
pub struct Settings {
    /// Transport client name, also the prefix of every port
    pub client_name: String,
    /// Backends to open, in the order they were requested
    pub backends: Vec<BackendKind>,
    /// Script given with `--config`, tried before the default locations
    pub script: Option<PathBuf>,
    /// Time between loop iterations when no input arrives
    pub interval: Duration,
    /// Track the focused window
    pub focus: bool,
    /// Reload the script when it changes on disk
    pub hot_reload: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client_name: APP_NAME.to_string(),
            backends: Vec::new(),
            script: None,
            interval: DEFAULT_INTERVAL,
            focus: true,
            hot_reload: true,
        }
    }
}

impl Settings {
    /// Request a backend; duplicates are ignored
    pub fn enable_backend(&mut self, kind: BackendKind) {
        if !self.backends.contains(&kind) {
            self.backends.push(kind);
        }
    }

    /// Validate settings for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.client_name.trim().is_empty() {
            anyhow::bail!("client name cannot be empty");
        }
        if self.interval.is_zero() {
            anyhow::bail!("loop interval must be greater than zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.client_name, "midi2input");
        assert!(settings.backends.is_empty());
        assert_eq!(settings.interval, Duration::from_secs(1));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_enable_backend_deduplicates() {
        let mut settings = Settings::default();
        settings.enable_backend(BackendKind::Alsa);
        settings.enable_backend(BackendKind::Jack);
        settings.enable_backend(BackendKind::Alsa);
        assert_eq!(settings.backends, vec![BackendKind::Alsa, BackendKind::Jack]);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let settings = Settings {
            client_name: "  ".to_string(),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());

        let settings = Settings {
            interval: Duration::ZERO,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
