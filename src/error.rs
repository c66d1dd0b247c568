//! Error types for startup, backends and handler calls

use std::path::PathBuf;
use thiserror::Error;

use crate::backend::BackendKind;

/// Failures that stop the process before the event loop starts
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("no configuration script found (tried: {})", format_paths(.0))]
    ConfigNotFound(Vec<PathBuf>),

    #[error("cannot load script {path}: {source}")]
    Script {
        path: PathBuf,
        #[source]
        source: HandlerError,
    },

    #[error("not compiled with the {0} MIDI backend")]
    BackendUnavailable(BackendKind),

    #[error("{0} MIDI backend failed to open")]
    BackendOpen(BackendKind),
}

impl StartupError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            StartupError::ConfigNotFound(_) => 2,
            StartupError::Script { .. } => 3,
            StartupError::BackendUnavailable(_) => 4,
            StartupError::BackendOpen(_) => 5,
        }
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Transport-level failures raised while opening or driving a backend
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("MIDI client error: {0}")]
    Client(String),

    #[error("MIDI port error: {0}")]
    Port(String),

    #[error("MIDI send failed: {0}")]
    Send(String),
}

impl From<midir::InitError> for BackendError {
    fn from(e: midir::InitError) -> Self {
        BackendError::Client(e.to_string())
    }
}

impl From<midir::SendError> for BackendError {
    fn from(e: midir::SendError) -> Self {
        BackendError::Send(e.to_string())
    }
}

#[cfg(feature = "jack")]
impl From<jack::Error> for BackendError {
    fn from(e: jack::Error) -> Self {
        BackendError::Client(e.to_string())
    }
}

/// A handler callback (or script load) failed
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("script error: {0}")]
    Script(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<mlua::Error> for HandlerError {
    fn from(e: mlua::Error) -> Self {
        HandlerError::Script(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_and_non_zero() {
        let errors = [
            StartupError::ConfigNotFound(vec![]),
            StartupError::Script {
                path: PathBuf::from("x.lua"),
                source: HandlerError::Script("boom".into()),
            },
            StartupError::BackendUnavailable(BackendKind::Jack),
            StartupError::BackendOpen(BackendKind::Alsa),
        ];

        let mut codes: Vec<i32> = errors.iter().map(|e| e.exit_code()).collect();
        assert!(codes.iter().all(|c| *c != 0));
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_config_not_found_lists_candidates() {
        let err = StartupError::ConfigNotFound(vec![
            PathBuf::from("/a/midi2input.lua"),
            PathBuf::from("/b/.midi2input.lua"),
        ]);
        assert_eq!(
            err.to_string(),
            "no configuration script found (tried: /a/midi2input.lua, /b/.midi2input.lua)"
        );
    }
}
