//! Script file watcher for hot-reload support

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Delay before a change is reported, so editors can finish writing
const DEBOUNCE: Duration = Duration::from_millis(100);

/// Watches the Lua script and reports modifications
///
/// The parent directory is watched rather than the file itself so editors
/// that save by renaming a temp file over the script are still noticed.
pub struct ScriptWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<()>,
    path: PathBuf,
}

impl ScriptWatcher {
    /// Start watching `script_path`; must be called inside a Tokio runtime
    pub fn new(script_path: &Path) -> Result<Self> {
        // Capacity 1: a burst of events collapses into a single pending reload
        let (tx, rx) = mpsc::channel(1);

        let path = script_path
            .canonicalize()
            .with_context(|| format!("Failed to resolve script path: {}", script_path.display()))?;
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        // notify callbacks run on their own OS thread, not in Tokio context
        let runtime_handle = tokio::runtime::Handle::current();
        let watched = path.clone();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        return;
                    }
                    if !event.paths.iter().any(|p| p == &watched) {
                        return;
                    }
                    debug!("Script modified: {:?}", event.paths);

                    let tx = tx.clone();
                    runtime_handle.spawn(async move {
                        tokio::time::sleep(DEBOUNCE).await;
                        // Full means a reload is already queued
                        let _ = tx.try_send(());
                    });
                }
                Err(e) => {
                    error!("Watch error: {}", e);
                }
            }
        })?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch script directory: {}", dir.display()))?;

        info!("Script watcher started for: {}", path.display());

        Ok(Self {
            _watcher: watcher,
            rx,
            path,
        })
    }

    /// Wait for the next change
    /// Returns None if the watcher has been closed
    pub async fn changed(&mut self) -> Option<()> {
        self.rx.recv().await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_script_watcher_reports_modification() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let script = temp_dir.path().join("midi2input.lua");
        fs::write(&script, "function midi_recv(s, a, b) end\n")?;

        let mut watcher = ScriptWatcher::new(&script)?;
        assert_eq!(watcher.path(), script.canonicalize()?);

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(&script, "function midi_recv(s, a, b) midi_send({ s, a, b }) end\n")?;

        let changed = tokio::time::timeout(Duration::from_secs(2), watcher.changed()).await?;
        assert_eq!(changed, Some(()));

        Ok(())
    }

    #[tokio::test]
    async fn test_script_watcher_ignores_sibling_files() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let script = temp_dir.path().join("midi2input.lua");
        fs::write(&script, "x = 1\n")?;

        let mut watcher = ScriptWatcher::new(&script)?;

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(temp_dir.path().join("other.lua"), "y = 2\n")?;

        let changed = tokio::time::timeout(Duration::from_millis(500), watcher.changed()).await;
        assert!(changed.is_err(), "unrelated file triggered a reload");

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_script_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(ScriptWatcher::new(&temp_dir.path().join("missing.lua")).is_err());
    }
}
