//! Script location.
//!
//! The script is looked up in a fixed order:
//!
//! 1. the path given with `--config`, if any
//! 2. `$HOME/.config/midi2input.lua`
//! 3. `$HOME/.midi2input.lua`
//!
//! The first candidate that can be opened for reading wins.

use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::APP_NAME;
use crate::error::StartupError;

/// Candidate script paths, in lookup order
pub fn candidates(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(3);
    if let Some(path) = explicit {
        paths.push(path.to_path_buf());
    }

    let file_name = format!("{}.lua", APP_NAME);
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".config").join(&file_name));
        paths.push(home.join(format!(".{}", file_name)));
    }
    paths
}

/// Find the script to load
pub fn discover(explicit: Option<&Path>) -> Result<PathBuf, StartupError> {
    let tried = candidates(explicit);
    for path in &tried {
        match File::open(path) {
            Ok(_) if path.is_file() => return Ok(path.clone()),
            Ok(_) => debug!("Skipping {}: not a file", path.display()),
            Err(e) => debug!("Skipping {}: {}", path.display(), e),
        }
    }
    Err(StartupError::ConfigNotFound(tried))
}
