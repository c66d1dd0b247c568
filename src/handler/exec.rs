//! External command execution for handlers

use std::process::{Command, Stdio};

use tracing::{info, warn};

/// Completion status of an external command; its output only goes to the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Success,
    /// Non-zero exit, or `None` if killed by a signal
    Failed(Option<i32>),
    /// The shell could not be started
    SpawnFailed,
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Success)
    }
}

/// Run `command` through `sh -c` and wait for it
///
/// stdout lines are logged at info, stderr lines at warn. Failures are logged
/// and returned, never propagated.
pub fn run_external(command: &str) -> CommandOutcome {
    info!("exec: {}", command);

    let output = match Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .output()
    {
        Ok(output) => output,
        Err(e) => {
            warn!("exec: cannot start '{}': {}", command, e);
            return CommandOutcome::SpawnFailed;
        }
    };

    for line in String::from_utf8_lossy(&output.stdout).lines() {
        info!("  {}", line);
    }
    for line in String::from_utf8_lossy(&output.stderr).lines() {
        warn!("  {}", line);
    }

    if output.status.success() {
        CommandOutcome::Success
    } else {
        let code = output.status.code();
        match code {
            Some(code) => warn!("exec: '{}' exited with status {}", command, code),
            None => warn!("exec: '{}' terminated by signal", command),
        }
        CommandOutcome::Failed(code)
    }
}
