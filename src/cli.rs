//! Command-line interface

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::backend::BackendKind;
use crate::config::{Settings, APP_NAME};

/// midi2input - route MIDI control surfaces through a Lua script
#[derive(Parser, Debug)]
#[command(name = "midi2input", author, version, about, long_about = None)]
pub struct Cli {
    /// Lua script to load (tried before ~/.config/midi2input.lua and ~/.midi2input.lua)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Open the ALSA sequencer backend
    #[arg(short, long)]
    pub alsa: bool,

    /// Open the JACK backend
    #[arg(short, long)]
    pub jack: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Client name registered with the MIDI transports
    #[arg(long, default_value = APP_NAME)]
    pub name: String,

    /// Milliseconds between loop iterations when no input arrives
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: u64,

    /// Do not track the focused window
    #[arg(long)]
    pub no_focus: bool,

    /// Do not reload the script when it changes
    #[arg(long)]
    pub no_reload: bool,

    /// List available MIDI ports and exit
    #[arg(long)]
    pub list_ports: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Filter directive for the log subscriber; `-v` overrides `--log-level`
    pub fn log_filter(&self) -> &str {
        if self.verbose {
            "debug"
        } else {
            &self.log_level
        }
    }

    pub fn into_settings(self) -> Settings {
        let mut settings = Settings {
            client_name: self.name,
            backends: Vec::new(),
            script: self.config,
            interval: Duration::from_millis(self.interval_ms),
            focus: !self.no_focus,
            hot_reload: !self.no_reload,
        };
        if self.alsa {
            settings.enable_backend(BackendKind::Alsa);
        }
        if self.jack {
            settings.enable_backend(BackendKind::Jack);
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("midi2input").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let settings = parse(&[]).into_settings();
        assert_eq!(settings.client_name, "midi2input");
        assert!(settings.backends.is_empty());
        assert!(settings.script.is_none());
        assert_eq!(settings.interval, Duration::from_secs(1));
        assert!(settings.focus);
        assert!(settings.hot_reload);
    }

    #[test]
    fn test_short_flags() {
        let cli = parse(&["-a", "-j", "-v", "-c", "/tmp/x.lua"]);
        assert_eq!(cli.log_filter(), "debug");

        let settings = cli.into_settings();
        assert_eq!(settings.backends, vec![BackendKind::Alsa, BackendKind::Jack]);
        assert_eq!(settings.script, Some(PathBuf::from("/tmp/x.lua")));
    }

    #[test]
    fn test_long_flags() {
        let settings = parse(&[
            "--jack",
            "--name",
            "surface",
            "--interval-ms",
            "20",
            "--no-focus",
            "--no-reload",
        ])
        .into_settings();
        assert_eq!(settings.backends, vec![BackendKind::Jack]);
        assert_eq!(settings.client_name, "surface");
        assert_eq!(settings.interval, Duration::from_millis(20));
        assert!(!settings.focus);
        assert!(!settings.hot_reload);
    }

    #[test]
    fn test_rejects_zero_interval() {
        assert!(Cli::try_parse_from(["midi2input", "--interval-ms", "0"]).is_err());
    }

    #[test]
    fn test_help_and_version_exit_cleanly() {
        for flag in ["-h", "--help", "-V", "--version"] {
            let err = Cli::try_parse_from(["midi2input", flag]).unwrap_err();
            assert_eq!(err.exit_code(), 0, "{flag}");
        }
    }
}
