//! midi2input
//!
//! Routes MIDI control surfaces through a Lua script over JACK and ALSA.

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use midi2input::cli::Cli;
use midi2input::startup::build_dispatcher;
use midi2input::{ports, Dispatcher};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.log_filter())?;

    if cli.list_ports {
        ports::list_ports_formatted(&cli.name)?;
        return Ok(());
    }

    let settings = cli.into_settings();
    settings.validate()?;

    info!("Starting midi2input v{}...", env!("CARGO_PKG_VERSION"));

    let dispatcher = match build_dispatcher(&settings) {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            error!("{}", e);
            std::process::exit(e.exit_code());
        }
    };

    run(dispatcher).await;

    info!("midi2input shutdown complete");
    Ok(())
}

async fn run(mut dispatcher: Dispatcher) {
    dispatcher.run(shutdown_signal()).await;
    dispatcher.shutdown();
}

fn init_logging(level: &str) -> Result<()> {
    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => tracing_subscriber::EnvFilter::try_new(level)?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown signal received");
}
