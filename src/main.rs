// Main entry point for photo-reviver.
// Runs the upload relay in front of the restoration service, or, with the
// `restore` subcommand, the terminal client that talks to the relay.

mod client;
mod models;
mod session;
mod shutdown_signal;
mod upstream;
mod web;

use clap::{Parser, Subcommand};
use shutdown_signal::shutdown_signal;
use std::{sync::Arc, time::Duration};
use tracing::Level;
use upstream::RestorationClient;

/// Command line arguments for photo-reviver
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct AppConfig {
    /// Maximum log level (error, warn, info, debug, trace).
    #[arg(long, env = "PHOTO_REVIVER_LOG_LEVEL", default_value = "info", global = true)]
    log_level: Level,

    #[command(flatten)]
    relay: RelayConfig,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Restore a photo through a running relay and save the result.
    Restore(client::RestoreArgs),
}

#[derive(clap::Args, Debug)]
struct RelayConfig {
    /// Hostname/IP to bind the relay to.
    /// If this option is specified without value, it will default to "*", meaning the relay will listen on all interfaces.
    #[arg(long, env = "PHOTO_REVIVER_HOST", default_value = "localhost", num_args = 0..=1, default_missing_value = "*")]
    host: String,

    /// Port number to listen on.
    #[arg(short, long, env = "PHOTO_REVIVER_PORT", default_value_t = 5000)]
    port: u16,

    /// Base URL of the restoration service.
    #[arg(long, env = "PYTHON_API_URL", default_value = "http://localhost:8000")]
    upstream_url: String,

    /// Seconds to wait for the restoration service before answering 504.
    #[arg(long, env = "PHOTO_REVIVER_UPSTREAM_TIMEOUT_SECS", default_value_t = 60)]
    upstream_timeout_secs: u64,
}

#[tokio::main]
async fn main() {
    // Parse command line args and environment variables
    let config = AppConfig::parse();

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    match config.command {
        Some(Command::Restore(args)) => match client::run(args).await {
            Ok(output) => println!("Restored photo saved to {}", output.display()),
            Err(e) => {
                tracing::error!("Restoration failed: {}", e);
                eprintln!("{}", e);
                std::process::exit(1);
            }
        },
        None => run_relay(config.relay).await,
    }
}

async fn run_relay(config: RelayConfig) {
    tracing::info!("Starting photo-reviver relay...");

    let timeout = Duration::from_secs(config.upstream_timeout_secs);
    let upstream = RestorationClient::new(&config.upstream_url, timeout).unwrap_or_else(|err| {
        tracing::error!("FATAL: Failed to create restoration client: {}", err);
        eprintln!("FATAL: Could not create restoration client. Exiting.");
        std::process::exit(1);
    });
    tracing::info!(
        "Forwarding restorations to {} (timeout {}s)",
        upstream.base_url(),
        upstream.timeout().as_secs()
    );

    let app = web::create_app(Arc::new(upstream));

    let listener = match web::create_listener(&config.host, config.port).await {
        Ok((addr, l)) => {
            tracing::info!("Relay successfully bound. Listening on {}", addr);
            l
        }
        Err(e) => {
            tracing::error!("FATAL: Failed to bind relay: {}", e);
            eprintln!("FATAL: Could not bind relay. Error: {}. Exiting.", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Relay run error: {}", e);
        eprintln!("ERROR: Relay shut down unexpectedly. Error: {}", e);
    }

    tracing::info!("photo-reviver relay has shut down.");
}
