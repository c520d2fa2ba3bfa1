//! Command-line interface for lumibridge.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lumibridge_core::{write_env_example, BridgeConfig, LogLevel, VERSION};
use lumibridge_devices::{AqaraClient, AqaraClientConfig};
use lumibridge_sync::{connect, discover_devices, run, SyncEngine};
use tracing::{error, info};

/// Aqara camera to MQTT bridge with Home Assistant discovery.
#[derive(Parser, Debug)]
#[command(name = "lumibridge")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Option<Command>,

    /// TOML configuration file (defaults to ./lumibridge.toml when present).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Bridge every selected camera until interrupted (default).
    Run,
    /// List the cameras that would be bridged and exit.
    Devices,
    /// Write an example environment file.
    EnvExample {
        /// Output path.
        #[arg(short, long, default_value = ".env.example")]
        output: PathBuf,
    },
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    let command = args.command.unwrap_or(Command::Run);

    if let Command::EnvExample { output } = &command {
        init_logging(LogLevel::Info, args.verbose);
        return match write_env_example(output) {
            Ok(()) => {
                info!("Wrote {}", output.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("{}", e);
                ExitCode::FAILURE
            }
        };
    }

    let config = BridgeConfig::load(args.config.as_deref());
    let level = config
        .as_ref()
        .map(|c| c.log_level)
        .unwrap_or(LogLevel::Info);
    init_logging(level, args.verbose);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!(category = "config", "Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match command {
        Command::Devices => list_devices(&config).await,
        _ => run_bridge(config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: LogLevel, verbose: bool) {
    let level = if verbose { LogLevel::Debug } else { level };

    // Check if JSON logging is requested (for production/container environments)
    let json_logging = std::env::var("LUMIBRIDGE_LOG_JSON")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("lumibridge={}", level))
            .add_directive(tracing::Level::WARN.into())
    });

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .init();
    }
}

fn aqara_client(config: &BridgeConfig) -> Result<AqaraClient> {
    AqaraClient::new(AqaraClientConfig::from_bridge_config(config))
        .context("Failed to create API client")
}

/// Print the selected cameras.
async fn list_devices(config: &BridgeConfig) -> Result<()> {
    let client = aqara_client(config)?;
    let devices = discover_devices(
        &client,
        &config.camera_model_prefix,
        config.subject_id.as_deref(),
    )
    .await
    .context("Device discovery failed")?;

    for device in &devices {
        println!(
            "{}\t{}\t{}\t{}\tspotlight={}",
            device.identity.name,
            device.identity.model,
            device.identity.id,
            device.identity.slug,
            device.capabilities.spotlight
        );
    }
    Ok(())
}

/// Discover cameras, connect to the broker and bridge until Ctrl-C.
async fn run_bridge(config: BridgeConfig) -> Result<()> {
    info!(version = VERSION, "Starting lumibridge");
    tracing::debug!(category = "config", ?config, "Configuration loaded");

    let client = Arc::new(aqara_client(&config)?);
    let devices = discover_devices(
        client.as_ref(),
        &config.camera_model_prefix,
        config.subject_id.as_deref(),
    )
    .await
    .context("Device discovery failed")?;
    info!(count = devices.len(), "Cameras selected");

    let (publisher, eventloop) = connect(&config);
    info!(
        category = "mqtt",
        host = %config.broker.host,
        port = config.broker.port,
        tls = config.broker.tls,
        "Connecting to broker"
    );

    let engine = Arc::new(SyncEngine::new(
        client,
        Arc::new(publisher),
        devices,
        config.discovery_prefix.clone(),
    ));

    tokio::select! {
        _ = run(engine, eventloop, config.poll_interval) => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            info!("Shutting down");
        }
    }
    Ok(())
}
