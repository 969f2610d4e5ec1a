//! distrelay - ultrasonic distance sensor to browser relay
//!
//! CLI entry point: serves distance updates over WebSocket or takes a single reading.

use std::fs;
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use distrelay::bridge::create_bridge;
use distrelay::cli::{Cli, Command, OutputFormat, generate_after_help, get_log_path};
use distrelay::config::Config;
use distrelay::relay::{BroadcastLoop, ConnectionGreeter, UpdateEmitter};
use distrelay::sensor::{ReadOutcome, SensorReader};
use distrelay::update::format_update;
use distrelay::web::{CLIENT_CONNECTED, ClientHub, WebServer};

fn parse_level(level_str: Option<&str>) -> tracing::Level {
    match level_str {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>, stderr: bool) -> Result<()> {
    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = parse_level(cli_log_level.or(config_log_level));
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    if stderr {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        let log_path = get_log_path();
        if let Some(log_dir) = log_path.parent() {
            fs::create_dir_all(log_dir).context("Failed to create log directory")?;
        }
        let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_ansi(false)
            .with_env_filter(filter)
            .init();
    }

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Cli::command().after_help(generate_after_help());
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref(), cli.stderr)
        .context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Serve { bind, simulate }) => {
            debug!(?bind, simulate, "main: matched Serve command");
            cmd_serve(config, bind, simulate).await
        }
        Some(Command::Read { format, simulate }) => {
            debug!(?format, simulate, "main: matched Read command");
            cmd_read(config, format, simulate).await
        }
        None => {
            debug!("main: no command, defaulting to serve");
            cmd_serve(config, None, false).await
        }
    }
}

/// Run the WebSocket server and the broadcast loop until a signal arrives
async fn cmd_serve(mut config: Config, bind: Option<String>, simulate: bool) -> Result<()> {
    debug!(?bind, simulate, "cmd_serve: called");
    if let Some(bind) = bind {
        config.web.bind = bind;
    }
    config.bridge.simulate |= simulate;

    if config.bridge.simulate {
        info!("Using simulated sensor");
    } else {
        info!("Using bridge socket {}", config.bridge.socket_path.display());
    }

    let bridge = create_bridge(&config.bridge);
    let hub = Arc::new(ClientHub::new(config.web.channel_capacity));
    let emitter = UpdateEmitter::new(SensorReader::new(bridge), hub.clone());

    let greeter = Arc::new(ConnectionGreeter::new(emitter.clone()));
    hub.on_message(CLIENT_CONNECTED, greeter.handler()).await;

    let server = WebServer::bind(&config.web.bind, hub.clone()).await?;
    println!("Serving distance updates on ws://{}", server.local_addr()?);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!(error = %e, "WebSocket server error");
        }
    });

    let mut broadcast_loop = BroadcastLoop::new(emitter, &config.relay);
    let loop_handle = tokio::spawn(async move { broadcast_loop.run().await });

    wait_for_shutdown().await?;

    info!("Shutting down...");
    loop_handle.abort();
    server_handle.abort();
    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    debug!("wait_for_shutdown: setting up signal handlers");
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => warn!("SIGINT received"),
            _ = sigterm.recv() => warn!("SIGTERM received"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        warn!("Ctrl+C received");
    }

    Ok(())
}

/// Take one reading and print it
async fn cmd_read(config: Config, format: OutputFormat, simulate: bool) -> Result<()> {
    debug!(?format, simulate, "cmd_read: called");
    let mut bridge_config = config.bridge;
    bridge_config.simulate |= simulate;

    let reader = SensorReader::new(create_bridge(&bridge_config));
    let outcome = reader.read().await;
    if let ReadOutcome::Malfunction(fault) = &outcome {
        tracing::error!("Error reading sensor data: {}", fault);
    }

    let update = format_update(outcome.reading(), chrono::Utc::now());
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&update)?);
        }
        OutputFormat::Text => {
            let status = if update.valid { "valid".green() } else { "invalid".red() };
            println!(
                "{:.2} {} ({:.2} mm, {} us) [{}] at {}",
                update.distance,
                update.unit,
                update.distance_mm,
                update.duration,
                status,
                update.timestamp.to_rfc3339()
            );
            match &outcome {
                ReadOutcome::Absent(reason) => println!("{} {}", "no reading:".yellow(), reason),
                ReadOutcome::Malfunction(fault) => println!("{} {}", "sensor error:".red(), fault),
                ReadOutcome::Reading(_) => {}
            }
        }
    }
    Ok(())
}
