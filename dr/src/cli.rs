//! CLI command definitions and subcommands

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

/// distrelay - ultrasonic distance sensor to browser relay
#[derive(Parser)]
#[command(
    name = "dr",
    about = "Relay ultrasonic distance readings from a hardware bridge to WebSocket clients",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Log to stderr instead of the log file
    #[arg(long, global = true)]
    pub stderr: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve distance updates to WebSocket clients (default)
    Serve {
        /// Address to listen on (overrides web.bind)
        #[arg(short, long)]
        bind: Option<String>,

        /// Use the built-in sensor simulator instead of the bridge socket
        #[arg(long)]
        simulate: bool,
    },

    /// Take a single reading and print it
    Read {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Use the built-in sensor simulator instead of the bridge socket
        #[arg(long)]
        simulate: bool,
    },
}

/// Output format for the read command
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => {
                debug!(%s, "OutputFormat::from_str: unknown format");
                Err(format!("Unknown format: {}. Use: text or json", s))
            }
        }
    }
}

/// Location of the log file written when not logging to stderr
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("distrelay")
        .join("logs")
        .join("distrelay.log")
}

/// Help footer pointing at the log file
pub fn generate_after_help() -> String {
    format!("Logs are written to: {}\n", get_log_path().display())
}
