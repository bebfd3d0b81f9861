//! CLI command definitions for the `parley` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod session;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use parley_observe::tracing_setup::LogFormat;

/// Conversational AI relay: HTTP chat API with per-session history.
#[derive(Parser)]
#[command(name = "parley", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true, env = "PARLEY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format: text or json.
    #[arg(long, global = true, env = "PARLEY_LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,

    /// Export spans to stdout via OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log directive derived from `-v`/`--quiet`.
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "info",
            1 => "info,parley=debug,tower_http=debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server.
    Serve {
        /// Address to bind (overrides config).
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config).
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Show the stored turns of a session.
    History {
        /// Session identifier.
        session_id: String,

        /// Most recent turns to show.
        #[arg(long, default_value_t = 10)]
        limit: u32,

        /// Output machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Delete every turn of a session.
    DeleteSession {
        /// Session identifier.
        session_id: String,

        /// Output machine-readable JSON.
        #[arg(long)]
        json: bool,
    },
}
