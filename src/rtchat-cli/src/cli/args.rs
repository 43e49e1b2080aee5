//! CLI argument structures and parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Log verbosity level for CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Only show errors
    Error,
    /// Show warnings and errors
    Warn,
    /// Show informational messages, warnings, and errors
    Info,
    /// Show debug messages and above
    Debug,
    /// Show all messages including wire-level details
    Trace,
}

impl LogLevel {
    /// Convert to tracing filter string.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// rtchat - chat with a realtime model from the terminal
///
/// If no subcommand is specified, starts an interactive chat.
#[derive(Debug, Parser)]
#[command(name = "rtchat")]
#[command(author, version)]
#[command(about = "Text chat over a realtime WebSocket API", long_about = None)]
pub struct Cli {
    /// Log level (overridden by RUST_LOG; defaults to debug when DEBUG=true, else warn)
    #[arg(long = "log-level", global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Write logs as JSON
    #[arg(long = "json-logs", global = true)]
    pub json_logs: bool,

    /// Load environment variables from this file instead of ./.env
    #[arg(long = "env-file", global = true, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Interactive chat (default)
    Chat(ChatArgs),

    /// Send one message and print the answer
    Ask(AskArgs),
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Chat(ChatArgs::default())
    }
}

/// Arguments for interactive chat.
#[derive(Debug, Default, Args)]
pub struct ChatArgs {
    /// Don't print the banner
    #[arg(long = "no-banner")]
    pub no_banner: bool,
}

/// Arguments for one-shot mode.
#[derive(Debug, Default, Args)]
pub struct AskArgs {
    /// Message to send; read from stdin when omitted
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub message: Vec<String>,
}

impl AskArgs {
    /// The message given on the command line, if any.
    pub fn message(&self) -> Option<String> {
        let message = self.message.join(" ");
        let message = message.trim();
        (!message.is_empty()).then(|| message.to_string())
    }
}
