//! CLI argument parsing and command dispatch.
//!
//! - `args` - Command-line argument structures
//! - `handlers` - Command execution handlers

pub mod args;
pub mod handlers;

// Re-export main types
pub use args::{AskArgs, ChatArgs, Cli, Commands, LogLevel};
pub use handlers::dispatch_command;
