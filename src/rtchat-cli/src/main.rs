//! rtchat - main entry point.
//!
//! Startup order: parse arguments, seed the environment from `.env`,
//! install logging, load configuration, then run the command on a runtime
//! this function owns.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use rtchat_cli::cli::{Cli, dispatch_command};
use rtchat_cli::install_interrupt_handler;
use rtchat_cli::logging::{debug_requested, resolve_filter, setup_logging};
use rtchat_engine::ChatConfig;
use tokio_util::sync::CancellationToken;

/// How long runtime shutdown waits for tasks still parked on stdin.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(250);

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logging is not up yet, so this failure goes straight to stderr.
    if let Err(e) = ChatConfig::load_env_file(cli.env_file.as_deref()) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let rust_log = std::env::var("RUST_LOG").ok();
    let debug_env = debug_requested(std::env::var("DEBUG").ok().as_deref());
    setup_logging(
        &resolve_filter(rust_log.as_deref(), cli.log_level, debug_env),
        cli.json_logs,
    );

    let config = match ChatConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    let command = cli.command.unwrap_or_default();
    let result = runtime.block_on(async {
        install_interrupt_handler(shutdown.clone());
        dispatch_command(command, config, shutdown).await
    });
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
