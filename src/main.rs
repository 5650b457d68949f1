// ABOUTME: Entry point for the cutover CLI application.
// ABOUTME: Parses arguments, wires signals to cancellation, and dispatches to command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::{DeployArgs, Invocation};
use cutover::config;
use cutover::deploy::{CancelHandle, CancelSignal};
use cutover::error::Result;
use cutover::output::{Output, OutputMode};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // --verbose wins over RUST_LOG
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };

    let (handle, cancel) = CancelSignal::pair();
    tokio::spawn(cancel_on_shutdown(handle));

    if let Err(e) = run(cli, Output::new(mode), cancel).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli, output: Output, cancel: CancelSignal) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Init { app, force } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, app.as_deref(), force)?;
            output.success(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(())
        }
        Commands::Deploy {
            version,
            target,
            timeout,
            dry_run,
            skip_tests,
        } => {
            let invocation = Invocation::resolve(config_path, target)?;
            let args = DeployArgs {
                version,
                timeout,
                dry_run,
                skip_tests,
            };
            commands::deploy(invocation, args, cancel, output).await
        }
        Commands::Rollback {
            target,
            force,
            dry_run,
        } => {
            let invocation = Invocation::resolve(config_path, target)?;
            commands::rollback(invocation, force, dry_run, cancel, output).await
        }
        Commands::Status { target } => {
            let invocation = Invocation::resolve(config_path, target)?;
            commands::status(invocation, output).await
        }
    }
}

/// Cancel the in-flight run on Ctrl-C or SIGTERM.
async fn cancel_on_shutdown(handle: CancelHandle) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, cancelling");
    handle.cancel();
}
