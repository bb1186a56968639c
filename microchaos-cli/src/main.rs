//! MicroChaos binary entry point

mod cli;
mod console;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands, LoadtestArgs};
use console::ConsoleLogger;
use microchaos_core::Logger;
use microchaos_engine::{BasicAuthProvider, LoadTestOrchestrator};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Loadtest(args) => run_loadtest(*args).await,
    }
}

async fn run_loadtest(args: LoadtestArgs) -> anyhow::Result<()> {
    let logger = Arc::new(ConsoleLogger::new(std::env::var("MICROCHAOS_VERBOSE").is_ok()));
    let config = args.to_config();

    let mut orchestrator = LoadTestOrchestrator::new(config.clone())
        .with_logger(logger.clone())
        .with_storage_dir(args.storage_dir());

    if config.auth.is_some() {
        let password = args
            .auth_password
            .clone()
            .or_else(|| std::env::var("MICROCHAOS_AUTH_PASSWORD").ok())
            .context("auth requested but no password given (--auth-password or MICROCHAOS_AUTH_PASSWORD)")?;
        let provider = BasicAuthProvider::new(config.base_url.clone(), password)?;
        orchestrator = orchestrator.with_session_provider(Arc::new(provider));
    }

    let outcome = match orchestrator.execute().await {
        Ok(outcome) => outcome,
        Err(e) => {
            logger.error(&format!("Fatal: {e}"));
            std::process::exit(1);
        }
    };

    let closing = match outcome.actual_minutes {
        Some(minutes) => format!(
            "Load test complete: {} requests fired over {minutes:.2} minutes",
            outcome.completed
        ),
        None => format!("Load test complete: {} requests fired", outcome.completed),
    };
    logger.success(&closing);
    Ok(())
}
