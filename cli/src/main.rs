//! kubectl-migrate: a kubectl plugin for migrating workloads between clusters.
//!
//! Invoked directly or as `kubectl migrate`. `convert` runs in-process against
//! a context-scoped client; the other migration subcommands are forwarded to
//! the engine executable.

use std::process::ExitCode;

use anyhow::{Context, Result};
use kubectl_migrate::command::is_informational;
use kubectl_migrate::{
    Cli, CommandContext, MigrateConfig, ProcessRunner, dispatch, logging, resolve_env_vars,
};

#[tokio::main]
async fn main() -> ExitCode {
    // Usage errors exit 1 like every other failure; help and version exit 0.
    let cli = match Cli::try_parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) if is_informational(&e) => e.exit(),
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    // RUST_LOG controls verbosity; --debug raises it once the subcommand completes.
    let log = logging::init().ok();

    let config = MigrateConfig::load_or_default(cli.globals.config.as_deref())
        .context("Failed to load kubectl-migrate config")?;
    let runner = ProcessRunner::with_env(resolve_env_vars(&config.engine.env));

    let mut ctx = CommandContext::new(cli.globals, config, runner);
    if let Some(log) = log {
        ctx = ctx.with_log(log);
    }

    dispatch(cli.command, &ctx).await?;
    Ok(())
}
