//! `version`: tool build metadata plus the engine's own version.

use clap::Args;

use crate::buildinfo;
use crate::command::{CommandContext, MigrateCommand};
use crate::error::Result;
use crate::exec::CommandRunner;

#[derive(Args, Debug, Clone, Default)]
pub struct VersionArgs {}

#[derive(Debug, Default)]
pub struct VersionCommand;

impl From<VersionArgs> for VersionCommand {
    fn from(_: VersionArgs) -> Self {
        Self
    }
}

/// Format the version report.
pub fn render(engine_version: Option<&str>) -> String {
    format!(
        "kubectl-migrate:\n\tVersion: {}\n\tCommit: {}\n\tBuild date: {}\nengine:\n\tVersion: {}\n",
        buildinfo::VERSION,
        buildinfo::commit(),
        buildinfo::build_date(),
        engine_version.unwrap_or("unavailable"),
    )
}

impl MigrateCommand for VersionCommand {
    fn name(&self) -> &'static str {
        "version"
    }

    fn complete<R: CommandRunner + Clone>(&mut self, ctx: &CommandContext<R>) -> Result<()> {
        if ctx.globals.debug {
            ctx.enable_debug()?;
        }
        Ok(())
    }

    async fn run<R: CommandRunner + Clone>(&self, ctx: &CommandContext<R>) -> Result<()> {
        let engine_version = ctx.engine().version().await;
        print!("{}", render(engine_version.as_deref()));
        Ok(())
    }
}
