//! Subcommands implemented entirely by the engine executable.

use clap::Args;

use crate::command::{CommandContext, MigrateCommand};
use crate::error::Result;
use crate::exec::CommandRunner;

const DEBUG_FLAG: &str = "--debug";

/// Arguments forwarded to the engine unchanged.
#[derive(Args, Debug, Clone, Default)]
pub struct EngineArgs {
    /// Arguments passed through to the engine
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

/// Runs `<engine> <subcommand> <args...>`.
#[derive(Debug, Clone)]
pub struct EngineCommand {
    subcommand: &'static str,
    args: Vec<String>,
}

impl EngineCommand {
    pub fn new(subcommand: &'static str, args: EngineArgs) -> Self {
        Self {
            subcommand,
            args: args.args,
        }
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl MigrateCommand for EngineCommand {
    fn name(&self) -> &'static str {
        self.subcommand
    }

    fn complete<R: CommandRunner + Clone>(&mut self, ctx: &CommandContext<R>) -> Result<()> {
        if ctx.globals.debug {
            ctx.enable_debug()?;
            if !self.args.iter().any(|a| a == DEBUG_FLAG) {
                self.args.push(DEBUG_FLAG.to_string());
            }
        }
        Ok(())
    }

    async fn run<R: CommandRunner + Clone>(&self, ctx: &CommandContext<R>) -> Result<()> {
        ctx.engine().passthrough(self.subcommand, &self.args).await
    }
}
