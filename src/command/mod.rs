//! Command dispatcher for the `kubectl-migrate` command tree and the staged
//! lifecycle every subcommand goes through.
//!
//! Each subcommand owns its flags and implements [`MigrateCommand`]. The
//! dispatcher wraps it in a [`Lifecycle`], which enforces
//! Parsed → Normalized → Validated → Executed and stops at the first error.

pub mod convert;
pub mod passthrough;
pub mod version;

use std::fmt;
use std::future::Future;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use kube::config::Kubeconfig;

use crate::client::{self, ScopedClient};
use crate::config::MigrateConfig;
use crate::engine::CraneEngine;
use crate::error::{MigrateError, Result};
use crate::exec::{CommandRunner, ProcessRunner};
use crate::logging::LogHandle;

pub use convert::{ConvertArgs, ConvertCommand};
pub use passthrough::{EngineArgs, EngineCommand};
pub use version::{VersionArgs, VersionCommand};

/// kubectl plugin for migrating workloads and their state between Kubernetes clusters.
#[derive(Parser, Debug)]
#[command(
    name = "kubectl-migrate",
    version,
    about = "Kubernetes migration tool - kubectl plugin for migrating workloads between clusters",
    long_about = "kubectl-migrate is a kubectl plugin that helps migrate workloads and their state \
                  between Kubernetes clusters.\nIt provides commands for exporting, transforming, \
                  and applying resources across clusters.\n\nUse it directly or through the \
                  'kubectl migrate' prefix."
)]
pub struct Cli {
    #[command(flatten)]
    pub globals: GlobalFlags,
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Parse `args`, then lift global flags that ended up among the
    /// arguments forwarded to the engine.
    pub fn try_parse_args<I, T>(args: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut cli = Self::try_parse_from(args)?;
        if let Some(engine_args) = cli.command.engine_args_mut() {
            cli.globals.absorb(&mut engine_args.args);
        }
        Ok(cli)
    }
}

/// True for `--help` and `--version`, which are not failures.
pub fn is_informational(err: &clap::Error) -> bool {
    matches!(
        err.kind(),
        clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
    )
}

/// Flags accepted by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalFlags {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
    /// Path to kubectl-migrate.toml [default: ./kubectl-migrate.toml or ~/.config/kubectl-migrate/config.toml]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

impl GlobalFlags {
    /// Move `--debug` and `--config <path>` out of `args`. Anything after a
    /// literal `--` belongs to the engine and is left alone.
    fn absorb(&mut self, args: &mut Vec<String>) {
        let mut kept = Vec::with_capacity(args.len());
        let mut iter = std::mem::take(args).into_iter();
        while let Some(arg) = iter.next() {
            if arg == "--" {
                kept.push(arg);
                kept.extend(iter.by_ref());
            } else if arg == "--debug" {
                self.debug = true;
            } else if arg == "--config" {
                match iter.next() {
                    Some(path) => self.config = Some(PathBuf::from(path)),
                    None => kept.push(arg),
                }
            } else if let Some(path) = arg.strip_prefix("--config=") {
                self.config = Some(PathBuf::from(path));
            } else {
                kept.push(arg);
            }
        }
        *args = kept;
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export the namespace resources in an output directory
    Export(EngineArgs),
    /// Convert a deprecated resource to its replacement
    Convert(ConvertArgs),
    /// Create resource transformations for the exported resources
    Transform(EngineArgs),
    /// Apply the transformations to the exported resources
    Apply(EngineArgs),
    /// Transfer PVC data between clusters
    TransferPvc(EngineArgs),
    /// Set up a tunnel between the source and target cluster APIs
    TunnelApi(EngineArgs),
    /// Generate a skopeo sync configuration for exported image streams
    SkopeoSyncGen(EngineArgs),
    /// Manage transform plugins
    PluginManager(EngineArgs),
    /// Run a KRM function over exported resources
    FnRun(EngineArgs),
    /// Print version information
    Version(VersionArgs),
}

impl Commands {
    fn engine_args_mut(&mut self) -> Option<&mut EngineArgs> {
        match self {
            Commands::Export(args)
            | Commands::Transform(args)
            | Commands::Apply(args)
            | Commands::TransferPvc(args)
            | Commands::TunnelApi(args)
            | Commands::SkopeoSyncGen(args)
            | Commands::PluginManager(args)
            | Commands::FnRun(args) => Some(args),
            Commands::Convert(_) | Commands::Version(_) => None,
        }
    }
}

/// Everything a subcommand may use besides its own flags.
pub struct CommandContext<R = ProcessRunner> {
    pub globals: GlobalFlags,
    pub config: MigrateConfig,
    pub runner: R,
    log: Option<LogHandle>,
    kubeconfig: Option<Kubeconfig>,
}

impl<R: CommandRunner + Clone> CommandContext<R> {
    pub fn new(globals: GlobalFlags, config: MigrateConfig, runner: R) -> Self {
        Self {
            globals,
            config,
            runner,
            log: None,
            kubeconfig: None,
        }
    }

    pub fn with_log(mut self, log: LogHandle) -> Self {
        self.log = Some(log);
        self
    }

    /// Resolve contexts from `kubeconfig` instead of the file on disk.
    pub fn with_kubeconfig(mut self, kubeconfig: Kubeconfig) -> Self {
        self.kubeconfig = Some(kubeconfig);
        self
    }

    /// Raise log verbosity; a no-op when logging was not initialized here.
    pub fn enable_debug(&self) -> Result<()> {
        match &self.log {
            Some(log) => log.enable_debug(),
            None => Ok(()),
        }
    }

    pub fn engine(&self) -> CraneEngine<R> {
        CraneEngine::new(self.runner.clone(), self.config.engine.binary.clone())
    }

    pub async fn build_client(&self, context: &str) -> Result<ScopedClient> {
        match &self.kubeconfig {
            Some(kubeconfig) => client::build_client_with_kubeconfig(kubeconfig.clone(), context).await,
            None => client::build_client(context).await,
        }
    }
}

/// A subcommand driven through [`Lifecycle`].
pub trait MigrateCommand: Send + Sync {
    fn name(&self) -> &'static str;

    /// Post-parse normalization.
    fn complete<R: CommandRunner + Clone>(&mut self, ctx: &CommandContext<R>) -> Result<()>;

    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn run<R: CommandRunner + Clone>(
        &self,
        ctx: &CommandContext<R>,
    ) -> impl Future<Output = Result<()>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parsed,
    Normalized,
    Validated,
    Executed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Parsed => "parsed",
            Stage::Normalized => "normalized",
            Stage::Validated => "validated",
            Stage::Executed => "executed",
        };
        f.write_str(s)
    }
}

/// A subcommand together with the lifecycle stage it has reached.
#[derive(Debug)]
pub struct Lifecycle<C> {
    command: C,
    stage: Stage,
}

impl<C: MigrateCommand> Lifecycle<C> {
    pub fn new(command: C) -> Self {
        Self {
            command,
            stage: Stage::Parsed,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn command(&self) -> &C {
        &self.command
    }

    pub fn complete<R: CommandRunner + Clone>(&mut self, ctx: &CommandContext<R>) -> Result<()> {
        self.expect(Stage::Parsed, "complete")?;
        self.command.complete(ctx)?;
        self.stage = Stage::Normalized;
        Ok(())
    }

    pub fn validate(&mut self) -> Result<()> {
        self.expect(Stage::Normalized, "validate")?;
        self.command.validate()?;
        self.stage = Stage::Validated;
        Ok(())
    }

    pub async fn run<R: CommandRunner + Clone>(&mut self, ctx: &CommandContext<R>) -> Result<()> {
        self.expect(Stage::Validated, "run")?;
        self.command.run(ctx).await?;
        self.stage = Stage::Executed;
        Ok(())
    }

    /// Complete, validate and run, stopping at the first failing stage.
    pub async fn execute<R: CommandRunner + Clone>(&mut self, ctx: &CommandContext<R>) -> Result<()> {
        self.complete(ctx)?;
        self.validate()?;
        self.run(ctx).await
    }

    fn expect(&self, stage: Stage, action: &str) -> Result<()> {
        if self.stage != stage {
            return Err(MigrateError::Lifecycle {
                command: self.command.name().to_string(),
                stage: action.to_string(),
                current: self.stage.to_string(),
            });
        }
        Ok(())
    }
}

async fn execute<C: MigrateCommand, R: CommandRunner + Clone>(
    command: C,
    ctx: &CommandContext<R>,
) -> Result<()> {
    let name = command.name();
    let result = Lifecycle::new(command).execute(ctx).await;
    if let Err(e) = &result {
        tracing::debug!(command = %name, error = %e, "command failed");
    }
    result
}

/// Route a parsed command to its implementation.
pub async fn dispatch<R: CommandRunner + Clone>(command: Commands, ctx: &CommandContext<R>) -> Result<()> {
    match command {
        Commands::Export(args) => execute(EngineCommand::new("export", args), ctx).await,
        Commands::Convert(args) => execute(ConvertCommand::from(args), ctx).await,
        Commands::Transform(args) => execute(EngineCommand::new("transform", args), ctx).await,
        Commands::Apply(args) => execute(EngineCommand::new("apply", args), ctx).await,
        Commands::TransferPvc(args) => execute(EngineCommand::new("transfer-pvc", args), ctx).await,
        Commands::TunnelApi(args) => execute(EngineCommand::new("tunnel-api", args), ctx).await,
        Commands::SkopeoSyncGen(args) => {
            execute(EngineCommand::new("skopeo-sync-gen", args), ctx).await
        }
        Commands::PluginManager(args) => {
            execute(EngineCommand::new("plugin-manager", args), ctx).await
        }
        Commands::FnRun(args) => execute(EngineCommand::new("fn-run", args), ctx).await,
        Commands::Version(args) => execute(VersionCommand::from(args), ctx).await,
    }
}
