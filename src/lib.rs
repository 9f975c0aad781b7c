//! kubectl-migrate: a kubectl plugin for migrating workloads between clusters.
//! Builds throttled, context-scoped API clients, dispatches subcommands to the
//! external migration engine, and drives two-cluster end-to-end checks
//! through `kubectl`.

pub mod buildinfo;
pub mod client;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod exec;
pub mod harness;
pub mod logging;
pub mod scheme;

pub use client::throttle::{ThrottleLayer, ThrottleSettings};
pub use client::{ScopedClient, build_client, build_client_with_kubeconfig};
pub use command::{Cli, CommandContext, Commands, GlobalFlags, Lifecycle, MigrateCommand, Stage, dispatch};
pub use config::{MigrateConfig, parse_env_ref, resolve_config, resolve_env_vars};
pub use engine::{ConversionEngine, ConvertOptions, CraneEngine};
pub use error::{MigrateError, Result};
pub use exec::{CommandResult, CommandRunner, ProcessRunner};
pub use harness::{Cluster, ClusterRole, Clusters, MigrationConfig, SetupOutcome, setup_clusters};
pub use logging::LogHandle;
pub use scheme::Scheme;
