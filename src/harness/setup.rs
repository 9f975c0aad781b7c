//! Two-cluster test configuration and suite setup.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::MigrateConfig;
use crate::error::{MigrateError, Result};
use crate::exec::CommandRunner;
use crate::harness::cluster::Cluster;

/// Locations searched for the test configuration, in order.
pub const CONFIG_SEARCH_PATHS: [&str; 3] = ["tests/config.yaml", "config.yaml", "../config.yaml"];

/// Reported when no configuration file exists.
pub const SKIP_MESSAGE: &str = "
===================================================================================
SKIPPING E2E TESTS: config.yaml not found

To run e2e tests, create tests/config.yaml from the template:

  cd tests
  cp config.yaml.template config.yaml

Then edit config.yaml with your cluster contexts from 'kubectl config get-contexts'
===================================================================================
";

/// Root of `config.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MigrationConfig {
    #[serde(alias = "Clusters")]
    pub clusters: ClustersConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClustersConfig {
    #[serde(alias = "Source", default)]
    pub source: ClusterDescriptor,
    #[serde(alias = "Target", default)]
    pub target: ClusterDescriptor,
}

/// Name and kubeconfig context of one cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClusterDescriptor {
    #[serde(alias = "Name", default)]
    pub name: String,
    #[serde(alias = "Context", default)]
    pub context: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterRole {
    Source,
    Target,
}

impl fmt::Display for ClusterRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterRole::Source => f.write_str("source"),
            ClusterRole::Target => f.write_str("target"),
        }
    }
}

impl MigrationConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| MigrateError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml_ng::from_str(&content).map_err(|e| MigrateError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn descriptor(&self, role: ClusterRole) -> &ClusterDescriptor {
        match role {
            ClusterRole::Source => &self.clusters.source,
            ClusterRole::Target => &self.clusters.target,
        }
    }

    /// Build the handle for `role`; both name and context must be set.
    pub fn create_cluster<R: CommandRunner>(&self, role: ClusterRole, runner: R) -> Result<Cluster<R>> {
        let descriptor = self.descriptor(role);
        let subject = if descriptor.name.is_empty() {
            format!("{} cluster", role)
        } else {
            format!("{} cluster {}", role, descriptor.name)
        };

        if descriptor.name.trim().is_empty() {
            return Err(MigrateError::InvalidConfig(
                subject,
                "name must not be empty".to_string(),
            ));
        }
        if descriptor.context.trim().is_empty() {
            return Err(MigrateError::InvalidConfig(
                subject,
                "context must not be empty".to_string(),
            ));
        }

        Ok(Cluster::with_runner(
            descriptor.name.clone(),
            descriptor.context.clone(),
            runner,
        ))
    }
}

/// Source and target handles for one test run.
#[derive(Debug)]
pub struct Clusters<R> {
    pub source: Cluster<R>,
    pub target: Cluster<R>,
}

/// Result of suite setup.
#[derive(Debug)]
pub enum SetupOutcome<R> {
    Ready(Clusters<R>),
    /// No configuration present; carries the remediation message.
    Skip(String),
}

/// First existing entry of [`CONFIG_SEARCH_PATHS`] relative to `base`.
pub fn find_config_in(base: &Path) -> Option<PathBuf> {
    CONFIG_SEARCH_PATHS
        .iter()
        .map(|p| base.join(p))
        .find(|p| p.exists())
}

/// First existing entry of [`CONFIG_SEARCH_PATHS`] relative to the working directory.
pub fn find_config() -> Option<PathBuf> {
    find_config_in(Path::new("."))
}

/// Locate, load and connect both clusters.
///
/// Missing configuration yields [`SetupOutcome::Skip`] without touching any
/// cluster. Malformed configuration, incomplete cluster entries and
/// unreachable clusters are errors. The `kubectl` executable comes from the
/// tool configuration when one is present.
pub async fn setup_clusters<R: CommandRunner + Clone>(runner: R) -> Result<SetupOutcome<R>> {
    let tool = MigrateConfig::load_or_default(None)?;
    setup_clusters_with(Path::new("."), runner, &tool).await
}

pub async fn setup_clusters_in<R: CommandRunner + Clone>(
    base: &Path,
    runner: R,
) -> Result<SetupOutcome<R>> {
    setup_clusters_with(base, runner, &MigrateConfig::default()).await
}

pub async fn setup_clusters_with<R: CommandRunner + Clone>(
    base: &Path,
    runner: R,
    tool: &MigrateConfig,
) -> Result<SetupOutcome<R>> {
    tracing::info!("setting up test clusters");

    let Some(path) = find_config_in(base) else {
        return Ok(SetupOutcome::Skip(SKIP_MESSAGE.to_string()));
    };

    tracing::info!(path = %path.display(), "loading configuration");
    let config = MigrationConfig::load(&path)?;
    let kubectl = tool.kubectl.binary.as_str();

    let source = config
        .create_cluster(ClusterRole::Source, runner.clone())?
        .with_kubectl(kubectl);
    source.check_connectivity().await?;
    tracing::info!(cluster = %source, "source cluster connected");

    let target = config
        .create_cluster(ClusterRole::Target, runner)?
        .with_kubectl(kubectl);
    target.check_connectivity().await?;
    tracing::info!(cluster = %target, "target cluster connected");

    Ok(SetupOutcome::Ready(Clusters { source, target }))
}
