//! Error types for kubectl-migrate operations.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for kubectl-migrate operations
#[derive(Error, Debug)]
pub enum MigrateError {
    /// A resource kind was registered twice with different REST mappings
    #[error("scheme conflict for kind '{kind}': already registered as '{existing}', refusing '{requested}'")]
    SchemeConflict {
        kind: String,
        existing: String,
        requested: String,
    },

    /// Resource type not known to the extension scheme
    #[error("unknown resource type '{0}'")]
    UnknownResource(String),

    /// Kubeconfig could not be loaded from disk
    #[error("failed to load kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    /// The named context could not be resolved into a REST config
    #[error("failed to resolve context '{context}': {source}")]
    ContextResolution {
        context: String,
        #[source]
        source: kube::config::KubeconfigError,
    },

    /// The HTTP client for a resolved context could not be built
    #[error("failed to build client for context '{context}': {source}")]
    ClientConstruction {
        context: String,
        #[source]
        source: kube::Error,
    },

    /// API request failed
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Config file could not be read
    #[error("failed to read config file {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file exists but could not be parsed
    #[error("failed to parse config file {path:?}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// Invalid configuration for a named subject (cluster, engine, ...)
    #[error("invalid config for '{0}': {1}")]
    InvalidConfig(String, String),

    /// Cluster could not be reached through kubectl
    #[error("cannot connect to cluster {cluster} (context: {context}): {stderr}")]
    ClusterUnreachable {
        cluster: String,
        context: String,
        stderr: String,
    },

    /// A kubectl operation against a cluster failed
    #[error("failed to {operation} {cluster}: {stderr}")]
    ClusterOperation {
        cluster: String,
        operation: String,
        stderr: String,
    },

    /// The external migration engine reported a failure
    #[error("engine command '{0}' failed: {1}")]
    Engine(String, String),

    /// A subcommand stage ran out of order
    #[error("command '{command}' cannot {stage} from stage '{current}'")]
    Lifecycle {
        command: String,
        stage: String,
        current: String,
    },

    /// Logging could not be reconfigured
    #[error("logging error: {0}")]
    Logging(String),
}

/// Result type alias for kubectl-migrate operations
pub type Result<T> = std::result::Result<T, MigrateError>;
