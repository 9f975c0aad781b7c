//! End-to-end test harness: drives real clusters through `kubectl`.
//!
//! Tests load a two-cluster configuration with [`setup_clusters`], then work
//! against the returned [`Cluster`] handles. A missing configuration file is
//! reported as [`SetupOutcome::Skip`] rather than an error so suites degrade
//! to a diagnostic skip on machines without clusters.

pub mod cluster;
pub mod setup;

pub use cluster::Cluster;
pub use setup::{
    ClusterDescriptor, ClusterRole, Clusters, MigrationConfig, SetupOutcome, CONFIG_SEARCH_PATHS,
    SKIP_MESSAGE, find_config, find_config_in, setup_clusters, setup_clusters_in,
    setup_clusters_with,
};
