//! The external migration engine.
//!
//! kubectl-migrate does not rewrite resources itself. `convert` hands a ready
//! client and a populated [`ConvertOptions`] to a [`ConversionEngine`]; the
//! remaining migration subcommands forward their arguments to the engine
//! executable unchanged.

pub mod crane;

use std::future::Future;
use std::path::PathBuf;

use kube::Client;

use crate::error::Result;

pub use crane::CraneEngine;

/// Everything the engine needs for one conversion run.
#[derive(Clone)]
pub struct ConvertOptions {
    pub client: Client,
    pub namespace: String,
    /// Deprecated plural resource type, e.g. `BuildConfigs`.
    pub resource_type: String,
    pub search_registries: Vec<String>,
    pub insecure_registries: Vec<String>,
    pub block_registries: Vec<String>,
    pub export_dir: PathBuf,
    /// Span the engine logs under.
    pub span: tracing::Span,
}

impl std::fmt::Debug for ConvertOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvertOptions")
            .field("namespace", &self.namespace)
            .field("resource_type", &self.resource_type)
            .field("search_registries", &self.search_registries)
            .field("insecure_registries", &self.insecure_registries)
            .field("block_registries", &self.block_registries)
            .field("export_dir", &self.export_dir)
            .finish_non_exhaustive()
    }
}

/// Converts deprecated resources to their replacements.
pub trait ConversionEngine: Send + Sync {
    fn convert(&self, options: ConvertOptions) -> impl Future<Output = Result<()>> + Send;
}
