//! Engine backed by the `crane` executable.

use kube::api::{Api, DynamicObject, ListParams};
use tracing::Instrument;

use crate::engine::{ConversionEngine, ConvertOptions};
use crate::error::{MigrateError, Result};
use crate::exec::{CommandResult, CommandRunner};
use crate::scheme;

/// Delegates migration work to an engine executable (`crane` by default).
#[derive(Debug, Clone)]
pub struct CraneEngine<R> {
    runner: R,
    binary: String,
    context: Option<String>,
}

impl<R: CommandRunner> CraneEngine<R> {
    pub fn new(runner: R, binary: impl Into<String>) -> Self {
        Self {
            runner,
            binary: binary.into(),
            context: None,
        }
    }

    /// Kubeconfig context passed to the engine as `--context`.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.context = (!context.is_empty()).then_some(context);
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Engine arguments for `convert`.
    pub fn convert_args(&self, options: &ConvertOptions) -> Vec<String> {
        let mut args = vec!["convert".to_string()];
        if let Some(context) = &self.context {
            args.push("--source-context".to_string());
            args.push(context.clone());
        }
        if !options.namespace.is_empty() {
            args.push("--namespace".to_string());
            args.push(options.namespace.clone());
        }
        args.push("--resource".to_string());
        args.push(options.resource_type.clone());

        let lists = [
            ("--search-registries", &options.search_registries),
            ("--insecure-registries", &options.insecure_registries),
            ("--block-registries", &options.block_registries),
        ];
        for (flag, values) in lists {
            if !values.is_empty() {
                args.push(flag.to_string());
                args.push(values.join(","));
            }
        }

        args.push("--export-dir".to_string());
        args.push(options.export_dir.display().to_string());
        args
    }

    /// Run `<engine> <subcommand> <args...>` attached to the terminal.
    pub async fn passthrough(&self, subcommand: &str, args: &[String]) -> Result<()> {
        let mut full_args = Vec::with_capacity(args.len() + 1);
        full_args.push(subcommand.to_string());
        full_args.extend_from_slice(args);

        tracing::debug!(engine = %self.binary, args = ?full_args, "delegating to engine");
        let result = self.runner.run_inherited(&self.binary, &full_args).await;
        check(subcommand, result).map(|_| ())
    }

    /// The engine's self-reported version, `None` if it cannot be run.
    pub async fn version(&self) -> Option<String> {
        let result = self.runner.run(&self.binary, &["version".to_string()]).await;
        if !result.success() {
            tracing::debug!(stderr = %result.stderr(), "engine version unavailable");
            return None;
        }
        Some(result.stdout().trim().to_string()).filter(|v| !v.is_empty())
    }

    /// Number of objects the engine is about to see, for logging only.
    ///
    /// An empty namespace counts across all namespaces, matching what the
    /// engine lists.
    async fn count_objects(&self, options: &ConvertOptions) -> Result<usize> {
        let scheme = scheme::install()?;
        let mapping = scheme
            .resolve(&options.resource_type)
            .ok_or_else(|| MigrateError::UnknownResource(options.resource_type.clone()))?;

        let client = options.client.clone();
        let api: Api<DynamicObject> = if !mapping.namespaced || options.namespace.is_empty() {
            Api::all_with(client, &mapping.resource)
        } else {
            Api::namespaced_with(client, &options.namespace, &mapping.resource)
        };

        let list = api.list(&ListParams::default()).await?;
        Ok(list.items.len())
    }
}

impl<R: CommandRunner> ConversionEngine for CraneEngine<R> {
    async fn convert(&self, options: ConvertOptions) -> Result<()> {
        let span = options.span.clone();
        async move {
            match self.count_objects(&options).await {
                Ok(count) => tracing::info!(
                    resource = %options.resource_type,
                    namespace = %options.namespace,
                    count,
                    "resources found"
                ),
                Err(e) => tracing::debug!(
                    resource = %options.resource_type,
                    error = %e,
                    "could not count resources"
                ),
            }

            let args = self.convert_args(&options);
            let result = self.runner.run(&self.binary, &args).await;
            let result = check("convert", result)?;
            for line in result.stdout().lines().filter(|l| !l.trim().is_empty()) {
                tracing::info!("{}", line);
            }
            Ok(())
        }
        .instrument(span)
        .await
    }
}

fn check(subcommand: &str, result: CommandResult) -> Result<CommandResult> {
    if result.success() {
        return Ok(result);
    }
    let detail = match (result.stderr().trim(), result.exit_code()) {
        ("", Some(code)) => format!("exited with status {}", code),
        ("", None) => "terminated by signal".to_string(),
        (stderr, _) => stderr.to_string(),
    };
    Err(MigrateError::Engine(subcommand.to_string(), detail))
}
