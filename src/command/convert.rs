//! `convert`: rewrite deprecated resources through the engine.

use std::path::PathBuf;

use clap::Args;

use crate::command::{CommandContext, MigrateCommand};
use crate::engine::{ConversionEngine, ConvertOptions};
use crate::error::Result;
use crate::exec::CommandRunner;

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    /// The source context in current kubeconfig
    #[arg(long, default_value = "")]
    pub source_context: String,
    /// The namespace to convert resources from
    #[arg(short = 'n', long, default_value = "")]
    pub namespace: String,
    /// The deprecated plural resource type to convert, e.g. BuildConfigs
    #[arg(short = 'r', long = "resource", default_value = "")]
    pub resource_type: String,
    /// List of search registries
    #[arg(short = 's', long, value_delimiter = ',')]
    pub search_registries: Vec<String>,
    /// List of insecure registries
    #[arg(long, value_delimiter = ',')]
    pub insecure_registries: Vec<String>,
    /// List of blocked registries
    #[arg(long, value_delimiter = ',')]
    pub block_registries: Vec<String>,
    /// The path where files are to be exported
    #[arg(short = 'e', long, default_value = "convert")]
    pub export_dir: PathBuf,
}

#[derive(Debug)]
pub struct ConvertCommand {
    args: ConvertArgs,
    span: tracing::Span,
}

impl From<ConvertArgs> for ConvertCommand {
    fn from(args: ConvertArgs) -> Self {
        Self {
            args,
            span: tracing::Span::none(),
        }
    }
}

impl ConvertCommand {
    pub fn args(&self) -> &ConvertArgs {
        &self.args
    }
}

impl MigrateCommand for ConvertCommand {
    fn name(&self) -> &'static str {
        "convert"
    }

    fn complete<R: CommandRunner + Clone>(&mut self, ctx: &CommandContext<R>) -> Result<()> {
        if ctx.globals.debug {
            ctx.enable_debug()?;
        }
        self.span = tracing::info_span!(
            "convert",
            context = %self.args.source_context,
            resource = %self.args.resource_type
        );
        Ok(())
    }

    // No validate override: an empty or unknown resource type is reported by
    // the engine executable.

    async fn run<R: CommandRunner + Clone>(&self, ctx: &CommandContext<R>) -> Result<()> {
        let scoped = ctx.build_client(&self.args.source_context).await?;

        let options = ConvertOptions {
            client: scoped.into_client(),
            namespace: self.args.namespace.clone(),
            resource_type: self.args.resource_type.clone(),
            search_registries: self.args.search_registries.clone(),
            insecure_registries: self.args.insecure_registries.clone(),
            block_registries: self.args.block_registries.clone(),
            export_dir: self.args.export_dir.clone(),
            span: self.span.clone(),
        };

        ctx.engine()
            .with_context(self.args.source_context.clone())
            .convert(options)
            .await
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use kube::config::Kubeconfig;

    use super::*;
    use crate::command::tests::context;
    use crate::command::{Cli, Commands, Lifecycle};
    use crate::error::MigrateError;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: one
  cluster:
    server: https://127.0.0.1:1
contexts:
- name: src-ctx
  context:
    cluster: one
    user: tester
current-context: src-ctx
users:
- name: tester
  user:
    token: abc
"#;

    fn parse(args: &[&str]) -> ConvertArgs {
        let mut argv = vec!["kubectl-migrate", "convert"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Convert(args) => args,
            other => panic!("expected convert, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.source_context, "");
        assert_eq!(args.namespace, "");
        assert!(args.search_registries.is_empty());
        assert!(args.insecure_registries.is_empty());
        assert!(args.block_registries.is_empty());
        assert_eq!(args.export_dir, PathBuf::from("convert"));
    }

    #[test]
    fn test_flags() {
        let args = parse(&[
            "--source-context",
            "src-ctx",
            "-n",
            "apps",
            "-r",
            "BuildConfigs",
            "-s",
            "quay.io,docker.io",
            "--insecure-registries",
            "registry.local",
            "--block-registries",
            "a.example.com",
            "--block-registries",
            "b.example.com",
            "-e",
            "out",
        ]);
        assert_eq!(args.source_context, "src-ctx");
        assert_eq!(args.namespace, "apps");
        assert_eq!(args.resource_type, "BuildConfigs");
        assert_eq!(args.search_registries, ["quay.io", "docker.io"]);
        assert_eq!(args.insecure_registries, ["registry.local"]);
        assert_eq!(args.block_registries, ["a.example.com", "b.example.com"]);
        assert_eq!(args.export_dir, PathBuf::from("out"));
    }

    #[tokio::test]
    async fn test_unknown_context_fails_before_engine() {
        let ctx = context(false).with_kubeconfig(Kubeconfig::from_yaml(KUBECONFIG).unwrap());
        let command = ConvertCommand::from(parse(&[
            "--source-context",
            "missing-ctx",
            "-r",
            "BuildConfigs",
        ]));
        let mut lifecycle = Lifecycle::new(command);

        let err = lifecycle.execute(&ctx).await.unwrap_err();
        assert!(
            matches!(err, MigrateError::ContextResolution { ref context, .. } if context == "missing-ctx"),
            "unexpected error: {err}"
        );
        assert!(ctx.runner.0.calls().is_empty());
    }

    #[tokio::test]
    async fn test_run_passes_every_flag_to_engine() {
        let ctx = context(false).with_kubeconfig(Kubeconfig::from_yaml(KUBECONFIG).unwrap());
        let command = ConvertCommand::from(parse(&[
            "--source-context",
            "src-ctx",
            "-n",
            "apps",
            "-r",
            "BuildConfigs",
            "-s",
            "quay.io,docker.io",
            "--insecure-registries",
            "registry.local",
            "--block-registries",
            "blocked.example.com",
            "-e",
            "out",
        ]));
        let mut lifecycle = Lifecycle::new(command);

        // Nothing listens on the API server port, so only the engine call is observable.
        lifecycle.execute(&ctx).await.unwrap();

        let calls = ctx.runner.0.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "crane");
        assert_eq!(
            calls[0].1,
            [
                "convert",
                "--source-context",
                "src-ctx",
                "--namespace",
                "apps",
                "--resource",
                "BuildConfigs",
                "--search-registries",
                "quay.io,docker.io",
                "--insecure-registries",
                "registry.local",
                "--block-registries",
                "blocked.example.com",
                "--export-dir",
                "out",
            ]
        );
    }

    #[tokio::test]
    async fn test_run_uses_configured_engine_binary() {
        let mut ctx = context(false).with_kubeconfig(Kubeconfig::from_yaml(KUBECONFIG).unwrap());
        ctx.config.engine.binary = "/opt/crane/bin/crane".to_string();
        let mut lifecycle = Lifecycle::new(ConvertCommand::from(parse(&["-r", "builds"])));

        lifecycle.execute(&ctx).await.unwrap();

        let calls = ctx.runner.0.calls();
        assert_eq!(calls[0].0, "/opt/crane/bin/crane");
        assert_eq!(
            calls[0].1,
            ["convert", "--resource", "builds", "--export-dir", "convert"]
        );
    }
}
