//! A named cluster reachable through one kubeconfig context.

use std::fmt;

use k8s_openapi::api::core::v1::Pod;
use serde::Deserialize;

use crate::error::{MigrateError, Result};
use crate::exec::{CommandResult, CommandRunner, ProcessRunner};

/// A Kubernetes cluster addressed by its kubeconfig context.
///
/// Every operation shells out to `kubectl --context <context> ...`; nothing
/// about the cluster is cached between calls.
#[derive(Debug, Clone)]
pub struct Cluster<R = ProcessRunner> {
    name: String,
    context: String,
    kubectl: String,
    runner: R,
}

impl Cluster<ProcessRunner> {
    pub fn new(name: impl Into<String>, context: impl Into<String>) -> Self {
        Self::with_runner(name, context, ProcessRunner::new())
    }
}

impl<R: CommandRunner> Cluster<R> {
    pub fn with_runner(name: impl Into<String>, context: impl Into<String>, runner: R) -> Self {
        Self {
            name: name.into(),
            context: context.into(),
            kubectl: "kubectl".to_string(),
            runner,
        }
    }

    /// Use a different `kubectl` executable.
    pub fn with_kubectl(mut self, kubectl: impl Into<String>) -> Self {
        self.kubectl = kubectl.into();
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// Run kubectl against this cluster. Non-zero exits are reported through
    /// [`CommandResult::success`], never as an error.
    pub async fn run_kubectl(&self, args: &[&str]) -> CommandResult {
        let mut full_args = Vec::with_capacity(args.len() + 2);
        full_args.push("--context".to_string());
        full_args.push(self.context.clone());
        full_args.extend(args.iter().map(|a| a.to_string()));

        let result = self.runner.run(&self.kubectl, &full_args).await;
        tracing::debug!(
            cluster = %self.name,
            args = ?args,
            success = result.success(),
            "kubectl"
        );
        result
    }

    /// Verify the cluster answers `kubectl cluster-info`.
    pub async fn check_connectivity(&self) -> Result<()> {
        let result = self.run_kubectl(&["cluster-info"]).await;
        if !result.success() {
            return Err(MigrateError::ClusterUnreachable {
                cluster: self.name.clone(),
                context: self.context.clone(),
                stderr: result.into_stderr(),
            });
        }
        Ok(())
    }

    /// Create a namespace; an existing namespace counts as success.
    pub async fn create_namespace(&self, namespace: &str) -> Result<()> {
        let result = self.run_kubectl(&["create", "namespace", namespace]).await;
        if !result.success() && !result.stderr().contains("already exists") {
            return Err(MigrateError::ClusterOperation {
                cluster: self.name.clone(),
                operation: "create namespace in".to_string(),
                stderr: result.into_stderr(),
            });
        }
        Ok(())
    }

    /// Delete a namespace; an absent namespace counts as success.
    pub async fn delete_namespace(&self, namespace: &str) -> Result<()> {
        let result = self
            .run_kubectl(&["delete", "namespace", namespace, "--ignore-not-found=true"])
            .await;
        if !result.success() {
            return Err(MigrateError::ClusterOperation {
                cluster: self.name.clone(),
                operation: "delete namespace from".to_string(),
                stderr: result.into_stderr(),
            });
        }
        Ok(())
    }

    /// `kubectl get pods -n <namespace> -o json`.
    pub async fn get_pods(&self, namespace: &str) -> CommandResult {
        self.run_kubectl(&["get", "pods", "-n", namespace, "-o", "json"])
            .await
    }

    /// Pods in `namespace`, decoded from [`Cluster::get_pods`].
    pub async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>> {
        let result = self.get_pods(namespace).await;
        if !result.success() {
            return Err(MigrateError::ClusterOperation {
                cluster: self.name.clone(),
                operation: "list pods in".to_string(),
                stderr: result.into_stderr(),
            });
        }
        parse_items(result.stdout()).map_err(|e| MigrateError::ClusterOperation {
            cluster: self.name.clone(),
            operation: "decode pods from".to_string(),
            stderr: e.to_string(),
        })
    }
}

/// `kubectl get -o json` wraps results in a generic `List`.
#[derive(Deserialize)]
struct ItemList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

fn parse_items<T: serde::de::DeserializeOwned>(json: &str) -> serde_json::Result<Vec<T>> {
    serde_json::from_str::<ItemList<T>>(json).map(|list| list.items)
}

impl<R> fmt::Display for Cluster<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - context: {}", self.name, self.context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::fake::FakeRunner;

    fn cluster() -> Cluster<FakeRunner> {
        Cluster::with_runner("src", "c1", FakeRunner::new())
    }

    fn strings(a: &[&str]) -> Vec<String> {
        a.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_run_kubectl_prepends_context() {
        let cluster = cluster();
        let result = cluster.run_kubectl(&["get", "pods", "-n", "ns1"]).await;
        assert!(result.success());

        let calls = cluster.runner().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "kubectl");
        assert_eq!(
            calls[0].1,
            strings(&["--context", "c1", "get", "pods", "-n", "ns1"])
        );
    }

    #[tokio::test]
    async fn test_run_kubectl_reports_failure_without_error() {
        let cluster = cluster();
        cluster.runner().push(CommandResult::new("partial", "boom", Some(2)));
        let result = cluster.run_kubectl(&["get", "nodes"]).await;
        assert!(!result.success());
        assert_eq!(result.stdout(), "partial");
        assert_eq!(result.stderr(), "boom");
    }

    #[test]
    fn test_identity_is_fixed_at_construction() {
        let cluster = cluster().with_kubectl("oc");
        assert_eq!(cluster.name(), "src");
        assert_eq!(cluster.context(), "c1");
        assert_eq!(cluster.to_string(), "src - context: c1");
    }

    #[tokio::test]
    async fn test_custom_kubectl_binary() {
        let cluster = cluster().with_kubectl("oc");
        cluster.run_kubectl(&["version"]).await;
        assert_eq!(cluster.runner().calls()[0].0, "oc");
    }

    #[tokio::test]
    async fn test_create_namespace_twice_succeeds() {
        let cluster = cluster();
        cluster.runner().push(CommandResult::new("namespace/ns1 created", "", Some(0)));
        cluster.runner().push_failure(
            "Error from server (AlreadyExists): namespaces \"ns1\" already exists",
        );

        cluster.create_namespace("ns1").await.unwrap();
        cluster.create_namespace("ns1").await.unwrap();

        let calls = cluster.runner().calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[1].1,
            strings(&["--context", "c1", "create", "namespace", "ns1"])
        );
    }

    #[tokio::test]
    async fn test_create_namespace_other_failure() {
        let cluster = cluster();
        cluster.runner().push_failure("forbidden: user cannot create namespaces");
        let err = cluster.create_namespace("ns1").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to create namespace in src: forbidden: user cannot create namespaces"
        );
    }

    #[tokio::test]
    async fn test_delete_namespace_ignores_not_found() {
        let cluster = cluster();
        cluster.delete_namespace("never-created").await.unwrap();
        assert_eq!(
            cluster.runner().calls()[0].1,
            strings(&[
                "--context",
                "c1",
                "delete",
                "namespace",
                "never-created",
                "--ignore-not-found=true"
            ])
        );
    }

    #[tokio::test]
    async fn test_delete_namespace_failure() {
        let cluster = cluster();
        cluster.runner().push_failure("the server is currently unable to handle the request");
        let err = cluster.delete_namespace("ns1").await.unwrap_err();
        assert!(err.to_string().starts_with("failed to delete namespace from src:"));
    }

    #[tokio::test]
    async fn test_check_connectivity_failure_names_cluster_and_context() {
        let cluster = cluster();
        cluster.runner().push_failure("Unable to connect to the server");
        let err = cluster.check_connectivity().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot connect to cluster src (context: c1): Unable to connect to the server"
        );
        assert_eq!(
            cluster.runner().calls()[0].1,
            strings(&["--context", "c1", "cluster-info"])
        );
    }

    #[tokio::test]
    async fn test_get_pods_requests_json() {
        let cluster = cluster();
        cluster.get_pods("apps").await;
        assert_eq!(
            cluster.runner().calls()[0].1,
            strings(&["--context", "c1", "get", "pods", "-n", "apps", "-o", "json"])
        );
    }

    #[tokio::test]
    async fn test_list_pods_decodes_items() {
        let cluster = cluster();
        cluster.runner().push(CommandResult::new(
            r#"{
                "apiVersion": "v1",
                "kind": "List",
                "items": [
                    {"apiVersion": "v1", "kind": "Pod", "metadata": {"name": "web-0", "namespace": "apps"}},
                    {"apiVersion": "v1", "kind": "Pod", "metadata": {"name": "web-1", "namespace": "apps"}}
                ]
            }"#,
            "",
            Some(0),
        ));

        let pods = cluster.list_pods("apps").await.unwrap();
        let names: Vec<_> = pods
            .iter()
            .filter_map(|p| p.metadata.name.as_deref())
            .collect();
        assert_eq!(names, vec!["web-0", "web-1"]);
    }

    #[test]
    fn test_display() {
        assert_eq!(cluster().to_string(), "src - context: c1");
    }
}
