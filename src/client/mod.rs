//! Context-scoped API clients.
//!
//! `build_client` turns a kubeconfig context name into a `kube::Client` with
//! the extension scheme installed and client-side throttling applied. The
//! context is an explicit argument on every call; no shared loader state is
//! mutated to select it.

pub mod throttle;

use kube::client::ClientBuilder;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};

use crate::error::{MigrateError, Result};
use crate::scheme;

pub use throttle::{Throttle, ThrottleLayer, ThrottleSettings};

/// An API client bound to one kubeconfig context.
#[derive(Clone)]
pub struct ScopedClient {
    client: Client,
    context: String,
    throttle: ThrottleLayer,
}

impl std::fmt::Debug for ScopedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedClient")
            .field("context", &self.context)
            .field("throttle", &self.throttle)
            .finish_non_exhaustive()
    }
}

impl ScopedClient {
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn into_client(self) -> Client {
        self.client
    }

    /// The context this client was resolved from (empty for the current context).
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Settings of the throttle layer wrapping this client's transport.
    pub fn throttle(&self) -> ThrottleSettings {
        self.throttle.settings()
    }

    pub fn default_namespace(&self) -> &str {
        self.client.default_namespace()
    }
}

/// Build a client for `context` from the kubeconfig on disk (`$KUBECONFIG` or
/// `~/.kube/config`). An empty context selects the kubeconfig's current context.
pub async fn build_client(context: &str) -> Result<ScopedClient> {
    let kubeconfig = Kubeconfig::read().map_err(|source| MigrateError::ContextResolution {
        context: context.to_string(),
        source,
    })?;
    build_client_with_kubeconfig(kubeconfig, context).await
}

/// Build a client for `context` from an already-loaded kubeconfig.
pub async fn build_client_with_kubeconfig(
    kubeconfig: Kubeconfig,
    context: &str,
) -> Result<ScopedClient> {
    scheme::install()?;

    let options = KubeConfigOptions {
        context: (!context.is_empty()).then(|| context.to_string()),
        ..Default::default()
    };
    let config = Config::from_custom_kubeconfig(kubeconfig, &options)
        .await
        .map_err(|source| MigrateError::ContextResolution {
            context: context.to_string(),
            source,
        })?;

    let throttle = ThrottleLayer::new(ThrottleSettings::default());
    install_crypto_provider();

    let client = ClientBuilder::try_from(config)
        .map_err(|source| MigrateError::ClientConstruction {
            context: context.to_string(),
            source,
        })?
        .with_layer(&throttle)
        .build();

    tracing::debug!(
        context = %context,
        qps = %throttle.settings().qps,
        burst = %throttle.settings().burst,
        "built context-scoped client"
    );

    Ok(ScopedClient {
        client,
        context: context.to_string(),
        throttle,
    })
}

fn install_crypto_provider() {
    // Err only means a provider is already installed.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}
