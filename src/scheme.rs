//! Extension resource kinds known to the migration tooling.
//!
//! The core Kubernetes kinds come with `k8s-openapi`; the deprecated OpenShift
//! build and image kinds that `convert` operates on are not, so they are
//! recorded here with their REST mapping. The process-wide scheme is built
//! exactly once by [`install`]; everything else reads it.

use std::collections::HashMap;
use std::sync::OnceLock;

use kube::core::{ApiResource, GroupVersionKind};

use crate::error::{MigrateError, Result};

/// A registered kind with its REST mapping.
#[derive(Debug, Clone)]
pub struct KindMapping {
    pub resource: ApiResource,
    pub namespaced: bool,
}

/// Registry of resource kinds, keyed by group/version/kind.
#[derive(Debug, Default)]
pub struct Scheme {
    kinds: HashMap<GroupVersionKind, KindMapping>,
}

impl Scheme {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind under `plural`.
    ///
    /// Re-registering an identical mapping is a no-op. Registering a known
    /// kind under a different plural or scope is a conflict.
    pub fn register(&mut self, gvk: GroupVersionKind, plural: &str, namespaced: bool) -> Result<()> {
        if let Some(existing) = self.kinds.get(&gvk) {
            if existing.resource.plural == plural && existing.namespaced == namespaced {
                return Ok(());
            }
            return Err(MigrateError::SchemeConflict {
                kind: gvk_string(&gvk),
                existing: existing.resource.plural.clone(),
                requested: plural.to_string(),
            });
        }

        let resource = ApiResource::from_gvk_with_plural(&gvk, plural);
        self.kinds.insert(gvk, KindMapping { resource, namespaced });
        Ok(())
    }

    /// Look up a mapping by plural, kind or lowercase singular (case-insensitive),
    /// e.g. `BuildConfigs`, `buildconfig` or `BuildConfig`.
    pub fn resolve(&self, resource_type: &str) -> Option<&KindMapping> {
        let wanted = resource_type.to_ascii_lowercase();
        self.kinds.values().find(|m| {
            m.resource.plural == wanted || m.resource.kind.to_ascii_lowercase() == wanted
        })
    }

    pub fn contains(&self, gvk: &GroupVersionKind) -> bool {
        self.kinds.contains_key(gvk)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

fn gvk_string(gvk: &GroupVersionKind) -> String {
    format!("{}/{}, Kind={}", gvk.group, gvk.version, gvk.kind)
}

/// `build.openshift.io/v1`
pub fn install_build_v1(scheme: &mut Scheme) -> Result<()> {
    let gvk = |kind| GroupVersionKind::gvk("build.openshift.io", "v1", kind);
    scheme.register(gvk("BuildConfig"), "buildconfigs", true)?;
    scheme.register(gvk("Build"), "builds", true)?;
    Ok(())
}

/// `image.openshift.io/v1`
pub fn install_image_v1(scheme: &mut Scheme) -> Result<()> {
    let gvk = |kind| GroupVersionKind::gvk("image.openshift.io", "v1", kind);
    scheme.register(gvk("ImageStream"), "imagestreams", true)?;
    scheme.register(gvk("ImageStreamTag"), "imagestreamtags", true)?;
    scheme.register(gvk("ImageTag"), "imagetags", true)?;
    scheme.register(gvk("Image"), "images", false)?;
    Ok(())
}

static SCHEME: OnceLock<Scheme> = OnceLock::new();

/// Build the process-wide extension scheme on first call and return it.
///
/// Safe to call repeatedly and from several threads; racing initializers
/// build identical registries and only one is kept.
pub fn install() -> Result<&'static Scheme> {
    if let Some(scheme) = SCHEME.get() {
        return Ok(scheme);
    }

    let mut scheme = Scheme::new();
    install_build_v1(&mut scheme)?;
    install_image_v1(&mut scheme)?;
    tracing::debug!(kinds = scheme.len(), "extension scheme installed");

    Ok(SCHEME.get_or_init(|| scheme))
}
