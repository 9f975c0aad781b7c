//! Tool configuration: which engine and `kubectl` executables to run.
//!
//! Optional: when no file is found, built-in defaults are used.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{MigrateError, Result};

/// File name searched in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "kubectl-migrate.toml";

/// Strip an env var reference to its variable name.
///
/// Accepts `${VAR_NAME}` syntax only. Returns `None` if the value is not a
/// valid env-var reference.
pub fn parse_env_ref(value: &str) -> Option<&str> {
    value.strip_prefix("${").and_then(|s| s.strip_suffix('}'))
}

/// Resolve a map of `${VAR}` references to their values. Unset variables
/// resolve to the empty string.
pub fn resolve_env_vars(env: &HashMap<String, String>) -> HashMap<String, String> {
    env.iter()
        .map(|(k, v)| {
            let resolved = match parse_env_ref(v) {
                Some(var_name) => std::env::var(var_name).unwrap_or_default(),
                None => v.clone(),
            };
            (k.clone(), resolved)
        })
        .collect()
}

/// Top-level tool configuration, parsed from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MigrateConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub kubectl: KubectlConfig,
}

/// The external migration engine the passthrough subcommands delegate to.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_engine_binary")]
    pub binary: String,
    /// Env var references (`${VAR}`), resolved when the engine is spawned.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KubectlConfig {
    #[serde(default = "default_kubectl_binary")]
    pub binary: String,
}

fn default_engine_binary() -> String {
    "crane".to_string()
}

fn default_kubectl_binary() -> String {
    "kubectl".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: default_engine_binary(),
            env: HashMap::new(),
        }
    }
}

impl Default for KubectlConfig {
    fn default() -> Self {
        Self {
            binary: default_kubectl_binary(),
        }
    }
}

impl MigrateConfig {
    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| MigrateError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: MigrateConfig =
            toml::from_str(&content).map_err(|e| MigrateError::ConfigParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the resolved location, or defaults when there is none.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        match resolve_config(explicit) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.engine.binary.trim().is_empty() {
            return Err(MigrateError::InvalidConfig(
                "engine".to_string(),
                "'binary' must not be empty".to_string(),
            ));
        }
        if self.kubectl.binary.trim().is_empty() {
            return Err(MigrateError::InvalidConfig(
                "kubectl".to_string(),
                "'binary' must not be empty".to_string(),
            ));
        }
        for (key, value) in &self.engine.env {
            if parse_env_ref(value).is_none() {
                return Err(MigrateError::InvalidConfig(
                    "engine".to_string(),
                    format!(
                        "env value for key '{}' must be a ${{VAR}} reference, got '{}'",
                        key, value
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Resolve config file path: explicit flag → ./kubectl-migrate.toml →
/// `<config dir>/kubectl-migrate/config.toml`.
///
/// An explicit path is returned even if it does not exist so that loading
/// reports the missing file.
pub fn resolve_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = Path::new(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local.to_path_buf());
    }

    dirs::config_dir()
        .map(|dir| dir.join("kubectl-migrate").join("config.toml"))
        .filter(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_toml(toml_str: &str) -> MigrateConfig {
        toml::from_str(toml_str).expect("valid TOML")
    }

    #[test]
    fn test_parse_env_ref() {
        assert_eq!(parse_env_ref("${FOO}"), Some("FOO"));
        assert_eq!(parse_env_ref("$FOO"), None);
        assert_eq!(parse_env_ref("literal"), None);
        assert_eq!(parse_env_ref("${}"), Some(""));
    }

    #[test]
    fn test_resolve_env_vars() {
        // SAFETY: test-only, no concurrent threads depend on this env var.
        unsafe { std::env::set_var("MIGRATE_CONFIG_TEST_VAR", "resolved_value") };
        let mut env = HashMap::new();
        env.insert("KEY".to_string(), "${MIGRATE_CONFIG_TEST_VAR}".to_string());
        let resolved = resolve_env_vars(&env);
        assert_eq!(resolved.get("KEY").unwrap(), "resolved_value");
        // SAFETY: test-only cleanup.
        unsafe { std::env::remove_var("MIGRATE_CONFIG_TEST_VAR") };
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse_toml("");
        assert_eq!(config.engine.binary, "crane");
        assert_eq!(config.kubectl.binary, "kubectl");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_engine_override() {
        let config = parse_toml(
            r#"
            [engine]
            binary = "/opt/crane/bin/crane"

            [engine.env]
            KUBECONFIG = "${MIGRATE_KUBECONFIG}"
            "#,
        );
        assert_eq!(config.engine.binary, "/opt/crane/bin/crane");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_literal_env_value_rejected() {
        let config = parse_toml(
            r#"
            [engine.env]
            KUBECONFIG = "/home/me/.kube/config"
            "#,
        );
        let result = config.validate();
        assert!(
            matches!(result, Err(MigrateError::InvalidConfig(subject, msg)) if subject == "engine" && msg.contains("KUBECONFIG"))
        );
    }

    #[test]
    fn test_empty_binary_rejected() {
        let config = parse_toml(
            r#"
            [kubectl]
            binary = ""
            "#,
        );
        assert!(matches!(
            config.validate(),
            Err(MigrateError::InvalidConfig(subject, _)) if subject == "kubectl"
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("migrate.toml");
        std::fs::write(&path, "[engine]\nbinary = \"crane-dev\"\n").unwrap();

        let config = MigrateConfig::load(&path).unwrap();
        assert_eq!(config.engine.binary, "crane-dev");
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("migrate.toml");
        std::fs::write(&path, "[engine\nbinary = ").unwrap();

        assert!(matches!(
            MigrateConfig::load(&path),
            Err(MigrateError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_explicit_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(
            MigrateConfig::load_or_default(Some(&path)),
            Err(MigrateError::ConfigRead { .. })
        ));
    }
}
