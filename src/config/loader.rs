use std::path::Path;

use config::{Config, Environment, File, FileFormat, Map};
use eyre::{Context, Result};

use crate::config::models::EdgeConfig;

/// Prefix for structured environment overrides, e.g.
/// `CANON_EDGE_FEATURES__CANONICAL_REDIRECT=false`.
pub const ENV_PREFIX: &str = "CANON_EDGE";

/// Configuration file looked up when none is given explicitly.
pub const DEFAULT_CONFIG_FILE: &str = "canon-edge.toml";

/// Plain environment variables shared with the site build.
const CUSTOM_DOMAIN_VAR: &str = "CUSTOM_DOMAIN";
const BASE_PATH_VAR: &str = "BASE_PATH";

/// Builds an [`EdgeConfig`] from an optional file plus a snapshot of the
/// environment. The snapshot is taken once so loading is repeatable.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    env: Map<String, String>,
}

impl ConfigLoader {
    /// Snapshot the current process environment
    pub fn from_process_env() -> Self {
        Self {
            env: std::env::vars().collect(),
        }
    }

    /// Use an explicit set of environment variables instead of the process environment
    pub fn with_env<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            env: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    fn env_value(&self, key: &str) -> Option<String> {
        self.env
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Load configuration. A missing file is an error only when `required` is set.
    pub fn load(&self, config_path: &Path, required: bool) -> Result<EdgeConfig> {
        let format = match config_path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            Some("ini") => FileFormat::Ini,
            _ => FileFormat::Toml,
        };
        let path_str = config_path
            .to_str()
            .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", config_path.display()))?;

        let custom_domain = self.env_value(CUSTOM_DOMAIN_VAR);

        let settings = Config::builder()
            .add_source(File::new(path_str, format).required(required))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(self.env.clone())),
            )
            .set_override_option("canonical.custom_domain", custom_domain.clone())?
            .set_override_option("robots.custom_domain", custom_domain)?
            .set_override_option("base_path", self.env_value(BASE_PATH_VAR))?
            .build()
            .with_context(|| format!("Failed to build config from {}", config_path.display()))?;

        let edge_config: EdgeConfig = settings.try_deserialize().with_context(|| {
            format!(
                "Failed to deserialize config from {}",
                config_path.display()
            )
        })?;

        tracing::debug!(
            custom_domain = %edge_config.canonical.custom_domain,
            base_path = %edge_config.base_path,
            "Configuration loaded"
        );

        Ok(edge_config)
    }
}

/// Load configuration from `config_path` (or the default file when absent)
/// overlaid with the process environment.
pub fn load_config(config_path: Option<&str>) -> Result<EdgeConfig> {
    let loader = ConfigLoader::from_process_env();
    match config_path {
        Some(path) => loader.load(Path::new(path), true),
        None => loader.load(Path::new(DEFAULT_CONFIG_FILE), false),
    }
}
