//! Configuration data structures for canon-edge.
//!
//! These types map directly to TOML (also JSON / YAML) configuration files and to
//! `CANON_EDGE_*` environment overrides. Every struct carries `#[serde(default)]`
//! so a missing file or a partial one still yields a complete configuration.
//! The resulting [`EdgeConfig`] is built once at startup and shared read-only.
use serde::{Deserialize, Serialize};

/// Domain used whenever no custom domain has been configured.
pub const DEFAULT_CUSTOM_DOMAIN: &str = "midnight480.com";

/// Settings for building canonical URLs.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CanonicalUrlConfig {
    /// Authoritative hostname pages are published under
    pub custom_domain: String,
    /// Emit `https:` canonical URLs (otherwise `http:`)
    pub force_https: bool,
    /// Keep the request query when deriving a canonical URL from a request target
    pub preserve_query: bool,
    /// Strip a single trailing slash from non-root paths
    pub normalize_trailing_slash: bool,
}

impl Default for CanonicalUrlConfig {
    fn default() -> Self {
        Self {
            custom_domain: DEFAULT_CUSTOM_DOMAIN.to_string(),
            force_https: true,
            preserve_query: false, // tracking parameters stay out of canonical tags
            normalize_trailing_slash: true,
        }
    }
}

impl CanonicalUrlConfig {
    /// Return a copy of this configuration with `overrides` applied on top.
    pub fn merged(&self, overrides: &CanonicalUrlOverrides) -> Self {
        Self {
            custom_domain: overrides
                .custom_domain
                .clone()
                .unwrap_or_else(|| self.custom_domain.clone()),
            force_https: overrides.force_https.unwrap_or(self.force_https),
            preserve_query: overrides.preserve_query.unwrap_or(self.preserve_query),
            normalize_trailing_slash: overrides
                .normalize_trailing_slash
                .unwrap_or(self.normalize_trailing_slash),
        }
    }
}

/// Per-call partial overrides for [`CanonicalUrlConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalUrlOverrides {
    pub custom_domain: Option<String>,
    pub force_https: Option<bool>,
    pub preserve_query: Option<bool>,
    pub normalize_trailing_slash: Option<bool>,
}

impl CanonicalUrlOverrides {
    pub fn custom_domain(mut self, domain: impl Into<String>) -> Self {
        self.custom_domain = Some(domain.into());
        self
    }

    pub fn force_https(mut self, enabled: bool) -> Self {
        self.force_https = Some(enabled);
        self
    }

    pub fn preserve_query(mut self, enabled: bool) -> Self {
        self.preserve_query = Some(enabled);
        self
    }

    pub fn normalize_trailing_slash(mut self, enabled: bool) -> Self {
        self.normalize_trailing_slash = Some(enabled);
        self
    }
}

/// robots.txt cache lifetimes in seconds, one per policy variant.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct CacheMaxAge {
    pub normal: u64,
    pub restrictive: u64,
}

impl Default for CacheMaxAge {
    fn default() -> Self {
        Self {
            normal: 86_400,
            restrictive: 3_600,
        }
    }
}

/// Declarative crawler access policy rendered into robots.txt.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RobotsConfig {
    pub custom_domain: String,
    /// Search engine crawlers explicitly allowed on the canonical domain
    pub allowed_bots: Vec<String>,
    /// AI and scraping crawlers denied everywhere
    pub disallowed_bots: Vec<String>,
    /// Seconds between requests asked of heavy crawlers
    pub crawl_delay: u32,
    pub cache_max_age: CacheMaxAge,
}

impl Default for RobotsConfig {
    fn default() -> Self {
        let bots = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        Self {
            custom_domain: DEFAULT_CUSTOM_DOMAIN.to_string(),
            allowed_bots: bots(&["Googlebot", "Bingbot"]),
            disallowed_bots: bots(&[
                "GPTBot",
                "ChatGPT-User",
                "CCBot",
                "anthropic-ai",
                "Claude-Web",
                "PerplexityBot",
                "YouBot",
                "Meta-ExternalAgent",
                "FacebookBot",
            ]),
            crawl_delay: 1,
            cache_max_age: CacheMaxAge::default(),
        }
    }
}

/// Where forwarded requests are resolved.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum OriginConfig {
    /// Serve the generated site from a local directory
    Static { root: String },
    /// Forward to an upstream HTTP origin
    Proxy { target: String },
}

impl Default for OriginConfig {
    fn default() -> Self {
        OriginConfig::Static {
            root: "./dist".to_string(),
        }
    }
}

/// Feature flags read once at startup.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct FeatureFlags {
    /// Redirect platform preview hostnames to the custom domain
    pub canonical_redirect: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            canonical_redirect: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive, `RUST_LOG` takes precedence
    pub level: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Same default as axum's `DefaultBodyLimit`.
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Top-level process configuration.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct EdgeConfig {
    pub listen_addr: String,
    /// Sub-directory the site is published under, `/` for the root
    pub base_path: String,
    pub origin: OriginConfig,
    /// Largest request body buffered for forwarding, in bytes
    pub max_body_bytes: usize,
    pub canonical: CanonicalUrlConfig,
    pub robots: RobotsConfig,
    pub features: FeatureFlags,
    pub logging: LoggingConfig,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8788".to_string(),
            base_path: "/".to_string(),
            origin: OriginConfig::default(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            canonical: CanonicalUrlConfig::default(),
            robots: RobotsConfig::default(),
            features: FeatureFlags::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EdgeConfig {
    /// Create a new configuration builder
    pub fn builder() -> EdgeConfigBuilder {
        EdgeConfigBuilder::default()
    }
}

/// Builder for [`EdgeConfig`], mostly used by tests and embedders.
#[derive(Default)]
pub struct EdgeConfigBuilder {
    config: EdgeConfig,
}

impl EdgeConfigBuilder {
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.config.base_path = base_path.into();
        self
    }

    /// Set the custom domain for both canonical URLs and robots.txt
    pub fn custom_domain(mut self, domain: impl Into<String>) -> Self {
        let domain = domain.into();
        self.config.robots.custom_domain = domain.clone();
        self.config.canonical.custom_domain = domain;
        self
    }

    pub fn static_root(mut self, root: impl Into<String>) -> Self {
        self.config.origin = OriginConfig::Static { root: root.into() };
        self
    }

    pub fn proxy_target(mut self, target: impl Into<String>) -> Self {
        self.config.origin = OriginConfig::Proxy {
            target: target.into(),
        };
        self
    }

    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.config.max_body_bytes = limit;
        self
    }

    pub fn robots(mut self, robots: RobotsConfig) -> Self {
        self.config.robots = robots;
        self
    }

    pub fn canonical_redirect(mut self, enabled: bool) -> Self {
        self.config.features.canonical_redirect = enabled;
        self
    }

    pub fn build(self) -> EdgeConfig {
        self.config
    }
}
