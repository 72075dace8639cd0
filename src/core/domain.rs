//! Hostname classification.
//!
//! Pure predicates deciding whether a hostname is the configured custom
//! domain, the hosting platform's preview domain, or otherwise "problematic"
//! for indexing. Any hostname that is not the custom domain counts as
//! problematic, third-party hosts included.
use serde::Serialize;

use crate::config::models::CanonicalUrlConfig;

/// Suffix of the hosting platform's auto-assigned preview hostnames.
pub const PLATFORM_PREVIEW_SUFFIX: &str = ".pages.dev";

/// True iff `hostname` is exactly `custom_domain` or its `www.` subdomain.
/// The comparison is case-sensitive; hosts parsed by `url` are already lowercase.
pub fn is_custom_domain(hostname: &str, custom_domain: &str) -> bool {
    if hostname.is_empty() || custom_domain.is_empty() {
        return false;
    }

    hostname == custom_domain || hostname.strip_prefix("www.") == Some(custom_domain)
}

/// True iff `hostname` contains the platform preview suffix.
pub fn is_platform_preview_domain(hostname: &str) -> bool {
    hostname.contains(PLATFORM_PREVIEW_SUFFIX)
}

/// True iff `hostname` is a preview host or anything other than the custom
/// domain. An empty hostname is problematic.
pub fn is_problematic_domain(hostname: &str, custom_domain: &str) -> bool {
    is_platform_preview_domain(hostname) || !is_custom_domain(hostname, custom_domain)
}

/// Per-request classification of one hostname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainAnalysis {
    pub hostname: String,
    pub is_custom_domain: bool,
    pub is_platform_preview: bool,
    pub is_problematic: bool,
    pub should_redirect: bool,
}

/// Classifier bound to one custom domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainClassifier {
    custom_domain: String,
}

impl Default for DomainClassifier {
    fn default() -> Self {
        Self::from_config(&CanonicalUrlConfig::default())
    }
}

impl DomainClassifier {
    pub fn new(custom_domain: impl Into<String>) -> Self {
        Self {
            custom_domain: custom_domain.into(),
        }
    }

    pub fn from_config(config: &CanonicalUrlConfig) -> Self {
        Self::new(config.custom_domain.clone())
    }

    pub fn custom_domain(&self) -> &str {
        &self.custom_domain
    }

    pub fn is_custom_domain(&self, hostname: &str) -> bool {
        is_custom_domain(hostname, &self.custom_domain)
    }

    pub fn is_problematic(&self, hostname: &str) -> bool {
        is_problematic_domain(hostname, &self.custom_domain)
    }

    pub fn analyze(&self, hostname: &str) -> DomainAnalysis {
        let is_platform_preview = is_platform_preview_domain(hostname);
        DomainAnalysis {
            hostname: hostname.to_string(),
            is_custom_domain: self.is_custom_domain(hostname),
            is_platform_preview,
            is_problematic: self.is_problematic(hostname),
            should_redirect: is_platform_preview,
        }
    }
}
