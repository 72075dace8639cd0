use std::net::SocketAddr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    config::models::{EdgeConfig, OriginConfig, RobotsConfig},
    core::domain::is_platform_preview_domain,
};

static HOSTNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9]([a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?)*$")
        .expect("valid hostname regex")
});

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Startup validator for [`EdgeConfig`]. Failures are fatal before serving.
pub struct EdgeConfigValidator;

impl EdgeConfigValidator {
    /// Validate the entire configuration, collecting every problem found
    pub fn validate(config: &EdgeConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }

        if let Err(e) = Self::validate_custom_domain(
            "canonical.custom_domain",
            &config.canonical.custom_domain,
        ) {
            errors.push(e);
        }

        if !config.base_path.starts_with('/') {
            errors.push(ValidationError::InvalidField {
                field: "base_path".to_string(),
                message: "Must start with '/'".to_string(),
            });
        }

        if config.max_body_bytes == 0 {
            errors.push(ValidationError::InvalidField {
                field: "max_body_bytes".to_string(),
                message: "Must be greater than zero".to_string(),
            });
        }

        if let Err(e) = Self::validate_origin(&config.origin) {
            errors.push(e);
        }

        if let Err(mut robots_errors) = Self::validate_robots(&config.robots) {
            errors.append(&mut robots_errors);
        }

        if config.logging.level.trim().is_empty() {
            errors.push(ValidationError::MissingField {
                field: "logging.level".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:8788' or '0.0.0.0:8080')"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// A custom domain must be a bare DNS hostname that is not itself a preview domain.
    pub fn validate_custom_domain(field: &str, domain: &str) -> ValidationResult<()> {
        if domain.is_empty() {
            return Err(ValidationError::MissingField {
                field: field.to_string(),
            });
        }

        if domain.contains("://") {
            return Err(ValidationError::InvalidField {
                field: field.to_string(),
                message: "Domain should not contain protocol (e.g., use 'example.com' not 'https://example.com')".to_string(),
            });
        }

        if !HOSTNAME_RE.is_match(domain) {
            return Err(ValidationError::InvalidField {
                field: field.to_string(),
                message: format!("Invalid hostname format: '{domain}'"),
            });
        }

        if is_platform_preview_domain(domain) {
            return Err(ValidationError::InvalidField {
                field: field.to_string(),
                message: format!("'{domain}' is a platform preview domain, not a custom domain"),
            });
        }

        Ok(())
    }

    fn validate_origin(origin: &OriginConfig) -> ValidationResult<()> {
        match origin {
            OriginConfig::Static { root } if root.trim().is_empty() => {
                Err(ValidationError::MissingField {
                    field: "origin.root".to_string(),
                })
            }
            OriginConfig::Static { .. } => Ok(()),
            OriginConfig::Proxy { target } => match url::Url::parse(target) {
                Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(()),
                _ => Err(ValidationError::InvalidField {
                    field: "origin.target".to_string(),
                    message: format!("Must be an absolute http:// or https:// URL, got '{target}'"),
                }),
            },
        }
    }

    fn validate_robots(config: &RobotsConfig) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_custom_domain("robots.custom_domain", &config.custom_domain)
        {
            errors.push(e);
        }

        let bots = config
            .allowed_bots
            .iter()
            .map(|b| ("robots.allowed_bots", b))
            .chain(
                config
                    .disallowed_bots
                    .iter()
                    .map(|b| ("robots.disallowed_bots", b)),
            );
        for (field, bot) in bots {
            // A line break would inject arbitrary directives into robots.txt
            if bot.trim().is_empty() || bot.contains(['\n', '\r']) {
                errors.push(ValidationError::InvalidField {
                    field: field.to_string(),
                    message: format!("Invalid user agent token: {bot:?}"),
                });
            }
        }

        if config.cache_max_age.normal == 0 || config.cache_max_age.restrictive == 0 {
            errors.push(ValidationError::InvalidField {
                field: "robots.cache_max_age".to_string(),
                message: "Cache lifetimes must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Format multiple validation errors into a single message
    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        if errors.len() == 1 {
            return errors[0].to_string();
        }

        let mut message = format!("Found {} validation errors:\n", errors.len());
        for (i, error) in errors.iter().enumerate() {
            message.push_str(&format!("  {}. {}\n", i + 1, error));
        }
        message
    }
}
