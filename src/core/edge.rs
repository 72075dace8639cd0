//! Edge decision logic.
//!
//! `EdgeService` holds the read-only configuration shared by every request
//! and answers the per-request questions of the edge handler:
//! * what absolute URL did the request arrive on
//! * should it be redirected, and where to
//! * which security and cache headers decorate the forwarded response
//!
//! Nothing here performs I/O; the adapter layer drives the request through
//! these decisions and talks to the origin.
use std::sync::Arc;

use http::{
    HeaderMap, HeaderName, HeaderValue, Uri,
    header::{
        CACHE_CONTROL, CONTENT_TYPE, HOST, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
        X_FRAME_OPTIONS, X_XSS_PROTECTION,
    },
};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use url::Url;

use crate::{
    config::models::EdgeConfig,
    core::domain::{DomainAnalysis, DomainClassifier},
    ports::origin::OriginError,
};

/// One year, for fingerprinted static assets.
pub const CACHE_STATIC: &str = "public, max-age=31536000";
/// One hour, for feeds and sitemaps.
pub const CACHE_FEED: &str = "public, max-age=3600";
/// One hour, the HTML default.
pub const CACHE_HTML: &str = "public, max-age=3600";

static STATIC_ASSET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\.(ico|svg|png|jpg|jpeg|gif|css|js|woff|woff2|ttf)$").expect("valid regex")
});

/// Errors raised while driving a request through the edge.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EdgeError {
    #[error("Request has no host")]
    MissingHost,

    #[error("Malformed request URL: {0}")]
    MalformedUrl(String),

    #[error("Invalid redirect target: {0}")]
    InvalidRedirect(String),

    #[error("Failed to read request body: {0}")]
    Body(String),

    #[error("Request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("Origin error: {0}")]
    Origin(#[from] OriginError),
}

/// Headers attached to every forwarded response, and to the hard failure response.
pub fn security_headers() -> [(HeaderName, HeaderValue); 5] {
    [
        (X_FRAME_OPTIONS, HeaderValue::from_static("DENY")),
        (X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        (X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block")),
        (
            REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ),
        (
            HeaderName::from_static("x-robots-tag"),
            HeaderValue::from_static("noai, noimageai"),
        ),
    ]
}

/// Set (overwriting) every security header on `headers`.
pub fn apply_security_headers(headers: &mut HeaderMap) {
    for (name, value) in security_headers() {
        headers.insert(name, value);
    }
}

/// Cache-Control choice for a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    StaticAsset,
    /// `/feed*` and `/sitemap*`; `xml` forces an XML content type
    Feed { xml: bool },
    Html,
}

impl CachePolicy {
    pub fn for_path(path: &str) -> Self {
        if STATIC_ASSET_RE.is_match(path) {
            CachePolicy::StaticAsset
        } else if path.starts_with("/feed") || path.starts_with("/sitemap") {
            CachePolicy::Feed {
                xml: path.contains("sitemap"),
            }
        } else {
            CachePolicy::Html
        }
    }

    pub fn cache_control(self) -> &'static str {
        match self {
            CachePolicy::StaticAsset => CACHE_STATIC,
            CachePolicy::Feed { .. } => CACHE_FEED,
            CachePolicy::Html => CACHE_HTML,
        }
    }

    pub fn content_type(self) -> Option<&'static str> {
        match self {
            CachePolicy::Feed { xml: true } => Some("application/xml"),
            _ => None,
        }
    }

    pub fn apply(self, headers: &mut HeaderMap) {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static(self.cache_control()));
        if let Some(content_type) = self.content_type() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
    }
}

/// Reconstruct the absolute URL a request arrived on.
///
/// The authority comes from the request URI (HTTP/2) or the `Host` header
/// (HTTP/1.1); the scheme from the URI, `X-Forwarded-Proto`, or `http`.
pub fn request_url(uri: &Uri, headers: &HeaderMap) -> Result<Url, EdgeError> {
    let forwarded_proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_ascii_lowercase());
    let scheme = match uri.scheme_str().map(str::to_ascii_lowercase).or(forwarded_proto) {
        Some(s) if s == "https" => "https",
        _ => "http",
    };

    let authority = match uri.authority() {
        Some(authority) => authority.as_str().to_string(),
        None => headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(EdgeError::MissingHost)?,
    };

    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());

    Url::parse(&format!("{scheme}://{authority}{path_and_query}"))
        .map_err(|e| EdgeError::MalformedUrl(format!("{authority}{path_and_query}: {e}")))
}

/// Clone `url` onto `custom_domain` over https. Path, query and fragment are
/// kept as they are; so is an explicit non-default port.
pub fn rebuild_redirect_url(url: &Url, custom_domain: &str) -> Result<Url, EdgeError> {
    let mut target = url.clone();
    target
        .set_host(Some(custom_domain))
        .map_err(|e| EdgeError::InvalidRedirect(format!("{custom_domain}: {e}")))?;
    target
        .set_scheme("https")
        .map_err(|()| EdgeError::InvalidRedirect(format!("cannot switch {url} to https")))?;
    Ok(target)
}

/// What to do with one request after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeDecision {
    /// Answer with a permanent redirect to `location`
    Redirect {
        analysis: DomainAnalysis,
        location: Url,
    },
    /// Hand the request to the origin
    Forward { analysis: DomainAnalysis },
}

/// Shared, read-only decision service. Cheap to share behind an `Arc`.
pub struct EdgeService {
    config: Arc<EdgeConfig>,
    classifier: DomainClassifier,
}

impl EdgeService {
    pub fn new(config: Arc<EdgeConfig>) -> Self {
        let classifier = DomainClassifier::from_config(&config.canonical);
        Self { config, classifier }
    }

    pub fn config(&self) -> &EdgeConfig {
        &self.config
    }

    pub fn classifier(&self) -> &DomainClassifier {
        &self.classifier
    }

    pub fn classify(&self, url: &Url) -> DomainAnalysis {
        self.classifier.analyze(url.host_str().unwrap_or_default())
    }

    /// Classify `url` and decide between redirecting and forwarding.
    pub fn decide(&self, url: &Url) -> Result<EdgeDecision, EdgeError> {
        let analysis = self.classify(url);

        if analysis.should_redirect && self.config.features.canonical_redirect {
            let location = rebuild_redirect_url(url, self.classifier.custom_domain())?;
            return Ok(EdgeDecision::Redirect { analysis, location });
        }

        Ok(EdgeDecision::Forward { analysis })
    }

    /// Attach security headers, then the path's cache headers.
    pub fn decorate(&self, path: &str, headers: &mut HeaderMap) {
        apply_security_headers(headers);
        CachePolicy::for_path(path).apply(headers);
    }
}
