//! Canonical URL construction and normalization.
//!
//! Canonical URLs never carry the request query or fragment: tracking
//! parameters must not end up in `<link rel="canonical">` tags. Callers that
//! need the original query keep it themselves, or use
//! [`canonical_url_for_request`] with `preserve_query` enabled.
use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

use crate::{
    config::models::{CanonicalUrlConfig, CanonicalUrlOverrides},
    core::domain::{is_platform_preview_domain, is_problematic_domain},
};

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_slash = false;
    for c in path.chars() {
        if c == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        out.push(c);
    }
    out
}

/// Build the canonical URL for `path` under `config`.
pub fn generate_canonical_url(path: &str, config: &CanonicalUrlConfig) -> String {
    let mut path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };

    // one slash only, before runs are collapsed
    if config.normalize_trailing_slash && path != "/" && path.ends_with('/') {
        path.pop();
    }
    let normalized = collapse_slashes(&path);

    let scheme = if config.force_https { "https:" } else { "http:" };
    format!("{scheme}//{}{normalized}", config.custom_domain)
}

/// [`generate_canonical_url`] with `overrides` merged over `base` for this call only.
pub fn generate_canonical_url_with(
    path: &str,
    base: &CanonicalUrlConfig,
    overrides: &CanonicalUrlOverrides,
) -> String {
    generate_canonical_url(path, &base.merged(overrides))
}

/// Canonical URL for an inbound request target (`/path?query`). The query is
/// kept only when `preserve_query` is set; a fragment is always dropped.
pub fn canonical_url_for_request(path_and_query: &str, config: &CanonicalUrlConfig) -> String {
    let without_fragment = path_and_query
        .split_once('#')
        .map_or(path_and_query, |(before, _)| before);
    let (path, query) = match without_fragment.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (without_fragment, None),
    };

    let canonical = generate_canonical_url(path, config);
    match query {
        Some(q) if config.preserve_query && !q.is_empty() => format!("{canonical}?{q}"),
        _ => canonical,
    }
}

/// Reduce `url` to scheme, host and path. Input that does not parse as an
/// absolute URL with a host comes back unchanged.
pub fn remove_query_params(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => format!("{}://{}{}", parsed.scheme(), host, parsed.path()),
            None => url.to_string(),
        },
        Err(_) => url.to_string(),
    }
}

/// Collapse repeated slashes and strip one trailing slash; empty becomes `/`.
pub fn normalize_path(path: &str) -> String {
    let mut collapsed = collapse_slashes(path);
    if collapsed.ends_with('/') {
        collapsed.pop();
    }
    if collapsed.is_empty() {
        "/".to_string()
    } else {
        collapsed
    }
}

/// True iff `url` is https, has a host that is not a preview domain, and an absolute path.
pub fn validate_canonical_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };

    parsed.scheme() == "https"
        && parsed
            .host_str()
            .is_some_and(|host| !host.is_empty() && !is_platform_preview_domain(host))
        && parsed.path().starts_with('/')
}

/// Diagnostic snapshot of a canonical URL decision.
#[derive(Debug, Clone, Serialize)]
pub struct CanonicalDebugInfo {
    pub original_url: String,
    pub canonical_url: String,
    pub config: CanonicalUrlConfig,
    pub is_valid: bool,
    /// `None` when the original URL could not be parsed
    pub is_problematic: Option<bool>,
    pub timestamp: DateTime<Utc>,
}

pub fn generate_debug_info(
    original_url: &str,
    canonical_url: &str,
    config: &CanonicalUrlConfig,
) -> CanonicalDebugInfo {
    let is_problematic = Url::parse(original_url)
        .ok()
        .map(|u| is_problematic_domain(u.host_str().unwrap_or_default(), &config.custom_domain));

    CanonicalDebugInfo {
        original_url: original_url.to_string(),
        canonical_url: canonical_url.to_string(),
        config: config.clone(),
        is_valid: validate_canonical_url(canonical_url),
        is_problematic,
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> CanonicalUrlConfig {
        CanonicalUrlConfig::default()
    }

    #[test]
    fn strips_trailing_slash() {
        assert_eq!(
            generate_canonical_url("/posts/test/", &defaults()),
            "https://midnight480.com/posts/test"
        );
    }

    #[test]
    fn strips_one_trailing_slash_before_collapsing() {
        assert_eq!(
            generate_canonical_url("/posts//", &defaults()),
            "https://midnight480.com/posts/"
        );
        assert_eq!(
            generate_canonical_url("/a///", &defaults()),
            "https://midnight480.com/a/"
        );
    }

    #[test]
    fn adds_leading_slash_and_collapses_duplicates() {
        assert_eq!(
            generate_canonical_url("posts//test", &defaults()),
            "https://midnight480.com/posts/test"
        );
        assert_eq!(
            generate_canonical_url("//", &defaults()),
            "https://midnight480.com/"
        );
    }

    #[test]
    fn root_keeps_its_slash() {
        assert_eq!(generate_canonical_url("/", &defaults()), "https://midnight480.com/");
        assert_eq!(generate_canonical_url("", &defaults()), "https://midnight480.com/");
        assert_eq!(generate_canonical_url("//", &defaults()), "https://midnight480.com/");
    }

    #[test]
    fn overrides_apply_per_call() {
        let overrides = CanonicalUrlOverrides::default()
            .force_https(false)
            .normalize_trailing_slash(false)
            .custom_domain("example.org");

        assert_eq!(
            generate_canonical_url_with("/about/", &defaults(), &overrides),
            "http://example.org/about/"
        );
        // the base stays untouched
        assert_eq!(
            generate_canonical_url("/about/", &defaults()),
            "https://midnight480.com/about"
        );
    }

    #[test]
    fn canonical_is_deterministic() {
        let config = defaults();
        for path in ["/a/b/", "a", "//x//y//", "/"] {
            assert_eq!(
                generate_canonical_url(path, &config),
                generate_canonical_url(path, &config)
            );
        }
    }

    #[test]
    fn request_query_is_kept_only_when_configured() {
        let mut config = defaults();
        assert_eq!(
            canonical_url_for_request("/posts/test/?utm_source=x#top", &config),
            "https://midnight480.com/posts/test"
        );

        config.preserve_query = true;
        assert_eq!(
            canonical_url_for_request("/posts/test/?page=2#top", &config),
            "https://midnight480.com/posts/test?page=2"
        );
    }

    #[test]
    fn remove_query_params_keeps_scheme_host_path() {
        assert_eq!(
            remove_query_params("https://midnight480.com/posts/test?utm_source=twitter#x"),
            "https://midnight480.com/posts/test"
        );
        assert_eq!(remove_query_params("not a url"), "not a url");
        assert_eq!(remove_query_params("mailto:a@b.c"), "mailto:a@b.c");
    }

    #[test]
    fn normalize_path_is_idempotent() {
        let samples = ["", "/", "//", "a//b/", "/posts/test/", "///x///", "no-slash", "a/"];
        for p in samples {
            let once = normalize_path(p);
            assert_eq!(normalize_path(&once), once, "input {p:?}");
        }
        assert_eq!(normalize_path("/posts//test/"), "/posts/test");
        assert_eq!(normalize_path(""), "/");
    }

    #[test]
    fn validate_requires_https_and_real_host() {
        assert!(validate_canonical_url("https://midnight480.com/"));
        assert!(!validate_canonical_url("http://midnight480.com/"));
        assert!(!validate_canonical_url("https://astro-notion-blog-cq9.pages.dev/"));
        assert!(!validate_canonical_url("not a url"));
    }

    #[test]
    fn debug_info_flags_preview_origin() {
        let config = defaults();
        let canonical = generate_canonical_url("/posts/test", &config);
        let info = generate_debug_info(
            "https://astro-notion-blog-cq9.pages.dev/posts/test",
            &canonical,
            &config,
        );

        assert!(info.is_valid);
        assert_eq!(info.is_problematic, Some(true));

        let broken = generate_debug_info("::", &canonical, &config);
        assert_eq!(broken.is_problematic, None);
    }
}
