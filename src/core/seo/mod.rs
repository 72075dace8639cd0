//! Offline SEO auditing.
//!
//! [`SeoValidator`] runs the canonical URL builder, the robots policy
//! generator and the edge redirect decision against sample URLs and scores
//! the results. It is used by the `audit` command and by regression tests;
//! it never touches the network.
mod report;

pub use report::generate_seo_validation_report;
use serde::Serialize;
use url::Url;

use crate::{
    config::models::{CanonicalUrlConfig, RobotsConfig},
    core::{
        canonical::{generate_canonical_url, validate_canonical_url},
        domain::{DomainClassifier, is_platform_preview_domain},
        edge::rebuild_redirect_url,
        robots::{CANONICAL_POINTER, RobotsPolicy},
    },
};

/// Longest redirect chain that still passes validation.
pub const MAX_REDIRECT_HOPS: usize = 3;

/// Simulation stops here; anything longer is a loop.
const HOP_LIMIT: usize = 10;

const ISSUE_PENALTY: u32 = 20;
const RECOMMENDATION_PENALTY: u32 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct SeoValidationResult {
    pub url: String,
    pub canonical_url: String,
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    /// 0..=100
    pub score: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RobotsValidationResult {
    pub domain: String,
    pub policy: RobotsPolicy,
    pub robots_txt: String,
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub allowed_bots: Vec<String>,
    pub disallowed_bots: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectHop {
    pub url: String,
    pub status: u16,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RedirectChainResult {
    pub original_url: String,
    pub final_url: String,
    pub redirect_chain: Vec<RedirectHop>,
    pub is_valid: bool,
    pub issues: Vec<String>,
}

impl RedirectChainResult {
    /// Number of redirect responses in the chain
    pub fn hop_count(&self) -> usize {
        self.redirect_chain
            .iter()
            .filter(|hop| hop.location.is_some())
            .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeoSummary {
    pub total_issues: usize,
    pub total_recommendations: usize,
    pub valid_urls: usize,
    pub invalid_urls: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComprehensiveSeoReport {
    pub canonical_results: Vec<SeoValidationResult>,
    pub robots_results: Vec<RobotsValidationResult>,
    pub redirect_results: Vec<RedirectChainResult>,
    /// Unparseable inputs that were skipped
    pub skipped_urls: Vec<String>,
    pub overall_score: f64,
    pub summary: SeoSummary,
}

fn score(issues: usize, recommendations: usize) -> u32 {
    let penalty = issues as u32 * ISSUE_PENALTY + recommendations as u32 * RECOMMENDATION_PENALTY;
    100u32.saturating_sub(penalty)
}

fn percentage(valid: usize, total: usize) -> f64 {
    valid as f64 / total.max(1) as f64 * 100.0
}

/// Auditor bound to one canonical and one robots configuration.
#[derive(Debug, Clone)]
pub struct SeoValidator {
    canonical: CanonicalUrlConfig,
    robots: RobotsConfig,
    classifier: DomainClassifier,
}

impl Default for SeoValidator {
    fn default() -> Self {
        Self::new(CanonicalUrlConfig::default(), RobotsConfig::default())
    }
}

impl SeoValidator {
    pub fn new(canonical: CanonicalUrlConfig, robots: RobotsConfig) -> Self {
        let classifier = DomainClassifier::from_config(&canonical);
        Self {
            canonical,
            robots,
            classifier,
        }
    }

    /// Check the canonical URL generated for `expected_path`.
    pub fn validate_canonical_url_accuracy(
        &self,
        page_url: &str,
        expected_path: &str,
    ) -> SeoValidationResult {
        if let Err(e) = Url::parse(page_url) {
            return SeoValidationResult {
                url: page_url.to_string(),
                canonical_url: String::new(),
                is_valid: false,
                issues: vec![format!("URL parse error: {e}")],
                recommendations: vec!["Provide an absolute, well-formed URL".to_string()],
                score: 0,
            };
        }

        let mut issues = Vec::new();
        let mut recommendations = Vec::new();
        let canonical_url = generate_canonical_url(expected_path, &self.canonical);

        if !validate_canonical_url(&canonical_url) {
            issues.push("Canonical URL is not valid".to_string());
        }

        let parsed = Url::parse(&canonical_url).ok();
        let canonical_host = parsed
            .as_ref()
            .and_then(|u| u.host_str())
            .unwrap_or_default()
            .to_string();
        let canonical_path = parsed
            .as_ref()
            .map(|u| u.path().to_string())
            .unwrap_or_default();

        if is_platform_preview_domain(&canonical_host) {
            issues.push("Canonical URL uses the platform preview domain".to_string());
            recommendations.push("Use the custom domain in canonical URLs".to_string());
        }

        if !canonical_url.starts_with("https://") {
            issues.push("Canonical URL does not use HTTPS".to_string());
            recommendations.push("Serve canonical URLs over HTTPS".to_string());
        }

        if canonical_path != expected_path {
            issues.push(format!(
                "Path mismatch: {canonical_path} vs {expected_path}"
            ));
        }

        if canonical_path.contains("//") {
            recommendations.push("Path contains duplicate slashes; normalize it".to_string());
        }

        if canonical_path != "/" && canonical_path.ends_with('/') {
            recommendations.push("Use a consistent trailing slash policy".to_string());
        }

        let score = score(issues.len(), recommendations.len());
        SeoValidationResult {
            url: page_url.to_string(),
            canonical_url,
            is_valid: issues.is_empty(),
            issues,
            recommendations,
            score,
        }
    }

    /// Render the robots.txt `domain` would receive and check its directives.
    pub fn validate_robots_txt_generation(&self, domain: &str) -> RobotsValidationResult {
        let policy = RobotsPolicy::for_hostname(domain);
        let robots_txt = policy.render(&self.robots);
        let mut issues = Vec::new();

        if !robots_txt.contains("User-agent:") {
            issues.push("Missing User-agent directive".to_string());
        }
        if !robots_txt.contains("Sitemap:") {
            issues.push("Missing Sitemap directive".to_string());
        }

        match policy {
            RobotsPolicy::Restrictive => {
                if !robots_txt.contains("Disallow: /") {
                    issues.push("Preview domain does not disallow crawling".to_string());
                }
                if !robots_txt.contains(CANONICAL_POINTER) {
                    issues.push("Missing pointer to the canonical domain".to_string());
                }
                let leaked: Vec<&String> = self
                    .robots
                    .allowed_bots
                    .iter()
                    .filter(|bot| !self.robots.disallowed_bots.contains(*bot))
                    .filter(|bot| robots_txt.contains(&format!("User-agent: {bot}\n")))
                    .collect();
                if !leaked.is_empty() {
                    issues.push(format!(
                        "Allowed bots listed on the preview domain: {}",
                        leaked
                            .iter()
                            .map(|b| b.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ));
                }
            }
            RobotsPolicy::Normal => {
                if !robots_txt.contains("Allow: /") {
                    issues.push("Custom domain does not allow crawling".to_string());
                }
                if !robots_txt.contains("Crawl-delay:") {
                    issues.push("Missing Crawl-delay directive".to_string());
                }
            }
        }

        let missing = self
            .robots
            .disallowed_bots
            .iter()
            .filter(|bot| !robots_txt.contains(&format!("User-agent: {bot}")))
            .count();
        if missing > 0 {
            issues.push(format!("{missing} disallowed bot(s) are not restricted"));
        }

        RobotsValidationResult {
            domain: domain.to_string(),
            policy,
            robots_txt,
            is_valid: issues.is_empty(),
            issues,
            allowed_bots: match policy {
                RobotsPolicy::Normal => self.robots.allowed_bots.clone(),
                RobotsPolicy::Restrictive => Vec::new(),
            },
            disallowed_bots: self.robots.disallowed_bots.clone(),
        }
    }

    /// Follow the edge's redirect decision from `original_url` until it settles.
    pub fn validate_redirect_chain(&self, original_url: &str) -> RedirectChainResult {
        let mut current = match Url::parse(original_url) {
            Ok(url) => url,
            Err(e) => {
                return RedirectChainResult {
                    original_url: original_url.to_string(),
                    final_url: String::new(),
                    redirect_chain: Vec::new(),
                    is_valid: false,
                    issues: vec![format!("Redirect chain validation error: {e}")],
                };
            }
        };

        let mut chain = Vec::new();
        let mut issues = Vec::new();

        while chain.len() < HOP_LIMIT {
            let analysis = self
                .classifier
                .analyze(current.host_str().unwrap_or_default());
            if !analysis.should_redirect {
                break;
            }

            match rebuild_redirect_url(&current, self.classifier.custom_domain()) {
                Ok(next) => {
                    chain.push(RedirectHop {
                        url: current.to_string(),
                        status: 301,
                        location: Some(next.to_string()),
                    });
                    current = next;
                }
                Err(e) => {
                    issues.push(format!("Redirect target could not be built: {e}"));
                    break;
                }
            }
        }

        chain.push(RedirectHop {
            url: current.to_string(),
            status: 200,
            location: None,
        });

        let hops = chain.len() - 1;
        if hops > MAX_REDIRECT_HOPS {
            issues.push(format!(
                "Redirect chain too long ({hops} hops, max {MAX_REDIRECT_HOPS})"
            ));
        }

        if hops > 0 && chain[0].status != 301 {
            issues.push("First hop is not a permanent (301) redirect".to_string());
        }

        let final_url = current.to_string();
        if hops > 0 && is_platform_preview_domain(current.host_str().unwrap_or_default()) {
            issues.push("Final URL is still on the platform preview domain".to_string());
        }

        RedirectChainResult {
            original_url: original_url.to_string(),
            final_url,
            redirect_chain: chain,
            is_valid: issues.is_empty(),
            issues,
        }
    }

    /// Run all three validators over `urls` and aggregate an overall score.
    pub fn run_comprehensive_seo_validation<S: AsRef<str>>(
        &self,
        urls: &[S],
    ) -> ComprehensiveSeoReport {
        let mut canonical_results = Vec::new();
        let mut robots_results = Vec::new();
        let mut redirect_results = Vec::new();
        let mut skipped_urls = Vec::new();

        for url in urls.iter().map(AsRef::as_ref) {
            let parsed = match Url::parse(url) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!(url, error = %e, "Skipping unparseable URL");
                    skipped_urls.push(url.to_string());
                    continue;
                }
            };

            canonical_results.push(self.validate_canonical_url_accuracy(url, parsed.path()));
            robots_results
                .push(self.validate_robots_txt_generation(parsed.host_str().unwrap_or_default()));
            redirect_results.push(self.validate_redirect_chain(url));
        }

        let total_issues = canonical_results.iter().map(|r| r.issues.len()).sum::<usize>()
            + robots_results.iter().map(|r| r.issues.len()).sum::<usize>()
            + redirect_results.iter().map(|r| r.issues.len()).sum::<usize>();
        let total_recommendations = canonical_results
            .iter()
            .map(|r| r.recommendations.len())
            .sum();
        let valid_urls = canonical_results.iter().filter(|r| r.is_valid).count();

        let average_canonical = if canonical_results.is_empty() {
            0.0
        } else {
            canonical_results.iter().map(|r| r.score as f64).sum::<f64>()
                / canonical_results.len() as f64
        };
        let robots_score = percentage(
            robots_results.iter().filter(|r| r.is_valid).count(),
            robots_results.len(),
        );
        let redirect_score = percentage(
            redirect_results.iter().filter(|r| r.is_valid).count(),
            redirect_results.len(),
        );
        let overall_score = (average_canonical + robots_score + redirect_score) / 3.0;

        tracing::debug!(
            urls = canonical_results.len(),
            skipped = skipped_urls.len(),
            overall_score,
            "SEO validation finished"
        );

        ComprehensiveSeoReport {
            summary: SeoSummary {
                total_issues,
                total_recommendations,
                valid_urls,
                invalid_urls: canonical_results.len() - valid_urls,
            },
            canonical_results,
            robots_results,
            redirect_results,
            skipped_urls,
            overall_score,
        }
    }
}
