//! robots.txt rendering.
//!
//! Two variants are produced from one [`RobotsConfig`]: the normal policy for
//! the canonical domain and a restrictive policy for preview hostnames that
//! must stay out of search indexes. Rendering is pure string building; cache
//! headers are the route's concern.
use serde::Serialize;

use crate::{config::models::RobotsConfig, core::domain::is_platform_preview_domain};

/// Served when rendering the configured policy fails.
pub const FALLBACK_ROBOTS_TXT: &str =
    "User-agent: *\nAllow: /\n\nSitemap: https://midnight480.com/sitemap.xml";

/// Cache lifetime, in seconds, of [`FALLBACK_ROBOTS_TXT`].
pub const FALLBACK_MAX_AGE: u64 = 3_600;

/// Marker text the restrictive variant uses to point crawlers at the canonical domain.
pub const CANONICAL_POINTER: &str = "This site has moved to the canonical domain";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotsPolicy {
    Normal,
    Restrictive,
}

impl RobotsPolicy {
    /// Preview hostnames get the restrictive policy, everything else the normal one.
    pub fn for_hostname(hostname: &str) -> Self {
        if is_platform_preview_domain(hostname) {
            RobotsPolicy::Restrictive
        } else {
            RobotsPolicy::Normal
        }
    }

    pub fn render(self, config: &RobotsConfig) -> String {
        match self {
            RobotsPolicy::Normal => generate_normal_robots_txt(config),
            RobotsPolicy::Restrictive => generate_restrictive_robots_txt(config),
        }
    }

    pub fn cache_max_age(self, config: &RobotsConfig) -> u64 {
        match self {
            RobotsPolicy::Normal => config.cache_max_age.normal,
            RobotsPolicy::Restrictive => config.cache_max_age.restrictive,
        }
    }
}

fn push_block(out: &mut String, bot: &str, directive: &str) {
    out.push_str(&format!("User-agent: {bot}\n{directive}: /\n\n"));
}

fn sitemap_line(custom_domain: &str) -> String {
    format!("Sitemap: https://{custom_domain}/sitemap.xml")
}

pub fn generate_normal_robots_txt(config: &RobotsConfig) -> String {
    let mut robots = String::from("User-agent: *\nAllow: /\n\n# SEO-friendly crawling\n");

    for bot in &config.allowed_bots {
        push_block(&mut robots, bot, "Allow");
    }

    robots.push_str("# AI Bot restrictions\n");
    for bot in &config.disallowed_bots {
        push_block(&mut robots, bot, "Disallow");
    }

    robots.push_str(&format!(
        "# Crawl-delay for heavy crawlers\nUser-agent: *\nCrawl-delay: {}\n\n# Sitemap location\n",
        config.crawl_delay
    ));
    robots.push_str(&sitemap_line(&config.custom_domain));
    robots
}

pub fn generate_restrictive_robots_txt(config: &RobotsConfig) -> String {
    let mut robots = format!(
        "User-agent: *\nDisallow: /\n\n# {CANONICAL_POINTER}\n# Please visit: https://{}\n\n# AI Bot restrictions (extra strict)\n",
        config.custom_domain
    );

    for bot in &config.disallowed_bots {
        push_block(&mut robots, bot, "Disallow");
    }

    robots.push_str("# Canonical sitemap location\n");
    robots.push_str(&sitemap_line(&config.custom_domain));
    robots
}
