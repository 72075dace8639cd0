use std::fmt::Write;

use super::ComprehensiveSeoReport;

fn status(valid: bool) -> &'static str {
    if valid { "PASS" } else { "FAIL" }
}

fn bullets(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "**{heading}:**");
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
    out.push('\n');
}

/// Render `report` as a Markdown document.
pub fn generate_seo_validation_report(report: &ComprehensiveSeoReport) -> String {
    let mut out = String::new();
    let summary = &report.summary;

    let _ = writeln!(out, "# SEO Validation Report\n");
    let _ = writeln!(out, "## Summary\n");
    let _ = writeln!(out, "- Overall score: {:.1}/100", report.overall_score);
    let _ = writeln!(out, "- Valid URLs: {}", summary.valid_urls);
    let _ = writeln!(out, "- Invalid URLs: {}", summary.invalid_urls);
    let _ = writeln!(out, "- Total issues: {}", summary.total_issues);
    let _ = writeln!(out, "- Total recommendations: {}", summary.total_recommendations);
    if !report.skipped_urls.is_empty() {
        let _ = writeln!(out, "- Skipped URLs: {}", report.skipped_urls.join(", "));
    }
    out.push('\n');

    let _ = writeln!(out, "## Canonical URLs\n");
    for result in &report.canonical_results {
        let _ = writeln!(out, "### {} [{}]\n", result.url, status(result.is_valid));
        let _ = writeln!(out, "- Canonical: {}", result.canonical_url);
        let _ = writeln!(out, "- Score: {}/100\n", result.score);
        bullets(&mut out, "Issues", &result.issues);
        bullets(&mut out, "Recommendations", &result.recommendations);
    }

    let _ = writeln!(out, "## robots.txt\n");
    for result in &report.robots_results {
        let _ = writeln!(
            out,
            "### {} [{}] ({:?})\n",
            result.domain,
            status(result.is_valid),
            result.policy
        );
        bullets(&mut out, "Issues", &result.issues);
    }

    let _ = writeln!(out, "## Redirect chains\n");
    for result in &report.redirect_results {
        let _ = writeln!(
            out,
            "### {} [{}]\n",
            result.original_url,
            status(result.is_valid)
        );
        for hop in &result.redirect_chain {
            match &hop.location {
                Some(location) => {
                    let _ = writeln!(out, "- {} {} -> {}", hop.status, hop.url, location);
                }
                None => {
                    let _ = writeln!(out, "- {} {}", hop.status, hop.url);
                }
            }
        }
        out.push('\n');
        bullets(&mut out, "Issues", &result.issues);
    }

    out
}
