//! Display name extraction

use crate::crawl::host_of;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

/// "Site - tagline", "Site · Home", "Site | Blog"
static SPACED_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+[-–—|·]\s+.*$").expect("suffix pattern is valid")
});

/// "Site|Blog", "Site｜博客", "Site——随笔"
static TIGHT_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*(?:[|｜]|——|–|—)\s*.*$").expect("suffix pattern is valid")
});

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let text: String = document.select(&selector).next()?.text().collect();
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

fn og_site_name(document: &Html) -> Option<String> {
    let selector = Selector::parse("meta[property][content]").ok()?;
    document
        .select(&selector)
        .find(|e| {
            e.value()
                .attr("property")
                .is_some_and(|p| p.eq_ignore_ascii_case("og:site_name"))
        })
        .and_then(|e| e.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

/// Strip a trailing " - tagline" style suffix from a page title
pub fn strip_title_suffix(title: &str) -> String {
    let once = SPACED_SUFFIX.replace(title.trim(), "");
    TIGHT_SUFFIX.replace(once.trim(), "").trim().to_string()
}

/// Human-readable site name: cleaned `<title>`, then `og:site_name`, then host
pub fn display_name(document: &Html, url: &str) -> String {
    first_text(document, "title")
        .map(|t| strip_title_suffix(&t))
        .filter(|t| !t.is_empty())
        .or_else(|| og_site_name(document))
        .or_else(|| host_of(url))
        .unwrap_or_else(|| url.to_string())
}
