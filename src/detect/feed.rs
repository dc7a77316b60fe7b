//! Feed discovery
//!
//! The advertised feed (`<link rel="alternate">`) is read from the page.
//! Generator-specific conventional paths are offered for probing when a
//! page advertises nothing.

use super::Generator;
use scraper::{Html, Selector};
use url::Url;

const DEFAULT_FEED_PATHS: &[&str] = &["/feed.xml", "/rss.xml", "/atom.xml", "/index.xml", "/feed/", "/rss/"];

/// Conventional feed paths for a generator, most likely first
pub fn feed_candidates(generator: Generator) -> &'static [&'static str] {
    match generator {
        Generator::Hexo => &["/atom.xml", "/rss.xml", "/rss2.xml", "/feed.xml"],
        Generator::Hugo => &["/index.xml", "/feed.xml", "/rss.xml"],
        Generator::Wordpress => &["/feed/", "/rss/", "/feed/rss2/", "/feed/atom/"],
        Generator::Typecho => &["/feed/", "/feed/atom/"],
        Generator::Jekyll => &["/feed.xml", "/atom.xml", "/rss.xml"],
        Generator::Ghost => &["/rss/", "/feed/"],
        Generator::Astro => &["/rss.xml", "/feed.xml", "/atom.xml"],
        Generator::Nextjs => &["/feed.xml", "/rss.xml", "/api/rss"],
        Generator::Eleventy => &["/feed.xml", "/feed/feed.xml", "/rss.xml"],
        Generator::Vitepress => &["/feed.xml", "/rss.xml"],
        Generator::Gatsby => &["/rss.xml", "/feed.xml"],
        _ => DEFAULT_FEED_PATHS,
    }
}

/// Feed URL advertised by the page, resolved against `page_url`
pub fn discover_feed(document: &Html, page_url: &str) -> Option<String> {
    let base = Url::parse(page_url).ok()?;
    let selector = Selector::parse("link[rel][href]").ok()?;

    document
        .select(&selector)
        .filter(|e| {
            let value = e.value();
            let rel = value.attr("rel").unwrap_or_default().to_lowercase();
            let kind = value.attr("type").unwrap_or_default().to_lowercase();
            rel.split_whitespace().any(|r| r == "alternate")
                && (kind.contains("rss+xml") || kind.contains("atom+xml"))
        })
        .filter_map(|e| e.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .find(|url| matches!(url.scheme(), "http" | "https"))
        .map(|url| url.to_string())
}

/// Whether a response body is an RSS or Atom document
pub fn looks_like_feed(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(1024).collect::<String>().to_lowercase();
    head.contains("<rss") || head.contains("<feed") || (head.starts_with("<?xml") && head.contains("<rdf"))
}
