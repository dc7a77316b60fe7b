//! Seed command implementation

use crate::commands::open_data;
use crate::config::Config;
use crate::crawl::looks_like_blog;
use crate::error::Result;
use regex::Regex;
use serde::Serialize;
use std::path::Path;
use std::sync::LazyLock;
use tracing::info;

static SEED_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s)>\]"']+"#).expect("seed URL pattern is valid")
});

/// Punctuation that ends a sentence rather than a URL
const TRAILING: &[char] = &['.', ',', ';', ':', '!', '?', '，', '。', '；', '：', '、'];

#[derive(Debug, Clone, Serialize)]
pub struct SeedReport {
    pub source: String,
    /// Blog-like URLs found in the source
    pub found: usize,
    pub enqueued: usize,
    pub queue_len: usize,
}

/// Pull blog-like URLs out of free text such as a Markdown list
pub fn extract_seed_urls(text: &str) -> Vec<String> {
    SEED_URL
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(TRAILING))
        .filter(|url| looks_like_blog(url))
        .map(str::to_string)
        .collect()
}

/// Queue every blog URL found in `source`
pub fn cmd_seed(config: &Config, source: &Path) -> Result<SeedReport> {
    info!("Seeding from {:?}", source);

    let text = std::fs::read_to_string(source)?;
    let urls = extract_seed_urls(&text);

    let (store, mut frontier) = open_data(config)?;
    let seen = store.seen()?;
    let accepted = frontier.enqueue_many(&urls, &seen)?;

    info!("Queued {} of {} seed URLs", accepted.len(), urls.len());
    Ok(SeedReport {
        source: source.display().to_string(),
        found: urls.len(),
        enqueued: accepted.len(),
        queue_len: frontier.len(),
    })
}

pub fn print_seed_report(report: &SeedReport) {
    println!("\n🌱 Seeded from {}\n", report.source);
    println!("Blog URLs found: {}", report.found);
    println!("Newly queued: {}", report.enqueued);
    println!("Queue length: {}", report.queue_len);
}
