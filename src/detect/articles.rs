//! Article count estimation

use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;

static POST_LINK_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)/(post|posts|article|articles|blog|archives?)/[^/?#]",
        r"\d{4}/\d{2}/",
        r"\d{4}-\d{2}-\d{2}",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("post link pattern is valid"))
    .collect()
});

static COUNT_CLAIMS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"共\s*(\d+)\s*篇",
        r"(\d+)\s*篇文章",
        r"(?i)\b(\d+)\s*articles?\b",
        r"(?i)\b(\d+)\s*posts?\b",
        r"总计.*?(\d+).*?篇",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("count claim pattern is valid"))
    .collect()
});

/// Distinct post-like link targets on the page
pub fn count_post_links(document: &Html) -> u32 {
    let Ok(selector) = Selector::parse("a[href]") else {
        return 0;
    };

    let distinct: HashSet<&str> = document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| href.trim().trim_end_matches('/'))
        .filter(|href| POST_LINK_PATTERNS.iter().any(|re| re.is_match(href)))
        .collect();

    distinct.len() as u32
}

/// Largest explicit "N articles" style claim in the visible text
pub fn claimed_count(text: &str) -> Option<u32> {
    COUNT_CLAIMS
        .iter()
        .filter_map(|re| re.captures(text))
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        .max()
}

/// Estimate how many articles a page lists.
///
/// Both strategies run and the larger wins: an explicit claim beats an
/// undercount from a paginated listing, while a full archive listing can
/// exceed a stale claim. Zero means no estimate.
pub fn count_articles(document: &Html, text: &str) -> Option<u32> {
    let count = count_post_links(document).max(claimed_count(text).unwrap_or(0));
    (count > 0).then_some(count)
}
