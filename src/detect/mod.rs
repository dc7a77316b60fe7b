//! Page classification
//!
//! Pure functions from fetched HTML (and headers) to structured facts:
//! - Site generator
//! - Comment system
//! - Theme
//! - Article count
//! - Display name
//! - Advertised feed
//!
//! No classifier fails. A missing signature is reported as an explicit
//! sentinel (`unknown`, `none`) or `None`.

mod articles;
mod comments;
mod feed;
mod generator;
mod name;
mod theme;

pub use articles::*;
pub use comments::*;
pub use feed::*;
pub use generator::*;
pub use name::*;
pub use theme::*;

use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;
use tracing::debug;

static SCRIPT_OR_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script[^>]*>.*?</script>|<style[^>]*>.*?</style>|<!--.*?-->")
        .expect("script pattern is valid")
});

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"));

/// Everything the classifiers learned from one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageFacts {
    pub name: String,
    pub generator: Generator,
    pub theme: Option<String>,
    pub comment_system: CommentSystem,
    pub article_count: Option<u32>,
    pub feed_url: Option<String>,
}

/// Text a reader would see: scripts, styles, comments and tags removed
pub fn visible_text(html: &str) -> String {
    let cleaned = SCRIPT_OR_STYLE.replace_all(html, " ");
    let text = TAG.replace_all(&cleaned, " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Run every classifier over a homepage
pub fn classify_page(html: &str, url: &str, headers: &[(String, String)]) -> PageFacts {
    let document = Html::parse_document(html);
    let text = visible_text(html);

    let facts = PageFacts {
        name: display_name(&document, url),
        generator: detect_generator(&document, html, headers),
        theme: detect_theme(html),
        comment_system: detect_comment_system(html),
        article_count: count_articles(&document, &text),
        feed_url: discover_feed(&document, url),
    };

    debug!(
        "{}: generator={} comments={} theme={:?} articles={:?}",
        url, facts.generator, facts.comment_system.kind, facts.theme, facts.article_count
    );
    facts
}

/// Article count for an archive page, if it yields one
pub fn archive_article_count(html: &str) -> Option<u32> {
    let document = Html::parse_document(html);
    count_articles(&document, &visible_text(html))
}
