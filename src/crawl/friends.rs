//! Friend-link discovery and extraction
//!
//! A site's friend links live on a dedicated page. [`find_friend_page`]
//! locates it from the homepage navigation, [`extract_links`] pulls the
//! outbound blog links out of its friend-link containers, and
//! [`discover_friends`] ties the two together with a fallback over
//! conventional paths.

use super::fetcher::Fetch;
use super::filter::looks_like_blog;
use super::normalize::{base, host_of};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

/// Keywords that single out a friend-link page or section
const STRONG_KEYWORDS: &[&str] = &[
    "friend",
    "flink",
    "blogroll",
    "友链",
    "友情",
    // percent-encoded 友链 / 友情
    "%e5%8f%8b%e9%93%be",
    "%e5%8f%8b%e6%83%85",
];

/// Weaker keyword, only trusted after the strong ones found nothing
const WEAK_KEYWORD: &str = "link";

/// Ancestors inspected for a keyword-bearing class or id
const ANCESTOR_DEPTH: usize = 3;

/// Result of looking for a site's friend links
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FriendDiscovery {
    /// Page the links were taken from
    pub page_url: Option<String>,
    /// Outbound blog keys, deduplicated in page order
    pub links: Vec<String>,
}

fn has_strong_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    STRONG_KEYWORDS.iter().any(|k| lower.contains(k))
}

fn has_any_keyword(text: &str) -> bool {
    has_strong_keyword(text) || text.to_lowercase().contains(WEAK_KEYWORD)
}

fn is_non_navigable(href: &str) -> bool {
    let lower = href.trim().to_lowercase();
    lower.is_empty()
        || lower.starts_with('#')
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
}

fn class_and_id(elem: &ElementRef) -> String {
    let value = elem.value();
    format!(
        "{} {}",
        value.attr("class").unwrap_or_default(),
        value.attr("id").unwrap_or_default()
    )
}

/// Whether a page body talks about friend links at all
pub fn page_mentions_friends(body: &str) -> bool {
    has_strong_keyword(body)
}

/// Locate a same-site friend-links page from a homepage.
///
/// Anchors whose href, text, or nearby container class/id carries a strong
/// keyword win over anchors that only mention "link".
pub fn find_friend_page(html: &str, base_url: &str) -> Option<String> {
    let base = Url::parse(base_url).ok()?;
    let site_host = host_of(base_url)?;
    let home = base.join("/").ok()?;

    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").ok()?;

    let mut weak_match = None;
    for elem in document.select(&selector) {
        let Some(href) = elem.value().attr("href") else {
            continue;
        };
        if is_non_navigable(href) {
            continue;
        }
        let Ok(resolved) = base.join(href.trim()) else {
            continue;
        };
        if host_of(resolved.as_str()).as_deref() != Some(site_host.as_str()) {
            continue;
        }
        if resolved.path() == home.path() {
            continue;
        }

        let path = resolved.path();
        let text: String = elem.text().collect();
        let context: String = std::iter::once(elem)
            .chain(elem.ancestors().filter_map(ElementRef::wrap))
            .take(ANCESTOR_DEPTH)
            .map(|e| class_and_id(&e))
            .collect::<Vec<_>>()
            .join(" ");

        if has_strong_keyword(path) || has_strong_keyword(&text) || has_strong_keyword(&context) {
            return Some(resolved.to_string());
        }
        if weak_match.is_none() && path.to_lowercase().contains(WEAK_KEYWORD) {
            weak_match = Some(resolved.to_string());
        }
    }

    weak_match
}

/// Extract outbound blog keys from the friend-link containers of a page.
///
/// Only anchors inside a `div`, `section`, `ul` or `ol` whose class or id
/// carries a keyword are considered; a page without such a container yields
/// nothing. Self-links and non-blog links are dropped.
pub fn extract_links(html: &str, page_url: &str) -> Vec<String> {
    let Ok(page) = Url::parse(page_url) else {
        return Vec::new();
    };
    let source_host = host_of(page_url);

    let document = Html::parse_document(html);
    let (Ok(containers), Ok(anchors)) = (
        Selector::parse("div, section, ul, ol"),
        Selector::parse("a[href]"),
    ) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for container in document.select(&containers) {
        if !has_any_keyword(&class_and_id(&container)) {
            continue;
        }

        for elem in container.select(&anchors) {
            let Some(href) = elem.value().attr("href") else {
                continue;
            };
            if is_non_navigable(href) {
                continue;
            }
            let Ok(resolved) = page.join(href.trim()) else {
                continue;
            };
            if !matches!(resolved.scheme(), "http" | "https") {
                continue;
            }

            let target_host = host_of(resolved.as_str());
            if target_host.is_none() || target_host == source_host {
                continue;
            }
            if !looks_like_blog(resolved.as_str()) {
                continue;
            }

            let key = base(resolved.as_str());
            if !key.is_empty() && seen.insert(key.clone()) {
                links.push(key);
            }
        }
    }

    links
}

/// Find and extract a site's friend links.
///
/// Uses the page linked from the homepage when there is one; otherwise
/// probes `friend_paths` in order and takes the first page that mentions
/// friends and yields links. Fetch failures only end the current probe.
pub async fn discover_friends(
    fetcher: &dyn Fetch,
    homepage_html: &str,
    site_url: &str,
    friend_paths: &[String],
) -> FriendDiscovery {
    if let Some(page_url) = find_friend_page(homepage_html, site_url) {
        debug!("Friend page linked from {}: {}", site_url, page_url);
        return match fetcher.get(&page_url).await {
            Ok(page) => FriendDiscovery {
                links: extract_links(&page.body, &page.url),
                page_url: Some(page_url),
            },
            Err(e) => {
                debug!("Friend page unavailable: {}", e);
                FriendDiscovery::default()
            }
        };
    }

    let Ok(site) = Url::parse(site_url) else {
        return FriendDiscovery::default();
    };

    for path in friend_paths {
        let Ok(candidate) = site.join(path) else {
            continue;
        };
        let page = match fetcher.get(candidate.as_str()).await {
            Ok(page) => page,
            Err(e) => {
                debug!("No friend page at {}: {}", candidate, e);
                continue;
            }
        };
        if !page_mentions_friends(&page.body) {
            continue;
        }

        let links = extract_links(&page.body, &page.url);
        if !links.is_empty() {
            debug!("Found {} friend links at {}", links.len(), candidate);
            return FriendDiscovery {
                page_url: Some(candidate.to_string()),
                links,
            };
        }
    }

    FriendDiscovery::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::fetcher::FetchedPage;
    use crate::error::FetchError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MapFetcher {
        pages: HashMap<String, String>,
        requested: Mutex<Vec<String>>,
    }

    impl MapFetcher {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(u, b)| (u.to_string(), b.to_string()))
                    .collect(),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Fetch for MapFetcher {
        async fn get(&self, url: &str) -> Result<FetchedPage, FetchError> {
            self.requested.lock().unwrap().push(url.to_string());
            match self.pages.get(url) {
                Some(body) => Ok(FetchedPage {
                    url: url.to_string(),
                    status: 200,
                    headers: Vec::new(),
                    body: body.clone(),
                }),
                None => Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }

        async fn post(&self, url: &str) -> Result<FetchedPage, FetchError> {
            self.get(url).await
        }
    }

    #[test]
    fn test_extract_friend_container() {
        let html = r#"<div class="friend-links"><a href="https://other.example/">Other</a></div>"#;
        assert_eq!(
            extract_links(html, "https://mine.example"),
            vec!["https://other.example".to_string()]
        );
    }

    #[test]
    fn test_extract_ignores_links_outside_containers() {
        let html = r#"
            <nav><a href="https://outside.example/">Nav</a></nav>
            <footer><a href="https://footer.example/">Footer</a></footer>
        "#;
        assert!(extract_links(html, "https://mine.example/links").is_empty());
    }

    #[test]
    fn test_extract_filters_and_dedupes() {
        let html = r##"
            <ul id="blogroll">
              <li><a href="https://a.example/">A</a></li>
              <li><a href="https://www.a.example/about">A again</a></li>
              <li><a href="/about">Self relative</a></li>
              <li><a href="https://www.mine.example/">Self absolute</a></li>
              <li><a href="https://github.com/someone">GitHub</a></li>
              <li><a href="#top">Top</a></li>
              <li><a href="mailto:me@b.example">Mail</a></li>
              <li><a href="javascript:void(0)">JS</a></li>
              <li><a href="//b.example/">B</a></li>
            </ul>
        "##;
        assert_eq!(
            extract_links(html, "https://mine.example/links/"),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn test_extract_localized_container() {
        let html = r#"<section id="友情链接"><a href="https://c.example">C</a></section>"#;
        assert_eq!(
            extract_links(html, "https://mine.example/"),
            vec!["https://c.example".to_string()]
        );
    }

    #[test]
    fn test_find_friend_page_by_href_and_text() {
        let by_href = r#"<a href="/">Home</a><a href="/friends/">朋友们</a>"#;
        assert_eq!(
            find_friend_page(by_href, "https://mine.example").as_deref(),
            Some("https://mine.example/friends/")
        );

        let by_text = r#"<a href="/p/42">友链</a>"#;
        assert_eq!(
            find_friend_page(by_text, "https://mine.example").as_deref(),
            Some("https://mine.example/p/42")
        );

        let by_container = r#"<li class="menu-friends"><span><a href="/p/7">Pals</a></span></li>"#;
        assert_eq!(
            find_friend_page(by_container, "https://mine.example").as_deref(),
            Some("https://mine.example/p/7")
        );
    }

    #[test]
    fn test_find_friend_page_prefers_strong_keywords() {
        let html = r#"<a href="/links">Links</a><a href="/blogroll">Blogroll</a>"#;
        assert_eq!(
            find_friend_page(html, "https://mine.example").as_deref(),
            Some("https://mine.example/blogroll")
        );
    }

    #[test]
    fn test_find_friend_page_ignores_external_and_fragments() {
        let html = r##"
            <a href="https://other.example/friends">Their friends</a>
            <a href="#friends">Jump</a>
            <a href="javascript:friends()">JS</a>
        "##;
        assert_eq!(find_friend_page(html, "https://mine.example"), None);
    }

    #[tokio::test]
    async fn test_discover_follows_linked_page() {
        let fetcher = MapFetcher::new(&[(
            "https://mine.example/friends",
            r#"<div class="flink"><a href="https://pal.example/">Pal</a></div>"#,
        )]);
        let home = r#"<a href="/friends">Friends</a>"#;

        let found = discover_friends(&fetcher, home, "https://mine.example", &[]).await;
        assert_eq!(found.page_url.as_deref(), Some("https://mine.example/friends"));
        assert_eq!(found.links, vec!["https://pal.example".to_string()]);
    }

    #[tokio::test]
    async fn test_discover_probes_conventional_paths() {
        let fetcher = MapFetcher::new(&[
            ("https://mine.example/links", "<p>nothing here</p>"),
            (
                "https://mine.example/blogroll",
                r#"<h1>Blogroll</h1><ul class="blogroll"><li><a href="https://pal.example">Pal</a></li></ul>"#,
            ),
        ]);
        let paths = vec![
            "/friends".to_string(),
            "/links".to_string(),
            "/blogroll".to_string(),
            "/never-reached".to_string(),
        ];

        let found = discover_friends(&fetcher, "<p>home</p>", "https://mine.example", &paths).await;
        assert_eq!(found.page_url.as_deref(), Some("https://mine.example/blogroll"));
        assert_eq!(found.links, vec!["https://pal.example".to_string()]);
        assert_eq!(fetcher.requested.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_discover_without_friends_is_empty() {
        let fetcher = MapFetcher::new(&[]);
        let found = discover_friends(
            &fetcher,
            "<p>home</p>",
            "https://mine.example",
            &["/links".to_string()],
        )
        .await;
        assert_eq!(found, FriendDiscovery::default());
    }
}
