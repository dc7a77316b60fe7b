//! Per-site probe: fetch, classify, discover friends

use crate::config::BatchConfig;
use crate::crawl::{discover_friends, Fetch, FetchedPage};
use crate::detect::{archive_article_count, classify_page, feed_candidates, looks_like_feed, Generator};
use crate::error::FetchError;
use crate::store::NodeRecord;
use tracing::{debug, warn};
use url::Url;

/// Self-contained result of probing one frontier entry
#[derive(Debug, Clone)]
pub struct SiteReport {
    /// Frontier key that was probed
    pub key: String,
    pub node: NodeRecord,
    /// Outbound friend-link keys
    pub friends: Vec<String>,
    pub friend_page: Option<String>,
}

impl SiteReport {
    pub fn is_complete(&self) -> bool {
        self.node.is_complete()
    }
}

/// Fetch a homepage. Keys are always `https://`, so a transport failure
/// gets one more try over plain http before giving up.
async fn fetch_homepage(fetcher: &dyn Fetch, key: &str) -> Result<FetchedPage, FetchError> {
    match fetcher.get(key).await {
        Err(e @ FetchError::Transport { .. }) => match key.strip_prefix("https://") {
            Some(rest) => {
                let plain = format!("http://{}", rest);
                debug!("{} unreachable over https, trying {}", key, plain);
                fetcher.get(&plain).await.map_err(|_| e)
            }
            None => Err(e),
        },
        other => other,
    }
}

async fn first_archive_count(fetcher: &dyn Fetch, site: &Url, paths: &[String]) -> Option<u32> {
    for path in paths {
        let Ok(candidate) = site.join(path) else {
            continue;
        };
        let Ok(page) = fetcher.get(candidate.as_str()).await else {
            continue;
        };
        if let Some(count) = archive_article_count(&page.body) {
            debug!("{} lists {} articles", candidate, count);
            return Some(count);
        }
    }
    None
}

async fn probe_feed(fetcher: &dyn Fetch, site: &Url, generator: Generator) -> Option<String> {
    for path in feed_candidates(generator) {
        let Ok(candidate) = site.join(path) else {
            continue;
        };
        if let Ok(page) = fetcher.get(candidate.as_str()).await {
            if looks_like_feed(&page.body) {
                return Some(candidate.to_string());
            }
        }
    }
    None
}

/// Probe one site. Never fails: an unreachable homepage becomes a failed
/// node, and a failing sub-page only loses the fact it would have supplied.
pub async fn probe_site(fetcher: &dyn Fetch, key: &str, config: &BatchConfig) -> SiteReport {
    let page = match fetch_homepage(fetcher, key).await {
        Ok(page) => page,
        Err(e) => {
            warn!("Failed to fetch {}: {}", key, e);
            return SiteReport {
                key: key.to_string(),
                node: NodeRecord::failed(key, e.to_string()),
                friends: Vec::new(),
                friend_page: None,
            };
        }
    };

    let mut facts = classify_page(&page.body, &page.url, &page.headers);
    let site = Url::parse(&page.url).ok();

    if let Some(site) = &site {
        if config.count_archives {
            if let Some(count) = first_archive_count(fetcher, site, &config.archive_paths).await {
                facts.article_count = Some(count);
            }
        }
        if config.probe_feeds && facts.feed_url.is_none() {
            facts.feed_url = probe_feed(fetcher, site, facts.generator).await;
        }
    }

    let discovery = if config.discover_friends {
        discover_friends(fetcher, &page.body, &page.url, &config.friend_paths).await
    } else {
        Default::default()
    };

    SiteReport {
        key: key.to_string(),
        node: NodeRecord::complete(key, facts),
        friends: discovery.links,
        friend_page: discovery.page_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::CommentKind;
    use crate::store::FetchStatus;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct StubFetcher {
        pages: HashMap<String, String>,
        offline: Vec<String>,
    }

    impl StubFetcher {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(u, b)| (u.to_string(), b.to_string()))
                    .collect(),
                offline: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl Fetch for StubFetcher {
        async fn get(&self, url: &str) -> Result<FetchedPage, FetchError> {
            if self.offline.iter().any(|u| u == url) {
                return Err(FetchError::Transport {
                    url: url.to_string(),
                    message: "connection refused".to_string(),
                });
            }
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

    const HOME: &str = r#"<html><head><title>Kay | Notes</title>
        <meta name="generator" content="Hugo 0.120"></head>
        <body><a href="/links/">友情链接</a><div class="giscus"></div></body></html>"#;

    const LINKS: &str = r#"<html><body><h1>友链</h1>
        <ul class="friend-list">
          <li><a href="https://peer.example/">Peer</a></li>
          <li><a href="https://twitter.com/kay">Twitter</a></li>
        </ul></body></html>"#;

    fn quiet_config() -> BatchConfig {
        BatchConfig {
            count_archives: false,
            ..BatchConfig::default()
        }
    }

    #[tokio::test]
    async fn test_probe_classifies_and_finds_friends() {
        let fetcher = StubFetcher::new(&[
            ("https://kay.example", HOME),
            ("https://kay.example/links/", LINKS),
        ]);

        let report = probe_site(&fetcher, "https://kay.example", &quiet_config()).await;

        assert!(report.is_complete());
        assert_eq!(report.node.name.as_deref(), Some("Kay"));
        assert_eq!(report.node.generator, Generator::Hugo);
        assert_eq!(report.node.comment_system.kind, CommentKind::Giscus);
        assert_eq!(report.friend_page.as_deref(), Some("https://kay.example/links/"));
        assert_eq!(report.friends, vec!["https://peer.example".to_string()]);
    }

    #[tokio::test]
    async fn test_archive_count_replaces_homepage_count() {
        let archive = (1..=7)
            .map(|i| format!(r#"<a href="/posts/entry-{}/">{}</a>"#, i, i))
            .collect::<String>();
        let fetcher = StubFetcher::new(&[
            ("https://kay.example", HOME),
            ("https://kay.example/archive", archive.as_str()),
        ]);
        let config = BatchConfig {
            discover_friends: false,
            ..BatchConfig::default()
        };

        let report = probe_site(&fetcher, "https://kay.example", &config).await;
        assert_eq!(report.node.article_count, Some(7));
    }

    #[tokio::test]
    async fn test_feed_probe_follows_generator() {
        let fetcher = StubFetcher::new(&[
            ("https://kay.example", HOME),
            ("https://kay.example/index.xml", "<?xml version=\"1.0\"?><rss version=\"2.0\"></rss>"),
        ]);
        let config = BatchConfig {
            probe_feeds: true,
            discover_friends: false,
            ..quiet_config()
        };

        let report = probe_site(&fetcher, "https://kay.example", &config).await;
        assert_eq!(report.node.feed_url.as_deref(), Some("https://kay.example/index.xml"));
    }

    #[tokio::test]
    async fn test_http_status_failure_becomes_failed_node() {
        let fetcher = StubFetcher::new(&[]);

        let report = probe_site(&fetcher, "https://gone.example", &quiet_config()).await;
        assert_eq!(report.node.status, FetchStatus::Failed);
        assert!(report.node.error.as_deref().unwrap_or_default().contains("404"));
        assert!(report.friends.is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_falls_back_to_http() {
        let mut fetcher = StubFetcher::new(&[("http://old.example", HOME)]);
        fetcher.offline.push("https://old.example".to_string());
        let config = BatchConfig {
            discover_friends: false,
            ..quiet_config()
        };

        let report = probe_site(&fetcher, "https://old.example", &config).await;
        assert!(report.is_complete());
        assert_eq!(report.node.url, "https://old.example");
    }
}
