//! 十年之约 (Foreverblog): member index plus one page per member

use super::{is_member_link, member_keys, CircleScraper};
use crate::crawl::{Fetch, Pacer};
use crate::error::{Error, Result};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, info};
use url::Url;

pub const FOREVERBLOG_URL: &str = "https://www.foreverblog.cn/";

static MEMBER_PAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"/blog/([^"'/?#\s]+)\.html"#).expect("member page pattern is valid")
});

/// Absolute URLs in `href` and `data-url`/`data-link`/`data-href` attributes
static EXTERNAL_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:href|data-(?:url|link|href))\s*=\s*["'](https?://[^"']+)["']"#)
        .expect("external link pattern is valid")
});

fn member_page_ids(html: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    MEMBER_PAGE
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

fn external_links<'a>(html: &'a str, circle_url: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    EXTERNAL_LINK
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(move |link| is_member_link(link, circle_url))
}

pub struct Foreverblog {
    site: String,
    max_member_pages: usize,
    delay_ms: u64,
}

impl Foreverblog {
    pub fn new(max_member_pages: usize, delay_ms: u64) -> Self {
        Self::with_site(FOREVERBLOG_URL, max_member_pages, delay_ms)
    }

    pub fn with_site(site: &str, max_member_pages: usize, delay_ms: u64) -> Self {
        Self {
            site: site.to_string(),
            max_member_pages,
            delay_ms,
        }
    }

    fn page_url(&self, path: &str) -> Result<String> {
        let site = Url::parse(&self.site)?;
        Ok(site.join(path)?.to_string())
    }
}

#[async_trait]
impl CircleScraper for Foreverblog {
    fn name(&self) -> &str {
        "十年之约"
    }

    fn url(&self) -> &str {
        FOREVERBLOG_URL
    }

    async fn scrape(&self, fetcher: &dyn Fetch) -> Result<Vec<String>> {
        let index = fetcher.get(&self.page_url("/blogs.html")?).await?;
        let ids = member_page_ids(&index.body);

        // Without member pages, take what the index links to directly
        if ids.is_empty() {
            debug!("Foreverblog index has no member pages, using its links");
            return Ok(member_keys(external_links(&index.body, &self.site)));
        }

        if ids.len() > self.max_member_pages {
            info!(
                "Foreverblog lists {} members, visiting the first {}",
                ids.len(),
                self.max_member_pages
            );
        }

        let mut pacer = Pacer::from_millis(self.delay_ms);
        let mut links = Vec::new();
        let mut failures = 0;
        for id in ids.iter().take(self.max_member_pages) {
            pacer.wait().await;
            let url = self.page_url(&format!("/blog/{}.html", id))?;
            match fetcher.get(&url).await {
                Ok(page) => {
                    if let Some(link) = external_links(&page.body, &self.site).next() {
                        links.push(link.to_string());
                    }
                }
                Err(e) => {
                    debug!("Member page {} unavailable: {}", url, e);
                    failures += 1;
                }
            }
        }

        let visited = ids.len().min(self.max_member_pages);
        if visited > 0 && failures == visited {
            return Err(Error::Circle(format!(
                "all {} member pages failed",
                visited
            )));
        }
        Ok(member_keys(&links))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrawlConfig;
    use crate::crawl::Fetcher;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> Fetcher {
        Fetcher::new(&CrawlConfig {
            max_attempts: 1,
            ..CrawlConfig::default()
        })
        .unwrap()
    }

    fn html(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html; charset=utf-8")
    }

    #[test]
    fn test_member_page_ids_are_unique() {
        let index = r#"<a href="/blog/12.html">A</a><a href='/blog/12.html'>A</a>
                       <a href="https://www.foreverblog.cn/blog/abc.html">B</a>"#;
        assert_eq!(member_page_ids(index), vec!["12", "abc"]);
    }

    #[tokio::test]
    async fn test_follows_member_pages_up_to_cap() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blogs.html"))
            .respond_with(html(
                r#"<a href="/blog/1.html">1</a><a href="/blog/2.html">2</a><a href="/blog/3.html">3</a>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/blog/1.html"))
            .respond_with(html(
                r#"<a href="https://github.com/one">gh</a><a href="https://one.example/">Visit</a>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/blog/2.html"))
            .respond_with(html(r#"<div data-url="https://two.example/home"></div>"#))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/blog/3.html"))
            .respond_with(html(r#"<a href="https://three.example/">3</a>"#))
            .expect(0)
            .mount(&server)
            .await;

        let scraper = Foreverblog::with_site(&format!("{}/", server.uri()), 2, 0);
        let members = scraper.scrape(&fetcher()).await.unwrap();

        assert_eq!(members, vec!["https://one.example", "https://two.example"]);
    }

    #[tokio::test]
    async fn test_index_links_when_no_member_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blogs.html"))
            .respond_with(html(
                r#"<a href="https://a.example/">a</a><a href="https://beian.miit.gov.cn/">icp</a>"#,
            ))
            .mount(&server)
            .await;

        let scraper = Foreverblog::with_site(&format!("{}/", server.uri()), 10, 0);
        let members = scraper.scrape(&fetcher()).await.unwrap();

        assert_eq!(members, vec!["https://a.example"]);
    }
}
