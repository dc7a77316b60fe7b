//! Circles whose membership is a plain page of outbound links

use super::{is_member_link, member_keys, CircleScraper};
use crate::config::LinkPageCircle;
use crate::crawl::Fetch;
use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

/// Member homepages embedded as data, e.g. `"homepage": "https://..."`
static EMBEDDED_HOMEPAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:homepage|blog_url|data-url)["']?\s*[:=]\s*["'](https?://[^"']+)["']"#)
        .expect("embedded homepage pattern is valid")
});

/// Every absolute link on a member page: anchors first, then embedded data
fn page_links(html: &str, page_url: &str) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(base) = Url::parse(page_url) {
        let document = Html::parse_document(html);
        if let Ok(selector) = Selector::parse("a[href]") {
            for elem in document.select(&selector) {
                if let Some(href) = elem.value().attr("href") {
                    if let Ok(resolved) = base.join(href.trim()) {
                        links.push(resolved.to_string());
                    }
                }
            }
        }
    }

    links.extend(
        EMBEDDED_HOMEPAGE
            .captures_iter(html)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_string()),
    );
    links
}

pub struct LinkPageScraper {
    name: String,
    url: String,
    page_url: String,
}

impl LinkPageScraper {
    pub fn new(name: &str, url: &str, page_url: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            page_url: page_url.unwrap_or(url).to_string(),
        }
    }

    pub fn from_config(circle: &LinkPageCircle) -> Self {
        Self::new(&circle.name, &circle.url, circle.page_url.as_deref())
    }
}

#[async_trait]
impl CircleScraper for LinkPageScraper {
    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> &str {
        &self.url
    }

    async fn scrape(&self, fetcher: &dyn Fetch) -> Result<Vec<String>> {
        let page = fetcher.get(&self.page_url).await?;
        let links = page_links(&page.body, &page.url);
        Ok(member_keys(
            links.iter().filter(|link| is_member_link(link, &self.url)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrawlConfig;
    use crate::crawl::Fetcher;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_page_links_reads_anchors_and_embedded_data() {
        let html = r#"
            <a href="/join">Join</a>
            <a href="https://m1.example/">M1</a>
            <script>var members = [{"homepage": "https://m2.example/blog"}];</script>
        "#;
        assert_eq!(
            page_links(html, "https://club.example/members.html"),
            vec![
                "https://club.example/join",
                "https://m1.example/",
                "https://m2.example/blog",
            ]
        );
    }

    #[tokio::test]
    async fn test_scrape_keeps_member_homepages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/members.html"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"<nav><a href="/">Home</a><a href="https://twitter.com/club">Twitter</a></nav>
                   <ul>
                     <li><a href="https://m1.example/">M1</a></li>
                     <li><a href="https://www.m1.example/about">M1 about</a></li>
                     <li><a href="https://m2.example/">M2</a></li>
                   </ul>"#
                    .as_bytes()
                    .to_vec(),
                "text/html",
            ))
            .mount(&server)
            .await;

        let circle = LinkPageCircle {
            name: "Club".to_string(),
            url: format!("{}/", server.uri()),
            page_url: Some(format!("{}/members.html", server.uri())),
        };
        let fetcher = Fetcher::new(&CrawlConfig::default()).unwrap();
        let members = LinkPageScraper::from_config(&circle)
            .scrape(&fetcher)
            .await
            .unwrap();

        assert_eq!(members, vec!["https://m1.example", "https://m2.example"]);
    }
}
