//! 笔墨迹 (BlogsCN): no member list, only a random-member endpoint.
//!
//! Membership is sampled by calling the endpoint a fixed number of times
//! and keeping every distinct link it returns.

use super::{member_keys, CircleScraper};
use crate::crawl::{looks_like_blog, Fetch, Pacer};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, info};

pub const BLOGSCN_RANDOM_API: &str = "https://blogscn.fun/blogs/api/RandomBlogInfo";

#[derive(Debug, Deserialize)]
struct RandomBlog {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    data: Option<RandomBlogData>,
}

#[derive(Debug, Deserialize)]
struct RandomBlogData {
    #[serde(default)]
    link: Option<String>,
}

pub struct BlogsCn {
    endpoint: String,
    attempts: usize,
    delay_ms: u64,
}

impl BlogsCn {
    pub fn new(attempts: usize, delay_ms: u64) -> Self {
        Self::with_endpoint(BLOGSCN_RANDOM_API, attempts, delay_ms)
    }

    pub fn with_endpoint(endpoint: &str, attempts: usize, delay_ms: u64) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            attempts,
            delay_ms,
        }
    }

    async fn sample(&self, fetcher: &dyn Fetch) -> Result<Option<String>> {
        let page = fetcher.post(&self.endpoint).await?;
        let reply: RandomBlog = serde_json::from_str(&page.body)?;
        if reply.code != 200 {
            return Ok(None);
        }
        Ok(reply.data.and_then(|d| d.link).filter(|l| !l.trim().is_empty()))
    }
}

#[async_trait]
impl CircleScraper for BlogsCn {
    fn name(&self) -> &str {
        "笔墨迹"
    }

    fn url(&self) -> &str {
        "https://blogscn.fun/"
    }

    async fn scrape(&self, fetcher: &dyn Fetch) -> Result<Vec<String>> {
        let mut pacer = Pacer::from_millis(self.delay_ms);
        let mut links = Vec::new();
        let mut distinct = HashSet::new();
        let mut successes = 0;
        let mut last_error = None;

        for _ in 0..self.attempts {
            pacer.wait().await;
            match self.sample(fetcher).await {
                Ok(Some(link)) => {
                    successes += 1;
                    if !looks_like_blog(&link) {
                        debug!("Skipping non-blog sample {}", link);
                    } else if distinct.insert(link.clone()) {
                        links.push(link);
                    }
                }
                Ok(None) => successes += 1,
                Err(e) => {
                    debug!("Random sample failed: {}", e);
                    last_error = Some(e);
                }
            }
        }

        if successes == 0 {
            return Err(match last_error {
                Some(e) => Error::Circle(format!(
                    "no successful samples in {} attempts: {}",
                    self.attempts, e
                )),
                None => Error::Circle("sampling budget is zero".to_string()),
            });
        }

        info!(
            "BlogsCN: {} distinct links from {} samples",
            links.len(),
            successes
        );
        Ok(member_keys(&links))
    }
}
