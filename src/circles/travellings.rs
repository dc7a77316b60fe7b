//! 开往 (Travellings): full member list from a JSON API

use super::{member_keys, CircleScraper};
use crate::crawl::Fetch;
use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

pub const TRAVELLINGS_API: &str = "https://api.travellings.cn";

/// Member states that still point at a live blog
const LIVE_STATUSES: &[&str] = &["RUN", "WAIT", ""];

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MemberList {
    Wrapped { data: Vec<Member> },
    Bare(Vec<Member>),
}

#[derive(Debug, Deserialize)]
struct Member {
    #[serde(default)]
    url: String,
    #[serde(default)]
    status: Option<String>,
}

impl Member {
    fn is_live(&self) -> bool {
        LIVE_STATUSES.contains(&self.status.as_deref().unwrap_or_default())
    }
}

pub struct Travellings {
    api_base: String,
}

impl Travellings {
    pub fn new() -> Self {
        Self::with_api_base(TRAVELLINGS_API)
    }

    pub fn with_api_base(api_base: &str) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for Travellings {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CircleScraper for Travellings {
    fn name(&self) -> &str {
        "开往"
    }

    fn url(&self) -> &str {
        "https://www.travellings.cn/"
    }

    async fn scrape(&self, fetcher: &dyn Fetch) -> Result<Vec<String>> {
        let page = fetcher.get(&format!("{}/all", self.api_base)).await?;
        let members = match serde_json::from_str::<MemberList>(&page.body)? {
            MemberList::Wrapped { data } => data,
            MemberList::Bare(data) => data,
        };
        debug!("Travellings lists {} entries", members.len());

        Ok(member_keys(
            members
                .iter()
                .filter(|m| !m.url.is_empty() && m.is_live())
                .map(|m| m.url.as_str()),
        ))
    }
}
