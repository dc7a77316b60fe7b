//! Circle scrapers
//!
//! A circle is a third-party directory of member blogs. Each directory gets
//! an adapter behind [`CircleScraper`]; the adapters differ in strategy
//! (JSON API, random-sample API, member pages, plain link listing) but all
//! return member homepage keys. [`run_circles`] runs them one after another
//! and isolates their failures.

mod blogscn;
mod foreverblog;
mod link_page;
mod travellings;

pub use blogscn::*;
pub use foreverblog::*;
pub use link_page::*;
pub use travellings::*;

use crate::config::CirclesConfig;
use crate::crawl::{base, host_of, looks_like_blog, Fetch};
use crate::error::Result;
use crate::frontier::Frontier;
use crate::store::{CircleRecord, EdgeRecord, EdgeType, Store};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

/// Adapter for one blog directory
#[async_trait]
pub trait CircleScraper: Send + Sync {
    /// Display name of the circle
    fn name(&self) -> &str;

    /// Circle homepage; target of every membership edge
    fn url(&self) -> &str;

    /// Enumerate member homepage keys
    async fn scrape(&self, fetcher: &dyn Fetch) -> Result<Vec<String>>;
}

/// Build the adapters enabled in `config`
pub fn configured_scrapers(config: &CirclesConfig) -> Vec<Box<dyn CircleScraper>> {
    let mut scrapers: Vec<Box<dyn CircleScraper>> = Vec::new();
    if config.travellings {
        scrapers.push(Box::new(Travellings::new()));
    }
    if config.blogscn {
        scrapers.push(Box::new(BlogsCn::new(
            config.random_attempts,
            config.request_delay_ms,
        )));
    }
    if config.foreverblog {
        scrapers.push(Box::new(Foreverblog::new(
            config.max_member_pages,
            config.request_delay_ms,
        )));
    }
    for circle in &config.link_pages {
        scrapers.push(Box::new(LinkPageScraper::from_config(circle)));
    }
    scrapers
}

/// Homepage keys for `urls`, in first-seen order
pub(crate) fn member_keys<I, S>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    urls.into_iter()
        .map(|u| base(u.as_ref()))
        .filter(|k| !k.is_empty() && seen.insert(k.clone()))
        .collect()
}

/// Whether `link` found on a circle's pages points at a member blog rather
/// than back into the circle or at infrastructure
pub(crate) fn is_member_link(link: &str, circle_url: &str) -> bool {
    let (Some(host), Some(circle_host)) = (host_of(link), host_of(circle_url)) else {
        return false;
    };
    host != circle_host
        && !host.ends_with(&format!(".{}", circle_host))
        && looks_like_blog(link)
}

/// Result of one adapter
#[derive(Debug, Clone, Serialize)]
pub struct CircleOutcome {
    pub name: String,
    pub url: String,
    pub members: usize,
    pub enqueued: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Totals over every adapter run
#[derive(Debug, Clone, Default, Serialize)]
pub struct CircleRunReport {
    pub circles: Vec<CircleOutcome>,
    pub members: usize,
    pub edges_added: usize,
    pub enqueued: usize,
    pub failed: usize,
}

/// Run every scraper, saving a snapshot, membership edges and queue
/// entries for each circle that yields members. A scraper that fails or
/// finds nothing is recorded and skipped.
pub async fn run_circles(
    store: &Store,
    frontier: &mut Frontier,
    fetcher: &dyn Fetch,
    scrapers: &[Box<dyn CircleScraper>],
) -> Result<CircleRunReport> {
    let seen = store.seen()?;
    let mut report = CircleRunReport::default();

    for scraper in scrapers {
        info!("Scraping circle {} ({})", scraper.name(), scraper.url());

        let members = match scraper.scrape(fetcher).await {
            Ok(members) if !members.is_empty() => members,
            Ok(_) => {
                warn!("{}: no members found", scraper.name());
                report.failed += 1;
                report.circles.push(CircleOutcome {
                    name: scraper.name().to_string(),
                    url: scraper.url().to_string(),
                    members: 0,
                    enqueued: 0,
                    error: Some("no members found".to_string()),
                });
                continue;
            }
            Err(e) => {
                warn!("{}: {}", scraper.name(), e);
                report.failed += 1;
                report.circles.push(CircleOutcome {
                    name: scraper.name().to_string(),
                    url: scraper.url().to_string(),
                    members: 0,
                    enqueued: 0,
                    error: Some(e.to_string()),
                });
                continue;
            }
        };

        let record = CircleRecord::new(scraper.name(), scraper.url(), members);
        store.append_circle(&record)?;

        let edges: Vec<EdgeRecord> = record
            .members
            .iter()
            .map(|member| EdgeRecord::new(member, &record.url, EdgeType::CircleMember))
            .collect();
        let edges_added = store.append_edges(&edges)?;
        let enqueued = frontier.enqueue_many(&record.members, &seen)?.len();

        info!(
            "{}: {} members, {} new in queue",
            record.name, record.member_count, enqueued
        );

        report.members += record.member_count;
        report.edges_added += edges_added;
        report.enqueued += enqueued;
        report.circles.push(CircleOutcome {
            name: record.name,
            url: record.url,
            members: record.member_count,
            enqueued,
            error: None,
        });
    }

    Ok(report)
}
