//! Batch orchestrator
//!
//! One batch is `drain -> dispatch -> collect -> requeue`:
//! 1. Drain up to `batch_size` keys from the frontier (leased until the end)
//! 2. Probe every key: in parallel with a bounded pool, or one at a time
//!    with a fixed delay in careful mode
//! 3. Collect the site reports on the calling task; only here are the node,
//!    edge and failure files written
//! 4. Enqueue newly discovered friends and release the lease

mod site;

pub use site::*;

use crate::config::{BatchConfig, BatchMode};
use crate::crawl::{Fetch, Pacer};
use crate::error::Result;
use crate::frontier::Frontier;
use crate::progress::{advance_progress, finish_progress, start_progress_bar};
use crate::store::{EdgeRecord, EdgeType, Store};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Counters for one batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Keys taken from the frontier
    pub drained: usize,
    /// Drained keys that were already in the node store
    pub skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub edges_added: usize,
    /// Newly discovered keys put on the frontier
    pub enqueued: usize,
    pub queue_remaining: usize,
}

/// Why continuous mode stopped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    TargetReached,
    #[default]
    QueueEmpty,
}

/// Totals for a continuous run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContinuousReport {
    pub batches: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub edges_added: usize,
    /// Distinct keys in the node store when the run stopped
    pub nodes: usize,
    pub queue_remaining: usize,
    pub stop: StopReason,
}

/// Owns the frontier and store for the length of a crawl
pub struct Crawl {
    store: Store,
    frontier: Frontier,
    fetcher: Arc<dyn Fetch>,
    config: BatchConfig,
    show_progress: bool,
}

impl Crawl {
    pub fn new(store: Store, frontier: Frontier, fetcher: Arc<dyn Fetch>, config: BatchConfig) -> Self {
        Self {
            store,
            frontier,
            fetcher,
            config,
            show_progress: false,
        }
    }

    /// Show a progress bar while sites are probed
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    /// Drain and process one batch
    pub async fn run_batch(&mut self) -> Result<BatchReport> {
        let mut seen = self.store.seen()?;
        let drained = self.frontier.dequeue_batch(self.config.batch_size.max(1))?;

        let mut report = BatchReport {
            drained: drained.len(),
            ..Default::default()
        };
        if drained.is_empty() {
            info!("Frontier is empty");
            return Ok(report);
        }

        let keys: Vec<String> = drained.into_iter().filter(|k| !seen.is_seen(k)).collect();
        report.skipped = report.drained - keys.len();
        info!(
            "Processing {} sites ({} already crawled, {} left in queue)",
            keys.len(),
            report.skipped,
            self.frontier.len()
        );

        let sites = self.dispatch(keys).await;

        let mut nodes = Vec::with_capacity(sites.len());
        let mut edges = Vec::new();
        let mut discovered = Vec::new();
        for site in sites {
            if site.is_complete() {
                report.succeeded += 1;
            } else {
                report.failed += 1;
                let reason = site.node.error.as_deref().unwrap_or("unknown error");
                self.store.append_failure(&site.key, reason)?;
            }

            seen.insert(site.key.clone());
            edges.extend(
                site.friends
                    .iter()
                    .map(|friend| EdgeRecord::new(&site.key, friend, EdgeType::FriendLink)),
            );
            discovered.extend(site.friends);
            nodes.push(site.node);
        }

        self.store.append_nodes(&nodes)?;
        report.edges_added = self.store.append_edges(&edges)?;
        report.enqueued = self.frontier.enqueue_many(&discovered, &seen)?.len();
        self.frontier.complete_batch()?;
        report.queue_remaining = self.frontier.len();

        info!(
            "Batch done: {} ok, {} failed, {} edges, {} new in queue",
            report.succeeded, report.failed, report.edges_added, report.enqueued
        );
        Ok(report)
    }

    async fn dispatch(&self, keys: Vec<String>) -> Vec<SiteReport> {
        let pb = if self.show_progress {
            start_progress_bar(keys.len(), "Probing sites")
        } else {
            None
        };

        let fetcher: &dyn Fetch = self.fetcher.as_ref();
        let config = &self.config;

        let sites = match config.mode {
            BatchMode::Parallel => {
                let pb = &pb;
                stream::iter(keys)
                    .map(|key| async move {
                        let site = probe_site(fetcher, &key, config).await;
                        advance_progress(pb);
                        site
                    })
                    .buffer_unordered(config.workers.max(1))
                    .collect::<Vec<_>>()
                    .await
            }
            BatchMode::Careful => {
                let mut pacer = Pacer::from_millis(config.careful_delay_ms);
                let mut sites = Vec::with_capacity(keys.len());
                for key in keys {
                    pacer.wait().await;
                    sites.push(probe_site(fetcher, &key, config).await);
                    advance_progress(&pb);
                }
                sites
            }
        };

        finish_progress(pb, "Probed");
        sites
    }

    /// Run batches until the node store holds `target` keys or the
    /// frontier runs dry
    pub async fn run_continuous(&mut self, target: usize) -> Result<ContinuousReport> {
        let mut report = ContinuousReport::default();
        let pause = Duration::from_millis(self.config.batch_pause_ms);

        loop {
            report.nodes = self.store.seen()?.len();
            if report.nodes >= target {
                report.stop = StopReason::TargetReached;
                break;
            }
            if self.frontier.is_empty() {
                report.stop = StopReason::QueueEmpty;
                break;
            }

            let batch = self.run_batch().await?;
            report.batches += 1;
            report.succeeded += batch.succeeded;
            report.failed += batch.failed;
            report.edges_added += batch.edges_added;
            info!(
                "Batch {}: {} nodes of {} target",
                report.batches,
                report.nodes + batch.succeeded + batch.failed,
                target
            );

            if !self.frontier.is_empty() && !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
        }

        report.queue_remaining = self.frontier.len();
        info!(
            "Continuous run stopped ({:?}) after {} batches with {} nodes",
            report.stop, report.batches, report.nodes
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::FetchedPage;
    use crate::error::FetchError;
    use crate::store::{NodeRecord, SeenSet, EDGES_FILE, FAILED_FILE};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    struct StubFetcher {
        pages: HashMap<String, String>,
    }

    impl StubFetcher {
        fn new(pages: &[(&str, &str)]) -> Arc<Self> {
            Arc::new(Self {
                pages: pages
                    .iter()
                    .map(|(u, b)| (u.to_string(), b.to_string()))
                    .collect(),
            })
        }
    }

    #[async_trait]
    impl Fetch for StubFetcher {
        async fn get(&self, url: &str) -> std::result::Result<FetchedPage, FetchError> {
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

        async fn post(&self, url: &str) -> std::result::Result<FetchedPage, FetchError> {
            self.get(url).await
        }
    }

    const PLAIN: &str = "<html><head><title>Plain</title></head><body><p>hello</p></body></html>";

    fn crawl(tmp: &TempDir, fetcher: Arc<StubFetcher>, seeds: &[&str], config: BatchConfig) -> Crawl {
        let store = Store::open(tmp.path()).unwrap();
        let mut frontier = Frontier::open(tmp.path()).unwrap();
        frontier.enqueue_many(seeds, &SeenSet::default()).unwrap();
        Crawl::new(store, frontier, fetcher, config)
    }

    #[tokio::test]
    async fn test_one_batch_over_plain_sites() {
        let tmp = TempDir::new().unwrap();
        let fetcher = StubFetcher::new(&[("https://a.example", PLAIN), ("https://b.example", PLAIN)]);
        let mut crawl = crawl(&tmp, fetcher, &["a.example", "b.example"], BatchConfig::default());

        let report = crawl.run_batch().await.unwrap();

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(report.edges_added, 0);
        assert_eq!(crawl.store().load_nodes().unwrap().len(), 2);
        assert!(crawl.store().load_edges().unwrap().is_empty());
        assert!(crawl.frontier().is_empty());
        assert_eq!(fs::read_to_string(tmp.path().join("queue.txt")).unwrap(), "");
    }

    #[tokio::test]
    async fn test_friends_become_edges_and_queue_entries() {
        let tmp = TempDir::new().unwrap();
        let fetcher = StubFetcher::new(&[
            ("https://a.example", r#"<html><body><a href="/friends/">Friends</a></body></html>"#),
            (
                "https://a.example/friends/",
                r#"<div id="friend-links">
                     <a href="https://c.example/">C</a>
                     <a href="https://b.example/">B</a>
                   </div>"#,
            ),
            ("https://b.example", PLAIN),
        ]);
        let config = BatchConfig {
            mode: BatchMode::Careful,
            careful_delay_ms: 0,
            ..BatchConfig::default()
        };
        let mut crawl = crawl(&tmp, fetcher, &["a.example", "b.example"], config);

        let report = crawl.run_batch().await.unwrap();

        assert_eq!(report.edges_added, 2);
        // b was crawled in this batch, so only c is new
        assert_eq!(report.enqueued, 1);
        assert_eq!(crawl.frontier().entries().collect::<Vec<_>>(), vec!["https://c.example"]);

        let edges = fs::read_to_string(tmp.path().join(EDGES_FILE)).unwrap();
        assert_eq!(
            edges,
            "source,target,type\n\
             https://a.example,https://c.example,friend_link\n\
             https://a.example,https://b.example,friend_link\n"
        );
    }

    #[tokio::test]
    async fn test_failures_are_isolated_and_logged() {
        let tmp = TempDir::new().unwrap();
        let fetcher = StubFetcher::new(&[("https://up.example", PLAIN)]);
        let mut crawl = crawl(&tmp, fetcher, &["up.example", "down.example"], BatchConfig::default());

        let report = crawl.run_batch().await.unwrap();

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        let failed = fs::read_to_string(tmp.path().join(FAILED_FILE)).unwrap();
        assert!(failed.starts_with("https://down.example\tHTTP 404"));
        assert_eq!(crawl.store().seen().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_seen_keys_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let store = Store::open(tmp.path()).unwrap();
        store
            .append_node(&NodeRecord::failed("https://a.example", "timed out"))
            .unwrap();
        // a queue file edited by hand can hold keys the store already has
        fs::write(tmp.path().join("queue.txt"), "a.example\n").unwrap();
        let frontier = Frontier::open(tmp.path()).unwrap();
        let fetcher = StubFetcher::new(&[("https://a.example", PLAIN)]);
        let mut crawl = Crawl::new(store, frontier, fetcher, BatchConfig::default());

        let report = crawl.run_batch().await.unwrap();
        assert_eq!(report.drained, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.succeeded + report.failed, 0);
        assert_eq!(crawl.store().load_nodes().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_continuous_stops_on_empty_queue() {
        let tmp = TempDir::new().unwrap();
        let fetcher = StubFetcher::new(&[
            ("https://a.example", PLAIN),
            ("https://b.example", PLAIN),
            ("https://c.example", PLAIN),
        ]);
        let config = BatchConfig {
            batch_size: 2,
            batch_pause_ms: 0,
            ..BatchConfig::default()
        };
        let mut crawl = crawl(&tmp, fetcher, &["a.example", "b.example", "c.example"], config);

        let report = crawl.run_continuous(100).await.unwrap();

        assert_eq!(report.stop, StopReason::QueueEmpty);
        assert_eq!(report.batches, 2);
        assert_eq!(report.nodes, 3);
        assert_eq!(report.queue_remaining, 0);
    }

    #[tokio::test]
    async fn test_continuous_stops_at_target() {
        let tmp = TempDir::new().unwrap();
        let fetcher = StubFetcher::new(&[("https://a.example", PLAIN), ("https://b.example", PLAIN)]);
        let config = BatchConfig {
            batch_size: 1,
            batch_pause_ms: 0,
            ..BatchConfig::default()
        };
        let mut crawl = crawl(&tmp, fetcher, &["a.example", "b.example"], config);

        let report = crawl.run_continuous(1).await.unwrap();

        assert_eq!(report.stop, StopReason::TargetReached);
        assert_eq!(report.batches, 1);
        assert_eq!(report.queue_remaining, 1);
    }
}
