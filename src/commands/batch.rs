//! Batch and continuous crawl commands

use crate::batch::{BatchReport, ContinuousReport, Crawl, StopReason};
use crate::commands::{create_fetcher, open_data};
use crate::config::{BatchConfig, BatchMode, Config};
use crate::error::Result;
use tracing::info;

/// Command-line overrides for the `[batch]` section
#[derive(Debug, Clone, Default)]
pub struct BatchOverrides {
    pub batch_size: Option<usize>,
    pub workers: Option<usize>,
    pub careful: bool,
}

impl BatchOverrides {
    pub fn apply(&self, config: &BatchConfig) -> BatchConfig {
        let mut config = config.clone();
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size.max(1);
        }
        if let Some(workers) = self.workers {
            config.workers = workers.max(1);
        }
        if self.careful {
            config.mode = BatchMode::Careful;
        }
        config
    }
}

fn build_crawl(config: &Config, overrides: &BatchOverrides, show_progress: bool) -> Result<Crawl> {
    let batch = overrides.apply(&config.batch);
    info!(
        "Batch size {}, {} workers, {:?} mode",
        batch.batch_size, batch.workers, batch.mode
    );

    let fetcher = create_fetcher(config)?;
    let (store, frontier) = open_data(config)?;
    Ok(Crawl::new(store, frontier, fetcher, batch).with_progress(show_progress))
}

/// Drain and process one batch
pub async fn cmd_batch(
    config: &Config,
    overrides: &BatchOverrides,
    show_progress: bool,
) -> Result<BatchReport> {
    let mut crawl = build_crawl(config, overrides, show_progress)?;
    crawl.run_batch().await
}

/// Run batches until `target` nodes (default from config) or an empty queue
pub async fn cmd_continuous(
    config: &Config,
    overrides: &BatchOverrides,
    target: Option<usize>,
    show_progress: bool,
) -> Result<ContinuousReport> {
    let target = target.unwrap_or(config.batch.target);
    let mut crawl = build_crawl(config, overrides, show_progress)?;
    crawl.run_continuous(target).await
}

pub fn print_batch_report(report: &BatchReport) {
    println!("\n🕸  Batch complete\n");
    println!("Drained: {}", report.drained);
    if report.skipped > 0 {
        println!("Already crawled: {}", report.skipped);
    }
    println!("Succeeded: {}", report.succeeded);
    println!("Failed: {}", report.failed);
    println!("Friend-link edges: {}", report.edges_added);
    println!("Newly queued: {}", report.enqueued);
    println!("Queue remaining: {}", report.queue_remaining);
}

pub fn print_continuous_report(report: &ContinuousReport) {
    let reason = match report.stop {
        StopReason::TargetReached => "target reached",
        StopReason::QueueEmpty => "queue empty",
    };

    println!("\n🕸  Continuous crawl stopped: {}\n", reason);
    println!("Batches: {}", report.batches);
    println!("Succeeded: {}", report.succeeded);
    println!("Failed: {}", report.failed);
    println!("Friend-link edges: {}", report.edges_added);
    println!("Nodes: {}", report.nodes);
    println!("Queue remaining: {}", report.queue_remaining);
}
