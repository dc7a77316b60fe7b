//! Stats command implementation

use crate::config::Config;
use crate::error::Result;
use crate::frontier::{LEASE_FILE, QUEUE_FILE};
use crate::store::Store;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Crawl state summary
#[derive(Debug, Clone, Serialize)]
pub struct StatsInfo {
    pub data_dir: String,
    /// Distinct site keys in the node store
    pub nodes: usize,
    pub complete: usize,
    pub failed: usize,
    /// Edge rows, duplicates included until `compact` runs
    pub edges: usize,
    /// Circle snapshots
    pub circles: usize,
    pub queue: usize,
    /// Keys leased by a batch that has not completed
    pub in_flight: usize,
    pub generators: BTreeMap<String, usize>,
    pub comment_systems: BTreeMap<String, usize>,
}

fn count_lines(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Ok(0);
    }
    Ok(std::fs::read_to_string(path)?
        .lines()
        .filter(|l| !l.trim().is_empty())
        .count())
}

/// Summarize the store without touching the queue or lease
pub fn cmd_stats(config: &Config) -> Result<StatsInfo> {
    info!("Getting stats");

    let data_dir = &config.paths.data_dir;
    let store = Store::open(data_dir)?;
    let nodes = store.merged_nodes()?;

    let mut generators = BTreeMap::new();
    let mut comment_systems = BTreeMap::new();
    let mut complete = 0;
    for node in nodes.iter().filter(|n| n.is_complete()) {
        complete += 1;
        *generators.entry(node.generator.to_string()).or_insert(0) += 1;
        *comment_systems
            .entry(node.comment_system.kind.to_string())
            .or_insert(0) += 1;
    }

    Ok(StatsInfo {
        data_dir: data_dir.display().to_string(),
        nodes: nodes.len(),
        complete,
        failed: nodes.len() - complete,
        edges: store.load_edges()?.len(),
        circles: store.load_circles()?.len(),
        queue: count_lines(&data_dir.join(QUEUE_FILE))?,
        in_flight: count_lines(&data_dir.join(LEASE_FILE))?,
        generators,
        comment_systems,
    })
}

fn print_tally(title: &str, tally: &BTreeMap<String, usize>) {
    if tally.is_empty() {
        return;
    }
    println!("\n{}:", title);
    let mut rows: Vec<_> = tally.iter().collect();
    rows.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (name, count) in rows {
        println!("  {:<16} {}", name, count);
    }
}

pub fn print_stats(stats: &StatsInfo) {
    println!("\n📊 blogcircles Status\n");
    println!("Data: {}", stats.data_dir);
    println!("\nBlogs: {}", stats.nodes);
    println!("  Complete: {}", stats.complete);
    println!("  Failed: {}", stats.failed);
    println!("Edges: {}", stats.edges);
    println!("Circles scraped: {}", stats.circles);
    println!("URLs in queue: {}", stats.queue);
    if stats.in_flight > 0 {
        println!(
            "⚠ {} URLs leased by an unfinished batch (requeued on next run)",
            stats.in_flight
        );
    }
    print_tally("Generators", &stats.generators);
    print_tally("Comment systems", &stats.comment_systems);
}
