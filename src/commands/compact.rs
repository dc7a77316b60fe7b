//! Compact command implementation

use crate::commands::open_data;
use crate::config::Config;
use crate::error::Result;
use crate::store::CompactionStats;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct CompactReport {
    pub nodes: CompactionStats,
    pub edges: CompactionStats,
    pub queue: CompactionStats,
}

/// Fold duplicate nodes, drop duplicate edges and prune the queue
pub fn cmd_compact(config: &Config) -> Result<CompactReport> {
    info!("Compacting {:?}", config.paths.data_dir);

    let (store, mut frontier) = open_data(config)?;
    let nodes = store.compact_nodes()?;
    let edges = store.compact_edges()?;
    let queue = frontier.compact(&store.seen()?)?;

    Ok(CompactReport {
        nodes,
        edges,
        queue,
    })
}

pub fn print_compact_report(report: &CompactReport) {
    println!("\n🧹 Compaction complete\n");
    for (label, stats) in [
        ("Nodes", &report.nodes),
        ("Edges", &report.edges),
        ("Queue", &report.queue),
    ] {
        println!(
            "{}: {} -> {} ({} removed)",
            label,
            stats.before,
            stats.after,
            stats.removed()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontier::QUEUE_FILE;
    use crate::store::{EdgeRecord, EdgeType, NodeRecord, Store};
    use tempfile::TempDir;

    #[test]
    fn test_compact_everything() {
        let tmp = TempDir::new().unwrap();
        let config = Config::default_at(&tmp.path().join("config.toml"));
        let store = Store::open(&config.paths.data_dir).unwrap();

        store
            .append_nodes(&[
                NodeRecord::failed("https://a.example", "timed out"),
                NodeRecord::failed("https://www.a.example/", "timed out again"),
            ])
            .unwrap();
        let edge = EdgeRecord::new("a.example", "b.example", EdgeType::FriendLink);
        store.append_edges(&[edge.clone(), edge]).unwrap();
        std::fs::write(
            config.paths.data_dir.join(QUEUE_FILE),
            "a.example\nb.example\nb.example\n",
        )
        .unwrap();

        let report = cmd_compact(&config).unwrap();

        assert_eq!(report.nodes, CompactionStats { before: 2, after: 1 });
        assert_eq!(report.edges, CompactionStats { before: 2, after: 1 });
        assert_eq!(report.queue, CompactionStats { before: 3, after: 1 });
    }
}
