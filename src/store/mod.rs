//! Append-only graph and node store
//!
//! This module owns the crawl's durable files:
//! - `blogs.jsonl`: one node record per line
//! - `edges.csv`: `source,target,type` edge table
//! - `circles.jsonl`: circle membership snapshots
//! - `failed.txt`: `url<TAB>reason` failure log
//!
//! Writes only ever append. Duplicates that accumulate across runs are
//! folded by [`Store::compact_nodes`] and [`Store::compact_edges`]. The store
//! assumes a single writer process.

mod records;

pub use records::*;

use crate::crawl::normalize;
use crate::error::Result;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const NODES_FILE: &str = "blogs.jsonl";
pub const EDGES_FILE: &str = "edges.csv";
pub const CIRCLES_FILE: &str = "circles.jsonl";
pub const FAILED_FILE: &str = "failed.txt";

/// Keys of every site that reached a terminal state
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    keys: HashSet<String>,
}

impl SeenSet {
    pub fn is_seen(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Record a key; returns false if it was already seen
    pub fn insert(&mut self, key: String) -> bool {
        self.keys.insert(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl FromIterator<String> for SeenSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().filter(|k| !k.is_empty()).collect(),
        }
    }
}

/// Record counts before and after a compaction pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CompactionStats {
    pub before: usize,
    pub after: usize,
}

impl CompactionStats {
    pub fn removed(&self) -> usize {
        self.before.saturating_sub(self.after)
    }
}

/// Handle on the data directory
#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    /// Open (and create if needed) a store rooted at `dir`
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn append_handle(&self, name: &str) -> Result<File> {
        Ok(OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(name))?)
    }

    /// Every node record in append order; malformed lines are skipped
    pub fn load_nodes(&self) -> Result<Vec<NodeRecord>> {
        read_jsonl(&self.path(NODES_FILE))
    }

    /// One record per key, duplicates folded with [`NodeRecord::merge`]
    pub fn merged_nodes(&self) -> Result<Vec<NodeRecord>> {
        Ok(merge_nodes(self.load_nodes()?))
    }

    /// Build the dedup set from the node store
    pub fn seen(&self) -> Result<SeenSet> {
        let path = self.path(NODES_FILE);
        if !path.exists() {
            return Ok(SeenSet::default());
        }

        let seen: SeenSet = self
            .load_nodes()?
            .into_iter()
            .map(|node| normalize(&node.url))
            .collect();
        debug!("Dedup set holds {} keys", seen.len());
        Ok(seen)
    }

    pub fn append_node(&self, node: &NodeRecord) -> Result<()> {
        self.append_nodes(std::slice::from_ref(node))
    }

    pub fn append_nodes(&self, nodes: &[NodeRecord]) -> Result<()> {
        if nodes.is_empty() {
            return Ok(());
        }
        let mut out = BufWriter::new(self.append_handle(NODES_FILE)?);
        for node in nodes {
            serde_json::to_writer(&mut out, node)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(())
    }

    /// Append edges, writing the header if the file is new. Edges with an
    /// empty endpoint are dropped. Returns the number written.
    pub fn append_edges(&self, edges: &[EdgeRecord]) -> Result<usize> {
        let valid: Vec<&EdgeRecord> = edges.iter().filter(|e| e.is_valid()).collect();
        if valid.is_empty() {
            return Ok(0);
        }

        let path = self.path(EDGES_FILE);
        let needs_header = fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(self.append_handle(EDGES_FILE)?);
        for edge in &valid {
            writer.serialize(edge)?;
        }
        writer.flush()?;
        Ok(valid.len())
    }

    /// Every edge row in file order; malformed rows are skipped
    pub fn load_edges(&self) -> Result<Vec<EdgeRecord>> {
        let path = self.path(EDGES_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&path)?;
        let mut edges = Vec::new();
        for (row, record) in reader.deserialize::<EdgeRecord>().enumerate() {
            match record {
                Ok(edge) => edges.push(edge),
                Err(e) => warn!("Skipping malformed edge row {}: {}", row + 1, e),
            }
        }
        Ok(edges)
    }

    pub fn append_circle(&self, circle: &CircleRecord) -> Result<()> {
        let mut out = self.append_handle(CIRCLES_FILE)?;
        let mut line = serde_json::to_vec(circle)?;
        line.push(b'\n');
        out.write_all(&line)?;
        Ok(())
    }

    pub fn load_circles(&self) -> Result<Vec<CircleRecord>> {
        read_jsonl(&self.path(CIRCLES_FILE))
    }

    /// Append a line to the failure log
    pub fn append_failure(&self, url: &str, reason: &str) -> Result<()> {
        let reason: String = reason
            .chars()
            .map(|c| if c == '\t' || c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        let mut out = self.append_handle(FAILED_FILE)?;
        writeln!(out, "{}\t{}", url, reason)?;
        Ok(())
    }

    /// Rewrite the node store with one merged record per key.
    ///
    /// The previous file is kept as `blogs.jsonl.bak`.
    pub fn compact_nodes(&self) -> Result<CompactionStats> {
        let path = self.path(NODES_FILE);
        if !path.exists() {
            return Ok(CompactionStats::default());
        }

        let nodes = self.load_nodes()?;
        let before = nodes.len();
        let merged = merge_nodes(nodes);

        let mut buf = Vec::new();
        for node in &merged {
            serde_json::to_writer(&mut buf, node)?;
            buf.push(b'\n');
        }

        fs::copy(&path, backup_path(&path))?;
        write_atomic(&path, &buf)?;

        let stats = CompactionStats {
            before,
            after: merged.len(),
        };
        info!(
            "Compacted nodes: {} -> {} ({} duplicates)",
            stats.before,
            stats.after,
            stats.removed()
        );
        Ok(stats)
    }

    /// Rewrite the edge table as a set: endpoints re-normalized, empty
    /// endpoints dropped, duplicate triples removed. First occurrence keeps
    /// its position. The previous file is kept as `edges.csv.bak`.
    pub fn compact_edges(&self) -> Result<CompactionStats> {
        let path = self.path(EDGES_FILE);
        if !path.exists() {
            return Ok(CompactionStats::default());
        }

        let edges = self.load_edges()?;
        let before = edges.len();

        let mut seen = HashSet::new();
        let unique: Vec<EdgeRecord> = edges
            .into_iter()
            .map(|e| EdgeRecord::new(&e.source, &e.target, e.kind))
            .filter(|e| e.is_valid())
            .filter(|e| seen.insert(e.clone()))
            .collect();

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["source", "target", "type"])?;
        for edge in &unique {
            let kind = edge.kind.to_string();
            writer.write_record([edge.source.as_str(), edge.target.as_str(), kind.as_str()])?;
        }
        let buf = writer
            .into_inner()
            .map_err(|e| crate::error::Error::Store(format!("Failed to encode edges: {}", e)))?;

        fs::copy(&path, backup_path(&path))?;
        write_atomic(&path, &buf)?;

        let stats = CompactionStats {
            before,
            after: unique.len(),
        };
        info!(
            "Compacted edges: {} -> {} ({} duplicates)",
            stats.before,
            stats.after,
            stats.removed()
        );
        Ok(stats)
    }
}

/// Fold records sharing a key, keeping first-seen order
fn merge_nodes(nodes: Vec<NodeRecord>) -> Vec<NodeRecord> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<NodeRecord> = Vec::new();

    for mut node in nodes {
        let key = normalize(&node.url);
        if key.is_empty() {
            continue;
        }
        node.url = key.clone();

        match index.get(&key) {
            Some(&i) => {
                merged[i] = merged[i].clone().merge(node);
            }
            None => {
                index.insert(key, merged.len());
                merged.push(node);
            }
        }
    }

    merged
}

fn read_jsonl<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping malformed line {} in {:?}: {}", line_no + 1, path, e),
        }
    }
    Ok(records)
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    path.with_file_name(name)
}

/// Replace `path` with `bytes` via a temp file in the same directory
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}
