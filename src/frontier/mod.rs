//! Persisted frontier queue
//!
//! `queue.txt` holds one site key per line in FIFO order. Draining a batch
//! first leases the drained keys to `queue.inflight`, then rewrites the queue
//! without them; both writes are atomic renames. The lease is dropped once
//! the batch's results are persisted. A lease found on open belongs to a
//! batch that never completed, and its keys go back to the head of the
//! queue: a crash re-processes entries but never loses them.

use crate::crawl::normalize;
use crate::error::{Error, Result};
use crate::store::{write_atomic, CompactionStats, SeenSet};
use std::collections::{HashSet, VecDeque};
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const QUEUE_FILE: &str = "queue.txt";
pub const LEASE_FILE: &str = "queue.inflight";

/// Deduplicated FIFO of site keys awaiting a crawl
#[derive(Debug)]
pub struct Frontier {
    queue_path: PathBuf,
    lease_path: PathBuf,
    entries: VecDeque<String>,
    queued: HashSet<String>,
}

fn read_keys(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    Ok(fs::read_to_string(path)?
        .lines()
        .map(normalize)
        .filter(|k| !k.is_empty())
        .collect())
}

fn render(keys: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<u8> {
    let mut out = String::new();
    for key in keys {
        out.push_str(key.as_ref());
        out.push('\n');
    }
    out.into_bytes()
}

/// Append `keys` to `path`, first closing a last line left unterminated by
/// a hand edit
fn append_keys(path: &Path, keys: &[String]) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)?;

    let mut out = Vec::new();
    let len = file.metadata()?.len();
    if len > 0 {
        let mut last = [0u8; 1];
        file.seek(SeekFrom::Start(len - 1))?;
        file.read_exact(&mut last)?;
        if last[0] != b'\n' {
            out.push(b'\n');
        }
    }
    out.extend(render(keys));

    let mut writer = BufWriter::new(file);
    writer.write_all(&out)?;
    writer.flush()?;
    Ok(())
}

impl Frontier {
    /// Load the queue from `dir`, recovering any unfinished lease
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;

        let mut frontier = Self {
            queue_path: dir.join(QUEUE_FILE),
            lease_path: dir.join(LEASE_FILE),
            entries: VecDeque::new(),
            queued: HashSet::new(),
        };

        let leased = read_keys(&frontier.lease_path)?;
        let queued = read_keys(&frontier.queue_path)?;

        for key in leased.iter().chain(queued.iter()) {
            if frontier.queued.insert(key.clone()) {
                frontier.entries.push_back(key.clone());
            }
        }

        if frontier.lease_path.exists() {
            warn!(
                "Recovering {} in-flight entries from an unfinished batch",
                leased.len()
            );
            frontier.persist()?;
            fs::remove_file(&frontier.lease_path)?;
        }

        debug!("Frontier holds {} entries", frontier.entries.len());
        Ok(frontier)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.queued.contains(key)
    }

    /// Queued keys in order
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    fn persist(&self) -> Result<()> {
        write_atomic(&self.queue_path, &render(&self.entries))
    }

    /// Normalize `urls` and append every key that is neither seen nor
    /// already queued. Returns the accepted keys in input order.
    pub fn enqueue_many<I, S>(&mut self, urls: I, seen: &SeenSet) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut accepted = Vec::new();
        for url in urls {
            let key = normalize(url.as_ref());
            if key.is_empty() || seen.is_seen(&key) || self.queued.contains(&key) {
                continue;
            }
            self.queued.insert(key.clone());
            self.entries.push_back(key.clone());
            accepted.push(key);
        }

        if !accepted.is_empty() {
            append_keys(&self.queue_path, &accepted)?;
            debug!("Enqueued {} new keys", accepted.len());
        }

        Ok(accepted)
    }

    /// Remove up to `n` keys from the head, leasing them until
    /// [`Frontier::complete_batch`]
    pub fn dequeue_batch(&mut self, n: usize) -> Result<Vec<String>> {
        if self.lease_path.exists() {
            return Err(Error::Store(format!(
                "A batch is already in flight ({})",
                self.lease_path.display()
            )));
        }

        let take = n.min(self.entries.len());
        if take == 0 {
            return Ok(Vec::new());
        }

        let batch: Vec<String> = self.entries.iter().take(take).cloned().collect();
        write_atomic(&self.lease_path, &render(&batch))?;

        self.entries.drain(..take);
        for key in &batch {
            self.queued.remove(key);
        }
        self.persist()?;

        Ok(batch)
    }

    /// Release the current lease once its results are persisted
    pub fn complete_batch(&mut self) -> Result<()> {
        if self.lease_path.exists() {
            fs::remove_file(&self.lease_path)?;
        }
        Ok(())
    }

    /// Rewrite the queue without duplicates or already-seen keys
    pub fn compact(&mut self, seen: &SeenSet) -> Result<CompactionStats> {
        let before = fs::read_to_string(&self.queue_path)
            .map(|raw| raw.lines().filter(|l| !l.trim().is_empty()).count())
            .unwrap_or(0);

        self.entries.retain(|key| !seen.is_seen(key));
        self.queued = self.entries.iter().cloned().collect();
        self.persist()?;

        let stats = CompactionStats {
            before,
            after: self.entries.len(),
        };
        info!(
            "Compacted queue: {} -> {} entries",
            stats.before, stats.after
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seen(keys: &[&str]) -> SeenSet {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_enqueue_twice_keeps_one() {
        let tmp = TempDir::new().unwrap();
        let mut frontier = Frontier::open(tmp.path()).unwrap();

        let first = frontier.enqueue_many(["https://u.example"], &seen(&[])).unwrap();
        let second = frontier.enqueue_many(["https://u.example"], &seen(&[])).unwrap();

        assert_eq!(first, vec!["https://u.example".to_string()]);
        assert!(second.is_empty());
        assert_eq!(frontier.len(), 1);

        let on_disk = fs::read_to_string(tmp.path().join(QUEUE_FILE)).unwrap();
        assert_eq!(on_disk, "https://u.example\n");
    }

    #[test]
    fn test_enqueue_after_unterminated_last_line() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(QUEUE_FILE), "https://hand.example").unwrap();
        let mut frontier = Frontier::open(tmp.path()).unwrap();

        frontier.enqueue_many(["new.example"], &seen(&[])).unwrap();

        let on_disk = fs::read_to_string(tmp.path().join(QUEUE_FILE)).unwrap();
        assert_eq!(on_disk, "https://hand.example\nhttps://new.example\n");
        let reopened = Frontier::open(tmp.path()).unwrap();
        assert_eq!(reopened.len(), 2);
    }

    #[test]
    fn test_enqueue_normalizes_and_filters() {
        let tmp = TempDir::new().unwrap();
        let mut frontier = Frontier::open(tmp.path()).unwrap();

        let accepted = frontier
            .enqueue_many(
                [
                    "example.com",
                    "http://www.example.com/",
                    "https://done.example",
                    "",
                    "mailto:x@y.example",
                    "https://next.example/",
                ],
                &seen(&["https://done.example"]),
            )
            .unwrap();

        assert_eq!(
            accepted,
            vec![
                "https://example.com".to_string(),
                "https://next.example".to_string(),
            ]
        );
    }

    #[test]
    fn test_dequeue_persists_remainder_and_lease() {
        let tmp = TempDir::new().unwrap();
        let mut frontier = Frontier::open(tmp.path()).unwrap();
        frontier
            .enqueue_many(["a.example", "b.example", "c.example"], &seen(&[]))
            .unwrap();

        let batch = frontier.dequeue_batch(2).unwrap();
        assert_eq!(batch, vec!["https://a.example", "https://b.example"]);
        assert_eq!(
            fs::read_to_string(tmp.path().join(QUEUE_FILE)).unwrap(),
            "https://c.example\n"
        );
        assert_eq!(
            fs::read_to_string(tmp.path().join(LEASE_FILE)).unwrap(),
            "https://a.example\nhttps://b.example\n"
        );

        // a second drain before completion is refused
        assert!(frontier.dequeue_batch(1).is_err());

        frontier.complete_batch().unwrap();
        assert!(!tmp.path().join(LEASE_FILE).exists());
        assert_eq!(frontier.dequeue_batch(10).unwrap(), vec!["https://c.example"]);
    }

    #[test]
    fn test_unfinished_lease_is_recovered_at_head() {
        let tmp = TempDir::new().unwrap();
        {
            let mut frontier = Frontier::open(tmp.path()).unwrap();
            frontier
                .enqueue_many(["a.example", "b.example", "c.example"], &seen(&[]))
                .unwrap();
            frontier.dequeue_batch(2).unwrap();
            // crash: complete_batch never runs
        }

        let frontier = Frontier::open(tmp.path()).unwrap();
        assert_eq!(
            frontier.entries().collect::<Vec<_>>(),
            vec!["https://a.example", "https://b.example", "https://c.example"]
        );
        assert!(!tmp.path().join(LEASE_FILE).exists());
    }

    #[test]
    fn test_empty_dequeue_takes_no_lease() {
        let tmp = TempDir::new().unwrap();
        let mut frontier = Frontier::open(tmp.path()).unwrap();
        assert!(frontier.dequeue_batch(5).unwrap().is_empty());
        assert!(!tmp.path().join(LEASE_FILE).exists());
    }

    #[test]
    fn test_compact_drops_duplicates_and_seen() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(QUEUE_FILE),
            "a.example\nhttps://www.a.example/\nb.example\n\nc.example\n",
        )
        .unwrap();

        let mut frontier = Frontier::open(tmp.path()).unwrap();
        let stats = frontier.compact(&seen(&["https://b.example"])).unwrap();

        assert_eq!(stats, CompactionStats { before: 4, after: 2 });
        assert_eq!(
            fs::read_to_string(tmp.path().join(QUEUE_FILE)).unwrap(),
            "https://a.example\nhttps://c.example\n"
        );
    }
}
