//! blogcircles - map independent blogs through friend links and blog circles
//!
//! This crate provides:
//! - A persisted, deduplicated crawl frontier with crash-safe batch leases
//! - A polite HTTP fetcher with retry and charset detection
//! - Signature classifiers for site generator, comment system, theme and
//!   article count
//! - Friend-link discovery and blog circle adapters that grow the frontier
//! - An append-only node/edge/circle store with compaction

pub mod batch;
pub mod circles;
pub mod commands;
pub mod config;
pub mod crawl;
pub mod detect;
pub mod error;
pub mod frontier;
pub mod progress;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
