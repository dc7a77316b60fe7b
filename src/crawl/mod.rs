//! Network-facing crawl primitives
//!
//! This module provides:
//! - Site identity keys (URL normalization)
//! - Single-page fetching with retry and charset detection
//! - Fixed-interval pacing for careful crawling
//! - The blog-likelihood link filter
//! - Friend-link page discovery and extraction

mod fetcher;
mod filter;
mod friends;
mod normalize;
mod rate_limit;

pub use fetcher::*;
pub use filter::*;
pub use friends::*;
pub use normalize::{base, host_of, normalize};
pub use rate_limit::*;
