//! CLI commands implementation

pub mod batch;
pub mod circles;
pub mod compact;
pub mod init;
pub mod seed;
pub mod stats;

pub use batch::*;
pub use circles::*;
pub use compact::*;
pub use init::*;
pub use seed::*;
pub use stats::*;

use crate::config::Config;
use crate::crawl::{Fetch, Fetcher};
use crate::error::Result;
use crate::frontier::Frontier;
use crate::store::Store;
use std::sync::Arc;

/// Open the node store and frontier under the configured data directory
pub fn open_data(config: &Config) -> Result<(Store, Frontier)> {
    let store = Store::open(&config.paths.data_dir)?;
    let frontier = Frontier::open(&config.paths.data_dir)?;
    Ok((store, frontier))
}

/// Build the shared HTTP fetcher
pub fn create_fetcher(config: &Config) -> Result<Arc<dyn Fetch>> {
    Ok(Arc::new(Fetcher::new(&config.crawl)?))
}
