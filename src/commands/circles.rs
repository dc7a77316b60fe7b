//! Circles command implementation

use crate::circles::{configured_scrapers, run_circles, CircleRunReport};
use crate::commands::{create_fetcher, open_data};
use crate::config::Config;
use crate::error::Result;
use tracing::info;

/// Scrape every enabled circle and queue its members
pub async fn cmd_circles(config: &Config) -> Result<CircleRunReport> {
    let scrapers = configured_scrapers(&config.circles);
    info!("Scraping {} circles", scrapers.len());

    let fetcher = create_fetcher(config)?;
    let (store, mut frontier) = open_data(config)?;

    run_circles(&store, &mut frontier, fetcher.as_ref(), &scrapers).await
}

pub fn print_circle_report(report: &CircleRunReport) {
    println!("\n⭕ Circles\n");

    for circle in &report.circles {
        match &circle.error {
            None => println!(
                "✓ {} ({}): {} members, {} newly queued",
                circle.name, circle.url, circle.members, circle.enqueued
            ),
            Some(e) => println!("✗ {} ({}): {}", circle.name, circle.url, e),
        }
    }

    println!();
    println!("Members: {}", report.members);
    println!("Membership edges: {}", report.edges_added);
    println!("Newly queued: {}", report.enqueued);
    if report.failed > 0 {
        println!("Failed circles: {}", report.failed);
    }
}
