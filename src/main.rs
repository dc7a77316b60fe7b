//! blogcircles CLI entry point

use blogcircles::{
    commands::{
        cmd_batch, cmd_circles, cmd_compact, cmd_continuous, cmd_init, cmd_seed, cmd_stats,
        print_batch_report, print_circle_report, print_compact_report, print_continuous_report,
        print_init, print_seed_report, print_stats, BatchOverrides, InitOptions,
    },
    config::Config,
    error::Result,
    progress::{open_log_file, LogWriterFactory},
};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "blogcircles")]
#[command(version, about = "Map independent blogs through friend links and blog circles", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration and create the data directory
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Queue every blog URL found in a text file
    Seed {
        /// File to read URLs from (e.g. a Markdown list)
        file: PathBuf,
    },

    /// Scrape the configured blog circles and queue their members
    Circles,

    /// Crawl one batch from the queue
    Batch {
        #[command(flatten)]
        overrides: BatchArgs,
    },

    /// Crawl batches until the target node count or an empty queue
    Continuous {
        /// Stop once the node store holds this many sites
        #[arg(short, long)]
        target: Option<usize>,

        #[command(flatten)]
        overrides: BatchArgs,
    },

    /// Show node, edge, circle and queue counts
    Stats,

    /// Deduplicate the node store, edge table and queue
    Compact,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args)]
struct BatchArgs {
    /// Sites drained from the queue per batch
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Concurrent fetches in parallel mode
    #[arg(short, long)]
    workers: Option<usize>,

    /// One site at a time with a fixed delay
    #[arg(long)]
    careful: bool,
}

impl From<BatchArgs> for BatchOverrides {
    fn from(args: BatchArgs) -> Self {
        Self {
            batch_size: args.batch_size,
            workers: args.workers,
            careful: args.careful,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn config_path(path: Option<&Path>) -> PathBuf {
    match path {
        Some(p) if p.is_dir() => p.join("config.toml"),
        Some(p) => p.to_path_buf(),
        None => Config::default_config_path(),
    }
}

fn init_logging(verbose: bool, log_file: Option<&Path>) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let file_layer = log_file.and_then(|path| match open_log_file(path) {
        Ok(file) => Some(fmt::layer().with_ansi(false).with_writer(file)),
        Err(e) => {
            eprintln!("Could not open log file {}: {}", path.display(), e);
            None
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory::default()))
        .with(file_layer)
        .with(filter)
        .init();
}

fn emit<T: Serialize>(json: bool, value: &T, print: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print(value);
    }
    Ok(())
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Completions need neither config nor logging
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "blogcircles", &mut std::io::stdout());
        return Ok(());
    }

    let config_path = config_path(cli.config.as_deref());

    if let Commands::Init { force } = cli.command {
        init_logging(cli.verbose, None);
        let config = cmd_init(InitOptions { config_path, force })?;
        return emit(cli.json, &config.paths.base_dir, |_| print_init(&config));
    }

    let config = Config::load_or_default(&config_path)?;
    init_logging(cli.verbose, Some(&config.paths.log_file));

    // Progress bars only make sense for a human reader
    let show_progress = !cli.json;

    match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } => unreachable!(),

        Commands::Seed { file } => {
            let report = cmd_seed(&config, &file)?;
            emit(cli.json, &report, print_seed_report)?;
        }

        Commands::Circles => {
            let report = cmd_circles(&config).await?;
            emit(cli.json, &report, print_circle_report)?;
        }

        Commands::Batch { overrides } => {
            let report = cmd_batch(&config, &overrides.into(), show_progress).await?;
            emit(cli.json, &report, print_batch_report)?;
        }

        Commands::Continuous { target, overrides } => {
            let report = cmd_continuous(&config, &overrides.into(), target, show_progress).await?;
            emit(cli.json, &report, print_continuous_report)?;
        }

        Commands::Stats => {
            let stats = cmd_stats(&config)?;
            emit(cli.json, &stats, print_stats)?;
        }

        Commands::Compact => {
            let report = cmd_compact(&config)?;
            emit(cli.json, &report, print_compact_report)?;
        }
    }

    Ok(())
}
