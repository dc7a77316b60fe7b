//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub config_path: PathBuf,
    pub force: bool,
}

/// Write a default configuration and create the data and log directories
pub fn cmd_init(options: InitOptions) -> Result<Config> {
    let InitOptions { config_path, force } = options;

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Config already exists at {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    let config = Config::default_at(&config_path);
    config.validate()?;
    config.save()?;

    std::fs::create_dir_all(&config.paths.data_dir)?;
    if let Some(logs) = config.paths.log_file.parent() {
        std::fs::create_dir_all(logs)?;
    }
    info!("Created data directory at {:?}", config.paths.data_dir);

    Ok(config)
}

pub fn print_init(config: &Config) {
    println!("✓ Initialized blogcircles at {:?}", config.paths.base_dir);
    println!("\nConfiguration: {:?}", config.paths.config_file);
    println!("Data: {:?}", config.paths.data_dir);
    println!("Log: {:?}", config.paths.log_file);
    println!("\nNext steps:");
    println!("  blogcircles seed ./seeds.md      # Queue blogs listed in a text file");
    println!("  blogcircles circles              # Queue members of known blog circles");
    println!("  blogcircles continuous           # Crawl until the target is reached");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_loadable_config() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        let config = cmd_init(InitOptions {
            config_path: config_path.clone(),
            force: false,
        })
        .unwrap();

        assert!(config_path.exists());
        assert!(config.paths.data_dir.is_dir());
        let loaded = Config::load(&config_path).unwrap();
        assert_eq!(loaded.batch.workers, config.batch.workers);
        assert_eq!(loaded.circles.link_pages, config.circles.link_pages);
    }

    #[test]
    fn test_init_refuses_to_overwrite_without_force() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "[batch]\nworkers = 3\n").unwrap();

        let options = InitOptions {
            config_path: config_path.clone(),
            force: false,
        };
        assert!(cmd_init(options.clone()).is_err());

        cmd_init(InitOptions {
            force: true,
            ..options
        })
        .unwrap();
        assert_eq!(Config::load(&config_path).unwrap().batch.workers, 20);
    }
}
