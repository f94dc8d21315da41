//! CLI subcommands.

pub mod config;
pub mod receipts;
pub mod scan;

use std::path::{Path, PathBuf};

use tracing::debug;

use lastprice_core::models::config::LastPriceConfig;
use lastprice_core::storage::{FileStore, ReceiptStore};

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lastprice")
        .join("config.json")
}

/// Default directory for saved receipts.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lastprice")
}

/// Configuration and storage location shared by the commands.
pub struct Context {
    pub config: LastPriceConfig,
    pub data_dir: PathBuf,
}

impl Context {
    /// Resolve configuration: an explicit path must exist, the default path
    /// is optional.
    pub fn load(config_path: Option<&Path>, data_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let config = match config_path {
            Some(path) => LastPriceConfig::from_file(path).map_err(|e| {
                anyhow::anyhow!("Failed to read config {}: {}", path.display(), e)
            })?,
            None => {
                let path = default_config_path();
                if path.exists() {
                    LastPriceConfig::from_file(&path)?
                } else {
                    LastPriceConfig::default()
                }
            }
        };
        config.validate()?;

        let data_dir = data_dir
            .or_else(|| config.storage.data_dir.clone())
            .unwrap_or_else(default_data_dir);
        debug!("Using data directory {}", data_dir.display());

        Ok(Self { config, data_dir })
    }

    /// Gateway over the saved receipt collection.
    pub fn store(&self) -> ReceiptStore<FileStore> {
        ReceiptStore::with_key(FileStore::new(&self.data_dir), self.config.storage.key.clone())
    }
}
