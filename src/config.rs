use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::retry::RetryConfig;
use crate::types::VersionSize;

/// Application configuration, read from a TOML file.
///
/// ```toml
/// [photos]
/// destination = "~/Pictures/icloud"
/// sync_interval = 1800
///
/// [photos.filters]
/// albums = ["album-1", "album-2"]
/// file_sizes = ["original", "thumb"]
///
/// [service]
/// endpoint = "https://p42-ckdatabasews.icloud.com/database/1/com.apple.photos.cloud/production/private"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub photos: PhotosConfig,
    #[serde(default)]
    pub service: ServiceConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PhotosConfig {
    /// Root of the local mirror.
    pub destination: PathBuf,
    /// Seconds between sync passes.
    pub sync_interval: u64,
    /// Fixed pause, in seconds, after a photo fails with a transient error.
    pub retry_delay: u64,
    /// In-pass retries of a single transfer. Zero tries each photo once.
    pub max_retries: u32,
    pub filters: Filters,
}

impl Default for PhotosConfig {
    fn default() -> Self {
        Self {
            destination: PathBuf::from("photos"),
            sync_interval: 1800,
            retry_delay: 5,
            max_retries: 0,
            filters: Filters::default(),
        }
    }
}

impl PhotosConfig {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            base_delay_secs: self.retry_delay,
            max_delay_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Filters {
    /// Albums to mirror, each into its own subdirectory. Empty mirrors the
    /// whole library into `all/`.
    pub albums: Vec<String>,
    pub file_sizes: Vec<VersionSize>,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            albums: Vec::new(),
            file_sizes: vec![VersionSize::Original],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// CloudKit database endpoint of the photo library.
    pub endpoint: Option<String>,
    /// Extra query parameters sent with every request.
    pub params: BTreeMap<String, String>,
}

pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

impl Config {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let mut config: Config = toml::from_str(s).context("Invalid configuration")?;
        config.normalize();
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("Failed to load config file {}", path.display()))
    }

    /// Apply command-line overrides on top of the file.
    pub fn apply_cli(&mut self, cli: &crate::cli::Cli) {
        if let Some(dest) = &cli.destination {
            self.photos.destination = expand_tilde(dest);
        }
        if !cli.albums.is_empty() {
            self.photos.filters.albums = cli.albums.clone();
        }
        if !cli.sizes.is_empty() {
            self.photos.filters.file_sizes = cli.sizes.clone();
        }
        if let Some(interval) = cli.interval {
            self.photos.sync_interval = interval;
        }
        if let Some(endpoint) = &cli.endpoint {
            self.service.endpoint = Some(endpoint.clone());
        }
        self.normalize();
    }

    fn normalize(&mut self) {
        self.photos.destination = expand_tilde(&self.photos.destination);
        if self.photos.filters.file_sizes.is_empty() {
            tracing::warn!("No file sizes configured, defaulting to original");
            self.photos.filters.file_sizes = vec![VersionSize::Original];
        }
        let mut seen: Vec<VersionSize> = Vec::with_capacity(self.photos.filters.file_sizes.len());
        self.photos
            .filters
            .file_sizes
            .retain(|s| if seen.contains(s) { false } else { seen.push(*s); true });
    }
}
