//! photosync binary: loads the configuration and repeats sync passes on a
//! fixed interval until a shutdown signal arrives.

#![warn(clippy::all)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, ORIGIN};
use tracing_subscriber::EnvFilter;

use photosync::config::{self, Config};
use photosync::photos::CloudKitService;
use photosync::{cli, download, shutdown, sync};

const CONNECT_TIMEOUT_SECS: u64 = 30;

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("photosync").join("config.toml"))
}

/// Load the config file (explicit path, else the default location when it
/// exists, else built-in defaults) and layer the command line on top.
fn load_config(cli: &cli::Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(&config::expand_tilde(path))?,
        None => match default_config_path().filter(|p| p.is_file()) {
            Some(path) => {
                tracing::debug!("Using config file {}", path.display());
                Config::load(&path)?
            }
            None => Config::default(),
        },
    };
    config.apply_cli(cli);
    Ok(config)
}

fn build_service(config: &Config, cookie: Option<&str>) -> anyhow::Result<CloudKitService> {
    let endpoint = config.service.endpoint.clone().ok_or_else(|| {
        anyhow::anyhow!("No service endpoint configured; set [service] endpoint or pass --endpoint")
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(ORIGIN, HeaderValue::from_static("https://www.icloud.com"));
    if let Some(cookie) = cookie {
        let mut value = HeaderValue::from_str(cookie).context("Invalid cookie value")?;
        value.set_sensitive(true);
        headers.insert(COOKIE, value);
    }

    let client = reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .build()
        .context("Failed to build HTTP client")?;

    Ok(CloudKitService::new(
        Arc::new(client),
        endpoint,
        config.service.params.clone(),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    let config = load_config(&cli)?;
    tracing::debug!(?config, "Loaded configuration");

    let service = build_service(&config, cli.cookie.as_deref())?;
    let options = download::DownloadOptions {
        retry: config.photos.retry_config(),
        verbose: !cli.quiet,
    };

    tracing::info!(
        destination = %config.photos.destination.display(),
        albums = ?config.photos.filters.albums,
        sizes = ?config.photos.filters.file_sizes,
        "Starting photosync"
    );

    let shutdown_token = shutdown::install_signal_handler()?;

    loop {
        if shutdown_token.is_cancelled() {
            tracing::info!("Shutdown requested, exiting...");
            break;
        }

        match sync::sync_photos(&config.photos, &service, &options, &shutdown_token).await {
            Ok(summary) => {
                if cli.once && !summary.is_clean() {
                    anyhow::bail!("{} downloads failed", summary.failed.len());
                }
            }
            Err(e) if cli.once => return Err(e),
            Err(e) => tracing::error!("Sync pass failed: {:#}", e),
        }

        if cli.once {
            break;
        }

        let interval = config.photos.sync_interval;
        tracing::info!("Waiting {} seconds...", interval);
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(interval)) => {}
            _ = shutdown_token.cancelled() => {
                tracing::info!("Shutdown during wait, exiting...");
                break;
            }
        }
    }

    Ok(())
}
