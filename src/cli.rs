use std::path::PathBuf;

use clap::Parser;

use crate::types::*;

#[derive(Parser, Debug)]
#[command(name = "photosync", about = "Mirror a cloud photo library into local folders")]
pub struct Cli {
    /// Path to the TOML configuration file
    /// (default: ~/.config/photosync/config.toml when it exists)
    #[arg(short = 'c', long, env = "PHOTOSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Local root directory of the mirror (overrides the config file)
    #[arg(short = 'd', long)]
    pub destination: Option<PathBuf>,

    /// Album(s) to mirror (overrides the config file)
    #[arg(short = 'a', long = "album")]
    pub albums: Vec<String>,

    /// Size variant(s) to mirror (overrides the config file)
    #[arg(long = "size", value_enum)]
    pub sizes: Vec<VersionSize>,

    /// CloudKit database endpoint (overrides the config file)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Cookie header sent with every request.
    /// Prefer the PHOTOSYNC_COOKIE environment variable; arguments are
    /// visible in process listings.
    #[arg(long, env = "PHOTOSYNC_COOKIE", hide_env_values = true)]
    pub cookie: Option<String>,

    /// Run a single sync pass and exit
    #[arg(long)]
    pub once: bool,

    /// Seconds between sync passes (overrides the config file)
    #[arg(long)]
    pub interval: Option<u64>,

    /// Do not log a line per downloaded file
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}
