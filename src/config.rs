use anyhow::{Context, Result};
use std::{env, net::SocketAddr, path::PathBuf};

/// Runtime configuration, read once from the environment at startup.
/// Defaults match the local development stack so every binary runs with no
/// variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// Record-store table holding one item per plant.
    pub table_name: String,
    /// Root directory the filesystem object store keeps its buckets under.
    pub data_root: PathBuf,
    pub bucket: String,
    /// Prefix new objects arrive under. Always ends with `/`.
    pub incoming_prefix: String,
    /// Prefix objects are relocated to after a successful load. Always ends
    /// with `/`.
    pub processed_prefix: String,
    pub db_path: PathBuf,
    /// Seconds the poller sleeps between discovery passes.
    pub poll_seconds: u64,
    pub api_addr: SocketAddr,
    /// Optional YAML file overriding the built-in header alias table.
    pub alias_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            table_name: var_or("TABLE_NAME", "egrid_plants"),
            data_root: var_or("DATA_ROOT", "data").into(),
            bucket: var_or("S3_BUCKET", "egrid"),
            incoming_prefix: with_trailing_slash(var_or("S3_INCOMING_PREFIX", "incoming/")),
            processed_prefix: with_trailing_slash(var_or("S3_PROCESSED_PREFIX", "processed/")),
            db_path: var_or("DB_PATH", "data/egrid.db").into(),
            poll_seconds: var_or("POLL_SECONDS", "5")
                .parse()
                .context("POLL_SECONDS must be an integer")?,
            api_addr: var_or("API_ADDR", "0.0.0.0:8000")
                .parse()
                .context("API_ADDR must be host:port")?,
            alias_file: env::var("ALIAS_FILE").ok().map(PathBuf::from),
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn with_trailing_slash(prefix: String) -> String {
    if prefix.is_empty() || prefix.ends_with('/') {
        prefix
    } else {
        format!("{}/", prefix)
    }
}
