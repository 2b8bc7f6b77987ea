use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::downloader::{DownloadOptions, DEFAULT_CHUNK_SIZE};
use crate::transport::CurlOptions;

/// Per-segment libcurl deadlines (`[timeouts]` table in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Seconds allowed for the TCP/TLS (and FTP login) handshake.
    pub connect_secs: u64,
    /// A segment slower than this many bytes/sec...
    pub low_speed_limit: u32,
    /// ...for this many seconds is aborted as timed out.
    pub low_speed_time_secs: u64,
    /// Hard deadline for one segment; 0 disables it.
    pub segment_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 30,
            low_speed_limit: 1024,
            low_speed_time_secs: 60,
            segment_secs: 0,
        }
    }
}

/// Global configuration loaded from `~/.config/nitro/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NitroConfig {
    /// Segments per download when `--parallel` is not given.
    pub default_segments: u8,
    /// Segment read/write chunk size, also used as libcurl's receive buffer.
    pub segment_buffer_bytes: usize,
    pub timeouts: TimeoutConfig,
    /// User-Agent sent on HTTP requests; built-in `nitro/<version>` when unset.
    pub user_agent: Option<String>,
}

impl Default for NitroConfig {
    fn default() -> Self {
        Self {
            default_segments: default_segments(),
            segment_buffer_bytes: DEFAULT_CHUNK_SIZE,
            timeouts: TimeoutConfig::default(),
            user_agent: None,
        }
    }
}

/// One segment per available CPU, capped at 255.
fn default_segments() -> u8 {
    std::thread::available_parallelism()
        .map(|n| u8::try_from(n.get()).unwrap_or(u8::MAX))
        .unwrap_or(4)
}

impl NitroConfig {
    /// libcurl options for probes and segment transfers.
    pub fn curl_options(&self) -> CurlOptions {
        let defaults = CurlOptions::default();
        let t = &self.timeouts;
        CurlOptions {
            connect_timeout: Duration::from_secs(t.connect_secs),
            low_speed_limit: t.low_speed_limit,
            low_speed_time: Duration::from_secs(t.low_speed_time_secs),
            segment_timeout: (t.segment_secs > 0).then(|| Duration::from_secs(t.segment_secs)),
            buffer_size: self.segment_buffer_bytes.max(1),
            user_agent: self.user_agent.clone().or(defaults.user_agent),
        }
    }

    /// Download options for `segment_count` segments (the configured default
    /// when `None`).
    pub fn download_options(&self, segment_count: Option<u8>) -> DownloadOptions {
        DownloadOptions {
            segment_count: segment_count.unwrap_or(self.default_segments).max(1),
            chunk_size: self.segment_buffer_bytes.max(1),
            curl: self.curl_options(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("nitro")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<NitroConfig> {
    load_or_init_at(&config_path()?)
}

/// `load_or_init` against an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<NitroConfig> {
    if !path.exists() {
        let default_cfg = NitroConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let cfg: NitroConfig =
        toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    Ok(cfg)
}
