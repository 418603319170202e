//! Server configuration types.
//!
//! [`ServerConfig`] is the single source of truth for runtime settings.  It
//! is built in three layers: built-in defaults, then an optional TOML file
//! ([`ConfigFile`], loaded with [`load_config`]), then CLI flags and
//! environment variables applied by `main.rs`.
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! outbound_queue = 128
//!
//! [preview]
//! enabled = true
//! interval_ms = 200
//!
//! [monitor]
//! hud_scan_interval_ms = 50
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Missing keys fall back to the defaults through `#[serde(default = ...)]`,
//! so a partial file is always valid.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PREVIEW_INTERVAL_MS: u64 = 200;
pub const DEFAULT_HUD_SCAN_INTERVAL_MS: u64 = 50;
pub const DEFAULT_OUTBOUND_QUEUE: usize = 128;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid bind address '{0}'")]
    InvalidAddress(String),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

// ── Runtime config ────────────────────────────────────────────────────────────

/// All runtime configuration for the sync service.
///
/// # Example
///
/// ```rust
/// use webgui_server::domain::ServerConfig;
///
/// let cfg = ServerConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 8080);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address the WebSocket server binds to.  Loopback by default; the
    /// protocol has no authentication.
    pub bind_addr: SocketAddr,

    /// How often the preview publisher diffs and broadcasts HUD snapshots.
    pub preview_interval: Duration,

    /// How often HUD elements are scanned for activation changes.
    pub hud_scan_interval: Duration,

    /// Per-connection outbound queue depth.  A connection whose queue is
    /// full when a broadcast arrives is dropped.
    pub outbound_queue: usize,

    /// Whether HUD preview capture is switched on at startup.
    pub capture_enabled: bool,

    /// `tracing` filter used when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for ServerConfig {
    /// | Field             | Default          |
    /// |-------------------|------------------|
    /// | bind_addr         | `127.0.0.1:8080` |
    /// | preview_interval  | 200 ms           |
    /// | hud_scan_interval | 50 ms            |
    /// | outbound_queue    | 128              |
    /// | capture_enabled   | `true`           |
    /// | log_level         | `"info"`         |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
            preview_interval: Duration::from_millis(DEFAULT_PREVIEW_INTERVAL_MS),
            hud_scan_interval: Duration::from_millis(DEFAULT_HUD_SCAN_INTERVAL_MS),
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            capture_enabled: true,
            log_level: default_log_level(),
        }
    }
}

// ── File schema ───────────────────────────────────────────────────────────────

/// On-disk configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub preview: PreviewSection,
    #[serde(default)]
    pub monitor: MonitorSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreviewSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_preview_interval_ms")]
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorSection {
    #[serde(default = "default_hud_scan_interval_ms")]
    pub hud_scan_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSection {
    /// `"error"`, `"warn"`, `"info"`, `"debug"` or `"trace"`, or any
    /// `EnvFilter` directive.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_outbound_queue() -> usize {
    DEFAULT_OUTBOUND_QUEUE
}
fn default_true() -> bool {
    true
}
fn default_preview_interval_ms() -> u64 {
    DEFAULT_PREVIEW_INTERVAL_MS
}
fn default_hud_scan_interval_ms() -> u64 {
    DEFAULT_HUD_SCAN_INTERVAL_MS
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            outbound_queue: default_outbound_queue(),
        }
    }
}

impl Default for PreviewSection {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: default_preview_interval_ms(),
        }
    }
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            hud_scan_interval_ms: default_hud_scan_interval_ms(),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ConfigFile {
    /// Validates the file and converts it to a [`ServerConfig`].
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidAddress`] when `host` is not an IP address, and
    /// [`ConfigError::Zero`] for zero intervals or queue depth.
    pub fn into_server_config(self) -> Result<ServerConfig, ConfigError> {
        let ip: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(self.server.host.clone()))?;
        if self.server.outbound_queue == 0 {
            return Err(ConfigError::Zero {
                field: "server.outbound_queue",
            });
        }
        if self.preview.interval_ms == 0 {
            return Err(ConfigError::Zero {
                field: "preview.interval_ms",
            });
        }
        if self.monitor.hud_scan_interval_ms == 0 {
            return Err(ConfigError::Zero {
                field: "monitor.hud_scan_interval_ms",
            });
        }

        Ok(ServerConfig {
            bind_addr: SocketAddr::new(ip, self.server.port),
            preview_interval: Duration::from_millis(self.preview.interval_ms),
            hud_scan_interval: Duration::from_millis(self.monitor.hud_scan_interval_ms),
            outbound_queue: self.server.outbound_queue,
            capture_enabled: self.preview.enabled,
            log_level: self.logging.level,
        })
    }
}

/// Reads and parses the TOML file at `path`.
///
/// # Errors
///
/// [`ConfigError::Io`] when the file cannot be read (including when it does
/// not exist; an explicitly named file is required) and
/// [`ConfigError::Parse`] when the TOML is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
