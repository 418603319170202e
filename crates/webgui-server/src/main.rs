//! Meteor WebGUI sync server: entry point.
//!
//! Serves the live module / setting / HUD model to browser viewers over
//! WebSocket.  Run standalone, the binary drives an in-process demo host; an
//! embedding supplies its own model through the library API instead.
//!
//! # Usage
//!
//! ```text
//! webgui-server [OPTIONS]
//!
//! Options:
//!   --bind <HOST>                 Listener address [default: 127.0.0.1]
//!   --port <PORT>                 Listener port [default: 8080]
//!   --preview-interval-ms <MS>    Preview publish period [default: 200]
//!   --config <PATH>               Optional TOML config file
//!   --no-capture                  Start with HUD preview capture disabled
//! ```
//!
//! # Configuration precedence
//!
//! Built-in defaults, then the TOML file, then CLI flags / environment
//! variables.
//!
//! | Variable                      | Flag                    |
//! |-------------------------------|-------------------------|
//! | `WEBGUI_BIND`                 | `--bind`                |
//! | `WEBGUI_PORT`                 | `--port`                |
//! | `WEBGUI_PREVIEW_INTERVAL_MS`  | `--preview-interval-ms` |
//! | `WEBGUI_CONFIG`               | `--config`              |
//!
//! `RUST_LOG` overrides the configured log level.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use webgui_core::PreviewCapture;
use webgui_server::domain::{load_config, ConfigFile, ServerConfig};
use webgui_server::infrastructure::{demo_host, SyncService};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Meteor WebGUI sync server.
///
/// Flags left unset fall back to the config file, then to built-in defaults.
#[derive(Debug, Parser)]
#[command(
    name = "webgui-server",
    about = "Live WebSocket view of Meteor modules, settings and HUD previews",
    version
)]
struct Cli {
    /// IP address to bind the WebSocket listener to.
    #[arg(long, env = "WEBGUI_BIND")]
    bind: Option<String>,

    /// TCP port of the WebSocket listener.
    #[arg(long, env = "WEBGUI_PORT")]
    port: Option<u16>,

    /// How often changed HUD previews are published, in milliseconds.
    #[arg(long, env = "WEBGUI_PREVIEW_INTERVAL_MS")]
    preview_interval_ms: Option<u64>,

    /// Path to a TOML config file.
    #[arg(long, env = "WEBGUI_CONFIG")]
    config: Option<PathBuf>,

    /// Start with HUD preview capture disabled.
    #[arg(long)]
    no_capture: bool,
}

impl Cli {
    /// Reads the config file (if any) and layers the CLI flags on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or if
    /// the merged values do not form a valid [`ServerConfig`].
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let mut file = match &self.config {
            Some(path) => load_config(path).with_context(|| format!("failed to load config from {}", path.display()))?,
            None => ConfigFile::default(),
        };

        if let Some(bind) = self.bind {
            file.server.host = bind;
        }
        if let Some(port) = self.port {
            file.server.port = port;
        }
        if let Some(ms) = self.preview_interval_ms {
            file.preview.interval_ms = ms;
        }
        if self.no_capture {
            file.preview.enabled = false;
        }

        file.into_server_config().context("invalid server configuration")
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_server_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .init();

    info!(
        "Meteor WebGUI server starting: ws://{}, preview every {:?}",
        config.bind_addr, config.preview_interval
    );

    let (model, registry) = demo_host::build()?;
    let capture = Arc::new(PreviewCapture::new());
    let service = SyncService::start(config, Arc::clone(&model), registry, Arc::clone(&capture));
    let render = demo_host::spawn_render_loop(model, capture, service.running());

    let running: Arc<AtomicBool> = service.running();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                running.store(false, Ordering::Relaxed);
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    let served = service.serve().await;
    service.shutdown().await;
    if let Err(e) = render.await {
        error!("demo render loop failed: {e}");
    }

    served?;
    info!("Meteor WebGUI server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_cli_defaults_leave_overrides_unset() {
        // Arrange / Act
        let cli = Cli::parse_from(["webgui-server"]);

        // Assert
        assert_eq!(cli.bind, None);
        assert_eq!(cli.port, None);
        assert_eq!(cli.preview_interval_ms, None);
        assert!(!cli.no_capture);
    }

    #[test]
    fn test_into_server_config_defaults() {
        let config = Cli::parse_from(["webgui-server"]).into_server_config().unwrap();

        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.preview_interval, Duration::from_millis(200));
        assert!(config.capture_enabled);
    }

    #[test]
    fn test_cli_port_override() {
        let cli = Cli::parse_from(["webgui-server", "--port", "9000"]);
        let config = cli.into_server_config().unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
    }

    #[test]
    fn test_cli_bind_override() {
        let cli = Cli::parse_from(["webgui-server", "--bind", "0.0.0.0"]);
        let config = cli.into_server_config().unwrap();
        assert_eq!(config.bind_addr.ip().to_string(), "0.0.0.0");
    }

    #[test]
    fn test_cli_preview_interval_override() {
        let cli = Cli::parse_from(["webgui-server", "--preview-interval-ms", "500"]);
        let config = cli.into_server_config().unwrap();
        assert_eq!(config.preview_interval, Duration::from_millis(500));
    }

    #[test]
    fn test_no_capture_flag_disables_capture() {
        let cli = Cli::parse_from(["webgui-server", "--no-capture"]);
        let config = cli.into_server_config().unwrap();
        assert!(!config.capture_enabled);
    }

    #[test]
    fn test_invalid_bind_returns_error() {
        // Arrange
        let cli = Cli {
            bind: Some("not.an.ip".to_string()),
            port: None,
            preview_interval_ms: None,
            config: None,
            no_capture: false,
        };

        // Act
        let result = cli.into_server_config();

        // Assert: must return an error, not panic
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_flags_override_config_file() {
        // Arrange
        let path = std::env::temp_dir().join(format!("webgui-main-{}.toml", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[server]\nport = 7000\n\n[preview]\ninterval_ms = 100").unwrap();
        drop(file);

        // Act
        let cli = Cli::parse_from([
            "webgui-server",
            "--config",
            path.to_str().unwrap(),
            "--preview-interval-ms",
            "300",
        ]);
        let config = cli.into_server_config().unwrap();
        std::fs::remove_file(&path).unwrap();

        // Assert
        assert_eq!(config.bind_addr.port(), 7000);
        assert_eq!(config.preview_interval, Duration::from_millis(300));
    }

    #[test]
    fn test_missing_config_file_returns_error() {
        let cli = Cli::parse_from(["webgui-server", "--config", "/nonexistent/webgui.toml"]);
        assert!(cli.into_server_config().is_err());
    }
}
