//! Wiring and lifecycle of the sync service.
//!
//! [`SyncService::start`] builds the connection registry, installs the change
//! monitor on the model, switches capture on and spawns the two background
//! tasks:
//!
//! - **preview publisher**, every `preview_interval`: diff captured HUD
//!   snapshots and broadcast the changed ones as one `hud.preview.update`;
//! - **HUD scan**, every `hud_scan_interval`: diff HUD activation and prune
//!   previews of elements that no longer exist.
//!
//! Both use `MissedTickBehavior::Skip`, so a slow tick is never followed by a
//! burst of catch-up ticks, and each loop body runs to completion before the
//! next tick is awaited.
//!
//! [`SyncService::shutdown`] tears down in a fixed order: disable capture,
//! stop the background tasks and the accept loop, uninstall the monitor's
//! hooks, then close and release every connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use webgui_core::{Model, PreviewCapture, RegistryProvider};

use crate::application::{ChangeMonitor, Dispatcher, PreviewPublisher};
use crate::domain::ServerConfig;
use crate::infrastructure::connections::ConnectionRegistry;
use crate::infrastructure::ws_server::{self, ServerContext};

/// How long shutdown waits for a background task before aborting it.
const TASK_STOP_TIMEOUT: Duration = Duration::from_secs(2);

pub struct SyncService {
    config: ServerConfig,
    model: Arc<Mutex<Model>>,
    capture: Arc<PreviewCapture>,
    connections: Arc<ConnectionRegistry>,
    monitor: Arc<ChangeMonitor>,
    publisher: Arc<PreviewPublisher>,
    context: Arc<ServerContext>,
    running: Arc<AtomicBool>,
    stop: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl SyncService {
    /// Installs the monitor, enables capture (if configured) and spawns the
    /// background tasks.  Must be called from inside a Tokio runtime.
    pub fn start(
        config: ServerConfig,
        model: Arc<Mutex<Model>>,
        registries: Arc<dyn RegistryProvider>,
        capture: Arc<PreviewCapture>,
    ) -> Self {
        let connections = Arc::new(ConnectionRegistry::new(config.outbound_queue));
        let monitor = Arc::new(ChangeMonitor::new(connections.clone()));
        monitor.install(&mut lock(&model));

        capture.set_enabled(config.capture_enabled);
        let publisher = Arc::new(PreviewPublisher::new(Arc::clone(&capture)));
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&model), registries, Arc::clone(&capture)));
        let context = Arc::new(ServerContext {
            dispatcher,
            connections: Arc::clone(&connections),
        });

        let (stop, stop_rx) = watch::channel(false);
        let tasks = vec![
            (
                "preview publisher",
                tokio::spawn(publish_previews(
                    Arc::clone(&publisher),
                    Arc::clone(&connections),
                    config.preview_interval,
                    stop_rx.clone(),
                )),
            ),
            (
                "HUD scan",
                tokio::spawn(scan_hud(
                    Arc::clone(&model),
                    Arc::clone(&monitor),
                    Arc::clone(&publisher),
                    config.hud_scan_interval,
                    stop_rx,
                )),
            ),
        ];

        info!(
            "sync service started (preview every {:?}, HUD scan every {:?}, capture {})",
            config.preview_interval,
            config.hud_scan_interval,
            if config.capture_enabled { "on" } else { "off" }
        );

        Self {
            config,
            model,
            capture,
            connections,
            monitor,
            publisher,
            context,
            running: Arc::new(AtomicBool::new(true)),
            stop,
            tasks,
        }
    }

    /// Accepts WebSocket connections on the configured address until
    /// [`shutdown`](Self::shutdown) clears the running flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn serve(&self) -> anyhow::Result<()> {
        ws_server::run_server(self.config.bind_addr, self.context(), self.running()).await
    }

    pub fn context(&self) -> Arc<ServerContext> {
        Arc::clone(&self.context)
    }

    /// The flag the accept loop polls.
    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn connections(&self) -> &Arc<ConnectionRegistry> {
        &self.connections
    }

    pub fn monitor(&self) -> &Arc<ChangeMonitor> {
        &self.monitor
    }

    pub fn publisher(&self) -> &Arc<PreviewPublisher> {
        &self.publisher
    }

    pub fn capture(&self) -> &Arc<PreviewCapture> {
        &self.capture
    }

    /// Disables capture, stops the background tasks and the accept loop,
    /// uninstalls the monitor, then closes every connection.
    pub async fn shutdown(self) {
        info!("sync service shutting down");
        self.capture.set_enabled(false);

        self.running.store(false, Ordering::Relaxed);
        let _ = self.stop.send(true);
        for (name, mut task) in self.tasks {
            match tokio::time::timeout(TASK_STOP_TIMEOUT, &mut task).await {
                Ok(Ok(())) => debug!("{name} task stopped"),
                Ok(Err(e)) => error!("{name} task failed: {e}"),
                Err(_) => {
                    warn!("{name} task did not stop in time; aborting");
                    task.abort();
                }
            }
        }

        self.monitor.uninstall(&mut lock(&self.model));

        self.connections.close_all();
        info!("sync service stopped");
    }
}

fn lock(model: &Mutex<Model>) -> MutexGuard<'_, Model> {
    model.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Background tasks ──────────────────────────────────────────────────────────

async fn publish_previews(
    publisher: Arc<PreviewPublisher>,
    connections: Arc<ConnectionRegistry>,
    period: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = stop.changed() => break,
        }
        if *stop.borrow() {
            break;
        }
        let Some(update) = publisher.cycle() else {
            continue;
        };
        match update.to_text() {
            Ok(text) => {
                connections.broadcast(&text);
            }
            Err(e) => error!("failed to serialize preview update: {e}"),
        }
    }
}

async fn scan_hud(
    model: Arc<Mutex<Model>>,
    monitor: Arc<ChangeMonitor>,
    publisher: Arc<PreviewPublisher>,
    period: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = stop.changed() => break,
        }
        if *stop.borrow() {
            break;
        }
        let model = lock(&model);
        monitor.scan_hud(&model);
        let live: Vec<String> = model.hud_elements().iter().map(|e| e.identifier()).collect();
        drop(model);
        publisher.prune(&live);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
