//! Low-frequency side of the HUD preview pipeline.
//!
//! The render thread keeps the latest [`PreviewSnapshot`] per element in
//! [`PreviewCapture`].  Every preview interval [`PreviewPublisher`] reads
//! those snapshots, fingerprints each one and returns only the elements whose
//! fingerprint differs from the last one it published.  The whole batch goes
//! out as a single `hud.preview.update` broadcast.
//!
//! The fingerprint table is keyed to the capture generation: when capture is
//! disabled (which bumps the generation and clears every snapshot) the table
//! is dropped too, so a later enable starts from an empty baseline.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;
use webgui_core::{PreviewCapture, PreviewSnapshot};

use crate::domain::messages::PreviewUpdate;
use crate::domain::{Envelope, MessageKind};

#[derive(Debug, Default)]
struct Published {
    generation: u64,
    fingerprints: HashMap<String, u64>,
}

#[derive(Debug)]
pub struct PreviewPublisher {
    capture: Arc<PreviewCapture>,
    published: Mutex<Published>,
}

impl PreviewPublisher {
    pub fn new(capture: Arc<PreviewCapture>) -> Self {
        let generation = capture.generation();
        Self {
            capture,
            published: Mutex::new(Published {
                generation,
                fingerprints: HashMap::new(),
            }),
        }
    }

    pub fn capture(&self) -> &Arc<PreviewCapture> {
        &self.capture
    }

    /// Snapshots that changed since the previous call, sorted by identity.
    pub fn collect_changed(&self) -> Vec<Arc<PreviewSnapshot>> {
        let mut published = self.lock();
        let generation = self.capture.generation();
        if published.generation != generation {
            debug!("capture generation {generation}: resetting published fingerprints");
            published.generation = generation;
            published.fingerprints.clear();
        }
        if !self.capture.is_enabled() {
            return Vec::new();
        }

        let snapshots = self.capture.snapshots();
        let mut changed = Vec::new();
        for snapshot in &snapshots {
            let fingerprint = snapshot.fingerprint();
            if published.fingerprints.insert(snapshot.name.clone(), fingerprint) != Some(fingerprint) {
                changed.push(Arc::clone(snapshot));
            }
        }
        if published.fingerprints.len() > snapshots.len() {
            published
                .fingerprints
                .retain(|identity, _| snapshots.iter().any(|s| s.name == *identity));
        }
        changed
    }

    /// Drops snapshots and fingerprints of elements not in `live`.
    pub fn prune(&self, live: &[String]) {
        self.capture.retain(live);
        self.lock().fingerprints.retain(|identity, _| live.contains(identity));
    }

    /// Runs one publish cycle and returns the broadcast, if anything changed.
    pub fn cycle(&self) -> Option<Envelope> {
        let changed = self.collect_changed();
        if changed.is_empty() {
            return None;
        }
        debug!("publishing {} changed HUD previews", changed.len());
        Some(Envelope::new(
            MessageKind::HudPreviewUpdate,
            PreviewUpdate {
                elements: changed.iter().map(|s| s.as_ref()).collect(),
            },
        ))
    }

    fn lock(&self) -> MutexGuard<'_, Published> {
        self.published.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
