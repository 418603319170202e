use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use super::snapshot::{PreviewSnapshot, TextLine};
use crate::model::{HudElement, HudElementInfo, Rect};

/// Upper bound on text lines recorded in a single pass.
pub const MAX_LINES_PER_PASS: usize = 256;

/// Per-pass recording buffer.
///
/// Owned by whoever drives the render pass, so two passes can never write
/// into the same buffer.  Sealed into a [`PreviewSnapshot`] by
/// [`PreviewCapture::finish`].
#[derive(Debug)]
pub struct CaptureBuffer {
    identity: String,
    info: HudElementInfo,
    active: bool,
    bounds: Rect,
    has_non_text: bool,
    lines: Vec<TextLine>,
    generation: u64,
}

impl CaptureBuffer {
    /// Appends a text line.  Empty text and lines past
    /// [`MAX_LINES_PER_PASS`] are dropped.
    pub fn record_text(&mut self, text: &str, x: f64, y: f64, color: u32, shadow: bool, scale: f64) {
        if text.is_empty() || self.lines.len() >= MAX_LINES_PER_PASS {
            return;
        }
        self.lines.push(TextLine {
            text: text.to_string(),
            x,
            y,
            color,
            shadow,
            scale,
        });
    }

    pub fn mark_non_text(&mut self) {
        self.has_non_text = true;
    }

    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn lines(&self) -> &[TextLine] {
        &self.lines
    }

    pub fn has_non_text(&self) -> bool {
        self.has_non_text
    }

    fn seal(self, updated_at: u64) -> PreviewSnapshot {
        PreviewSnapshot {
            name: self.identity,
            title: self.info.title,
            description: self.info.description,
            group: self.info.group,
            active: self.active,
            bounds: self.bounds,
            has_non_text: self.has_non_text,
            updated_at,
            lines: self.lines,
        }
    }
}

/// Process-wide capture switch plus the latest snapshot per element.
///
/// `begin` is a single atomic load when capture is off.  Disabling bumps a
/// generation counter and clears every stored snapshot under the same lock
/// that `finish` takes, so a pass that began before the disable can never
/// land after it.
#[derive(Debug, Default)]
pub struct PreviewCapture {
    enabled: AtomicBool,
    generation: AtomicU64,
    snapshots: Mutex<HashMap<String, Arc<PreviewSnapshot>>>,
}

impl PreviewCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Incremented every time capture is disabled.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        let mut snapshots = self.lock();
        if enabled {
            self.enabled.store(true, Ordering::Release);
        } else {
            self.enabled.store(false, Ordering::Release);
            self.generation.fetch_add(1, Ordering::AcqRel);
            snapshots.clear();
        }
        info!("HUD preview capture {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Opens a buffer for one render pass of `element`, or `None` when
    /// capture is off.
    pub fn begin(&self, element: &HudElement) -> Option<CaptureBuffer> {
        if !self.is_enabled() {
            return None;
        }
        Some(CaptureBuffer {
            identity: element.identifier(),
            info: element.info().clone(),
            active: element.is_active(),
            bounds: element.bounds(),
            has_non_text: false,
            lines: Vec::new(),
            generation: self.generation(),
        })
    }

    /// Seals `buffer` and stores it as the element's latest snapshot.
    ///
    /// Returns `false` (and discards the buffer) if capture was disabled
    /// since the buffer was opened.
    pub fn finish(&self, buffer: CaptureBuffer) -> bool {
        let mut snapshots = self.lock();
        if !self.is_enabled() || buffer.generation != self.generation() {
            return false;
        }
        let snapshot = buffer.seal(now_millis());
        snapshots.insert(snapshot.name.clone(), Arc::new(snapshot));
        true
    }

    /// Drops stored snapshots whose identity is not in `live`.
    pub fn retain(&self, live: &[String]) {
        self.lock().retain(|identity, _| live.contains(identity));
    }

    pub fn snapshot(&self, identity: &str) -> Option<Arc<PreviewSnapshot>> {
        self.lock().get(identity).cloned()
    }

    /// Every stored snapshot, sorted by identity.
    pub fn snapshots(&self) -> Vec<Arc<PreviewSnapshot>> {
        let mut all: Vec<_> = self.lock().values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<PreviewSnapshot>>> {
        self.snapshots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HudContent;
    use crate::preview::{HudRenderer, RenderError};
    use crate::setting::Settings;

    struct Nothing;

    impl HudContent for Nothing {
        fn render(&self, _: &Settings, _: &mut HudRenderer<'_>) -> Result<(), RenderError> {
            Ok(())
        }
    }

    fn element() -> HudElement {
        HudElement::new(HudElementInfo::new("clock"), Nothing).activated()
    }

    #[test]
    fn test_begin_returns_none_when_disabled() {
        let capture = PreviewCapture::new();
        assert!(capture.begin(&element()).is_none());
    }

    #[test]
    fn test_finish_stores_snapshot() {
        // Arrange
        let capture = PreviewCapture::new();
        capture.set_enabled(true);
        let mut buffer = capture.begin(&element()).unwrap();
        buffer.record_text("12:00", 0.0, 0.0, 0xFFFF_FFFF, false, 1.0);
        buffer.record_text("", 0.0, 9.0, 0xFFFF_FFFF, false, 1.0);
        buffer.mark_non_text();

        // Act
        assert!(capture.finish(buffer));

        // Assert
        let snapshot = capture.snapshot("hud::clock#0").unwrap();
        assert_eq!(snapshot.lines.len(), 1);
        assert!(snapshot.has_non_text);
    }

    #[test]
    fn test_buffer_opened_before_disable_is_discarded() {
        // Arrange
        let capture = PreviewCapture::new();
        capture.set_enabled(true);
        let buffer = capture.begin(&element()).unwrap();

        // Act: disable and re-enable while the pass is in flight.
        capture.set_enabled(false);
        capture.set_enabled(true);
        let stored = capture.finish(buffer);

        // Assert
        assert!(!stored);
        assert!(capture.snapshots().is_empty());
        assert_eq!(capture.generation(), 1);
    }

    #[test]
    fn test_disable_clears_snapshots() {
        let capture = PreviewCapture::new();
        capture.set_enabled(true);
        let buffer = capture.begin(&element()).unwrap();
        capture.finish(buffer);

        capture.set_enabled(false);

        assert!(capture.snapshots().is_empty());
    }

    #[test]
    fn test_line_cap() {
        let capture = PreviewCapture::new();
        capture.set_enabled(true);
        let mut buffer = capture.begin(&element()).unwrap();
        for i in 0..(MAX_LINES_PER_PASS + 10) {
            buffer.record_text(&i.to_string(), 0.0, 0.0, 0, false, 1.0);
        }
        assert_eq!(buffer.lines().len(), MAX_LINES_PER_PASS);
    }

    #[test]
    fn test_retain_drops_removed_elements() {
        let capture = PreviewCapture::new();
        capture.set_enabled(true);
        capture.finish(capture.begin(&element()).unwrap());

        capture.retain(&[]);

        assert!(capture.snapshots().is_empty());
    }
}
