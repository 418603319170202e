//! HUD preview capture.
//!
//! Two phases:
//!
//! 1. **Capture** (render thread, once per active element per frame): the
//!    caller opens a [`CaptureBuffer`] with [`PreviewCapture::begin`], hands it
//!    to a [`HudRenderer`], and seals it with [`PreviewCapture::finish`].
//!    Text draws become [`TextLine`]s; any other primitive sets a single
//!    "has non-text" flag.
//! 2. **Publish** (background task, every ~200 ms): reads
//!    [`PreviewCapture::snapshots`], compares each
//!    [`PreviewSnapshot::fingerprint`] with the last one published, and sends
//!    only what changed.  That side lives in the server crate.

mod capture;
mod render;
mod snapshot;

pub use capture::{CaptureBuffer, PreviewCapture, MAX_LINES_PER_PASS};
pub use render::{HudRenderer, RenderError};
pub use snapshot::{PreviewSnapshot, TextLine};
