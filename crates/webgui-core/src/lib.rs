//! # webgui-core
//!
//! Shared library for Meteor WebGUI containing the setting model, the typed
//! value codec, the in-process model adapters, the external registry
//! boundary and the HUD preview capture pipeline.
//!
//! This crate has zero dependencies on sockets, async runtimes or UI
//! frameworks.  Everything here can be exercised from a plain `#[test]`.
//!
//! # Architecture overview
//!
//! - **`setting`** – Named, typed, mutable value cells.  Every setting carries
//!   a fixed [`SettingKind`] tag that decides which [`SettingValue`] shape is
//!   legal, plus a first-class observer registration point used by the change
//!   monitor.
//!
//! - **`codec`** – Bidirectional mapping between settings and the
//!   self-describing JSON wire value (`{value}`, `{items: []}`,
//!   `{entries: []}`, ...), with strict validation against the registries.
//!
//! - **`model`** – Controllable units ("modules") and positioned overlay
//!   elements ("HUD elements"), the narrow capability interface the service
//!   observes and mutates.
//!
//! - **`registry`** – Named lookup tables (blocks, items, entity types, ...)
//!   that registry-keyed settings resolve against.
//!
//! - **`preview`** – The render-thread hot path that records what a HUD
//!   element drew during one pass and seals it into an immutable snapshot.

pub mod codec;
pub mod model;
pub mod preview;
pub mod registry;
pub mod setting;

// Re-export the most-used types at the crate root so callers can write
// `webgui_core::Setting` instead of `webgui_core::setting::Setting`.
pub use codec::{CodecError, DecodeContext};
pub use model::{Configurable, HudContent, HudElement, HudElementInfo, Model, ModelError, Module, Rect, SettingOwner};
pub use preview::{CaptureBuffer, HudRenderer, PreviewCapture, PreviewSnapshot, RenderError, TextLine};
pub use registry::{Identifier, RegistryEntry, RegistryKind, RegistryProvider, StaticRegistry};
pub use setting::{
    BlockPos, FontFace, FontStyle, Keybind, Setting, SettingColor, SettingError, SettingGroup, SettingKind, SettingValue,
    Settings, Vector3d,
};
