//! webgui-server library entry point.
//!
//! Exposes the module tree so that integration tests in `tests/` and the
//! binary entry point in `main.rs` share it.
//!
//! ```text
//! Browser viewers  (JSON envelopes over WebSocket)
//!       ↕
//! infrastructure/  ws_server, connections, service, demo_host
//! application/     dispatcher, change_monitor, preview_service, events
//! domain/          config, messages
//!       ↕
//! webgui_core      Model, settings, codec, registries, preview capture
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;
