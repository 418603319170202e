//! Infrastructure layer: sockets, background tasks and the sample host.
//!
//! **Dependency rule**: this layer may depend on `application`, `domain` and
//! `webgui_core`, but MUST NOT be imported by the `application` or domain
//! layers.

pub mod connections;
pub mod demo_host;
pub mod service;
pub mod ws_server;

pub use connections::{ConnectionRegistry, SendError};
pub use service::SyncService;
pub use ws_server::{run_server, serve_listener, ServerContext};
