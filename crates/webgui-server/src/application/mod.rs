//! Application layer: the use cases behind the WebSocket protocol.
//!
//! - [`dispatcher`] turns one inbound frame into one reply.
//! - [`change_monitor`] notices external mutation of the model.
//! - [`preview_service`] diffs captured HUD previews and batches the changes.
//! - [`events`] turns detected changes into broadcast envelopes.
//!
//! None of these own a socket; the infrastructure layer wires them to the
//! connection registry.

pub mod change_monitor;
pub mod dispatcher;
pub mod events;
pub mod preview_service;

pub use change_monitor::{ChangeEvent, ChangeMonitor, ChangeSink};
pub use dispatcher::{DispatchError, Dispatcher};
pub use preview_service::PreviewPublisher;
