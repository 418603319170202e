//! Domain layer: configuration and the JSON wire vocabulary.
//!
//! Nothing in here touches sockets or the runtime; both modules are plain
//! data plus (de)serialization.

pub mod config;
pub mod messages;

pub use config::{load_config, ConfigError, ConfigFile, ServerConfig};
pub use messages::{Envelope, MessageKind, OwnerName};
