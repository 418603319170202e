//! JSON message types for the browser-facing WebSocket protocol.
//!
//! Every frame is a text frame holding one [`Envelope`]:
//!
//! ```json
//! {"type":"module.toggle","data":{"moduleName":"Flight"},"id":"42"}
//! ```
//!
//! `type` selects the message kind from a fixed vocabulary
//! ([`MessageKind`]), `data` is kind-specific, and `id` is an optional
//! correlation token the server echoes on the matching reply.  Broadcasts
//! never carry an `id`.
//!
//! Request payloads are deserialized into the typed structs below; reply and
//! event payloads are serialized from them.  All field names are camelCase
//! on the wire.

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;
use webgui_core::{PreviewSnapshot, Rect, SettingOwner};

// ── Envelope ──────────────────────────────────────────────────────────────────

/// The `{type, data, id?}` wrapper around every message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub data: Value,

    /// Correlation id.  Numbers are accepted on input and kept as their
    /// decimal string.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "correlation_id")]
    pub id: Option<String>,
}

impl Envelope {
    /// Wraps `data` as the payload of a `kind` message.  A payload that
    /// fails to serialize is logged and sent as `null`.
    pub fn new(kind: MessageKind, data: impl Serialize) -> Self {
        let data = match serde_json::to_value(data) {
            Ok(value) => value,
            Err(e) => {
                error!("failed to serialize {} payload: {e}", kind.as_str());
                Value::Null
            }
        };
        Self {
            kind: kind.as_str().to_string(),
            data,
            id: None,
        }
    }

    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }

    /// An `error` envelope carrying `message`.
    pub fn error(message: impl Into<String>, id: Option<String>) -> Self {
        Self::new(
            MessageKind::Error,
            ErrorPayload {
                error: message.into(),
            },
        )
        .with_id(id)
    }

    /// Serializes to a text frame.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn correlation_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// ── Message kinds ─────────────────────────────────────────────────────────────

/// The fixed `type` vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    // Client → server
    ModuleToggle,
    ModuleList,
    SettingUpdate,
    SettingGet,
    RegistryRequest,
    HudToggle,
    Ping,

    // Server → client
    Response,
    Error,
    Pong,
    InitialState,
    ModuleStateChanged,
    SettingValueChanged,
    RegistryData,
    HudPreviewUpdate,
}

impl MessageKind {
    pub const REQUESTS: [MessageKind; 7] = [
        MessageKind::ModuleToggle,
        MessageKind::ModuleList,
        MessageKind::SettingUpdate,
        MessageKind::SettingGet,
        MessageKind::RegistryRequest,
        MessageKind::HudToggle,
        MessageKind::Ping,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::ModuleToggle => "module.toggle",
            MessageKind::ModuleList => "module.list",
            MessageKind::SettingUpdate => "setting.update",
            MessageKind::SettingGet => "setting.get",
            MessageKind::RegistryRequest => "registry.request",
            MessageKind::HudToggle => "hud.toggle",
            MessageKind::Ping => "ping",
            MessageKind::Response => "response",
            MessageKind::Error => "error",
            MessageKind::Pong => "pong",
            MessageKind::InitialState => "initial.state",
            MessageKind::ModuleStateChanged => "module.state.changed",
            MessageKind::SettingValueChanged => "setting.value.changed",
            MessageKind::RegistryData => "registry.data",
            MessageKind::HudPreviewUpdate => "hud.preview.update",
        }
    }

    /// Parses a client → server kind.  Server-only kinds are not requests
    /// and yield `None`.
    pub fn parse_request(kind: &str) -> Option<Self> {
        Self::REQUESTS.into_iter().find(|k| k.as_str() == kind)
    }
}

// ── Request payloads ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleToggleRequest {
    pub module_name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HudToggleRequest {
    #[serde(alias = "moduleName")]
    pub element_name: String,
}

/// Addresses one setting.  `moduleName` may name a module or, when no
/// module matches, a HUD element identity.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingGetRequest {
    #[serde(alias = "elementName")]
    pub module_name: String,
    pub setting_name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingUpdateRequest {
    #[serde(alias = "elementName")]
    pub module_name: String,
    pub setting_name: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryRequest {
    #[serde(alias = "registryType")]
    pub registry: String,
}

// ── Reply and event payloads ──────────────────────────────────────────────────

/// Flattened into payloads as either `moduleName` or `elementName`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum OwnerName {
    #[serde(rename = "moduleName")]
    Module(String),
    #[serde(rename = "elementName")]
    Hud(String),
}

impl From<&SettingOwner> for OwnerName {
    fn from(owner: &SettingOwner) -> Self {
        match owner {
            SettingOwner::Module(name) => OwnerName::Module(name.clone()),
            SettingOwner::Hud(identity) => OwnerName::Hud(identity.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
    pub error: String,
}

/// Reply to `module.toggle` and `hud.toggle`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Toggled {
    pub success: bool,
    #[serde(flatten)]
    pub target: OwnerName,
    pub active: bool,
}

/// Reply to `setting.update`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingUpdated {
    pub success: bool,
    #[serde(flatten)]
    pub target: OwnerName,
    pub setting_name: String,
}

/// `module.state.changed` for a module.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleStateChanged {
    pub module_name: String,
    pub active: bool,
}

/// `module.state.changed` for a HUD element, with its current bounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HudStateChanged {
    pub element_name: String,
    pub active: bool,
    #[serde(flatten)]
    pub bounds: Rect,
}

/// `setting.value.changed`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingValueChanged {
    #[serde(flatten)]
    pub target: OwnerName,
    pub setting_name: String,
    pub value: Value,
}

/// `hud.preview.update`: every element whose preview changed this cycle.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewUpdate<'a> {
    pub elements: Vec<&'a PreviewSnapshot>,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
