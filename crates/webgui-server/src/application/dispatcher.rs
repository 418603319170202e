//! Protocol dispatcher: one inbound text frame in, one reply envelope out.
//!
//! The dispatcher is stateless per message.  It parses the envelope, routes
//! strictly by `type`, runs the request against the shared [`Model`] and
//! returns the reply carrying the request's correlation id.  Every failure
//! (malformed JSON, unknown kind, bad payload, unknown module, element or
//! setting, codec rejection) becomes an `error` envelope with that same id;
//! nothing is dropped and nothing closes the connection.
//!
//! The model lock is held only for the duration of one request and never
//! across an `.await`.  Setting updates go through [`apply`], so the change
//! monitor's observers fire (and broadcast) while the lock is still held;
//! the broadcast path never takes the model lock, which keeps the lock order
//! model → monitor → connections.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};
use webgui_core::codec::{apply, setting_metadata, CodecError, DecodeContext};
use webgui_core::{
    Configurable, HudElement, Model, ModelError, Module, PreviewCapture, PreviewSnapshot, RegistryKind,
    RegistryProvider, SettingOwner,
};

use crate::domain::messages::{
    HudToggleRequest, ModuleToggleRequest, OwnerName, RegistryRequest, SettingGetRequest,
    SettingUpdateRequest, SettingUpdated, Toggled,
};
use crate::domain::{Envelope, MessageKind};

/// Registry names accepted by `registry.request`.
pub const REGISTRY_NAMES: [&str; 6] = ["blocks", "items", "entities", "statusEffects", "potions", "modules"];

/// Reasons a request produced an `error` reply.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Unknown message type: {0}")]
    UnknownKind(String),

    #[error("Invalid {kind} payload: {reason}")]
    InvalidPayload { kind: &'static str, reason: String },

    #[error("{0}")]
    Model(#[from] ModelError),

    #[error("Config target not found: {0}")]
    TargetNotFound(String),

    #[error("Setting not found: {setting} (in {owner})")]
    SettingNotFound { owner: SettingOwner, setting: String },

    #[error("Unknown registry type: {0}")]
    UnknownRegistry(String),

    #[error("Failed to update {owner} setting '{setting}': {source}")]
    Codec {
        owner: SettingOwner,
        setting: String,
        #[source]
        source: CodecError,
    },
}

pub struct Dispatcher {
    model: Arc<Mutex<Model>>,
    registries: Arc<dyn RegistryProvider>,
    capture: Arc<PreviewCapture>,
}

impl Dispatcher {
    pub fn new(model: Arc<Mutex<Model>>, registries: Arc<dyn RegistryProvider>, capture: Arc<PreviewCapture>) -> Self {
        Self {
            model,
            registries,
            capture,
        }
    }

    /// Handles one inbound text frame.
    pub fn handle_text(&self, text: &str) -> Envelope {
        let raw: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => return self.fail(DispatchError::Malformed(e.to_string()), None),
        };
        let id = correlation_id(&raw);
        match serde_json::from_value::<Envelope>(raw) {
            Ok(envelope) => self.dispatch(envelope),
            Err(e) => self.fail(DispatchError::Malformed(e.to_string()), id),
        }
    }

    /// Routes a parsed envelope and attaches its correlation id to the reply.
    pub fn dispatch(&self, envelope: Envelope) -> Envelope {
        let id = envelope.id.clone();
        match self.route(&envelope) {
            Ok(reply) => reply.with_id(id),
            Err(e) => self.fail(e, id),
        }
    }

    /// The baseline pushed to every new connection:
    /// `{modules: {category: [module]}, hud: {elements, previews}}`.
    pub fn initial_state(&self) -> Envelope {
        self.build_initial_state(&self.lock())
    }

    /// Builds the initial state and passes it to `register` while the model
    /// is still locked, so no change broadcast can fall between the two.
    pub fn with_initial_state<R>(&self, register: impl FnOnce(Envelope) -> R) -> R {
        let model = self.lock();
        register(self.build_initial_state(&model))
    }

    fn build_initial_state(&self, model: &Model) -> Envelope {
        let snapshots = self.capture.snapshots();
        Envelope::new(
            MessageKind::InitialState,
            json!({
                "modules": modules_full(model),
                "hud": {
                    "elements": model.hud_elements().iter().map(hud_element_json).collect::<Vec<_>>(),
                    "previews": snapshots.iter().map(|s| s.as_ref()).collect::<Vec<&PreviewSnapshot>>(),
                },
            }),
        )
    }

    fn fail(&self, error: DispatchError, id: Option<String>) -> Envelope {
        warn!("request failed{}: {error}", id.as_deref().map(|i| format!(" (id {i})")).unwrap_or_default());
        Envelope::error(error.to_string(), id)
    }

    fn route(&self, envelope: &Envelope) -> Result<Envelope, DispatchError> {
        let kind = MessageKind::parse_request(&envelope.kind)
            .ok_or_else(|| DispatchError::UnknownKind(envelope.kind.clone()))?;
        debug!("received {}", kind.as_str());

        match kind {
            MessageKind::Ping => Ok(Envelope::new(MessageKind::Pong, json!({}))),
            MessageKind::ModuleToggle => self.module_toggle(payload(kind, &envelope.data)?),
            MessageKind::ModuleList => Ok(self.module_list()),
            MessageKind::HudToggle => self.hud_toggle(payload(kind, &envelope.data)?),
            MessageKind::SettingGet => self.setting_get(payload(kind, &envelope.data)?),
            MessageKind::SettingUpdate => self.setting_update(payload(kind, &envelope.data)?),
            MessageKind::RegistryRequest => self.registry_request(payload(kind, &envelope.data)?),
            _ => Err(DispatchError::UnknownKind(envelope.kind.clone())),
        }
    }

    // ── Handlers ──────────────────────────────────────────────────────────

    fn module_toggle(&self, req: ModuleToggleRequest) -> Result<Envelope, DispatchError> {
        let active = self.lock().toggle_module(&req.module_name)?;
        info!("toggled module {} -> {active}", req.module_name);
        Ok(response(Toggled {
            success: true,
            target: OwnerName::Module(req.module_name),
            active,
        }))
    }

    fn module_list(&self) -> Envelope {
        let model = self.lock();
        let mut by_category = Map::new();
        for (category, modules) in model.modules_by_category() {
            let list = modules
                .iter()
                .map(|m| {
                    json!({
                        "name": m.name(),
                        "title": m.title(),
                        "description": m.description(),
                        "active": m.is_active(),
                        "addon": m.addon(),
                    })
                })
                .collect();
            by_category.insert(category.to_string(), Value::Array(list));
        }
        response(json!({ "modules": by_category }))
    }

    fn hud_toggle(&self, req: HudToggleRequest) -> Result<Envelope, DispatchError> {
        let (identity, active) = self.lock().toggle_hud(&req.element_name)?;
        info!("toggled HUD element {identity} -> {active}");
        Ok(response(Toggled {
            success: true,
            target: OwnerName::Hud(identity),
            active,
        }))
    }

    fn setting_get(&self, req: SettingGetRequest) -> Result<Envelope, DispatchError> {
        let model = self.lock();
        let owner = model
            .find_owner(&req.module_name)
            .ok_or_else(|| DispatchError::TargetNotFound(req.module_name.clone()))?;
        let setting = owner
            .settings()
            .find(&req.setting_name)
            .ok_or_else(|| DispatchError::SettingNotFound {
                owner: owner.owner(),
                setting: req.setting_name.clone(),
            })?;
        Ok(response(json!({ "setting": setting_metadata(setting) })))
    }

    fn setting_update(&self, req: SettingUpdateRequest) -> Result<Envelope, DispatchError> {
        let mut model = self.lock();
        let module_names = model.module_names();
        let target = model
            .find_owner_mut(&req.module_name)
            .ok_or_else(|| DispatchError::TargetNotFound(req.module_name.clone()))?;
        let owner = target.owner();
        let setting = target
            .settings_mut()
            .find_mut(&req.setting_name)
            .ok_or_else(|| DispatchError::SettingNotFound {
                owner: owner.clone(),
                setting: req.setting_name.clone(),
            })?;

        let ctx = DecodeContext::new(self.registries.as_ref(), &module_names);
        apply(setting, &req.value, &ctx).map_err(|source| DispatchError::Codec {
            owner: owner.clone(),
            setting: req.setting_name.clone(),
            source,
        })?;
        info!("updated {owner} setting '{}'", req.setting_name);

        Ok(response(SettingUpdated {
            success: true,
            target: OwnerName::from(&owner),
            setting_name: req.setting_name,
        }))
    }

    fn registry_request(&self, req: RegistryRequest) -> Result<Envelope, DispatchError> {
        let registries = self.registries.as_ref();
        let content = match req.registry.as_str() {
            "blocks" => keyed_registry(registries, RegistryKind::Block, "blocks"),
            "items" => keyed_registry(registries, RegistryKind::Item, "items"),
            "entities" => keyed_registry(registries, RegistryKind::EntityType, "entities"),
            "statusEffects" => flat_registry(registries, RegistryKind::StatusEffect),
            "potions" => flat_registry(registries, RegistryKind::Potion),
            "modules" => modules_registry(&self.lock()),
            other => return Err(DispatchError::UnknownRegistry(other.to_string())),
        };
        info!("sending {} registry", req.registry);

        let mut data = Map::new();
        data.insert(req.registry.clone(), content);
        data.insert("registryType".into(), Value::String(req.registry));
        Ok(Envelope::new(MessageKind::RegistryData, data))
    }

    fn lock(&self) -> MutexGuard<'_, Model> {
        self.model.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn response(data: impl serde::Serialize) -> Envelope {
    Envelope::new(MessageKind::Response, data)
}

fn payload<T: DeserializeOwned>(kind: MessageKind, data: &Value) -> Result<T, DispatchError> {
    T::deserialize(data).map_err(|e| DispatchError::InvalidPayload {
        kind: kind.as_str(),
        reason: e.to_string(),
    })
}

/// Best-effort id from a frame that failed envelope validation.
fn correlation_id(raw: &Value) -> Option<String> {
    match raw.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn setting_groups(target: &dyn Configurable) -> Value {
    target
        .settings()
        .groups()
        .iter()
        .map(|group| {
            json!({
                "name": group.name(),
                "settings": group.settings().iter().map(setting_metadata).collect::<Vec<_>>(),
            })
        })
        .collect()
}

fn module_json(module: &Module) -> Value {
    json!({
        "name": module.name(),
        "title": module.title(),
        "description": module.description(),
        "category": module.category(),
        "active": module.is_active(),
        "addon": module.addon(),
        "settingGroups": setting_groups(module),
    })
}

fn modules_full(model: &Model) -> Map<String, Value> {
    model
        .modules_by_category()
        .into_iter()
        .map(|(category, modules)| {
            (
                category.to_string(),
                Value::Array(modules.into_iter().map(module_json).collect()),
            )
        })
        .collect()
}

fn hud_element_json(element: &HudElement) -> Value {
    let info = element.info();
    let bounds = element.bounds();
    json!({
        "name": element.identifier(),
        "title": info.title,
        "description": info.description,
        "group": info.group,
        "category": "HUD",
        "addon": info.group,
        "active": element.is_active(),
        "x": bounds.x,
        "y": bounds.y,
        "width": bounds.width,
        "height": bounds.height,
        "settingGroups": setting_groups(element),
    })
}

/// `{<field>: [{id, namespace}], byNamespace: {ns: [id]}}`
fn keyed_registry(registries: &dyn RegistryProvider, kind: RegistryKind, field: &str) -> Value {
    let entries = registries.enumerate(kind);
    let mut by_namespace: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for entry in &entries {
        by_namespace.entry(entry.namespace()).or_default().push(entry.key());
    }
    json!({
        field: entries
            .iter()
            .map(|e| json!({"id": e.key(), "namespace": e.namespace()}))
            .collect::<Vec<_>>(),
        "byNamespace": by_namespace,
    })
}

/// `[{id, namespace}]`
fn flat_registry(registries: &dyn RegistryProvider, kind: RegistryKind) -> Value {
    registries
        .enumerate(kind)
        .iter()
        .map(|e| json!({"id": e.key(), "namespace": e.namespace()}))
        .collect()
}

/// `{byCategory: {category: [{name, title, category}]}}`, every module
/// including those in the `hud` category.
fn modules_registry(model: &Model) -> Value {
    let mut by_category: BTreeMap<&str, Vec<Value>> = BTreeMap::new();
    for module in model.modules() {
        by_category.entry(module.category()).or_default().push(json!({
            "name": module.name(),
            "title": module.title(),
            "category": module.category(),
        }));
    }
    json!({ "byCategory": by_category })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use webgui_core::model::HUD_CATEGORY;
    use webgui_core::setting::{IntRange, Setting, SettingKind, SettingValue, Settings};
    use webgui_core::{HudContent, HudElementInfo, HudRenderer, RenderError, StaticRegistry};

    use super::*;

    struct Blank;

    impl HudContent for Blank {
        fn render(&self, _: &Settings, r: &mut HudRenderer<'_>) -> Result<(), RenderError> {
            r.text("hi", 0.0, 0.0, 0xFFFF_FFFF, false);
            Ok(())
        }
    }

    struct Fixture {
        dispatcher: Dispatcher,
        model: Arc<Mutex<Model>>,
        hook_calls: Arc<AtomicUsize>,
        clock: String,
    }

    fn fixture() -> Fixture {
        let hook_calls = Arc::new(AtomicUsize::new(0));
        let calls = Arc::clone(&hook_calls);

        let mut foo = Settings::new();
        foo.add(
            "General",
            Setting::new("range", SettingKind::Int, Some(SettingValue::Int(4)))
                .unwrap()
                .with_int_range(IntRange {
                    min: 1,
                    max: 6,
                    slider_min: 1,
                    slider_max: 6,
                    no_slider: false,
                })
                .with_on_changed(move |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                }),
        )
        .unwrap();
        foo.add("Targets", Setting::new("blocks", SettingKind::BlockList, None).unwrap())
            .unwrap();

        let mut clock_settings = Settings::new();
        clock_settings
            .add("General", Setting::new("shadow", SettingKind::Bool, Some(SettingValue::Bool(true))).unwrap())
            .unwrap();

        let mut model = Model::new();
        model
            .add_module(Module::new("Foo", "Combat").with_settings(foo))
            .unwrap();
        model.add_module(Module::new("Bar", "Render").with_addon("Extra")).unwrap();
        model.add_module(Module::new("HudEditor", HUD_CATEGORY)).unwrap();
        let clock = model.add_hud_element(
            HudElement::new(HudElementInfo::new("clock"), Blank)
                .with_settings(clock_settings)
                .activated(),
        );

        let registry = StaticRegistry::new()
            .with_entries(RegistryKind::Block, ["stone", "chest", "create:cogwheel"])
            .with_entries(RegistryKind::StatusEffect, ["speed"]);

        let model = Arc::new(Mutex::new(model));
        let capture = Arc::new(PreviewCapture::new());
        Fixture {
            dispatcher: Dispatcher::new(Arc::clone(&model), Arc::new(registry), capture),
            model,
            hook_calls,
            clock,
        }
    }

    fn send(f: &Fixture, msg: Value) -> Envelope {
        f.dispatcher.handle_text(&msg.to_string())
    }

    #[test]
    fn test_ping_is_correlated_pong() {
        let f = fixture();
        let reply = send(&f, json!({"type": "ping", "id": "p1"}));
        assert_eq!(reply.kind, "pong");
        assert_eq!(reply.id.as_deref(), Some("p1"));
    }

    #[test]
    fn test_toggle_inactive_module() {
        // Arrange
        let f = fixture();

        // Act
        let reply = send(&f, json!({"type": "module.toggle", "data": {"moduleName": "Foo"}, "id": "42"}));

        // Assert
        assert_eq!(reply.kind, "response");
        assert_eq!(reply.id.as_deref(), Some("42"));
        assert_eq!(reply.data, json!({"success": true, "moduleName": "Foo", "active": true}));
        assert!(f.model.lock().unwrap().module("Foo").unwrap().is_active());
    }

    #[test]
    fn test_unknown_kind_is_correlated_error() {
        let f = fixture();
        let reply = send(&f, json!({"type": "module.explode", "id": "7"}));
        assert_eq!(reply.kind, "error");
        assert_eq!(reply.id.as_deref(), Some("7"));
        assert_eq!(reply.data["error"], "Unknown message type: module.explode");
    }

    #[test]
    fn test_server_kind_sent_by_client_is_unknown() {
        let f = fixture();
        let reply = send(&f, json!({"type": "initial.state", "id": "x"}));
        assert_eq!(reply.kind, "error");
    }

    #[test]
    fn test_malformed_json_is_uncorrelated_error() {
        let f = fixture();
        let reply = f.dispatcher.handle_text("{not json");
        assert_eq!(reply.kind, "error");
        assert_eq!(reply.id, None);
    }

    #[test]
    fn test_missing_type_keeps_id() {
        let f = fixture();
        let reply = send(&f, json!({"data": {}, "id": 99}));
        assert_eq!(reply.kind, "error");
        assert_eq!(reply.id.as_deref(), Some("99"));
    }

    #[test]
    fn test_bad_payload_shape_is_error() {
        let f = fixture();
        let reply = send(&f, json!({"type": "module.toggle", "data": {"name": "Foo"}, "id": "3"}));
        assert_eq!(reply.kind, "error");
        assert!(reply.data["error"].as_str().unwrap().starts_with("Invalid module.toggle payload"));
    }

    #[test]
    fn test_toggle_unknown_module_is_domain_error() {
        let f = fixture();
        let reply = send(&f, json!({"type": "module.toggle", "data": {"moduleName": "Nuker"}, "id": "5"}));
        assert_eq!(reply.kind, "error");
        assert_eq!(reply.data["error"], "module 'Nuker' not found");
    }

    #[test]
    fn test_module_list_is_lightweight_and_skips_hud() {
        let f = fixture();

        let reply = send(&f, json!({"type": "module.list"}));

        let modules = reply.data["modules"].as_object().unwrap();
        assert!(modules.contains_key("Combat"));
        assert!(!modules.contains_key(HUD_CATEGORY));
        assert_eq!(modules["Render"][0]["addon"], "Extra");
        assert_eq!(modules["Combat"][0]["addon"], "Meteor Client");
        assert!(modules["Combat"][0].get("settingGroups").is_none());
    }

    #[test]
    fn test_setting_get_returns_metadata() {
        let f = fixture();

        let reply = send(
            &f,
            json!({"type": "setting.get", "data": {"moduleName": "Foo", "settingName": "range"}, "id": "g"}),
        );

        let setting = &reply.data["setting"];
        assert_eq!(setting["type"], "INT");
        assert_eq!(setting["value"], json!({"value": 4}));
        assert_eq!(setting["typeMetadata"]["max"], 6);
    }

    #[test]
    fn test_setting_get_missing_setting_is_error_with_id() {
        let f = fixture();
        let reply = send(
            &f,
            json!({"type": "setting.get", "data": {"moduleName": "Foo", "settingName": "nope"}, "id": "s1"}),
        );
        assert_eq!(reply.kind, "error");
        assert_eq!(reply.id.as_deref(), Some("s1"));
    }

    #[test]
    fn test_setting_update_goes_through_hook() {
        // Arrange
        let f = fixture();

        // Act
        let reply = send(
            &f,
            json!({"type": "setting.update", "data": {"moduleName": "Foo", "settingName": "range", "value": {"value": 5}}, "id": "u"}),
        );

        // Assert
        assert_eq!(reply.data, json!({"success": true, "moduleName": "Foo", "settingName": "range"}));
        assert_eq!(f.hook_calls.load(Ordering::SeqCst), 1);
        let model = f.model.lock().unwrap();
        let value = model.module("Foo").unwrap().settings().find("range").unwrap().value().cloned();
        assert_eq!(value, Some(SettingValue::Int(5)));
    }

    #[test]
    fn test_setting_update_rejected_leaves_value() {
        let f = fixture();

        let reply = send(
            &f,
            json!({"type": "setting.update", "data": {"moduleName": "Foo", "settingName": "blocks", "value": {"items": ["stone", "bedrock"]}}, "id": "b"}),
        );

        assert_eq!(reply.kind, "error");
        assert_eq!(reply.id.as_deref(), Some("b"));
        let model = f.model.lock().unwrap();
        assert_eq!(model.module("Foo").unwrap().settings().find("blocks").unwrap().value(), None);
    }

    #[test]
    fn test_hud_setting_addressed_by_prefixed_name() {
        let f = fixture();

        let reply = send(
            &f,
            json!({"type": "setting.update", "data": {"moduleName": "hud::CLOCK", "settingName": "shadow", "value": {"value": false}}}),
        );

        assert_eq!(
            reply.data,
            json!({"success": true, "elementName": f.clock, "settingName": "shadow"})
        );
    }

    #[test]
    fn test_hud_toggle_replies_with_identity() {
        let f = fixture();
        let reply = send(&f, json!({"type": "hud.toggle", "data": {"elementName": "clock"}, "id": "h"}));
        assert_eq!(reply.data, json!({"success": true, "elementName": f.clock, "active": false}));
    }

    #[test]
    fn test_registry_blocks_grouped_by_namespace() {
        let f = fixture();

        let reply = send(&f, json!({"type": "registry.request", "data": {"registry": "blocks"}, "id": "r"}));

        assert_eq!(reply.kind, "registry.data");
        assert_eq!(reply.id.as_deref(), Some("r"));
        assert_eq!(reply.data["registryType"], "blocks");
        let blocks = &reply.data["blocks"];
        assert_eq!(blocks["blocks"][0], json!({"id": "minecraft:stone", "namespace": "minecraft"}));
        assert_eq!(blocks["byNamespace"]["create"], json!(["create:cogwheel"]));
    }

    #[test]
    fn test_registry_status_effects_is_flat_list() {
        let f = fixture();
        let reply = send(&f, json!({"type": "registry.request", "data": {"registry": "statusEffects"}}));
        assert_eq!(
            reply.data["statusEffects"],
            json!([{"id": "minecraft:speed", "namespace": "minecraft"}])
        );
    }

    #[test]
    fn test_unknown_registry_is_error() {
        let f = fixture();
        let reply = send(&f, json!({"type": "registry.request", "data": {"registry": "biomes"}, "id": "z"}));
        assert_eq!(reply.kind, "error");
        assert_eq!(reply.data["error"], "Unknown registry type: biomes");
    }

    #[test]
    fn test_initial_state_shape() {
        // Arrange
        let f = fixture();

        // Act
        let env = f.dispatcher.initial_state();

        // Assert
        assert_eq!(env.kind, "initial.state");
        let modules = env.data["modules"].as_object().unwrap();
        assert!(!modules.contains_key(HUD_CATEGORY));
        let foo = &modules["Combat"][0];
        assert_eq!(foo["settingGroups"][0]["name"], "General");
        assert_eq!(foo["settingGroups"][1]["settings"][0]["value"], json!({"items": []}));
        assert_eq!(env.data["hud"]["elements"][0]["name"], f.clock.as_str());
        assert_eq!(env.data["hud"]["previews"], json!([]));
        assert!(env.data.get("registries").is_none());
    }

    #[test]
    fn test_registry_names_all_route() {
        let f = fixture();
        for name in REGISTRY_NAMES {
            let reply = send(&f, json!({"type": "registry.request", "data": {"registry": name}}));
            assert_eq!(reply.kind, "registry.data", "{name}");
        }
    }
}
