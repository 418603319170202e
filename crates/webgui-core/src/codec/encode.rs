use serde_json::{json, Map, Value};

use crate::setting::{Setting, SettingColor, SettingKind, SettingValue, WireShape};

/// Encodes the setting's current value, falling back to its default.
pub fn encode(setting: &Setting) -> Value {
    encode_value(setting.kind(), setting.effective_value())
}

/// Encodes the setting's default value.
pub fn encode_default(setting: &Setting) -> Value {
    encode_value(setting.kind(), setting.default_value())
}

/// The container an absent value of `kind` encodes as.
pub fn empty_container(kind: SettingKind) -> Value {
    match kind.wire_shape() {
        WireShape::Items => json!({ "items": [] }),
        WireShape::Entries => json!({ "entries": [] }),
        _ => json!({ "value": null }),
    }
}

/// Encodes `value` in the container `kind` uses.
///
/// A value whose shape does not fit `kind` cannot be stored in a [`Setting`],
/// but is still encoded as the empty container rather than panicking.
pub fn encode_value(kind: SettingKind, value: Option<&SettingValue>) -> Value {
    let Some(value) = value else {
        return empty_container(kind);
    };
    if !kind.accepts(value) {
        tracing::warn!("value of shape {value:?} does not fit {kind}, encoding as empty");
        return empty_container(kind);
    }

    match value {
        SettingValue::Bool(b) => json!({ "value": b }),
        SettingValue::Int(i) => json!({ "value": i }),
        SettingValue::Double(d) => json!({ "value": d }),
        SettingValue::Text(s) => json!({ "value": s }),
        SettingValue::Entry(entry) => json!({ "value": entry.key() }),
        SettingValue::Color(color) => color_object(color),
        SettingValue::Keybind(bind) => json!({
            "isKey": bind.is_key,
            "value": bind.value,
            "modifiers": bind.modifiers,
            "label": bind.label(),
        }),
        SettingValue::BlockPos(pos) => json!({ "x": pos.x, "y": pos.y, "z": pos.z }),
        SettingValue::Vector3d(v) => json!({ "x": v.x, "y": v.y, "z": v.z }),
        SettingValue::FontFace(face) => json!({
            "family": face.family,
            "type": face.style.as_str(),
            "label": face.label(),
        }),
        SettingValue::Entries(entries) => {
            let items: Vec<&str> = entries.iter().map(|e| e.key()).collect();
            json!({ "items": items })
        }
        SettingValue::Names(names) => json!({ "items": names }),
        SettingValue::Colors(colors) => {
            let items: Vec<Value> = colors.iter().map(color_object).collect();
            json!({ "items": items })
        }
        SettingValue::AmplifierMap(pairs) => {
            let entries: Vec<Value> = pairs
                .iter()
                .map(|(effect, amplifier)| json!({ "effect": effect.key(), "amplifier": amplifier }))
                .collect();
            json!({ "entries": entries })
        }
        SettingValue::BlockData(pairs) => {
            let entries: Vec<Value> = pairs
                .iter()
                .map(|(block, data)| json!({ "block": block.key(), "data": data }))
                .collect();
            json!({ "entries": entries })
        }
    }
}

fn color_object(color: &SettingColor) -> Value {
    let mut obj = Map::with_capacity(5);
    obj.insert("r".into(), color.r.into());
    obj.insert("g".into(), color.g.into());
    obj.insert("b".into(), color.b.into());
    obj.insert("a".into(), color.a.into());
    obj.insert("rainbow".into(), color.rainbow.into());
    Value::Object(obj)
}
