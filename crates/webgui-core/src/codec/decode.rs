use serde_json::{Map, Value};

use super::{CodecError, DecodeContext};
use crate::registry::{RegistryEntry, RegistryKind};
use crate::setting::{
    BlockPos, FontFace, FontStyle, Keybind, SettingColor, SettingKind, SettingValue, Vector3d, WireShape,
};

type Object = Map<String, Value>;

/// Decodes a wire container into a value for `kind`.
///
/// Returns `Ok(None)` for the empty scalar container `{"value": null}`,
/// which callers treat as "reset to default".  List and map kinds decode
/// their empty containers to empty collections.
///
/// # Errors
///
/// [`CodecError`] describing the first field or registry key that failed.
pub fn decode_value(
    kind: SettingKind,
    wire: &Value,
    ctx: &DecodeContext<'_>,
) -> Result<Option<SettingValue>, CodecError> {
    let obj = wire.as_object().ok_or(CodecError::NotAnObject { kind })?;

    match kind.wire_shape() {
        WireShape::Scalar => decode_scalar(kind, obj, ctx),
        _ if obj.get("value").is_some_and(Value::is_null) => Ok(None),
        WireShape::Color => Ok(Some(SettingValue::Color(decode_color(obj)?))),
        WireShape::Keybind => Ok(Some(SettingValue::Keybind(decode_keybind(obj)?))),
        WireShape::Spatial => decode_spatial(kind, obj).map(Some),
        WireShape::FontFace => Ok(Some(SettingValue::FontFace(decode_font_face(obj)?))),
        WireShape::Items => decode_items(kind, obj, ctx).map(Some),
        WireShape::Entries => decode_entries(kind, obj, ctx).map(Some),
    }
}

fn decode_scalar(
    kind: SettingKind,
    obj: &Object,
    ctx: &DecodeContext<'_>,
) -> Result<Option<SettingValue>, CodecError> {
    let value = field(obj, "value")?;
    if value.is_null() {
        return Ok(None);
    }

    let decoded = match kind {
        SettingKind::Bool => SettingValue::Bool(as_bool("value", value)?),
        SettingKind::Int => SettingValue::Int(as_i32("value", value)?),
        SettingKind::Double => SettingValue::Double(as_f64("value", value)?),
        SettingKind::String | SettingKind::Enum | SettingKind::ProvidedString => {
            SettingValue::Text(as_str("value", value)?.to_string())
        }
        SettingKind::Block | SettingKind::Item | SettingKind::Potion => {
            let registry = kind.registry().ok_or(CodecError::UnsupportedKind(kind))?;
            SettingValue::Entry(ctx.resolve(registry, as_str("value", value)?)?)
        }
        // GENERIC / UNKNOWN: keep strings verbatim, stringify anything else.
        _ => match value {
            Value::String(s) => SettingValue::Text(s.clone()),
            other => SettingValue::Text(other.to_string()),
        },
    };
    Ok(Some(decoded))
}

fn decode_color(obj: &Object) -> Result<SettingColor, CodecError> {
    Ok(SettingColor {
        r: channel(obj, "r")?,
        g: channel(obj, "g")?,
        b: channel(obj, "b")?,
        a: channel(obj, "a")?,
        rainbow: match obj.get("rainbow") {
            Some(v) if !v.is_null() => as_bool("rainbow", v)?,
            _ => false,
        },
    })
}

fn decode_keybind(obj: &Object) -> Result<Keybind, CodecError> {
    let is_key = match obj.get("isKey") {
        Some(v) if !v.is_null() => as_bool("isKey", v)?,
        _ => true,
    };
    let modifiers = match obj.get("modifiers") {
        Some(v) if !v.is_null() => {
            let raw = as_i64("modifiers", v)?;
            u8::try_from(raw).map_err(|_| CodecError::OutOfRange {
                field: "modifiers",
                value: raw,
            })?
        }
        _ => 0,
    };
    Ok(Keybind {
        is_key,
        value: as_i32("value", field(obj, "value")?)?,
        modifiers,
    })
}

fn decode_spatial(kind: SettingKind, obj: &Object) -> Result<SettingValue, CodecError> {
    if kind == SettingKind::BlockPos {
        Ok(SettingValue::BlockPos(BlockPos {
            x: as_i32("x", field(obj, "x")?)?,
            y: as_i32("y", field(obj, "y")?)?,
            z: as_i32("z", field(obj, "z")?)?,
        }))
    } else {
        Ok(SettingValue::Vector3d(Vector3d {
            x: as_f64("x", field(obj, "x")?)?,
            y: as_f64("y", field(obj, "y")?)?,
            z: as_f64("z", field(obj, "z")?)?,
        }))
    }
}

fn decode_font_face(obj: &Object) -> Result<FontFace, CodecError> {
    let family = as_str("family", field(obj, "family")?)?.to_string();
    let style = match obj.get("type") {
        Some(Value::String(s)) => FontStyle::parse(s).ok_or(CodecError::WrongType {
            field: "type",
            expected: "one of Regular, Bold, Italic, BoldItalic",
        })?,
        Some(Value::Null) | None => FontStyle::Regular,
        Some(_) => {
            return Err(CodecError::WrongType {
                field: "type",
                expected: "a string",
            })
        }
    };
    Ok(FontFace { family, style })
}

fn decode_items(kind: SettingKind, obj: &Object, ctx: &DecodeContext<'_>) -> Result<SettingValue, CodecError> {
    let items = array(obj, "items")?;

    match kind {
        SettingKind::StringList => items
            .iter()
            .map(|v| as_str("items", v).map(str::to_string))
            .collect::<Result<Vec<_>, _>>()
            .map(SettingValue::Names),
        SettingKind::ModuleList => {
            let mut names: Vec<String> = Vec::with_capacity(items.len());
            for item in items {
                let name = ctx.resolve_module(as_str("items", item)?)?;
                if !names.contains(&name) {
                    names.push(name);
                }
            }
            Ok(SettingValue::Names(names))
        }
        SettingKind::ColorList => items
            .iter()
            .map(|v| {
                v.as_object()
                    .ok_or(CodecError::WrongType {
                        field: "items",
                        expected: "an array of colour objects",
                    })
                    .and_then(decode_color)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(SettingValue::Colors),
        _ => {
            let registry = kind.registry().ok_or(CodecError::UnsupportedKind(kind))?;
            let mut entries: Vec<RegistryEntry> = Vec::with_capacity(items.len());
            for item in items {
                let entry = ctx.resolve(registry, as_str("items", item)?)?;
                if kind.is_set() && entries.contains(&entry) {
                    continue;
                }
                entries.push(entry);
            }
            Ok(SettingValue::Entries(entries))
        }
    }
}

fn decode_entries(kind: SettingKind, obj: &Object, ctx: &DecodeContext<'_>) -> Result<SettingValue, CodecError> {
    let entries = array(obj, "entries")?;

    if kind == SettingKind::StatusEffectAmplifierMap {
        let mut pairs: Vec<(RegistryEntry, i32)> = Vec::with_capacity(entries.len());
        for raw in entries {
            let entry = as_entry_object(raw)?;
            let effect = ctx.resolve(RegistryKind::StatusEffect, as_str("effect", field(entry, "effect")?)?)?;
            let amplifier = as_i32("amplifier", field(entry, "amplifier")?)?;
            upsert(&mut pairs, effect, amplifier);
        }
        Ok(SettingValue::AmplifierMap(pairs))
    } else {
        let mut pairs: Vec<(RegistryEntry, String)> = Vec::with_capacity(entries.len());
        for raw in entries {
            let entry = as_entry_object(raw)?;
            let block = ctx.resolve(RegistryKind::Block, as_str("block", field(entry, "block")?)?)?;
            let data = match field(entry, "data")? {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            upsert(&mut pairs, block, data);
        }
        Ok(SettingValue::BlockData(pairs))
    }
}

/// Later duplicates overwrite earlier ones in place.
fn upsert<V>(pairs: &mut Vec<(RegistryEntry, V)>, key: RegistryEntry, value: V) {
    match pairs.iter_mut().find(|(k, _)| *k == key) {
        Some(slot) => slot.1 = value,
        None => pairs.push((key, value)),
    }
}

// ── Field helpers ─────────────────────────────────────────────────────────────

fn field<'v>(obj: &'v Object, name: &'static str) -> Result<&'v Value, CodecError> {
    obj.get(name).ok_or(CodecError::MissingField { field: name })
}

fn array<'v>(obj: &'v Object, name: &'static str) -> Result<&'v Vec<Value>, CodecError> {
    field(obj, name)?.as_array().ok_or(CodecError::WrongType {
        field: name,
        expected: "an array",
    })
}

fn as_entry_object(v: &Value) -> Result<&Object, CodecError> {
    v.as_object().ok_or(CodecError::WrongType {
        field: "entries",
        expected: "an array of objects",
    })
}

fn as_bool(name: &'static str, v: &Value) -> Result<bool, CodecError> {
    match v {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(CodecError::WrongType {
            field: name,
            expected: "a boolean",
        }),
    }
}

fn as_i64(name: &'static str, v: &Value) -> Result<i64, CodecError> {
    let wrong = CodecError::WrongType {
        field: name,
        expected: "an integer",
    };
    match v {
        Value::Number(n) => n.as_i64().ok_or(wrong),
        Value::String(s) => s.trim().parse().map_err(|_| wrong),
        _ => Err(wrong),
    }
}

fn as_i32(name: &'static str, v: &Value) -> Result<i32, CodecError> {
    let raw = as_i64(name, v)?;
    i32::try_from(raw).map_err(|_| CodecError::OutOfRange { field: name, value: raw })
}

fn as_f64(name: &'static str, v: &Value) -> Result<f64, CodecError> {
    let wrong = CodecError::WrongType {
        field: name,
        expected: "a number",
    };
    let parsed = match v {
        Value::Number(n) => n.as_f64().ok_or(wrong.clone())?,
        Value::String(s) => s.trim().parse().map_err(|_| wrong.clone())?,
        _ => return Err(wrong),
    };
    if parsed.is_finite() {
        Ok(parsed)
    } else {
        Err(wrong)
    }
}

fn as_str<'v>(name: &'static str, v: &'v Value) -> Result<&'v str, CodecError> {
    v.as_str().ok_or(CodecError::WrongType {
        field: name,
        expected: "a string",
    })
}

fn channel(obj: &Object, name: &'static str) -> Result<u8, CodecError> {
    let raw = as_i64(name, field(obj, name)?)?;
    u8::try_from(raw).map_err(|_| CodecError::OutOfRange { field: name, value: raw })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
