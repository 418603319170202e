//! Full setting descriptions sent in `initial.state` and `setting.get`.

use serde_json::{json, Map, Value};

use super::encode::{encode, encode_default};
use crate::setting::{Constraints, Setting, SettingKind};

/// Bound substituted for infinite or extreme numeric limits, which JSON
/// clients cannot represent reliably.
const EXTREME_BOUND: i32 = 999_999_999;

/// Name of the client-side registry a list kind autocompletes against.
pub fn registry_wire_name(kind: SettingKind) -> Option<&'static str> {
    match kind {
        SettingKind::BlockList => Some("blocks"),
        SettingKind::ItemList => Some("items"),
        SettingKind::EntityTypeList => Some("entities"),
        SettingKind::ModuleList => Some("modules"),
        SettingKind::StatusEffectList => Some("statusEffects"),
        SettingKind::EnchantmentList => Some("enchantments"),
        _ => None,
    }
}

/// `{name, title, description, type, value, defaultValue, visible, typeMetadata?}`
pub fn setting_metadata(setting: &Setting) -> Value {
    let mut obj = Map::new();
    obj.insert("name".into(), setting.name().into());
    obj.insert("title".into(), setting.title().into());
    obj.insert("description".into(), setting.description().into());
    obj.insert("type".into(), setting.kind().wire_name().into());
    obj.insert("value".into(), encode(setting));
    obj.insert("defaultValue".into(), encode_default(setting));
    obj.insert("visible".into(), setting.is_visible().into());

    let meta = type_metadata(setting);
    if !meta.is_empty() {
        obj.insert("typeMetadata".into(), Value::Object(meta));
    }
    Value::Object(obj)
}

/// Constraints and hints specific to the setting's kind.  Empty when the
/// kind has none.
pub fn type_metadata(setting: &Setting) -> Map<String, Value> {
    let mut meta = Map::new();
    let kind = setting.kind();

    match (kind, setting.constraints()) {
        (SettingKind::Int, Constraints::Int(range)) => {
            let min = if range.min == i32::MIN { -EXTREME_BOUND } else { range.min };
            let max = if range.max == i32::MAX { EXTREME_BOUND } else { range.max };
            meta.insert("min".into(), min.into());
            meta.insert("max".into(), max.into());
            meta.insert("sliderMin".into(), range.slider_min.into());
            meta.insert("sliderMax".into(), range.slider_max.into());
            meta.insert("noSlider".into(), range.no_slider.into());
        }
        (SettingKind::Double, Constraints::Double(range)) => {
            let min = if range.min.is_finite() { range.min } else { -f64::from(EXTREME_BOUND) };
            let max = if range.max.is_finite() { range.max } else { f64::from(EXTREME_BOUND) };
            meta.insert("min".into(), json!(min));
            meta.insert("max".into(), json!(max));
            meta.insert("sliderMin".into(), json!(range.slider_min));
            meta.insert("sliderMax".into(), json!(range.slider_max));
            meta.insert("noSlider".into(), range.no_slider.into());
            meta.insert("decimalPlaces".into(), range.decimal_places.into());
        }
        (SettingKind::Enum, _) => {
            meta.insert("values".into(), json!(setting.suggestions()));
        }
        (SettingKind::ProvidedString, _) => {
            meta.insert("suggestions".into(), json!(setting.suggestions()));
        }
        (SettingKind::Color, _) => {
            meta.insert("format".into(), "rgba".into());
            meta.insert("minValue".into(), json!(0));
            meta.insert("maxValue".into(), json!(255));
        }
        (SettingKind::StringList, _) => {
            meta.insert("freeInput".into(), true.into());
        }
        (SettingKind::ColorList, _) => {
            meta.insert("itemType".into(), "color".into());
        }
        (SettingKind::BlockPos, _) => {
            meta.insert("minY".into(), json!(-64));
            meta.insert("maxY".into(), json!(319));
        }
        (SettingKind::StatusEffectAmplifierMap, _) => {
            meta.insert("keyRegistry".into(), "statusEffects".into());
            meta.insert("valueType".into(), "integer".into());
        }
        (
            SettingKind::ParticleTypeList
            | SettingKind::SoundEventList
            | SettingKind::ScreenHandlerList
            | SettingKind::StorageBlockList
            | SettingKind::PacketList,
            _,
        ) => {
            meta.insert("searchable".into(), true.into());
        }
        (kind, _) => {
            if let Some(registry) = registry_wire_name(kind) {
                meta.insert("registry".into(), registry.into());
                meta.insert("searchable".into(), true.into());
            }
        }
    }
    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setting::{DoubleRange, IntRange, SettingValue};

    #[test]
    fn test_metadata_carries_value_and_default() {
        // Arrange
        let mut s = Setting::new("delay", SettingKind::Int, Some(SettingValue::Int(5)))
            .unwrap()
            .with_description("Ticks between actions.");
        s.set(SettingValue::Int(8)).unwrap();

        // Act
        let meta = setting_metadata(&s);

        // Assert
        assert_eq!(meta["name"], "delay");
        assert_eq!(meta["title"], "Delay");
        assert_eq!(meta["type"], "INT");
        assert_eq!(meta["value"], json!({ "value": 8 }));
        assert_eq!(meta["defaultValue"], json!({ "value": 5 }));
        assert_eq!(meta["visible"], true);
        assert!(meta.get("typeMetadata").is_none());
    }

    #[test]
    fn test_int_extremes_are_clamped_for_json() {
        let s = Setting::new("count", SettingKind::Int, None)
            .unwrap()
            .with_int_range(IntRange {
                min: i32::MIN,
                max: i32::MAX,
                slider_min: 0,
                slider_max: 20,
                no_slider: false,
            });
        let meta = type_metadata(&s);
        assert_eq!(meta["min"], -999_999_999);
        assert_eq!(meta["max"], 999_999_999);
        assert_eq!(meta["sliderMax"], 20);
    }

    #[test]
    fn test_double_infinite_bounds_are_replaced() {
        let s = Setting::new("speed", SettingKind::Double, None)
            .unwrap()
            .with_double_range(DoubleRange::default());
        let meta = type_metadata(&s);
        assert_eq!(meta["min"], json!(-999_999_999.0));
        assert_eq!(meta["max"], json!(999_999_999.0));
        assert_eq!(meta["decimalPlaces"], 3);
    }

    #[test]
    fn test_enum_lists_constants() {
        let s = Setting::new("mode", SettingKind::Enum, None)
            .unwrap()
            .with_suggestions(["Packet", "Vanilla"]);
        assert_eq!(type_metadata(&s)["values"], json!(["Packet", "Vanilla"]));
    }

    #[test]
    fn test_block_list_names_client_registry() {
        let s = Setting::new("blocks", SettingKind::BlockList, None).unwrap();
        let meta = type_metadata(&s);
        assert_eq!(meta["registry"], "blocks");
        assert_eq!(meta["searchable"], true);
    }

    #[test]
    fn test_block_pos_world_height() {
        let s = Setting::new("pos", SettingKind::BlockPos, None).unwrap();
        let meta = type_metadata(&s);
        assert_eq!(meta["minY"], -64);
        assert_eq!(meta["maxY"], 319);
    }
}
