//! The closed set of setting kinds and the wire shape each one uses.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::registry::RegistryKind;
use crate::setting::value::SettingValue;

/// Fixed type tag of a setting.
///
/// Assigned once when the setting is built and never changed.  Serialises as
/// the upper-case wire name (`"BLOCK_LIST"`, `"STATUS_EFFECT_AMPLIFIER_MAP"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettingKind {
    Bool,
    Int,
    Double,
    String,
    Enum,
    ProvidedString,
    Color,
    Keybind,
    Block,
    Item,
    Potion,
    BlockPos,
    #[serde(rename = "VECTOR3D")]
    Vector3d,
    FontFace,
    BlockData,
    StatusEffectAmplifierMap,
    BlockList,
    ItemList,
    EntityTypeList,
    ModuleList,
    EnchantmentList,
    ParticleTypeList,
    SoundEventList,
    StatusEffectList,
    StorageBlockList,
    StringList,
    ColorList,
    PacketList,
    ScreenHandlerList,
    Generic,
    Unknown,
}

/// The JSON container a kind is encoded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireShape {
    /// `{"value": ...}`
    Scalar,
    /// `{"r","g","b","a","rainbow"}`
    Color,
    /// `{"isKey","value","modifiers","label"}`
    Keybind,
    /// `{"x","y","z"}`
    Spatial,
    /// `{"family","type","label"}`
    FontFace,
    /// `{"items": [...]}`
    Items,
    /// `{"entries": [...]}`
    Entries,
}

impl SettingKind {
    /// Every kind, in declaration order.
    pub const ALL: [SettingKind; 31] = [
        SettingKind::Bool,
        SettingKind::Int,
        SettingKind::Double,
        SettingKind::String,
        SettingKind::Enum,
        SettingKind::ProvidedString,
        SettingKind::Color,
        SettingKind::Keybind,
        SettingKind::Block,
        SettingKind::Item,
        SettingKind::Potion,
        SettingKind::BlockPos,
        SettingKind::Vector3d,
        SettingKind::FontFace,
        SettingKind::BlockData,
        SettingKind::StatusEffectAmplifierMap,
        SettingKind::BlockList,
        SettingKind::ItemList,
        SettingKind::EntityTypeList,
        SettingKind::ModuleList,
        SettingKind::EnchantmentList,
        SettingKind::ParticleTypeList,
        SettingKind::SoundEventList,
        SettingKind::StatusEffectList,
        SettingKind::StorageBlockList,
        SettingKind::StringList,
        SettingKind::ColorList,
        SettingKind::PacketList,
        SettingKind::ScreenHandlerList,
        SettingKind::Generic,
        SettingKind::Unknown,
    ];

    /// The upper-case wire name used in the `type` metadata field.
    pub fn wire_name(self) -> &'static str {
        match self {
            SettingKind::Bool => "BOOL",
            SettingKind::Int => "INT",
            SettingKind::Double => "DOUBLE",
            SettingKind::String => "STRING",
            SettingKind::Enum => "ENUM",
            SettingKind::ProvidedString => "PROVIDED_STRING",
            SettingKind::Color => "COLOR",
            SettingKind::Keybind => "KEYBIND",
            SettingKind::Block => "BLOCK",
            SettingKind::Item => "ITEM",
            SettingKind::Potion => "POTION",
            SettingKind::BlockPos => "BLOCK_POS",
            SettingKind::Vector3d => "VECTOR3D",
            SettingKind::FontFace => "FONT_FACE",
            SettingKind::BlockData => "BLOCK_DATA",
            SettingKind::StatusEffectAmplifierMap => "STATUS_EFFECT_AMPLIFIER_MAP",
            SettingKind::BlockList => "BLOCK_LIST",
            SettingKind::ItemList => "ITEM_LIST",
            SettingKind::EntityTypeList => "ENTITY_TYPE_LIST",
            SettingKind::ModuleList => "MODULE_LIST",
            SettingKind::EnchantmentList => "ENCHANTMENT_LIST",
            SettingKind::ParticleTypeList => "PARTICLE_TYPE_LIST",
            SettingKind::SoundEventList => "SOUND_EVENT_LIST",
            SettingKind::StatusEffectList => "STATUS_EFFECT_LIST",
            SettingKind::StorageBlockList => "STORAGE_BLOCK_LIST",
            SettingKind::StringList => "STRING_LIST",
            SettingKind::ColorList => "COLOR_LIST",
            SettingKind::PacketList => "PACKET_LIST",
            SettingKind::ScreenHandlerList => "SCREEN_HANDLER_LIST",
            SettingKind::Generic => "GENERIC",
            SettingKind::Unknown => "UNKNOWN",
        }
    }

    pub fn wire_shape(self) -> WireShape {
        match self {
            SettingKind::Color => WireShape::Color,
            SettingKind::Keybind => WireShape::Keybind,
            SettingKind::BlockPos | SettingKind::Vector3d => WireShape::Spatial,
            SettingKind::FontFace => WireShape::FontFace,
            SettingKind::BlockData | SettingKind::StatusEffectAmplifierMap => WireShape::Entries,
            SettingKind::BlockList
            | SettingKind::ItemList
            | SettingKind::EntityTypeList
            | SettingKind::ModuleList
            | SettingKind::EnchantmentList
            | SettingKind::ParticleTypeList
            | SettingKind::SoundEventList
            | SettingKind::StatusEffectList
            | SettingKind::StorageBlockList
            | SettingKind::StringList
            | SettingKind::ColorList
            | SettingKind::PacketList
            | SettingKind::ScreenHandlerList => WireShape::Items,
            _ => WireShape::Scalar,
        }
    }

    /// The registry that keys of this kind resolve against, if any.
    ///
    /// `MODULE_LIST` resolves against the model's module names instead and
    /// returns `None` here.
    pub fn registry(self) -> Option<RegistryKind> {
        match self {
            SettingKind::Block | SettingKind::BlockList | SettingKind::BlockData => Some(RegistryKind::Block),
            SettingKind::Item | SettingKind::ItemList => Some(RegistryKind::Item),
            SettingKind::Potion => Some(RegistryKind::Potion),
            SettingKind::EntityTypeList => Some(RegistryKind::EntityType),
            SettingKind::EnchantmentList => Some(RegistryKind::Enchantment),
            SettingKind::ParticleTypeList => Some(RegistryKind::ParticleType),
            SettingKind::SoundEventList => Some(RegistryKind::SoundEvent),
            SettingKind::StatusEffectList | SettingKind::StatusEffectAmplifierMap => {
                Some(RegistryKind::StatusEffect)
            }
            SettingKind::StorageBlockList => Some(RegistryKind::BlockEntityType),
            SettingKind::ScreenHandlerList => Some(RegistryKind::ScreenHandler),
            SettingKind::PacketList => Some(RegistryKind::Packet),
            _ => None,
        }
    }

    /// Set-valued kinds drop duplicate keys on decode.
    pub fn is_set(self) -> bool {
        matches!(self, SettingKind::EntityTypeList | SettingKind::PacketList)
    }

    /// Whether `value` has the shape this kind requires.
    pub fn accepts(self, value: &SettingValue) -> bool {
        match (self, value) {
            (SettingKind::Bool, SettingValue::Bool(_)) => true,
            (SettingKind::Int, SettingValue::Int(_)) => true,
            (SettingKind::Double, SettingValue::Double(_)) => true,
            (
                SettingKind::String
                | SettingKind::Enum
                | SettingKind::ProvidedString
                | SettingKind::Generic
                | SettingKind::Unknown,
                SettingValue::Text(_),
            ) => true,
            (SettingKind::Color, SettingValue::Color(_)) => true,
            (SettingKind::Keybind, SettingValue::Keybind(_)) => true,
            (SettingKind::Block | SettingKind::Item | SettingKind::Potion, SettingValue::Entry(_)) => true,
            (SettingKind::BlockPos, SettingValue::BlockPos(_)) => true,
            (SettingKind::Vector3d, SettingValue::Vector3d(_)) => true,
            (SettingKind::FontFace, SettingValue::FontFace(_)) => true,
            (SettingKind::BlockData, SettingValue::BlockData(_)) => true,
            (SettingKind::StatusEffectAmplifierMap, SettingValue::AmplifierMap(_)) => true,
            (SettingKind::ModuleList | SettingKind::StringList, SettingValue::Names(_)) => true,
            (SettingKind::ColorList, SettingValue::Colors(_)) => true,
            (kind, SettingValue::Entries(_)) => {
                kind.wire_shape() == WireShape::Items && kind.registry().is_some()
            }
            _ => false,
        }
    }
}

impl fmt::Display for SettingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryEntry;

    #[test]
    fn test_wire_name_matches_serde_representation() {
        for kind in SettingKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.wire_name()), "kind {kind:?}");
        }
    }

    #[test]
    fn test_list_kinds_use_items_container() {
        assert_eq!(SettingKind::BlockList.wire_shape(), WireShape::Items);
        assert_eq!(SettingKind::ColorList.wire_shape(), WireShape::Items);
        assert_eq!(SettingKind::StatusEffectAmplifierMap.wire_shape(), WireShape::Entries);
        assert_eq!(SettingKind::Bool.wire_shape(), WireShape::Scalar);
    }

    #[test]
    fn test_entries_value_only_accepted_by_registry_lists() {
        let value = SettingValue::Entries(vec![RegistryEntry::new(0, "minecraft:stone")]);
        assert!(SettingKind::BlockList.accepts(&value));
        assert!(SettingKind::PacketList.accepts(&value));
        assert!(!SettingKind::StringList.accepts(&value));
        assert!(!SettingKind::ModuleList.accepts(&value));
        assert!(!SettingKind::Block.accepts(&value));
    }

    #[test]
    fn test_text_value_accepted_by_string_like_kinds() {
        let value = SettingValue::Text("x".into());
        assert!(SettingKind::Enum.accepts(&value));
        assert!(SettingKind::Unknown.accepts(&value));
        assert!(!SettingKind::Int.accepts(&value));
    }

    #[test]
    fn test_module_list_has_no_external_registry() {
        assert_eq!(SettingKind::ModuleList.registry(), None);
        assert_eq!(SettingKind::StorageBlockList.registry(), Some(RegistryKind::BlockEntityType));
    }
}
