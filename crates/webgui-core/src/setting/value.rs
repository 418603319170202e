//! Value shapes a setting can hold.

use crate::registry::RegistryEntry;

/// Key code meaning "not bound".
pub const KEY_UNBOUND: i32 = -1;

/// Modifier bits, matching the host's GLFW modifier mask.
pub mod modifiers {
    pub const SHIFT: u8 = 0x01;
    pub const CTRL: u8 = 0x02;
    pub const ALT: u8 = 0x04;
    pub const SUPER: u8 = 0x08;
}

/// An RGBA colour with an optional animated rainbow flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SettingColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
    pub rainbow: bool,
}

impl SettingColor {
    pub const WHITE: SettingColor = SettingColor::rgba(255, 255, 255, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r,
            g,
            b,
            a,
            rainbow: false,
        }
    }

    /// Packs the colour as `0xAARRGGBB`.
    pub fn packed(&self) -> u32 {
        (u32::from(self.a) << 24) | (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }
}

/// A key or mouse-button binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Keybind {
    /// `true` for a keyboard key, `false` for a mouse button.
    pub is_key: bool,
    /// Key code or mouse button index; [`KEY_UNBOUND`] when unbound.
    pub value: i32,
    /// Bitmask of [`modifiers`].
    pub modifiers: u8,
}

impl Keybind {
    pub const NONE: Keybind = Keybind {
        is_key: true,
        value: KEY_UNBOUND,
        modifiers: 0,
    };

    pub fn key(code: i32) -> Self {
        Self {
            is_key: true,
            value: code,
            modifiers: 0,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.value != KEY_UNBOUND
    }

    /// Display label such as `"Ctrl+Shift+R"`, `"Mouse 4"` or `"None"`.
    pub fn label(&self) -> String {
        if !self.is_bound() {
            return "None".to_string();
        }

        let mut label = String::new();
        for (bit, name) in [
            (modifiers::CTRL, "Ctrl+"),
            (modifiers::SHIFT, "Shift+"),
            (modifiers::ALT, "Alt+"),
            (modifiers::SUPER, "Super+"),
        ] {
            if self.modifiers & bit != 0 {
                label.push_str(name);
            }
        }

        if self.is_key {
            label.push_str(&key_name(self.value));
        } else {
            match self.value {
                0 => label.push_str("Mouse Left"),
                1 => label.push_str("Mouse Right"),
                2 => label.push_str("Mouse Middle"),
                n => label.push_str(&format!("Mouse {}", n + 1)),
            }
        }
        label
    }
}

fn key_name(code: i32) -> String {
    match code {
        32 => "Space".to_string(),
        48..=57 | 65..=90 => char::from_u32(code as u32).map_or_else(|| code.to_string(), String::from),
        256 => "Escape".to_string(),
        257 => "Enter".to_string(),
        258 => "Tab".to_string(),
        259 => "Backspace".to_string(),
        260 => "Insert".to_string(),
        261 => "Delete".to_string(),
        262 => "Right".to_string(),
        263 => "Left".to_string(),
        264 => "Down".to_string(),
        265 => "Up".to_string(),
        280 => "Caps Lock".to_string(),
        290..=314 => format!("F{}", code - 289),
        320..=329 => format!("Numpad {}", code - 320),
        340 | 344 => "Shift".to_string(),
        341 | 345 => "Ctrl".to_string(),
        342 | 346 => "Alt".to_string(),
        other => format!("Key {other}"),
    }
}

/// Integer block coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// A double-precision 3-D vector.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Style of a font face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl FontStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            FontStyle::Regular => "Regular",
            FontStyle::Bold => "Bold",
            FontStyle::Italic => "Italic",
            FontStyle::BoldItalic => "BoldItalic",
        }
    }

    /// Case-insensitive parse of the wire name.
    pub fn parse(raw: &str) -> Option<Self> {
        [FontStyle::Regular, FontStyle::Bold, FontStyle::Italic, FontStyle::BoldItalic]
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(raw))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontFace {
    pub family: String,
    pub style: FontStyle,
}

impl FontFace {
    pub fn label(&self) -> String {
        match self.style {
            FontStyle::Regular => self.family.clone(),
            style => format!("{} {}", self.family, style.as_str()),
        }
    }
}

/// The value held by a setting.  Which variant is legal is decided by the
/// setting's [`SettingKind`](crate::setting::SettingKind).
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Bool(bool),
    Int(i32),
    Double(f64),
    /// STRING, ENUM, PROVIDED_STRING, GENERIC and UNKNOWN.
    Text(String),
    Color(SettingColor),
    Keybind(Keybind),
    /// BLOCK, ITEM and POTION.
    Entry(RegistryEntry),
    BlockPos(BlockPos),
    Vector3d(Vector3d),
    FontFace(FontFace),
    /// Every registry-keyed list or set.
    Entries(Vec<RegistryEntry>),
    /// MODULE_LIST and STRING_LIST.
    Names(Vec<String>),
    Colors(Vec<SettingColor>),
    /// Ordered status effect → amplifier pairs.
    AmplifierMap(Vec<(RegistryEntry, i32)>),
    /// Ordered block → per-block configuration pairs.
    BlockData(Vec<(RegistryEntry, String)>),
}
