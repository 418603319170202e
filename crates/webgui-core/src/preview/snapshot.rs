use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Serialize, Serializer};

use crate::model::Rect;

/// One text draw call recorded during a render pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextLine {
    pub text: String,
    pub x: f64,
    pub y: f64,
    /// Packed `0xAARRGGBB`, serialised as `"#AARRGGBB"`.
    #[serde(serialize_with = "serialize_argb")]
    pub color: u32,
    pub shadow: bool,
    pub scale: f64,
}

impl TextLine {
    fn hash_into<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
        self.x.to_bits().hash(state);
        self.y.to_bits().hash(state);
        self.color.hash(state);
        self.shadow.hash(state);
        self.scale.to_bits().hash(state);
    }
}

/// Immutable record of what one HUD element drew in its last captured pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewSnapshot {
    /// Element identity, `hud::name#id`.
    pub name: String,
    pub title: String,
    pub description: String,
    pub group: String,
    pub active: bool,
    #[serde(flatten)]
    pub bounds: Rect,
    pub has_non_text: bool,
    /// Milliseconds since the Unix epoch.
    pub updated_at: u64,
    pub lines: Vec<TextLine>,
}

impl PreviewSnapshot {
    /// Content hash over everything a viewer can see.  The capture timestamp
    /// is excluded, so two passes that drew the same thing fingerprint equal.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.name.hash(&mut hasher);
        self.title.hash(&mut hasher);
        self.description.hash(&mut hasher);
        self.group.hash(&mut hasher);
        self.active.hash(&mut hasher);
        self.bounds.hash(&mut hasher);
        self.has_non_text.hash(&mut hasher);
        self.lines.len().hash(&mut hasher);
        for line in &self.lines {
            line.hash_into(&mut hasher);
        }
        hasher.finish()
    }
}

fn serialize_argb<S: Serializer>(color: &u32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("#{color:08X}"))
}
