//! External registry boundary.
//!
//! Registry-keyed settings (block lists, item lists, status effects, ...)
//! store references into named lookup tables owned by the host.  The core
//! never owns those tables; it only needs two capabilities:
//!
//! - `enumerate(kind)` – the ordered contents, used for `registry.data`
//!   replies and client-side autocomplete.
//! - `resolve(kind, key)` – turn a textual key back into an entry.
//!
//! # Exact identity
//!
//! Some host registries are *defaulted*: looking up an unknown key silently
//! returns a fallback entry (for blocks that is `minecraft:air`).  Callers
//! that accept keys from the network must therefore compare the resolved
//! entry's key with the requested one; see
//! [`crate::codec::DecodeContext::resolve`].

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Namespace applied to identifiers written without one (`"stone"`).
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// Error returned when a textual key is not a well-formed identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("identifier is empty")]
    Empty,
    #[error("invalid character {ch:?} in identifier '{raw}'")]
    InvalidCharacter { raw: String, ch: char },
}

// ── Identifier ────────────────────────────────────────────────────────────────

/// A `namespace:path` resource key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    namespace: String,
    path: String,
}

impl Identifier {
    /// Parses `namespace:path`, defaulting the namespace to `minecraft`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] for empty input or characters outside
    /// `[a-z0-9_.-]` (plus `/` in the path).
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(IdentifierError::Empty);
        }

        let (namespace, path) = match raw.split_once(':') {
            Some((ns, path)) if !ns.is_empty() => (ns, path),
            Some((_, path)) => (DEFAULT_NAMESPACE, path),
            None => (DEFAULT_NAMESPACE, raw),
        };
        if path.is_empty() {
            return Err(IdentifierError::Empty);
        }

        let valid_ns = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || "_.-".contains(c);
        let valid_path = |c: char| valid_ns(c) || c == '/';

        if let Some(ch) = namespace.chars().find(|c| !valid_ns(*c)) {
            return Err(IdentifierError::InvalidCharacter { raw: raw.to_string(), ch });
        }
        if let Some(ch) = path.chars().find(|c| !valid_path(*c)) {
            return Err(IdentifierError::InvalidCharacter { raw: raw.to_string(), ch });
        }

        Ok(Self {
            namespace: namespace.to_string(),
            path: path.to_string(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

// ── Registry kinds ────────────────────────────────────────────────────────────

/// The named host registries a setting may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegistryKind {
    Block,
    Item,
    EntityType,
    StatusEffect,
    Potion,
    Enchantment,
    ParticleType,
    SoundEvent,
    /// Storage block lists reference block *entity* types.
    BlockEntityType,
    ScreenHandler,
    /// Packet classes are keyed by simple name, without a namespace.
    Packet,
}

impl RegistryKind {
    /// Whether keys in this registry are `namespace:path` identifiers.
    pub fn is_namespaced(self) -> bool {
        !matches!(self, RegistryKind::Packet)
    }

    /// Human-readable label used in error messages and logs.
    pub fn label(self) -> &'static str {
        match self {
            RegistryKind::Block => "block",
            RegistryKind::Item => "item",
            RegistryKind::EntityType => "entity type",
            RegistryKind::StatusEffect => "status effect",
            RegistryKind::Potion => "potion",
            RegistryKind::Enchantment => "enchantment",
            RegistryKind::ParticleType => "particle type",
            RegistryKind::SoundEvent => "sound event",
            RegistryKind::BlockEntityType => "block entity type",
            RegistryKind::ScreenHandler => "screen handler",
            RegistryKind::Packet => "packet",
        }
    }
}

/// Normalises a raw key into the canonical form stored by `kind`.
///
/// # Errors
///
/// Returns [`IdentifierError`] when a namespaced key is malformed or any key
/// is empty.
pub fn canonical_key(kind: RegistryKind, raw: &str) -> Result<String, IdentifierError> {
    if kind.is_namespaced() {
        Ok(Identifier::parse(raw)?.to_string())
    } else {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::Empty);
        }
        Ok(trimmed.to_string())
    }
}

// ── Entries and the provider trait ────────────────────────────────────────────

/// A resolved registry reference: the host's numeric id plus its canonical key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistryEntry {
    raw_id: u32,
    key: String,
}

impl RegistryEntry {
    pub fn new(raw_id: u32, key: impl Into<String>) -> Self {
        Self {
            raw_id,
            key: key.into(),
        }
    }

    pub fn raw_id(&self) -> u32 {
        self.raw_id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The namespace part of the key, or `""` for un-namespaced registries.
    pub fn namespace(&self) -> &str {
        self.key.split_once(':').map_or("", |(ns, _)| ns)
    }
}

/// Read-only access to the host's named registries.
pub trait RegistryProvider: Send + Sync {
    /// Returns every entry of `kind` in registration order.
    fn enumerate(&self, kind: RegistryKind) -> Vec<RegistryEntry>;

    /// Resolves a canonical key.  Defaulted registries may return a fallback
    /// entry whose key differs from `key`.
    fn resolve(&self, kind: RegistryKind, key: &str) -> Option<RegistryEntry>;
}

// ── In-memory implementation ──────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Table {
    entries: Vec<RegistryEntry>,
    index: HashMap<String, usize>,
    fallback: Option<usize>,
}

/// An in-memory [`RegistryProvider`] backed by ordered tables.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    tables: HashMap<RegistryKind, Table>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `key` under `kind`, returning the (possibly existing) entry.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the key is malformed.
    pub fn register(&mut self, kind: RegistryKind, key: &str) -> Result<RegistryEntry, IdentifierError> {
        let canonical = canonical_key(kind, key)?;
        let table = self.tables.entry(kind).or_default();
        if let Some(&idx) = table.index.get(&canonical) {
            return Ok(table.entries[idx].clone());
        }

        let entry = RegistryEntry::new(table.entries.len() as u32, canonical.clone());
        table.index.insert(canonical, table.entries.len());
        table.entries.push(entry.clone());
        Ok(entry)
    }

    /// Builder-style bulk registration.  Malformed keys are skipped.
    pub fn with_entries<'a>(mut self, kind: RegistryKind, keys: impl IntoIterator<Item = &'a str>) -> Self {
        for key in keys {
            if let Err(e) = self.register(kind, key) {
                tracing::warn!("skipping malformed {} key '{key}': {e}", kind.label());
            }
        }
        self
    }

    /// Makes `kind` a defaulted registry: unknown keys resolve to `key`.
    ///
    /// Returns `false` if `key` is not registered under `kind`.
    pub fn set_default(&mut self, kind: RegistryKind, key: &str) -> bool {
        let Ok(canonical) = canonical_key(kind, key) else {
            return false;
        };
        match self.tables.get_mut(&kind) {
            Some(table) => match table.index.get(&canonical) {
                Some(&idx) => {
                    table.fallback = Some(idx);
                    true
                }
                None => false,
            },
            None => false,
        }
    }
}

impl RegistryProvider for StaticRegistry {
    fn enumerate(&self, kind: RegistryKind) -> Vec<RegistryEntry> {
        self.tables
            .get(&kind)
            .map(|t| t.entries.clone())
            .unwrap_or_default()
    }

    fn resolve(&self, kind: RegistryKind, key: &str) -> Option<RegistryEntry> {
        let table = self.tables.get(&kind)?;
        let idx = canonical_key(kind, key)
            .ok()
            .and_then(|canonical| table.index.get(&canonical).copied())
            .or(table.fallback)?;
        table.entries.get(idx).cloned()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_parse_defaults_namespace() {
        let id = Identifier::parse("stone").unwrap();
        assert_eq!(id.namespace(), "minecraft");
        assert_eq!(id.to_string(), "minecraft:stone");
    }

    #[test]
    fn test_identifier_parse_keeps_explicit_namespace() {
        let id = Identifier::parse("create:brass_block").unwrap();
        assert_eq!(id.namespace(), "create");
        assert_eq!(id.path(), "brass_block");
    }

    #[test]
    fn test_identifier_parse_rejects_uppercase() {
        let err = Identifier::parse("minecraft:Stone").unwrap_err();
        assert!(matches!(err, IdentifierError::InvalidCharacter { ch: 'S', .. }));
    }

    #[test]
    fn test_identifier_parse_rejects_empty() {
        assert_eq!(Identifier::parse("  "), Err(IdentifierError::Empty));
        assert_eq!(Identifier::parse("minecraft:"), Err(IdentifierError::Empty));
    }

    #[test]
    fn test_canonical_key_leaves_packet_names_alone() {
        let key = canonical_key(RegistryKind::Packet, "PlayerMoveC2SPacket").unwrap();
        assert_eq!(key, "PlayerMoveC2SPacket");
    }

    #[test]
    fn test_register_assigns_sequential_raw_ids() {
        let mut reg = StaticRegistry::new();
        let a = reg.register(RegistryKind::Block, "stone").unwrap();
        let b = reg.register(RegistryKind::Block, "dirt").unwrap();
        let again = reg.register(RegistryKind::Block, "minecraft:stone").unwrap();
        assert_eq!(a.raw_id(), 0);
        assert_eq!(b.raw_id(), 1);
        assert_eq!(again, a);
    }

    #[test]
    fn test_enumerate_preserves_registration_order() {
        let reg = StaticRegistry::new().with_entries(RegistryKind::Item, ["diamond", "apple", "stick"]);
        let keys: Vec<_> = reg
            .enumerate(RegistryKind::Item)
            .iter()
            .map(|e| e.key().to_string())
            .collect();
        assert_eq!(keys, ["minecraft:diamond", "minecraft:apple", "minecraft:stick"]);
    }

    #[test]
    fn test_resolve_unknown_key_returns_none_without_default() {
        let reg = StaticRegistry::new().with_entries(RegistryKind::Block, ["stone"]);
        assert!(reg.resolve(RegistryKind::Block, "minecraft:bedrock").is_none());
    }

    #[test]
    fn test_defaulted_registry_resolves_unknown_key_to_fallback() {
        let mut reg = StaticRegistry::new().with_entries(RegistryKind::Block, ["air", "stone"]);
        assert!(reg.set_default(RegistryKind::Block, "air"));

        let entry = reg.resolve(RegistryKind::Block, "minecraft:bedrock").unwrap();

        assert_eq!(entry.key(), "minecraft:air");
    }

    #[test]
    fn test_entry_namespace_split() {
        let entry = RegistryEntry::new(3, "minecraft:speed");
        assert_eq!(entry.namespace(), "minecraft");
        assert_eq!(RegistryEntry::new(0, "Packet").namespace(), "");
    }
}
