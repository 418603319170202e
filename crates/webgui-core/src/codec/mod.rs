//! Typed value codec.
//!
//! Maps every [`SettingKind`] to a self-describing JSON container and back:
//!
//! | Shape      | Container                                   |
//! |------------|---------------------------------------------|
//! | scalar     | `{"value": ...}`                            |
//! | colour     | `{"r","g","b","a","rainbow"}`               |
//! | keybind    | `{"isKey","value","modifiers","label"}`     |
//! | spatial    | `{"x","y","z"}`                             |
//! | font face  | `{"family","type","label"}`                 |
//! | list / set | `{"items": [...]}`                          |
//! | map        | `{"entries": [...]}`                        |
//!
//! An absent value always encodes as the *empty* container of its shape
//! (`{"items": []}`, `{"entries": []}`, or `{"value": null}` for everything
//! else), so a client never sees two spellings of "nothing".
//!
//! Decoding is all-or-nothing: [`apply`] resolves and validates the whole
//! wire value before touching the setting, and only then calls
//! [`Setting::set`] so the owner's change hook and every observer fire.

mod decode;
mod encode;
mod metadata;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::registry::{canonical_key, RegistryEntry, RegistryKind, RegistryProvider};
use crate::setting::{Setting, SettingError, SettingKind};

pub use decode::decode_value;
pub use encode::{empty_container, encode, encode_default, encode_value};
pub use metadata::{registry_wire_name, setting_metadata, type_metadata};

/// Errors produced while decoding a wire value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("expected a JSON object for {kind}")]
    NotAnObject { kind: SettingKind },

    #[error("missing field '{field}'")]
    MissingField { field: &'static str },

    #[error("field '{field}' must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field '{field}' value {value} is out of range")]
    OutOfRange { field: &'static str, value: i64 },

    #[error("malformed {registry} key '{key}'")]
    InvalidKey { registry: &'static str, key: String },

    #[error("unknown {registry} '{key}'")]
    UnknownKey { registry: &'static str, key: String },

    #[error("{registry} key '{requested}' resolved to '{resolved}'")]
    IdentityMismatch {
        registry: &'static str,
        requested: String,
        resolved: String,
    },

    #[error("unknown module '{0}'")]
    UnknownModule(String),

    #[error("setting type {0} has no registry to resolve against")]
    UnsupportedKind(SettingKind),

    #[error(transparent)]
    Rejected(#[from] SettingError),
}

/// What a decode needs from the outside world.
#[derive(Clone, Copy)]
pub struct DecodeContext<'a> {
    pub registries: &'a dyn RegistryProvider,
    /// Names accepted by MODULE_LIST settings.
    pub module_names: &'a [String],
}

impl<'a> DecodeContext<'a> {
    pub fn new(registries: &'a dyn RegistryProvider, module_names: &'a [String]) -> Self {
        Self {
            registries,
            module_names,
        }
    }

    /// Resolves `raw` in `kind` and insists the entry found is the one asked
    /// for.  A defaulted registry that hands back its fallback entry for an
    /// unknown key is reported as [`CodecError::IdentityMismatch`].
    ///
    /// # Errors
    ///
    /// [`CodecError::InvalidKey`], [`CodecError::UnknownKey`] or
    /// [`CodecError::IdentityMismatch`].
    pub fn resolve(&self, kind: RegistryKind, raw: &str) -> Result<RegistryEntry, CodecError> {
        let canonical = canonical_key(kind, raw).map_err(|_| CodecError::InvalidKey {
            registry: kind.label(),
            key: raw.to_string(),
        })?;

        let entry = self
            .registries
            .resolve(kind, &canonical)
            .ok_or_else(|| CodecError::UnknownKey {
                registry: kind.label(),
                key: canonical.clone(),
            })?;

        if entry.key() != canonical {
            return Err(CodecError::IdentityMismatch {
                registry: kind.label(),
                requested: canonical,
                resolved: entry.key().to_string(),
            });
        }
        Ok(entry)
    }

    /// Returns the registered spelling of a module name.
    ///
    /// # Errors
    ///
    /// [`CodecError::UnknownModule`] when no module has that name.
    pub fn resolve_module(&self, name: &str) -> Result<String, CodecError> {
        self.module_names
            .iter()
            .find(|m| m.as_str() == name)
            .cloned()
            .ok_or_else(|| CodecError::UnknownModule(name.to_string()))
    }
}

/// The tag a setting is encoded under.  Kinds are fixed at construction so
/// this never changes for a given setting.
pub fn detect_kind(setting: &Setting) -> SettingKind {
    setting.kind()
}

/// Decodes `wire` and stores it in `setting`.
///
/// An empty scalar container (`{"value": null}`) resets the setting to its
/// default.  On any error the setting is left untouched and no notification
/// fires.
///
/// # Errors
///
/// Any [`CodecError`] raised while decoding, or [`CodecError::Rejected`] if
/// the setting itself refuses the decoded value.
pub fn apply(setting: &mut Setting, wire: &Value, ctx: &DecodeContext<'_>) -> Result<(), CodecError> {
    match decode_value(setting.kind(), wire, ctx)? {
        Some(value) => setting.set(value)?,
        None => {
            debug!("resetting '{}' to its default", setting.name());
            setting.reset();
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
