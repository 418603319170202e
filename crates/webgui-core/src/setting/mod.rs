//! Named, typed, mutable value cells.
//!
//! A [`Setting`] is owned by exactly one module or HUD element.  Its
//! [`SettingKind`] is fixed at construction and decides which
//! [`SettingValue`] shape may ever be stored in it.
//!
//! # Change notification
//!
//! Every mutation goes through [`Setting::set`] or [`Setting::reset`], which
//! first runs the owner's own `on_changed` callback and then every registered
//! observer, in registration order.  Observers are added and removed through
//! [`Setting::add_observer`] / [`Setting::remove_observer`]; removing one
//! leaves the owner's callback exactly as it was.

pub mod kind;
pub mod value;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

pub use kind::{SettingKind, WireShape};
pub use value::{BlockPos, FontFace, FontStyle, Keybind, SettingColor, SettingValue, Vector3d};

/// Callback invoked after a setting's value changed.
pub type ChangeCallback = Arc<dyn Fn(&Setting) + Send + Sync>;

/// Handle returned by [`Setting::add_observer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Errors raised when a value is rejected by a setting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingError {
    #[error("setting '{setting}' of type {kind} cannot hold this value")]
    KindMismatch { setting: String, kind: SettingKind },

    #[error("value {value} for '{setting}' is outside [{min}, {max}]")]
    OutOfRange {
        setting: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("'{value}' is not a constant of '{setting}'")]
    UnknownConstant { setting: String, value: String },

    #[error("cannot parse '{text}' as {kind}")]
    Unparseable { text: String, kind: SettingKind },

    #[error("a setting named '{0}' already exists")]
    DuplicateName(String),
}

// ── Numeric constraints ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntRange {
    pub min: i32,
    pub max: i32,
    pub slider_min: i32,
    pub slider_max: i32,
    pub no_slider: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoubleRange {
    pub min: f64,
    pub max: f64,
    pub slider_min: f64,
    pub slider_max: f64,
    pub no_slider: bool,
    pub decimal_places: u8,
}

impl Default for DoubleRange {
    fn default() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            slider_min: 0.0,
            slider_max: 10.0,
            no_slider: false,
            decimal_places: 3,
        }
    }
}

/// Type-specific bounds attached to INT and DOUBLE settings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Constraints {
    #[default]
    None,
    Int(IntRange),
    Double(DoubleRange),
}

// ── Setting ───────────────────────────────────────────────────────────────────

pub struct Setting {
    name: String,
    title: String,
    description: String,
    kind: SettingKind,
    value: Option<SettingValue>,
    default: Option<SettingValue>,
    visible: bool,
    suggestions: Vec<String>,
    constraints: Constraints,
    on_changed: Option<ChangeCallback>,
    observers: Vec<(ObserverId, ChangeCallback)>,
    next_observer: u64,
}

impl Setting {
    /// Creates a setting whose current value starts at `default`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingError::KindMismatch`] if `default` does not fit `kind`.
    pub fn new(
        name: impl Into<String>,
        kind: SettingKind,
        default: Option<SettingValue>,
    ) -> Result<Self, SettingError> {
        let name = name.into();
        if let Some(value) = &default {
            if !kind.accepts(value) {
                return Err(SettingError::KindMismatch { setting: name, kind });
            }
        }
        Ok(Self {
            title: title_case(&name),
            name,
            description: String::new(),
            kind,
            value: default.clone(),
            default,
            visible: true,
            suggestions: Vec::new(),
            constraints: Constraints::None,
            on_changed: None,
            observers: Vec::new(),
            next_observer: 0,
        })
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Enum constants for ENUM settings, suggestions for free-text ones.
    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions = suggestions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_int_range(mut self, range: IntRange) -> Self {
        self.constraints = Constraints::Int(range);
        self
    }

    pub fn with_double_range(mut self, range: DoubleRange) -> Self {
        self.constraints = Constraints::Double(range);
        self
    }

    /// The owner's own change hook.  Runs before any observer.
    pub fn with_on_changed(mut self, callback: impl Fn(&Setting) + Send + Sync + 'static) -> Self {
        self.on_changed = Some(Arc::new(callback));
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> SettingKind {
        self.kind
    }

    pub fn value(&self) -> Option<&SettingValue> {
        self.value.as_ref()
    }

    pub fn default_value(&self) -> Option<&SettingValue> {
        self.default.as_ref()
    }

    /// The current value, or the default when no current value is held.
    pub fn effective_value(&self) -> Option<&SettingValue> {
        self.value.as_ref().or(self.default.as_ref())
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    /// Validates and stores `value`, then notifies.
    ///
    /// # Errors
    ///
    /// Returns [`SettingError`] when the shape, range or enum constant is
    /// rejected.  The stored value is untouched on error.
    pub fn set(&mut self, value: SettingValue) -> Result<(), SettingError> {
        let value = self.validate(value)?;
        self.value = Some(value);
        self.notify();
        Ok(())
    }

    /// Restores the default value and notifies.
    pub fn reset(&mut self) {
        self.value = self.default.clone();
        self.notify();
    }

    /// Best-effort parse of a textual value for scalar kinds.
    ///
    /// # Errors
    ///
    /// [`SettingError::Unparseable`] when `text` has no scalar meaning for
    /// this kind, or any error [`Setting::set`] returns.
    pub fn parse(&mut self, text: &str) -> Result<(), SettingError> {
        let unparseable = || SettingError::Unparseable {
            text: text.to_string(),
            kind: self.kind,
        };
        let trimmed = text.trim();
        let value = match self.kind {
            SettingKind::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "on" | "1" | "yes" => SettingValue::Bool(true),
                "false" | "off" | "0" | "no" => SettingValue::Bool(false),
                _ => return Err(unparseable()),
            },
            SettingKind::Int => SettingValue::Int(trimmed.parse().map_err(|_| unparseable())?),
            SettingKind::Double => SettingValue::Double(trimmed.parse().map_err(|_| unparseable())?),
            SettingKind::String
            | SettingKind::Enum
            | SettingKind::ProvidedString
            | SettingKind::Generic
            | SettingKind::Unknown => SettingValue::Text(text.to_string()),
            _ => return Err(unparseable()),
        };
        self.set(value)
    }

    /// Registers an observer that runs after the owner's callback.
    pub fn add_observer(&mut self, callback: ChangeCallback) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, callback));
        id
    }

    /// Removes a previously registered observer.
    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    fn validate(&self, value: SettingValue) -> Result<SettingValue, SettingError> {
        if !self.kind.accepts(&value) {
            return Err(SettingError::KindMismatch {
                setting: self.name.clone(),
                kind: self.kind,
            });
        }

        match (&self.constraints, value) {
            (Constraints::Int(range), SettingValue::Int(v)) => {
                if v < range.min || v > range.max {
                    return Err(SettingError::OutOfRange {
                        setting: self.name.clone(),
                        value: f64::from(v),
                        min: f64::from(range.min),
                        max: f64::from(range.max),
                    });
                }
                Ok(SettingValue::Int(v))
            }
            (_, SettingValue::Double(v)) if !v.is_finite() => Err(SettingError::OutOfRange {
                setting: self.name.clone(),
                value: v,
                min: f64::MIN,
                max: f64::MAX,
            }),
            (Constraints::Double(range), SettingValue::Double(v)) => {
                if v < range.min || v > range.max {
                    return Err(SettingError::OutOfRange {
                        setting: self.name.clone(),
                        value: v,
                        min: range.min,
                        max: range.max,
                    });
                }
                Ok(SettingValue::Double(v))
            }
            (_, SettingValue::Text(text)) if self.kind == SettingKind::Enum && !self.suggestions.is_empty() => self
                .suggestions
                .iter()
                .find(|c| c.eq_ignore_ascii_case(&text))
                .map(|c| SettingValue::Text(c.clone()))
                .ok_or(SettingError::UnknownConstant {
                    setting: self.name.clone(),
                    value: text,
                }),
            (_, value) => Ok(value),
        }
    }

    fn notify(&self) {
        if let Some(callback) = &self.on_changed {
            callback(self);
        }
        for (_, observer) in &self.observers {
            observer(self);
        }
    }
}

impl fmt::Debug for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setting")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("value", &self.value)
            .field("default", &self.default)
            .field("visible", &self.visible)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

/// `"auto-totem"` → `"Auto Totem"`.
fn title_case(name: &str) -> String {
    name.split(['-', '_', ' '])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Groups ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct SettingGroup {
    name: String,
    settings: Vec<Setting>,
}

impl SettingGroup {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &[Setting] {
        &self.settings
    }
}

/// All setting groups of one owner.  Names are unique across groups.
#[derive(Debug, Default)]
pub struct Settings {
    groups: Vec<SettingGroup>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `setting` to `group`, creating the group on first use.
    ///
    /// # Errors
    ///
    /// [`SettingError::DuplicateName`] if the owner already has a setting
    /// with that name in any group.
    pub fn add(&mut self, group: &str, setting: Setting) -> Result<(), SettingError> {
        if self.find(setting.name()).is_some() {
            return Err(SettingError::DuplicateName(setting.name().to_string()));
        }
        match self.groups.iter_mut().find(|g| g.name == group) {
            Some(existing) => existing.settings.push(setting),
            None => self.groups.push(SettingGroup {
                name: group.to_string(),
                settings: vec![setting],
            }),
        }
        Ok(())
    }

    pub fn groups(&self) -> &[SettingGroup] {
        &self.groups
    }

    pub fn find(&self, name: &str) -> Option<&Setting> {
        self.iter().find(|s| s.name() == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Setting> {
        self.iter_mut().find(|s| s.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Setting> {
        self.groups.iter().flat_map(|g| g.settings.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Setting> {
        self.groups.iter_mut().flat_map(|g| g.settings.iter_mut())
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.settings.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    fn int_setting() -> Setting {
        Setting::new("range", SettingKind::Int, Some(SettingValue::Int(4)))
            .unwrap()
            .with_int_range(IntRange {
                min: 0,
                max: 10,
                slider_min: 0,
                slider_max: 10,
                no_slider: false,
            })
    }

    #[test]
    fn test_new_rejects_default_of_wrong_kind() {
        let err = Setting::new("x", SettingKind::Bool, Some(SettingValue::Int(1))).unwrap_err();
        assert!(matches!(err, SettingError::KindMismatch { .. }));
    }

    #[test]
    fn test_title_defaults_to_title_cased_name() {
        let s = Setting::new("auto-totem", SettingKind::Bool, None).unwrap();
        assert_eq!(s.title(), "Auto Totem");
    }

    #[test]
    fn test_set_rejects_other_kind_and_keeps_value() {
        // Arrange
        let mut s = int_setting();

        // Act
        let result = s.set(SettingValue::Text("five".into()));

        // Assert
        assert!(result.is_err());
        assert_eq!(s.value(), Some(&SettingValue::Int(4)));
    }

    #[test]
    fn test_set_enforces_int_range() {
        let mut s = int_setting();
        assert!(matches!(s.set(SettingValue::Int(11)), Err(SettingError::OutOfRange { .. })));
        s.set(SettingValue::Int(10)).unwrap();
        assert_eq!(s.value(), Some(&SettingValue::Int(10)));
    }

    #[test]
    fn test_set_rejects_nan_double() {
        let mut s = Setting::new("speed", SettingKind::Double, Some(SettingValue::Double(1.0))).unwrap();
        assert!(s.set(SettingValue::Double(f64::NAN)).is_err());
    }

    #[test]
    fn test_enum_set_matches_case_insensitively_and_stores_canonical() {
        let mut s = Setting::new("mode", SettingKind::Enum, Some(SettingValue::Text("Packet".into())))
            .unwrap()
            .with_suggestions(["Packet", "Vanilla"]);

        s.set(SettingValue::Text("vanilla".into())).unwrap();

        assert_eq!(s.value(), Some(&SettingValue::Text("Vanilla".into())));
        assert!(matches!(
            s.set(SettingValue::Text("Grim".into())),
            Err(SettingError::UnknownConstant { .. })
        ));
    }

    #[test]
    fn test_on_changed_runs_before_observers() {
        // Arrange
        let order = Arc::new(Mutex::new(Vec::new()));
        let o1 = Arc::clone(&order);
        let mut s = Setting::new("flag", SettingKind::Bool, Some(SettingValue::Bool(false)))
            .unwrap()
            .with_on_changed(move |_| o1.lock().unwrap().push("owner"));
        let o2 = Arc::clone(&order);
        s.add_observer(Arc::new(move |_| o2.lock().unwrap().push("observer")));

        // Act
        s.set(SettingValue::Bool(true)).unwrap();

        // Assert
        assert_eq!(*order.lock().unwrap(), vec!["owner", "observer"]);
    }

    #[test]
    fn test_remove_observer_leaves_owner_callback() {
        let owner_calls = Arc::new(AtomicUsize::new(0));
        let observer_calls = Arc::new(AtomicUsize::new(0));
        let oc = Arc::clone(&owner_calls);
        let mut s = Setting::new("flag", SettingKind::Bool, Some(SettingValue::Bool(false)))
            .unwrap()
            .with_on_changed(move |_| {
                oc.fetch_add(1, Ordering::SeqCst);
            });
        let obs = Arc::clone(&observer_calls);
        let id = s.add_observer(Arc::new(move |_| {
            obs.fetch_add(1, Ordering::SeqCst);
        }));

        s.set(SettingValue::Bool(true)).unwrap();
        assert!(s.remove_observer(id));
        assert!(!s.remove_observer(id));
        s.set(SettingValue::Bool(false)).unwrap();

        assert_eq!(owner_calls.load(Ordering::SeqCst), 2);
        assert_eq!(observer_calls.load(Ordering::SeqCst), 1);
        assert_eq!(s.observer_count(), 0);
    }

    #[test]
    fn test_reset_restores_default_and_notifies() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let mut s = int_setting();
        s.add_observer(Arc::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        s.set(SettingValue::Int(7)).unwrap();

        s.reset();

        assert_eq!(s.value(), Some(&SettingValue::Int(4)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_parse_scalar_kinds() {
        let mut b = Setting::new("b", SettingKind::Bool, None).unwrap();
        b.parse("on").unwrap();
        assert_eq!(b.value(), Some(&SettingValue::Bool(true)));

        let mut i = int_setting();
        assert!(matches!(i.parse("abc"), Err(SettingError::Unparseable { .. })));
        i.parse(" 3 ").unwrap();
        assert_eq!(i.value(), Some(&SettingValue::Int(3)));

        let mut list = Setting::new("blocks", SettingKind::BlockList, None).unwrap();
        assert!(list.parse("stone").is_err());
    }

    #[test]
    fn test_effective_value_falls_back_to_default() {
        let s = Setting::new("x", SettingKind::Int, Some(SettingValue::Int(2))).unwrap();
        assert_eq!(s.effective_value(), Some(&SettingValue::Int(2)));
        let empty = Setting::new("y", SettingKind::StringList, None).unwrap();
        assert_eq!(empty.effective_value(), None);
    }

    #[test]
    fn test_settings_rejects_duplicate_names_across_groups() {
        let mut settings = Settings::new();
        settings
            .add("General", Setting::new("range", SettingKind::Int, None).unwrap())
            .unwrap();

        let err = settings
            .add("Render", Setting::new("range", SettingKind::Int, None).unwrap())
            .unwrap_err();

        assert_eq!(err, SettingError::DuplicateName("range".into()));
        assert_eq!(settings.len(), 1);
    }

    #[test]
    fn test_settings_preserve_group_order() {
        let mut settings = Settings::new();
        settings.add("General", Setting::new("a", SettingKind::Bool, None).unwrap()).unwrap();
        settings.add("Render", Setting::new("b", SettingKind::Bool, None).unwrap()).unwrap();
        settings.add("General", Setting::new("c", SettingKind::Bool, None).unwrap()).unwrap();

        let names: Vec<_> = settings.iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, ["a", "c", "b"]);
        assert_eq!(settings.groups()[0].name(), "General");
    }
}
