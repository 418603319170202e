use std::fmt;

use serde::Serialize;

use crate::model::{Configurable, SettingOwner};
use crate::preview::{HudRenderer, RenderError};
use crate::setting::Settings;

/// Prefix clients may put in front of a HUD identity.
pub const HUD_PREFIX: &str = "hud::";

/// Group reported for elements that do not declare one.
pub const DEFAULT_GROUP: &str = "HUD";

/// Screen-space bounding box of a HUD element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Declared, static description of a HUD element type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HudElementInfo {
    pub name: String,
    pub title: String,
    pub description: String,
    pub group: String,
}

impl HudElementInfo {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            title: name.clone(),
            name,
            description: String::new(),
            group: DEFAULT_GROUP.to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }
}

/// What a HUD element draws each frame.
pub trait HudContent: Send + Sync {
    /// Draws one frame through `renderer`.  Errors are logged by the caller
    /// and discard any preview recorded during this pass.
    fn render(&self, settings: &Settings, renderer: &mut HudRenderer<'_>) -> Result<(), RenderError>;
}

/// A positioned, toggleable overlay element with its own settings.
pub struct HudElement {
    instance_id: u64,
    info: HudElementInfo,
    active: bool,
    bounds: Rect,
    settings: Settings,
    content: Box<dyn HudContent>,
}

impl HudElement {
    pub fn new(info: HudElementInfo, content: impl HudContent + 'static) -> Self {
        Self {
            instance_id: 0,
            info,
            active: false,
            bounds: Rect::default(),
            settings: Settings::new(),
            content: Box::new(content),
        }
    }

    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn activated(mut self) -> Self {
        self.active = true;
        self
    }

    /// `"hud::<name>#<instance id>"`, stable for the element's lifetime.
    pub fn identifier(&self) -> String {
        format!("{HUD_PREFIX}{}#{}", self.info.name, self.instance_id)
    }

    pub fn instance_id(&self) -> u64 {
        self.instance_id
    }

    pub fn info(&self) -> &HudElementInfo {
        &self.info
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn set_position(&mut self, x: i32, y: i32) {
        self.bounds.x = x;
        self.bounds.y = y;
    }

    /// Whether `identity` addresses this element.
    ///
    /// Accepts an optional `hud::` prefix and compares names
    /// case-insensitively.  A numeric discriminator must match the instance
    /// id; a missing or non-numeric one matches on name alone.
    pub fn matches(&self, identity: &str) -> bool {
        let target = identity.strip_prefix(HUD_PREFIX).unwrap_or(identity);
        let (base, discriminator) = match target.rfind('#') {
            Some(i) if i + 1 < target.len() => (&target[..i], target[i + 1..].parse::<u64>().ok()),
            _ => (target, None),
        };
        self.info.name.eq_ignore_ascii_case(base) && discriminator.map_or(true, |id| id == self.instance_id)
    }

    pub(crate) fn assign_id(&mut self, id: u64) {
        self.instance_id = id;
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub(crate) fn set_size(&mut self, width: i32, height: i32) {
        self.bounds.width = width;
        self.bounds.height = height;
    }

    pub(crate) fn content(&self) -> &dyn HudContent {
        self.content.as_ref()
    }
}

impl Configurable for HudElement {
    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    fn owner(&self) -> SettingOwner {
        SettingOwner::Hud(self.identifier())
    }
}

impl fmt::Debug for HudElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HudElement")
            .field("identity", &self.identifier())
            .field("active", &self.active)
            .field("bounds", &self.bounds)
            .field("settings", &self.settings.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Blank;

    impl HudContent for Blank {
        fn render(&self, _: &Settings, _: &mut HudRenderer<'_>) -> Result<(), RenderError> {
            Ok(())
        }
    }

    fn element(id: u64) -> HudElement {
        let mut e = HudElement::new(HudElementInfo::new("coords"), Blank);
        e.assign_id(id);
        e
    }

    #[test]
    fn test_identifier_carries_prefix_name_and_instance_id() {
        let identity = element(7).identifier();
        assert!(identity.starts_with(HUD_PREFIX));
        assert_eq!(identity, "hud::coords#7");
    }

    #[test]
    fn test_element_matches_its_own_identifier() {
        let e = element(3);
        assert!(e.matches(&e.identifier()));
    }

    #[test]
    fn test_matches_full_identity_with_prefix() {
        let e = element(7);
        assert!(e.matches("coords#7"));
        assert!(e.matches("hud::coords#7"));
        assert!(!e.matches("coords#8"));
    }

    #[test]
    fn test_matches_name_case_insensitively() {
        assert!(element(1).matches("Coords"));
    }

    #[test]
    fn test_non_numeric_discriminator_falls_back_to_name() {
        assert!(element(1).matches("coords#abc"));
        assert!(!element(1).matches("compass#abc"));
    }
}
