use crate::model::{Configurable, SettingOwner};
use crate::setting::Settings;

/// Addon label reported for modules that do not name one.
pub const DEFAULT_ADDON: &str = "Meteor Client";

/// A named, toggleable capability.
///
/// The `active` flag is only changed through [`Model`](crate::Model) so that
/// activation listeners always fire.
#[derive(Debug)]
pub struct Module {
    name: String,
    title: String,
    description: String,
    category: String,
    addon: Option<String>,
    active: bool,
    settings: Settings,
}

impl Module {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            title: name.clone(),
            name,
            description: String::new(),
            category: category.into(),
            addon: None,
            active: false,
            settings: Settings::new(),
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

    pub fn with_addon(mut self, addon: impl Into<String>) -> Self {
        self.addon = Some(addon.into());
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
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

    pub fn category(&self) -> &str {
        &self.category
    }

    /// The owning addon, or [`DEFAULT_ADDON`].
    pub fn addon(&self) -> &str {
        self.addon.as_deref().unwrap_or(DEFAULT_ADDON)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

impl Configurable for Module {
    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    fn owner(&self) -> SettingOwner {
        SettingOwner::Module(self.name.clone())
    }
}
