//! The in-process application model: modules and HUD elements.
//!
//! The host owns the lifecycle of everything in here; the sync service only
//! observes and mutates through the methods below.  Module activation goes
//! through [`Model::toggle_module`] / [`Model::set_module_active`], which call
//! every activation listener synchronously with the full module list after
//! the change.  Listeners are not told which module changed.

mod hud;
mod module;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::preview::{HudRenderer, PreviewCapture};
use crate::setting::Settings;

pub use hud::{HudContent, HudElement, HudElementInfo, Rect, DEFAULT_GROUP, HUD_PREFIX};
pub use module::{Module, DEFAULT_ADDON};

/// Category that is never listed among module categories.
pub const HUD_CATEGORY: &str = "hud";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("module '{0}' not found")]
    ModuleNotFound(String),

    #[error("HUD element '{0}' not found")]
    HudNotFound(String),

    #[error("a module named '{0}' already exists")]
    DuplicateModule(String),
}

/// The owner of a setting, as addressed on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SettingOwner {
    Module(String),
    /// Carries the element identity (`name#id`).
    Hud(String),
}

impl SettingOwner {
    pub fn name(&self) -> &str {
        match self {
            SettingOwner::Module(name) | SettingOwner::Hud(name) => name,
        }
    }
}

impl fmt::Display for SettingOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingOwner::Module(name) => write!(f, "module '{name}'"),
            SettingOwner::Hud(identity) => write!(f, "HUD element '{identity}'"),
        }
    }
}

/// Anything that owns settings.
pub trait Configurable {
    fn settings(&self) -> &Settings;
    fn settings_mut(&mut self) -> &mut Settings;
    fn owner(&self) -> SettingOwner;
}

/// Called after any module's activation changed.
pub type ActivationListener = Arc<dyn Fn(&[Module]) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct Model {
    modules: Vec<Module>,
    hud: Vec<HudElement>,
    next_hud_id: u64,
    frame: u64,
    listeners: Vec<(ListenerId, ActivationListener)>,
    next_listener: u64,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Registration ──────────────────────────────────────────────────────

    /// # Errors
    ///
    /// [`ModelError::DuplicateModule`] if the name is taken.
    pub fn add_module(&mut self, module: Module) -> Result<(), ModelError> {
        if self.module(module.name()).is_some() {
            return Err(ModelError::DuplicateModule(module.name().to_string()));
        }
        self.modules.push(module);
        Ok(())
    }

    /// Adds a HUD element, assigning its instance id.  Returns its identity.
    pub fn add_hud_element(&mut self, mut element: HudElement) -> String {
        self.next_hud_id += 1;
        element.assign_id(self.next_hud_id);
        let identity = element.identifier();
        self.hud.push(element);
        identity
    }

    // ── Modules ───────────────────────────────────────────────────────────

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Mutable access for setting hooks.  Activation is only changed
    /// through [`Model::toggle_module`] and [`Model::set_module_active`].
    pub fn modules_mut(&mut self) -> &mut [Module] {
        &mut self.modules
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name() == name)
    }

    pub fn module_mut(&mut self, name: &str) -> Option<&mut Module> {
        self.modules.iter_mut().find(|m| m.name() == name)
    }

    pub fn module_names(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.name().to_string()).collect()
    }

    /// Modules grouped by category in first-appearance order.  The `hud`
    /// category is skipped.
    pub fn modules_by_category(&self) -> Vec<(&str, Vec<&Module>)> {
        let mut groups: Vec<(&str, Vec<&Module>)> = Vec::new();
        for module in &self.modules {
            if module.category().eq_ignore_ascii_case(HUD_CATEGORY) {
                continue;
            }
            match groups.iter_mut().find(|(cat, _)| *cat == module.category()) {
                Some((_, list)) => list.push(module),
                None => groups.push((module.category(), vec![module])),
            }
        }
        groups
    }

    /// Flips a module's activation and returns the new state.
    ///
    /// # Errors
    ///
    /// [`ModelError::ModuleNotFound`].
    pub fn toggle_module(&mut self, name: &str) -> Result<bool, ModelError> {
        let module = self
            .module_mut(name)
            .ok_or_else(|| ModelError::ModuleNotFound(name.to_string()))?;
        let active = !module.is_active();
        module.set_active(active);
        debug!("module '{name}' toggled {}", if active { "on" } else { "off" });
        self.fire_activation();
        Ok(active)
    }

    /// Sets a module's activation.  Listeners only fire on an actual change.
    ///
    /// # Errors
    ///
    /// [`ModelError::ModuleNotFound`].
    pub fn set_module_active(&mut self, name: &str, active: bool) -> Result<bool, ModelError> {
        let module = self
            .module_mut(name)
            .ok_or_else(|| ModelError::ModuleNotFound(name.to_string()))?;
        if module.is_active() == active {
            return Ok(false);
        }
        module.set_active(active);
        self.fire_activation();
        Ok(true)
    }

    pub fn subscribe_activation(&mut self, listener: ActivationListener) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe_activation(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    fn fire_activation(&self) {
        for (_, listener) in &self.listeners {
            listener(&self.modules);
        }
    }

    // ── HUD ───────────────────────────────────────────────────────────────

    pub fn hud_elements(&self) -> &[HudElement] {
        &self.hud
    }

    pub fn hud_elements_mut(&mut self) -> &mut [HudElement] {
        &mut self.hud
    }

    /// First element addressed by `identity`; see [`HudElement::matches`].
    pub fn find_hud(&self, identity: &str) -> Option<&HudElement> {
        self.hud.iter().find(|e| e.matches(identity))
    }

    pub fn find_hud_mut(&mut self, identity: &str) -> Option<&mut HudElement> {
        self.hud.iter_mut().find(|e| e.matches(identity))
    }

    /// Flips a HUD element's activation and returns its identity and new
    /// state.  Change broadcasts come from the next HUD scan.
    ///
    /// # Errors
    ///
    /// [`ModelError::HudNotFound`].
    pub fn toggle_hud(&mut self, identity: &str) -> Result<(String, bool), ModelError> {
        let element = self
            .find_hud_mut(identity)
            .ok_or_else(|| ModelError::HudNotFound(identity.to_string()))?;
        let active = !element.is_active();
        element.set_active(active);
        Ok((element.identifier(), active))
    }

    /// Looks up a setting owner: modules by exact name first, then HUD
    /// elements by identity.
    pub fn find_owner_mut(&mut self, target: &str) -> Option<&mut dyn Configurable> {
        if let Some(idx) = self.modules.iter().position(|m| m.name() == target) {
            return Some(&mut self.modules[idx] as &mut dyn Configurable);
        }
        self.find_hud_mut(target).map(|e| e as &mut dyn Configurable)
    }

    pub fn find_owner(&self, target: &str) -> Option<&dyn Configurable> {
        if let Some(module) = self.module(target) {
            return Some(module as &dyn Configurable);
        }
        self.find_hud(target).map(|e| e as &dyn Configurable)
    }

    // ── Rendering ─────────────────────────────────────────────────────────

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Renders one frame of every active HUD element.
    ///
    /// When `capture` is enabled each pass gets its own buffer, sealed into a
    /// snapshot once the element finishes drawing.  A render error discards
    /// that element's buffer and leaves the others alone.
    pub fn render_hud(&mut self, capture: &PreviewCapture) {
        self.frame += 1;
        let frame = self.frame;

        for element in self.hud.iter_mut() {
            if !element.is_active() {
                continue;
            }

            let mut buffer = capture.begin(element);
            let mut renderer = HudRenderer::new(element.bounds(), frame, buffer.as_mut());
            let result = element.content().render(element.settings(), &mut renderer);
            let resized = renderer.requested_size();
            drop(renderer);

            if let Some((width, height)) = resized {
                element.set_size(width, height);
            }

            match result {
                Ok(()) => {
                    if let Some(mut buffer) = buffer {
                        buffer.set_bounds(element.bounds());
                        capture.finish(buffer);
                    }
                }
                Err(e) => warn!("HUD element '{}' failed to render: {e}", element.identifier()),
            }
        }
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("modules", &self.modules.len())
            .field("hud", &self.hud.len())
            .field("frame", &self.frame)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
