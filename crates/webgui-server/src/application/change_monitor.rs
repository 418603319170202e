//! Change detection for external mutation of the model.
//!
//! Two mechanisms feed the same [`ChangeSink`]:
//!
//! - **Activation scans.**  The model's activation listener is not told
//!   which module changed, so every notification re-scans all modules and
//!   diffs them against the last-known table.  HUD elements have no listener
//!   at all and are scanned on a timer instead.  Both scans are O(N) in the
//!   number of entities; reporting *which* entity changed would need the
//!   model to carry that information.
//! - **Setting observers.**  [`ChangeMonitor::install`] registers one
//!   observer per setting through [`Setting::add_observer`].  The setting
//!   runs its own `on_changed` callback first, then the observer, which
//!   emits exactly one [`ChangeEvent::SettingChanged`].
//!   [`ChangeMonitor::uninstall`] removes every observer it added, leaving
//!   the original callbacks as the only ones registered.
//!
//! Lock order: the caller holds the model lock, the monitor then takes its
//! own state lock, and the sink may take the connection lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{debug, info, warn};
use webgui_core::codec::encode;
use webgui_core::model::ListenerId;
use webgui_core::setting::ObserverId;
use webgui_core::{Configurable, Model, Module, Rect, Setting, SettingOwner};

/// One detected change.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    ModuleActivation {
        name: String,
        active: bool,
    },
    HudActivation {
        identity: String,
        active: bool,
        bounds: Rect,
    },
    SettingChanged {
        owner: SettingOwner,
        setting: String,
        value: Value,
    },
}

/// Receives change events, in detection order within one scan.
#[cfg_attr(test, mockall::automock)]
pub trait ChangeSink: Send + Sync {
    fn emit(&self, event: ChangeEvent);
}

#[derive(Debug, Default)]
struct MonitorState {
    modules: HashMap<String, bool>,
    hud: HashMap<String, bool>,
    listener: Option<ListenerId>,
    observers: Vec<(SettingOwner, String, ObserverId)>,
}

pub struct ChangeMonitor {
    sink: Arc<dyn ChangeSink>,
    state: Mutex<MonitorState>,
}

impl ChangeMonitor {
    pub fn new(sink: Arc<dyn ChangeSink>) -> Self {
        Self {
            sink,
            state: Mutex::new(MonitorState::default()),
        }
    }

    pub fn is_installed(&self) -> bool {
        self.lock().listener.is_some()
    }

    /// Number of setting observers currently registered.
    pub fn hooked_settings(&self) -> usize {
        self.lock().observers.len()
    }

    /// Records the current activation of every entity, subscribes to module
    /// activation and registers a change observer on every setting.
    ///
    /// Calling this again while installed does nothing.  Returns the number
    /// of settings hooked by this call.
    pub fn install(self: &Arc<Self>, model: &mut Model) -> usize {
        let mut state = self.lock();
        if state.listener.is_some() {
            debug!("change monitor already installed");
            return 0;
        }

        state.modules = model
            .modules()
            .iter()
            .map(|m| (m.name().to_string(), m.is_active()))
            .collect();
        state.hud = model
            .hud_elements()
            .iter()
            .map(|e| (e.identifier(), e.is_active()))
            .collect();

        let monitor = Arc::clone(self);
        state.listener = Some(model.subscribe_activation(Arc::new(move |modules: &[Module]| {
            monitor.scan_modules(modules);
        })));

        for module in model.modules_mut() {
            hook_settings(&self.sink, module, &mut state.observers);
        }
        for element in model.hud_elements_mut() {
            hook_settings(&self.sink, element, &mut state.observers);
        }

        info!(
            "change monitor installed: {} modules, {} HUD elements, {} settings",
            state.modules.len(),
            state.hud.len(),
            state.observers.len()
        );
        state.observers.len()
    }

    /// Removes the activation listener and every observer added by
    /// [`install`](Self::install), and forgets all last-known state.
    pub fn uninstall(&self, model: &mut Model) {
        let mut state = self.lock();
        let Some(listener) = state.listener.take() else {
            return;
        };
        model.unsubscribe_activation(listener);

        let mut removed = 0;
        for (owner, setting, id) in state.observers.drain(..) {
            let found = model
                .find_owner_mut(owner.name())
                .filter(|o| o.owner() == owner)
                .and_then(|o| o.settings_mut().find_mut(&setting))
                .map(|s| s.remove_observer(id))
                .unwrap_or(false);
            if found {
                removed += 1;
            } else {
                warn!("{owner}: setting '{setting}' vanished before its observer could be removed");
            }
        }

        state.modules.clear();
        state.hud.clear();
        info!("change monitor uninstalled ({removed} observers removed)");
    }

    /// Diffs every module against the last-known table and emits one
    /// [`ChangeEvent::ModuleActivation`] per difference, in module order.
    ///
    /// The activation listener does not say which module changed, so every
    /// event costs a full O(modules) pass.
    pub fn scan_modules(&self, modules: &[Module]) -> usize {
        let mut state = self.lock();
        let mut emitted = 0;
        for module in modules {
            let active = module.is_active();
            let previous = state.modules.insert(module.name().to_string(), active);
            if previous != Some(active) {
                debug!("module state changed: {} -> {active}", module.name());
                self.sink.emit(ChangeEvent::ModuleActivation {
                    name: module.name().to_string(),
                    active,
                });
                emitted += 1;
            }
        }
        emitted
    }

    /// Same as [`scan_modules`](Self::scan_modules) for HUD elements.
    /// Elements that disappeared are forgotten.
    pub fn scan_hud(&self, model: &Model) -> usize {
        let mut state = self.lock();
        let mut emitted = 0;
        for element in model.hud_elements() {
            let identity = element.identifier();
            let active = element.is_active();
            let previous = state.hud.insert(identity.clone(), active);
            if previous != Some(active) {
                debug!("HUD state changed: {identity} -> {active}");
                self.sink.emit(ChangeEvent::HudActivation {
                    identity,
                    active,
                    bounds: element.bounds(),
                });
                emitted += 1;
            }
        }
        if state.hud.len() > model.hud_elements().len() {
            state
                .hud
                .retain(|identity, _| model.hud_elements().iter().any(|e| e.identifier() == *identity));
        }
        emitted
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn hook_settings(
    sink: &Arc<dyn ChangeSink>,
    target: &mut dyn Configurable,
    observers: &mut Vec<(SettingOwner, String, ObserverId)>,
) {
    let owner = target.owner();
    for setting in target.settings_mut().iter_mut() {
        let sink = Arc::clone(sink);
        let event_owner = owner.clone();
        let id = setting.add_observer(Arc::new(move |s: &Setting| {
            sink.emit(ChangeEvent::SettingChanged {
                owner: event_owner.clone(),
                setting: s.name().to_string(),
                value: encode(s),
            });
        }));
        observers.push((owner.clone(), setting.name().to_string(), id));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
