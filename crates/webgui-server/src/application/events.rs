//! Conversion of detected changes into broadcast envelopes.

use crate::application::change_monitor::ChangeEvent;
use crate::domain::messages::{HudStateChanged, ModuleStateChanged, OwnerName, SettingValueChanged};
use crate::domain::{Envelope, MessageKind};

/// Builds the broadcast for `event`.
///
/// HUD activation reuses `module.state.changed` with an `elementName` field
/// and the element's bounds; HUD setting changes use `elementName` in
/// `setting.value.changed`.
pub fn to_envelope(event: &ChangeEvent) -> Envelope {
    match event {
        ChangeEvent::ModuleActivation { name, active } => Envelope::new(
            MessageKind::ModuleStateChanged,
            ModuleStateChanged {
                module_name: name.clone(),
                active: *active,
            },
        ),
        ChangeEvent::HudActivation {
            identity,
            active,
            bounds,
        } => Envelope::new(
            MessageKind::ModuleStateChanged,
            HudStateChanged {
                element_name: identity.clone(),
                active: *active,
                bounds: *bounds,
            },
        ),
        ChangeEvent::SettingChanged { owner, setting, value } => Envelope::new(
            MessageKind::SettingValueChanged,
            SettingValueChanged {
                target: OwnerName::from(owner),
                setting_name: setting.clone(),
                value: value.clone(),
            },
        ),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use webgui_core::{Rect, SettingOwner};

    use super::*;

    #[test]
    fn test_module_activation_envelope() {
        // Arrange
        let event = ChangeEvent::ModuleActivation {
            name: "Foo".into(),
            active: true,
        };

        // Act
        let env = to_envelope(&event);

        // Assert
        assert_eq!(env.kind, "module.state.changed");
        assert_eq!(env.data, json!({"moduleName": "Foo", "active": true}));
        assert_eq!(env.id, None);
    }

    #[test]
    fn test_hud_activation_envelope_carries_bounds() {
        let env = to_envelope(&ChangeEvent::HudActivation {
            identity: "hud::clock#1".into(),
            active: false,
            bounds: Rect {
                x: 4,
                y: 8,
                width: 40,
                height: 9,
            },
        });

        assert_eq!(env.kind, "module.state.changed");
        assert_eq!(
            env.data,
            json!({"elementName": "hud::clock#1", "active": false, "x": 4, "y": 8, "width": 40, "height": 9})
        );
    }

    #[test]
    fn test_hud_setting_change_uses_element_name() {
        let env = to_envelope(&ChangeEvent::SettingChanged {
            owner: SettingOwner::Hud("hud::clock#1".into()),
            setting: "scale".into(),
            value: json!({"value": 1.5}),
        });

        assert_eq!(env.kind, "setting.value.changed");
        assert_eq!(
            env.data,
            json!({"elementName": "hud::clock#1", "settingName": "scale", "value": {"value": 1.5}})
        );
    }
}
