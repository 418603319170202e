//! In-process sample host so the binary runs standalone.
//!
//! Real embeddings supply their own [`Model`] and [`RegistryProvider`]; this
//! one builds a small client-like model (modules in several categories with
//! one setting of every kind, a handful of HUD elements) and drives the HUD
//! at 20 Hz so previews and activation scans have something to observe.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{anyhow, Context};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};
use webgui_core::setting::value::modifiers;
use webgui_core::setting::{DoubleRange, IntRange};
use webgui_core::{
    BlockPos, FontFace, FontStyle, HudContent, HudElement, HudElementInfo, HudRenderer, Keybind, Model, Module,
    PreviewCapture, Rect, RegistryEntry, RegistryKind, RegistryProvider, RenderError, Setting, SettingColor,
    SettingKind, SettingValue, Settings, StaticRegistry, Vector3d,
};

/// One render pass every 50 ms.
pub const RENDER_PERIOD: Duration = Duration::from_millis(50);

const ARGB_WHITE: u32 = 0xFFFF_FFFF;

// ── Registries ────────────────────────────────────────────────────────────────

pub fn registry() -> StaticRegistry {
    let mut reg = StaticRegistry::new()
        .with_entries(
            RegistryKind::Block,
            ["air", "stone", "dirt", "chest", "diamond_ore", "ancient_debris", "spawner"],
        )
        .with_entries(
            RegistryKind::Item,
            ["diamond", "totem_of_undying", "golden_apple", "ender_pearl", "elytra"],
        )
        .with_entries(RegistryKind::EntityType, ["player", "zombie", "creeper", "skeleton", "enderman"])
        .with_entries(RegistryKind::StatusEffect, ["speed", "haste", "strength", "regeneration"])
        .with_entries(RegistryKind::Potion, ["swiftness", "healing", "strength"])
        .with_entries(RegistryKind::Enchantment, ["sharpness", "protection", "mending"])
        .with_entries(RegistryKind::ParticleType, ["flame", "explosion", "portal"])
        .with_entries(RegistryKind::SoundEvent, ["block.note_block.pling", "entity.experience_orb.pickup"])
        .with_entries(RegistryKind::BlockEntityType, ["chest", "barrel", "shulker_box", "furnace"])
        .with_entries(RegistryKind::ScreenHandler, ["generic_9x3", "anvil", "crafting"])
        .with_entries(RegistryKind::Packet, ["PlayerMoveC2SPacket", "ChatMessageC2SPacket"]);
    reg.set_default(RegistryKind::Block, "air");
    reg
}

fn entry(reg: &StaticRegistry, kind: RegistryKind, key: &str) -> anyhow::Result<RegistryEntry> {
    reg.resolve(kind, key)
        .ok_or_else(|| anyhow!("demo {} '{key}' is not registered", kind.label()))
}

fn entries(reg: &StaticRegistry, kind: RegistryKind, keys: &[&str]) -> anyhow::Result<SettingValue> {
    keys.iter()
        .map(|k| entry(reg, kind, k))
        .collect::<anyhow::Result<Vec<_>>>()
        .map(SettingValue::Entries)
}

// ── Model ─────────────────────────────────────────────────────────────────────

/// Builds the sample model against `reg`.
///
/// # Errors
///
/// Fails only if the sample data itself is inconsistent (unregistered key,
/// duplicate setting name).
pub fn build_model(reg: &StaticRegistry) -> anyhow::Result<Model> {
    let mut model = Model::new();

    model.add_module(flight()?)?;
    model.add_module(kill_aura(reg)?)?;
    model.add_module(search(reg)?)?;
    model.add_module(auto_totem(reg)?)?;
    model.add_module(packet_canceller(reg)?)?;
    model.add_module(waypoint()?)?;
    model.add_module(Module::new("Freecam", "Render").with_description("Detaches the camera."))?;

    model.add_hud_element(watermark()?);
    model.add_hud_element(
        HudElement::new(HudElementInfo::new("coordinates").with_title("Coordinates"), Coordinates)
            .with_bounds(Rect {
                x: 2,
                y: 20,
                width: 0,
                height: 0,
            })
            .activated(),
    );
    model.add_hud_element(
        HudElement::new(
            HudElementInfo::new("compass").with_title("Compass").with_group("Minimap"),
            Compass,
        )
        .with_bounds(Rect {
            x: 200,
            y: 2,
            width: 64,
            height: 64,
        })
        .activated(),
    );
    model.add_hud_element(HudElement::new(
        HudElementInfo::new("armor").with_title("Armor").with_description("Shows worn armor."),
        Armor,
    ));

    info!(
        "demo host: {} modules, {} HUD elements",
        model.modules().len(),
        model.hud_elements().len()
    );
    Ok(model)
}

fn int_range(min: i32, max: i32) -> IntRange {
    IntRange {
        min,
        max,
        slider_min: min,
        slider_max: max,
        no_slider: false,
    }
}

fn flight() -> anyhow::Result<Module> {
    let mut s = Settings::new();
    s.add(
        "General",
        Setting::new("mode", SettingKind::Enum, Some(SettingValue::Text("Abilities".into())))?
            .with_suggestions(["Abilities", "Velocity"]),
    )?;
    s.add(
        "General",
        Setting::new("speed", SettingKind::Double, Some(SettingValue::Double(0.1)))?.with_double_range(DoubleRange {
            min: 0.0,
            slider_max: 5.0,
            ..DoubleRange::default()
        }),
    )?;
    s.add(
        "General",
        Setting::new("no-fall", SettingKind::Bool, Some(SettingValue::Bool(true)))?,
    )?;
    s.add(
        "Anti Kick",
        Setting::new("delay", SettingKind::Int, Some(SettingValue::Int(20)))?.with_int_range(int_range(1, 200)),
    )?;
    s.add(
        "Bind",
        Setting::new(
            "keybind",
            SettingKind::Keybind,
            Some(SettingValue::Keybind(Keybind {
                is_key: true,
                value: 70,
                modifiers: modifiers::CTRL,
            })),
        )?,
    )?;
    Ok(Module::new("Flight", "Movement")
        .with_description("Lets you fly.")
        .with_settings(s))
}

fn kill_aura(reg: &StaticRegistry) -> anyhow::Result<Module> {
    let mut s = Settings::new();
    s.add(
        "Targeting",
        Setting::new(
            "entities",
            SettingKind::EntityTypeList,
            Some(entries(reg, RegistryKind::EntityType, &["zombie", "skeleton"])?),
        )?,
    )?;
    s.add(
        "Targeting",
        Setting::new("range", SettingKind::Double, Some(SettingValue::Double(4.5)))?.with_double_range(DoubleRange {
            min: 0.0,
            max: 6.0,
            slider_max: 6.0,
            decimal_places: 1,
            ..DoubleRange::default()
        }),
    )?;
    s.add(
        "Targeting",
        Setting::new(
            "priority",
            SettingKind::ProvidedString,
            Some(SettingValue::Text("closest".into())),
        )?
        .with_suggestions(["closest", "lowest-health", "highest-health"]),
    )?;
    s.add(
        "Requirements",
        Setting::new(
            "weapons",
            SettingKind::ItemList,
            Some(entries(reg, RegistryKind::Item, &["diamond"])?),
        )?,
    )?;
    s.add(
        "Requirements",
        Setting::new(
            "required-effects",
            SettingKind::StatusEffectAmplifierMap,
            Some(SettingValue::AmplifierMap(vec![
                (entry(reg, RegistryKind::StatusEffect, "strength")?, 1),
                (entry(reg, RegistryKind::StatusEffect, "speed")?, 0),
            ])),
        )?,
    )?;
    s.add(
        "Requirements",
        Setting::new(
            "ignore-effects",
            SettingKind::StatusEffectList,
            Some(SettingValue::Entries(Vec::new())),
        )?,
    )?;
    s.add(
        "Requirements",
        Setting::new(
            "required-enchantments",
            SettingKind::EnchantmentList,
            Some(entries(reg, RegistryKind::Enchantment, &["sharpness"])?),
        )?,
    )?;
    Ok(Module::new("KillAura", "Combat")
        .with_title("Kill Aura")
        .with_description("Attacks entities around you.")
        .with_settings(s))
}

fn search(reg: &StaticRegistry) -> anyhow::Result<Module> {
    let mut s = Settings::new();
    s.add(
        "General",
        Setting::new(
            "blocks",
            SettingKind::BlockList,
            Some(entries(reg, RegistryKind::Block, &["diamond_ore", "ancient_debris", "spawner"])?),
        )?,
    )?;
    s.add(
        "General",
        Setting::new(
            "block-configs",
            SettingKind::BlockData,
            Some(SettingValue::BlockData(vec![(
                entry(reg, RegistryKind::Block, "spawner")?,
                r#"{"tracer":true}"#.into(),
            )])),
        )?,
    )?;
    s.add(
        "General",
        Setting::new("default-block", SettingKind::Block, Some(SettingValue::Entry(entry(reg, RegistryKind::Block, "stone")?)))?,
    )?;
    s.add(
        "Render",
        Setting::new(
            "color",
            SettingKind::Color,
            Some(SettingValue::Color(SettingColor::rgba(0, 200, 255, 120))),
        )?,
    )?;
    s.add(
        "Render",
        Setting::new(
            "palette",
            SettingKind::ColorList,
            Some(SettingValue::Colors(vec![
                SettingColor::WHITE,
                SettingColor {
                    rainbow: true,
                    ..SettingColor::rgba(255, 0, 0, 255)
                },
            ])),
        )?,
    )?;
    s.add(
        "Render",
        Setting::new(
            "font",
            SettingKind::FontFace,
            Some(SettingValue::FontFace(FontFace {
                family: "JetBrains Mono".into(),
                style: FontStyle::Bold,
            })),
        )?,
    )?;
    s.add(
        "Render",
        Setting::new(
            "particles",
            SettingKind::ParticleTypeList,
            Some(entries(reg, RegistryKind::ParticleType, &["portal"])?),
        )?,
    )?;
    Ok(Module::new("Search", "Render")
        .with_description("Highlights chosen blocks.")
        .with_settings(s))
}

fn auto_totem(reg: &StaticRegistry) -> anyhow::Result<Module> {
    let mut s = Settings::new();
    s.add(
        "General",
        Setting::new("item", SettingKind::Item, Some(SettingValue::Entry(entry(reg, RegistryKind::Item, "totem_of_undying")?)))?,
    )?;
    s.add(
        "General",
        Setting::new("potion", SettingKind::Potion, Some(SettingValue::Entry(entry(reg, RegistryKind::Potion, "healing")?)))?,
    )?;
    s.add(
        "General",
        Setting::new(
            "containers",
            SettingKind::StorageBlockList,
            Some(entries(reg, RegistryKind::BlockEntityType, &["chest", "barrel", "shulker_box"])?),
        )?,
    )?;
    s.add(
        "General",
        Setting::new(
            "screens",
            SettingKind::ScreenHandlerList,
            Some(entries(reg, RegistryKind::ScreenHandler, &["generic_9x3"])?),
        )?,
    )?;
    s.add(
        "Notify",
        Setting::new(
            "sounds",
            SettingKind::SoundEventList,
            Some(entries(reg, RegistryKind::SoundEvent, &["block.note_block.pling"])?),
        )?,
    )?;
    s.add(
        "Notify",
        Setting::new("message", SettingKind::String, Some(SettingValue::Text("Totem popped!".into())))?,
    )?;
    Ok(Module::new("AutoTotem", "Combat")
        .with_title("Auto Totem")
        .with_description("Keeps a totem in your offhand.")
        .with_addon("Meteor Addon Template")
        .with_settings(s))
}

fn packet_canceller(reg: &StaticRegistry) -> anyhow::Result<Module> {
    let mut s = Settings::new();
    s.add(
        "General",
        Setting::new(
            "c2s-packets",
            SettingKind::PacketList,
            Some(entries(reg, RegistryKind::Packet, &["PlayerMoveC2SPacket"])?),
        )?,
    )?;
    s.add(
        "General",
        Setting::new(
            "modules",
            SettingKind::ModuleList,
            Some(SettingValue::Names(vec!["Flight".into()])),
        )?,
    )?;
    s.add(
        "General",
        Setting::new(
            "commands",
            SettingKind::StringList,
            Some(SettingValue::Names(vec![".toggle flight".into()])),
        )?,
    )?;
    s.add("Internal", Setting::new("handler", SettingKind::Generic, None)?.hidden())?;
    Ok(Module::new("PacketCanceller", "Misc")
        .with_title("Packet Canceller")
        .with_description("Drops chosen packets.")
        .with_settings(s))
}

fn waypoint() -> anyhow::Result<Module> {
    let mut s = Settings::new();
    s.add(
        "General",
        Setting::new(
            "position",
            SettingKind::BlockPos,
            Some(SettingValue::BlockPos(BlockPos { x: 0, y: 64, z: 0 })),
        )?,
    )?;
    s.add(
        "General",
        Setting::new(
            "offset",
            SettingKind::Vector3d,
            Some(SettingValue::Vector3d(Vector3d { x: 0.5, y: 1.0, z: 0.5 })),
        )?,
    )?;
    Ok(Module::new("Waypoint", "World")
        .with_description("Marks a location.")
        .with_settings(s))
}

// ── HUD content ───────────────────────────────────────────────────────────────

fn watermark() -> anyhow::Result<HudElement> {
    let mut s = Settings::new();
    s.add(
        "General",
        Setting::new("text", SettingKind::String, Some(SettingValue::Text("Meteor Client".into())))?,
    )?;
    s.add(
        "General",
        Setting::new("scale", SettingKind::Double, Some(SettingValue::Double(1.0)))?.with_double_range(DoubleRange {
            min: 0.5,
            max: 3.0,
            slider_min: 0.5,
            slider_max: 3.0,
            ..DoubleRange::default()
        }),
    )?;
    s.add(
        "General",
        Setting::new("color", SettingKind::Color, Some(SettingValue::Color(SettingColor::rgba(145, 61, 226, 255))))?,
    )?;
    Ok(HudElement::new(
        HudElementInfo::new("watermark").with_title("Watermark").with_description("Client name."),
        Watermark,
    )
    .with_bounds(Rect {
        x: 2,
        y: 2,
        width: 0,
        height: 0,
    })
    .with_settings(s)
    .activated())
}

struct Watermark;

impl HudContent for Watermark {
    fn render(&self, settings: &Settings, r: &mut HudRenderer<'_>) -> Result<(), RenderError> {
        let text = match settings.find("text").and_then(Setting::effective_value) {
            Some(SettingValue::Text(t)) => t.as_str(),
            _ => "Meteor Client",
        };
        let scale = match settings.find("scale").and_then(Setting::effective_value) {
            Some(SettingValue::Double(d)) => *d,
            _ => 1.0,
        };
        let color = match settings.find("color").and_then(Setting::effective_value) {
            Some(SettingValue::Color(c)) => c.packed(),
            _ => ARGB_WHITE,
        };
        let width = r.text_scaled(text, 0.0, 0.0, color, true, scale);
        r.set_size(width.ceil() as i32, HudRenderer::text_height(scale).ceil() as i32);
        Ok(())
    }
}

/// Text that changes about once a second, so previews keep updating.
struct Coordinates;

impl HudContent for Coordinates {
    fn render(&self, _: &Settings, r: &mut HudRenderer<'_>) -> Result<(), RenderError> {
        let step = (r.frame() / 20) as i64;
        let line = format!("XYZ: {}, 64, {}", 100 + step % 50, -30 - step % 17);
        let width = r.text(&line, 0.0, 0.0, ARGB_WHITE, true);
        r.set_size(width.ceil() as i32, HudRenderer::text_height(1.0).ceil() as i32);
        Ok(())
    }
}

/// Mixed output: a drawn dial plus a heading label.
struct Compass;

impl HudContent for Compass {
    fn render(&self, _: &Settings, r: &mut HudRenderer<'_>) -> Result<(), RenderError> {
        let bounds = r.bounds();
        let (w, h) = (f64::from(bounds.width), f64::from(bounds.height));
        r.quad(0.0, 0.0, w, h, 0x8000_0000);
        r.line(w / 2.0, h / 2.0, w / 2.0, 4.0, 0xFFFF_0000);
        r.text("N", w / 2.0 - 3.0, 0.0, ARGB_WHITE, false);
        Ok(())
    }
}

/// Non-text only.
struct Armor;

impl HudContent for Armor {
    fn render(&self, _: &Settings, r: &mut HudRenderer<'_>) -> Result<(), RenderError> {
        for (i, item) in ["minecraft:diamond_helmet", "minecraft:elytra"].iter().enumerate() {
            r.item(item, i as i32 * 18, 0, 1.0);
        }
        r.set_size(36, 16);
        Ok(())
    }
}

// ── Render loop ───────────────────────────────────────────────────────────────

/// Renders the HUD every [`RENDER_PERIOD`] until `running` is cleared.
pub fn spawn_render_loop(
    model: Arc<Mutex<Model>>,
    capture: Arc<PreviewCapture>,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(RENDER_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        while running.load(Ordering::Relaxed) {
            ticker.tick().await;
            model
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .render_hud(&capture);
        }
        debug!("demo render loop stopped");
    })
}

/// Registry and model ready to hand to the service.
///
/// # Errors
///
/// See [`build_model`].
pub fn build() -> anyhow::Result<(Arc<Mutex<Model>>, Arc<StaticRegistry>)> {
    let reg = registry();
    let model = build_model(&reg).context("failed to build demo model")?;
    Ok((Arc::new(Mutex::new(model)), Arc::new(reg)))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use webgui_core::codec::encode;
    use webgui_core::Configurable;

    use super::*;

    #[test]
    fn test_demo_model_covers_every_setting_kind() {
        // Arrange
        let reg = registry();

        // Act
        let model = build_model(&reg).unwrap();

        // Assert
        let kinds: HashSet<SettingKind> = model
            .modules()
            .iter()
            .flat_map(|m| m.settings().groups())
            .flat_map(|g| g.settings())
            .map(Setting::kind)
            .collect();
        for kind in SettingKind::ALL {
            if kind != SettingKind::Unknown {
                assert!(kinds.contains(&kind), "no demo setting of kind {kind:?}");
            }
        }
    }

    #[test]
    fn test_demo_settings_encode() {
        let model = build_model(&registry()).unwrap();
        for module in model.modules() {
            for group in module.settings().groups() {
                for setting in group.settings() {
                    assert!(encode(setting).is_object(), "{}::{}", module.name(), setting.name());
                }
            }
        }
    }

    #[test]
    fn test_demo_hud_has_text_and_non_text_output() {
        // Arrange
        let mut model = build_model(&registry()).unwrap();
        let capture = PreviewCapture::new();
        capture.set_enabled(true);
        model.toggle_hud("armor").unwrap();

        // Act
        model.render_hud(&capture);

        // Assert
        let snapshots = capture.snapshots();
        assert_eq!(snapshots.len(), 4);
        assert!(snapshots.iter().any(|s| s.has_non_text && s.lines.is_empty()));
        assert!(snapshots.iter().any(|s| s.has_non_text && !s.lines.is_empty()));
        assert!(snapshots.iter().any(|s| !s.has_non_text && s.lines[0].text == "Meteor Client"));
    }
}
