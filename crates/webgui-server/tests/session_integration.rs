//! End-to-end tests: real WebSocket clients against a running sync service.
//!
//! Each test starts a [`SyncService`] over a small model, serves it on an
//! ephemeral port and talks to it with `tokio-tungstenite` clients.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use webgui_core::{
    HudContent, HudElement, HudElementInfo, HudRenderer, Model, Module, PreviewCapture, RenderError, Setting,
    SettingKind, SettingValue, Settings, StaticRegistry,
};
use webgui_server::domain::ServerConfig;
use webgui_server::infrastructure::{serve_listener, SyncService};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(3);

// ── Fixtures ──────────────────────────────────────────────────────────────────

struct Label;

impl HudContent for Label {
    fn render(&self, _: &Settings, r: &mut HudRenderer<'_>) -> Result<(), RenderError> {
        r.text("hello", 0.0, 0.0, 0xFFFF_FFFF, false);
        Ok(())
    }
}

fn model() -> Model {
    let mut settings = Settings::new();
    settings
        .add("General", Setting::new("speed", SettingKind::Int, Some(SettingValue::Int(1))).unwrap())
        .unwrap();
    let mut model = Model::new();
    model
        .add_module(Module::new("Foo", "Movement").with_settings(settings))
        .unwrap();
    model.add_module(Module::new("Bar", "Render")).unwrap();
    model.add_hud_element(HudElement::new(HudElementInfo::new("label"), Label).activated());
    model
}

struct Harness {
    addr: SocketAddr,
    model: Arc<Mutex<Model>>,
    capture: Arc<PreviewCapture>,
    service: SyncService,
}

impl Harness {
    async fn start() -> Self {
        let model = Arc::new(Mutex::new(model()));
        let capture = Arc::new(PreviewCapture::new());
        let config = ServerConfig {
            preview_interval: Duration::from_millis(20),
            hud_scan_interval: Duration::from_millis(20),
            ..ServerConfig::default()
        };
        let service = SyncService::start(
            config,
            Arc::clone(&model),
            Arc::new(StaticRegistry::new()),
            Arc::clone(&capture),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_listener(listener, service.context(), service.running()));

        Self {
            addr,
            model,
            capture,
            service,
        }
    }

    /// Connects and consumes the `initial.state` message.
    async fn connect(&self) -> (Client, Value) {
        let (mut ws, _) = connect_async(format!("ws://{}", self.addr)).await.unwrap();
        let initial = recv_json(&mut ws).await;
        assert_eq!(initial["type"], "initial.state");
        (ws, initial)
    }

    fn render(&self) {
        self.model.lock().unwrap().render_hud(&self.capture);
    }
}

async fn send(ws: &mut Client, value: Value) {
    ws.send(Message::Text(value.to_string())).await.unwrap();
}

async fn recv_json(ws: &mut Client) -> Value {
    loop {
        let frame = timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Skips messages until one of type `kind` arrives.
async fn recv_kind(ws: &mut Client, kind: &str) -> Value {
    loop {
        let value = recv_json(ws).await;
        if value["type"] == kind {
            return value;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_initial_state_lists_modules_and_hud() {
    // Arrange
    let harness = Harness::start().await;

    // Act
    let (_ws, initial) = harness.connect().await;

    // Assert
    let data = &initial["data"];
    assert_eq!(data["modules"]["Movement"][0]["name"], "Foo");
    assert_eq!(data["modules"]["Render"][0]["name"], "Bar");
    assert_eq!(data["hud"]["elements"][0]["category"], "HUD");
    assert!(data["hud"]["previews"].as_array().unwrap().is_empty());
    harness.service.shutdown().await;
}

#[tokio::test]
async fn test_toggle_replies_with_id_and_broadcasts_to_every_client() {
    // Arrange
    let harness = Harness::start().await;
    let (mut alice, _) = harness.connect().await;
    let (mut bob, _) = harness.connect().await;

    // Act
    send(
        &mut alice,
        json!({"type": "module.toggle", "data": {"moduleName": "Foo"}, "id": "42"}),
    )
    .await;

    // Assert
    let reply = recv_kind(&mut alice, "response").await;
    assert_eq!(reply["id"], "42");
    assert_eq!(reply["data"], json!({"success": true, "moduleName": "Foo", "active": true}));

    let event = recv_kind(&mut bob, "module.state.changed").await;
    assert_eq!(event["data"], json!({"moduleName": "Foo", "active": true}));
    assert!(event.get("id").is_none());
    harness.service.shutdown().await;
}

#[tokio::test]
async fn test_unknown_setting_returns_error_and_connection_survives() {
    // Arrange
    let harness = Harness::start().await;
    let (mut ws, _) = harness.connect().await;

    // Act
    send(
        &mut ws,
        json!({"type": "setting.get", "data": {"moduleName": "Foo", "settingName": "missing"}, "id": "7"}),
    )
    .await;
    let error = recv_json(&mut ws).await;
    send(&mut ws, json!({"type": "ping", "id": "8"})).await;
    let pong = recv_json(&mut ws).await;

    // Assert
    assert_eq!(error["type"], "error");
    assert_eq!(error["id"], "7");
    assert!(error["data"]["error"].as_str().unwrap().contains("missing"));
    assert_eq!(pong["type"], "pong");
    assert_eq!(pong["id"], "8");
    harness.service.shutdown().await;
}

#[tokio::test]
async fn test_malformed_frame_returns_error() {
    let harness = Harness::start().await;
    let (mut ws, _) = harness.connect().await;

    ws.send(Message::Text("{not json".into())).await.unwrap();
    let error = recv_json(&mut ws).await;
    send(&mut ws, json!({"type": "no.such.kind", "id": "1"})).await;
    let unknown = recv_json(&mut ws).await;

    assert_eq!(error["type"], "error");
    assert_eq!(unknown["type"], "error");
    assert_eq!(unknown["id"], "1");
    assert_eq!(unknown["data"]["error"], "Unknown message type: no.such.kind");
    harness.service.shutdown().await;
}

#[tokio::test]
async fn test_setting_update_is_broadcast() {
    // Arrange
    let harness = Harness::start().await;
    let (mut alice, _) = harness.connect().await;
    let (mut bob, _) = harness.connect().await;

    // Act
    send(
        &mut alice,
        json!({
            "type": "setting.update",
            "data": {"moduleName": "Foo", "settingName": "speed", "value": {"value": 5}},
            "id": "u1",
        }),
    )
    .await;

    // Assert
    let reply = recv_kind(&mut alice, "response").await;
    assert_eq!(reply["data"]["success"], true);
    let event = recv_kind(&mut bob, "setting.value.changed").await;
    assert_eq!(
        event["data"],
        json!({"moduleName": "Foo", "settingName": "speed", "value": {"value": 5}})
    );
    harness.service.shutdown().await;
}

#[tokio::test]
async fn test_external_change_reaches_clients() {
    // Arrange
    let harness = Harness::start().await;
    let (mut ws, _) = harness.connect().await;

    // Act
    harness.model.lock().unwrap().set_module_active("Bar", true).unwrap();

    // Assert
    let event = recv_kind(&mut ws, "module.state.changed").await;
    assert_eq!(event["data"], json!({"moduleName": "Bar", "active": true}));
    harness.service.shutdown().await;
}

#[tokio::test]
async fn test_hud_identity_is_prefixed_in_state_and_broadcasts() {
    // Arrange
    let harness = Harness::start().await;
    let (mut alice, initial) = harness.connect().await;
    let (mut bob, _) = harness.connect().await;
    let name = initial["data"]["hud"]["elements"][0]["name"].as_str().unwrap().to_string();

    // Act
    send(
        &mut alice,
        json!({"type": "hud.toggle", "data": {"elementName": name}, "id": "h1"}),
    )
    .await;

    // Assert
    assert!(name.starts_with("hud::label#"));
    let reply = recv_kind(&mut alice, "response").await;
    assert_eq!(reply["data"]["elementName"], name.as_str());
    let event = recv_kind(&mut bob, "module.state.changed").await;
    assert_eq!(event["data"]["elementName"], name.as_str());
    assert_eq!(event["data"]["active"], false);
    harness.service.shutdown().await;
}

#[tokio::test]
async fn test_preview_republished_after_capture_reenabled() {
    // Arrange
    let harness = Harness::start().await;
    let (mut ws, _) = harness.connect().await;
    harness.render();
    let first = recv_kind(&mut ws, "hud.preview.update").await;
    assert_eq!(first["data"]["elements"][0]["lines"][0]["text"], "hello");

    // Act
    harness.capture.set_enabled(false);
    assert!(harness.capture.snapshots().is_empty());
    tokio::time::sleep(Duration::from_millis(60)).await;
    harness.capture.set_enabled(true);
    harness.render();

    // Assert
    let again = recv_kind(&mut ws, "hud.preview.update").await;
    assert_eq!(again["data"]["elements"][0]["lines"][0]["text"], "hello");
    harness.service.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_closes_client_connections() {
    // Arrange
    let harness = Harness::start().await;
    let (mut ws, _) = harness.connect().await;

    // Act
    harness.service.shutdown().await;

    // Assert
    let end = timeout(RECV_TIMEOUT, async {
        while let Some(frame) = ws.next().await {
            match frame {
                Ok(Message::Close(_)) | Err(_) => return,
                Ok(_) => {}
            }
        }
    })
    .await;
    assert!(end.is_ok());
}
