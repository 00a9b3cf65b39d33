//! Common Test Utilities for Integration Tests
//!
//! A mock backend standing in for the persistence store, the control
//! endpoints, and the frame producer, served on an ephemeral port.

use axum::{
    Json, Router,
    extract::{
        Form, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
    routing::{get, post, put},
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use framecast_client::config::Config;

/// Stored record for one user
#[derive(Debug, Clone, Default)]
pub struct UserEntry {
    pub rtsp_url: String,
    pub overlays: Vec<String>,
}

/// Everything the mock backend remembers
#[derive(Debug, Default)]
pub struct MockState {
    pub users: HashMap<String, UserEntry>,
    /// Frames pushed to every channel connection, in order: (sid, payload)
    pub frames: Vec<(String, String)>,
    /// Feed locators received over the channel
    pub rtsp_received: Vec<String>,
    /// Control calls received: (endpoint, sid)
    pub control_calls: Vec<(String, String)>,
}

pub type Shared = Arc<Mutex<MockState>>;

pub fn new_state() -> Shared {
    Arc::new(Mutex::new(MockState::default()))
}

fn pair_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn pair_values(pairs: &[(String, String)], key: &str) -> Vec<String> {
    pairs
        .iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
        .collect()
}

async fn get_user(
    State(state): State<Shared>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Json<serde_json::Value> {
    let user_name = pair_value(&pairs, "user_name").unwrap_or_default().to_string();
    let state = state.lock().unwrap();
    match state.users.get(&user_name) {
        Some(entry) => Json(serde_json::json!({
            "overlays": entry.overlays,
            "rtsp_url": entry.rtsp_url,
        })),
        None => Json(serde_json::json!({ "overlays": [] })),
    }
}

async fn add_user(
    State(state): State<Shared>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Json<serde_json::Value> {
    let user_name = pair_value(&pairs, "user_name").unwrap_or_default().to_string();
    let rtsp_url = pair_value(&pairs, "rtsp_url").unwrap_or_default().to_string();
    let incoming = pair_values(&pairs, "overlays");

    let mut state = state.lock().unwrap();
    let entry = state.users.entry(user_name).or_default();
    entry.rtsp_url = rtsp_url;
    // An existing user keeps (and echoes) the stored overlays; a new user
    // adopts what the registration carried.
    if entry.overlays.is_empty() {
        entry.overlays = incoming;
    }
    Json(serde_json::json!({ "overlays": entry.overlays }))
}

async fn put_overlays(
    State(state): State<Shared>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Json<serde_json::Value> {
    let user_name = pair_value(&pairs, "user_name").unwrap_or_default().to_string();
    let overlays = pair_values(&pairs, "overlays");

    let mut state = state.lock().unwrap();
    let entry = state.users.entry(user_name).or_default();
    entry.overlays = overlays;
    Json(serde_json::json!({ "status": "ok" }))
}

async fn pause(
    State(state): State<Shared>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    record_control(&state, "pause", &body);
    Json(serde_json::json!({ "status": "ok" }))
}

async fn play(
    State(state): State<Shared>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    record_control(&state, "play", &body);
    Json(serde_json::json!({ "status": "ok" }))
}

fn record_control(state: &Shared, endpoint: &str, body: &serde_json::Value) {
    let sid = body["sid"].as_str().unwrap_or_default().to_string();
    state
        .lock()
        .unwrap()
        .control_calls
        .push((endpoint.to_string(), sid));
}

async fn frames_ws(ws: WebSocketUpgrade, State(state): State<Shared>) -> Response {
    ws.on_upgrade(move |socket| handle_channel(socket, state))
}

async fn handle_channel(mut socket: WebSocket, state: Shared) {
    let frames = state.lock().unwrap().frames.clone();

    // Push the configured frames at an uncontrolled rate
    for (sid, frame) in frames {
        let msg = serde_json::json!({ "type": "frame", "sid": sid, "frame": frame }).to_string();
        if socket.send(Message::Text(msg)).await.is_err() {
            return;
        }
    }

    // Keep the channel open, recording inbound messages until the client
    // closes
    while let Some(Ok(msg)) = socket.recv().await {
        if let Message::Text(text) = msg
            && let Ok(value) = serde_json::from_str::<serde_json::Value>(&text)
            && value["type"] == "rtsp_url"
        {
            let url = value["rtsp_url"].as_str().unwrap_or_default().to_string();
            state.lock().unwrap().rtsp_received.push(url);
        }
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/get-user", post(get_user))
        .route("/add-user", post(add_user))
        .route("/overlays", put(put_overlays))
        .route("/pause", post(pause))
        .route("/play", post(play))
        .route("/frames", get(frames_ws))
        .with_state(state)
}

/// Serve the mock backend on an ephemeral port
pub async fn spawn_server(state: Shared) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().unwrap();
    let app = router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock backend");
    });
    addr
}

/// Client configuration pointed at the mock backend, with a throwaway
/// session state file
pub fn test_config(addr: SocketAddr) -> Config {
    let mut config = Config::default();
    config.api_base_url = format!("http://{}", addr);
    config.channel_url = format!("ws://{}/frames", addr);
    config.request_timeout = Duration::from_secs(5);
    config.session.state_path = temp_session_path();
    config
}

pub fn temp_session_path() -> PathBuf {
    std::env::temp_dir().join(format!("framecast-it-{}.json", uuid::Uuid::new_v4()))
}

/// A valid persisted text overlay record
pub fn text_payload(content: &str, x: i32, y: i32, w: u32, h: u32) -> String {
    serde_json::json!({
        "type": "text",
        "content": content,
        "dragX": x,
        "dragY": y,
        "resizeW": w,
        "resizeH": h,
    })
    .to_string()
}

/// Poll the mock state until `predicate` holds or the timeout elapses
pub async fn wait_for_state<F>(state: &Shared, predicate: F)
where
    F: Fn(&MockState) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if predicate(&state.lock().unwrap()) {
            return;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("mock state never reached the expected condition");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Initialize test logging for detailed output
#[allow(dead_code)]
pub fn init_test_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "framecast=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}
