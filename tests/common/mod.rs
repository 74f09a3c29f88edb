//! In-process mock of the inspection backend (REST + WebSocket)

#![allow(dead_code)]

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use inspection_panel::models::{ConveyorCommand, NokItem};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// One scripted action on an accepted WebSocket connection
#[derive(Debug, Clone)]
pub enum Step {
    Send(String),
    Pause(Duration),
    Close,
}

#[derive(Clone, Default)]
pub struct MockState {
    pub nok: Arc<Mutex<Vec<NokItem>>>,
    pub fail_list: Arc<AtomicBool>,
    pub reject_conveyor: Arc<AtomicBool>,
    pub conveyor_commands: Arc<Mutex<Vec<bool>>>,
    pub list_limits: Arc<Mutex<Vec<usize>>>,
    /// Scripts consumed one per accepted connection; connections without a
    /// script are held open silently
    pub sessions: Arc<Mutex<VecDeque<Vec<Step>>>>,
    pub ws_connections: Arc<AtomicUsize>,
}

impl MockState {
    pub fn push_session(&self, steps: Vec<Step>) {
        self.sessions.lock().unwrap().push_back(steps);
    }

    pub fn set_nok(&self, count: usize) {
        *self.nok.lock().unwrap() = (1..=count)
            .map(|i| NokItem {
                name: format!("detected_{:03}.jpg", i),
                ts: format!("14:{:02}:00", 59 - i),
                severity: None,
            })
            .collect();
    }
}

pub struct MockBackend {
    pub addr: SocketAddr,
    pub state: MockState,
    server: JoinHandle<()>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new()
            .route("/api/nok/list", get(nok_list))
            .route("/api/plc/status", get(plc_status))
            .route("/api/plc/conv/run", post(conveyor_run))
            .route("/ws/events", get(websocket_handler))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state, server }
    }

    pub fn http_base(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_base(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn events_url(&self) -> String {
        format!("ws://{}/ws/events", self.addr)
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// JSON text of one FrameEvent
pub fn frame_json(fps: f32, decision: Option<&str>, detections: &[(&str, f32)]) -> String {
    let detections: Vec<Value> = detections
        .iter()
        .map(|(class_name, confidence)| {
            json!({
                "class_name": class_name,
                "confidence": confidence,
                "bbox": [25.0, 33.0, 33.0, 25.0],
            })
        })
        .collect();

    json!({
        "fps": fps,
        "ok": detections.is_empty(),
        "detections": detections,
        "plc": {
            "online": true,
            "request": false,
            "valid": decision.is_some(),
            "last_decision": decision,
        },
    })
    .to_string()
}

/// Poll `check` every 10 ms until it holds or `timeout` elapses
pub async fn wait_until<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

#[derive(Deserialize)]
struct ListQuery {
    limit: usize,
}

async fn nok_list(State(state): State<MockState>, Query(query): Query<ListQuery>) -> impl IntoResponse {
    state.list_limits.lock().unwrap().push(query.limit);
    if state.fail_list.load(Ordering::Relaxed) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    let items: Vec<NokItem> = state.nok.lock().unwrap().iter().take(query.limit).cloned().collect();
    Json(items).into_response()
}

async fn plc_status() -> impl IntoResponse {
    Json(json!({
        "online": true,
        "request": false,
        "valid": false,
        "last_decision": "OK",
    }))
}

async fn conveyor_run(State(state): State<MockState>, Json(cmd): Json<ConveyorCommand>) -> StatusCode {
    state.conveyor_commands.lock().unwrap().push(cmd.on);
    if state.reject_conveyor.load(Ordering::Relaxed) {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<MockState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

async fn handle_websocket(mut socket: WebSocket, state: MockState) {
    state.ws_connections.fetch_add(1, Ordering::Relaxed);
    let script = state.sessions.lock().unwrap().pop_front().unwrap_or_default();

    for step in script {
        match step {
            Step::Send(text) => {
                if socket.send(Message::Text(text)).await.is_err() {
                    return;
                }
            }
            Step::Pause(duration) => tokio::time::sleep(duration).await,
            Step::Close => {
                let _ = socket.send(Message::Close(None)).await;
                return;
            }
        }
    }

    // Hold the connection until the client goes away
    while let Some(Ok(_)) = socket.recv().await {}
}
