//! Shared test fixtures: a scripted collaborator and a stub Web API server.
//!
//! These are used by multiple test modules to avoid duplication.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use parking_lot::Mutex;
use serde_json::json;

use crate::config::ValidatedConfig;
use crate::events::{EventSink, PlayerEvent};
use crate::native::{NativeCall, NativeError, NativeHandle, NativeModule, NativeReply, NativeResult, NativeToken};

pub const MOCK_DEVICE_ID: &str = "5c1ba6f0ad32a4d1b0e2e1b6a4c0f36b2e9a0d11";

// ─────────────────────────────────────────────────────────────────────────────
// Mock Collaborator
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct MockState {
    calls: Mutex<Vec<(&'static str, NativeCall)>>,
    created_with: Mutex<Vec<&'static str>>,
    config: Mutex<Option<ValidatedConfig>>,
    sink: Mutex<Option<EventSink>>,
    create_error: Mutex<Option<String>>,
    failing_entries: Mutex<HashSet<&'static str>>,
    token: Mutex<Option<NativeToken>>,
}

/// Scripted collaborator that records every call.
///
/// `SetVolume` is echoed back as a `VolumeChanged` event, like the real player.
#[derive(Clone, Default)]
pub struct MockNative {
    state: Arc<MockState>,
}

impl MockNative {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construction will fail with `reason`.
    pub fn failing(reason: &str) -> Self {
        let mock = Self::new();
        *mock.state.create_error.lock() = Some(reason.to_string());
        mock
    }

    /// `get_token` will answer with `token`.
    pub fn with_token(self, token: NativeToken) -> Self {
        *self.state.token.lock() = Some(token);
        self
    }

    /// Calls through `entry` will be rejected.
    pub fn fail_entry(&self, entry: &'static str) {
        self.state.failing_entries.lock().insert(entry);
    }

    /// Every `(entry, call)` pair received so far, in order.
    pub fn calls(&self) -> Vec<(&'static str, NativeCall)> {
        self.state.calls.lock().clone()
    }

    pub fn calls_to(&self, entry: &str) -> Vec<NativeCall> {
        self.calls()
            .into_iter()
            .filter(|(e, _)| *e == entry)
            .map(|(_, call)| call)
            .collect()
    }

    /// Construction entry points used so far.
    pub fn created_with(&self) -> Vec<&'static str> {
        self.state.created_with.lock().clone()
    }

    pub fn config(&self) -> Option<ValidatedConfig> {
        self.state.config.lock().clone()
    }

    /// Feeds an event through the sink handed over at construction.
    ///
    /// # Panics
    ///
    /// Panics if the player has not been constructed yet.
    pub fn emit(&self, event: PlayerEvent) -> bool {
        let sink = self.state.sink.lock().clone();
        sink.expect("player not constructed").emit(event)
    }

    pub fn native_token(scopes: &str, expires_in: u64) -> NativeToken {
        NativeToken {
            access_token: format!("BQ-{}", scopes.replace(',', "-")),
            token_type: "Bearer".to_string(),
            expires_in,
            scopes: scopes.to_string(),
        }
    }
}

#[async_trait]
impl NativeModule for MockNative {
    async fn create_player(
        &self,
        entry: &'static str,
        config: &ValidatedConfig,
        events: EventSink,
    ) -> NativeResult<Arc<dyn NativeHandle>> {
        self.state.created_with.lock().push(entry);
        *self.state.config.lock() = Some(config.clone());

        if let Some(reason) = self.state.create_error.lock().clone() {
            return Err(NativeError::rejected(entry, reason));
        }

        *self.state.sink.lock() = Some(events);
        Ok(Arc::new(MockHandle {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockHandle {
    state: Arc<MockState>,
}

#[async_trait]
impl NativeHandle for MockHandle {
    async fn invoke(&self, entry: &'static str, call: NativeCall) -> NativeResult<NativeReply> {
        self.state.calls.lock().push((entry, call.clone()));

        if self.state.failing_entries.lock().contains(entry) {
            return Err(NativeError::rejected(entry, "scripted failure"));
        }

        let reply = match call {
            NativeCall::DeviceId => NativeReply::DeviceId(MOCK_DEVICE_ID.to_string()),
            NativeCall::Token { .. } => NativeReply::Token(self.state.token.lock().clone()),
            NativeCall::Canvas { uri } => NativeReply::Json(json!({ "canvas": uri })),
            NativeCall::Lyrics { uri } => NativeReply::Json(json!({ "lyrics": uri })),
            NativeCall::SetVolume { volume } => {
                let sink = self.state.sink.lock().clone();
                if let Some(sink) = sink {
                    sink.emit(PlayerEvent::VolumeChanged { volume });
                }
                NativeReply::Unit
            }
            _ => NativeReply::Unit,
        };
        Ok(reply)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stub Web API
// ─────────────────────────────────────────────────────────────────────────────

/// What the stub answers with.
#[derive(Debug, Clone, Copy)]
pub enum StubResponse {
    NoContent,
    Status(u16, &'static str),
}

/// A request as the stub saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

struct StubState {
    response: StubResponse,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Local HTTP server that records every request.
pub struct StubWebApi {
    addr: std::net::SocketAddr,
    state: Arc<StubState>,
}

impl StubWebApi {
    pub async fn start(response: StubResponse) -> Self {
        let state = Arc::new(StubState {
            response,
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new().fallback(record).with_state(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }
}

async fn record(
    State(state): State<Arc<StubState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let query = uri
        .query()
        .map(|q| {
            reqwest::Url::parse(&format!("http://stub/?{q}"))
                .map(|url| url.query_pairs().into_owned().collect())
                .unwrap_or_default()
        })
        .unwrap_or_default();

    state.requests.lock().push(RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query,
        authorization: headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
    });

    match state.response {
        StubResponse::NoContent => StatusCode::NO_CONTENT.into_response(),
        StubResponse::Status(code, body) => {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, body).into_response()
        }
    }
}
