//! Test utilities for spendbot-core
//!
//! In-process doubles for the dispatcher's collaborators, plus small axum
//! servers emulating the LLM, Send API and chart endpoints for backend tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{Json, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::ai::{ClassifiedIntent, IntentClassifier, MockBackend};
use crate::chart::ChartRenderer;
use crate::config::BudgetConfig;
use crate::db::Database;
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::notify::Notifier;
use crate::report::CategoryTotals;

/// Bytes returned by the fake chart renderers
pub const FAKE_PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

// =============================================================================
// Collaborator doubles
// =============================================================================

/// A message captured by `RecordingNotifier`
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text { recipient: String, text: String },
    Image { recipient: String, size: usize },
}

/// Notifier that records every outbound message
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Sent>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Text messages sent to one recipient, in order
    pub fn texts_for(&self, recipient: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { recipient: r, text } if r == recipient => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn images_for(&self, recipient: &str) -> usize {
        self.sent()
            .iter()
            .filter(|s| matches!(s, Sent::Image { recipient: r, .. } if r == recipient))
            .count()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_text(&self, recipient: &str, text: &str) {
        self.sent.lock().unwrap().push(Sent::Text {
            recipient: recipient.to_string(),
            text: text.to_string(),
        });
    }

    async fn send_image(&self, recipient: &str, png: Vec<u8>) {
        self.sent.lock().unwrap().push(Sent::Image {
            recipient: recipient.to_string(),
            size: png.len(),
        });
    }
}

#[derive(Clone)]
enum Scripted {
    Intent(ClassifiedIntent),
    Fail(String),
}

/// Classifier answering from a fixed script; unscripted text is unclassifiable
#[derive(Clone, Default)]
pub struct ScriptedClassifier {
    script: Arc<Mutex<HashMap<String, Scripted>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `text` with `intent`
    pub fn with(self, text: &str, intent: ClassifiedIntent) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(text.to_string(), Scripted::Intent(intent));
        self
    }

    /// Fail on `text` as a transport error would
    pub fn failing(self, text: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(text.to_string(), Scripted::Fail("scripted failure".into()));
        self
    }

    /// Every text the classifier was asked about
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl IntentClassifier for ScriptedClassifier {
    async fn classify(&self, text: &str) -> Result<Option<ClassifiedIntent>> {
        self.calls.lock().unwrap().push(text.to_string());
        match self.script.lock().unwrap().get(text).cloned() {
            Some(Scripted::Intent(intent)) => Ok(Some(intent)),
            Some(Scripted::Fail(msg)) => Err(Error::InvalidData(msg)),
            None => Ok(None),
        }
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn model(&self) -> &str {
        "scripted"
    }

    fn host(&self) -> &str {
        "scripted://localhost"
    }
}

/// Chart renderer returning `FAKE_PNG`, or failing when built with `failing()`
#[derive(Clone, Default)]
pub struct StaticChartRenderer {
    fail: bool,
    rendered: Arc<Mutex<Vec<CategoryTotals>>>,
}

impl StaticChartRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Totals passed to every render call
    pub fn rendered(&self) -> Vec<CategoryTotals> {
        self.rendered.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChartRenderer for StaticChartRenderer {
    async fn render(&self, totals: &CategoryTotals) -> Result<Vec<u8>> {
        self.rendered.lock().unwrap().push(totals.clone());
        if self.fail {
            return Err(Error::Chart("static renderer set to fail".into()));
        }
        Ok(FAKE_PNG.to_vec())
    }
}

/// A dispatcher over an in-memory database with recording collaborators
pub struct TestHarness {
    pub dispatcher: Dispatcher,
    pub notifier: RecordingNotifier,
    pub charts: StaticChartRenderer,
}

impl TestHarness {
    pub fn new(classifier: impl IntentClassifier + 'static) -> Self {
        Self::with_charts(classifier, StaticChartRenderer::new())
    }

    pub fn with_charts(
        classifier: impl IntentClassifier + 'static,
        charts: StaticChartRenderer,
    ) -> Self {
        let notifier = RecordingNotifier::new();
        let dispatcher = Dispatcher::new(
            Database::in_memory().unwrap(),
            Arc::new(classifier),
            Arc::new(notifier.clone()),
            Arc::new(charts.clone()),
            BudgetConfig {
                billing_cycle_days: 30,
                currency_symbol: "$".into(),
            },
        );
        Self {
            dispatcher,
            notifier,
            charts,
        }
    }

    pub fn db(&self) -> &Database {
        self.dispatcher.db()
    }
}

// =============================================================================
// Mock HTTP servers
// =============================================================================

/// A spawned axum server that shuts down on drop
struct Spawned {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl Spawned {
    async fn start(app: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for Spawned {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Mock LLM server speaking both the Ollama and OpenAI-compatible APIs
///
/// Answers classification prompts with the heuristic `MockBackend`.
pub struct MockLlmServer {
    inner: Spawned,
}

impl MockLlmServer {
    pub async fn start() -> Self {
        let app = Router::new()
            .route("/api/tags", get(handle_tags))
            .route("/api/generate", post(handle_generate))
            .route("/v1/models", get(handle_models))
            .route("/v1/chat/completions", post(handle_chat_completions));
        Self {
            inner: Spawned::start(app).await,
        }
    }

    pub fn url(&self) -> String {
        self.inner.url()
    }
}

/// Pull the quoted message out of a rendered classify_intent prompt
fn extract_message(prompt: &str) -> Option<&str> {
    const MARKER: &str = "Analyze this message: \"";
    let start = prompt.find(MARKER)? + MARKER.len();
    let line = prompt[start..].lines().next()?;
    Some(line.strip_suffix('"').unwrap_or(line))
}

fn mock_classification(prompt: &str) -> String {
    extract_message(prompt)
        .and_then(|message| MockBackend::new().classify_text(message))
        .map(|intent| serde_json::to_string(&intent).unwrap())
        .unwrap_or_else(|| r#"{"type": "unknown"}"#.to_string())
}

async fn handle_tags() -> Json<Value> {
    Json(json!({ "models": [{ "name": "llama3.2:latest" }] }))
}

async fn handle_models() -> Json<Value> {
    Json(json!({ "object": "list", "data": [{ "id": "gpt-4o-mini", "object": "model" }] }))
}

async fn handle_generate(Json(request): Json<Value>) -> Json<Value> {
    let prompt = request["prompt"].as_str().unwrap_or_default();
    Json(json!({
        "model": request["model"],
        "response": mock_classification(prompt),
        "done": true,
    }))
}

async fn handle_chat_completions(Json(request): Json<Value>) -> Json<Value> {
    let prompt = request["messages"]
        .as_array()
        .into_iter()
        .flatten()
        .filter(|m| m["role"] == "user")
        .filter_map(|m| m["content"].as_str())
        .collect::<Vec<_>>()
        .join("\n");

    Json(json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "model": request["model"],
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": mock_classification(&prompt) },
            "finish_reason": "stop",
        }],
    }))
}

/// A request captured by `MockSendApi`
#[derive(Debug, Clone, Default)]
pub struct SendApiRequest {
    pub access_token: Option<String>,
    pub is_multipart: bool,
    /// Recipient id from a JSON body
    pub recipient: Option<String>,
    /// Message text from a JSON body
    pub text: Option<String>,
}

type SendLog = Arc<Mutex<Vec<SendApiRequest>>>;

/// Mock Messenger Send API recording every delivery
pub struct MockSendApi {
    inner: Spawned,
    log: SendLog,
}

impl MockSendApi {
    pub async fn start() -> Self {
        let log = SendLog::default();
        let app = Router::new()
            .route("/:version/me/messages", post(handle_send))
            .with_state(log.clone());
        Self {
            inner: Spawned::start(app).await,
            log,
        }
    }

    /// Base URL, usable as `graph_api_base`
    pub fn url(&self) -> String {
        self.inner.url()
    }

    pub fn requests(&self) -> Vec<SendApiRequest> {
        self.log.lock().unwrap().clone()
    }
}

async fn handle_send(
    State(log): State<SendLog>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    let is_multipart = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    let mut request = SendApiRequest {
        access_token: query.get("access_token").cloned(),
        is_multipart,
        ..Default::default()
    };
    if !is_multipart {
        if let Ok(json) = serde_json::from_slice::<Value>(&body) {
            request.recipient = json["recipient"]["id"].as_str().map(String::from);
            request.text = json["message"]["text"].as_str().map(String::from);
        }
    }
    log.lock().unwrap().push(request);

    Json(json!({ "recipient_id": "mock", "message_id": "mid.mock" }))
}

/// Mock chart server answering `POST /` with `FAKE_PNG`
pub struct MockChartServer {
    inner: Spawned,
}

impl MockChartServer {
    pub async fn start() -> Self {
        let app = Router::new().route("/", post(handle_chart));
        Self {
            inner: Spawned::start(app).await,
        }
    }

    pub fn url(&self) -> String {
        self.inner.url()
    }
}

async fn handle_chart(Json(body): Json<Value>) -> impl IntoResponse {
    if body["chart"]["type"] != "pie" {
        return (StatusCode::BAD_REQUEST, Vec::new()).into_response();
    }
    ([(header::CONTENT_TYPE, "image/png")], FAKE_PNG.to_vec()).into_response()
}
