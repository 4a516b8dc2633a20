//! Test doubles shared by unit tests across modules.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::error::ProxyError;
use crate::llms::{ChatCompletion, ChatMessage, Completion};

/// Body of a successful chat-completion response carrying `text`.
pub fn completion_body(text: &str) -> Value {
    json!({
        "id": "gen-1",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": text } }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
    })
}

#[derive(Clone, Default)]
struct Upstream {
    responses: Arc<Mutex<VecDeque<(StatusCode, Value)>>>,
    requests: Arc<Mutex<Vec<Value>>>,
}

/// A throwaway OpenAI-compatible server on 127.0.0.1. Responses are served
/// in order; once exhausted every request gets a 500.
pub struct FakeUpstream {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl FakeUpstream {
    pub async fn spawn(responses: Vec<(StatusCode, Value)>) -> Self {
        let state = Upstream {
            responses: Arc::new(Mutex::new(responses.into())),
            requests: Arc::default(),
        };
        let requests = state.requests.clone();

        let app = Router::new()
            .route("/chat/completions", post(fake_completions))
            .with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            requests,
        }
    }

    /// Request bodies received so far.
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().clone()
    }
}

async fn fake_completions(
    State(state): State<Upstream>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.requests.lock().push(body);
    let (status, body) = state
        .responses
        .lock()
        .pop_front()
        .unwrap_or((StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "exhausted"})));
    (status, Json(body))
}

/// In-process backend returning canned results without any HTTP.
#[derive(Debug)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, ProxyError>>>,
    pub seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Result<String, ProxyError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn failing() -> Self {
        Self::new(vec![Err(ProxyError::Timeout)])
    }
}

#[async_trait]
impl ChatCompletion for ScriptedBackend {
    fn provider(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, ProxyError> {
        self.seen.lock().push(messages.to_vec());
        let next = self
            .replies
            .lock()
            .pop_front()
            .unwrap_or(Err(ProxyError::Transport("no scripted reply".into())));
        next.map(|text| Completion {
            text,
            model: "scripted-model".into(),
            usage: None,
        })
    }
}

/// Backend whose completion never resolves.
#[derive(Debug)]
pub struct StalledBackend;

#[async_trait]
impl ChatCompletion for StalledBackend {
    fn provider(&self) -> &str {
        "stalled"
    }

    fn model(&self) -> &str {
        "stalled-model"
    }

    async fn complete(&self, _messages: &[ChatMessage]) -> Result<Completion, ProxyError> {
        std::future::pending().await
    }
}
