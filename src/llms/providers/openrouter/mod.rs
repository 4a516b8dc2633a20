//! OpenRouter (OpenAI-compatible) chat-completion provider.
//!
//! Talks to `{base_url}/chat/completions` via `reqwest`.
//!
//! # Failure policy
//!
//! - Transport errors, timeouts, 429 and 5xx are retried up to
//!   `max_attempts` times with a fixed pause between attempts.
//! - Other 4xx responses and malformed bodies fail immediately.
//! - When a model is still rate limited after its last attempt, the next
//!   entry of `fallback_models` (if any) is tried with a fresh attempt budget.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::UpstreamConfig;
use crate::error::ProxyError;
use crate::llms::base_llm::{ChatCompletion, ChatMessage, Completion, TokenUsage};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// OpenRouter completion client.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    api_key: Option<String>,
    base_url: String,
    model: String,
    /// Tried in order when the previous model is rate limited.
    pub fallback_models: Vec<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Attempts per model, including the first.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub retry_backoff: Duration,
    /// Extra headers sent on every request (`HTTP-Referer`, `X-Title`).
    pub default_headers: HashMap<String, String>,
}

impl OpenRouterClient {
    /// Create a client for `model`.
    ///
    /// * `api_key` - Optional API key (defaults to `OPENROUTER_API_KEY`).
    /// * `base_url` - Optional custom base URL.
    pub fn new(model: impl Into<String>, api_key: Option<String>, base_url: Option<String>) -> Self {
        let api_key = api_key
            .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
            .filter(|k| !k.is_empty());

        Self {
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.into(),
            fallback_models: Vec::new(),
            temperature: None,
            max_tokens: None,
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry_backoff: Duration::from_secs(1),
            default_headers: HashMap::new(),
        }
    }

    pub fn from_config(config: &UpstreamConfig) -> Self {
        let mut client = Self::new(
            config.model.clone(),
            config.api_key.clone(),
            Some(config.base_url.clone()),
        );
        client.fallback_models = config.fallback_models.clone();
        client.temperature = Some(config.temperature);
        client.max_tokens = Some(config.max_tokens);
        client.timeout = config.timeout;
        client.max_attempts = config.max_attempts.max(1);
        client.retry_backoff = config.retry_backoff;
        client
            .default_headers
            .insert("HTTP-Referer".to_string(), config.referer.clone());
        client
            .default_headers
            .insert("X-Title".to_string(), config.title.clone());
        client
    }

    pub fn with_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_backoff = backoff;
        self
    }

    pub fn with_fallback_models(mut self, models: Vec<String>) -> Self {
        self.fallback_models = models;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the request body for one model.
    pub fn build_request_body(&self, model: &str, messages: &[ChatMessage]) -> Value {
        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
        });
        if let Some(temp) = self.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        body
    }

    /// Run the attempt budget against one model.
    async fn complete_with_model(
        &self,
        client: &reqwest::Client,
        api_key: &str,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<Completion, ProxyError> {
        let body = self.build_request_body(model, messages);
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                log::warn!(
                    "OpenRouter retry attempt {} for {} after {:?}",
                    attempt,
                    model,
                    self.retry_backoff
                );
                tokio::time::sleep(self.retry_backoff).await;
            }

            match self.send_once(client, api_key, model, &body).await {
                Ok(completion) => return Ok(completion),
                Err(e) if e.is_retryable() => {
                    log::debug!("OpenRouter attempt {} failed: {}", attempt, e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ProxyError::Transport("OpenRouter call failed after all retries".to_string())
        }))
    }

    async fn send_once(
        &self,
        client: &reqwest::Client,
        api_key: &str,
        model: &str,
        body: &Value,
    ) -> Result<Completion, ProxyError> {
        let mut request = client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", api_key));
        for (k, v) in &self.default_headers {
            request = request.header(k, v);
        }

        let response = request.json(body).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProxyError::RateLimited {
                model: model.to_string(),
            });
        }

        let text = response.text().await?;
        if !status.is_success() {
            return Err(ProxyError::Upstream {
                status: status.as_u16(),
                body: text.chars().take(500).collect(),
            });
        }

        parse_completion(&text, model)
    }
}

/// Extract the first choice's text and the usage block.
pub fn parse_completion(body: &str, model: &str) -> Result<Completion, ProxyError> {
    let json: Value = serde_json::from_str(body).map_err(|e| {
        ProxyError::MalformedResponse(format!(
            "{} - Body: {}",
            e,
            body.chars().take(500).collect::<String>()
        ))
    })?;

    let text = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| ProxyError::MalformedResponse("No content in completion".to_string()))?;

    let usage = json
        .get("usage")
        .and_then(|u| serde_json::from_value::<TokenUsage>(u.clone()).ok());
    if let Some(u) = &usage {
        log::debug!(
            "OpenRouter token usage: prompt={}, completion={}, total={}",
            u.prompt_tokens,
            u.completion_tokens,
            u.total_tokens
        );
    }

    Ok(Completion {
        text: text.to_string(),
        model: json["model"].as_str().unwrap_or(model).to_string(),
        usage,
    })
}

#[async_trait]
impl ChatCompletion for OpenRouterClient {
    fn provider(&self) -> &str {
        "openrouter"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, ProxyError> {
        let api_key = self.api_key.as_deref().ok_or(ProxyError::MissingApiKey)?;

        log::debug!(
            "OpenRouterClient.complete: model={}, messages={}",
            self.model,
            messages.len()
        );

        let client = reqwest::Client::builder().timeout(self.timeout).build()?;

        let models = std::iter::once(&self.model).chain(self.fallback_models.iter());
        let mut last_error = None;
        for model in models {
            match self.complete_with_model(&client, api_key, model, messages).await {
                Ok(completion) => return Ok(completion),
                Err(e @ ProxyError::RateLimited { .. }) => {
                    log::warn!("{}, trying next model", e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(ProxyError::MissingApiKey))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{completion_body, FakeUpstream};
    use axum::http::StatusCode;
    use serde_json::json;

    fn client_for(upstream: &FakeUpstream) -> OpenRouterClient {
        OpenRouterClient::new("primary", Some("test-key".into()), Some(upstream.base_url.clone()))
            .with_retry(3, Duration::ZERO)
    }

    fn messages() -> Vec<ChatMessage> {
        vec![ChatMessage::system("be tsundere"), ChatMessage::user("hi")]
    }

    #[test]
    fn test_parse_completion() {
        let c = parse_completion(&completion_body("Hmph.").to_string(), "m").unwrap();
        assert_eq!(c.text, "Hmph.");
        assert_eq!(c.model, "m");
        assert_eq!(c.usage.unwrap().total_tokens, 15);

        assert!(matches!(
            parse_completion("not json", "m"),
            Err(ProxyError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_completion(r#"{"choices": []}"#, "m"),
            Err(ProxyError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_request_body() {
        let mut client = OpenRouterClient::new("m", Some("k".into()), None);
        client.temperature = Some(0.85);
        client.max_tokens = Some(250);
        let body = client.build_request_body("m", &messages());
        assert_eq!(body["model"], "m");
        assert_eq!(body["temperature"], 0.85);
        assert_eq!(body["max_tokens"], 250);
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let mut client = OpenRouterClient::new("m", None, Some("http://127.0.0.1:9".into()));
        client.api_key = None;
        assert!(matches!(
            client.complete(&messages()).await,
            Err(ProxyError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn test_success_sends_headers_and_body() {
        let upstream = FakeUpstream::spawn(vec![(StatusCode::OK, completion_body("Baka!"))]).await;
        let mut client = client_for(&upstream);
        client.default_headers.insert("X-Title".into(), "Companion".into());

        let c = client.complete(&messages()).await.unwrap();
        assert_eq!(c.text, "Baka!");

        let requests = upstream.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0]["model"], "primary");
    }

    #[tokio::test]
    async fn test_retries_server_errors_then_succeeds() {
        let upstream = FakeUpstream::spawn(vec![
            (StatusCode::BAD_GATEWAY, json!({"error": "down"})),
            (StatusCode::TOO_MANY_REQUESTS, json!({"error": "slow down"})),
            (StatusCode::OK, completion_body("finally")),
        ])
        .await;

        let c = client_for(&upstream).complete(&messages()).await.unwrap();
        assert_eq!(c.text, "finally");
        assert_eq!(upstream.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_three_attempts() {
        let upstream = FakeUpstream::spawn(vec![
            (StatusCode::INTERNAL_SERVER_ERROR, json!({})),
            (StatusCode::INTERNAL_SERVER_ERROR, json!({})),
            (StatusCode::INTERNAL_SERVER_ERROR, json!({})),
            (StatusCode::OK, completion_body("too late")),
        ])
        .await;

        let err = client_for(&upstream).complete(&messages()).await.unwrap_err();
        assert!(matches!(err, ProxyError::Upstream { status: 500, .. }));
        assert_eq!(upstream.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let upstream = FakeUpstream::spawn(vec![
            (StatusCode::UNAUTHORIZED, json!({"error": "bad key"})),
            (StatusCode::OK, completion_body("unused")),
        ])
        .await;

        let err = client_for(&upstream).complete(&messages()).await.unwrap_err();
        assert!(matches!(err, ProxyError::Upstream { status: 401, .. }));
        assert_eq!(upstream.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_body_is_not_retried() {
        let upstream = FakeUpstream::spawn(vec![(StatusCode::OK, json!({"unexpected": true}))]).await;
        let err = client_for(&upstream).complete(&messages()).await.unwrap_err();
        assert!(matches!(err, ProxyError::MalformedResponse(_)));
        assert_eq!(upstream.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_falls_back_to_next_model() {
        let upstream = FakeUpstream::spawn(vec![
            (StatusCode::TOO_MANY_REQUESTS, json!({})),
            (StatusCode::TOO_MANY_REQUESTS, json!({})),
            (StatusCode::TOO_MANY_REQUESTS, json!({})),
            (StatusCode::OK, completion_body("from backup")),
        ])
        .await;

        let client = client_for(&upstream).with_fallback_models(vec!["backup".into()]);
        let c = client.complete(&messages()).await.unwrap();
        assert_eq!(c.text, "from backup");
        assert_eq!(c.model, "backup");

        let models: Vec<Value> = upstream.requests().iter().map(|r| r["model"].clone()).collect();
        assert_eq!(models, vec![json!("primary"), json!("primary"), json!("primary"), json!("backup")]);
    }

    #[tokio::test]
    async fn test_rate_limit_without_fallback_surfaces() {
        let upstream = FakeUpstream::spawn(vec![
            (StatusCode::TOO_MANY_REQUESTS, json!({})),
            (StatusCode::TOO_MANY_REQUESTS, json!({})),
            (StatusCode::TOO_MANY_REQUESTS, json!({})),
        ])
        .await;
        let err = client_for(&upstream).complete(&messages()).await.unwrap_err();
        assert!(matches!(err, ProxyError::RateLimited { .. }));
    }
}
