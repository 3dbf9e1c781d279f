//! services/companion/src/adapters/companion_llm.rs
//!
//! This module contains the adapter for the conversational LLM.
//! It implements the `ModelClient` port from the `core` crate against any
//! OpenAI-compatible chat-completions endpoint (Gemini's by default).

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use calmmind_core::constants::{EMPTY_REPLY_FALLBACK, SYSTEM_INSTRUCTION};
use calmmind_core::context::build_prompt;
use calmmind_core::ports::{ModelClient, ModelError, ModelRequest};
use regex::Regex;
use std::sync::{LazyLock, Mutex};
use std::time::Duration;
use tracing::{error, info};

const TEMPERATURE: f32 = 0.7;
const TOP_P: f32 = 0.9;
const MAX_OUTPUT_TOKENS: u32 = 2048;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

static QUOTA_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)quota|429|resource_exhausted|rate limit").unwrap());
static CREDENTIAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)api[ _]?key|invalid_api_key|unauthorized|401").unwrap()
});
static TIMEOUT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)timeout|timed out").unwrap());
static NETWORK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)network|fetch|error sending request|connect|dns").unwrap()
});

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ModelClient` using an OpenAI-compatible LLM.
///
/// The client handle is built on first use and cached until
/// [`ModelClient::invalidate_session`] drops it.
pub struct OpenAiCompanionAdapter {
    config: OpenAIConfig,
    model: String,
    request_timeout: Duration,
    session: Mutex<Option<Client<OpenAIConfig>>>,
}

impl OpenAiCompanionAdapter {
    /// Creates a new `OpenAiCompanionAdapter`.
    pub fn new(api_base: &str, api_key: &str, model: String) -> Self {
        let config = OpenAIConfig::new()
            .with_api_base(api_base)
            .with_api_key(api_key);
        Self {
            config,
            model,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            session: Mutex::new(None),
        }
    }

    /// Overrides the per-request deadline of the HTTP client.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> Result<Client<OpenAIConfig>, ModelError> {
        let mut session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(client) = session.as_ref() {
            return Ok(client.clone());
        }

        let http = reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| {
                error!("Failed to build HTTP client: {}", e);
                ModelError::Unknown(e.to_string())
            })?;
        let client = Client::with_config(self.config.clone()).with_http_client(http);
        *session = Some(client.clone());
        Ok(client)
    }

    #[cfg(test)]
    fn has_session(&self) -> bool {
        self.session
            .lock()
            .map(|s| s.is_some())
            .unwrap_or(false)
    }
}

/// Maps raw failure text onto the classified error the controller renders.
///
/// Patterns are tried in order: quota, credential, network, timeout.
pub fn classify_error(raw: &str) -> ModelError {
    if QUOTA_PATTERN.is_match(raw) {
        ModelError::QuotaExceeded
    } else if CREDENTIAL_PATTERN.is_match(raw) {
        ModelError::InvalidCredential
    } else if NETWORK_PATTERN.is_match(raw) {
        ModelError::Network
    } else if TIMEOUT_PATTERN.is_match(raw) {
        ModelError::Timeout
    } else {
        ModelError::Unknown(raw.to_string())
    }
}

/// Classifies a client failure. Transport errors are classified by kind, since
/// their display text only says the request could not be sent.
fn classify_openai_error(e: &OpenAIError) -> ModelError {
    match e {
        OpenAIError::Reqwest(inner) if inner.is_timeout() => ModelError::Timeout,
        OpenAIError::Reqwest(inner) if inner.is_connect() => ModelError::Network,
        other => classify_error(&other.to_string()),
    }
}

//=========================================================================================
// `ModelClient` Trait Implementation
//=========================================================================================

#[async_trait]
impl ModelClient for OpenAiCompanionAdapter {
    async fn send(&self, request: &ModelRequest) -> Result<String, ModelError> {
        let prompt = build_prompt(
            SYSTEM_INSTRUCTION,
            &request.message,
            &request.history,
            request.mood,
            request.mood_just_changed,
        );

        let messages: Vec<ChatCompletionRequestMessage> = vec![ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| ModelError::Unknown(e.to_string()))?
            .into()];

        let completion = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(TEMPERATURE)
            .top_p(TOP_P)
            .max_tokens(MAX_OUTPUT_TOKENS)
            .build()
            .map_err(|e| ModelError::Unknown(e.to_string()))?;

        let response = self
            .client()?
            .chat()
            .create(completion)
            .await
            .map_err(|e| {
                error!("Model request failed: {}", e);
                classify_openai_error(&e)
            })?;

        let reply = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| EMPTY_REPLY_FALLBACK.to_string());

        Ok(reply)
    }

    fn invalidate_session(&self) {
        let mut session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        if session.take().is_some() {
            info!("Discarded cached model session.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calmmind_core::domain::MoodState;
    use tokio::net::TcpListener;

    #[test]
    fn classifies_quota_failures() {
        assert_eq!(
            classify_error("429 Too Many Requests: RESOURCE_EXHAUSTED"),
            ModelError::QuotaExceeded
        );
        assert_eq!(
            classify_error("You exceeded your current quota"),
            ModelError::QuotaExceeded
        );
    }

    #[test]
    fn classifies_credential_failures() {
        assert_eq!(
            classify_error("API key not valid. Please pass a valid API key. (API_KEY_INVALID)"),
            ModelError::InvalidCredential
        );
    }

    #[test]
    fn classifies_timeouts_and_network_failures() {
        assert_eq!(classify_error("Request timeout"), ModelError::Timeout);
        assert_eq!(
            classify_error("http error: error sending request for url"),
            ModelError::Network
        );
    }

    #[test]
    fn network_wins_over_timeout_in_mixed_text() {
        assert_eq!(classify_error("network timeout"), ModelError::Network);
    }

    #[test]
    fn unclassified_failures_keep_raw_text() {
        assert_eq!(
            classify_error("failed to deserialize api response"),
            ModelError::Unknown("failed to deserialize api response".to_string())
        );
    }

    #[test]
    fn session_is_cached_until_invalidated() {
        let adapter = OpenAiCompanionAdapter::new(
            "http://localhost:9",
            "test-key",
            "gemini-2.0-flash".to_string(),
        );
        assert!(!adapter.has_session());
        let _client = adapter.client().unwrap();
        assert!(adapter.has_session());
        adapter.invalidate_session();
        assert!(!adapter.has_session());
        assert_eq!(adapter.model(), "gemini-2.0-flash");
    }

    fn request(text: &str) -> ModelRequest {
        ModelRequest {
            message: text.to_string(),
            history: Vec::new(),
            mood: MoodState::default(),
            mood_just_changed: false,
        }
    }

    #[tokio::test]
    async fn stalled_endpoint_is_reported_as_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accepts connections and never answers.
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let adapter = OpenAiCompanionAdapter::new(
            &format!("http://{}", addr),
            "test-key",
            "gemini-2.0-flash".to_string(),
        )
        .with_request_timeout(Duration::from_millis(200));

        let error = adapter.send(&request("hello")).await.unwrap_err();
        assert_eq!(error, ModelError::Timeout);
        server.abort();
    }

    #[tokio::test]
    async fn refused_connection_is_reported_as_network_failure() {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };

        let adapter = OpenAiCompanionAdapter::new(
            &format!("http://{}", addr),
            "test-key",
            "gemini-2.0-flash".to_string(),
        )
        .with_request_timeout(Duration::from_secs(5));

        let error = adapter.send(&request("hello")).await.unwrap_err();
        assert_eq!(error, ModelError::Network);
    }
}
