//! Generation Client — the single boundary to the external text-generation service.
//!
//! ARCHITECTURAL RULE: controllers never talk to Gemini directly. They depend on
//! the `TextGenerator` trait so tests can script responses.
//!
//! One POST per call. No retries, no caching, no timeout: a slow upstream blocks
//! that invocation until it resolves.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[cfg(test)]
pub mod testing;

pub const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// The model used for every generation call.
pub const MODEL: &str = "gemini-pro";

#[derive(Debug, Error)]
pub enum GenerationError {
    /// Transport-level failure before any status was received.
    #[error("API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API request failed (status {status}): {message}")]
    Request { status: u16, message: String },

    #[error("Unexpected response shape: {0}")]
    ResponseShape(String),
}

/// Anything that turns a prompt into raw response text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate. Everything else is ignored.
    fn into_first_text(self) -> Result<String, GenerationError> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::ResponseShape("no candidates returned".to_string()))?;

        candidate
            .content
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| {
                GenerationError::ResponseShape("first candidate has no text part".to_string())
            })
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

/// Gemini `generateContent` client. The API key travels as the `key` query parameter.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, MODEL)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Gemini API returned {}: {}", status, body);
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(GenerationError::Request {
                status: status.as_u16(),
                message,
            });
        }

        let raw = response.text().await?;
        let parsed: GenerateContentResponse = serde_json::from_str(&raw)
            .map_err(|e| GenerationError::ResponseShape(format!("invalid JSON body: {e}")))?;

        let text = parsed.into_first_text()?;
        debug!("Gemini call succeeded: {} chars of text", text.len());

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GENERATE_PATH: &str = "/models/gemini-pro:generateContent";

    fn success_body(text: &str) -> serde_json::Value {
        json!({
            "candidates": [
                { "content": { "parts": [ { "text": text } ], "role": "model" } },
                { "content": { "parts": [ { "text": "ignored second candidate" } ] } }
            ]
        })
    }

    #[test]
    fn test_request_body_shape() {
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: "hello" }],
            }],
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value, json!({ "contents": [ { "parts": [ { "text": "hello" } ] } ] }));
    }

    #[test]
    fn test_first_text_missing_candidates_is_shape_error() {
        let parsed: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            parsed.into_first_text(),
            Err(GenerationError::ResponseShape(_))
        ));
    }

    #[test]
    fn test_first_text_missing_parts_is_shape_error() {
        let parsed: GenerateContentResponse =
            serde_json::from_value(json!({ "candidates": [ { "content": { "parts": [] } } ] }))
                .unwrap();
        assert!(matches!(
            parsed.into_first_text(),
            Err(GenerationError::ResponseShape(_))
        ));
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let client = GeminiClient::new("k".to_string(), "https://example.test/v1beta/".to_string());
        assert_eq!(
            client.endpoint(),
            "https://example.test/v1beta/models/gemini-pro:generateContent"
        );
    }

    #[tokio::test]
    async fn test_generate_posts_prompt_with_key_and_returns_first_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(query_param("key", "secret-key"))
            .and(body_json(json!({
                "contents": [ { "parts": [ { "text": "  prompt kept verbatim\n" } ] } ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("1. A title")))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new("secret-key".to_string(), server.uri());
        let text = client.generate("  prompt kept verbatim\n").await.unwrap();

        assert_eq!(text, "1. A title");
    }

    #[tokio::test]
    async fn test_non_success_status_is_request_error_with_upstream_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": { "code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new("bad".to_string(), server.uri());
        let err = client.generate("prompt").await.unwrap_err();

        match err {
            GenerationError::Request { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("expected Request error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new("k".to_string(), server.uri());
        let err = client.generate("prompt").await.unwrap_err();

        assert!(matches!(err, GenerationError::Request { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_success_without_candidates_is_shape_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "promptFeedback": {} })))
            .mount(&server)
            .await;

        let client = GeminiClient::new("k".to_string(), server.uri());
        let err = client.generate("prompt").await.unwrap_err();

        assert!(matches!(err, GenerationError::ResponseShape(_)));
    }

    #[tokio::test]
    async fn test_success_with_non_json_body_is_shape_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = GeminiClient::new("k".to_string(), server.uri());
        let err = client.generate("prompt").await.unwrap_err();

        assert!(matches!(err, GenerationError::ResponseShape(_)));
    }
}
