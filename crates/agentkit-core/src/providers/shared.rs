//! Provider-agnostic types shared across the OpenAI envelopes.

use std::fmt;
use std::pin::Pin;

use anyhow::{Context, Result};
use futures_util::Stream;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Standard User-Agent header for agentkit API requests.
pub const USER_AGENT: &str = concat!("agentkit/", env!("CARGO_PKG_VERSION"));

/// A finite stream of reply text fragments, consumed once.
pub type TextStream = BoxStream<'static, ProviderResult<String>>;

// ============================================================================
// Config resolution helpers
// ============================================================================

/// Reads an API key from the environment.
///
/// Credentials are never taken from the config file.
pub fn resolve_api_key(env_var: &str) -> Result<String> {
    let key = std::env::var(env_var)
        .with_context(|| format!("{env_var} is not set. Export it to call the API."))?;
    validate_api_key(env_var, &key)
}

/// Trims a raw key and rejects values that cannot travel in an
/// `Authorization` header.
fn validate_api_key(env_var: &str, key: &str) -> Result<String> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        anyhow::bail!("{env_var} is empty. Export a valid key to call the API.");
    }
    if reqwest::header::HeaderValue::from_str(&format!("Bearer {trimmed}")).is_err() {
        anyhow::bail!("{env_var} contains characters that are not allowed in an HTTP header.");
    }
    Ok(trimmed.to_string())
}

/// Resolves a base URL with precedence: env > config > default.
pub fn resolve_base_url(
    config_base_url: Option<&str>,
    env_var: &str,
    default_url: &str,
) -> Result<String> {
    if let Ok(env_url) = std::env::var(env_var) {
        let trimmed = env_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }

    if let Some(config_url) = config_base_url {
        let trimmed = config_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }

    Ok(default_url.to_string())
}

fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid API base URL: {url}"))?;
    Ok(())
}

// ============================================================================
// Errors
// ============================================================================

/// Categories of provider errors for consistent error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// HTTP status error (4xx, 5xx) or transport failure
    HttpStatus,
    /// Connection timeout, request timeout or polling deadline
    Timeout,
    /// Failed to parse response (JSON parse error, invalid SSE, unexpected shape)
    Parse,
    /// API-level error returned by the provider inside a 2xx response
    ApiError,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderErrorKind::HttpStatus => write!(f, "http_status"),
            ProviderErrorKind::Timeout => write!(f, "timeout"),
            ProviderErrorKind::Parse => write!(f, "parse"),
            ProviderErrorKind::ApiError => write!(f, "api_error"),
        }
    }
}

/// Structured error from the provider with kind and details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderError {
    /// Error category
    pub kind: ProviderErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an HTTP status error, preferring the API's own error message.
    pub fn http_status(status: u16, body: &str) -> Self {
        if body.is_empty() {
            return Self::new(ProviderErrorKind::HttpStatus, format!("HTTP {status}"));
        }

        if let Ok(json) = serde_json::from_str::<Value>(body)
            && let Some(msg) = json
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
        {
            return Self {
                kind: ProviderErrorKind::HttpStatus,
                message: format!("HTTP {status}: {msg}"),
                details: Some(body.to_string()),
            };
        }

        Self {
            kind: ProviderErrorKind::HttpStatus,
            message: format!("HTTP {status}"),
            details: Some(body.to_string()),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Parse, message)
    }

    /// Creates an API error (from an error payload inside a successful response).
    pub fn api_error(error_type: &str, message: &str) -> Self {
        Self::new(
            ProviderErrorKind::ApiError,
            format!("{error_type}: {message}"),
        )
    }

    /// Builds an API error from an `{"type"|"code", "message"}` JSON object.
    pub fn from_error_object(error: &Value) -> Self {
        let error_type = error
            .get("type")
            .or_else(|| error.get("code"))
            .and_then(Value::as_str)
            .unwrap_or("error");
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error");
        Self::api_error(error_type, message)
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ProviderError {}

pub fn classify_reqwest_error(e: &reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::timeout(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        ProviderError::timeout(format!("Connection failed: {e}"))
    } else if e.is_decode() {
        ProviderError::parse(format!("Failed to decode response: {e}"))
    } else if e.is_request() {
        ProviderError::new(ProviderErrorKind::HttpStatus, format!("Request error: {e}"))
    } else {
        ProviderError::new(ProviderErrorKind::HttpStatus, format!("Network error: {e}"))
    }
}

// ============================================================================
// SSE plumbing
// ============================================================================

/// Appends a blank line once the byte stream ends so the last SSE event is
/// dispatched even when the server omits the trailing delimiter.
pub struct SseTerminatedStream<S> {
    inner: S,
    emitted_terminator: bool,
}

impl<S> SseTerminatedStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            emitted_terminator: false,
        }
    }
}

impl<S, E> Stream for SseTerminatedStream<S>
where
    S: Stream<Item = std::result::Result<bytes::Bytes, E>> + Unpin,
{
    type Item = std::result::Result<bytes::Bytes, E>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        use std::task::Poll;

        if self.emitted_terminator {
            return Poll::Ready(None);
        }

        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(item)) => Poll::Ready(Some(item)),
            Poll::Ready(None) => {
                self.emitted_terminator = true;
                Poll::Ready(Some(Ok(bytes::Bytes::from_static(b"\n\n"))))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Parses one SSE `data:` payload into JSON, treating blanks and `[DONE]` as no event.
pub fn parse_sse_json(data: &str) -> ProviderResult<Option<Value>> {
    let trimmed = data.trim();
    if trimmed.is_empty() || trimmed == "[DONE]" {
        return Ok(None);
    }
    serde_json::from_str::<Value>(trimmed)
        .map(Some)
        .map_err(|err| ProviderError::parse(format!("Failed to parse SSE JSON: {err}")))
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;

    #[test]
    fn test_http_status_extracts_api_message() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        let err = ProviderError::http_status(401, body);
        assert_eq!(err.kind, ProviderErrorKind::HttpStatus);
        assert_eq!(err.message, "HTTP 401: Incorrect API key provided");
        assert_eq!(err.details.as_deref(), Some(body));
    }

    #[test]
    fn test_http_status_plain_body() {
        let err = ProviderError::http_status(502, "bad gateway");
        assert_eq!(err.message, "HTTP 502");
        assert_eq!(err.details.as_deref(), Some("bad gateway"));

        let err = ProviderError::http_status(500, "");
        assert_eq!(err.message, "HTTP 500");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_from_error_object_prefers_type_then_code() {
        let err = ProviderError::from_error_object(
            &serde_json::json!({"code": "server_error", "message": "boom"}),
        );
        assert_eq!(err.kind, ProviderErrorKind::ApiError);
        assert_eq!(err.to_string(), "server_error: boom");
    }

    #[test]
    fn test_parse_sse_json_skips_done_and_blank() {
        assert!(parse_sse_json("[DONE]").unwrap().is_none());
        assert!(parse_sse_json("   ").unwrap().is_none());
        assert!(parse_sse_json("{not json").is_err());
        assert_eq!(
            parse_sse_json(r#"{"a":1}"#).unwrap(),
            Some(serde_json::json!({"a": 1}))
        );
    }

    #[test]
    fn test_resolve_base_url_prefers_config_over_default() {
        // Uses a variable name no test environment sets.
        let url = resolve_base_url(
            Some("http://localhost:9999/v1/"),
            "AGENTKIT_TEST_UNSET_BASE_URL",
            "https://api.openai.com/v1",
        )
        .unwrap();
        assert_eq!(url, "http://localhost:9999/v1");

        let url = resolve_base_url(None, "AGENTKIT_TEST_UNSET_BASE_URL", "https://x.test").unwrap();
        assert_eq!(url, "https://x.test");

        assert!(resolve_base_url(Some("not a url"), "AGENTKIT_TEST_UNSET_BASE_URL", "").is_err());
    }

    #[test]
    fn test_resolve_api_key_missing() {
        let err = resolve_api_key("AGENTKIT_TEST_UNSET_API_KEY").unwrap_err();
        assert!(err.to_string().contains("AGENTKIT_TEST_UNSET_API_KEY"));
    }

    #[test]
    fn test_validate_api_key() {
        assert_eq!(
            validate_api_key("OPENAI_API_KEY", "  sk-test \n").unwrap(),
            "sk-test"
        );
        assert!(validate_api_key("OPENAI_API_KEY", "   ").is_err());

        let err = validate_api_key("OPENAI_API_KEY", "sk-\u{7f}bad").unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
        assert!(validate_api_key("OPENAI_API_KEY", "sk-one\ntwo").is_err());
    }

    #[tokio::test]
    async fn test_sse_terminated_stream_appends_delimiter() {
        let chunks: Vec<std::result::Result<bytes::Bytes, std::io::Error>> =
            vec![Ok(bytes::Bytes::from_static(b"data: 1"))];
        let stream = SseTerminatedStream::new(futures_util::stream::iter(chunks));
        let collected: Vec<_> = stream.map(|r| r.unwrap()).collect().await;
        assert_eq!(collected.len(), 2);
        assert_eq!(&collected[1][..], b"\n\n");
    }
}
