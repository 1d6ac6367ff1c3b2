//! OpenAI API key client shared by all three envelopes.

use anyhow::Result;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::providers::shared::{USER_AGENT, classify_reqwest_error};
use crate::providers::{ProviderError, ProviderResult, resolve_api_key, resolve_base_url};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const API_KEY_ENV: &str = "OPENAI_API_KEY";
const BASE_URL_ENV: &str = "OPENAI_BASE_URL";
const ASSISTANTS_BETA: &str = "assistants=v2";

/// OpenAI API configuration.
#[derive(Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub base_url: String,
}

impl std::fmt::Debug for OpenAIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenAIConfig {
    /// Creates a new config from environment.
    ///
    /// Environment variables:
    /// - `OPENAI_API_KEY` (required)
    /// - `OPENAI_BASE_URL` (optional, wins over the config file)
    pub fn from_env(config_base_url: Option<&str>) -> Result<Self> {
        let api_key = resolve_api_key(API_KEY_ENV)?;
        let base_url = resolve_base_url(config_base_url, BASE_URL_ENV, DEFAULT_BASE_URL)?;
        Ok(Self { api_key, base_url })
    }

    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

/// Which request headers an endpoint needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Endpoint {
    /// Plain JSON request/response
    Json,
    /// Server-sent events response
    EventStream,
    /// Assistants/Threads/Runs beta surface
    Assistants,
}

/// OpenAI API client.
pub struct OpenAIClient {
    config: OpenAIConfig,
    http: reqwest::Client,
}

impl OpenAIClient {
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// POSTs a JSON body and decodes a JSON reply.
    pub(crate) async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        endpoint: Endpoint,
    ) -> ProviderResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        tracing::debug!(%url, "POST");
        let response = self
            .http
            .post(&url)
            .headers(build_headers(&self.config.api_key, endpoint))
            .json(body)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        decode_json(response).await
    }

    /// GETs a JSON resource.
    pub(crate) async fn get_json<T>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        endpoint: Endpoint,
    ) -> ProviderResult<T>
    where
        T: DeserializeOwned,
    {
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        let response = self
            .http
            .get(&url)
            .headers(build_headers(&self.config.api_key, endpoint))
            .query(query)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        decode_json(response).await
    }

    /// POSTs a JSON body and returns the successful response for streaming.
    pub(crate) async fn post_stream<B>(
        &self,
        path: &str,
        body: &B,
    ) -> ProviderResult<reqwest::Response>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        tracing::debug!(%url, "POST (stream)");
        let response = self
            .http
            .post(&url)
            .headers(build_headers(&self.config.api_key, Endpoint::EventStream))
            .json(body)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ProviderError::http_status(status.as_u16(), &error_body));
        }
        Ok(response)
    }
}

async fn decode_json<T: DeserializeOwned>(response: reqwest::Response) -> ProviderResult<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| classify_reqwest_error(&e))?;

    if !status.is_success() {
        return Err(ProviderError::http_status(status.as_u16(), &body));
    }

    serde_json::from_str(&body).map_err(|err| ProviderError {
        kind: crate::providers::ProviderErrorKind::Parse,
        message: format!("Unexpected response shape: {err}"),
        details: Some(body),
    })
}

fn build_headers(api_key: &str, endpoint: Endpoint) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "Authorization",
        HeaderValue::from_str(&format!("Bearer {api_key}"))
            .unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    headers.insert("content-type", HeaderValue::from_static("application/json"));
    headers.insert("user-agent", HeaderValue::from_static(USER_AGENT));
    match endpoint {
        Endpoint::Json => {
            headers.insert("accept", HeaderValue::from_static("application/json"));
        }
        Endpoint::EventStream => {
            headers.insert("accept", HeaderValue::from_static("text/event-stream"));
        }
        Endpoint::Assistants => {
            headers.insert("accept", HeaderValue::from_static("application/json"));
            headers.insert("OpenAI-Beta", HeaderValue::from_static(ASSISTANTS_BETA));
        }
    }
    headers
}
