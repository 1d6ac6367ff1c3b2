//! Responses envelope: the local transcript is sent as `input`.

use super::api::{Endpoint, OpenAIClient};
use super::responses_sse::ResponsesSseParser;
use super::responses_types::{RequestBody, ResponseObject};
use crate::core::transcript::Utterance;
use crate::providers::{ProviderError, ProviderResult, TextStream};

const RESPONSES_PATH: &str = "/responses";

impl OpenAIClient {
    /// Sends the transcript and returns the whole reply text.
    pub async fn create_response(
        &self,
        model: &str,
        transcript: &[Utterance],
    ) -> ProviderResult<String> {
        let body = RequestBody::new(model, transcript, false);
        let response: ResponseObject = self
            .post_json(RESPONSES_PATH, &body, Endpoint::Json)
            .await?;

        if response.status.as_deref() == Some("failed") {
            return Err(match response.error.as_ref().filter(|e| !e.is_null()) {
                Some(error) => ProviderError::from_error_object(error),
                None => ProviderError::api_error("response_failed", "Response failed"),
            });
        }
        Ok(response.text())
    }

    /// Sends the transcript and returns the reply as a stream of text fragments.
    pub async fn create_response_stream(
        &self,
        model: &str,
        transcript: &[Utterance],
    ) -> ProviderResult<TextStream> {
        let body = RequestBody::new(model, transcript, true);
        let response = self.post_stream(RESPONSES_PATH, &body).await?;
        Ok(Box::pin(ResponsesSseParser::new(response.bytes_stream())))
    }
}
