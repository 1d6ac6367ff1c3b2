//! Chat Completions envelope: the whole transcript goes out as `messages`.

use std::collections::VecDeque;
use std::pin::Pin;

use eventsource_stream::{EventStream, Eventsource};
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::api::{Endpoint, OpenAIClient};
use crate::core::transcript::{Role, Utterance};
use crate::providers::shared::{SseTerminatedStream, parse_sse_json};
use crate::providers::{ProviderError, ProviderResult, TextStream};

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatCompletionMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatCompletionMessage<'a> {
    role: Role,
    content: &'a str,
}

impl<'a> ChatCompletionRequest<'a> {
    fn new(model: &'a str, transcript: &'a [Utterance], stream: bool) -> Self {
        Self {
            model,
            messages: transcript
                .iter()
                .map(|u| ChatCompletionMessage {
                    role: u.role,
                    content: &u.content,
                })
                .collect(),
            stream,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Value,
}

impl OpenAIClient {
    /// Sends the transcript and returns the whole assistant reply.
    pub async fn chat_completion(
        &self,
        model: &str,
        transcript: &[Utterance],
    ) -> ProviderResult<String> {
        let request = ChatCompletionRequest::new(model, transcript, false);
        let response: ChatCompletionResponse = self
            .post_json(CHAT_COMPLETIONS_PATH, &request, Endpoint::Json)
            .await?;

        let first = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::parse("Chat completion returned no choices"))?;
        let content = first.message.map(|m| m.content).unwrap_or(Value::Null);
        Ok(extract_content_text(&content))
    }

    /// Sends the transcript and returns the reply as a stream of text fragments.
    pub async fn chat_completion_stream(
        &self,
        model: &str,
        transcript: &[Utterance],
    ) -> ProviderResult<TextStream> {
        let request = ChatCompletionRequest::new(model, transcript, true);
        let response = self.post_stream(CHAT_COMPLETIONS_PATH, &request).await?;
        Ok(Box::pin(ChatCompletionsSseParser::new(
            response.bytes_stream(),
        )))
    }
}

/// Extracts text from `message.content`, which is either a string or a list
/// of `{ "type": "text", "text": ... }` parts.
fn extract_content_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| match part {
                Value::String(text) => Some(text.as_str()),
                Value::Object(_) if part.get("type").and_then(Value::as_str) == Some("text") => {
                    part.get("text").and_then(Value::as_str)
                }
                _ => None,
            })
            .collect(),
        _ => String::new(),
    }
}

/// SSE parser yielding `choices[0].delta.content` fragments.
struct ChatCompletionsSseParser<S> {
    inner: EventStream<SseTerminatedStream<S>>,
    pending: VecDeque<ProviderResult<String>>,
    finished: bool,
}

impl<S> ChatCompletionsSseParser<S> {
    fn new<E>(stream: S) -> Self
    where
        S: Stream<Item = std::result::Result<bytes::Bytes, E>> + Unpin,
    {
        Self {
            inner: SseTerminatedStream::new(stream).eventsource(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    fn handle_event_data(&mut self, data: &str) -> ProviderResult<()> {
        if data.trim() == "[DONE]" {
            self.finished = true;
            return Ok(());
        }
        let Some(value) = parse_sse_json(data)? else {
            return Ok(());
        };

        // Errors are terminal, nothing after them is trusted.
        if let Some(error) = value.get("error") {
            self.finished = true;
            return Err(ProviderError::from_error_object(error));
        }

        let delta = value
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("delta"));
        if let Some(text) = delta
            .and_then(|d| d.get("content"))
            .and_then(Value::as_str)
            && !text.is_empty()
        {
            self.pending.push_back(Ok(text.to_string()));
        }
        Ok(())
    }
}

impl<S, E> Stream for ChatCompletionsSseParser<S>
where
    S: Stream<Item = std::result::Result<bytes::Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    type Item = ProviderResult<String>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        use std::task::Poll;

        loop {
            if let Some(item) = self.pending.pop_front() {
                return Poll::Ready(Some(item));
            }
            if self.finished {
                return Poll::Ready(None);
            }

            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => {
                    if let Err(err) = self.handle_event_data(&event.data) {
                        return Poll::Ready(Some(Err(err)));
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    self.finished = true;
                    return Poll::Ready(Some(Err(ProviderError::parse(format!(
                        "SSE stream error: {e}"
                    )))));
                }
                Poll::Ready(None) => {
                    self.finished = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
