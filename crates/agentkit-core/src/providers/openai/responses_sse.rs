//! SSE parsing for Responses streaming.

use std::collections::VecDeque;
use std::pin::Pin;

use eventsource_stream::{EventStream, Eventsource};
use futures_util::Stream;
use serde_json::Value;

use crate::providers::shared::{SseTerminatedStream, parse_sse_json};
use crate::providers::{ProviderError, ProviderResult};

/// SSE parser yielding `response.output_text.delta` fragments.
pub struct ResponsesSseParser<S> {
    inner: EventStream<SseTerminatedStream<S>>,
    pending: VecDeque<ProviderResult<String>>,
    finished: bool,
}

impl<S> ResponsesSseParser<S> {
    pub fn new<E>(stream: S) -> Self
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
        let Some(value) = parse_sse_json(data)? else {
            return Ok(());
        };
        let event_type = value.get("type").and_then(Value::as_str).unwrap_or("");

        match event_type {
            "response.output_text.delta" => {
                if let Some(delta) = value.get("delta").and_then(Value::as_str)
                    && !delta.is_empty()
                {
                    self.pending.push_back(Ok(delta.to_string()));
                }
            }
            "response.completed" | "response.incomplete" => {
                self.finished = true;
            }
            "response.failed" => {
                self.finished = true;
                let error = value
                    .get("response")
                    .and_then(|r| r.get("error"))
                    .filter(|e| !e.is_null());
                return Err(match error {
                    Some(error) => ProviderError::from_error_object(error),
                    None => ProviderError::api_error("response_failed", "Response failed"),
                });
            }
            "error" => {
                self.finished = true;
                if let Some(error) = value.get("error").filter(|e| e.is_object()) {
                    return Err(ProviderError::from_error_object(error));
                }
                // Flat form: the event's own `type` is just "error".
                let code = value
                    .get("code")
                    .and_then(Value::as_str)
                    .unwrap_or("error");
                let message = value
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown error");
                return Err(ProviderError::api_error(code, message));
            }
            // Lifecycle and item bookkeeping events carry no reply text.
            _ => {}
        }
        Ok(())
    }
}

impl<S, E> Stream for ResponsesSseParser<S>
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

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;
    use crate::providers::ProviderErrorKind;

    type Chunk = Result<bytes::Bytes, std::io::Error>;

    fn parser_for(body: &str) -> ResponsesSseParser<impl Stream<Item = Chunk> + Unpin> {
        let chunks: Vec<Chunk> = vec![Ok(bytes::Bytes::from(body.to_string()))];
        ResponsesSseParser::new(futures_util::stream::iter(chunks))
    }

    #[tokio::test]
    async fn test_deltas_until_completed() {
        let body = concat!(
            "event: response.created\n",
            "data: {\"type\":\"response.created\",\"response\":{\"id\":\"resp_1\"}}\n\n",
            "event: response.output_text.delta\n",
            "data: {\"type\":\"response.output_text.delta\",\"delta\":\"Hi\"}\n\n",
            "event: response.output_text.delta\n",
            "data: {\"type\":\"response.output_text.delta\",\"delta\":\" there\"}\n\n",
            "event: response.completed\n",
            "data: {\"type\":\"response.completed\",\"response\":{\"status\":\"completed\"}}\n\n",
            "data: {\"type\":\"response.output_text.delta\",\"delta\":\"ignored\"}\n\n",
        );
        let fragments: Vec<String> = parser_for(body).map(|r| r.unwrap()).collect().await;
        assert_eq!(fragments, vec!["Hi", " there"]);
    }

    #[tokio::test]
    async fn test_response_failed_is_api_error() {
        let body = concat!(
            "data: {\"type\":\"response.output_text.delta\",\"delta\":\"par\"}\n\n",
            "data: {\"type\":\"response.failed\",\"response\":{\"status\":\"failed\",",
            "\"error\":{\"code\":\"server_error\",\"message\":\"model crashed\"}}}\n\n",
        );
        let mut parser = parser_for(body);
        assert_eq!(parser.next().await.unwrap().unwrap(), "par");
        let err = parser.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::ApiError);
        assert_eq!(err.message, "server_error: model crashed");
        assert!(parser.next().await.is_none());
    }

    #[tokio::test]
    async fn test_error_event() {
        let body = "data: {\"type\":\"error\",\"code\":\"rate_limit_exceeded\",\"message\":\"slow down\"}\n\n";
        let results: Vec<_> = parser_for(body).collect().await;
        assert_eq!(results.len(), 1);
        let err = results[0].as_ref().unwrap_err();
        assert_eq!(err.message, "rate_limit_exceeded: slow down");
    }

    #[tokio::test]
    async fn test_malformed_json_is_parse_error() {
        let results: Vec<_> = parser_for("data: {oops\n\n").collect().await;
        assert_eq!(
            results[0].as_ref().unwrap_err().kind,
            ProviderErrorKind::Parse
        );
    }
}
