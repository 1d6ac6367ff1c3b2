//! Assistants/Threads/Runs envelope.
//!
//! History lives on the remote thread; a turn is "add message, start run,
//! poll until terminal, read the newest assistant message".

use std::time::Duration;

use tokio::time::Instant;

use super::api::{Endpoint, OpenAIClient};
use super::assistants_types::{
    Assistant, CreateAssistantRequest, CreateMessageRequest, CreateRunRequest, MessageContentPart,
    MessageList, Run, Thread, ThreadMessage,
};
use crate::providers::{ProviderError, ProviderResult};

/// Page size used when reading back the newest messages of a thread.
const MESSAGE_PAGE_LIMIT: &str = "10";

/// Upper bound on the best-effort cancel sent after a polling timeout.
const CANCEL_TIMEOUT: Duration = Duration::from_secs(5);

/// Bounded polling for run completion.
///
/// The wait between polls starts at `initial_interval` and doubles up to
/// `max_interval`. Polling gives up once `timeout` has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(4),
            timeout: Duration::from_secs(120),
        }
    }
}

impl PollPolicy {
    /// Returns the wait that follows `current`.
    pub fn next_interval(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_interval)
    }
}

/// Joins every text part of a message, in order.
pub fn extract_message_text(message: &ThreadMessage) -> String {
    message
        .content
        .iter()
        .filter_map(|part| match part {
            MessageContentPart::Text { text } => Some(text.value.as_str()),
            MessageContentPart::Other => None,
        })
        .collect()
}

impl OpenAIClient {
    pub async fn create_assistant(
        &self,
        model: &str,
        name: &str,
        instructions: Option<&str>,
    ) -> ProviderResult<Assistant> {
        let request = CreateAssistantRequest {
            model,
            name,
            instructions,
        };
        self.post_json("/assistants", &request, Endpoint::Assistants)
            .await
    }

    pub async fn retrieve_assistant(&self, assistant_id: &str) -> ProviderResult<Assistant> {
        self.get_json(
            &format!("/assistants/{assistant_id}"),
            &[],
            Endpoint::Assistants,
        )
        .await
    }

    pub async fn create_thread(&self) -> ProviderResult<Thread> {
        self.post_json("/threads", &serde_json::json!({}), Endpoint::Assistants)
            .await
    }

    pub async fn add_message(
        &self,
        thread_id: &str,
        content: &str,
    ) -> ProviderResult<ThreadMessage> {
        let request = CreateMessageRequest {
            role: "user",
            content,
        };
        self.post_json(
            &format!("/threads/{thread_id}/messages"),
            &request,
            Endpoint::Assistants,
        )
        .await
    }

    pub async fn create_run(&self, thread_id: &str, assistant_id: &str) -> ProviderResult<Run> {
        self.post_json(
            &format!("/threads/{thread_id}/runs"),
            &CreateRunRequest { assistant_id },
            Endpoint::Assistants,
        )
        .await
    }

    pub async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> ProviderResult<Run> {
        self.get_json(
            &format!("/threads/{thread_id}/runs/{run_id}"),
            &[],
            Endpoint::Assistants,
        )
        .await
    }

    pub async fn cancel_run(&self, thread_id: &str, run_id: &str) -> ProviderResult<Run> {
        self.post_json(
            &format!("/threads/{thread_id}/runs/{run_id}/cancel"),
            &serde_json::json!({}),
            Endpoint::Assistants,
        )
        .await
    }

    /// Lists the newest messages of a thread, newest first.
    pub async fn list_messages(&self, thread_id: &str) -> ProviderResult<MessageList> {
        self.get_json(
            &format!("/threads/{thread_id}/messages"),
            &[("order", "desc"), ("limit", MESSAGE_PAGE_LIMIT)],
            Endpoint::Assistants,
        )
        .await
    }

    /// Polls a run until it reaches a terminal status.
    ///
    /// Returns the final run whatever its status; callers decide what a
    /// non-completed terminal state means. The policy's timeout bounds the
    /// whole wait, status requests included. When it is exceeded the run is
    /// cancelled (best effort) and a timeout error is returned.
    pub async fn wait_for_run(
        &self,
        thread_id: &str,
        run: Run,
        policy: PollPolicy,
    ) -> ProviderResult<Run> {
        let deadline = Instant::now() + policy.timeout;
        let mut interval = policy.initial_interval;
        let mut run = run;

        loop {
            if run.status.is_terminal() {
                tracing::debug!(run_id = %run.id, status = %run.status, "Run finished");
                return Ok(run);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(self.abandon_run(thread_id, &run, policy).await);
            }

            tokio::time::sleep(interval.min(deadline - now)).await;
            interval = policy.next_interval(interval);

            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, self.retrieve_run(thread_id, &run.id)).await {
                Ok(next) => run = next?,
                Err(_) => return Err(self.abandon_run(thread_id, &run, policy).await),
            }
        }
    }

    /// Cancels a run that outlived the polling deadline and builds the
    /// timeout error for it.
    async fn abandon_run(&self, thread_id: &str, run: &Run, policy: PollPolicy) -> ProviderError {
        tracing::warn!(
            run_id = %run.id,
            status = %run.status,
            "Run did not finish in {:?}, cancelling",
            policy.timeout
        );
        match tokio::time::timeout(CANCEL_TIMEOUT, self.cancel_run(thread_id, &run.id)).await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => tracing::warn!(run_id = %run.id, "Cancel failed: {err}"),
            Err(_) => tracing::warn!(run_id = %run.id, "Cancel timed out"),
        }
        ProviderError::timeout(format!(
            "Run {} still {} after {}s",
            run.id,
            run.status,
            policy.timeout.as_secs()
        ))
    }
}
