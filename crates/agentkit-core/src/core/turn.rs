//! Turn Executor.
//!
//! One user utterance goes in, one assistant reply comes out. The executor
//! dispatches on the session variant; each mode has exactly one handler.

use std::fmt;

use anyhow::{Context, Result};
use futures_util::StreamExt;

use super::session::Session;
use super::transcript::{Transcript, Utterance};
use crate::providers::openai::{OpenAIClient, PollPolicy, RunStatus, extract_message_text};
use crate::providers::{ProviderResult, TextStream};

/// Turn-level failures that are not transport errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnError {
    /// The run reached a terminal state other than `completed`
    RunFailed {
        status: RunStatus,
        reason: Option<String>,
    },
    /// The run completed but left no assistant text on the thread
    NoReply,
}

impl fmt::Display for TurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnError::RunFailed {
                status,
                reason: Some(reason),
            } => write!(f, "Run {status}: {reason}"),
            TurnError::RunFailed {
                status,
                reason: None,
            } => write!(f, "Run ended with status {status}"),
            TurnError::NoReply => write!(f, "Assistant returned no reply"),
        }
    }
}

impl std::error::Error for TurnError {}

/// The assistant's answer to one turn.
pub enum Reply<'s> {
    Complete(String),
    Streaming(StreamingReply<'s>),
}

impl Reply<'_> {
    /// Waits for the whole reply text.
    pub async fn into_text(self) -> Result<String> {
        match self {
            Reply::Complete(text) => Ok(text),
            Reply::Streaming(stream) => stream.collect().await,
        }
    }
}

/// A finite, single-use sequence of reply fragments.
///
/// When the sequence ends normally the user utterance and the concatenated
/// text are appended to the session transcript, exactly once. A fragment
/// error ends the sequence and nothing is appended.
pub struct StreamingReply<'s> {
    fragments: TextStream,
    user: String,
    collected: String,
    transcript: &'s mut Transcript,
    done: bool,
}

impl<'s> StreamingReply<'s> {
    fn new(fragments: TextStream, user: &str, transcript: &'s mut Transcript) -> Self {
        Self {
            fragments,
            user: user.to_string(),
            collected: String::new(),
            transcript,
            done: false,
        }
    }

    pub async fn next_fragment(&mut self) -> Option<ProviderResult<String>> {
        if self.done {
            return None;
        }
        match self.fragments.next().await {
            Some(Ok(fragment)) => {
                self.collected.push_str(&fragment);
                Some(Ok(fragment))
            }
            Some(Err(err)) => {
                self.done = true;
                Some(Err(err))
            }
            None => {
                self.done = true;
                self.transcript
                    .push_exchange(std::mem::take(&mut self.user), self.collected.clone());
                None
            }
        }
    }

    /// Text received so far.
    pub fn text(&self) -> &str {
        &self.collected
    }

    /// Drains the remaining fragments and returns the full text.
    pub async fn collect(mut self) -> Result<String> {
        while let Some(fragment) = self.next_fragment().await {
            fragment.context("Reply stream failed")?;
        }
        Ok(self.collected)
    }
}

/// Which local-transcript envelope a turn goes through.
#[derive(Debug, Clone, Copy)]
enum Envelope {
    ChatCompletions,
    Responses,
}

impl Envelope {
    async fn complete(
        self,
        client: &OpenAIClient,
        model: &str,
        entries: &[Utterance],
    ) -> ProviderResult<String> {
        match self {
            Envelope::ChatCompletions => client.chat_completion(model, entries).await,
            Envelope::Responses => client.create_response(model, entries).await,
        }
    }

    async fn open_stream(
        self,
        client: &OpenAIClient,
        model: &str,
        entries: &[Utterance],
    ) -> ProviderResult<TextStream> {
        match self {
            Envelope::ChatCompletions => client.chat_completion_stream(model, entries).await,
            Envelope::Responses => client.create_response_stream(model, entries).await,
        }
    }
}

pub struct TurnExecutor<'c> {
    client: &'c OpenAIClient,
    stream: bool,
    poll: PollPolicy,
}

impl<'c> TurnExecutor<'c> {
    /// `stream` only affects the transcript modes; assistant runs are
    /// always read back whole.
    pub fn new(client: &'c OpenAIClient, stream: bool, poll: PollPolicy) -> Self {
        Self {
            client,
            stream,
            poll,
        }
    }

    pub fn streams(&self) -> bool {
        self.stream
    }

    /// Executes one turn against the session.
    pub async fn execute<'s>(
        &self,
        session: &'s mut Session,
        utterance: &str,
    ) -> Result<Reply<'s>> {
        match session {
            Session::AssistantThread {
                assistant_id,
                thread_id,
            } => self
                .assistant_turn(assistant_id, thread_id, utterance)
                .await
                .map(Reply::Complete),
            Session::ChatCompletion { model, transcript } => {
                self.transcript_turn(Envelope::ChatCompletions, model, transcript, utterance)
                    .await
            }
            Session::ResponseTranscript { model, transcript } => {
                self.transcript_turn(Envelope::Responses, model, transcript, utterance)
                    .await
            }
        }
    }

    async fn transcript_turn<'s>(
        &self,
        envelope: Envelope,
        model: &str,
        transcript: &'s mut Transcript,
        utterance: &str,
    ) -> Result<Reply<'s>> {
        // Nothing is recorded until the reply is in.
        let request = transcript.with_pending(utterance);

        let opened = if self.stream {
            match envelope.open_stream(self.client, model, &request).await
            {
                Ok(fragments) => Some(fragments),
                Err(err) => {
                    tracing::warn!(?envelope, "Streaming failed, retrying without it: {err}");
                    None
                }
            }
        } else {
            None
        };
        if let Some(fragments) = opened {
            return Ok(Reply::Streaming(StreamingReply::new(
                fragments, utterance, transcript,
            )));
        }

        let text = envelope.complete(self.client, model, &request).await?;
        transcript.push_exchange(utterance, text.clone());
        Ok(Reply::Complete(text))
    }

    async fn assistant_turn(
        &self,
        assistant_id: &str,
        thread_id: &str,
        utterance: &str,
    ) -> Result<String> {
        self.client
            .add_message(thread_id, utterance)
            .await
            .context("Failed to add message to thread")?;
        let run = self
            .client
            .create_run(thread_id, assistant_id)
            .await
            .context("Failed to start run")?;
        tracing::debug!(run_id = %run.id, "Run started");

        let run = self.client.wait_for_run(thread_id, run, self.poll).await?;
        if run.status != RunStatus::Completed {
            return Err(TurnError::RunFailed {
                status: run.status,
                reason: run.last_error.as_ref().and_then(|e| e.describe()),
            }
            .into());
        }

        let messages = self
            .client
            .list_messages(thread_id)
            .await
            .context("Failed to fetch messages")?;
        // Newest first; anything past the latest user message belongs to an
        // earlier turn.
        messages
            .data
            .iter()
            .take_while(|m| m.role != "user")
            .filter(|m| m.role == "assistant")
            .map(extract_message_text)
            .find(|text| !text.is_empty())
            .ok_or_else(|| TurnError::NoReply.into())
    }
}
