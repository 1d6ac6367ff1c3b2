//! Session Builder.
//!
//! A session is created once at startup and is valid for exactly one mode.
//! Nothing here is persisted; remote assistants and threads are left in
//! place on exit.

use anyhow::{Context, Result};

use super::mode::Mode;
use super::transcript::Transcript;
use crate::providers::openai::OpenAIClient;

/// Everything needed to build a session.
#[derive(Debug, Clone)]
pub struct SessionSpec {
    pub mode: Mode,
    pub model: String,
    /// System prompt for transcript modes, instructions for a new assistant
    pub system_prompt: Option<String>,
    /// Reuse this assistant instead of creating one
    pub assistant_id: Option<String>,
    /// Display name for a newly created assistant
    pub assistant_name: String,
}

/// Per-mode conversation handle.
#[derive(Debug, Clone)]
pub enum Session {
    AssistantThread {
        assistant_id: String,
        thread_id: String,
    },
    ChatCompletion {
        model: String,
        transcript: Transcript,
    },
    ResponseTranscript {
        model: String,
        transcript: Transcript,
    },
}

impl Session {
    pub fn mode(&self) -> Mode {
        match self {
            Session::AssistantThread { .. } => Mode::Assistants,
            Session::ChatCompletion { .. } => Mode::Chat,
            Session::ResponseTranscript { .. } => Mode::Responses,
        }
    }

    /// Local history, absent for assistant threads.
    pub fn transcript(&self) -> Option<&Transcript> {
        match self {
            Session::AssistantThread { .. } => None,
            Session::ChatCompletion { transcript, .. }
            | Session::ResponseTranscript { transcript, .. } => Some(transcript),
        }
    }
}

/// Builds the session for `spec.mode`.
///
/// Only assistants mode touches the network: it validates or creates the
/// assistant, then opens a fresh thread. Any failure is returned so the
/// caller can stop before the first prompt.
pub async fn build_session(client: &OpenAIClient, spec: &SessionSpec) -> Result<Session> {
    match spec.mode {
        Mode::Assistants => build_assistant_thread(client, spec).await,
        Mode::Chat => Ok(Session::ChatCompletion {
            model: spec.model.clone(),
            transcript: Transcript::new(spec.system_prompt.as_deref()),
        }),
        Mode::Responses => Ok(Session::ResponseTranscript {
            model: spec.model.clone(),
            transcript: Transcript::new(spec.system_prompt.as_deref()),
        }),
    }
}

async fn build_assistant_thread(client: &OpenAIClient, spec: &SessionSpec) -> Result<Session> {
    let assistant = match spec.assistant_id.as_deref() {
        Some(id) => client
            .retrieve_assistant(id)
            .await
            .with_context(|| format!("Failed to load assistant {id}"))?,
        None => client
            .create_assistant(
                &spec.model,
                &spec.assistant_name,
                spec.system_prompt.as_deref(),
            )
            .await
            .context("Failed to create assistant")?,
    };
    tracing::info!(assistant_id = %assistant.id, "Assistant ready");

    let thread = client
        .create_thread()
        .await
        .context("Failed to create thread")?;
    tracing::info!(thread_id = %thread.id, "Thread created");

    Ok(Session::AssistantThread {
        assistant_id: assistant.id,
        thread_id: thread.id,
    })
}
