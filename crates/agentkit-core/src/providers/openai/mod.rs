//! OpenAI clients for the Assistants, Chat Completions and Responses APIs.

pub mod api;
pub mod assistants;
mod assistants_types;
pub mod chat_completions;
pub mod responses;
mod responses_sse;
mod responses_types;

pub use api::{OpenAIClient, OpenAIConfig};
pub use assistants::{PollPolicy, extract_message_text};
pub use assistants_types::{
    Assistant, MessageContentPart, MessageList, Run, RunError, RunStatus, TextContent, Thread,
    ThreadMessage,
};
