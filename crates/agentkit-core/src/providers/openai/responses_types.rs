//! Request/response types for the Responses API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::transcript::{Role, Utterance};

#[derive(Debug, Serialize)]
pub struct RequestBody<'a> {
    pub model: &'a str,
    pub input: Vec<InputItem<'a>>,
    pub stream: bool,
}

impl<'a> RequestBody<'a> {
    pub fn new(model: &'a str, transcript: &'a [Utterance], stream: bool) -> Self {
        Self {
            model,
            input: transcript.iter().map(InputItem::from).collect(),
            stream,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InputItem<'a> {
    #[serde(rename = "type")]
    pub item_type: &'static str,
    pub role: Role,
    pub content: &'a str,
}

impl<'a> From<&'a Utterance> for InputItem<'a> {
    fn from(utterance: &'a Utterance) -> Self {
        Self {
            item_type: "message",
            role: utterance.role,
            content: &utterance.content,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResponseObject {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub output_text: Option<String>,
    #[serde(default)]
    pub output: Vec<OutputItem>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct OutputItem {
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
pub struct OutputContent {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl ResponseObject {
    /// Reply text: the `output_text` convenience field when present,
    /// otherwise every `output_text` part of every `message` item.
    pub fn text(&self) -> String {
        if let Some(text) = self.output_text.as_deref()
            && !text.is_empty()
        {
            return text.to_string();
        }
        self.output
            .iter()
            .filter(|item| item.item_type == "message")
            .flat_map(|item| item.content.iter())
            .filter(|part| part.content_type == "output_text")
            .filter_map(|part| part.text.as_deref())
            .collect()
    }
}
