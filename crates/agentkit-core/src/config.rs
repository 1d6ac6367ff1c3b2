//! Configuration management for agentkit.
//!
//! Loads configuration from ${AGENTKIT_HOME}/config.toml with sensible defaults.
//! Every default the REPL needs (banners, prompts, system prompts, polling
//! bounds) lives here and is passed down explicitly.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::mode::Mode;
use crate::paths;
use crate::providers::openai::PollPolicy;

/// Default config template with comments, embedded at compile time.
const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("default_config.toml");

/// Instructions given to a freshly created assistant when none are configured.
pub const DEFAULT_ASSISTANT_INSTRUCTIONS: &str = "\
You are a well-intended, but lazy, general-purpose AI assistant.
- Be concise but complete, when its not too much work. Use step-by-step reasoning when it improves clarity.
- Ask clarifying questions when requirements are ambiguous or you're trying to stall instead of answering.
- Cite assumptions explicitly, if they are easy to remember, or say \"don't remember where I saw it, but ...\".
- Prefer safe, ethical, and privacy-preserving behavior.
- When executing tasks with tools or APIs, explain what you will do first.";

/// System prompt seeded into local transcripts when none is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful, general-purpose AI assistant. Be concise but complete.";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Interaction mode used when `--mode` is not given
    pub mode: Mode,

    /// Model identifier used by every mode
    pub model: String,

    /// Optional API base URL (for test rigs or proxies)
    pub base_url: Option<String>,

    /// Stream replies in chat/responses modes
    pub stream: bool,

    /// Print the mode banner when the REPL starts
    pub show_banner: bool,

    /// Input prompt shown before each turn
    pub prompt: String,

    pub assistants: AssistantsConfig,
    pub chat: TranscriptModeConfig,
    pub responses: TranscriptModeConfig,
    pub logging: LoggingConfig,
}

/// Assistants-mode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantsConfig {
    /// Display name of assistants created by agentkit
    pub name: String,
    /// Instructions for newly created assistants
    pub instructions: Option<String>,
    /// Existing assistant to reuse instead of creating one
    pub assistant_id: Option<String>,
    pub banner: Option<String>,
    pub poll_interval_ms: u64,
    pub poll_max_interval_ms: u64,
    pub poll_timeout_secs: u64,
}

/// Settings shared by the two transcript-based modes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptModeConfig {
    pub system_prompt: Option<String>,
    pub banner: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    /// Log file path; logs go to stderr when unset
    pub file: Option<PathBuf>,
}

impl Default for AssistantsConfig {
    fn default() -> Self {
        Self {
            name: AssistantsConfig::DEFAULT_NAME.to_string(),
            instructions: None,
            assistant_id: None,
            banner: None,
            poll_interval_ms: 500,
            poll_max_interval_ms: 4_000,
            poll_timeout_secs: 120,
        }
    }
}

impl AssistantsConfig {
    const DEFAULT_NAME: &str = "Generic AI Agent";
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

impl Config {
    const DEFAULT_MODEL: &str = "gpt-4o-mini";
    const DEFAULT_PROMPT: &str = "You: ";

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path()?)
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Returns the system prompt (or assistant instructions) for a mode.
    ///
    /// Blank values mean "no system prompt".
    pub fn system_prompt_for(&self, mode: Mode) -> Option<String> {
        let raw = match mode {
            Mode::Assistants => self
                .assistants
                .instructions
                .as_deref()
                .unwrap_or(DEFAULT_ASSISTANT_INSTRUCTIONS),
            Mode::Chat => self
                .chat
                .system_prompt
                .as_deref()
                .unwrap_or(DEFAULT_SYSTEM_PROMPT),
            Mode::Responses => self
                .responses
                .system_prompt
                .as_deref()
                .unwrap_or(DEFAULT_SYSTEM_PROMPT),
        };
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// Returns the REPL banner for a mode.
    pub fn banner_for(&self, mode: Mode) -> String {
        let configured = match mode {
            Mode::Assistants => self.assistants.banner.as_deref(),
            Mode::Chat => self.chat.banner.as_deref(),
            Mode::Responses => self.responses.banner.as_deref(),
        };
        configured.map_or_else(
            || format!("{} mode - type 'exit' to quit", mode.label()),
            ToString::to_string,
        )
    }

    /// Returns the configured run polling bounds for assistants mode.
    pub fn poll_policy(&self) -> PollPolicy {
        let initial = Duration::from_millis(self.assistants.poll_interval_ms.max(1));
        PollPolicy {
            initial_interval: initial,
            max_interval: Duration::from_millis(self.assistants.poll_max_interval_ms)
                .max(initial),
            timeout: Duration::from_secs(self.assistants.poll_timeout_secs),
        }
    }

    /// Returns the configured base URL, if set.
    /// Empty strings are treated as unset.
    pub fn effective_base_url(&self) -> Option<&str> {
        self.base_url.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Returns the configured assistant id, if set.
    pub fn effective_assistant_id(&self) -> Option<&str> {
        self.assistants
            .assistant_id
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, DEFAULT_CONFIG_TEMPLATE)
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Assistants,
            model: Self::DEFAULT_MODEL.to_string(),
            base_url: None,
            stream: false,
            show_banner: true,
            prompt: Self::DEFAULT_PROMPT.to_string(),
            assistants: AssistantsConfig::default(),
            chat: TranscriptModeConfig::default(),
            responses: TranscriptModeConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
