use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which OpenAI request envelope carries the conversation.
///
/// Chosen once at startup and never changed for the life of the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Remote assistant + thread; history lives server-side
    #[default]
    Assistants,
    /// Local transcript sent to `/chat/completions`
    Chat,
    /// Local transcript sent as `input` to `/responses`
    Responses,
}

impl Mode {
    pub const fn all() -> [Mode; 3] {
        [Mode::Assistants, Mode::Chat, Mode::Responses]
    }

    /// Stable identifier used on the command line and in config.
    pub const fn id(self) -> &'static str {
        match self {
            Mode::Assistants => "assistants",
            Mode::Chat => "chat",
            Mode::Responses => "responses",
        }
    }

    /// Display name used in banners.
    pub const fn label(self) -> &'static str {
        match self {
            Mode::Assistants => "Assistants",
            Mode::Chat => "Chat Completions",
            Mode::Responses => "Responses API",
        }
    }

    /// Whether the conversation history is held locally.
    pub const fn has_local_transcript(self) -> bool {
        !matches!(self, Mode::Assistants)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Mode::all()
            .into_iter()
            .find(|mode| mode.id() == wanted)
            .ok_or_else(|| {
                anyhow::anyhow!("Unknown mode '{s}'. Expected one of: assistants, chat, responses")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_round_trips_ids() {
        for mode in Mode::all() {
            assert_eq!(mode.id().parse::<Mode>().unwrap(), mode);
        }
        assert_eq!(" Chat ".parse::<Mode>().unwrap(), Mode::Chat);
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        let err = "completions".parse::<Mode>().unwrap_err();
        assert!(err.to_string().contains("completions"));
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&Mode::Responses).unwrap(),
            "\"responses\""
        );
        let mode: Mode = serde_json::from_str("\"assistants\"").unwrap();
        assert_eq!(mode, Mode::Assistants);
    }

    #[test]
    fn test_only_assistants_is_remote() {
        assert!(!Mode::Assistants.has_local_transcript());
        assert!(Mode::Chat.has_local_transcript());
        assert!(Mode::Responses.has_local_transcript());
    }
}
