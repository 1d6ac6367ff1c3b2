//! CLI entry and dispatch.

use agentkit_core::config::Config;
use agentkit_core::core::mode::Mode;
use agentkit_core::core::session::SessionSpec;
use agentkit_core::logging;
use anyhow::{Context, Result};
use clap::Parser;

mod commands;

#[derive(Parser)]
#[command(name = "agentkit")]
#[command(version)]
#[command(about = "Terminal REPL for the OpenAI Assistants, Chat Completions and Responses APIs")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    session: SessionArgs,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum ModeArg {
    /// Assistants/Threads/Runs (history kept server-side)
    Assistants,
    /// Chat Completions (history kept locally)
    Chat,
    /// Responses API (history kept locally)
    Responses,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Assistants => Mode::Assistants,
            ModeArg::Chat => Mode::Chat,
            ModeArg::Responses => Mode::Responses,
        }
    }
}

/// Session arguments shared by the REPL and the harness.
#[derive(clap::Args, Debug, Clone, Default)]
struct SessionArgs {
    /// Interaction mode (default from config)
    #[arg(long, value_enum, global = true)]
    mode: Option<ModeArg>,

    /// Override the model from config
    #[arg(long, global = true)]
    model: Option<String>,

    /// Override the system prompt (assistant instructions in assistants mode).
    /// An empty value disables it.
    #[arg(long, value_name = "TEXT", global = true)]
    system: Option<String>,

    /// Reuse an existing assistant instead of creating one
    #[arg(long, value_name = "ID", global = true)]
    assistant_id: Option<String>,

    /// Stream replies as they are generated (chat and responses modes)
    #[arg(long, global = true)]
    stream: bool,

    /// Do not print the mode banner
    #[arg(long = "no-banner", global = true)]
    no_banner: bool,
}

impl SessionArgs {
    fn mode(&self, config: &Config) -> Mode {
        self.mode.map_or(config.mode, Mode::from)
    }

    fn session_spec(&self, config: &Config) -> SessionSpec {
        let mode = self.mode(config);
        let system_prompt = match self.system.as_deref() {
            Some(text) => Some(text.trim())
                .filter(|t| !t.is_empty())
                .map(ToString::to_string),
            None => config.system_prompt_for(mode),
        };
        // A blank flag asks for a fresh assistant, like a blank `--system`.
        let assistant_id = match self.assistant_id.as_deref() {
            Some(id) => Some(id.trim()).filter(|id| !id.is_empty()),
            None => config.effective_assistant_id().map(str::trim),
        }
        .map(ToString::to_string);

        SessionSpec {
            mode,
            model: self.model.clone().unwrap_or_else(|| config.model.clone()),
            system_prompt,
            assistant_id,
            assistant_name: config.assistants.name.clone(),
        }
    }

    fn stream(&self, config: &Config) -> bool {
        self.stream || config.stream
    }

    fn show_banner(&self, config: &Config) -> bool {
        !self.no_banner && config.show_banner
    }
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Ask five fixed questions and print the dialogue
    Harness,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Config commands must work even when the existing file is broken.
    if let Some(Commands::Config { command }) = &cli.command {
        return match command {
            ConfigCommands::Path => commands::config::path(),
            ConfigCommands::Init => commands::config::init(),
        };
    }

    let config = Config::load().context("load config")?;
    let _log_guard = logging::init(&config.logging).context("init logging")?;

    // A single thread of control: one prompt, one request, one reply.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("create tokio runtime")?;
    rt.block_on(dispatch(cli, config))
}

async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    let Cli { command, session } = cli;

    let Some(command) = command else {
        return commands::chat::run(&config, &session).await;
    };

    match command {
        Commands::Harness => commands::harness::run(&config, &session).await,
        Commands::Config { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("agentkit").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_override_config() {
        let config = Config::default();
        let cli = parse(&[
            "--mode",
            "chat",
            "--model",
            "gpt-4.1",
            "--system",
            "  Be brief.  ",
            "--stream",
            "--no-banner",
        ]);
        let spec = cli.session.session_spec(&config);
        assert_eq!(spec.mode, Mode::Chat);
        assert_eq!(spec.model, "gpt-4.1");
        assert_eq!(spec.system_prompt.as_deref(), Some("Be brief."));
        assert!(cli.session.stream(&config));
        assert!(!cli.session.show_banner(&config));
    }

    #[test]
    fn test_defaults_come_from_config() {
        let mut config = Config::default();
        config.mode = Mode::Responses;
        config.assistants.assistant_id = Some("asst_cfg".to_string());
        let cli = parse(&[]);
        let spec = cli.session.session_spec(&config);
        assert_eq!(spec.mode, Mode::Responses);
        assert_eq!(spec.model, "gpt-4o-mini");
        assert_eq!(spec.assistant_id.as_deref(), Some("asst_cfg"));
        assert_eq!(spec.system_prompt, config.system_prompt_for(Mode::Responses));
        assert!(!cli.session.stream(&config));
        assert!(cli.session.show_banner(&config));
    }

    #[test]
    fn test_empty_system_flag_disables_prompt() {
        let config = Config::default();
        let cli = parse(&["--mode", "chat", "--system", ""]);
        assert_eq!(cli.session.session_spec(&config).system_prompt, None);
    }

    #[test]
    fn test_blank_assistant_id_flag_creates_assistant() {
        let mut config = Config::default();
        config.assistants.assistant_id = Some("asst_cfg".to_string());
        for blank in ["", "   "] {
            let cli = parse(&["--mode", "assistants", "--assistant-id", blank]);
            assert_eq!(cli.session.session_spec(&config).assistant_id, None);
        }

        let cli = parse(&["--assistant-id", " asst_flag "]);
        assert_eq!(
            cli.session.session_spec(&config).assistant_id.as_deref(),
            Some("asst_flag")
        );
    }

    #[test]
    fn test_session_flags_accepted_after_harness() {
        let cli = parse(&["harness", "--mode", "responses", "--model", "gpt-4o"]);
        assert!(matches!(cli.command, Some(Commands::Harness)));
        assert!(matches!(cli.session.mode, Some(ModeArg::Responses)));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let result = Cli::try_parse_from(["agentkit", "--mode", "completions"]);
        assert!(result.is_err());
    }
}
