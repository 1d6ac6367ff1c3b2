//! Interactive REPL command handler.

use agentkit_core::config::Config;
use agentkit_core::core::session::build_session;
use agentkit_core::core::turn::TurnExecutor;
use agentkit_core::providers::openai::{OpenAIClient, OpenAIConfig};
use anyhow::{Context, Result};

use crate::cli::SessionArgs;
use crate::modes::repl::{self, ReplOptions};

pub async fn run(config: &Config, args: &SessionArgs) -> Result<()> {
    let spec = args.session_spec(config);
    let client = OpenAIClient::new(OpenAIConfig::from_env(config.effective_base_url())?);
    let mut session = build_session(&client, &spec)
        .await
        .with_context(|| format!("start {} session", spec.mode))?;
    tracing::info!(mode = %spec.mode, model = %spec.model, "Session ready");

    let executor = TurnExecutor::new(&client, args.stream(config), config.poll_policy());
    let options = ReplOptions {
        banner: args
            .show_banner(config)
            .then(|| config.banner_for(spec.mode)),
        prompt: config.prompt.clone(),
    };

    let stdin = std::io::stdin().lock();
    let mut stdout = std::io::stdout().lock();
    repl::run_repl(stdin, &mut stdout, &executor, &mut session, &options).await
}
