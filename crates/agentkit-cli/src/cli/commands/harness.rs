//! Five-question harness command handler.

use agentkit_core::config::Config;
use agentkit_core::core::harness::{QUESTIONS, run_harness};
use agentkit_core::core::session::build_session;
use agentkit_core::core::turn::TurnExecutor;
use agentkit_core::providers::openai::{OpenAIClient, OpenAIConfig};
use anyhow::{Context, Result};

use crate::cli::SessionArgs;

pub async fn run(config: &Config, args: &SessionArgs) -> Result<()> {
    let spec = args.session_spec(config);
    let client = OpenAIClient::new(OpenAIConfig::from_env(config.effective_base_url())?);
    let mut session = build_session(&client, &spec)
        .await
        .with_context(|| format!("start {} session", spec.mode))?;

    let executor = TurnExecutor::new(&client, args.stream(config), config.poll_policy());
    let mut stdout = std::io::stdout().lock();
    run_harness(&executor, &mut session, &QUESTIONS, &mut stdout).await
}
