//! Non-interactive five-question run, used to eyeball a mode end to end.

use std::io::Write;

use anyhow::{Context, Result};

use super::session::Session;
use super::turn::TurnExecutor;

/// Questions asked, in order, on a single session.
pub const QUESTIONS: [&str; 5] = [
    "how many books there have been written through human history",
    "can't you just count them yourself?",
    "how many have you read yourself?",
    "which book do you like the most?",
    "which one would you recommend I read?",
];

/// Asks each question in turn and writes the dialogue to `out`.
///
/// The first failed turn aborts the run.
pub async fn run_harness<W: Write>(
    executor: &TurnExecutor<'_>,
    session: &mut Session,
    questions: &[&str],
    out: &mut W,
) -> Result<()> {
    for (index, question) in questions.iter().enumerate() {
        let reply = executor
            .execute(session, question)
            .await
            .with_context(|| format!("Question {} failed", index + 1))?;
        let answer = reply
            .into_text()
            .await
            .with_context(|| format!("Question {} failed", index + 1))?;
        writeln!(out, "You: {question}")?;
        writeln!(out, "Assistant: {answer}")?;
        writeln!(out)?;
        out.flush()?;
    }
    Ok(())
}
