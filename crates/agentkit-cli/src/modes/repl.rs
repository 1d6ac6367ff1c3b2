//! Line-oriented REPL.
//!
//! Reads one line per turn from `input` and writes replies to `output`.
//! Generic over the streams so the loop can be driven in-process by tests.

use std::io::{BufRead, Write};

use agentkit_core::core::session::Session;
use agentkit_core::core::turn::{Reply, TurnExecutor};
use anyhow::{Context, Result};

const EXIT_COMMANDS: [&str; 3] = ["exit", "quit", ":q"];
const ASSISTANT_PREFIX: &str = "Assistant: ";

pub struct ReplOptions {
    /// Printed once before the first prompt
    pub banner: Option<String>,
    pub prompt: String,
}

/// Returns true for `exit`, `quit` or `:q`, ignoring case and surrounding whitespace.
pub fn is_exit_command(line: &str) -> bool {
    let trimmed = line.trim();
    EXIT_COMMANDS
        .iter()
        .any(|cmd| trimmed.eq_ignore_ascii_case(cmd))
}

/// Runs the loop until an exit command or end of input.
///
/// A failed turn is reported as `Error: ...` and the loop carries on.
pub async fn run_repl<R, W>(
    input: R,
    output: &mut W,
    executor: &TurnExecutor<'_>,
    session: &mut Session,
    options: &ReplOptions,
) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    if let Some(banner) = options.banner.as_deref() {
        writeln!(output, "{banner}")?;
    }

    let mut lines = input.lines();
    loop {
        write!(output, "{}", options.prompt)?;
        output.flush()?;

        let Some(line) = lines.next() else {
            // EOF: end the prompt line so the shell starts clean.
            writeln!(output)?;
            break;
        };
        let line = line.context("read input")?;
        let utterance = line.trim();

        if utterance.is_empty() {
            continue;
        }
        if is_exit_command(utterance) {
            writeln!(output, "Goodbye!")?;
            break;
        }

        match executor.execute(session, utterance).await {
            Ok(reply) => print_reply(output, reply).await?,
            Err(e) => {
                tracing::debug!("Turn failed: {e:?}");
                writeln!(output, "Error: {e:#}")?;
            }
        }
    }

    Ok(())
}

async fn print_reply<W: Write>(output: &mut W, reply: Reply<'_>) -> Result<()> {
    match reply {
        Reply::Complete(text) => {
            writeln!(output, "{ASSISTANT_PREFIX}{text}")?;
        }
        Reply::Streaming(mut stream) => {
            write!(output, "{ASSISTANT_PREFIX}")?;
            output.flush()?;
            while let Some(fragment) = stream.next_fragment().await {
                match fragment {
                    Ok(text) => {
                        write!(output, "{text}")?;
                        output.flush()?;
                    }
                    Err(e) => {
                        writeln!(output)?;
                        writeln!(output, "Error: {e}")?;
                        return Ok(());
                    }
                }
            }
            writeln!(output)?;
        }
    }
    output.flush()?;
    Ok(())
}
