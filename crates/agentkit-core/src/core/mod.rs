//! Core module: conversation state and turn execution, independent of the
//! terminal.
//!
//! This module contains:
//! - `mode`: The request envelope selected at startup
//! - `transcript`: Locally owned, append-only message history
//! - `session`: Session Builder (one handle per mode)
//! - `turn`: Turn Executor (one utterance in, one reply out)
//! - `harness`: Fixed question set for non-interactive runs

pub mod harness;
pub mod mode;
pub mod session;
pub mod transcript;
pub mod turn;
