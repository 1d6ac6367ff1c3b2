//! Runtime execution modes.
//!
//! - `repl`: Line-oriented interactive loop over stdin/stdout

pub mod repl;
