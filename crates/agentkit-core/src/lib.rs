//! Core library for the agentkit REPL.
//!
//! Configuration, logging, the OpenAI provider clients for the three request
//! envelopes, and the session/turn model that drives a conversation.

pub mod config;
pub mod core;
pub mod logging;
pub mod paths;
pub mod providers;
