//! Path resolution for agentkit configuration and log files.
//!
//! `AGENTKIT_HOME` resolution order:
//! 1. `AGENTKIT_HOME` environment variable (if set)
//! 2. ~/.config/agentkit (default)

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Returns the agentkit home directory.
pub fn agentkit_home() -> Result<PathBuf> {
    if let Ok(home) = std::env::var("AGENTKIT_HOME")
        && !home.trim().is_empty()
    {
        return Ok(PathBuf::from(home));
    }

    dirs::home_dir()
        .map(|h| h.join(".config").join("agentkit"))
        .context("Could not determine home directory; set AGENTKIT_HOME")
}

/// Returns the path to the config.toml file.
pub fn config_path() -> Result<PathBuf> {
    Ok(agentkit_home()?.join("config.toml"))
}
