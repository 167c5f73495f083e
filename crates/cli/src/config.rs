// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::prefs::default_prefs_path;

/// Log output encoding.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("invalid log format: {other}"),
        }
    }
}

/// Explore OAuth2-protected REST APIs from the command line.
#[derive(Debug, Parser)]
#[command(name = "api", version, about)]
pub struct Config {
    /// Preferences file. Defaults to ~/.api-buddy.yml.
    #[arg(long, env = "API_BUDDY_PREFS", global = true)]
    pub prefs: Option<PathBuf>,

    /// Log filter (error, warn, info, debug, trace, or an EnvFilter directive).
    #[arg(long, env = "API_BUDDY_LOG_LEVEL", default_value = "warn", global = true)]
    pub log_level: String,

    /// Log format (text or json).
    #[arg(long, env = "API_BUDDY_LOG_FORMAT", default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Never highlight output, even on a terminal.
    #[arg(long, global = true)]
    pub plain: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Point the preferences at a different API.
    Use {
        /// Base URL, e.g. https://api.example.com/v1/
        api_url: String,
    },
    /// <method> <endpoint> [key=value ...] [json body]
    #[command(external_subcommand)]
    Request(Vec<String>),
}

impl Config {
    pub fn prefs_path(&self) -> PathBuf {
        self.prefs.clone().unwrap_or_else(default_prefs_path)
    }

    /// Highlight only when a person is looking at stdout.
    pub fn color(&self) -> bool {
        !self.plain && std::io::stdout().is_terminal()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
