//! # Configuration
//!
//! Environment-driven settings for the bot process.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub discord_guild_id: Option<String>,
    pub database_path: String,
    pub log_level: String,
    pub reminder_interval: Duration,
    pub reminder_initial_delay: Duration,
    pub cleanup_interval: Duration,
    pub cleanup_initial_delay: Duration,
}

impl Config {
    /// Build the configuration from process environment variables
    ///
    /// `DISCORD_TOKEN` is required; everything else has a default.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let discord_token = lookup("DISCORD_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .context("DISCORD_TOKEN must be set")?;

        Ok(Config {
            discord_token,
            discord_guild_id: lookup("DISCORD_GUILD_ID").filter(|g| !g.trim().is_empty()),
            database_path: lookup("DATABASE_PATH")
                .unwrap_or_else(|| "appointments.db".to_string()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            reminder_interval: Duration::from_secs(parse_or(
                &lookup,
                "REMINDER_INTERVAL_SECS",
                60,
            )?),
            reminder_initial_delay: Duration::from_secs(parse_or(
                &lookup,
                "REMINDER_INITIAL_DELAY_SECS",
                10,
            )?),
            cleanup_interval: Duration::from_secs(parse_or(
                &lookup,
                "CLEANUP_INTERVAL_SECS",
                3600,
            )?),
            cleanup_initial_delay: Duration::from_secs(parse_or(
                &lookup,
                "CLEANUP_INITIAL_DELAY_SECS",
                60,
            )?),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}
