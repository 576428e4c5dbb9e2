// Moderation thresholds and how they are loaded.
//
// Defaults match the platform's chat policy. Every value can be overridden
// through `MODERATION_*` environment variables (a `.env` file works too, the
// binary loads it with dotenv before calling `from_env`).

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

pub const ENV_SPAM_WINDOW_SECS: &str = "MODERATION_SPAM_WINDOW_SECS";
pub const ENV_MAX_MESSAGES_PER_WINDOW: &str = "MODERATION_MAX_MESSAGES_PER_WINDOW";
pub const ENV_MAX_MESSAGE_LENGTH: &str = "MODERATION_MAX_MESSAGE_LENGTH";
pub const ENV_REPEATED_CHAR_RUN: &str = "MODERATION_REPEATED_CHAR_RUN";
pub const ENV_UPPERCASE_RUN: &str = "MODERATION_UPPERCASE_RUN";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Tunable thresholds for the moderation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    /// Lookback interval of the per-user spam window, in seconds
    pub spam_window_secs: u64,
    /// Messages a user may send inside one window before being flagged
    pub max_messages_per_window: usize,
    /// Longest accepted message, in characters
    pub max_message_length: usize,
    /// Identical consecutive characters that mark a message as spam
    pub repeated_char_run: usize,
    /// Consecutive uppercase letters that mark a message as spam
    pub uppercase_run: usize,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            spam_window_secs: 60,        // 10 messages...
            max_messages_per_window: 10, // ...per rolling minute
            max_message_length: 500,
            repeated_char_run: 5,
            uppercase_run: 5,
        }
    }
}

impl ModerationConfig {
    /// Build a config from the process environment, falling back to defaults
    /// for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        read(&lookup, ENV_SPAM_WINDOW_SECS, &mut config.spam_window_secs)?;
        read(
            &lookup,
            ENV_MAX_MESSAGES_PER_WINDOW,
            &mut config.max_messages_per_window,
        )?;
        read(
            &lookup,
            ENV_MAX_MESSAGE_LENGTH,
            &mut config.max_message_length,
        )?;
        read(
            &lookup,
            ENV_REPEATED_CHAR_RUN,
            &mut config.repeated_char_run,
        )?;
        read(&lookup, ENV_UPPERCASE_RUN, &mut config.uppercase_run)?;

        config.validate()?;
        Ok(config)
    }

    /// Reject thresholds that would make every message spam.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spam_window_secs == 0 {
            return Err(ConfigError::Zero("spam_window_secs"));
        }
        if self.max_messages_per_window == 0 {
            return Err(ConfigError::Zero("max_messages_per_window"));
        }
        if self.max_message_length == 0 {
            return Err(ConfigError::Zero("max_message_length"));
        }
        if self.repeated_char_run == 0 {
            return Err(ConfigError::Zero("repeated_char_run"));
        }
        if self.uppercase_run == 0 {
            return Err(ConfigError::Zero("uppercase_run"));
        }
        Ok(())
    }

    /// The spam window as a chrono duration.
    pub fn spam_window(&self) -> Duration {
        // Duration::seconds panics beyond i64::MAX / 1000
        let secs = i64::try_from(self.spam_window_secs)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 1_000);
        Duration::seconds(secs)
    }
}

/// Overwrite `slot` with the parsed value of `key`. Unset or blank keys
/// leave it untouched.
fn read<F, T>(lookup: &F, key: &'static str, slot: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let raw = match lookup(key) {
        Some(raw) => raw,
        None => return Ok(()),
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(());
    }

    match trimmed.parse() {
        Ok(value) => {
            *slot = value;
            Ok(())
        }
        Err(_) => Err(ConfigError::InvalidValue { key, value: raw }),
    }
}
