//! Runtime configuration: command-line flags with environment fallbacks.
//!
//! The binary loads `.env` (via `dotenvy`) before parsing, so every flag can
//! also live there.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::ConfigError;

/// Telegram bot that signs you in and sends back your .session file.
#[derive(Clone, Debug, Parser)]
#[command(name = "sessiongate-bot", version, about, long_about = None)]
pub struct Config {
    /// Telegram API id (https://my.telegram.org).
    #[arg(long, env = "API_ID")]
    pub api_id: i32,

    /// Telegram API hash.
    #[arg(long, env = "API_HASH", hide_env_values = true)]
    pub api_hash: String,

    /// Bot token from @BotFather.
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    pub bot_token: String,

    /// Directory holding one `<chat_id>.session` file per login.
    #[arg(long, env = "SESSIONS_DIR", default_value = "sessions")]
    pub sessions_dir: PathBuf,

    /// Session file of the bot's own connection.
    #[arg(long, env = "BOT_SESSION", default_value = "bot.session")]
    pub bot_session: PathBuf,

    /// Upper bound for a single auth operation, in seconds.
    #[arg(long, env = "AUTH_TIMEOUT_SECS", default_value_t = 120)]
    pub auth_timeout_secs: u64,

    /// Auth operations allowed to run at the same time.
    #[arg(long, env = "AUTH_WORKERS", default_value_t = 4)]
    pub auth_workers: usize,

    /// Unfinished logins older than this are dropped, in seconds. 0 keeps them.
    #[arg(long, env = "SESSION_TTL_SECS", default_value_t = 900)]
    pub session_ttl_secs: u64,

    /// Delete each session file once it has been sent.
    #[arg(long, env = "PURGE_AFTER_DELIVERY")]
    pub purge_after_delivery: bool,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_id == 0 {
            return Err(ConfigError::MissingApiId);
        }
        if self.api_hash.trim().is_empty() {
            return Err(ConfigError::MissingApiHash);
        }
        if self.bot_token.trim().is_empty() {
            return Err(ConfigError::MissingBotToken);
        }
        if self.auth_workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.auth_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }

    /// `None` when expiry is switched off.
    pub fn session_ttl(&self) -> Option<Duration> {
        (self.session_ttl_secs > 0).then(|| Duration::from_secs(self.session_ttl_secs))
    }
}
