//! Error types for sessiongate.

use std::{io, time::Duration};

use thiserror::Error;

// ─── AuthError ────────────────────────────────────────────────────────────────

/// Failure reported by the account-side auth client.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Telegram asked for the whole authorization to be started over (`AUTH_RESTART`).
    #[error("authorization must be restarted")]
    RestartRequired,
    /// The number has no account; it must be registered in an official app first.
    #[error("this number is not registered, sign up in an official Telegram app first")]
    SignUpRequired,
    /// Any other RPC or protocol failure, already rendered by the client library.
    #[error("{0}")]
    Rpc(String),
    /// Reading or writing the session file failed.
    #[error("session file: {0}")]
    Io(#[from] io::Error),
    /// The client was used after [`crate::AuthClient::disconnect`].
    #[error("client is disconnected")]
    Disconnected,
}

// ─── BridgeError ──────────────────────────────────────────────────────────────

/// Failure of the bridge itself, independent of what the operation returned.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("{op} timed out after {}s", .after.as_secs())]
    Timeout { op: &'static str, after: Duration },
    #[error("{op} was cancelled")]
    Cancelled { op: &'static str },
    #[error("{op} panicked")]
    Panicked { op: &'static str },
}

// ─── BotError ─────────────────────────────────────────────────────────────────

/// Failure talking to the bot platform.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("bot request failed: {0}")]
    Request(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

// ─── ConfigError ──────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API_ID must be set to a non-zero value (https://my.telegram.org)")]
    MissingApiId,
    #[error("API_HASH must not be empty")]
    MissingApiHash,
    #[error("BOT_TOKEN must not be empty")]
    MissingBotToken,
    #[error("auth workers must be at least 1")]
    NoWorkers,
    #[error("auth timeout must be at least 1 second")]
    ZeroTimeout,
}

// ─── Error ────────────────────────────────────────────────────────────────────

/// Top-level error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error(transparent)]
    Bot(#[from] BotError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
