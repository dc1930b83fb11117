//! # sessiongate
//!
//! A Telegram bot flow that signs a user into their own account and hands the
//! resulting `.session` file back to them.
//!
//! ## Flow
//! `/start` → terms warning → share phone contact → enter the login code on an
//! inline keypad → (two-factor password) → the session file is uploaded as a
//! document and the login state is dropped.
//!
//! ## Layout
//! | Module         | Role                                                     |
//! |----------------|----------------------------------------------------------|
//! | [`store`]      | Per-chat session registry, one async lock per chat       |
//! | [`controller`] | Dialogue controller: one handler per inbound [`Event`]    |
//! | [`bridge`]     | Bounded worker pool for auth calls, cancellable handles  |
//! | [`auth`]       | Auth client seam and the tagged [`SignIn`] outcome        |
//! | [`bot`]        | Bot platform seam, keyboards, inbound events              |
//! | [`telegram`]   | `layer-client` implementations of both seams             |
//!
//! All MTProto work (code delivery, sign-in, SRP, session serialization) is
//! done by `layer-client`; this crate only sequences it.

#![deny(unsafe_code)]

pub mod auth;
pub mod bot;
pub mod bridge;
pub mod code;
pub mod config;
pub mod controller;
mod error;
pub mod store;
pub mod telegram;
pub mod texts;

pub use auth::{AuthClient, AuthConnector, PasswordHint, Retry, SignIn};
pub use bot::{Action, BotApi, Button, Event, Keyboard};
pub use bridge::{AuthBridge, AuthTask};
pub use code::{CODE_LENGTH, CodeBuffer, CodeProgress};
pub use config::Config;
pub use controller::Controller;
pub use error::{AuthError, BotError, BridgeError, ConfigError, Error, Result};
pub use store::{ChatSession, SessionHandle, SessionStore, Stage};

/// Telegram chat identifier. In private bot chats this is the user id.
pub type ChatId = i64;
