//! Account-side auth client seam.
//!
//! Expected outcomes of a sign-in attempt come back as a [`SignIn`] value the
//! controller switches on, not as errors.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::{AuthError, ChatId};

/// Why a sign-in attempt has to be repeated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Retry {
    /// The code was wrong or expired; ask for it again.
    InvalidCode,
    /// Telegram wants the authorization started over from the phone number.
    RestartRequired,
}

/// Outcome of [`AuthClient::sign_in`] and [`AuthClient::check_password`].
#[derive(Debug)]
pub enum SignIn<P> {
    /// Signed in; holds the account's display name.
    Success(String),
    Retry(Retry),
    /// Two-step verification is enabled; the token must go to `check_password`.
    PasswordNeeded(P),
    Fatal(AuthError),
}

/// Access to the account's password hint carried by a 2FA challenge.
pub trait PasswordHint {
    fn hint(&self) -> Option<&str>;
}

/// One connected account-side client, owned by one chat session.
#[async_trait]
pub trait AuthClient: Send + Sync + 'static {
    /// Opaque phone code hash returned by [`AuthClient::request_code`].
    type LoginToken: Send + Sync + 'static;
    /// Opaque 2FA challenge returned in [`SignIn::PasswordNeeded`].
    type PasswordToken: PasswordHint + Send + Sync + 'static;

    async fn request_code(&self, phone: &str) -> Result<Self::LoginToken, AuthError>;

    async fn sign_in(&self, token: &Self::LoginToken, code: &str) -> SignIn<Self::PasswordToken>;

    async fn check_password(&self, token: Self::PasswordToken, password: &str) -> SignIn<Self::PasswordToken>;

    /// Write the authorized session to its artifact file.
    async fn persist(&self) -> Result<(), AuthError>;

    /// Close the connection. Later calls fail with [`AuthError::Disconnected`].
    async fn disconnect(&self) -> Result<(), AuthError>;
}

/// Creates one [`AuthClient`] per chat, each bound to its own artifact file.
#[async_trait]
pub trait AuthConnector: Send + Sync + 'static {
    type Client: AuthClient;

    /// Where the session artifact for `chat` lives.
    fn artifact_path(&self, chat: ChatId) -> PathBuf;

    async fn connect(&self, chat: ChatId) -> Result<Self::Client, AuthError>;
}
