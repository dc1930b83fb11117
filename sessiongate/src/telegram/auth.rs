//! User-account login through `layer-client`.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use layer_client::{
    BinaryFileBackend, Client, Config, InvocationError, LoginToken, PasswordToken, ShutdownToken,
    SignInError,
};
use tokio::sync::Mutex;

use crate::{AuthClient, AuthConnector, AuthError, ChatId, PasswordHint, Retry, SignIn};

/// Map a client error to [`AuthError`], recognising `AUTH_RESTART`.
pub(crate) fn classify(err: InvocationError) -> AuthError {
    match err {
        InvocationError::Io(e) => AuthError::Io(e),
        e if e.is("AUTH_RESTART") => AuthError::RestartRequired,
        e => AuthError::Rpc(e.to_string()),
    }
}

fn fatal_or_restart<P>(err: InvocationError) -> SignIn<P> {
    match classify(err) {
        AuthError::RestartRequired => SignIn::Retry(Retry::RestartRequired),
        e => SignIn::Fatal(e),
    }
}

impl PasswordHint for PasswordToken {
    fn hint(&self) -> Option<&str> {
        PasswordToken::hint(self)
    }
}

// ─── LayerConnector ───────────────────────────────────────────────────────────

/// Opens one [`LayerAuthClient`] per chat.
pub struct LayerConnector {
    api_id:       i32,
    api_hash:     String,
    sessions_dir: PathBuf,
}

impl LayerConnector {
    pub fn new(api_id: i32, api_hash: impl Into<String>, sessions_dir: impl Into<PathBuf>) -> Self {
        Self { api_id, api_hash: api_hash.into(), sessions_dir: sessions_dir.into() }
    }
}

#[async_trait]
impl AuthConnector for LayerConnector {
    type Client = LayerAuthClient;

    fn artifact_path(&self, chat: ChatId) -> PathBuf {
        self.sessions_dir.join(format!("{chat}.session"))
    }

    async fn connect(&self, chat: ChatId) -> Result<LayerAuthClient, AuthError> {
        let path = self.artifact_path(chat);
        log::info!("[sessiongate] chat {chat}: connecting client ({})", path.display());
        let (client, shutdown) = Client::connect(Config {
            api_id:          self.api_id,
            api_hash:        self.api_hash.clone(),
            session_backend: Arc::new(BinaryFileBackend::new(path)),
            ..Default::default()
        }).await.map_err(classify)?;
        Ok(LayerAuthClient { chat, client: Mutex::new(Some(client)), shutdown })
    }
}

// ─── LayerAuthClient ──────────────────────────────────────────────────────────

/// A connected user-account client. Disconnecting cancels its reader task
/// and drops the handle; later calls report [`AuthError::Disconnected`].
pub struct LayerAuthClient {
    chat:     ChatId,
    client:   Mutex<Option<Client>>,
    shutdown: ShutdownToken,
}

impl LayerAuthClient {
    /// `Client` is a cheap `Arc` clone; the lock is not held across RPCs.
    async fn client(&self) -> Result<Client, AuthError> {
        self.client.lock().await.clone().ok_or(AuthError::Disconnected)
    }
}

#[async_trait]
impl AuthClient for LayerAuthClient {
    type LoginToken    = LoginToken;
    type PasswordToken = PasswordToken;

    async fn request_code(&self, phone: &str) -> Result<LoginToken, AuthError> {
        self.client().await?.request_login_code(phone).await.map_err(classify)
    }

    async fn sign_in(&self, token: &LoginToken, code: &str) -> SignIn<PasswordToken> {
        let client = match self.client().await {
            Ok(c)  => c,
            Err(e) => return SignIn::Fatal(e),
        };
        match client.sign_in(token, code).await {
            Ok(name) => SignIn::Success(name),
            Err(SignInError::InvalidCode)         => SignIn::Retry(Retry::InvalidCode),
            Err(SignInError::PasswordRequired(t)) => SignIn::PasswordNeeded(*t),
            Err(SignInError::SignUpRequired)      => SignIn::Fatal(AuthError::SignUpRequired),
            Err(SignInError::Other(e))            => fatal_or_restart(e),
        }
    }

    async fn check_password(&self, token: PasswordToken, password: &str) -> SignIn<PasswordToken> {
        let client = match self.client().await {
            Ok(c)  => c,
            Err(e) => return SignIn::Fatal(e),
        };
        match client.check_password(token, password).await {
            Ok(name) => SignIn::Success(name),
            Err(e)   => fatal_or_restart(e),
        }
    }

    async fn persist(&self) -> Result<(), AuthError> {
        self.client().await?.save_session().await.map_err(classify)
    }

    async fn disconnect(&self) -> Result<(), AuthError> {
        match self.client.lock().await.take() {
            Some(client) => {
                client.disconnect();
                self.shutdown.cancel();
                log::debug!("[sessiongate] chat {}: client shut down", self.chat);
                Ok(())
            }
            None => Err(AuthError::Disconnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layer_client::RpcError;

    fn rpc(code: i32, name: &str) -> InvocationError {
        InvocationError::Rpc(RpcError::from_telegram(code, name))
    }

    #[test]
    fn auth_restart_is_recognised() {
        assert!(matches!(classify(rpc(500, "AUTH_RESTART")), AuthError::RestartRequired));
        assert!(matches!(
            fatal_or_restart::<()>(rpc(500, "AUTH_RESTART")),
            SignIn::Retry(Retry::RestartRequired)
        ));
    }

    #[test]
    fn other_rpc_errors_are_fatal() {
        match fatal_or_restart::<()>(rpc(400, "PHONE_NUMBER_BANNED")) {
            SignIn::Fatal(AuthError::Rpc(msg)) => assert!(msg.contains("PHONE_NUMBER_BANNED")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn io_errors_keep_their_kind() {
        let err = InvocationError::Io(std::io::Error::new(std::io::ErrorKind::TimedOut, "slow"));
        match classify(err) {
            AuthError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::TimedOut),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn artifact_is_named_by_chat() {
        let c = LayerConnector::new(1, "hash", "sessions");
        assert_eq!(c.artifact_path(42), PathBuf::from("sessions").join("42.session"));
    }
}
