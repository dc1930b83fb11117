//! Chat session registry.
//!
//! The map is guarded by one mutex that is only held for lookups and inserts;
//! each session has its own async mutex, held by a handler for the whole time
//! it works on that chat. Two events for the same chat therefore run one after
//! the other, and the second one re-checks [`ChatSession::stage`] before acting.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{AuthClient, ChatId, CodeBuffer};

/// Where a chat is in the login flow once a session exists.
///
/// The greeting and terms screens come before any session and are not stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Connected, waiting for a (new) contact or for the code request.
    AwaitingPhone,
    AwaitingCode,
    AwaitingPassword,
    /// Delivered, failed or cancelled. Nothing else may happen to this session.
    Completed,
}

// ─── ChatSession ──────────────────────────────────────────────────────────────

/// Authentication state of one chat.
pub struct ChatSession<C: AuthClient> {
    pub chat_id:        ChatId,
    pub phone:          String,
    pub code:           CodeBuffer,
    /// Phone code hash from the code request.
    pub login_token:    Option<Arc<C::LoginToken>>,
    /// 2FA challenge, present only in [`Stage::AwaitingPassword`].
    pub password_token: Option<C::PasswordToken>,
    pub password:       Option<String>,
    pub client:         Arc<C>,
    pub stage:          Stage,
    pub started_at:     DateTime<Utc>,
}

impl<C: AuthClient> ChatSession<C> {
    pub fn new(chat_id: ChatId, phone: impl Into<String>, client: Arc<C>) -> Self {
        Self {
            chat_id,
            phone:          phone.into(),
            code:           CodeBuffer::new(),
            login_token:    None,
            password_token: None,
            password:       None,
            client,
            stage:          Stage::AwaitingPhone,
            started_at:     Utc::now(),
        }
    }

    /// Seconds since the contact was received.
    pub fn elapsed_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

impl<C: AuthClient> std::fmt::Debug for ChatSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("chat_id", &self.chat_id)
            .field("stage", &self.stage)
            .field("code_len", &self.code.len())
            .field("has_password", &self.password.is_some())
            .finish_non_exhaustive()
    }
}

/// Shared, lockable handle to one session.
pub type SessionHandle<C> = Arc<Mutex<ChatSession<C>>>;

// ─── SessionStore ─────────────────────────────────────────────────────────────

/// Registry of live sessions; at most one per chat.
pub struct SessionStore<C: AuthClient> {
    sessions: Mutex<HashMap<ChatId, SessionHandle<C>>>,
}

impl<C: AuthClient> Default for SessionStore<C> {
    fn default() -> Self {
        Self { sessions: Mutex::new(HashMap::new()) }
    }
}

impl<C: AuthClient> SessionStore<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` for `chat`, returning the session it replaced.
    pub async fn insert(&self, chat: ChatId, handle: SessionHandle<C>) -> Option<SessionHandle<C>> {
        self.sessions.lock().await.insert(chat, handle)
    }

    pub async fn get(&self, chat: ChatId) -> Option<SessionHandle<C>> {
        self.sessions.lock().await.get(&chat).cloned()
    }

    pub async fn remove(&self, chat: ChatId) -> Option<SessionHandle<C>> {
        self.sessions.lock().await.remove(&chat)
    }

    /// Remove `chat` only if it still maps to `handle`; a newer session
    /// registered for the same chat is left alone.
    pub async fn remove_if_same(&self, chat: ChatId, handle: &SessionHandle<C>) -> bool {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(&chat) {
            Some(current) if Arc::ptr_eq(current, handle) => {
                sessions.remove(&chat);
                true
            }
            _ => false,
        }
    }

    /// Every registered session at this moment. The map lock is released
    /// before the caller touches any session.
    pub async fn snapshot(&self) -> Vec<(ChatId, SessionHandle<C>)> {
        self.sessions.lock().await.iter().map(|(c, h)| (*c, h.clone())).collect()
    }

    pub async fn contains(&self, chat: ChatId) -> bool {
        self.sessions.lock().await.contains_key(&chat)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AuthError, PasswordHint, SignIn};
    use async_trait::async_trait;

    struct NullClient;
    struct NoHint;

    impl PasswordHint for NoHint {
        fn hint(&self) -> Option<&str> { None }
    }

    #[async_trait]
    impl AuthClient for NullClient {
        type LoginToken = ();
        type PasswordToken = NoHint;

        async fn request_code(&self, _: &str) -> Result<(), AuthError> { Ok(()) }
        async fn sign_in(&self, _: &(), _: &str) -> SignIn<NoHint> { SignIn::Success(String::new()) }
        async fn check_password(&self, _: NoHint, _: &str) -> SignIn<NoHint> { SignIn::Success(String::new()) }
        async fn persist(&self) -> Result<(), AuthError> { Ok(()) }
        async fn disconnect(&self) -> Result<(), AuthError> { Ok(()) }
    }

    fn handle(chat: ChatId) -> SessionHandle<NullClient> {
        Arc::new(Mutex::new(ChatSession::new(chat, "15550001", Arc::new(NullClient))))
    }

    #[tokio::test]
    async fn one_session_per_chat() {
        let store = SessionStore::new();
        assert!(store.insert(1, handle(1)).await.is_none());
        assert!(store.insert(1, handle(1)).await.is_some());
        store.insert(2, handle(2)).await;
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn remove_if_same_keeps_newer_session() {
        let store = SessionStore::new();
        let old = handle(7);
        let new = handle(7);
        store.insert(7, old.clone()).await;
        store.insert(7, new.clone()).await;

        assert!(!store.remove_if_same(7, &old).await);
        assert!(store.contains(7).await);
        assert!(store.remove_if_same(7, &new).await);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn new_session_starts_before_code_request() {
        let h = handle(3);
        let s = h.lock().await;
        assert_eq!(s.stage, Stage::AwaitingPhone);
        assert!(s.code.is_empty());
        assert!(s.login_token.is_none());
    }

    #[tokio::test]
    async fn snapshot_lists_every_chat() {
        let store = SessionStore::new();
        store.insert(1, handle(1)).await;
        store.insert(2, handle(2)).await;

        let mut chats: Vec<_> = store.snapshot().await.into_iter().map(|(c, _)| c).collect();
        chats.sort();
        assert_eq!(chats, vec![1, 2]);
    }
}
