//! In-memory fakes for the bot and auth seams.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sessiongate::{
    AuthClient, AuthConnector, AuthError, BotApi, BotError, ChatId, Keyboard, PasswordHint, Retry,
    SignIn,
};

// ─── FakeBot ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub enum Sent {
    Text     { chat: ChatId, text: String, keyboard: Option<Keyboard> },
    Edit     { chat: ChatId, message_id: i32, text: String, keyboard: Option<Keyboard> },
    Answer(i64),
    Document { chat: ChatId, name: String, bytes: Vec<u8>, caption: String },
}

#[derive(Default)]
pub struct FakeBot {
    sent: Mutex<Vec<Sent>>,
}

impl FakeBot {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    /// Texts of plain messages sent to `chat`, in order.
    pub fn texts(&self, chat: ChatId) -> Vec<String> {
        self.sent().into_iter().filter_map(|s| match s {
            Sent::Text { chat: c, text, .. } if c == chat => Some(text),
            _ => None,
        }).collect()
    }

    pub fn last_text(&self, chat: ChatId) -> Option<String> {
        self.texts(chat).pop()
    }

    pub fn documents(&self, chat: ChatId) -> Vec<Sent> {
        self.sent().into_iter()
            .filter(|s| matches!(s, Sent::Document { chat: c, .. } if *c == chat))
            .collect()
    }

    fn push(&self, s: Sent) {
        self.sent.lock().unwrap().push(s);
    }
}

#[async_trait]
impl BotApi for FakeBot {
    async fn send_text(&self, chat: ChatId, text: &str, keyboard: Option<Keyboard>) -> Result<(), BotError> {
        self.push(Sent::Text { chat, text: text.into(), keyboard });
        Ok(())
    }

    async fn edit_text(&self, chat: ChatId, message_id: i32, text: &str, keyboard: Option<Keyboard>) -> Result<(), BotError> {
        self.push(Sent::Edit { chat, message_id, text: text.into(), keyboard });
        Ok(())
    }

    async fn answer_callback(&self, query_id: i64) -> Result<(), BotError> {
        self.push(Sent::Answer(query_id));
        Ok(())
    }

    async fn send_document(&self, chat: ChatId, file_name: &str, bytes: Vec<u8>, caption: &str) -> Result<(), BotError> {
        self.push(Sent::Document { chat, name: file_name.into(), bytes, caption: caption.into() });
        Ok(())
    }
}

// ─── FakeConnector ────────────────────────────────────────────────────────────

/// What the fake Telegram account accepts and how it misbehaves.
#[derive(Clone, Debug)]
pub struct Script {
    pub code:                  &'static str,
    pub password:              Option<&'static str>,
    pub hint:                  Option<&'static str>,
    /// Code that makes sign-in fail with a non-recoverable RPC error.
    pub fatal_code:            Option<&'static str>,
    /// First code request of each client answers `AUTH_RESTART`.
    pub restart_first_request: bool,
    /// Every code request fails with a non-recoverable RPC error.
    pub fatal_request:         bool,
    /// Sign-in with the right code answers `AUTH_RESTART`.
    pub restart_on_sign_in:    bool,
    pub sign_in_delay:         Option<Duration>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            code:                  "12345",
            password:              None,
            hint:                  None,
            fatal_code:            None,
            restart_first_request: false,
            fatal_request:         false,
            restart_on_sign_in:    false,
            sign_in_delay:         None,
        }
    }
}

/// Observable state of one fake client.
#[derive(Default)]
pub struct Probe {
    pub disconnected:  AtomicBool,
    pub authorized:    AtomicBool,
    pub code_requests: AtomicUsize,
    pub sign_ins:      AtomicUsize,
}

impl Probe {
    pub fn is_disconnected(&self) -> bool { self.disconnected.load(Ordering::SeqCst) }
    pub fn sign_in_count(&self) -> usize { self.sign_ins.load(Ordering::SeqCst) }
}

pub struct FakeConnector {
    dir:    PathBuf,
    script: Script,
    probes: Mutex<Vec<(ChatId, Arc<Probe>)>>,
}

impl FakeConnector {
    pub fn new(dir: &Path, script: Script) -> Self {
        Self { dir: dir.to_path_buf(), script, probes: Mutex::new(Vec::new()) }
    }

    /// Probes of every client connected for `chat`, oldest first.
    pub fn probes(&self, chat: ChatId) -> Vec<Arc<Probe>> {
        self.probes.lock().unwrap().iter()
            .filter(|(c, _)| *c == chat)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn probe(&self, chat: ChatId) -> Arc<Probe> {
        self.probes(chat).pop().expect("no client connected for chat")
    }
}

#[async_trait]
impl AuthConnector for FakeConnector {
    type Client = FakeClient;

    fn artifact_path(&self, chat: ChatId) -> PathBuf {
        self.dir.join(format!("{chat}.session"))
    }

    async fn connect(&self, chat: ChatId) -> Result<FakeClient, AuthError> {
        let probe = Arc::new(Probe::default());
        self.probes.lock().unwrap().push((chat, probe.clone()));
        Ok(FakeClient {
            chat,
            path:   self.artifact_path(chat),
            script: self.script.clone(),
            probe,
        })
    }
}

// ─── FakeClient ───────────────────────────────────────────────────────────────

pub struct FakeLogin {
    pub phone: String,
}

pub struct FakePassword {
    hint: Option<String>,
}

impl PasswordHint for FakePassword {
    fn hint(&self) -> Option<&str> { self.hint.as_deref() }
}

pub struct FakeClient {
    chat:   ChatId,
    path:   PathBuf,
    script: Script,
    probe:  Arc<Probe>,
}

impl FakeClient {
    fn ensure_connected(&self) -> Result<(), AuthError> {
        if self.probe.is_disconnected() { Err(AuthError::Disconnected) } else { Ok(()) }
    }
}

#[async_trait]
impl AuthClient for FakeClient {
    type LoginToken    = FakeLogin;
    type PasswordToken = FakePassword;

    async fn request_code(&self, phone: &str) -> Result<FakeLogin, AuthError> {
        self.ensure_connected()?;
        let n = self.probe.code_requests.fetch_add(1, Ordering::SeqCst);
        if self.script.restart_first_request && n == 0 {
            return Err(AuthError::RestartRequired);
        }
        if self.script.fatal_request {
            return Err(AuthError::Rpc("RPC 400: PHONE_NUMBER_INVALID".into()));
        }
        Ok(FakeLogin { phone: phone.to_string() })
    }

    async fn sign_in(&self, _token: &FakeLogin, code: &str) -> SignIn<FakePassword> {
        self.probe.sign_ins.fetch_add(1, Ordering::SeqCst);
        if let Some(d) = self.script.sign_in_delay {
            tokio::time::sleep(d).await;
        }
        if let Err(e) = self.ensure_connected() {
            return SignIn::Fatal(e);
        }
        if Some(code) == self.script.fatal_code {
            return SignIn::Fatal(AuthError::Rpc("RPC 400: PHONE_NUMBER_BANNED".into()));
        }
        if code != self.script.code {
            return SignIn::Retry(Retry::InvalidCode);
        }
        if self.script.restart_on_sign_in {
            return SignIn::Retry(Retry::RestartRequired);
        }
        if self.script.password.is_some() {
            return SignIn::PasswordNeeded(FakePassword { hint: self.script.hint.map(str::to_string) });
        }
        self.probe.authorized.store(true, Ordering::SeqCst);
        SignIn::Success("Test User".into())
    }

    async fn check_password(&self, _token: FakePassword, password: &str) -> SignIn<FakePassword> {
        if Some(password) != self.script.password {
            return SignIn::Fatal(AuthError::Rpc("RPC 400: PASSWORD_HASH_INVALID".into()));
        }
        self.probe.authorized.store(true, Ordering::SeqCst);
        SignIn::Success("Test User".into())
    }

    async fn persist(&self) -> Result<(), AuthError> {
        self.ensure_connected()?;
        if !self.probe.authorized.load(Ordering::SeqCst) {
            return Err(AuthError::Rpc("not authorized".into()));
        }
        std::fs::write(&self.path, format!("artifact-{}", self.chat))?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), AuthError> {
        if self.probe.disconnected.swap(true, Ordering::SeqCst) {
            return Err(AuthError::Disconnected);
        }
        Ok(())
    }
}
