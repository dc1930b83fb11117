//! Dialogue controller.
//!
//! One [`Controller::handle`] call per inbound [`Event`]. Handlers for the same
//! chat are serialized by the session's lock in [`SessionStore`]; a handler
//! that waited for the lock re-checks the [`Stage`] and drops events that no
//! longer apply (e.g. a keypad press arriving after the code was submitted).
//!
//! ```text
//! Start ─/start─▶ greeting ─start_session─▶ TermsShown ─accept_terms─▶ AwaitingPhone
//!   ─contact─▶ AwaitingCode ─5 digits─▶ sign in ─┬─ ok ──────────▶ Completed (delivered)
//!                                                ├─ wrong code ──▶ AwaitingCode (cleared)
//!                                                ├─ 2FA ─────────▶ AwaitingPassword ─text─▶ …
//!                                                ├─ restart ─────▶ AwaitingPhone
//!                                                └─ fatal ───────▶ Completed (torn down)
//! ```

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::{
    Action, AuthBridge, AuthClient, AuthConnector, AuthError, BotApi, ChatId, ChatSession, Error,
    Event, Keyboard, PasswordHint, Retry, SessionHandle, SessionStore, SignIn, Stage, texts,
};

type Session<A> = ChatSession<<A as AuthConnector>::Client>;
type Handle<A> = SessionHandle<<A as AuthConnector>::Client>;
type Outcome<A> = SignIn<<<A as AuthConnector>::Client as AuthClient>::PasswordToken>;

pub struct Controller<B: BotApi, A: AuthConnector> {
    bot:                  Arc<B>,
    connector:            Arc<A>,
    bridge:               AuthBridge,
    store:                SessionStore<A::Client>,
    purge_after_delivery: bool,
}

impl<B: BotApi, A: AuthConnector> Controller<B, A> {
    pub fn new(bot: Arc<B>, connector: Arc<A>, bridge: AuthBridge) -> Self {
        Self {
            bot,
            connector,
            bridge,
            store: SessionStore::new(),
            purge_after_delivery: false,
        }
    }

    /// Delete each artifact file after it has been sent.
    pub fn purge_after_delivery(mut self, v: bool) -> Self {
        self.purge_after_delivery = v; self
    }

    pub fn store(&self) -> &SessionStore<A::Client> {
        &self.store
    }

    // ── Dispatch ───────────────────────────────────────────────────────────

    pub async fn handle(&self, event: Event) {
        match event {
            Event::Command { chat, name, text } => self.on_command(chat, &name, text).await,
            Event::Callback { chat, query_id, message_id, data } => {
                self.on_callback(chat, query_id, message_id, &data).await
            }
            Event::Contact { chat, phone, owner } => self.on_contact(chat, phone, owner).await,
            Event::Text { chat, text } => self.on_text(chat, text).await,
        }
    }

    async fn on_command(&self, chat: ChatId, name: &str, text: String) {
        match name {
            "/start" => {
                log::info!("[sessiongate] chat {chat}: /start");
                self.say(chat, texts::GREETING, Some(Keyboard::single(texts::BTN_START, Action::StartSession))).await;
            }
            "/help" => self.say(chat, texts::HELP, None).await,
            "/cancel" => self.on_cancel(chat).await,
            // A 2FA password may itself look like a command.
            _ if self.stage(chat).await == Some(Stage::AwaitingPassword) => self.on_text(chat, text).await,
            other => log::debug!("[sessiongate] chat {chat}: ignoring unknown command {other}"),
        }
    }

    async fn on_cancel(&self, chat: ChatId) {
        let Some(handle) = self.store.get(chat).await else {
            self.say(chat, texts::NOTHING_TO_CANCEL, None).await;
            return;
        };
        let mut session = handle.lock().await;
        if session.stage == Stage::Completed {
            self.say(chat, texts::NOTHING_TO_CANCEL, None).await;
            return;
        }
        log::info!("[sessiongate] chat {chat}: cancelled by user");
        self.teardown(&handle, &mut session).await;
        self.say(chat, texts::CANCELLED, None).await;
    }

    async fn on_callback(&self, chat: ChatId, query_id: i64, message_id: Option<i32>, data: &str) {
        if let Err(e) = self.bot.answer_callback(query_id).await {
            log::warn!("[sessiongate] chat {chat}: answering callback failed: {e}");
        }
        match Action::parse(data) {
            Some(Action::StartSession) => {
                log::info!("[sessiongate] chat {chat}: started session");
                let keyboard = Keyboard::single(texts::BTN_ACCEPT, Action::AcceptTerms);
                match message_id {
                    Some(id) => self.edit(chat, id, texts::TERMS, Some(keyboard)).await,
                    None     => self.say(chat, texts::TERMS, Some(keyboard)).await,
                }
            }
            Some(Action::AcceptTerms) => {
                log::info!("[sessiongate] chat {chat}: accepted terms");
                self.say(chat, texts::PHONE_PROMPT, Some(Keyboard::request_contact())).await;
            }
            Some(action @ (Action::Digit(_) | Action::DeleteDigit)) => {
                self.on_code_input(chat, message_id, action).await
            }
            None => log::warn!("[sessiongate] chat {chat}: unknown callback data {data:?}"),
        }
    }

    // ── Contact ────────────────────────────────────────────────────────────

    async fn on_contact(&self, chat: ChatId, phone: String, owner: Option<i64>) {
        if owner.is_some_and(|id| id != chat) {
            log::warn!("[sessiongate] chat {chat}: contact of another user rejected");
            self.say(chat, texts::NOT_OWN_CONTACT, Some(Keyboard::request_contact())).await;
            return;
        }
        log::info!("[sessiongate] chat {chat}: received contact");

        if let Some(old) = self.store.remove(chat).await {
            log::info!("[sessiongate] chat {chat}: replacing previous session");
            self.close(&mut *old.lock().await).await;
        }
        self.remove_artifact(chat).await;

        let connector = self.connector.clone();
        let client = match self.run("connect", chat, async move { connector.connect(chat).await }).await {
            Ok(c) => Arc::new(c),
            Err(e) => {
                log::error!("[sessiongate] chat {chat}: connect failed: {e:?}");
                self.say(chat, &texts::failure(&e), None).await;
                return;
            }
        };

        let handle: Handle<A> = Arc::new(Mutex::new(ChatSession::new(chat, phone, client)));
        let mut session = handle.lock().await;
        if let Some(replaced) = self.store.insert(chat, handle.clone()).await {
            // A concurrent contact registered first; ours wins.
            self.close(&mut *replaced.lock().await).await;
        }
        self.request_code(&handle, &mut session).await;
    }

    async fn request_code(&self, handle: &Handle<A>, session: &mut Session<A>) {
        let chat   = session.chat_id;
        let client = session.client.clone();
        let phone  = session.phone.clone();
        match self.run("request_code", chat, async move { client.request_code(&phone).await }).await {
            Ok(token) => {
                log::info!("[sessiongate] chat {chat}: login code sent");
                session.login_token = Some(Arc::new(token));
                session.code.clear();
                session.stage = Stage::AwaitingCode;
                self.show_keypad(chat).await;
            }
            Err(Error::Auth(AuthError::RestartRequired)) => self.restart(session).await,
            Err(e) => self.fail(handle, session, e).await,
        }
    }

    // ── Code entry ─────────────────────────────────────────────────────────

    async fn on_code_input(&self, chat: ChatId, message_id: Option<i32>, action: Action) {
        let Some(handle) = self.store.get(chat).await else {
            log::warn!("[sessiongate] chat {chat}: code input without a session");
            return;
        };
        let mut session = handle.lock().await;
        if session.stage != Stage::AwaitingCode {
            log::debug!("[sessiongate] chat {chat}: code input ignored in {:?}", session.stage);
            return;
        }

        let changed = match action {
            Action::Digit(d) => session.code.push(d).is_some(),
            _                => session.code.pop().is_some(),
        };
        if !changed {
            return;
        }
        log::debug!("[sessiongate] chat {chat}: {} digit(s) entered", session.code.len());

        if session.code.is_complete() {
            self.submit_code(&handle, &mut session).await;
        } else if let Some(id) = message_id {
            self.edit(chat, id, &texts::code_prompt(session.code.as_str()), Some(Keyboard::keypad())).await;
        }
    }

    async fn submit_code(&self, handle: &Handle<A>, session: &mut Session<A>) {
        let chat = session.chat_id;
        let Some(token) = session.login_token.clone() else {
            let e = Error::Auth(AuthError::Rpc("no login code was requested".into()));
            self.fail(handle, session, e).await;
            return;
        };
        log::info!("[sessiongate] chat {chat}: signing in with code");
        let client = session.client.clone();
        let code   = session.code.as_str().to_owned();
        let outcome = self.bridge
            .submit("sign_in", chat, async move { client.sign_in(&token, &code).await })
            .wait()
            .await;
        match outcome {
            Ok(outcome) => self.settle(handle, session, outcome).await,
            Err(e)      => self.fail(handle, session, e.into()).await,
        }
    }

    // ── Password ───────────────────────────────────────────────────────────

    async fn on_text(&self, chat: ChatId, text: String) {
        let Some(handle) = self.store.get(chat).await else {
            log::warn!("[sessiongate] chat {chat}: text without a session ignored");
            return;
        };
        let mut session = handle.lock().await;
        if session.stage != Stage::AwaitingPassword {
            log::debug!("[sessiongate] chat {chat}: text ignored in {:?}", session.stage);
            return;
        }
        let Some(token) = session.password_token.take() else {
            let e = Error::Auth(AuthError::Rpc("no password challenge pending".into()));
            self.fail(&handle, &mut session, e).await;
            return;
        };

        log::info!("[sessiongate] chat {chat}: checking 2FA password");
        session.password = Some(text.clone());
        let client = session.client.clone();
        let outcome = self.bridge
            .submit("check_password", chat, async move { client.check_password(token, &text).await })
            .wait()
            .await;
        match outcome {
            Ok(outcome) => self.settle(&handle, &mut session, outcome).await,
            Err(e)      => self.fail(&handle, &mut session, e.into()).await,
        }
    }

    // ── Outcomes ───────────────────────────────────────────────────────────

    async fn settle(&self, handle: &Handle<A>, session: &mut Session<A>, outcome: Outcome<A>) {
        let chat = session.chat_id;
        match outcome {
            SignIn::Success(name) => {
                log::info!("[sessiongate] chat {chat}: signed in as {name}");
                self.deliver(handle, session).await;
            }
            SignIn::Retry(Retry::InvalidCode) => {
                log::warn!("[sessiongate] chat {chat}: invalid code");
                session.code.clear();
                self.say(chat, texts::WRONG_CODE, None).await;
                self.show_keypad(chat).await;
            }
            SignIn::Retry(Retry::RestartRequired) => self.restart(session).await,
            SignIn::PasswordNeeded(token) => {
                log::info!("[sessiongate] chat {chat}: 2FA enabled");
                let prompt = texts::password_prompt(token.hint());
                session.password_token = Some(token);
                session.password = None;
                session.stage = Stage::AwaitingPassword;
                self.say(chat, &prompt, None).await;
            }
            SignIn::Fatal(e) => self.fail(handle, session, e.into()).await,
        }
    }

    /// Keep the session but go back to asking for the phone number.
    async fn restart(&self, session: &mut Session<A>) {
        let chat = session.chat_id;
        log::warn!("[sessiongate] chat {chat}: authorization restart requested");
        session.code.clear();
        session.login_token = None;
        session.password_token = None;
        session.stage = Stage::AwaitingPhone;
        self.say(chat, texts::RESTART, Some(Keyboard::request_contact())).await;
    }

    async fn fail(&self, handle: &Handle<A>, session: &mut Session<A>, err: Error) {
        let chat = session.chat_id;
        log::error!("[sessiongate] chat {chat}: authorization error in {:?}: {err:?}", session.stage);
        self.say(chat, &texts::failure(&err), None).await;
        self.teardown(handle, session).await;
    }

    // ── Delivery ───────────────────────────────────────────────────────────

    /// Persist, read and upload the artifact, then tear down whatever happened.
    async fn deliver(&self, handle: &Handle<A>, session: &mut Session<A>) {
        let chat = session.chat_id;
        session.stage = Stage::Completed;

        match self.send_artifact(session).await {
            Ok(()) => log::info!(
                "[sessiongate] chat {chat}: session file sent ({}s after contact)",
                session.elapsed_secs()
            ),
            Err(e) => {
                log::error!("[sessiongate] chat {chat}: sending session file failed: {e:?}");
                self.say(chat, &texts::delivery_failed(&e), None).await;
            }
        }
        if self.purge_after_delivery {
            self.remove_artifact(chat).await;
        }
        self.teardown(handle, session).await;
    }

    async fn send_artifact(&self, session: &Session<A>) -> Result<(), Error> {
        let chat   = session.chat_id;
        let client = session.client.clone();
        self.run("persist", chat, async move { client.persist().await }).await?;

        let path  = self.connector.artifact_path(chat);
        let bytes = tokio::fs::read(&path).await?;
        let name  = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{chat}.session"));
        self.bot.send_document(chat, &name, bytes, texts::CAPTION).await?;
        Ok(())
    }

    async fn remove_artifact(&self, chat: ChatId) {
        let path = self.connector.artifact_path(chat);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => log::info!("[sessiongate] chat {chat}: removed {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("[sessiongate] chat {chat}: removing {} failed: {e}", path.display()),
        }
    }

    // ── Teardown ───────────────────────────────────────────────────────────

    /// Unregister the session (unless a newer one replaced it) and disconnect.
    async fn teardown(&self, handle: &Handle<A>, session: &mut Session<A>) {
        let chat = session.chat_id;
        self.store.remove_if_same(chat, handle).await;
        self.close(session).await;
        log::info!("[sessiongate] chat {chat}: session cleaned");
    }

    /// Mark the session finished, drop its secrets and disconnect its client.
    async fn close(&self, session: &mut Session<A>) {
        let chat = session.chat_id;
        session.stage = Stage::Completed;
        session.code.clear();
        session.login_token = None;
        session.password_token = None;
        session.password = None;

        let client = session.client.clone();
        match self.run("disconnect", chat, async move { client.disconnect().await }).await {
            Ok(())  => log::info!("[sessiongate] chat {chat}: client disconnected"),
            Err(e)  => log::warn!("[sessiongate] chat {chat}: disconnect failed: {e}"),
        }
    }

    // ── Expiry ─────────────────────────────────────────────────────────────

    /// Tear down every unfinished session older than `ttl` and tell its chat.
    /// Returns how many were removed.
    pub async fn sweep_stale(&self, ttl: Duration) -> usize {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let mut swept = 0;
        for (chat, handle) in self.store.snapshot().await {
            let mut session = handle.lock().await;
            if session.stage == Stage::Completed || session.elapsed_secs() < ttl_secs {
                continue;
            }
            log::info!(
                "[sessiongate] chat {chat}: session expired in {:?} after {}s",
                session.stage,
                session.elapsed_secs()
            );
            self.teardown(&handle, &mut session).await;
            self.say(chat, texts::EXPIRED, None).await;
            swept += 1;
        }
        swept
    }

    // ── Helpers ────────────────────────────────────────────────────────────

    async fn stage(&self, chat: ChatId) -> Option<Stage> {
        let handle = self.store.get(chat).await?;
        let stage = handle.lock().await.stage;
        Some(stage)
    }

    /// Run a fallible auth operation on the bridge and flatten both error layers.
    async fn run<T, F>(&self, op: &'static str, chat: ChatId, fut: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, AuthError>> + Send + 'static,
        T: Send + 'static,
    {
        Ok(self.bridge.submit(op, chat, fut).wait().await??)
    }

    async fn show_keypad(&self, chat: ChatId) {
        self.say(chat, &texts::code_prompt(""), Some(Keyboard::keypad())).await;
    }

    async fn say(&self, chat: ChatId, text: &str, keyboard: Option<Keyboard>) {
        if let Err(e) = self.bot.send_text(chat, text, keyboard).await {
            log::warn!("[sessiongate] chat {chat}: sending message failed: {e}");
        }
    }

    async fn edit(&self, chat: ChatId, message_id: i32, text: &str, keyboard: Option<Keyboard>) {
        if let Err(e) = self.bot.edit_text(chat, message_id, text, keyboard).await {
            log::warn!("[sessiongate] chat {chat}: editing message {message_id} failed: {e}");
        }
    }
}
