//! Bot platform seam.
//!
//! [`Event`] is what the controller consumes; [`BotApi`] is everything it needs
//! to say back. [`crate::telegram`] implements both over `layer-client`.

use async_trait::async_trait;

use crate::{BotError, ChatId, texts};

// ─── Action ───────────────────────────────────────────────────────────────────

/// Callback payload carried by one of the bot's inline buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// `start_session`
    StartSession,
    /// `accept_terms`
    AcceptTerms,
    /// `code_0` … `code_9`
    Digit(u8),
    /// `delete_digit`
    DeleteDigit,
}

impl Action {
    /// Parse raw callback data. Unknown payloads yield `None`.
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "start_session" => Some(Self::StartSession),
            "accept_terms"  => Some(Self::AcceptTerms),
            "delete_digit"  => Some(Self::DeleteDigit),
            other => {
                let d = other.strip_prefix("code_")?;
                match d.as_bytes() {
                    [b @ b'0'..=b'9'] => Some(Self::Digit(b - b'0')),
                    _ => None,
                }
            }
        }
    }

    /// The callback data this action is encoded as.
    pub fn payload(self) -> String {
        match self {
            Self::StartSession => "start_session".into(),
            Self::AcceptTerms  => "accept_terms".into(),
            Self::Digit(d)     => format!("code_{d}"),
            Self::DeleteDigit  => "delete_digit".into(),
        }
    }
}

// ─── Event ────────────────────────────────────────────────────────────────────

/// An inbound bot event, already reduced to what the dialogue needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// `/name` with any `@botname` suffix removed, lowercased. `text` is the
    /// message exactly as sent.
    Command { chat: ChatId, name: String, text: String },
    /// An inline button press.
    Callback { chat: ChatId, query_id: i64, message_id: Option<i32>, data: String },
    /// A shared contact. `owner` is the contact's Telegram user id, when known.
    Contact { chat: ChatId, phone: String, owner: Option<i64> },
    /// Any other text message, untrimmed.
    Text { chat: ChatId, text: String },
}

impl Event {
    pub fn chat(&self) -> ChatId {
        match self {
            Self::Command  { chat, .. }
            | Self::Callback { chat, .. }
            | Self::Contact  { chat, .. }
            | Self::Text     { chat, .. } => *chat,
        }
    }
}

// ─── Keyboard ─────────────────────────────────────────────────────────────────

/// An inline button; `data` is sent back as callback data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub data: String,
}

impl Button {
    pub fn new(text: impl Into<String>, action: Action) -> Self {
        Self { text: text.into(), data: action.payload() }
    }
}

/// Reply markup attached to an outgoing message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Keyboard {
    /// Inline keyboard, row by row.
    Inline(Vec<Vec<Button>>),
    /// One-time reply keyboard with a single "share my contact" button.
    RequestContact { label: String },
}

impl Keyboard {
    /// One inline button.
    pub fn single(text: &str, action: Action) -> Self {
        Self::Inline(vec![vec![Button::new(text, action)]])
    }

    /// Digit keypad: `0 1 2 / 3 4 5 / 6 7 8 / 9` and a delete row.
    pub fn keypad() -> Self {
        let digits: Vec<Button> = (0..=9u8)
            .map(|d| Button::new(d.to_string(), Action::Digit(d)))
            .collect();
        let mut rows: Vec<Vec<Button>> = digits.chunks(3).map(<[Button]>::to_vec).collect();
        rows.push(vec![Button::new(texts::BTN_DELETE, Action::DeleteDigit)]);
        Self::Inline(rows)
    }

    pub fn request_contact() -> Self {
        Self::RequestContact { label: texts::BTN_SHARE_PHONE.to_string() }
    }
}

// ─── BotApi ───────────────────────────────────────────────────────────────────

/// Outbound operations of the bot platform.
#[async_trait]
pub trait BotApi: Send + Sync + 'static {
    async fn send_text(&self, chat: ChatId, text: &str, keyboard: Option<Keyboard>) -> Result<(), BotError>;

    /// Replace the text (and markup) of a message the bot sent earlier.
    async fn edit_text(
        &self,
        chat:       ChatId,
        message_id: i32,
        text:       &str,
        keyboard:   Option<Keyboard>,
    ) -> Result<(), BotError>;

    /// Acknowledge a button press so the client stops its loading indicator.
    async fn answer_callback(&self, query_id: i64) -> Result<(), BotError>;

    async fn send_document(
        &self,
        chat:      ChatId,
        file_name: &str,
        bytes:     Vec<u8>,
        caption:   &str,
    ) -> Result<(), BotError>;
}
