//! User-facing texts and button labels.

use crate::code::CODE_LENGTH;

pub const GREETING: &str = "👋 Hi!\n\n\
    This bot produces a .session file for your own Telegram account. Let's begin!";

pub const HELP: &str = "📖 Commands\n\n\
    /start - begin the login flow\n\
    /cancel - abort the current login\n\
    /help - this message";

pub const TERMS: &str = "⚠️ Warning!\n\n\
    Never send your .session file to anyone. Whoever holds it has full access to your \
    account. The bot's operators take no responsibility for how it is used; you take \
    all responsibility yourself.";

pub const PHONE_PROMPT: &str =
    "📌 To get your .session file, share your phone number with the button below.";

pub const NOT_OWN_CONTACT: &str =
    "🚫 Please share your own number with the button below, not someone else's contact.";

pub const WRONG_CODE: &str = "❌ Wrong code. Please try again.";

pub const RESTART: &str = "⚠️ Telegram asked to restart the authorization. Please share your number again.";

pub const CANCELLED: &str = "🛑 Login cancelled. Send /start to begin again.";

pub const NOTHING_TO_CANCEL: &str = "Nothing to cancel. Send /start to begin.";

pub const EXPIRED: &str = "⌛ Your login attempt expired. Send /start to begin again.";

pub const CAPTION: &str = "📂 Your .session file.\n⚠️ Do not share it with anyone!";

pub const BTN_START: &str = "🚀 Start";
pub const BTN_ACCEPT: &str = "✅ I understand the terms";
pub const BTN_SHARE_PHONE: &str = "📲 Share phone number";
pub const BTN_DELETE: &str = "⬅️ Delete";

/// Keypad prompt showing the digits entered so far.
pub fn code_prompt(entered: &str) -> String {
    format!(
        "📩 Enter the {CODE_LENGTH}-digit code Telegram sent you using the buttons below:\n\n\
        Entered: {entered}"
    )
}

pub fn password_prompt(hint: Option<&str>) -> String {
    match hint {
        Some(h) if !h.is_empty() => format!("🔒 Enter your two-step verification password (hint: {h}):"),
        _ => "🔒 Enter your two-step verification password:".to_string(),
    }
}

pub fn failure(err: &dyn std::fmt::Display) -> String {
    format!("❌ Authorization failed: {err}\n\nSend /start to try again.")
}

pub fn delivery_failed(err: &dyn std::fmt::Display) -> String {
    format!("❌ Could not send the session file: {err}")
}
