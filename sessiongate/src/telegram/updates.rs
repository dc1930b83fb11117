//! Reduce `layer-client` updates to controller [`Event`]s.
//!
//! Only private chats are served: messages from groups and channels, the
//! bot's own messages and unsupported update kinds yield `None`.

use layer_client::update::{IncomingMessage, Update};
use layer_tl_types as tl;

use crate::Event;

pub fn to_event(update: Update, bot_id: i64, bot_username: &str) -> Option<Event> {
    match update {
        Update::NewMessage(msg) => message_event(&msg, bot_id, bot_username),
        Update::CallbackQuery(cb) => {
            // Inline-message callbacks carry no chat and are not served.
            let chat = match &cb.chat_peer {
                Some(tl::enums::Peer::User(u)) => u.user_id,
                _ => return None,
            };
            Some(Event::Callback {
                chat,
                query_id:   cb.query_id,
                message_id: cb.message_id,
                data:       cb.data().unwrap_or("").to_string(),
            })
        }
        _ => None,
    }
}

fn message_event(msg: &IncomingMessage, bot_id: i64, bot_username: &str) -> Option<Event> {
    // Drop outgoing (bot's own messages echoed back as updates)
    if msg.outgoing() || sender_user_id(msg) == Some(bot_id) {
        return None;
    }
    let chat = match msg.peer_id() {
        Some(tl::enums::Peer::User(u)) => u.user_id,
        _ => return None,
    };

    if let tl::enums::Message::Message(m) = &msg.raw {
        if let Some(tl::enums::MessageMedia::Contact(c)) = &m.media {
            return Some(Event::Contact {
                chat,
                phone: c.phone_number.trim().to_string(),
                owner: (c.user_id != 0).then_some(c.user_id),
            });
        }
    }

    // Text is passed on verbatim: it may be a 2FA password.
    let raw = msg.text()?;
    if raw.trim().is_empty() {
        return None;
    }
    match split_command(raw.trim(), bot_username) {
        (Some(name), _) => Some(Event::Command { chat, name, text: raw.to_string() }),
        (None, _)       => Some(Event::Text { chat, text: raw.to_string() }),
    }
}

fn sender_user_id(msg: &IncomingMessage) -> Option<i64> {
    match msg.sender_id() {
        Some(tl::enums::Peer::User(u)) => Some(u.user_id),
        _                              => None,
    }
}

/// Split `/cmd@bot rest` into (`Some("/cmd")`, `"rest"`); a command addressed to
/// another bot keeps its suffix. Plain text yields (`None`, text).
pub fn split_command(text: &str, bot_username: &str) -> (Option<String>, String) {
    if !text.starts_with('/') { return (None, text.to_string()); }
    let (cmd_raw, rest) = text.split_once(' ')
        .map(|(c, r)| (c, r.trim()))
        .unwrap_or((text, ""));
    let cmd = if let Some(pos) = cmd_raw.find('@') {
        let suffix = &cmd_raw[pos + 1..];
        if suffix.eq_ignore_ascii_case(bot_username) { &cmd_raw[..pos] } else { cmd_raw }
    } else { cmd_raw };
    (Some(cmd.to_ascii_lowercase()), rest.to_string())
}
