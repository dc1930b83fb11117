//! Bot-side [`BotApi`] over a bot-token `layer_client::Client`.

use async_trait::async_trait;
use layer_client::{Client, InputMessage, InvocationError};
use layer_tl_types as tl;

use crate::{BotApi, BotError, Button, ChatId, Keyboard};

impl From<InvocationError> for BotError {
    fn from(e: InvocationError) -> Self {
        match e {
            InvocationError::Io(e) => BotError::Io(e),
            e => BotError::Request(e.to_string()),
        }
    }
}

/// The bot's own connection.
#[derive(Clone)]
pub struct LayerBot {
    client: Client,
}

impl LayerBot {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Private bot chats are keyed by the user's id.
    fn peer(chat: ChatId) -> tl::enums::Peer {
        tl::enums::Peer::User(tl::types::PeerUser { user_id: chat })
    }

    async fn input_peer(&self, chat: ChatId) -> tl::enums::InputPeer {
        self.client
            .resolve_to_input_peer(&Self::peer(chat))
            .await
            .unwrap_or(tl::enums::InputPeer::User(tl::types::InputPeerUser {
                user_id: chat, access_hash: 0,
            }))
    }
}

#[async_trait]
impl BotApi for LayerBot {
    async fn send_text(&self, chat: ChatId, text: &str, keyboard: Option<Keyboard>) -> Result<(), BotError> {
        let mut msg = InputMessage::text(text);
        if let Some(kb) = keyboard {
            msg = msg.reply_markup(reply_markup(kb));
        }
        self.client.send_message_to_peer_ex(Self::peer(chat), &msg).await?;
        Ok(())
    }

    async fn edit_text(
        &self,
        chat:       ChatId,
        message_id: i32,
        text:       &str,
        keyboard:   Option<Keyboard>,
    ) -> Result<(), BotError> {
        let req = tl::functions::messages::EditMessage {
            no_webpage:    true,
            invert_media:  false,
            peer:          self.input_peer(chat).await,
            id:            message_id,
            message:       Some(text.to_string()),
            media:         None,
            reply_markup:  keyboard.map(reply_markup),
            entities:      None,
            schedule_date: None,
            schedule_repeat_period: None,
            quick_reply_shortcut_id: None,
        };
        match self.client.invoke(&req).await {
            Ok(_) => Ok(()),
            // Pressing delete on an empty keypad re-renders identical content.
            Err(e) if e.is("MESSAGE_NOT_MODIFIED") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn answer_callback(&self, query_id: i64) -> Result<(), BotError> {
        self.client.answer_callback_query(query_id, None, false).await?;
        Ok(())
    }

    async fn send_document(
        &self,
        chat:      ChatId,
        file_name: &str,
        bytes:     Vec<u8>,
        caption:   &str,
    ) -> Result<(), BotError> {
        let uploaded = self.client
            .upload_file(&bytes, file_name, "application/octet-stream")
            .await?;
        self.client
            .send_file(Self::peer(chat), uploaded.as_document_media(), caption)
            .await?;
        log::info!("[sessiongate] chat {chat}: uploaded {file_name} ({} bytes)", bytes.len());
        Ok(())
    }
}

// ─── Keyboard conversion ──────────────────────────────────────────────────────

pub(crate) fn reply_markup(kb: Keyboard) -> tl::enums::ReplyMarkup {
    match kb {
        Keyboard::Inline(rows) => inline_keyboard(
            rows.into_iter()
                .map(|row| row.into_iter().map(btn_callback).collect())
                .collect(),
        ),
        Keyboard::RequestContact { label } => {
            tl::enums::ReplyMarkup::ReplyKeyboardMarkup(tl::types::ReplyKeyboardMarkup {
                resize:      true,
                single_use:  true,
                selective:   false,
                persistent:  false,
                rows: vec![tl::enums::KeyboardButtonRow::KeyboardButtonRow(
                    tl::types::KeyboardButtonRow {
                        buttons: vec![tl::enums::KeyboardButton::RequestPhone(
                            tl::types::KeyboardButtonRequestPhone { style: None, text: label },
                        )],
                    },
                )],
                placeholder: None,
            })
        }
    }
}

fn inline_keyboard(rows: Vec<Vec<tl::enums::KeyboardButton>>) -> tl::enums::ReplyMarkup {
    tl::enums::ReplyMarkup::ReplyInlineMarkup(tl::types::ReplyInlineMarkup {
        rows: rows.into_iter().map(|row| {
            tl::enums::KeyboardButtonRow::KeyboardButtonRow(
                tl::types::KeyboardButtonRow { buttons: row }
            )
        }).collect(),
    })
}

fn btn_callback(button: Button) -> tl::enums::KeyboardButton {
    tl::enums::KeyboardButton::Callback(tl::types::KeyboardButtonCallback {
        requires_password: false,
        style: None,
        text:  button.text,
        data:  button.data.into_bytes(),
    })
}
