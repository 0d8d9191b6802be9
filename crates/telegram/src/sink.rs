use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    error::TransportError,
    protocol::{Keyboard, MenuStyle, Render, RenderSink},
};

use crate::{
    api::TelegramApi,
    types::{InlineKeyboardMarkup, ReplyKeyboardMarkup, ReplyMarkup},
};

/// Delivers renders through the Bot API, drawing keyboards in the
/// configured style.
pub struct TelegramSink {
    api: Arc<TelegramApi>,
    style: MenuStyle,
}

impl TelegramSink {
    pub fn new(api: Arc<TelegramApi>, style: MenuStyle) -> Self {
        Self { api, style }
    }

    fn send_markup(&self, keyboard: &Keyboard) -> ReplyMarkup {
        match self.style {
            MenuStyle::Inline => ReplyMarkup::Inline(InlineKeyboardMarkup::from_keyboard(keyboard)),
            MenuStyle::Reply => ReplyMarkup::Reply(ReplyKeyboardMarkup::from_keyboard(keyboard)),
        }
    }

    // editMessageText only accepts inline markup.
    fn edit_markup(&self, keyboard: &Keyboard) -> Option<ReplyMarkup> {
        match self.style {
            MenuStyle::Inline => Some(ReplyMarkup::Inline(InlineKeyboardMarkup::from_keyboard(
                keyboard,
            ))),
            MenuStyle::Reply => None,
        }
    }
}

#[async_trait]
impl RenderSink for TelegramSink {
    async fn render(&self, render: Render) -> Result<(), TransportError> {
        match render {
            Render::Send {
                chat_id,
                text,
                reply_to,
                keyboard,
            } => {
                let markup = keyboard
                    .as_ref()
                    .filter(|keyboard| !keyboard.is_empty())
                    .map(|keyboard| self.send_markup(keyboard));
                self.api
                    .send_message(chat_id.0, &text, reply_to.map(|id| id.0), markup)
                    .await?;
            }
            Render::Edit {
                chat_id,
                message_id,
                text,
                keyboard,
            } => {
                let markup = keyboard.as_ref().and_then(|keyboard| self.edit_markup(keyboard));
                self.api
                    .edit_message_text(chat_id.0, message_id.0, &text, markup)
                    .await?;
            }
            Render::Acknowledge { query_id, text } => {
                self.api
                    .answer_callback_query(&query_id, text.as_deref())
                    .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/sink_tests.rs"]
mod tests;
