//! Serde types for the parts of the Bot API this bot touches.
//!
//! Unknown fields are ignored; everything optional on the wire is `Option`.

use serde::{Deserialize, Serialize};
use shared::protocol::Keyboard;

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub error_code: Option<i64>,
    pub description: Option<String>,
    pub result: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub resize_keyboard: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyboardButton {
    pub text: String,
}

/// Either keyboard shape, serialized as the bare markup object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Inline(InlineKeyboardMarkup),
    Reply(ReplyKeyboardMarkup),
}

impl InlineKeyboardMarkup {
    pub fn from_keyboard(keyboard: &Keyboard) -> Self {
        Self {
            inline_keyboard: keyboard
                .rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|button| InlineKeyboardButton {
                            text: button.inline_text(),
                            callback_data: button.callback_id.clone(),
                        })
                        .collect()
                })
                .collect(),
        }
    }
}

impl ReplyKeyboardMarkup {
    pub fn from_keyboard(keyboard: &Keyboard) -> Self {
        Self {
            keyboard: keyboard
                .rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|button| KeyboardButton {
                            text: button.reply_text(),
                        })
                        .collect()
                })
                .collect(),
            resize_keyboard: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::protocol::KeyButton;

    fn keyboard() -> Keyboard {
        Keyboard {
            rows: vec![vec![
                KeyButton {
                    icon: "🧮".into(),
                    label: "CPU".into(),
                    command: "/cpu".into(),
                    callback_id: "mon_cpu".into(),
                },
                KeyButton {
                    icon: "⬅️".into(),
                    label: "Back".into(),
                    command: "/start".into(),
                    callback_id: "menu_main".into(),
                },
            ]],
        }
    }

    #[test]
    fn deserializes_text_update() {
        let json = r#"{
            "update_id": 10,
            "message": {
                "message_id": 99,
                "from": {"id": 4242, "is_bot": false, "first_name": "Op"},
                "chat": {"id": 4242, "type": "private"},
                "date": 1700000000,
                "text": "/status"
            }
        }"#;
        let update: Update = serde_json::from_str(json).expect("update");
        let message = update.message.expect("message");
        assert_eq!(message.text.as_deref(), Some("/status"));
        assert_eq!(message.from.expect("from").id, 4242);
        assert!(update.callback_query.is_none());
    }

    #[test]
    fn deserializes_callback_update() {
        let json = r#"{
            "update_id": 11,
            "callback_query": {
                "id": "cb-7",
                "from": {"id": 4242, "first_name": "Op"},
                "message": {"message_id": 5, "chat": {"id": 4242}, "date": 1},
                "chat_instance": "x",
                "data": "menu_main"
            }
        }"#;
        let update: Update = serde_json::from_str(json).expect("update");
        let query = update.callback_query.expect("callback");
        assert_eq!(query.id, "cb-7");
        assert_eq!(query.data.as_deref(), Some("menu_main"));
        assert_eq!(query.message.expect("message").message_id, 5);
    }

    #[test]
    fn deserializes_error_response() {
        let json = r#"{"ok": false, "error_code": 401, "description": "Unauthorized"}"#;
        let resp: ApiResponse<Vec<Update>> = serde_json::from_str(json).expect("response");
        assert!(!resp.ok);
        assert_eq!(resp.error_code, Some(401));
        assert!(resp.result.is_none());
    }

    #[test]
    fn inline_markup_uses_icon_label_and_callback() {
        let markup = ReplyMarkup::Inline(InlineKeyboardMarkup::from_keyboard(&keyboard()));
        let value = serde_json::to_value(&markup).expect("json");
        assert_eq!(value["inline_keyboard"][0][0]["text"], "🧮 CPU");
        assert_eq!(value["inline_keyboard"][0][1]["callback_data"], "menu_main");
    }

    #[test]
    fn reply_markup_sends_commands_as_text() {
        let markup = ReplyMarkup::Reply(ReplyKeyboardMarkup::from_keyboard(&keyboard()));
        let value = serde_json::to_value(&markup).expect("json");
        assert_eq!(value["keyboard"][0][0]["text"], "/cpu 🧮");
        assert_eq!(value["keyboard"][0][1]["text"], "/start ⬅️");
        assert_eq!(value["resize_keyboard"], true);
    }
}
