use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(ChatId);
id_newtype!(SenderId);
id_newtype!(MessageId);

/// Identity checked against the authorized sender. The Telegram transport
/// fills it with the chat id, so a group is authorized as a whole.
impl SenderId {
    /// Authorized-sender value that lets every sender through.
    pub const ANY: SenderId = SenderId(0);

    pub fn is_any(self) -> bool {
        self == Self::ANY
    }
}

/// One chat event delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum InboundEvent {
    TextMessage {
        chat_id: ChatId,
        sender_id: SenderId,
        text: String,
        message_id: MessageId,
    },
    CallbackAction {
        chat_id: ChatId,
        sender_id: SenderId,
        /// Transport handle used to acknowledge the button press.
        query_id: String,
        action_id: String,
        origin_message: MessageId,
    },
}

impl InboundEvent {
    pub fn chat_id(&self) -> ChatId {
        match self {
            Self::TextMessage { chat_id, .. } | Self::CallbackAction { chat_id, .. } => *chat_id,
        }
    }

    pub fn sender_id(&self) -> SenderId {
        match self {
            Self::TextMessage { sender_id, .. } | Self::CallbackAction { sender_id, .. } => {
                *sender_id
            }
        }
    }
}
