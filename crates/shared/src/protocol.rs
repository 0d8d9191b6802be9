use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{ChatId, MessageId},
    error::TransportError,
};

/// A button independent of how the transport draws it.
///
/// Inline keyboards use `callback_id`; reply keyboards send `command`
/// back as plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyButton {
    pub icon: String,
    pub label: String,
    pub command: String,
    pub callback_id: String,
}

impl KeyButton {
    pub fn inline_text(&self) -> String {
        format!("{} {}", self.icon, self.label)
    }

    pub fn reply_text(&self) -> String {
        format!("{} {}", self.command, self.icon)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyboard {
    pub rows: Vec<Vec<KeyButton>>,
}

impl Keyboard {
    pub fn buttons(&self) -> impl Iterator<Item = &KeyButton> {
        self.rows.iter().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuStyle {
    /// Editable inline buttons that raise callback actions.
    #[default]
    Inline,
    /// Persistent reply buttons that send their command as text.
    Reply,
}

/// Instruction handed to the render sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Render {
    Send {
        chat_id: ChatId,
        text: String,
        reply_to: Option<MessageId>,
        keyboard: Option<Keyboard>,
    },
    Edit {
        chat_id: ChatId,
        message_id: MessageId,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Acknowledge {
        query_id: String,
        text: Option<String>,
    },
}

impl Render {
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Send { text, .. } | Self::Edit { text, .. } => Some(text),
            Self::Acknowledge { text, .. } => text.as_deref(),
        }
    }

    pub fn keyboard(&self) -> Option<&Keyboard> {
        match self {
            Self::Send { keyboard, .. } | Self::Edit { keyboard, .. } => keyboard.as_ref(),
            Self::Acknowledge { .. } => None,
        }
    }
}

/// Where renders go. Failures are reported, never retried by the caller.
#[async_trait]
pub trait RenderSink: Send + Sync {
    async fn render(&self, render: Render) -> Result<(), TransportError>;
}
