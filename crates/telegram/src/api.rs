//! HTTP calls to the Telegram Bot API.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use shared::error::TransportError;
use tracing::{debug, warn};

use crate::types::{ApiResponse, ReplyMarkup, SentMessage, Update, User};

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";
pub const PARSE_MODE: &str = "Markdown";

/// Extra time allowed on top of the long-poll timeout before the HTTP
/// request itself gives up.
const POLL_SLACK: Duration = Duration::from_secs(10);

pub struct TelegramApi {
    client: Client,
    base_url: String,
}

impl TelegramApi {
    pub fn new(bot_token: &str) -> Self {
        Self::with_base_url(bot_token, DEFAULT_API_URL)
    }

    pub fn with_base_url(bot_token: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: format!("{}/bot{}", base_url.trim_end_matches('/'), bot_token),
        }
    }

    /// Checks the token and returns the bot's own account.
    pub async fn get_me(&self) -> Result<User, TransportError> {
        self.call("getMe", json!({}), None).await
    }

    /// Long-polls for updates after `offset`.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TransportError> {
        let mut body = json!({
            "timeout": timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        let deadline = Duration::from_secs(timeout_secs) + POLL_SLACK;
        self.call("getUpdates", body, Some(deadline)).await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
        reply_markup: Option<ReplyMarkup>,
    ) -> Result<i64, TransportError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": PARSE_MODE,
        });
        if let Some(message_id) = reply_to {
            body["reply_to_message_id"] = json!(message_id);
            body["allow_sending_without_reply"] = json!(true);
        }
        if let Some(markup) = reply_markup {
            body["reply_markup"] = markup_value(&markup)?;
        }

        debug!(chat_id, "sendMessage");
        let sent: SentMessage = self.call("sendMessage", body, None).await?;
        Ok(sent.message_id)
    }

    /// Rewrites a message in place. Telegram rejects edits that change
    /// nothing; those count as success.
    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        reply_markup: Option<ReplyMarkup>,
    ) -> Result<(), TransportError> {
        let mut body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
            "parse_mode": PARSE_MODE,
        });
        if let Some(markup) = reply_markup {
            body["reply_markup"] = markup_value(&markup)?;
        }

        debug!(chat_id, message_id, "editMessageText");
        match self.call::<Value>("editMessageText", body, None).await {
            Ok(_) => Ok(()),
            Err(TransportError::Api { description, .. })
                if description.contains("message is not modified") =>
            {
                debug!(chat_id, message_id, "edit left message unchanged");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
    ) -> Result<(), TransportError> {
        let mut body = json!({ "callback_query_id": callback_query_id });
        if let Some(text) = text {
            body["text"] = json!(text);
        }
        self.call::<bool>("answerCallbackQuery", body, None).await?;
        Ok(())
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: Value,
        timeout: Option<Duration>,
    ) -> Result<T, TransportError> {
        let mut request = self
            .client
            .post(format!("{}/{method}", self.base_url))
            .json(&body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let api_resp: ApiResponse<T> = match serde_json::from_slice(&bytes) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(TransportError::Api {
                    code: Some(i64::from(status.as_u16())),
                    description: status.to_string(),
                });
            }
            Err(e) => return Err(TransportError::Decode(format!("{method}: {e}"))),
        };

        if !api_resp.ok {
            let description = api_resp.description.unwrap_or_default();
            let code = api_resp
                .error_code
                .or_else(|| (!status.is_success()).then(|| i64::from(status.as_u16())));
            warn!(method, ?code, %description, "bot api call failed");
            return Err(TransportError::Api { code, description });
        }

        api_resp
            .result
            .ok_or_else(|| TransportError::Decode(format!("{method}: response has no result")))
    }
}

fn markup_value(markup: &ReplyMarkup) -> Result<Value, TransportError> {
    serde_json::to_value(markup).map_err(|e| TransportError::Decode(format!("serialize markup: {e}")))
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
