//! Long-polling loop that turns `getUpdates` into [`InboundEvent`]s.

use std::{sync::Arc, time::Duration};

use shared::{
    domain::{ChatId, InboundEvent, MessageId, SenderId},
    error::TransportError,
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::{api::TelegramApi, types::Update};

const MAX_BACKOFF_SECS: u64 = 60;

/// Maps one update to an event. Updates without text or callback data, and
/// callbacks whose message is gone, carry nothing to dispatch.
///
/// Access is granted per chat, so the sender identity is the chat id for
/// both kinds of event. Every member of an authorized group shares it.
pub fn inbound_event(update: Update) -> Option<InboundEvent> {
    if let Some(message) = update.message {
        let text = message.text?;
        let chat_id = ChatId(message.chat.id);
        let sender_id = SenderId(message.chat.id);
        return Some(InboundEvent::TextMessage {
            chat_id,
            sender_id,
            text,
            message_id: MessageId(message.message_id),
        });
    }

    let query = update.callback_query?;
    let action_id = query.data?;
    let Some(message) = query.message else {
        debug!(query_id = %query.id, "callback without origin message");
        return None;
    };
    debug!(query_id = %query.id, user_id = query.from.id, "callback received");
    Some(InboundEvent::CallbackAction {
        chat_id: ChatId(message.chat.id),
        sender_id: SenderId(message.chat.id),
        query_id: query.id,
        action_id,
        origin_message: MessageId(message.message_id),
    })
}

/// Polls until cancelled, the receiver goes away, or the API rejects the
/// bot outright. Transient failures back off from 1s up to a minute.
pub async fn poll_loop(
    api: Arc<TelegramApi>,
    poll_timeout_secs: u64,
    events: mpsc::Sender<InboundEvent>,
    mut cancel: watch::Receiver<bool>,
) -> Result<(), TransportError> {
    let mut offset: Option<i64> = None;
    let mut backoff_secs = 1u64;

    info!(poll_timeout_secs, "telegram poller started");

    loop {
        if *cancel.borrow() {
            info!("telegram poller shutting down");
            return Ok(());
        }

        let updates = tokio::select! {
            result = api.get_updates(offset, poll_timeout_secs) => result,
            _ = cancel.changed() => {
                info!("telegram poller cancelled");
                return Ok(());
            }
        };

        match updates {
            Ok(updates) => {
                backoff_secs = 1;
                for update in updates {
                    offset = Some(update.update_id + 1);
                    let update_id = update.update_id;
                    let Some(event) = inbound_event(update) else {
                        debug!(update_id, "skipping update");
                        continue;
                    };
                    if events.send(event).await.is_err() {
                        warn!("event channel closed, stopping poller");
                        return Ok(());
                    }
                }
            }
            Err(err) if err.is_fatal() => {
                warn!(error = %err, "getUpdates rejected, giving up");
                return Err(err);
            }
            Err(err) => {
                warn!(error = %err, backoff_secs, "getUpdates failed, backing off");
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(backoff_secs)) => {}
                    _ = cancel.changed() => {
                        info!("telegram poller cancelled");
                        return Ok(());
                    }
                }
                backoff_secs = (backoff_secs * 2).min(MAX_BACKOFF_SECS);
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/poller_tests.rs"]
mod tests;
