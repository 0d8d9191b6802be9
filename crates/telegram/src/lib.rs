//! Telegram Bot API transport: a long-poll event source and a render sink.

pub mod api;
pub mod poller;
pub mod sink;
pub mod types;

pub use api::{TelegramApi, DEFAULT_API_URL};
pub use poller::{inbound_event, poll_loop};
pub use sink::TelegramSink;

#[cfg(test)]
#[path = "tests/mock_server.rs"]
mod mock_server;
