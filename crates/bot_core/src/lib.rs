//! Command dispatch for the host administration bot: the menu graph, the
//! command table, and the dispatcher that ties them to telemetry and ops.

pub mod commands;
pub mod dispatcher;
pub mod format;
pub mod menu;

pub use commands::{Action, CommandSpec, CommandTable, COMMANDS};
pub use dispatcher::Dispatcher;
pub use menu::{Button, MenuView};
