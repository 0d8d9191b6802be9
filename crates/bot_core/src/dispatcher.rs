use std::sync::Arc;

use futures::{Stream, StreamExt};
use ops::{ExecutionResult, Operations};
use shared::{
    domain::{ChatId, InboundEvent, MessageId, SenderId},
    error::TelemetryError,
    protocol::{Keyboard, Render, RenderSink},
};
use telemetry::{metric_line, Metric, TelemetryProvider};
use tracing::{debug, info, warn};

use crate::{
    commands::{Action, CommandTable},
    format::{
        escape_markdown, help_text, output_block, plain_tool_list, tool_list, truncate_chars,
        MAX_ACK_CHARS,
    },
    menu::MenuView,
};

pub const UNAUTHORIZED_TEXT: &str = "Unauthorized";
pub const UNKNOWN_COMMAND_TEXT: &str = "Unknown command. Use /help";
pub const UNKNOWN_ACTION_TEXT: &str = "Unknown action";
pub const LOADING_TEXT: &str = "Loading…";

/// Where an event came from, which decides how its renders are shaped.
#[derive(Debug, Clone)]
enum Origin {
    Message {
        chat_id: ChatId,
        message_id: MessageId,
    },
    Callback {
        chat_id: ChatId,
        query_id: String,
        message_id: MessageId,
    },
}

impl Origin {
    fn chat_id(&self) -> ChatId {
        match self {
            Origin::Message { chat_id, .. } | Origin::Callback { chat_id, .. } => *chat_id,
        }
    }

    fn reply_to(&self) -> Option<MessageId> {
        match self {
            Origin::Message { message_id, .. } => Some(*message_id),
            Origin::Callback { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    Install,
    Uninstall,
    Update,
}

impl Operation {
    /// Plain text; escape it before sending as Markdown.
    fn notice(self, tools: &[String]) -> String {
        match self {
            Operation::Install => format!("Installing base tools: {}", plain_tool_list(tools)),
            Operation::Uninstall => {
                format!("Uninstalling base tools: {}", plain_tool_list(tools))
            }
            Operation::Update => "Updating system packages…".into(),
        }
    }

    fn outcome(self, result: &ExecutionResult) -> String {
        let (done, failed) = match self {
            Operation::Install => ("Install finished.", "Install failed"),
            Operation::Uninstall => ("Uninstall finished.", "Uninstall failed"),
            Operation::Update => ("Update finished.", "Update failed"),
        };
        match &result.error {
            None => done.into(),
            Some(error) => format!(
                "{failed}: {}{}",
                escape_markdown(&error.to_string()),
                output_block(&result.output)
            ),
        }
    }
}

/// Turns inbound chat events into renders. Holds only read-only state, so
/// one instance serves the whole process.
pub struct Dispatcher {
    authorized_sender: SenderId,
    table: CommandTable,
    telemetry: Arc<dyn TelemetryProvider>,
    ops: Arc<dyn Operations>,
}

impl Dispatcher {
    pub fn new(
        authorized_sender: SenderId,
        telemetry: Arc<dyn TelemetryProvider>,
        ops: Arc<dyn Operations>,
    ) -> Self {
        Self {
            authorized_sender,
            table: CommandTable::builtin(),
            telemetry,
            ops,
        }
    }

    pub fn authorize(&self, sender_id: SenderId) -> bool {
        self.authorized_sender.is_any() || self.authorized_sender == sender_id
    }

    /// Handles events one at a time until the stream ends.
    pub async fn run<S>(&self, events: S, sink: &dyn RenderSink)
    where
        S: Stream<Item = InboundEvent>,
    {
        futures::pin_mut!(events);
        while let Some(event) = events.next().await {
            self.handle(event, sink).await;
        }
        info!("inbound event stream closed");
    }

    pub async fn handle(&self, event: InboundEvent, sink: &dyn RenderSink) {
        let sender_id = event.sender_id();
        match event {
            InboundEvent::TextMessage {
                chat_id,
                text,
                message_id,
                ..
            } => {
                if !self.authorize(sender_id) {
                    warn!(chat_id = chat_id.0, sender_id = sender_id.0, "unauthorized message");
                    self.emit(
                        sink,
                        Render::Send {
                            chat_id,
                            text: UNAUTHORIZED_TEXT.into(),
                            reply_to: Some(message_id),
                            keyboard: None,
                        },
                    )
                    .await;
                    return;
                }

                let origin = Origin::Message {
                    chat_id,
                    message_id,
                };
                match self.table.resolve_text(&text) {
                    Some(action) => {
                        debug!(chat_id = chat_id.0, ?action, "text command");
                        self.perform(action, &origin, sink).await;
                    }
                    None => {
                        debug!(chat_id = chat_id.0, %text, "unknown command");
                        self.emit(
                            sink,
                            Render::Send {
                                chat_id,
                                text: UNKNOWN_COMMAND_TEXT.into(),
                                reply_to: Some(message_id),
                                keyboard: Some(MenuView::Main.keyboard()),
                            },
                        )
                        .await;
                    }
                }
            }
            InboundEvent::CallbackAction {
                chat_id,
                query_id,
                action_id,
                origin_message,
                ..
            } => {
                if !self.authorize(sender_id) {
                    warn!(chat_id = chat_id.0, sender_id = sender_id.0, "unauthorized callback");
                    self.emit(
                        sink,
                        Render::Acknowledge {
                            query_id,
                            text: Some(UNAUTHORIZED_TEXT.into()),
                        },
                    )
                    .await;
                    return;
                }

                match self.table.resolve_callback(&action_id) {
                    Some(action) => {
                        debug!(chat_id = chat_id.0, ?action, "callback action");
                        let origin = Origin::Callback {
                            chat_id,
                            query_id,
                            message_id: origin_message,
                        };
                        self.perform(action, &origin, sink).await;
                    }
                    None => {
                        debug!(chat_id = chat_id.0, %action_id, "unknown callback action");
                        self.emit(
                            sink,
                            Render::Acknowledge {
                                query_id,
                                text: Some(UNKNOWN_ACTION_TEXT.into()),
                            },
                        )
                        .await;
                    }
                }
            }
        }
    }

    async fn perform(&self, action: Action, origin: &Origin, sink: &dyn RenderSink) {
        match action {
            Action::Show(view) => {
                self.acknowledge(origin, None, sink).await;
                self.present(origin, view.text().into(), view.keyboard(), sink)
                    .await;
            }
            Action::Help => {
                self.acknowledge(origin, None, sink).await;
                self.present(origin, help_text(), MenuView::Main.keyboard(), sink)
                    .await;
            }
            Action::Status => {
                self.acknowledge(origin, Some(LOADING_TEXT), sink).await;
                let text = self.status_text().await;
                self.present(origin, text, MenuView::Monitor.keyboard(), sink)
                    .await;
            }
            Action::Metric(metric) => {
                self.acknowledge(origin, Some(LOADING_TEXT), sink).await;
                let reading = self.telemetry.read(metric).await;
                if let Err(error) = &reading {
                    warn!(metric = metric.label(), %error, "telemetry read failed");
                }
                let text = metric_text(metric, &reading);
                self.present(origin, text, MenuView::Monitor.keyboard(), sink)
                    .await;
            }
            Action::ListTools => {
                self.acknowledge(origin, None, sink).await;
                let text = list_text("Base tools", self.ops.base_tools());
                self.present(origin, text, MenuView::Install.keyboard(), sink)
                    .await;
            }
            Action::ListUninstall => {
                self.acknowledge(origin, None, sink).await;
                let text = list_text("Uninstall tools", self.ops.base_tools());
                self.present(origin, text, MenuView::Uninstall.keyboard(), sink)
                    .await;
            }
            Action::InstallTools => self.run_operation(Operation::Install, origin, sink).await,
            Action::UninstallTools => {
                self.run_operation(Operation::Uninstall, origin, sink)
                    .await
            }
            Action::UpdateSystem => self.run_operation(Operation::Update, origin, sink).await,
        }
    }

    async fn run_operation(&self, operation: Operation, origin: &Origin, sink: &dyn RenderSink) {
        let notice = operation.notice(self.ops.base_tools());
        match origin {
            Origin::Message {
                chat_id,
                message_id,
            } => {
                self.emit(
                    sink,
                    Render::Send {
                        chat_id: *chat_id,
                        text: escape_markdown(&notice),
                        reply_to: Some(*message_id),
                        keyboard: None,
                    },
                )
                .await;
            }
            Origin::Callback { .. } => {
                let text = truncate_chars(&notice, MAX_ACK_CHARS);
                self.acknowledge(origin, Some(text.as_str()), sink).await
            }
        }

        info!(chat_id = origin.chat_id().0, ?operation, "running maintenance operation");
        let result = match operation {
            Operation::Install => self.ops.install_base_tools().await,
            Operation::Uninstall => self.ops.uninstall_base_tools().await,
            Operation::Update => self.ops.update_system().await,
        };
        if let Some(error) = &result.error {
            warn!(?operation, %error, "maintenance operation failed");
        }

        self.emit(
            sink,
            Render::Send {
                chat_id: origin.chat_id(),
                text: operation.outcome(&result),
                reply_to: origin.reply_to(),
                keyboard: None,
            },
        )
        .await;
    }

    async fn status_text(&self) -> String {
        let mut lines = vec!["*Status*".to_string()];
        for metric in Metric::ALL {
            let reading = self.telemetry.read(metric).await;
            lines.push(metric_text(metric, &reading));
        }
        lines.join("\n")
    }

    /// Callback presses get their spinner cleared; messages need nothing.
    async fn acknowledge(&self, origin: &Origin, text: Option<&str>, sink: &dyn RenderSink) {
        if let Origin::Callback { query_id, .. } = origin {
            self.emit(
                sink,
                Render::Acknowledge {
                    query_id: query_id.clone(),
                    text: text.map(str::to_string),
                },
            )
            .await;
        }
    }

    /// Replies to a message, or rewrites the message that carried the button.
    async fn present(&self, origin: &Origin, text: String, keyboard: Keyboard, sink: &dyn RenderSink) {
        let render = match origin {
            Origin::Message {
                chat_id,
                message_id,
            } => Render::Send {
                chat_id: *chat_id,
                text,
                reply_to: Some(*message_id),
                keyboard: Some(keyboard),
            },
            Origin::Callback {
                chat_id,
                message_id,
                ..
            } => Render::Edit {
                chat_id: *chat_id,
                message_id: *message_id,
                text,
                keyboard: Some(keyboard),
            },
        };
        self.emit(sink, render).await;
    }

    async fn emit(&self, sink: &dyn RenderSink, render: Render) {
        if let Err(error) = sink.render(render).await {
            warn!(%error, "failed to deliver render");
        }
    }
}

/// Error causes quote raw file contents, which may contain markup.
fn metric_text(metric: Metric, reading: &Result<String, TelemetryError>) -> String {
    escape_markdown(&metric_line(metric, reading))
}

fn list_text(title: &str, tools: &[String]) -> String {
    if tools.is_empty() {
        format!("{title} list is empty.")
    } else {
        format!("{title}: {}", tool_list(tools))
    }
}

#[cfg(test)]
#[path = "tests/dispatcher_tests.rs"]
mod tests;
