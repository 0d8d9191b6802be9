use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use bot_core::Dispatcher;
use clap::Parser;
use ops::{OpsController, PrivilegedExecutor};
use shared::domain::SenderId;
use telegram::{poll_loop, TelegramApi, TelegramSink};
use telemetry::ProcTelemetry;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::load_settings;

const EVENT_BUFFER: usize = 64;

#[derive(Parser, Debug)]
#[command(name = "host-bot", about = "Administer this host from a Telegram chat")]
struct Args {
    /// TOML settings file. Without it, `bot.toml` is read when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log filter such as `info` or `debug,reqwest=warn`; overrides RUST_LOG.
    #[arg(long)]
    log_filter: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(args.log_filter.as_deref()))
        .init();

    let settings = load_settings(args.config.as_deref()).context("failed to load settings")?;
    settings.validate().context("invalid settings")?;

    let api = Arc::new(TelegramApi::with_base_url(
        &settings.bot_token,
        &settings.api_url,
    ));
    let me = api
        .get_me()
        .await
        .context("failed to establish bot session")?;
    info!(
        bot_id = me.id,
        username = me.username.as_deref().unwrap_or_default(),
        menu_style = ?settings.menu_style,
        "bot session established"
    );
    if settings.admin_chat_id == 0 {
        warn!("ADMIN_CHAT_ID is not set, every sender is authorized");
    }

    let executor = PrivilegedExecutor::new([settings.package_manager.clone()])
        .with_timeout(settings.command_timeout());
    let ops = OpsController::new(
        executor,
        settings.package_manager.clone(),
        settings.base_tools.clone(),
    );
    let dispatcher = Dispatcher::new(
        SenderId(settings.admin_chat_id),
        Arc::new(ProcTelemetry::new()),
        Arc::new(ops),
    );
    let sink = TelegramSink::new(api.clone(), settings.menu_style);

    let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let poller = tokio::spawn(poll_loop(
        api,
        settings.poll_timeout_seconds,
        events_tx,
        cancel_rx,
    ));
    let shutdown = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown requested"),
            Err(error) => {
                warn!(%error, "cannot listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        }
        let _ = cancel_tx.send(true);
    });

    dispatcher.run(ReceiverStream::new(events_rx), &sink).await;
    shutdown.abort();

    match poller.await.context("poller task failed")? {
        Ok(()) => {
            info!("bot stopped");
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "telegram transport failed");
            Err(err).context("telegram polling stopped")
        }
    }
}

fn log_filter(cli: Option<&str>) -> EnvFilter {
    match cli {
        Some(filter) => EnvFilter::new(filter),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
