// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `downpour serve` command implementation.
//!
//! Wires SQLite storage, the three download strategies (aria2 bulk, yt-dlp
//! media, chat media), the Telegram front end, the HTTP gateway, and the
//! daily window scheduler, then parks until a shutdown signal arrives.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use downpour_aria2::{Aria2Client, Aria2Strategy};
use downpour_config::model::DownpourConfig;
use downpour_core::{
    DownloadStrategy, DownpourError, JobSpec, Notifier, NullNotifier, PollStatus, StartOutcome,
    TransferOutcome,
};
use downpour_engine::{Controller, EngineSettings, Strategies};
use downpour_gateway::ServerConfig;
use downpour_storage::Database;
use downpour_telegram::media_strategy::ChatMediaStrategy;
use downpour_telegram::notify::TelegramNotifier;
use downpour_telegram::{bot_from_config, DownpourBot};
use downpour_ytdlp::YtdlpStrategy;

use crate::scheduler;
use crate::shutdown;

/// Chat-media placeholder for headless deployments. Chat references can
/// only be captured by the Telegram front end, so without it any chat job
/// left in the queue fails immediately.
struct ChatUnavailable;

#[async_trait]
impl DownloadStrategy for ChatUnavailable {
    fn name(&self) -> &'static str {
        "chat-media"
    }

    async fn available(&self) -> bool {
        false
    }

    async fn start(&self, _spec: &JobSpec) -> Result<StartOutcome, DownpourError> {
        Ok(StartOutcome::Immediate(TransferOutcome::Failed {
            reason: "telegram front end is not configured".to_string(),
        }))
    }

    async fn poll(&self, _ext_id: &str) -> Result<PollStatus, DownpourError> {
        Ok(PollStatus::removed())
    }

    async fn cancel(&self, _ext_id: &str) -> Result<bool, DownpourError> {
        Ok(false)
    }
}

/// Runs the `downpour serve` command.
pub async fn run_serve(config: DownpourConfig) -> Result<(), DownpourError> {
    init_tracing(&config.agent.log_level);

    info!("starting downpour serve");

    let db = Database::open(&config.storage.database_path).await?;

    let bulk: Arc<dyn DownloadStrategy> = Arc::new(Aria2Strategy::new(Aria2Client::new(
        &config.aria2,
    )?));
    // Separate client for the pause-all/unpause-all control plane.
    let bulk_control = Arc::new(Aria2Client::new(&config.aria2)?);
    if !bulk.available().await {
        warn!(
            endpoint = config.aria2.endpoint.as_str(),
            "aria2 is unreachable, bulk downloads will fail until it comes up"
        );
    }

    let media: Arc<dyn DownloadStrategy> = Arc::new(YtdlpStrategy::new(config.ytdlp.clone()));

    let bot = match config.telegram.bot_token {
        Some(ref token) if !token.is_empty() => Some(bot_from_config(&config.telegram)?),
        _ => {
            info!("telegram front end skipped (no bot_token configured)");
            None
        }
    };

    let settings = EngineSettings::from_config(&config);

    let chat_media = bot.as_ref().map(|bot| {
        Arc::new(ChatMediaStrategy::new(
            bot.clone(),
            settings.download_dir.clone(),
            bulk.clone(),
        ))
    });
    let chat: Arc<dyn DownloadStrategy> = match chat_media {
        Some(ref chat) => chat.clone(),
        None => Arc::new(ChatUnavailable),
    };

    let notifier: Arc<dyn Notifier> = match bot {
        Some(ref bot) => Arc::new(TelegramNotifier::new(bot.clone())),
        None => Arc::new(NullNotifier),
    };

    let controller = Arc::new(Controller::new(
        db,
        Strategies {
            bulk: bulk.clone(),
            media,
            chat,
        },
        bulk_control,
        notifier,
        settings,
    )?);

    // Crash recovery: items orphaned mid-transfer go back to the queue.
    let recovered = controller.recover().await?;
    if recovered > 0 {
        info!(count = recovered, "re-queued items left in the running state");
    }

    // Install signal handler.
    let cancel = shutdown::install_signal_handler();

    // Telegram long polling.
    if let (Some(bot), Some(chat_media)) = (bot, chat_media) {
        let front = Arc::new(DownpourBot::new(
            bot,
            &config.telegram,
            controller.clone(),
            chat_media,
        ));
        let tg_cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = front.dispatch() => {}
                _ = tg_cancel.cancelled() => {
                    info!("telegram dispatcher shutting down");
                }
            }
        });
    }

    // HTTP gateway. Refuses to start without a bearer token rather than
    // exposing an open control surface.
    if config.gateway.enabled {
        if config.gateway.bearer_token.is_none() {
            return Err(DownpourError::Config(
                "gateway enabled but gateway.bearer_token is not set".to_string(),
            ));
        }
        let server = ServerConfig {
            host: config.gateway.host.clone(),
            port: config.gateway.port,
            bearer_token: config.gateway.bearer_token.clone(),
        };
        let gw_controller = controller.clone();
        let gw_cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                result = downpour_gateway::start_server(&server, gw_controller) => {
                    if let Err(e) = result {
                        warn!(error = %e, "gateway stopped");
                    }
                }
                _ = gw_cancel.cancelled() => {
                    info!("gateway shutting down");
                }
            }
        });
    } else {
        debug!("gateway disabled by configuration");
    }

    // Daily window scheduler.
    {
        let sched_controller = controller.clone();
        let sched_cancel = cancel.clone();
        let stop_override = config.scheduler.window_stop;
        tokio::spawn(async move {
            scheduler::run(sched_controller, stop_override, sched_cancel).await;
        });
    }

    // Anything already due (recovered items, queue left over from a crash)
    // starts without waiting for the next window.
    if controller.run_now(false).await? {
        info!("startup cycle launched");
    }

    cancel.cancelled().await;

    info!("downpour serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("downpour={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
