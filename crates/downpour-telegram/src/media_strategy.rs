// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat-media downloads behind the start/poll/cancel contract.
//!
//! The Bot API only serves files the bot has actually seen, so the front end
//! registers every media message it receives in a seen-cache keyed by
//! (chat_id, message_id). `start` resolves a chat link or reference against
//! that cache, then streams the file to disk in a monitor task, using the
//! same attempt-registry shape as the subprocess strategy. Chat-delivered
//! `.torrent` files are handed to the bulk engine's torrent-upload path
//! after download and the temp file is removed.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::StreamExt;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::FileMeta;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use downpour_core::{
    DownloadStrategy, DownpourError, Interrupt, JobSource, JobSpec, PollStatus, StartOutcome,
    TransferOutcome, TransferState,
};
use downpour_engine::router::slug;

use crate::links::{parse_tme_link, TmeLink};

/// Bot API refuses `getFile` beyond this size.
const MAX_BOT_FILE_BYTES: u32 = 20 * 1024 * 1024;

/// Poll interval while mirroring a delegated torrent transfer.
const DELEGATE_POLL: Duration = Duration::from_secs(2);

/// A media attachment the bot has seen and can download later.
#[derive(Debug, Clone)]
pub struct MediaRef {
    pub file: FileMeta,
    pub file_name: String,
    pub chat_title: String,
}

#[derive(Debug)]
struct AttemptState {
    state: TransferState,
    total: Option<u64>,
    downloaded: u64,
    files: Vec<PathBuf>,
    error: Option<String>,
}

impl AttemptState {
    fn new() -> Self {
        Self {
            state: TransferState::Active,
            total: None,
            downloaded: 0,
            files: Vec::new(),
            error: None,
        }
    }
}

struct Attempt {
    cancel: CancellationToken,
    state: Mutex<AttemptState>,
}

/// Downloads chat-hosted media via the Bot API.
pub struct ChatMediaStrategy {
    bot: Bot,
    base_dir: PathBuf,
    /// Torrent-upload delegate for `.torrent` attachments.
    bulk: Arc<dyn DownloadStrategy>,
    seen: DashMap<(i64, i32), MediaRef>,
    /// Lowercased channel username -> chat id, learned from forward origins.
    aliases: DashMap<String, i64>,
    attempts: DashMap<String, Arc<Attempt>>,
    next_id: AtomicU64,
}

impl ChatMediaStrategy {
    pub fn new(bot: Bot, base_dir: PathBuf, bulk: Arc<dyn DownloadStrategy>) -> Self {
        Self {
            bot,
            base_dir,
            bulk,
            seen: DashMap::new(),
            aliases: DashMap::new(),
            attempts: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Record a media message so later references can resolve it.
    pub fn register_media(&self, chat_id: i64, message_id: i32, media: MediaRef) {
        self.seen.insert((chat_id, message_id), media);
    }

    /// Learn a channel username for public-link resolution.
    pub fn register_alias(&self, username: &str, chat_id: i64) {
        self.aliases.insert(username.to_lowercase(), chat_id);
    }

    fn lookup(&self, source: &JobSource) -> Result<MediaRef, String> {
        let key = match source {
            JobSource::ChatRef {
                chat_id,
                message_id,
            } => (*chat_id, *message_id),
            JobSource::ChatLink(url) => match parse_tme_link(url) {
                Some(TmeLink::Internal {
                    chat_id,
                    message_id,
                }) => (chat_id, message_id),
                Some(TmeLink::Public {
                    username,
                    message_id,
                }) => match self.aliases.get(&username.to_lowercase()) {
                    Some(chat_id) => (*chat_id, message_id),
                    None => {
                        return Err(format!(
                            "unknown channel @{username}; forward a message from it first"
                        ))
                    }
                },
                None => return Err(format!("not a t.me message link: {url}")),
            },
            _ => return Err("not a chat media source".to_string()),
        };
        self.seen.get(&key).map(|m| m.clone()).ok_or_else(|| {
            "message media not seen by the bot; forward it to the bot first".to_string()
        })
    }
}

#[async_trait]
impl DownloadStrategy for ChatMediaStrategy {
    fn name(&self) -> &'static str {
        "chat-media"
    }

    async fn start(&self, spec: &JobSpec) -> Result<StartOutcome, DownpourError> {
        let media = match self.lookup(&spec.source) {
            Ok(media) => media,
            Err(reason) => {
                return Ok(StartOutcome::Immediate(TransferOutcome::Failed { reason }))
            }
        };
        if media.file.size > MAX_BOT_FILE_BYTES {
            return Ok(StartOutcome::Immediate(TransferOutcome::Failed {
                reason: format!(
                    "{} exceeds the Bot API download limit ({} bytes)",
                    media.file_name, media.file.size
                ),
            }));
        }

        let dest_dir = self.base_dir.join(slug(&media.chat_title));
        tokio::fs::create_dir_all(&dest_dir)
            .await
            .map_err(|e| DownpourError::Internal(format!("create dest dir: {e}")))?;

        let id = format!("chat-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let attempt = Arc::new(Attempt {
            cancel: CancellationToken::new(),
            state: Mutex::new(AttemptState::new()),
        });
        self.attempts.insert(id.clone(), attempt.clone());

        debug!(attempt = %id, file = %media.file_name, "chat media download started");
        let bot = self.bot.clone();
        let bulk = self.bulk.clone();
        tokio::spawn(transfer(bot, bulk, media, dest_dir, attempt));

        Ok(StartOutcome::External(id))
    }

    async fn poll(&self, ext_id: &str) -> Result<PollStatus, DownpourError> {
        let Some(attempt) = self.attempts.get(ext_id).map(|a| a.clone()) else {
            return Ok(PollStatus::removed());
        };
        let snapshot = {
            let state = lock(&attempt);
            PollStatus {
                state: state.state,
                total: state.total,
                downloaded: state.downloaded,
                files: state.files.clone(),
                error: state.error.clone(),
            }
        };
        if matches!(
            snapshot.state,
            TransferState::Complete | TransferState::Error | TransferState::Removed
        ) {
            self.attempts.remove(ext_id);
        }
        Ok(snapshot)
    }

    async fn cancel(&self, ext_id: &str) -> Result<bool, DownpourError> {
        match self.attempts.get(ext_id) {
            Some(attempt) => {
                attempt.cancel.cancel();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Stream one file from Telegram to disk, updating the shared state.
async fn transfer(
    bot: Bot,
    bulk: Arc<dyn DownloadStrategy>,
    media: MediaRef,
    dest_dir: PathBuf,
    attempt: Arc<Attempt>,
) {
    let outcome = run_transfer(&bot, bulk, &media, &dest_dir, &attempt).await;
    let mut state = lock(&attempt);
    match outcome {
        Ok(()) => {}
        Err(reason) => {
            if attempt.cancel.is_cancelled() {
                state.state = TransferState::Removed;
            } else {
                state.state = TransferState::Error;
                state.error = Some(reason);
            }
        }
    }
}

async fn run_transfer(
    bot: &Bot,
    bulk: Arc<dyn DownloadStrategy>,
    media: &MediaRef,
    dest_dir: &PathBuf,
    attempt: &Arc<Attempt>,
) -> Result<(), String> {
    let file = bot
        .get_file(media.file.id.clone())
        .await
        .map_err(|e| format!("getFile failed: {e}"))?;

    let dest = dest_dir.join(slug(&media.file_name));
    {
        let mut state = lock(attempt);
        state.total = Some(u64::from(media.file.size));
        state.files.push(dest.clone());
    }

    let mut out = tokio::fs::File::create(&dest)
        .await
        .map_err(|e| format!("create {}: {e}", dest.display()))?;
    let mut stream = bot.download_file_stream(&file.path);
    while let Some(chunk) = stream.next().await {
        if attempt.cancel.is_cancelled() {
            drop(out);
            let _ = tokio::fs::remove_file(&dest).await;
            lock(attempt).state = TransferState::Removed;
            return Ok(());
        }
        let chunk = chunk.map_err(|e| format!("download stream: {e}"))?;
        out.write_all(&chunk)
            .await
            .map_err(|e| format!("write {}: {e}", dest.display()))?;
        lock(attempt).downloaded += chunk.len() as u64;
    }
    out.flush().await.map_err(|e| format!("flush: {e}"))?;
    drop(out);

    if is_torrent_name(&media.file_name) {
        delegate_torrent(bulk, &dest, dest_dir, attempt).await?;
    } else {
        lock(attempt).state = TransferState::Complete;
    }
    Ok(())
}

/// Hand a downloaded .torrent to the bulk engine and mirror its transfer
/// into this attempt until it reaches a terminal state.
async fn delegate_torrent(
    bulk: Arc<dyn DownloadStrategy>,
    torrent_path: &PathBuf,
    dest_dir: &PathBuf,
    attempt: &Arc<Attempt>,
) -> Result<(), String> {
    let blob = tokio::fs::read(torrent_path)
        .await
        .map_err(|e| format!("read torrent: {e}"))?;
    let _ = tokio::fs::remove_file(torrent_path).await;
    {
        // The torrent file itself is gone; contents replace it.
        let mut state = lock(attempt);
        state.files.clear();
        state.total = None;
        state.downloaded = 0;
    }

    let spec = JobSpec {
        source: JobSource::TorrentBlob(blob),
        dest_dir: dest_dir.clone(),
        headers: Vec::new(),
        allow_playlist: false,
        max_items: 1,
        format: downpour_core::FormatSelection::Configured,
        credentials: downpour_core::CredentialMode::None,
        relax_anti_bot: false,
        write_subs: false,
        subs_required: false,
    };
    let ext_id = match bulk.start(&spec).await {
        Ok(StartOutcome::External(ext_id)) => ext_id,
        Ok(StartOutcome::Immediate(TransferOutcome::Completed { bytes })) => {
            let mut state = lock(attempt);
            state.downloaded = bytes;
            state.state = TransferState::Complete;
            return Ok(());
        }
        Ok(StartOutcome::Immediate(TransferOutcome::Failed { reason })) => {
            return Err(reason)
        }
        Ok(StartOutcome::Immediate(TransferOutcome::Interrupted(Interrupt::Canceled)))
        | Ok(StartOutcome::Immediate(TransferOutcome::Interrupted(Interrupt::Paused))) => {
            lock(attempt).state = TransferState::Removed;
            return Ok(());
        }
        Err(e) => return Err(format!("torrent upload failed: {e}")),
    };

    loop {
        if attempt.cancel.is_cancelled() {
            let _ = bulk.cancel(&ext_id).await;
            lock(attempt).state = TransferState::Removed;
            return Ok(());
        }
        let status = bulk
            .poll(&ext_id)
            .await
            .map_err(|e| format!("torrent poll failed: {e}"))?;
        {
            let mut state = lock(attempt);
            state.total = status.total;
            state.downloaded = status.downloaded;
            state.files = status.files.clone();
        }
        match status.state {
            TransferState::Complete => {
                lock(attempt).state = TransferState::Complete;
                return Ok(());
            }
            TransferState::Error => {
                return Err(status
                    .error
                    .unwrap_or_else(|| "torrent transfer failed".to_string()))
            }
            TransferState::Removed => {
                warn!("delegated torrent transfer disappeared");
                return Err("torrent transfer disappeared before completion".to_string());
            }
            TransferState::Active | TransferState::Waiting => {
                tokio::time::sleep(DELEGATE_POLL).await;
            }
        }
    }
}

fn is_torrent_name(name: &str) -> bool {
    name.to_lowercase().ends_with(".torrent")
}

fn lock(attempt: &Attempt) -> std::sync::MutexGuard<'_, AttemptState> {
    attempt.state.lock().unwrap_or_else(|p| p.into_inner())
}
