// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The queue-driven execution cycle.
//!
//! One controller owns all runtime state: the single-flight cycle guard, the
//! bounded worker pool, per-item cancellation tokens, and the global pause
//! flag (persisted in storage). Front ends (Telegram, HTTP gateway, the
//! scheduler) only ever call controller methods; nothing else touches items
//! in flight.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use downpour_config::model::DownpourConfig;
use downpour_core::{
    CredentialMode, DownloadStrategy, DownpourError, DueItem, FormatSelection, Interrupt,
    JobKind, JobPayload, JobSource, JobSpec, JobStatus, Notifier, PollStatus, ProgressRow,
    QueueItem, StartOutcome, TransferOutcome, TransferState,
};
use downpour_storage::queries::{flags, progress, queue};
use downpour_storage::Database;

use crate::ladder::next_fallback;
use crate::progress::ProgressSink;
use crate::resolve::Resolver;
use crate::router::{self, UrlClass};

/// Consecutive poll failures tolerated before an attempt is declared lost.
const MAX_POLL_FAILURES: u32 = 5;

/// Engine-wide pause/unpause, beyond what per-item handles can do.
///
/// aria2 freezes transfers in place on pause; engines without that ability
/// use the no-op implementation and rely on per-item cancellation.
#[async_trait]
pub trait BulkControl: Send + Sync {
    async fn pause_all(&self) -> Result<(), DownpourError>;
    async fn unpause_all(&self) -> Result<(), DownpourError>;
}

#[async_trait]
impl BulkControl for downpour_aria2::Aria2Client {
    async fn pause_all(&self) -> Result<(), DownpourError> {
        downpour_aria2::Aria2Client::pause_all(self).await
    }
    async fn unpause_all(&self) -> Result<(), DownpourError> {
        downpour_aria2::Aria2Client::unpause_all(self).await
    }
}

/// No-op bulk control for deployments without a pausable engine.
pub struct NoBulkControl;

#[async_trait]
impl BulkControl for NoBulkControl {
    async fn pause_all(&self) -> Result<(), DownpourError> {
        Ok(())
    }
    async fn unpause_all(&self) -> Result<(), DownpourError> {
        Ok(())
    }
}

/// The download strategies the router dispatches to.
pub struct Strategies {
    /// Bulk downloads: direct URLs, magnets, torrents.
    pub bulk: Arc<dyn DownloadStrategy>,
    /// Media extraction for video pages.
    pub media: Arc<dyn DownloadStrategy>,
    /// Chat-hosted media (message links and forwarded files).
    pub chat: Arc<dyn DownloadStrategy>,
}

/// Controller tuning distilled from the loaded configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub download_dir: PathBuf,
    pub max_workers: usize,
    pub poll_interval: Duration,
    pub progress_min_interval: Duration,
    pub default_credentials: CredentialMode,
    pub write_subs: bool,
    pub subs_required: bool,
    pub max_playlist_items: u32,
    pub schedule_hour: u8,
    pub window_enabled: bool,
    pub timezone: chrono_tz::Tz,
}

impl EngineSettings {
    pub fn from_config(cfg: &DownpourConfig) -> Self {
        let default_credentials = match cfg.ytdlp.cookies_mode.as_str() {
            "browser" => CredentialMode::Browser,
            "file" => CredentialMode::File,
            _ => CredentialMode::None,
        };
        // Validation rejects bad zone names; this fallback is for settings
        // built outside the config loader.
        let timezone = cfg.agent.timezone.parse().unwrap_or(chrono_tz::Tz::UTC);
        Self {
            download_dir: PathBuf::from(&cfg.agent.download_dir),
            max_workers: cfg.engine.max_workers,
            poll_interval: Duration::from_secs(cfg.engine.poll_interval_secs),
            progress_min_interval: Duration::from_secs(cfg.engine.progress_min_interval_secs),
            default_credentials,
            write_subs: cfg.ytdlp.write_subs,
            subs_required: cfg.ytdlp.subs_required,
            max_playlist_items: cfg.ytdlp.max_playlist_items,
            schedule_hour: cfg.scheduler.hour,
            window_enabled: cfg.scheduler.window_enabled,
            timezone,
        }
    }
}

/// Aggregate queue state for status displays.
#[derive(Debug, Clone)]
pub struct StatusSummary {
    pub paused: bool,
    pub counts: Vec<(JobStatus, i64)>,
    pub in_flight: Vec<ProgressRow>,
}

pub struct Controller {
    db: Database,
    strategies: Strategies,
    bulk_control: Arc<dyn BulkControl>,
    notifier: Arc<dyn Notifier>,
    resolver: Resolver,
    settings: EngineSettings,
    run_guard: Mutex<Option<JoinHandle<()>>>,
    cancels: DashMap<i64, CancellationToken>,
}

impl Controller {
    pub fn new(
        db: Database,
        strategies: Strategies,
        bulk_control: Arc<dyn BulkControl>,
        notifier: Arc<dyn Notifier>,
        settings: EngineSettings,
    ) -> Result<Self, DownpourError> {
        Ok(Self {
            db,
            strategies,
            bulk_control,
            notifier,
            resolver: Resolver::new()?,
            settings,
            run_guard: Mutex::new(None),
            cancels: DashMap::new(),
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Startup recovery: items left running by a dead process return to the
    /// queue; they will be picked up by the next cycle.
    pub async fn recover(&self) -> Result<usize, DownpourError> {
        let n = queue::recover_running(&self.db).await?;
        if n > 0 {
            info!(recovered = n, "re-queued orphaned running items");
        }
        Ok(n)
    }

    /// Add a job to the queue. `scheduled_at = None` means due immediately.
    pub async fn enqueue(
        &self,
        kind: JobKind,
        payload: &JobPayload,
        scheduled_at: Option<&str>,
    ) -> Result<i64, DownpourError> {
        let raw = payload.encode()?;
        let id = queue::add(&self.db, kind, &raw, scheduled_at).await?;
        debug!(id, %kind, "job enqueued");
        Ok(id)
    }

    /// Launch an execution cycle unless one is already in flight.
    ///
    /// `force` admits queued items regardless of their scheduled time.
    /// Returns whether a new cycle actually started.
    pub async fn run_now(self: &Arc<Self>, force: bool) -> Result<bool, DownpourError> {
        let mut guard = self.run_guard.lock().await;
        if guard.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("cycle already running");
            return Ok(false);
        }
        let this = self.clone();
        *guard = Some(tokio::spawn(async move { this.cycle(force).await }));
        Ok(true)
    }

    /// Whether a cycle is currently executing.
    pub async fn is_running(&self) -> bool {
        let guard = self.run_guard.lock().await;
        guard.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Set the global pause flag and freeze the bulk engine. Idempotent.
    pub async fn pause(&self) -> Result<(), DownpourError> {
        flags::set_paused(&self.db, true).await?;
        if let Err(err) = self.bulk_control.pause_all().await {
            warn!(error = %err, "bulk engine pause failed");
        }
        info!("downloads paused");
        Ok(())
    }

    /// Clear the pause flag, thaw the bulk engine, re-queue paused items as
    /// due now, and kick a cycle. Returns the number of items re-queued.
    pub async fn resume(self: &Arc<Self>) -> Result<usize, DownpourError> {
        flags::set_paused(&self.db, false).await?;
        if let Err(err) = self.bulk_control.unpause_all().await {
            warn!(error = %err, "bulk engine unpause failed");
        }
        let n = queue::requeue_paused_now(&self.db).await?;
        info!(requeued = n, "downloads resumed");
        self.run_now(false).await?;
        Ok(n)
    }

    pub async fn is_paused(&self) -> Result<bool, DownpourError> {
        flags::is_paused(&self.db).await
    }

    /// Cancel one item. A running item is interrupted cooperatively; a
    /// pending one is moved straight to canceled. Returns false when the
    /// item is missing or already terminal.
    pub async fn cancel(&self, id: i64) -> Result<bool, DownpourError> {
        if let Some(token) = self.cancels.get(&id) {
            token.cancel();
            return Ok(true);
        }
        match queue::get(&self.db, id).await? {
            Some(item) if !item.status.is_terminal() => {
                queue::update_status(&self.db, id, JobStatus::Canceled).await?;
                progress::clear(&self.db, id).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub async fn list(&self, limit: i64) -> Result<Vec<QueueItem>, DownpourError> {
        queue::list(&self.db, limit).await
    }

    pub async fn status(&self) -> Result<StatusSummary, DownpourError> {
        Ok(StatusSummary {
            paused: self.is_paused().await?,
            counts: queue::count_by_status(&self.db).await?,
            in_flight: progress::all(&self.db).await?,
        })
    }

    pub async fn retry_errors(&self) -> Result<usize, DownpourError> {
        queue::retry_errors(&self.db).await
    }

    pub async fn purge_finished(&self) -> Result<usize, DownpourError> {
        queue::purge_finished(&self.db).await
    }

    /// Wipe the queue. In-flight items are cancelled first; durable flags
    /// (pause, schedule overrides) survive.
    pub async fn clear_all(&self) -> Result<usize, DownpourError> {
        for entry in self.cancels.iter() {
            entry.value().cancel();
        }
        queue::clear_all(&self.db).await
    }

    /// Effective schedule hour: kv override, else configuration.
    pub async fn schedule_hour(&self) -> Result<u8, DownpourError> {
        match flags::get(&self.db, flags::SCHEDULE_HOUR).await? {
            Some(v) => Ok(v.parse().unwrap_or(self.settings.schedule_hour)),
            None => Ok(self.settings.schedule_hour),
        }
    }

    pub async fn set_schedule_hour(&self, hour: u8) -> Result<(), DownpourError> {
        if hour > 23 {
            return Err(DownpourError::Internal(format!(
                "hour {hour} out of range 0..=23"
            )));
        }
        flags::set(&self.db, flags::SCHEDULE_HOUR, &hour.to_string()).await
    }

    /// Effective daily-window switch: kv override, else configuration.
    pub async fn window_enabled(&self) -> Result<bool, DownpourError> {
        match flags::get(&self.db, flags::WINDOW_ENABLED).await? {
            Some(v) => Ok(v == "1"),
            None => Ok(self.settings.window_enabled),
        }
    }

    pub async fn set_window_enabled(&self, enabled: bool) -> Result<(), DownpourError> {
        flags::set(
            &self.db,
            flags::WINDOW_ENABLED,
            if enabled { "1" } else { "0" },
        )
        .await
    }

    // ---- cycle internals ----

    async fn cycle(self: Arc<Self>, mut force: bool) {
        info!(force, "execution cycle started");
        loop {
            match self.is_paused().await {
                Ok(true) => {
                    info!("cycle stopping: paused");
                    break;
                }
                Ok(false) => {}
                Err(err) => {
                    error!(error = %err, "cycle stopping: pause flag unreadable");
                    break;
                }
            }
            let due = match queue::get_due(&self.db, force).await {
                Ok(due) => due,
                Err(err) => {
                    error!(error = %err, "cycle stopping: due query failed");
                    break;
                }
            };
            if due.is_empty() {
                break;
            }
            force = false;

            let semaphore = Arc::new(Semaphore::new(self.settings.max_workers));
            let mut workers = Vec::with_capacity(due.len());
            let mut pending = due.into_iter();
            while let Some(item) = pending.next() {
                let Ok(permit) = semaphore.clone().acquire_owned().await else {
                    break;
                };
                // Pause may have landed while waiting for a worker slot. Park
                // everything not yet admitted so resume re-queues it instead
                // of leaving it stranded as queued.
                if self.is_paused().await.unwrap_or(true) {
                    drop(permit);
                    for skipped in std::iter::once(item).chain(&mut pending) {
                        if let Err(err) =
                            queue::update_status(&self.db, skipped.id, JobStatus::Paused).await
                        {
                            warn!(id = skipped.id, error = %err, "failed to park pending item");
                        }
                    }
                    break;
                }
                let this = self.clone();
                workers.push(tokio::spawn(async move {
                    let _permit = permit;
                    let id = item.id;
                    if let Err(err) = this.process_item(item).await {
                        // One bad item must never take the cycle down.
                        error!(id, error = %err, "item processing failed");
                        let _ = queue::update_status(&this.db, id, JobStatus::Error).await;
                        let _ = progress::clear(&this.db, id).await;
                    }
                    this.cancels.remove(&id);
                }));
            }
            for worker in workers {
                if let Err(err) = worker.await {
                    error!(error = %err, "worker task panicked");
                }
            }
        }
        info!("execution cycle finished");
    }

    async fn process_item(&self, due: DueItem) -> Result<(), DownpourError> {
        let id = due.id;
        let token = CancellationToken::new();
        self.cancels.insert(id, token.clone());

        let item = queue::get(&self.db, id)
            .await?
            .ok_or_else(|| DownpourError::Internal(format!("item {id} vanished")))?;
        queue::update_status(&self.db, id, JobStatus::Running).await?;
        let payload = JobPayload::decode(due.kind, &due.payload)?;
        let notify_chat = payload.notify_chat();

        let outcome = self
            .run_attempts(&item, &payload, &token)
            .await
            .unwrap_or_else(|err| TransferOutcome::Failed {
                reason: err.to_string(),
            });

        match &outcome {
            TransferOutcome::Completed { bytes } => {
                queue::update_status(&self.db, id, JobStatus::Done).await?;
                progress::clear(&self.db, id).await?;
                info!(id, bytes, "download complete");
                self.notify(notify_chat, &format!("✅ #{id} done")).await;
            }
            TransferOutcome::Failed { reason } => {
                queue::update_status(&self.db, id, JobStatus::Error).await?;
                progress::clear(&self.db, id).await?;
                warn!(id, reason, "download failed");
                let short: String = reason.chars().take(300).collect();
                self.notify(notify_chat, &format!("❌ #{id} failed: {short}"))
                    .await;
            }
            TransferOutcome::Interrupted(Interrupt::Paused) => {
                // Progress stays so the resume path can show where it left off.
                queue::update_status(&self.db, id, JobStatus::Paused).await?;
                info!(id, "download paused");
            }
            TransferOutcome::Interrupted(Interrupt::Canceled) => {
                queue::update_status(&self.db, id, JobStatus::Canceled).await?;
                progress::clear(&self.db, id).await?;
                info!(id, "download canceled");
                self.notify(notify_chat, &format!("🚫 #{id} canceled")).await;
            }
        }
        Ok(())
    }

    /// Run the fallback-ladder attempt loop for one item.
    async fn run_attempts(
        &self,
        item: &QueueItem,
        payload: &JobPayload,
        token: &CancellationToken,
    ) -> Result<TransferOutcome, DownpourError> {
        let (strategy, mut spec) = match self.build_spec(payload).await? {
            Ok(pair) => pair,
            Err(reason) => return Ok(TransferOutcome::Failed { reason }),
        };

        // A transfer paused in the bulk engine can be re-attached instead of
        // re-submitted.
        let mut reattach = item.ext_id.clone();
        let mut used: Vec<&'static str> = Vec::new();
        loop {
            let outcome = self
                .attempt(item.id, strategy.as_ref(), &spec, reattach.take(), token)
                .await?;
            match outcome {
                TransferOutcome::Failed { ref reason } => {
                    if let Some((rung, next)) = next_fallback(reason, &spec, &used) {
                        info!(id = item.id, rung, "attempt failed, taking fallback");
                        self.notify(
                            payload.notify_chat(),
                            &format!("↩️ #{} retrying ({rung})", item.id),
                        )
                        .await;
                        used.push(rung);
                        spec = next;
                        continue;
                    }
                    return Ok(outcome);
                }
                other => return Ok(other),
            }
        }
    }

    /// Resolve the payload into a strategy and a job spec. The inner
    /// `Err(String)` is a user-facing rejection, not a system error.
    #[allow(clippy::type_complexity)]
    async fn build_spec(
        &self,
        payload: &JobPayload,
    ) -> Result<Result<(Arc<dyn DownloadStrategy>, JobSpec), String>, DownpourError> {
        let base = &self.settings.download_dir;
        let pair = match payload {
            JobPayload::Url(job) => {
                let dest = router::pick_outdir(base, &job.url);
                let class = router::classify(&job.url);
                if class.needs_bulk() && !self.strategies.bulk.available().await {
                    return Ok(Err(DownpourError::EngineUnavailable {
                        url: job.url.clone(),
                    }
                    .to_string()));
                }
                match class {
                    UrlClass::Unsupported(reason) => return Ok(Err(reason.to_string())),
                    UrlClass::Magnet | UrlClass::Other => (
                        self.strategies.bulk.clone(),
                        self.bulk_spec(JobSource::Uri(job.url.clone()), dest, Vec::new()),
                    ),
                    UrlClass::TorrentFile => {
                        let blob = self.resolver.fetch_torrent(&job.url).await?;
                        (
                            self.strategies.bulk.clone(),
                            self.bulk_spec(JobSource::TorrentBlob(blob), dest, Vec::new()),
                        )
                    }
                    UrlClass::Mediafire => match self.resolver.mediafire(&job.url).await? {
                        Some(link) => (
                            self.strategies.bulk.clone(),
                            self.bulk_spec(JobSource::Uri(link.url), dest, link.headers),
                        ),
                        None => {
                            return Ok(Err("no direct mediafire link found".to_string()))
                        }
                    },
                    UrlClass::Sourceforge => {
                        // Resolver failure falls back to the page URL itself.
                        let (url, headers) =
                            match self.resolver.sourceforge(&job.url).await? {
                                Some(link) => (link.url, link.headers),
                                None => (job.url.clone(), Vec::new()),
                            };
                        (
                            self.strategies.bulk.clone(),
                            self.bulk_spec(JobSource::Uri(url), dest, headers),
                        )
                    }
                    UrlClass::Video => {
                        let allow_playlist = job.allow_playlist.unwrap_or(false)
                            && router::looks_like_playlist(&job.url);
                        let max_items = job
                            .max_items
                            .unwrap_or(self.settings.max_playlist_items)
                            .min(self.settings.max_playlist_items);
                        let spec = JobSpec {
                            source: JobSource::Uri(job.url.clone()),
                            dest_dir: dest,
                            headers: Vec::new(),
                            allow_playlist,
                            max_items,
                            format: FormatSelection::Configured,
                            credentials: self.settings.default_credentials,
                            relax_anti_bot: false,
                            write_subs: self.settings.write_subs,
                            subs_required: self.settings.subs_required,
                        };
                        (self.strategies.media.clone(), spec)
                    }
                }
            }
            JobPayload::ChatLink(job) => (
                self.strategies.chat.clone(),
                self.bulk_spec(
                    JobSource::ChatLink(job.url.clone()),
                    base.clone(),
                    Vec::new(),
                ),
            ),
            JobPayload::ChatRef(job) => (
                self.strategies.chat.clone(),
                self.bulk_spec(
                    JobSource::ChatRef {
                        chat_id: job.chat_id,
                        message_id: job.message_id,
                    },
                    base.clone(),
                    Vec::new(),
                ),
            ),
        };
        Ok(Ok(pair))
    }

    fn bulk_spec(
        &self,
        source: JobSource,
        dest_dir: PathBuf,
        headers: Vec<(String, String)>,
    ) -> JobSpec {
        JobSpec {
            source,
            dest_dir,
            headers,
            allow_playlist: false,
            max_items: 1,
            format: FormatSelection::Configured,
            credentials: CredentialMode::None,
            relax_anti_bot: false,
            write_subs: false,
            subs_required: false,
        }
    }

    /// One attempt: submit (or re-attach) and track to a terminal state.
    ///
    /// Success requires observing the engine's `Complete` state; a handle
    /// that merely disappears is a failure, not a quiet success.
    async fn attempt(
        &self,
        id: i64,
        strategy: &dyn DownloadStrategy,
        spec: &JobSpec,
        reattach: Option<String>,
        token: &CancellationToken,
    ) -> Result<TransferOutcome, DownpourError> {
        let ext_id = match self.reattachable(strategy, reattach).await {
            Some(ext_id) => {
                debug!(id, ext_id, "re-attached to existing transfer");
                ext_id
            }
            None => match strategy.start(spec).await {
                Ok(StartOutcome::External(ext_id)) => ext_id,
                Ok(StartOutcome::Immediate(outcome)) => return Ok(outcome),
                Err(err) => {
                    return Ok(TransferOutcome::Failed {
                        reason: err.to_string(),
                    })
                }
            },
        };
        queue::set_ext_id(&self.db, id, &ext_id).await?;

        let mut sink = ProgressSink::new(
            self.db.clone(),
            id,
            self.settings.progress_min_interval,
        );
        let mut known_files: Vec<PathBuf> = Vec::new();
        let mut poll_failures = 0u32;

        loop {
            if token.is_cancelled() {
                let _ = strategy.cancel(&ext_id).await;
                cleanup_partials(&known_files).await;
                return Ok(TransferOutcome::Interrupted(Interrupt::Canceled));
            }
            if self.is_paused().await? {
                if !strategy.pause_in_engine() {
                    // No engine-side freeze: stop the attempt, keep partials
                    // for the tool's own resume logic.
                    let _ = strategy.cancel(&ext_id).await;
                }
                sink.flush().await?;
                return Ok(TransferOutcome::Interrupted(Interrupt::Paused));
            }

            let status = match strategy.poll(&ext_id).await {
                Ok(status) => {
                    poll_failures = 0;
                    status
                }
                Err(err) => {
                    poll_failures += 1;
                    if poll_failures >= MAX_POLL_FAILURES {
                        return Ok(TransferOutcome::Failed {
                            reason: format!("lost contact with engine: {err}"),
                        });
                    }
                    tokio::time::sleep(self.settings.poll_interval).await;
                    continue;
                }
            };

            for file in &status.files {
                if !known_files.contains(file) {
                    known_files.push(file.clone());
                }
            }
            sink.update(status.total, status.downloaded).await?;

            match status.state {
                TransferState::Complete => {
                    sink.flush().await?;
                    return Ok(TransferOutcome::Completed {
                        bytes: status.downloaded,
                    });
                }
                TransferState::Error => {
                    return Ok(TransferOutcome::Failed {
                        reason: status
                            .error
                            .unwrap_or_else(|| "engine reported an error".to_string()),
                    });
                }
                TransferState::Removed => {
                    if token.is_cancelled() {
                        cleanup_partials(&known_files).await;
                        return Ok(TransferOutcome::Interrupted(Interrupt::Canceled));
                    }
                    return Ok(TransferOutcome::Failed {
                        reason: "transfer disappeared before completion".to_string(),
                    });
                }
                TransferState::Active | TransferState::Waiting => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.settings.poll_interval) => {}
                        _ = token.cancelled() => {}
                    }
                }
            }
        }
    }

    /// Check whether a stored handle still identifies a live transfer.
    /// Only active and waiting (engine-paused) handles qualify; a handle in
    /// a terminal state must not swallow a fresh attempt.
    async fn reattachable(
        &self,
        strategy: &dyn DownloadStrategy,
        reattach: Option<String>,
    ) -> Option<String> {
        let ext_id = reattach?;
        match strategy.poll(&ext_id).await {
            Ok(PollStatus {
                state: TransferState::Active | TransferState::Waiting,
                ..
            }) => Some(ext_id),
            _ => None,
        }
    }

    async fn notify(&self, chat: Option<i64>, text: &str) {
        if let Some(chat) = chat {
            self.notifier.notify(chat, text).await;
        }
    }
}

/// Delete partial downloads and their sidecar files after a cancel.
async fn cleanup_partials(files: &[PathBuf]) {
    for file in files {
        for path in [
            file.clone(),
            sibling(file, ".aria2"),
            sibling(file, ".part"),
            sibling(file, ".ytdl"),
        ] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "removed partial"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "partial cleanup failed"),
            }
        }
    }
}

fn sibling(file: &PathBuf, suffix: &str) -> PathBuf {
    let mut name = file.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
