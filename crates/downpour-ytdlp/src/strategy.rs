// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subprocess lifecycle management behind the start/poll/cancel contract.
//!
//! Each `start` spawns the tool and a monitor task, keyed by a synthetic
//! attempt id. `poll` reads the monitor's shared snapshot; `cancel` fires the
//! attempt's cancellation token. The monitor owns the child: it streams
//! stdout for progress, enforces the wall-clock cap, and escalates from
//! SIGKILL-after-grace on cancellation.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use downpour_config::model::YtdlpConfig;
use downpour_core::{
    DownloadStrategy, DownpourError, JobSpec, PollStatus, StartOutcome, TransferState,
};

use crate::args::{build_args, EXIT_MAX_DOWNLOADS_REACHED};
use crate::progress::{parse_line, LineEvent};

/// How long a cancelled child gets to exit before SIGKILL.
const KILL_GRACE: Duration = Duration::from_secs(5);

/// Diagnostic tail length kept per attempt.
const TAIL_LINES: usize = 30;

#[derive(Debug)]
struct AttemptState {
    state: TransferState,
    total: Option<u64>,
    downloaded: u64,
    files: Vec<PathBuf>,
    error: Option<String>,
    tail: VecDeque<String>,
}

impl AttemptState {
    fn new() -> Self {
        Self {
            state: TransferState::Active,
            total: None,
            downloaded: 0,
            files: Vec::new(),
            error: None,
            tail: VecDeque::with_capacity(TAIL_LINES),
        }
    }

    fn push_tail(&mut self, line: &str) {
        if self.tail.len() == TAIL_LINES {
            self.tail.pop_front();
        }
        self.tail.push_back(line.to_string());
    }

    fn tail_text(&self) -> String {
        self.tail.iter().cloned().collect::<Vec<_>>().join("\n")
    }
}

struct Attempt {
    cancel: CancellationToken,
    state: Mutex<AttemptState>,
}

/// Media extraction via a yt-dlp subprocess.
pub struct YtdlpStrategy {
    cfg: YtdlpConfig,
    attempts: DashMap<String, Arc<Attempt>>,
    next_id: AtomicU64,
}

impl YtdlpStrategy {
    pub fn new(cfg: YtdlpConfig) -> Self {
        Self {
            cfg,
            attempts: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

}

#[async_trait]
impl DownloadStrategy for YtdlpStrategy {
    fn name(&self) -> &'static str {
        "ytdlp"
    }

    async fn start(&self, spec: &JobSpec) -> Result<StartOutcome, DownpourError> {
        let url = spec.url().ok_or_else(|| {
            DownpourError::Internal("media extraction needs a source URL".to_string())
        })?;
        let args = build_args(&self.cfg, spec, url);

        std::fs::create_dir_all(&spec.dest_dir)
            .map_err(|e| DownpourError::Subprocess(format!("create dest dir: {e}")))?;

        let child = Command::new(&self.cfg.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DownpourError::Subprocess(format!("failed to spawn {}: {e}", self.cfg.binary))
            })?;

        let id = format!("ytdlp-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let attempt = Arc::new(Attempt {
            cancel: CancellationToken::new(),
            state: Mutex::new(AttemptState::new()),
        });
        self.attempts.insert(id.clone(), attempt.clone());

        debug!(attempt = %id, url, "media extraction started");
        let max_run = Duration::from_secs(self.cfg.max_run_secs);
        tokio::spawn(monitor(attempt, child, max_run));

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
        // Terminal attempts are forgotten once observed.
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

/// Drive one child process to completion, updating the shared state.
async fn monitor(attempt: Arc<Attempt>, mut child: Child, max_run: Duration) {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let out_task = {
        let attempt = attempt.clone();
        tokio::spawn(async move {
            let Some(stdout) = stdout else { return };
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let mut state = lock(&attempt);
                state.push_tail(&line);
                match parse_line(&line) {
                    Some(LineEvent::Progress { total, downloaded }) => {
                        state.total = Some(total);
                        state.downloaded = downloaded;
                    }
                    Some(LineEvent::OutputFile(path)) => {
                        if !state.files.contains(&path) {
                            state.files.push(path);
                        }
                    }
                    None => {}
                }
            }
        })
    };
    let err_task = {
        let attempt = attempt.clone();
        tokio::spawn(async move {
            let Some(stderr) = stderr else { return };
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                lock(&attempt).push_tail(&line);
            }
        })
    };

    let mut exit = None;
    let verdict = tokio::select! {
        status = child.wait() => {
            exit = Some(status);
            Verdict::Exited
        }
        _ = attempt.cancel.cancelled() => Verdict::Cancelled,
        _ = tokio::time::sleep(max_run) => Verdict::TimedOut,
    };

    if exit.is_none() {
        if let Err(e) = child.start_kill() {
            warn!(error = %e, "failed to signal child");
        }
        let status = match tokio::time::timeout(KILL_GRACE, child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                let _ = child.kill().await;
                child.wait().await
            }
        };
        exit = Some(status);
    }

    // Let the readers drain remaining output before the final state is set.
    let _ = out_task.await;
    let _ = err_task.await;

    let mut state = lock(&attempt);
    match verdict {
        Verdict::Cancelled => {
            state.state = TransferState::Removed;
            debug!("media extraction cancelled");
        }
        Verdict::TimedOut => {
            state.state = TransferState::Error;
            state.error = Some(format!(
                "extraction exceeded wall-clock limit of {}s",
                max_run.as_secs()
            ));
        }
        Verdict::Exited => match exit {
            Some(Ok(status)) => {
                let code = status.code();
                if status.success() || code == Some(EXIT_MAX_DOWNLOADS_REACHED) {
                    state.state = TransferState::Complete;
                } else {
                    let tail = state.tail_text();
                    state.state = TransferState::Error;
                    state.error = Some(format!(
                        "exit code {}: {tail}",
                        code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
                    ));
                }
            }
            Some(Err(e)) => {
                state.state = TransferState::Error;
                state.error = Some(format!("wait failed: {e}"));
            }
            None => unreachable!("exited verdict always carries a status"),
        },
    }
}

#[derive(Clone, Copy)]
enum Verdict {
    Exited,
    Cancelled,
    TimedOut,
}

fn lock(attempt: &Attempt) -> std::sync::MutexGuard<'_, AttemptState> {
    attempt.state.lock().unwrap_or_else(|p| p.into_inner())
}
