// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the execution cycle and the download engines.

use async_trait::async_trait;

use crate::error::DownpourError;
use crate::types::{JobSpec, PollStatus, TransferOutcome};

/// How a strategy acknowledged a started job.
#[derive(Debug, Clone)]
pub enum StartOutcome {
    /// The engine accepted the job and returned a handle for poll/cancel.
    External(String),
    /// The job resolved synchronously (e.g. an empty chat message).
    Immediate(TransferOutcome),
}

/// One download engine (aria2, yt-dlp, chat media) behind a uniform
/// start/poll/cancel contract.
///
/// The controller owns retries and the fallback ladder; a strategy only
/// reports per-attempt success, failure, and diagnostic text.
#[async_trait]
pub trait DownloadStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Reachability check. Strategies that cannot cheaply tell report `true`.
    async fn available(&self) -> bool {
        true
    }

    /// Submit the job to the engine.
    async fn start(&self, spec: &JobSpec) -> Result<StartOutcome, DownpourError>;

    /// Snapshot the transfer identified by a handle from [`StartOutcome::External`].
    ///
    /// A handle the engine no longer knows about yields
    /// [`PollStatus::removed`], not an error.
    async fn poll(&self, ext_id: &str) -> Result<PollStatus, DownpourError>;

    /// Ask the engine to terminate the transfer. Returns whether the engine
    /// acknowledged the cancellation.
    async fn cancel(&self, ext_id: &str) -> Result<bool, DownpourError>;

    /// Whether the engine freezes transfers in place on a global pause.
    /// When false, pausing an in-flight item falls back to cancelling the
    /// attempt and keeping partial output.
    fn pause_in_engine(&self) -> bool {
        false
    }
}

/// Best-effort outbound notification sink (Telegram chat, log, ...).
///
/// Delivery failures are the notifier's problem: implementations log and
/// swallow them so they can never abort a download cycle.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, chat: i64, text: &str);
}

/// Notifier that drops everything. Used when no front end is attached.
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, _chat: i64, _text: &str) {}
}
