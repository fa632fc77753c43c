// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Downpour download orchestrator.
//!
//! This crate provides the error type, the queue/job/transfer types, and the
//! strategy/notifier trait seams shared by every other workspace crate.

pub mod error;
pub mod traits;
pub mod types;

pub use error::DownpourError;
pub use traits::{DownloadStrategy, Notifier, NullNotifier, StartOutcome};
pub use types::{
    CredentialMode, DueItem, FormatSelection, Interrupt, JobKind, JobPayload, JobSource,
    JobSpec, JobStatus, PollStatus, ProgressRow, QueueItem, TransferOutcome, TransferState,
};
