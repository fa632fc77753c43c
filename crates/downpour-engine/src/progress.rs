// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rate-limited persistence of transfer progress.

use std::time::{Duration, Instant};

use downpour_storage::queries::progress;
use downpour_storage::Database;

use downpour_core::DownpourError;

/// Buffers progress updates for one queue item and writes through at most
/// once per interval. The final observed values can always be flushed
/// explicitly, so a completed transfer never shows a stale percentage.
pub struct ProgressSink {
    db: Database,
    qid: i64,
    min_interval: Duration,
    last_write: Option<Instant>,
    pending: Option<(Option<i64>, i64)>,
}

impl ProgressSink {
    pub fn new(db: Database, qid: i64, min_interval: Duration) -> Self {
        Self {
            db,
            qid,
            min_interval,
            last_write: None,
            pending: None,
        }
    }

    /// Record an observation; persists when the interval has elapsed (the
    /// first observation is always persisted).
    pub async fn update(
        &mut self,
        total: Option<u64>,
        downloaded: u64,
    ) -> Result<(), DownpourError> {
        let row = (
            total.and_then(|t| i64::try_from(t).ok()),
            i64::try_from(downloaded).unwrap_or(i64::MAX),
        );
        self.pending = Some(row);

        let due = match self.last_write {
            None => true,
            Some(at) => at.elapsed() >= self.min_interval,
        };
        if due {
            self.flush().await?;
        }
        Ok(())
    }

    /// Persist the latest observation immediately.
    pub async fn flush(&mut self) -> Result<(), DownpourError> {
        if let Some((total, downloaded)) = self.pending.take() {
            progress::upsert(&self.db, self.qid, total, downloaded).await?;
            self.last_write = Some(Instant::now());
        }
        Ok(())
    }
}
