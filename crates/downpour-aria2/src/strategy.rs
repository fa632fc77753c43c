// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`DownloadStrategy`] implementation backed by the aria2 engine.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use downpour_core::{
    DownloadStrategy, DownpourError, JobSpec, PollStatus, StartOutcome, TransferState,
};
use downpour_core::types::JobSource;

use crate::client::{Aria2Client, StatusSnapshot};

/// Bulk downloader for direct URLs, magnet links, and .torrent files.
pub struct Aria2Strategy {
    client: Aria2Client,
}

impl Aria2Strategy {
    pub fn new(client: Aria2Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DownloadStrategy for Aria2Strategy {
    fn name(&self) -> &'static str {
        "aria2"
    }

    async fn available(&self) -> bool {
        match self.client.get_version().await {
            Ok(version) => {
                debug!(version, "aria2 reachable");
                true
            }
            Err(err) => {
                debug!(error = %err, "aria2 unreachable");
                false
            }
        }
    }

    async fn start(&self, spec: &JobSpec) -> Result<StartOutcome, DownpourError> {
        let gid = match &spec.source {
            JobSource::Uri(uri) => {
                self.client
                    .add_uri(uri, &spec.dest_dir, &spec.headers)
                    .await?
            }
            JobSource::TorrentBlob(blob) => {
                self.client.add_torrent(blob, &spec.dest_dir).await?
            }
            JobSource::ChatLink(_) | JobSource::ChatRef { .. } => {
                return Err(DownpourError::Internal(
                    "chat sources cannot be handed to aria2".to_string(),
                ));
            }
        };
        Ok(StartOutcome::External(gid))
    }

    async fn poll(&self, ext_id: &str) -> Result<PollStatus, DownpourError> {
        match self.client.tell_status(ext_id).await? {
            Some(snapshot) => Ok(poll_status_from(snapshot)),
            None => Ok(PollStatus::removed()),
        }
    }

    async fn cancel(&self, ext_id: &str) -> Result<bool, DownpourError> {
        self.client.remove(ext_id).await
    }

    // pauseAll freezes transfers engine-side; paused items re-attach by GID.
    fn pause_in_engine(&self) -> bool {
        true
    }
}

fn poll_status_from(snapshot: StatusSnapshot) -> PollStatus {
    let state = match snapshot.status.as_str() {
        "active" => TransferState::Active,
        // Engine-side pause still counts as waiting from the queue's view.
        "waiting" | "paused" => TransferState::Waiting,
        "complete" => TransferState::Complete,
        "error" => TransferState::Error,
        "removed" => TransferState::Removed,
        _ => TransferState::Waiting,
    };
    let error = match state {
        TransferState::Error => Some(format!(
            "aria2 error {}: {}",
            snapshot.error_code.as_deref().unwrap_or("?"),
            snapshot.error_message.as_deref().unwrap_or("unknown"),
        )),
        _ => None,
    };
    PollStatus {
        state,
        total: (snapshot.total_length > 0).then_some(snapshot.total_length),
        downloaded: snapshot.completed_length,
        files: snapshot.file_paths.into_iter().map(PathBuf::from).collect(),
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(status: &str) -> StatusSnapshot {
        StatusSnapshot {
            status: status.to_string(),
            total_length: 100,
            completed_length: 40,
            file_paths: vec!["/dl/x.bin".to_string()],
            error_code: Some("3".to_string()),
            error_message: Some("resource not found".to_string()),
        }
    }

    #[test]
    fn engine_states_map_to_transfer_states() {
        assert_eq!(poll_status_from(snapshot("active")).state, TransferState::Active);
        assert_eq!(poll_status_from(snapshot("paused")).state, TransferState::Waiting);
        assert_eq!(poll_status_from(snapshot("complete")).state, TransferState::Complete);
        assert_eq!(poll_status_from(snapshot("removed")).state, TransferState::Removed);
    }

    #[test]
    fn error_state_carries_diagnostic() {
        let status = poll_status_from(snapshot("error"));
        assert_eq!(status.state, TransferState::Error);
        let error = status.error.unwrap();
        assert!(error.contains("3"));
        assert!(error.contains("resource not found"));
    }

    #[test]
    fn zero_total_reads_as_unknown() {
        let mut snap = snapshot("active");
        snap.total_length = 0;
        assert_eq!(poll_status_from(snap).total, None);
    }
}
