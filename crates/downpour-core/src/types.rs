// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue, job, and transfer types shared across the Downpour workspace.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::DownpourError;

/// Kind of a queued download job. Immutable after creation; drives dispatch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// A generic http/https/magnet URL.
    Url,
    /// A `t.me/...` message link.
    TgLink,
    /// A (chat_id, message_id) reference to chat-hosted media.
    TgRef,
    /// Media forwarded directly to the bot by its owner.
    SelfRef,
}

/// Lifecycle status of a queue item.
///
/// Transitions are one-directional (`queued -> running -> done|error|paused|canceled`)
/// except for explicit retry (`error -> queued`) and resume (`paused -> queued`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Paused,
    Done,
    Error,
    Canceled,
}

impl JobStatus {
    /// True for states a queue item never leaves on its own.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error | JobStatus::Canceled)
    }
}

/// Payload of a [`JobKind::Url`] job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlJob {
    pub url: String,
    /// Explicit playlist decision. `None` means "not chosen" -- playlist-ish
    /// URLs without a choice are downloaded as a single video.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_playlist: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_chat: Option<i64>,
}

/// Payload of a [`JobKind::TgLink`] job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatLinkJob {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_chat: Option<i64>,
}

/// Payload of a [`JobKind::TgRef`] or [`JobKind::SelfRef`] job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRefJob {
    pub chat_id: i64,
    pub message_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_chat: Option<i64>,
}

/// Typed view of a queue item's JSON payload, decoded per kind.
///
/// Payloads are immutable after creation; enrichment happens only through
/// explicit item fields (`ext_id`), never by rewriting the stored document.
#[derive(Debug, Clone)]
pub enum JobPayload {
    Url(UrlJob),
    ChatLink(ChatLinkJob),
    ChatRef(ChatRefJob),
}

impl JobPayload {
    /// Decode the stored JSON document for the given kind.
    pub fn decode(kind: JobKind, raw: &str) -> Result<Self, DownpourError> {
        let payload = match kind {
            JobKind::Url => JobPayload::Url(
                serde_json::from_str(raw).map_err(|e| bad_payload(kind, e))?,
            ),
            JobKind::TgLink => JobPayload::ChatLink(
                serde_json::from_str(raw).map_err(|e| bad_payload(kind, e))?,
            ),
            JobKind::TgRef | JobKind::SelfRef => JobPayload::ChatRef(
                serde_json::from_str(raw).map_err(|e| bad_payload(kind, e))?,
            ),
        };
        Ok(payload)
    }

    /// Serialize back to the stored JSON form.
    pub fn encode(&self) -> Result<String, DownpourError> {
        let raw = match self {
            JobPayload::Url(p) => serde_json::to_string(p),
            JobPayload::ChatLink(p) => serde_json::to_string(p),
            JobPayload::ChatRef(p) => serde_json::to_string(p),
        };
        raw.map_err(|e| DownpourError::Internal(format!("payload encode failed: {e}")))
    }

    /// Notification target carried in the payload, if any.
    pub fn notify_chat(&self) -> Option<i64> {
        match self {
            JobPayload::Url(p) => p.notify_chat,
            JobPayload::ChatLink(p) => p.notify_chat,
            JobPayload::ChatRef(p) => p.notify_chat,
        }
    }
}

fn bad_payload(kind: JobKind, err: serde_json::Error) -> DownpourError {
    DownpourError::Internal(format!("invalid {kind} payload: {err}"))
}

/// A full queue row.
#[derive(Debug, Clone, Serialize)]
pub struct QueueItem {
    pub id: i64,
    pub kind: JobKind,
    /// Raw JSON payload as stored.
    pub payload: String,
    pub status: JobStatus,
    /// RFC 3339 timestamp; the item is due once `now >= scheduled_at`.
    pub scheduled_at: String,
    /// External engine identifier (aria2 GID, yt-dlp attempt id), set once
    /// the adapter has accepted the job.
    pub ext_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A due candidate as returned by the queue store selection queries.
#[derive(Debug, Clone)]
pub struct DueItem {
    pub id: i64,
    pub kind: JobKind,
    pub payload: String,
}

/// One in-flight progress row, keyed by queue item id.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressRow {
    pub qid: i64,
    /// Total byte count; `None` while unknown. Zero is never stored -- a
    /// non-positive total is treated as "unknown", not "already complete".
    pub total: Option<i64>,
    pub downloaded: i64,
    pub updated_at: String,
}

impl ProgressRow {
    /// Completion percentage, defined only when the total is known.
    pub fn percent(&self) -> Option<f64> {
        match self.total {
            Some(t) if t > 0 => Some(self.downloaded as f64 / t as f64 * 100.0),
            _ => None,
        }
    }
}

/// Why an in-flight transfer was cooperatively interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// Global pause signal -- the item is recoverable and re-queued later.
    Paused,
    /// Explicit per-item cancel -- terminal, partial output is cleaned up.
    Canceled,
}

/// Outcome of one transfer attempt.
///
/// Returned (never thrown) from the tracking loop so that pause/cancel are
/// explicit control flow rather than unwinding.
#[derive(Debug, Clone)]
pub enum TransferOutcome {
    Completed { bytes: u64 },
    Failed { reason: String },
    Interrupted(Interrupt),
}

/// Engine-reported state of an external transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum TransferState {
    Waiting,
    Active,
    Complete,
    Error,
    Removed,
}

/// Snapshot returned by [`DownloadStrategy::poll`].
#[derive(Debug, Clone)]
pub struct PollStatus {
    pub state: TransferState,
    pub total: Option<u64>,
    pub downloaded: u64,
    /// Output paths the engine has reported so far (used for cancel cleanup).
    pub files: Vec<PathBuf>,
    pub error: Option<String>,
}

impl PollStatus {
    /// A poll snapshot for a transfer the engine no longer knows about.
    pub fn removed() -> Self {
        Self {
            state: TransferState::Removed,
            total: None,
            downloaded: 0,
            files: Vec::new(),
            error: None,
        }
    }
}

/// Where the bytes for a job come from.
#[derive(Debug, Clone)]
pub enum JobSource {
    /// Plain http/https/magnet URI handed to the bulk downloader.
    Uri(String),
    /// In-memory .torrent file contents for the torrent-upload path.
    TorrentBlob(Vec<u8>),
    /// A `t.me` message link.
    ChatLink(String),
    /// A direct (chat_id, message_id) media reference.
    ChatRef { chat_id: i64, message_id: i32 },
}

/// Credential source for the media-extraction subprocess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialMode {
    Browser,
    File,
    None,
}

/// Format selection for the media-extraction subprocess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatSelection {
    /// The configured format expression (e.g. `bv*+ba/b`).
    Configured,
    /// Relaxed `best` selection, used by the format fallback.
    Best,
}

/// Fully resolved job specification handed to a strategy adapter.
///
/// The fallback ladder rewrites copies of this spec between attempts; the
/// original queue payload is never mutated.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub source: JobSource,
    pub dest_dir: PathBuf,
    /// Extra HTTP headers for the bulk downloader (resolver output).
    pub headers: Vec<(String, String)>,
    pub allow_playlist: bool,
    pub max_items: u32,
    pub format: FormatSelection,
    pub credentials: CredentialMode,
    /// Relax anti-bot protections (alternate extractor client).
    pub relax_anti_bot: bool,
    pub write_subs: bool,
    /// When true the subtitle fallback must not drop subtitles.
    pub subs_required: bool,
}

impl JobSpec {
    /// The source URL, when the job has one.
    pub fn url(&self) -> Option<&str> {
        match &self.source {
            JobSource::Uri(u) | JobSource::ChatLink(u) => Some(u),
            JobSource::TorrentBlob(_) | JobSource::ChatRef { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn job_kind_round_trips_wire_names() {
        for (kind, wire) in [
            (JobKind::Url, "url"),
            (JobKind::TgLink, "tg_link"),
            (JobKind::TgRef, "tg_ref"),
            (JobKind::SelfRef, "self_ref"),
        ] {
            assert_eq!(kind.to_string(), wire);
            assert_eq!(JobKind::from_str(wire).unwrap(), kind);
        }
    }

    #[test]
    fn status_terminality() {
        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::Error.is_terminal());
        assert!(JobStatus::Canceled.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(!JobStatus::Paused.is_terminal());
    }

    #[test]
    fn payload_decodes_per_kind() {
        let p = JobPayload::decode(
            JobKind::Url,
            r#"{"url":"https://example.com/f.iso","notify_chat":42}"#,
        )
        .unwrap();
        assert_eq!(p.notify_chat(), Some(42));

        let p = JobPayload::decode(JobKind::SelfRef, r#"{"chat_id":-100,"message_id":7}"#)
            .unwrap();
        match p {
            JobPayload::ChatRef(r) => {
                assert_eq!(r.chat_id, -100);
                assert_eq!(r.message_id, 7);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn payload_decode_rejects_garbage() {
        assert!(JobPayload::decode(JobKind::Url, "not json").is_err());
        assert!(JobPayload::decode(JobKind::TgRef, r#"{"url":"x"}"#).is_err());
    }

    #[test]
    fn percent_undefined_without_total() {
        let row = ProgressRow {
            qid: 1,
            total: None,
            downloaded: 512,
            updated_at: String::new(),
        };
        assert!(row.percent().is_none());

        let row = ProgressRow {
            qid: 1,
            total: Some(1024),
            downloaded: 512,
            updated_at: String::new(),
        };
        assert_eq!(row.percent(), Some(50.0));
    }
}
