// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Downpour download orchestrator.

use thiserror::Error;

/// The primary error type used across all Downpour crates.
#[derive(Debug, Error)]
pub enum DownpourError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database open, query failure, serialization).
    ///
    /// Storage failures are fatal to the operation attempting them and must
    /// propagate -- a silently lost status write would desynchronize the
    /// queue state machine from reality.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// RPC transport or protocol errors from the aria2 engine.
    #[error("rpc error: {message}")]
    Rpc {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Channel adapter errors (Telegram API failure, media resolution).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Subprocess launch or execution errors from the yt-dlp runner.
    #[error("subprocess error: {0}")]
    Subprocess(String),

    /// No download engine can handle the given job.
    #[error("no download engine available for {url}")]
    EngineUnavailable { url: String },

    /// Operation exceeded its wall-clock budget.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DownpourError {
    /// Wrap an arbitrary error as a storage failure.
    pub fn storage<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        DownpourError::Storage {
            source: Box::new(err),
        }
    }
}
