// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! yt-dlp adapter: media extraction through a managed subprocess with
//! streamed progress, a wall-clock cap, and cooperative cancellation.

pub mod args;
pub mod progress;
pub mod strategy;

pub use args::EXIT_MAX_DOWNLOADS_REACHED;
pub use strategy::YtdlpStrategy;
