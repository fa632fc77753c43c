// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Download orchestration: URL routing, direct-link resolution, the fallback
//! ladder, and the queue-driven execution cycle.

pub mod cycle;
pub mod ladder;
pub mod progress;
pub mod resolve;
pub mod router;

pub use cycle::{
    BulkControl, Controller, EngineSettings, NoBulkControl, StatusSummary, Strategies,
};
pub use resolve::{ResolvedLink, Resolver};
pub use router::UrlClass;
