// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. All functions accept `&Database` and go through the
//! single tokio-rusqlite background thread.

pub mod flags;
pub mod progress;
pub mod queue;
