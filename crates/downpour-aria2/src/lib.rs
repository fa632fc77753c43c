// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! aria2 JSON-RPC adapter: bulk downloads of direct URLs, magnets, and
//! torrents through an external aria2 daemon.

pub mod client;
pub mod strategy;

pub use client::Aria2Client;
pub use strategy::Aria2Strategy;
