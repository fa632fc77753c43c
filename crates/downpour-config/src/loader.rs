// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./downpour.toml` > `~/.config/downpour/downpour.toml` >
//! `/etc/downpour/downpour.toml` with environment variable overrides via the
//! `DOWNPOUR_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::DownpourConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/downpour/downpour.toml` (system-wide)
/// 3. `~/.config/downpour/downpour.toml` (user XDG config)
/// 4. `./downpour.toml` (local directory)
/// 5. `DOWNPOUR_*` environment variables
pub fn load_config() -> Result<DownpourConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DownpourConfig::default()))
        .merge(Toml::file("/etc/downpour/downpour.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("downpour/downpour.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("downpour.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<DownpourConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DownpourConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<DownpourConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DownpourConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `DOWNPOUR_TELEGRAM_BOT_TOKEN` must map to
/// `telegram.bot_token`, not `telegram.bot.token`.
fn env_provider() -> Env {
    Env::prefixed("DOWNPOUR_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: DOWNPOUR_ARIA2_TIMEOUT_SECS -> "aria2_timeout_secs"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("scheduler_", "scheduler.", 1)
            .replacen("engine_", "engine.", 1)
            .replacen("aria2_", "aria2.", 1)
            .replacen("ytdlp_", "ytdlp.", 1)
            .replacen("telegram_", "telegram.", 1)
            .replacen("gateway_", "gateway.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_extract_cleanly() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.agent.name, "downpour");
        assert_eq!(config.engine.max_workers, 2);
        assert_eq!(config.scheduler.hour, 3);
        assert_eq!(config.aria2.endpoint, "http://127.0.0.1:6800/jsonrpc");
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
[engine]
max_workers = 4

[ytdlp]
format = "best"
"#,
        )
        .unwrap();
        assert_eq!(config.engine.max_workers, 4);
        assert_eq!(config.ytdlp.format, "best");
        // untouched sections keep compiled defaults
        assert_eq!(config.ytdlp.merge_format, "mp4");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = load_config_from_str(
            r#"
[engine]
max_wrokers = 4
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn env_var_maps_to_nested_key() {
        // SAFETY: serialized test, no concurrent env access.
        unsafe {
            std::env::set_var("DOWNPOUR_TELEGRAM_BOT_TOKEN", "123:abc");
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("downpour.toml");
        std::fs::write(&path, "").unwrap();
        let config = load_config_from_path(&path).unwrap();
        unsafe {
            std::env::remove_var("DOWNPOUR_TELEGRAM_BOT_TOKEN");
        }
        assert_eq!(config.telegram.bot_token.as_deref(), Some("123:abc"));
    }
}
