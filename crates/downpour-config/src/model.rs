// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so unrecognized keys are
//! rejected at startup instead of being silently ignored.

use serde::{Deserialize, Serialize};

/// Top-level Downpour configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with `DOWNPOUR_*`
/// environment variable overrides. All sections default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DownpourConfig {
    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Daily execution window settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Execution cycle controller settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// aria2 JSON-RPC engine settings.
    #[serde(default)]
    pub aria2: Aria2Config,

    /// yt-dlp subprocess settings.
    #[serde(default)]
    pub ytdlp: YtdlpConfig,

    /// Telegram bot front-end settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// HTTP control gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Agent identity and path configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the agent.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Base directory for completed downloads.
    #[serde(default = "default_download_dir")]
    pub download_dir: String,

    /// IANA timezone name the daily window is interpreted in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            download_dir: default_download_dir(),
            timezone: default_timezone(),
        }
    }
}

/// SQLite storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Daily execution window.
///
/// When `window_enabled` is true, a cycle launches at `hour:00` and the
/// global pause flag is set at `window_stop:00`. Flags persisted in the kv
/// table override these compiled defaults at runtime.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Hour of day (0-23) the scheduled cycle starts.
    #[serde(default = "default_schedule_hour")]
    pub hour: u8,

    /// Whether the daily window is active (false means 24/7 manual mode).
    #[serde(default = "default_true")]
    pub window_enabled: bool,

    /// Hour of day (0-23) the window closes by setting the pause flag.
    /// Defaults to three hours after `hour`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_stop: Option<u8>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            hour: default_schedule_hour(),
            window_enabled: true,
            window_stop: None,
        }
    }
}

impl SchedulerConfig {
    /// Effective stop hour, defaulting to a three-hour window.
    pub fn stop_hour(&self) -> u8 {
        self.window_stop.unwrap_or((self.hour + 3) % 24)
    }
}

/// Execution cycle controller tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Bounded worker pool size (simultaneous in-flight downloads).
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Poll interval for in-flight transfer tracking, in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Minimum interval between persisted progress writes, in seconds.
    #[serde(default = "default_progress_interval")]
    pub progress_min_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            poll_interval_secs: default_poll_interval(),
            progress_min_interval_secs: default_progress_interval(),
        }
    }
}

/// aria2 JSON-RPC endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Aria2Config {
    #[serde(default = "default_aria2_endpoint")]
    pub endpoint: String,

    /// RPC secret, sent as `token:<secret>` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// Per-call HTTP timeout in seconds.
    #[serde(default = "default_aria2_timeout")]
    pub timeout_secs: u64,
}

impl Default for Aria2Config {
    fn default() -> Self {
        Self {
            endpoint: default_aria2_endpoint(),
            secret: None,
            timeout_secs: default_aria2_timeout(),
        }
    }
}

/// yt-dlp subprocess configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct YtdlpConfig {
    /// Binary name or path.
    #[serde(default = "default_ytdlp_binary")]
    pub binary: String,

    /// Format selector expression.
    #[serde(default = "default_ytdlp_format")]
    pub format: String,

    #[serde(default = "default_merge_format")]
    pub merge_format: String,

    #[serde(default = "default_concurrent_fragments")]
    pub concurrent_fragments: u32,

    /// Retries passed to the tool itself (distinct from the fallback ladder).
    #[serde(default = "default_ytdlp_retries")]
    pub retries: u32,

    /// Throttled-rate threshold in bytes/s.
    #[serde(default = "default_throttled_rate")]
    pub throttled_rate: u64,

    /// Credential source: "browser", "file", or "none".
    #[serde(default = "default_cookies_mode")]
    pub cookies_mode: String,

    /// Path to a Netscape cookies file (cookies_mode = "file").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies_file: Option<String>,

    /// Browser profile to read cookies from (cookies_mode = "browser").
    #[serde(default = "default_browser")]
    pub browser: String,

    #[serde(default)]
    pub write_subs: bool,

    /// When true the subtitle fallback is disabled -- failed subtitles fail
    /// the attempt.
    #[serde(default)]
    pub subs_required: bool,

    #[serde(default = "default_sub_langs")]
    pub sub_langs: String,

    /// Cap on playlist items when a playlist download is allowed.
    #[serde(default = "default_max_playlist_items")]
    pub max_playlist_items: u32,

    /// Wall-clock cap per attempt in seconds.
    #[serde(default = "default_max_run_secs")]
    pub max_run_secs: u64,
}

impl Default for YtdlpConfig {
    fn default() -> Self {
        Self {
            binary: default_ytdlp_binary(),
            format: default_ytdlp_format(),
            merge_format: default_merge_format(),
            concurrent_fragments: default_concurrent_fragments(),
            retries: default_ytdlp_retries(),
            throttled_rate: default_throttled_rate(),
            cookies_mode: default_cookies_mode(),
            cookies_file: None,
            browser: default_browser(),
            write_subs: false,
            subs_required: false,
            sub_langs: default_sub_langs(),
            max_playlist_items: default_max_playlist_items(),
            max_run_secs: default_max_run_secs(),
        }
    }
}

/// Telegram bot front-end configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot API token. Required when the Telegram front end is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,

    /// User IDs or usernames allowed to control the bot.
    /// Empty list rejects everyone (secure default).
    #[serde(default)]
    pub allowed_users: Vec<String>,
}

/// HTTP control gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token required on every request when the gateway is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
        }
    }
}

fn default_agent_name() -> String {
    "downpour".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_download_dir() -> String {
    "./downloads".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_database_path() -> String {
    "./data/queue.db".to_string()
}

fn default_schedule_hour() -> u8 {
    3
}

fn default_true() -> bool {
    true
}

fn default_max_workers() -> usize {
    2
}

fn default_poll_interval() -> u64 {
    2
}

fn default_progress_interval() -> u64 {
    3
}

fn default_aria2_endpoint() -> String {
    "http://127.0.0.1:6800/jsonrpc".to_string()
}

fn default_aria2_timeout() -> u64 {
    10
}

fn default_ytdlp_binary() -> String {
    "yt-dlp".to_string()
}

fn default_ytdlp_format() -> String {
    "bv*+ba/b".to_string()
}

fn default_merge_format() -> String {
    "mp4".to_string()
}

fn default_concurrent_fragments() -> u32 {
    4
}

fn default_ytdlp_retries() -> u32 {
    3
}

fn default_throttled_rate() -> u64 {
    1_048_576
}

fn default_cookies_mode() -> String {
    "none".to_string()
}

fn default_browser() -> String {
    "chrome".to_string()
}

fn default_sub_langs() -> String {
    "en".to_string()
}

fn default_max_playlist_items() -> u32 {
    24
}

fn default_max_run_secs() -> u64 {
    600
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8080
}
