// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as hour ranges and cross-field requirements.

use crate::model::DownpourConfig;
use crate::ConfigError;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &DownpourConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.agent.download_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "agent.download_dir must not be empty".to_string(),
        });
    }

    if config.agent.timezone.parse::<chrono_tz::Tz>().is_err() {
        errors.push(ConfigError::Validation {
            message: format!(
                "agent.timezone must be an IANA zone name, got `{}`",
                config.agent.timezone
            ),
        });
    }

    if config.scheduler.hour > 23 {
        errors.push(ConfigError::Validation {
            message: format!(
                "scheduler.hour must be in 0..=23, got {}",
                config.scheduler.hour
            ),
        });
    }

    if let Some(stop) = config.scheduler.window_stop
        && stop > 23
    {
        errors.push(ConfigError::Validation {
            message: format!("scheduler.window_stop must be in 0..=23, got {stop}"),
        });
    }

    if config.engine.max_workers == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.max_workers must be at least 1".to_string(),
        });
    }

    if config.engine.poll_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.poll_interval_secs must be at least 1".to_string(),
        });
    }

    if config.aria2.endpoint.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "aria2.endpoint must not be empty".to_string(),
        });
    }

    match config.ytdlp.cookies_mode.as_str() {
        "browser" | "file" | "none" => {}
        other => errors.push(ConfigError::Validation {
            message: format!(
                "ytdlp.cookies_mode must be one of `browser`, `file`, `none`, got `{other}`"
            ),
        }),
    }

    if config.ytdlp.cookies_mode == "file" && config.ytdlp.cookies_file.is_none() {
        errors.push(ConfigError::Validation {
            message: "ytdlp.cookies_file is required when ytdlp.cookies_mode = \"file\""
                .to_string(),
        });
    }

    if config.gateway.enabled {
        let token_ok = config
            .gateway
            .bearer_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty());
        if !token_ok {
            errors.push(ConfigError::Validation {
                message: "gateway.bearer_token is required when gateway.enabled = true"
                    .to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = DownpourConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_workers_fails_validation() {
        let mut config = DownpourConfig::default();
        config.engine.max_workers = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("max_workers"))));
    }

    #[test]
    fn out_of_range_hour_fails_validation() {
        let mut config = DownpourConfig::default();
        config.scheduler.hour = 24;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("scheduler.hour"))));
    }

    #[test]
    fn unknown_timezone_fails_validation() {
        let mut config = DownpourConfig::default();
        config.agent.timezone = "Mars/Olympus_Mons".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("agent.timezone"))));

        config.agent.timezone = "Europe/Berlin".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn file_cookies_require_a_path() {
        let mut config = DownpourConfig::default();
        config.ytdlp.cookies_mode = "file".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("cookies_file"))));

        config.ytdlp.cookies_file = Some("/tmp/cookies.txt".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn enabled_gateway_requires_token() {
        let mut config = DownpourConfig::default();
        config.gateway.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("bearer_token"))));

        config.gateway.bearer_token = Some("s3cret".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn stop_hour_defaults_three_hours_later() {
        let config = DownpourConfig::default();
        assert_eq!(config.scheduler.stop_hour(), 6);

        let mut config = DownpourConfig::default();
        config.scheduler.hour = 23;
        assert_eq!(config.scheduler.stop_hour(), 2);
    }
}
