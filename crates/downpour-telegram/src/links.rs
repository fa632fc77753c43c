// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! URL extraction from free text and `t.me` message-link parsing.

use std::sync::LazyLock;

use chrono::{Duration, Timelike, Utc};
use regex::Regex;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:https?://|magnet:\?)[^\s<>]+")
        .unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

static TME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://t\.me/(c/(\d+)|([A-Za-z0-9_]{4,}))/(\d+)")
        .unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

/// Pull every http/https/magnet URL out of a message, trimming trailing
/// punctuation that chat clients glue onto pasted links.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_RE
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches([',', '.', ')', ']', '>']).to_string())
        .collect()
}

/// A parsed `t.me` message link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TmeLink {
    /// `t.me/c/<internal>/<msg>`: private chat the bot is a member of.
    /// The internal id maps to the Bot API chat id with a `-100` prefix.
    Internal { chat_id: i64, message_id: i32 },
    /// `t.me/<username>/<msg>`: public channel, resolved via `getChat`.
    Public { username: String, message_id: i32 },
}

pub fn is_tme_link(url: &str) -> bool {
    TME_RE.is_match(url)
}

/// Parse a message link; `None` for anything that is not one.
pub fn parse_tme_link(url: &str) -> Option<TmeLink> {
    let caps = TME_RE.captures(url)?;
    let message_id: i32 = caps[4].parse().ok()?;
    if let Some(internal) = caps.get(2) {
        let chat_id: i64 = format!("-100{}", internal.as_str()).parse().ok()?;
        Some(TmeLink::Internal {
            chat_id,
            message_id,
        })
    } else {
        Some(TmeLink::Public {
            username: caps[3].to_string(),
            message_id,
        })
    }
}

/// Next occurrence of `hour:00` on the wall clock of `tz`, rendered as a
/// UTC storage-format timestamp. Today's slot if it is still ahead,
/// otherwise tomorrow's.
pub fn next_schedule_time(hour: u8, tz: chrono_tz::Tz) -> String {
    let now = Utc::now().with_timezone(&tz);
    let today = now
        .with_hour(u32::from(hour))
        .and_then(|t| t.with_minute(0))
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    let slot = if today > now {
        today
    } else {
        today + Duration::days(1)
    };
    slot.with_timezone(&Utc)
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_urls_and_magnets_from_text() {
        let urls = extract_urls(
            "get https://example.com/a.iso and magnet:?xt=urn:btih:abc123 please, \
             also (https://youtu.be/x).",
        );
        assert_eq!(
            urls,
            vec![
                "https://example.com/a.iso",
                "magnet:?xt=urn:btih:abc123",
                "https://youtu.be/x",
            ]
        );
        assert!(extract_urls("no links here").is_empty());
    }

    #[test]
    fn internal_links_get_minus_100_prefix() {
        assert_eq!(
            parse_tme_link("https://t.me/c/1234567890/42"),
            Some(TmeLink::Internal {
                chat_id: -1001234567890,
                message_id: 42,
            })
        );
    }

    #[test]
    fn public_links_carry_username() {
        assert_eq!(
            parse_tme_link("https://t.me/some_channel/7"),
            Some(TmeLink::Public {
                username: "some_channel".to_string(),
                message_id: 7,
            })
        );
    }

    #[test]
    fn non_message_links_rejected() {
        assert!(parse_tme_link("https://t.me/some_channel").is_none());
        assert!(parse_tme_link("https://example.com/c/1/2").is_none());
        assert!(!is_tme_link("https://example.com/x"));
        assert!(is_tme_link("https://t.me/c/99/1"));
    }

    #[test]
    fn schedule_time_is_storage_format() {
        let ts = next_schedule_time(3, chrono_tz::Tz::UTC);
        assert!(ts.ends_with('Z'));
        assert_eq!(&ts[11..13], "03");
        assert_eq!(ts.len(), "2026-08-25T03:00:00.000Z".len());
    }

    #[test]
    fn schedule_time_converts_local_hour_to_utc() {
        // Etc/GMT-5 is UTC+5 year-round, so 03:00 local is 22:00 UTC.
        let tz: chrono_tz::Tz = "Etc/GMT-5".parse().unwrap();
        let ts = next_schedule_time(3, tz);
        assert_eq!(&ts[11..13], "22");
        assert!(ts.ends_with('Z'));
    }
}
