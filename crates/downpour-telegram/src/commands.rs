// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot command set and plain-text reply rendering.

use teloxide::utils::command::BotCommands;

use downpour_core::{JobStatus, QueueItem};
use downpour_engine::StatusSummary;

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Downpour commands:")]
pub enum Command {
    #[command(description = "show the menu")]
    Start,
    #[command(description = "show this help")]
    Help,
    #[command(description = "show the menu")]
    Menu,
    #[command(description = "run the queue now")]
    Now,
    #[command(description = "pause all downloads")]
    Pause,
    #[command(description = "resume downloads")]
    Resume,
    #[command(description = "queue status summary")]
    Status,
    #[command(description = "list recent queue items")]
    List,
    #[command(description = "re-queue failed items")]
    Retry,
    #[command(description = "remove finished items")]
    Purge,
    #[command(description = "cancel an item: /cancel <id>")]
    Cancel(String),
    #[command(description = "wipe the whole queue")]
    Clear,
    #[command(description = "show the schedule")]
    When,
    #[command(description = "set schedule: /schedule <hour> | on | off")]
    Schedule(String),
}

pub fn menu_text() -> String {
    format!("Downpour download agent.\n\n{}", Command::descriptions())
}

pub fn render_status(summary: &StatusSummary) -> String {
    let mut out = String::new();
    out.push_str(if summary.paused {
        "⏸ paused\n"
    } else {
        "▶️ active\n"
    });
    if summary.counts.is_empty() {
        out.push_str("queue is empty");
        return out;
    }
    let counts: Vec<String> = summary
        .counts
        .iter()
        .map(|(status, n)| format!("{status}: {n}"))
        .collect();
    out.push_str(&counts.join(", "));
    for row in &summary.in_flight {
        match row.percent() {
            Some(pct) => out.push_str(&format!(
                "\n#{} {:.0}% ({} / {})",
                row.qid,
                pct,
                fmt_bytes(row.downloaded),
                fmt_bytes(row.total.unwrap_or(0)),
            )),
            None => out.push_str(&format!(
                "\n#{} {} of ?",
                row.qid,
                fmt_bytes(row.downloaded)
            )),
        }
    }
    out
}

pub fn render_list(items: &[QueueItem]) -> String {
    if items.is_empty() {
        return "queue is empty".to_string();
    }
    items
        .iter()
        .map(|item| {
            format!(
                "{} #{} [{}] {}",
                status_glyph(item.status),
                item.id,
                item.kind,
                payload_summary(&item.payload)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn status_glyph(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Queued => "🕘",
        JobStatus::Running => "⬇️",
        JobStatus::Paused => "⏸",
        JobStatus::Done => "✅",
        JobStatus::Error => "❌",
        JobStatus::Canceled => "🚫",
    }
}

/// One-line payload description for list output: the URL when there is one,
/// a ref tag otherwise.
fn payload_summary(raw: &str) -> String {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(_) => return "?".to_string(),
    };
    if let Some(url) = value.get("url").and_then(|v| v.as_str()) {
        let mut short = url.to_string();
        if short.len() > 80 {
            short.truncate(77);
            short.push_str("...");
        }
        return short;
    }
    match (
        value.get("chat_id").and_then(|v| v.as_i64()),
        value.get("message_id").and_then(|v| v.as_i64()),
    ) {
        (Some(chat), Some(msg)) => format!("chat {chat} msg {msg}"),
        _ => "?".to_string(),
    }
}

pub fn fmt_bytes(n: i64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = n.max(0) as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", n.max(0), UNITS[0])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use downpour_core::{JobKind, ProgressRow};

    #[test]
    fn commands_parse_with_arguments() {
        let cmd = Command::parse("/cancel 17", "downpour_bot").unwrap();
        assert_eq!(cmd, Command::Cancel("17".to_string()));
        let cmd = Command::parse("/schedule 22", "downpour_bot").unwrap();
        assert_eq!(cmd, Command::Schedule("22".to_string()));
        let cmd = Command::parse("/now", "downpour_bot").unwrap();
        assert_eq!(cmd, Command::Now);
    }

    #[test]
    fn bytes_format_scales_units() {
        assert_eq!(fmt_bytes(512), "512 B");
        assert_eq!(fmt_bytes(2048), "2.0 KiB");
        assert_eq!(fmt_bytes(5 * 1024 * 1024), "5.0 MiB");
        assert_eq!(fmt_bytes(-1), "0 B");
    }

    #[test]
    fn status_render_shows_counts_and_progress() {
        let summary = StatusSummary {
            paused: false,
            counts: vec![(JobStatus::Queued, 2), (JobStatus::Running, 1)],
            in_flight: vec![ProgressRow {
                qid: 7,
                total: Some(1000),
                downloaded: 250,
                updated_at: String::new(),
            }],
        };
        let text = render_status(&summary);
        assert!(text.contains("▶️ active"));
        assert!(text.contains("queued: 2"));
        assert!(text.contains("#7 25%"));
    }

    #[test]
    fn list_render_shortens_long_urls() {
        let long_url = format!("https://example.com/{}", "x".repeat(100));
        let items = vec![QueueItem {
            id: 1,
            kind: JobKind::Url,
            payload: format!(r#"{{"url":"{long_url}"}}"#),
            status: JobStatus::Queued,
            scheduled_at: String::new(),
            ext_id: None,
            created_at: String::new(),
            updated_at: String::new(),
        }];
        let text = render_list(&items);
        assert!(text.contains("#1"));
        assert!(text.contains("..."));
        assert!(text.len() < 120);
    }

    #[test]
    fn list_render_describes_chat_refs() {
        let items = vec![QueueItem {
            id: 2,
            kind: JobKind::TgRef,
            payload: r#"{"chat_id":-100123,"message_id":9}"#.to_string(),
            status: JobStatus::Done,
            scheduled_at: String::new(),
            ext_id: None,
            created_at: String::new(),
            updated_at: String::new(),
        }];
        assert!(render_list(&items).contains("chat -100123 msg 9"));
    }
}
