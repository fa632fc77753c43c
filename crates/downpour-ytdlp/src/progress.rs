// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stream parsing of tool output lines.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

/// `[download]  12.3% of ~ 1.21GiB at 2.5MiB/s ETA 00:55`
static PROGRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[download\]\s+(\d+(?:\.\d+)?)% of ~?\s*([\d.]+)(B|KiB|MiB|GiB|TiB)")
        .unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

/// `[download] Destination: /dl/youtube/Title.mp4`
static DESTINATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[download\] Destination: (.+)")
        .unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

/// `[Merger] Merging formats into "/dl/youtube/Title.mp4"`
static MERGER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[Merger\] Merging formats into "(.+)""#)
        .unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

/// A fact extracted from one output line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineEvent {
    /// Byte-level progress derived from a percent-of-total line.
    Progress { total: u64, downloaded: u64 },
    /// A new output file the tool started writing.
    OutputFile(PathBuf),
}

/// Parse one stdout line. Lines that carry no usable fact yield `None`.
pub fn parse_line(line: &str) -> Option<LineEvent> {
    if let Some(caps) = DESTINATION_RE.captures(line) {
        return Some(LineEvent::OutputFile(PathBuf::from(caps[1].trim())));
    }
    if let Some(caps) = MERGER_RE.captures(line) {
        return Some(LineEvent::OutputFile(PathBuf::from(caps[1].trim())));
    }
    if let Some(caps) = PROGRESS_RE.captures(line) {
        let percent: f64 = caps[1].parse().ok()?;
        let size: f64 = caps[2].parse().ok()?;
        let total = (size * unit_multiplier(&caps[3])) as u64;
        if total == 0 {
            return None;
        }
        let downloaded = (total as f64 * percent / 100.0) as u64;
        return Some(LineEvent::Progress { total, downloaded });
    }
    None
}

fn unit_multiplier(unit: &str) -> f64 {
    match unit {
        "KiB" => 1024.0,
        "MiB" => 1024.0 * 1024.0,
        "GiB" => 1024.0 * 1024.0 * 1024.0,
        "TiB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_line_becomes_bytes() {
        let event = parse_line("[download]  50.0% of 2.00MiB at 1.00MiB/s ETA 00:01").unwrap();
        assert_eq!(
            event,
            LineEvent::Progress {
                total: 2 * 1024 * 1024,
                downloaded: 1024 * 1024,
            }
        );
    }

    #[test]
    fn estimated_total_is_accepted() {
        let event = parse_line("[download]  10.0% of ~ 1.00GiB at 5.00MiB/s ETA 03:00").unwrap();
        match event {
            LineEvent::Progress { total, downloaded } => {
                assert_eq!(total, 1024 * 1024 * 1024);
                assert_eq!(downloaded, total / 10);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn destination_and_merger_lines_yield_paths() {
        assert_eq!(
            parse_line("[download] Destination: /dl/youtube/Talk.f137.mp4"),
            Some(LineEvent::OutputFile(PathBuf::from("/dl/youtube/Talk.f137.mp4")))
        );
        assert_eq!(
            parse_line(r#"[Merger] Merging formats into "/dl/youtube/Talk.mp4""#),
            Some(LineEvent::OutputFile(PathBuf::from("/dl/youtube/Talk.mp4")))
        );
    }

    #[test]
    fn chatter_is_ignored() {
        assert!(parse_line("[youtube] x: Downloading webpage").is_none());
        assert!(parse_line("[download] 100% of 3.00MiB in 00:02").is_some());
        assert!(parse_line("").is_none());
    }
}
