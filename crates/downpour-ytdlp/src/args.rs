// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line construction for the media extraction tool.

use downpour_config::model::YtdlpConfig;
use downpour_core::{CredentialMode, FormatSelection, JobSpec};

/// Exit code the tool uses when `--max-downloads` stops a playlist early.
/// Counts as success: the cap was honored, not violated.
pub const EXIT_MAX_DOWNLOADS_REACHED: i32 = 101;

/// Output template: title capped at 80 chars to stay clear of filesystem
/// name limits once the extension is appended.
const OUTPUT_TEMPLATE: &str = "%(title).80s.%(ext)s";

/// Build the full argument vector for one download attempt.
pub fn build_args(cfg: &YtdlpConfig, spec: &JobSpec, url: &str) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();

    args.push("-o".into());
    args.push(
        spec.dest_dir
            .join(OUTPUT_TEMPLATE)
            .to_string_lossy()
            .into_owned(),
    );

    args.push("-f".into());
    match spec.format {
        FormatSelection::Configured => args.push(cfg.format.clone()),
        FormatSelection::Best => args.push("best".into()),
    }
    args.push("--merge-output-format".into());
    args.push(cfg.merge_format.clone());

    args.push("--concurrent-fragments".into());
    args.push(cfg.concurrent_fragments.to_string());
    args.push("--retries".into());
    args.push(cfg.retries.to_string());
    args.push("--throttled-rate".into());
    args.push(cfg.throttled_rate.to_string());

    // One progress line per update so the monitor can stream-parse stdout.
    args.push("--newline".into());

    if spec.allow_playlist {
        args.push("--yes-playlist".into());
        args.push("--max-downloads".into());
        args.push(spec.max_items.to_string());
    } else {
        args.push("--no-playlist".into());
    }

    match spec.credentials {
        CredentialMode::Browser => {
            args.push("--cookies-from-browser".into());
            args.push(cfg.browser.clone());
        }
        CredentialMode::File => {
            if let Some(file) = &cfg.cookies_file {
                args.push("--cookies".into());
                args.push(file.clone());
            }
        }
        CredentialMode::None => {}
    }

    if spec.relax_anti_bot {
        args.push("--extractor-args".into());
        args.push("youtube:player_client=android".into());
    }

    if spec.write_subs {
        args.push("--write-subs".into());
        args.push("--sub-langs".into());
        args.push(cfg.sub_langs.clone());
    }

    args.push(url.to_string());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use downpour_core::types::JobSource;

    fn spec(url: &str) -> JobSpec {
        JobSpec {
            source: JobSource::Uri(url.to_string()),
            dest_dir: PathBuf::from("/dl/youtube"),
            headers: Vec::new(),
            allow_playlist: false,
            max_items: 24,
            format: FormatSelection::Configured,
            credentials: CredentialMode::None,
            relax_anti_bot: false,
            write_subs: false,
            subs_required: false,
        }
    }

    fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    #[test]
    fn single_video_defaults() {
        let cfg = YtdlpConfig::default();
        let args = build_args(&cfg, &spec("https://youtu.be/x"), "https://youtu.be/x");

        assert!(has_pair(&args, "-f", "bv*+ba/b"));
        assert!(has_pair(&args, "--merge-output-format", "mp4"));
        assert!(has_pair(&args, "--concurrent-fragments", "4"));
        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(!args.contains(&"--write-subs".to_string()));
        assert!(!args.contains(&"--cookies".to_string()));
        assert_eq!(args.last().unwrap(), "https://youtu.be/x");
        assert!(args
            .iter()
            .any(|a| a.ends_with("%(title).80s.%(ext)s") && a.starts_with("/dl/youtube")));
    }

    #[test]
    fn playlist_gets_capped() {
        let cfg = YtdlpConfig::default();
        let mut s = spec("https://youtube.com/playlist?list=PL1");
        s.allow_playlist = true;
        s.max_items = 10;
        let args = build_args(&cfg, &s, "https://youtube.com/playlist?list=PL1");

        assert!(args.contains(&"--yes-playlist".to_string()));
        assert!(has_pair(&args, "--max-downloads", "10"));
        assert!(!args.contains(&"--no-playlist".to_string()));
    }

    #[test]
    fn format_relaxation_overrides_configured_selector() {
        let cfg = YtdlpConfig::default();
        let mut s = spec("https://youtu.be/x");
        s.format = FormatSelection::Best;
        let args = build_args(&cfg, &s, "https://youtu.be/x");
        assert!(has_pair(&args, "-f", "best"));
    }

    #[test]
    fn credential_modes_select_cookie_flags() {
        let mut cfg = YtdlpConfig::default();
        cfg.cookies_file = Some("/tmp/c.txt".to_string());

        let mut s = spec("https://youtu.be/x");
        s.credentials = CredentialMode::Browser;
        let args = build_args(&cfg, &s, "https://youtu.be/x");
        assert!(has_pair(&args, "--cookies-from-browser", "chrome"));

        s.credentials = CredentialMode::File;
        let args = build_args(&cfg, &s, "https://youtu.be/x");
        assert!(has_pair(&args, "--cookies", "/tmp/c.txt"));

        s.credentials = CredentialMode::None;
        let args = build_args(&cfg, &s, "https://youtu.be/x");
        assert!(!args.iter().any(|a| a.starts_with("--cookies")));
    }

    #[test]
    fn anti_bot_relaxation_switches_player_client() {
        let cfg = YtdlpConfig::default();
        let mut s = spec("https://youtu.be/x");
        s.relax_anti_bot = true;
        let args = build_args(&cfg, &s, "https://youtu.be/x");
        assert!(has_pair(&args, "--extractor-args", "youtube:player_client=android"));
    }

    #[test]
    fn subtitles_only_when_requested() {
        let cfg = YtdlpConfig::default();
        let mut s = spec("https://youtu.be/x");
        s.write_subs = true;
        let args = build_args(&cfg, &s, "https://youtu.be/x");
        assert!(args.contains(&"--write-subs".to_string()));
        assert!(has_pair(&args, "--sub-langs", "en"));
    }
}
