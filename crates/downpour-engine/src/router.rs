// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! URL classification and output directory layout.

use std::path::{Path, PathBuf};

use url::Url;

/// Closed routing decision for a URL job. Every URL lands in exactly one
/// class; dispatch is a match, not a chain of substring probes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlClass {
    /// `magnet:` link handed straight to the bulk downloader.
    Magnet,
    /// Link to a .torrent file: fetched first, then uploaded to the engine.
    TorrentFile,
    /// Media page for the extraction subprocess.
    Video,
    /// mediafire.com file page needing direct-link resolution.
    Mediafire,
    /// sourceforge.net mirror page needing redirect resolution.
    Sourceforge,
    /// Known-unsupported service; fails fast with a clear reason.
    Unsupported(&'static str),
    /// Anything else: direct HTTP download.
    Other,
}

impl UrlClass {
    /// Whether this class is served by the bulk engine.
    pub fn needs_bulk(&self) -> bool {
        matches!(
            self,
            UrlClass::Magnet
                | UrlClass::TorrentFile
                | UrlClass::Mediafire
                | UrlClass::Sourceforge
                | UrlClass::Other
        )
    }
}

const YOUTUBE_MARKERS: &[&str] = &[
    "youtube.com/watch",
    "youtu.be/",
    "youtube.com/playlist",
    "youtube.com/shorts",
    "youtube.com/channel/",
    "youtube.com/@",
    "youtube.com/c/",
];

/// Classify a URL for dispatch.
pub fn classify(url: &str) -> UrlClass {
    let low = url.to_lowercase();
    if low.starts_with("magnet:") {
        return UrlClass::Magnet;
    }
    if low.contains("mega.nz/") {
        return UrlClass::Unsupported("mega.nz is not supported");
    }
    if low.ends_with(".torrent") {
        return UrlClass::TorrentFile;
    }
    if YOUTUBE_MARKERS.iter().any(|m| low.contains(m)) {
        return UrlClass::Video;
    }
    if low.contains("mediafire.com/file/") {
        return UrlClass::Mediafire;
    }
    if low.contains("sourceforge.net/") {
        return UrlClass::Sourceforge;
    }
    UrlClass::Other
}

/// Whether the URL looks like a playlist rather than a single video.
pub fn looks_like_playlist(url: &str) -> bool {
    let low = url.to_lowercase();
    low.contains("list=") || low.contains("start_radio") || low.contains("/playlist")
}

/// Filesystem-safe slug: alphanumerics plus ` ._-+`, runs of whitespace
/// collapsed.
pub fn slug(name: &str) -> String {
    let mapped: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || " ._-+".contains(c) {
                c
            } else {
                '_'
            }
        })
        .collect();
    let collapsed = mapped.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        "misc".to_string()
    } else {
        collapsed
    }
}

/// Destination directory for a URL download.
///
/// YouTube goes to `base/youtube`, torrents and magnets to `base/torrents`,
/// plain HTTP to a per-host directory. Chat media picks its own directory
/// from the chat title.
pub fn pick_outdir(base: &Path, url: &str) -> PathBuf {
    match classify(url) {
        UrlClass::Video => base.join("youtube"),
        UrlClass::Magnet | UrlClass::TorrentFile => base.join("torrents"),
        _ => {
            let host = Url::parse(url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_else(|| "http".to_string());
            let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
            base.join(slug(&host))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_covers_every_route() {
        assert_eq!(classify("magnet:?xt=urn:btih:abc123"), UrlClass::Magnet);
        assert_eq!(classify("https://example.com/f.TORRENT"), UrlClass::TorrentFile);
        assert_eq!(classify("https://youtu.be/dQw4w9WgXcQ"), UrlClass::Video);
        assert_eq!(classify("https://www.youtube.com/watch?v=x"), UrlClass::Video);
        assert_eq!(classify("https://www.youtube.com/@somechannel"), UrlClass::Video);
        assert_eq!(
            classify("https://www.mediafire.com/file/abc/tool.zip/file"),
            UrlClass::Mediafire
        );
        assert_eq!(
            classify("https://sourceforge.net/projects/x/files/y.iso/download"),
            UrlClass::Sourceforge
        );
        assert!(matches!(
            classify("https://mega.nz/file/abc"),
            UrlClass::Unsupported(_)
        ));
        assert_eq!(classify("https://example.com/big.iso"), UrlClass::Other);
    }

    #[test]
    fn bulk_classes_are_the_non_video_routes() {
        assert!(UrlClass::Magnet.needs_bulk());
        assert!(UrlClass::TorrentFile.needs_bulk());
        assert!(UrlClass::Other.needs_bulk());
        assert!(!UrlClass::Video.needs_bulk());
        assert!(!UrlClass::Unsupported("nope").needs_bulk());
    }

    #[test]
    fn playlist_detection() {
        assert!(looks_like_playlist("https://youtube.com/watch?v=x&list=PL1"));
        assert!(looks_like_playlist("https://youtube.com/playlist?list=PL1"));
        assert!(!looks_like_playlist("https://youtu.be/dQw4w9WgXcQ"));
    }

    #[test]
    fn slug_keeps_safe_chars_and_collapses_whitespace() {
        assert_eq!(slug("My Channel: S01+E02"), "My Channel_ S01+E02");
        assert_eq!(slug("  a   b  "), "a b");
        assert_eq!(slug("///"), "___");
        assert_eq!(slug(""), "misc");
        assert_eq!(slug("file_2024.tar.gz"), "file_2024.tar.gz");
    }

    #[test]
    fn outdir_layout() {
        let base = Path::new("/dl");
        assert_eq!(pick_outdir(base, "https://youtu.be/x"), PathBuf::from("/dl/youtube"));
        assert_eq!(
            pick_outdir(base, "magnet:?xt=urn:btih:abc"),
            PathBuf::from("/dl/torrents")
        );
        assert_eq!(
            pick_outdir(base, "https://example.com/f.torrent"),
            PathBuf::from("/dl/torrents")
        );
        assert_eq!(
            pick_outdir(base, "https://www.example.com/big.iso"),
            PathBuf::from("/dl/example.com")
        );
    }
}
