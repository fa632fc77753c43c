// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Direct-link resolvers for file-hosting pages.
//!
//! Each resolver is gated by a host allowlist: resolution fetches a
//! caller-supplied URL, and only the known hosting domains may be reached.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::debug;
use url::Url;

use downpour_core::DownpourError;
use downpour_resilience::{retry, RetryPolicy};

const MEDIAFIRE_HOSTS: &[&str] = &["mediafire.com", "www.mediafire.com"];
const SOURCEFORGE_HOSTS: &[&str] = &[
    "sourceforge.net",
    "www.sourceforge.net",
    "downloads.sourceforge.net",
    "prdownloads.sourceforge.net",
];

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// `<a id="downloadButton" href="https://download...">`
static DOWNLOAD_BUTTON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)id=["']downloadButton["'][^>]*href=["'](https?://[^"']+)["']"#)
        .unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

/// Fallback: any href pointing at a `download.*` subdomain.
static DOWNLOAD_HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)href=["'](https?://download[^"']+)["']"#)
        .unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

/// A resolved direct URL plus the headers the bulk downloader should send.
#[derive(Debug, Clone)]
pub struct ResolvedLink {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

pub struct Resolver {
    http: reqwest::Client,
}

fn host_allowed(url: &str, allowlist: &[&str]) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_lowercase();
    allowlist
        .iter()
        .any(|allowed| host == *allowed || host.ends_with(&format!(".{allowed}")))
}

fn browser_headers(referer: &str) -> Vec<(String, String)> {
    vec![
        ("Referer".to_string(), referer.to_string()),
        ("User-Agent".to_string(), BROWSER_UA.to_string()),
    ]
}

impl Resolver {
    pub fn new() -> Result<Self, DownpourError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(BROWSER_UA)
            .build()
            .map_err(|e| DownpourError::Internal(format!("resolver client: {e}")))?;
        Ok(Self { http })
    }

    /// Resolve a mediafire file page to its direct download URL.
    /// `None` means the page had no recognizable direct link.
    pub async fn mediafire(&self, url: &str) -> Result<Option<ResolvedLink>, DownpourError> {
        if !host_allowed(url, MEDIAFIRE_HOSTS) {
            return Ok(None);
        }
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| DownpourError::Internal(format!("mediafire fetch: {e}")))?;
        let html = response
            .text()
            .await
            .map_err(|e| DownpourError::Internal(format!("mediafire body: {e}")))?;
        Ok(extract_mediafire_link(&html).map(|direct| ResolvedLink {
            url: direct,
            headers: browser_headers(url),
        }))
    }

    /// Resolve a sourceforge file page to the mirror URL it redirects to.
    ///
    /// Appends `/download` when missing so the mirror selector engages, then
    /// follows redirects and keeps the final URL without pulling the body.
    pub async fn sourceforge(&self, url: &str) -> Result<Option<ResolvedLink>, DownpourError> {
        if !host_allowed(url, SOURCEFORGE_HOSTS) {
            return Ok(None);
        }
        let request_url = if Url::parse(url)
            .map(|u| u.path().ends_with("/download"))
            .unwrap_or(false)
        {
            url.to_string()
        } else {
            format!("{}/download", url.trim_end_matches('/'))
        };

        let response = self
            .http
            .get(&request_url)
            .header("Referer", url)
            .header("Accept", "*/*")
            .send()
            .await
            .map_err(|e| DownpourError::Internal(format!("sourceforge fetch: {e}")))?;
        let direct = response.url().to_string();
        debug!(url, direct, "sourceforge mirror selected");
        Ok(Some(ResolvedLink {
            url: direct,
            headers: browser_headers(url),
        }))
    }

    /// Fetch a .torrent file into memory, with transport retries.
    pub async fn fetch_torrent(&self, url: &str) -> Result<Vec<u8>, DownpourError> {
        let policy = RetryPolicy::new(4, Duration::from_millis(600));
        retry(policy, "torrent fetch", || async {
            let response = self
                .http
                .get(url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| DownpourError::Internal(format!("torrent fetch: {e}")))?;
            let bytes = response
                .bytes()
                .await
                .map_err(|e| DownpourError::Internal(format!("torrent body: {e}")))?;
            Ok(bytes.to_vec())
        })
        .await
    }
}

fn extract_mediafire_link(html: &str) -> Option<String> {
    if let Some(caps) = DOWNLOAD_BUTTON_RE.captures(html) {
        return Some(caps[1].to_string());
    }
    DOWNLOAD_HREF_RE
        .captures(html)
        .map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn allowlist_blocks_lookalike_hosts() {
        assert!(host_allowed("https://www.mediafire.com/file/x", MEDIAFIRE_HOSTS));
        assert!(host_allowed("https://static.mediafire.com/x", MEDIAFIRE_HOSTS));
        assert!(!host_allowed("https://mediafire.com.evil.io/x", MEDIAFIRE_HOSTS));
        assert!(!host_allowed("https://notmediafire.com/x", MEDIAFIRE_HOSTS));
        assert!(!host_allowed("not a url", MEDIAFIRE_HOSTS));
    }

    #[test]
    fn download_button_wins_over_fallback_href() {
        let html = r#"
            <a href="https://download999.mediafire.com/other/file.zip">other</a>
            <a id="downloadButton" href="https://download123.mediafire.com/key/file.zip">DL</a>
        "#;
        assert_eq!(
            extract_mediafire_link(html).unwrap(),
            "https://download123.mediafire.com/key/file.zip"
        );
    }

    #[test]
    fn fallback_href_used_when_no_button() {
        let html = r#"<a href="https://download7.mediafire.com/abc/file.zip">x</a>"#;
        assert_eq!(
            extract_mediafire_link(html).unwrap(),
            "https://download7.mediafire.com/abc/file.zip"
        );
        assert!(extract_mediafire_link("<html>nothing here</html>").is_none());
    }

    #[tokio::test]
    async fn disallowed_host_never_fetched() {
        let resolver = Resolver::new().unwrap();
        let result = resolver
            .mediafire("https://mediafire.com.evil.io/file/x")
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn torrent_fetch_retries_transient_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/f.torrent"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/f.torrent"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"d8:announce0:e".to_vec()))
            .mount(&server)
            .await;

        let resolver = Resolver::new().unwrap();
        let blob = resolver
            .fetch_torrent(&format!("{}/f.torrent", server.uri()))
            .await
            .unwrap();
        assert_eq!(blob, b"d8:announce0:e".to_vec());
    }
}
