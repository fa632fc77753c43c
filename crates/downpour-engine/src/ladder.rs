// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Declarative fallback ladder for failed extraction attempts.
//!
//! Each rung pairs a failure signature with a spec rewrite. When an attempt
//! fails, the first rung that matches the diagnostic, has not been used for
//! this item yet, and is applicable to the current spec produces the spec
//! for the next attempt. No rung fires twice per item.

use downpour_core::{CredentialMode, FormatSelection, JobSpec};

pub struct Fallback {
    pub name: &'static str,
    matches: fn(&str) -> bool,
    apply: fn(&mut JobSpec) -> bool,
}

impl Fallback {
    /// The rewritten spec for the next attempt, when this rung applies.
    pub fn rewrite(&self, spec: &JobSpec) -> Option<JobSpec> {
        let mut next = spec.clone();
        (self.apply)(&mut next).then_some(next)
    }

    pub fn matches(&self, reason: &str) -> bool {
        (self.matches)(reason)
    }
}

/// Rung order is part of the contract: cheaper, more targeted rewrites come
/// before broad ones.
pub static LADDER: &[Fallback] = &[
    Fallback {
        name: "format-relax",
        matches: |reason| reason.contains("Requested format is not available"),
        apply: |spec| {
            if spec.format == FormatSelection::Configured {
                spec.format = FormatSelection::Best;
                true
            } else {
                false
            }
        },
    },
    Fallback {
        name: "cookie-mode-switch",
        matches: |reason| reason.contains("Failed to decrypt with DPAPI"),
        apply: |spec| {
            if spec.credentials == CredentialMode::Browser {
                spec.credentials = CredentialMode::File;
                true
            } else {
                false
            }
        },
    },
    Fallback {
        name: "anti-bot-relax",
        matches: |reason| {
            reason.contains("HTTP Error 403: Forbidden")
                || reason.contains("Sign in to confirm")
        },
        apply: |spec| {
            if !spec.relax_anti_bot {
                spec.relax_anti_bot = true;
                true
            } else {
                false
            }
        },
    },
    Fallback {
        name: "drop-subtitles",
        matches: |reason| reason.contains("HTTP Error 429"),
        apply: |spec| {
            if spec.write_subs && !spec.subs_required {
                spec.write_subs = false;
                true
            } else {
                false
            }
        },
    },
    Fallback {
        name: "no-credentials",
        matches: |reason| {
            reason.to_lowercase().contains("cookies")
                || reason.contains("HTTP Error 403: Forbidden")
        },
        apply: |spec| {
            if spec.credentials != CredentialMode::None {
                spec.credentials = CredentialMode::None;
                true
            } else {
                false
            }
        },
    },
];

/// Pick the next rung for a failure, skipping rungs already used for this
/// item. Returns the rung name and the rewritten spec.
pub fn next_fallback(
    reason: &str,
    spec: &JobSpec,
    used: &[&'static str],
) -> Option<(&'static str, JobSpec)> {
    LADDER
        .iter()
        .filter(|rung| !used.contains(&rung.name))
        .filter(|rung| rung.matches(reason))
        .find_map(|rung| rung.rewrite(spec).map(|next| (rung.name, next)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use downpour_core::JobSource;

    fn spec() -> JobSpec {
        JobSpec {
            source: JobSource::Uri("https://youtu.be/x".to_string()),
            dest_dir: PathBuf::from("/dl/youtube"),
            headers: Vec::new(),
            allow_playlist: false,
            max_items: 24,
            format: FormatSelection::Configured,
            credentials: CredentialMode::Browser,
            relax_anti_bot: false,
            write_subs: true,
            subs_required: false,
        }
    }

    #[test]
    fn format_failure_relaxes_selector() {
        let (name, next) =
            next_fallback("ERROR: Requested format is not available", &spec(), &[]).unwrap();
        assert_eq!(name, "format-relax");
        assert_eq!(next.format, FormatSelection::Best);
    }

    #[test]
    fn dpapi_failure_switches_cookie_source() {
        let (name, next) =
            next_fallback("Failed to decrypt with DPAPI", &spec(), &[]).unwrap();
        assert_eq!(name, "cookie-mode-switch");
        assert_eq!(next.credentials, CredentialMode::File);
    }

    #[test]
    fn forbidden_prefers_anti_bot_before_dropping_credentials() {
        let (name, next) = next_fallback("HTTP Error 403: Forbidden", &spec(), &[]).unwrap();
        assert_eq!(name, "anti-bot-relax");
        assert!(next.relax_anti_bot);

        // Same signature again, anti-bot already used: fall through.
        let (name, next) =
            next_fallback("HTTP Error 403: Forbidden", &next, &["anti-bot-relax"]).unwrap();
        assert_eq!(name, "no-credentials");
        assert_eq!(next.credentials, CredentialMode::None);
    }

    #[test]
    fn subtitle_rate_limit_drops_subs_unless_required() {
        let (name, next) = next_fallback("HTTP Error 429", &spec(), &[]).unwrap();
        assert_eq!(name, "drop-subtitles");
        assert!(!next.write_subs);

        let mut required = spec();
        required.subs_required = true;
        assert!(next_fallback("HTTP Error 429", &required, &[]).is_none());
    }

    #[test]
    fn unknown_failure_has_no_rung() {
        assert!(next_fallback("ERROR: some novel explosion", &spec(), &[]).is_none());
    }

    #[test]
    fn used_rungs_never_fire_twice() {
        let used = ["format-relax"];
        assert!(next_fallback("Requested format is not available", &spec(), &used).is_none());
    }
}
