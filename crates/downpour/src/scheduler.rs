// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily execution window.
//!
//! A light ticker rather than a cron runtime: every tick it re-reads the
//! live schedule flags, so a `/schedule` change takes effect without a
//! restart. Each edge fires at most once per day. The window-open edge
//! clears the pause flag and launches a cycle; the window-stop edge sets
//! the pause flag, freezing in-flight transfers and admitting nothing new
//! until the next window.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Timelike, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use downpour_engine::Controller;

const TICK: Duration = Duration::from_secs(30);

/// Hours after the start hour the window closes when no explicit stop
/// hour is configured.
const DEFAULT_WINDOW_HOURS: u8 = 3;

/// Whether the `hour:00` edge fires at `now`, in whatever zone `now`
/// carries. `last` is the local date the edge last fired, guarding against
/// double fires within the same minute.
fn edge_due<Z: TimeZone>(now: &DateTime<Z>, hour: u8, last: Option<NaiveDate>) -> bool {
    now.minute() == 0 && now.hour() == u32::from(hour) && last != Some(now.date_naive())
}

/// Run the window ticker until shutdown.
pub async fn run(
    controller: Arc<Controller>,
    stop_override: Option<u8>,
    cancel: CancellationToken,
) {
    let mut last_start: Option<NaiveDate> = None;
    let mut last_stop: Option<NaiveDate> = None;
    let mut interval = tokio::time::interval(TICK);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = cancel.cancelled() => {
                info!("scheduler shutting down");
                return;
            }
        }

        let enabled = match controller.window_enabled().await {
            Ok(enabled) => enabled,
            Err(e) => {
                warn!(error = %e, "scheduler could not read the window flag");
                continue;
            }
        };
        if !enabled {
            continue;
        }

        let hour = match controller.schedule_hour().await {
            Ok(hour) => hour,
            Err(e) => {
                warn!(error = %e, "scheduler could not read the schedule hour");
                continue;
            }
        };
        let stop = stop_override.unwrap_or((hour + DEFAULT_WINDOW_HOURS) % 24);
        // Schedule hours are wall-clock hours in the configured timezone.
        let now = Utc::now().with_timezone(&controller.settings().timezone);

        if edge_due(&now, hour, last_start) {
            last_start = Some(now.date_naive());
            info!(hour, "window open, launching scheduled cycle");
            match controller.resume().await {
                Ok(requeued) if requeued > 0 => {
                    info!(requeued, "paused items re-queued for the window")
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "scheduled cycle failed to launch"),
            }
        }

        if edge_due(&now, stop, last_stop) {
            last_stop = Some(now.date_naive());
            info!(hour = stop, "window closed, pausing the queue");
            if let Err(e) = controller.pause().await {
                warn!(error = %e, "scheduled pause failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 25, hour, minute, 0).unwrap()
    }

    #[test]
    fn edge_fires_on_the_hour() {
        assert!(edge_due(&at(3, 0), 3, None));
        assert!(!edge_due(&at(3, 1), 3, None));
        assert!(!edge_due(&at(4, 0), 3, None));
    }

    #[test]
    fn edge_fires_once_per_day() {
        let now = at(3, 0);
        assert!(edge_due(&now, 3, None));
        assert!(!edge_due(&now, 3, Some(now.date_naive())));

        // A new day re-arms the edge.
        let yesterday = now.date_naive().pred_opt().unwrap();
        assert!(edge_due(&now, 3, Some(yesterday)));
    }

    #[test]
    fn edge_follows_the_local_clock() {
        // 01:00 UTC is 03:00 in Berlin during DST.
        let tz: chrono_tz::Tz = "Europe/Berlin".parse().unwrap();
        let local = at(1, 0).with_timezone(&tz);
        assert!(edge_due(&local, 3, None));
        assert!(!edge_due(&local, 1, None));
    }
}
