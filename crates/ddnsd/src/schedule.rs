// # Daily scheduler
//
// Fires one cycle per day at a local `HH:MM` in an IANA timezone. Cycles
// run inline in the scheduler task, so a slow cycle delays the next wait
// instead of overlapping with it.

use anyhow::Result;
use chrono::{DateTime, Days, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use ddns_core::config::ScheduleConfig;
use ddns_core::{CancellationToken, Orchestrator};
use tracing::{error, info, warn};

/// Longest DST gap searched when the trigger time does not exist locally
const MAX_GAP_MINUTES: i64 = 180;

/// Parse an IANA timezone name
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| anyhow::anyhow!("DDNS_TIMEZONE '{}' is not a known timezone: {}", name, e))
}

/// A once-a-day trigger
#[derive(Debug, Clone, Copy)]
pub struct DailySchedule {
    at: NaiveTime,
    tz: Tz,
}

impl DailySchedule {
    pub fn new(hour: u32, minute: u32, tz: Tz) -> Result<Self> {
        let at = NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or_else(|| anyhow::anyhow!("Invalid schedule time {:02}:{:02}", hour, minute))?;
        Ok(Self { at, tz })
    }

    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        let (hour, minute) = config.hour_minute()?;
        Self::new(hour, minute, parse_timezone(&config.timezone)?)
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// First trigger strictly after `now`
    ///
    /// A trigger time skipped by a DST gap fires at the first valid local
    /// minute after it. A repeated time fires at its earlier occurrence.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local_now = now.with_timezone(&self.tz);

        (0..=2)
            .filter_map(|days| local_now.date_naive().checked_add_days(Days::new(days)))
            .filter_map(|date| self.resolve(date.and_time(self.at)))
            .find(|candidate| *candidate > local_now)
            .map(|candidate| candidate.with_timezone(&Utc))
            .unwrap_or_else(|| now + TimeDelta::days(1))
    }

    fn resolve(&self, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
        (0..=MAX_GAP_MINUTES).find_map(|offset| {
            self.tz
                .from_local_datetime(&(naive + TimeDelta::minutes(offset)))
                .earliest()
        })
    }
}

/// Run cycles on `schedule` until `cancel` fires
///
/// Failed cycles are logged and the scheduler waits for the next trigger.
/// Each trigger is derived from the one before it, so a wall clock running
/// behind the monotonic timer cannot fire the same trigger twice.
pub async fn run_daily(
    orchestrator: &Orchestrator,
    schedule: &DailySchedule,
    cancel: &CancellationToken,
) {
    info!(
        at = %schedule.at.format("%H:%M"),
        timezone = %schedule.tz,
        "Starting daily scheduler"
    );

    let mut next = schedule.next_after(Utc::now());

    loop {
        let wait = (next - Utc::now()).to_std().unwrap_or_default();

        info!(
            next_run = %next.with_timezone(&schedule.tz).to_rfc3339(),
            wait_secs = wait.as_secs(),
            "Waiting for next scheduled cycle"
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Scheduler stopping");
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        match orchestrator.run_cycle(cancel).await {
            Ok(outcome) => {
                info!(%outcome, address = %outcome.address(), "Scheduled cycle completed");
            }
            Err(e) if e.is_cancelled() => {
                warn!("Scheduled cycle interrupted by shutdown");
                return;
            }
            Err(e) => {
                error!(error = %e, "Scheduled cycle failed");
            }
        }

        // Never re-fire a trigger that already ran, never replay missed days
        next = schedule.next_after(next.max(Utc::now()));
    }
}
