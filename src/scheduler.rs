//! Time-of-day scheduling for the daily broadcast.

use akasha_core::config::BroadcastConfig;
use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, NaiveTime, Offset, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::broadcast::DailyBroadcast;

pub fn schedule_offset(utc_offset_hours: i32) -> FixedOffset {
    FixedOffset::east_opt(utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
}

/// Time until the next `hour:minute` in the schedule's local timezone.
/// A wall-clock time already passed today lands on tomorrow.
pub fn duration_until(
    now: DateTime<Utc>,
    hour: u32,
    minute: u32,
    utc_offset_hours: i32,
) -> Duration {
    let offset = schedule_offset(utc_offset_hours);
    let local = now.with_timezone(&offset);

    let target_time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    let naive = local.date_naive().and_time(target_time);
    let mut target = offset
        .from_local_datetime(&naive)
        .single()
        .unwrap_or(local);

    if target <= local {
        target += ChronoDuration::days(1);
    }

    (target - local).to_std().unwrap_or(Duration::ZERO)
}

/// Sleeps until the configured time, runs the broadcast, and purges
/// ledger entries past retention. Loops forever.
pub async fn run(broadcast: Arc<DailyBroadcast>, config: BroadcastConfig) {
    let offset = schedule_offset(config.utc_offset_hours);
    info!(
        "broadcast scheduler armed for {:02}:{:02} (UTC{:+})",
        config.hour, config.minute, config.utc_offset_hours
    );

    loop {
        let wait = duration_until(Utc::now(), config.hour, config.minute, config.utc_offset_hours);
        info!("next daily broadcast in {}s", wait.as_secs());
        tokio::time::sleep(wait).await;

        let today = Utc::now().with_timezone(&offset).date_naive();
        match broadcast.run_for(today).await {
            Ok(report) => info!(
                "scheduled broadcast done: {} delivered, {} failed",
                report.success_count,
                report.failures.len()
            ),
            Err(e) => error!("scheduled broadcast failed: {e}"),
        }

        let cutoff = today - ChronoDuration::days(config.retention_days);
        let purged = broadcast
            .ledger()
            .purge_before(&format!("daily_passage_{cutoff}"))
            .await;
        if purged > 0 {
            info!("purged {purged} expired broadcast ledger entries");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_schedule_offset() {
        assert_eq!(
            schedule_offset(7),
            FixedOffset::east_opt(7 * 3600).unwrap()
        );
        // Out-of-range offsets fall back to UTC.
        assert_eq!(schedule_offset(99), Utc.fix());
    }

    #[test]
    fn test_later_today() {
        // 05:00 UTC = 12:00 in UTC+7; target 19:00 local is 7h away.
        let wait = duration_until(utc(2026, 8, 30, 5, 0), 19, 0, 7);
        assert_eq!(wait, Duration::from_secs(7 * 3600));
    }

    #[test]
    fn test_already_passed_rolls_to_tomorrow() {
        // 05:00 UTC = 12:00 in UTC+7; target 07:00 local passed, so
        // next fire is 19 hours out.
        let wait = duration_until(utc(2026, 8, 30, 5, 0), 7, 0, 7);
        assert_eq!(wait, Duration::from_secs(19 * 3600));
    }

    #[test]
    fn test_exact_time_rolls_to_tomorrow() {
        // 00:00 UTC = 07:00 in UTC+7 exactly.
        let wait = duration_until(utc(2026, 8, 30, 0, 0), 7, 0, 7);
        assert_eq!(wait, Duration::from_secs(24 * 3600));
    }

    #[test]
    fn test_offset_changes_local_date() {
        // 23:00 UTC on the 30th is already 06:00 on the 31st in UTC+7,
        // so 07:00 is only an hour away.
        let wait = duration_until(utc(2026, 8, 30, 23, 0), 7, 0, 7);
        assert_eq!(wait, Duration::from_secs(3600));
    }

    #[test]
    fn test_negative_offset() {
        // 05:00 UTC = 00:00 in UTC-5; target 07:00 local is 7h away.
        let wait = duration_until(utc(2026, 8, 30, 5, 0), 7, 0, -5);
        assert_eq!(wait, Duration::from_secs(7 * 3600));
    }

    #[test]
    fn test_minutes_are_respected() {
        let wait = duration_until(utc(2026, 8, 30, 5, 0), 12, 30, 0);
        assert_eq!(wait, Duration::from_secs(7 * 3600 + 30 * 60));
    }
}
