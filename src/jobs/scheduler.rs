// Daily wall-clock scheduler

use chrono::{DateTime, Duration as ChronoDuration, LocalResult, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::core::state::AppState;
use crate::jobs::reporting::run_job;

/// Resolve a local wall-clock time on `date`.
///
/// Ambiguous times (clocks going back) take the earlier instant; times that
/// fall in a gap (clocks going forward) move one hour later.
fn resolve_local(tz: Tz, date: NaiveDate, at: NaiveTime) -> Option<DateTime<Tz>> {
    let naive = date.and_time(at);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => tz
            .from_local_datetime(&(naive + ChronoDuration::hours(1)))
            .earliest(),
    }
}

/// Next instant strictly after `now` whose local time of day is `at`
pub fn next_fire(now: &DateTime<Tz>, at: NaiveTime) -> Option<DateTime<Tz>> {
    let tz = now.timezone();
    let mut date = now.date_naive();

    // Today, tomorrow, and one spare day in case a gap swallows a candidate
    for _ in 0..3 {
        if let Some(fire) = resolve_local(tz, date, at) {
            if fire > *now {
                return Some(fire);
            }
        }
        date = date.succ_opt()?;
    }

    None
}

/// `now`, or `floor` if the clock still reads earlier than it
fn not_before(now: DateTime<Tz>, floor: Option<DateTime<Tz>>) -> DateTime<Tz> {
    match floor {
        Some(floor) if floor > now => floor,
        _ => now,
    }
}

/// Spawn one task per schedule entry; each sleeps until its next fire time
/// and runs the job inline before computing the next one.
pub fn spawn_scheduler(state: Arc<AppState>) -> Vec<JoinHandle<()>> {
    let entries = state.config.schedule.clone();

    info!(jobs = entries.len(), timezone = %state.windows.timezone().name(), "Starting scheduler");

    entries
        .into_iter()
        .map(|entry| {
            let state = state.clone();
            tokio::spawn(async move {
                // A timer can wake slightly before the wall clock reaches the
                // fire instant; the last fire is the floor for the next one
                let mut last: Option<DateTime<Tz>> = None;
                loop {
                    let now = state.windows.now();
                    let Some(fire) = next_fire(&not_before(now, last), entry.at) else {
                        // Unreachable short of the calendar running out
                        return;
                    };
                    let wait = (fire - now).to_std().unwrap_or(Duration::ZERO);

                    debug!(
                        job = ?entry.job,
                        slot = %entry.slot,
                        fire_at = %fire.to_rfc3339(),
                        wait_secs = wait.as_secs(),
                        "Scheduled job sleeping"
                    );

                    tokio::time::sleep(wait).await;
                    run_job(&state, &entry, not_before(state.windows.now(), Some(fire))).await;
                    last = Some(fire);
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use chrono_tz::Europe::{Berlin, Moscow};

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_next_fire_later_today() {
        let now = Moscow.with_ymd_and_hms(2024, 5, 10, 6, 0, 0).unwrap();
        let fire = next_fire(&now, hm(7, 0)).unwrap();
        assert_eq!(fire, Moscow.with_ymd_and_hms(2024, 5, 10, 7, 0, 0).unwrap());
    }

    #[test]
    fn test_next_fire_rolls_to_tomorrow() {
        let now = Moscow.with_ymd_and_hms(2024, 5, 10, 22, 30, 0).unwrap();
        let fire = next_fire(&now, hm(7, 0)).unwrap();
        assert_eq!(fire, Moscow.with_ymd_and_hms(2024, 5, 11, 7, 0, 0).unwrap());
    }

    #[test]
    fn test_next_fire_exact_instant_is_tomorrow() {
        let now = Moscow.with_ymd_and_hms(2024, 5, 10, 7, 0, 0).unwrap();
        let fire = next_fire(&now, hm(7, 0)).unwrap();
        assert_eq!(fire.date_naive(), NaiveDate::from_ymd_opt(2024, 5, 11).unwrap());
    }

    #[test]
    fn test_next_fire_across_month_end() {
        let now = Moscow.with_ymd_and_hms(2024, 5, 31, 23, 0, 0).unwrap();
        let fire = next_fire(&now, hm(7, 31)).unwrap();
        assert_eq!(fire, Moscow.with_ymd_and_hms(2024, 6, 1, 7, 31, 0).unwrap());
    }

    #[test]
    fn test_early_wake_does_not_refire() {
        let fire = Moscow.with_ymd_and_hms(2024, 5, 10, 7, 31, 0).unwrap();
        let early = fire - ChronoDuration::milliseconds(1);

        // Without the floor the same instant comes back
        assert_eq!(next_fire(&early, hm(7, 31)), Some(fire));

        let reference = not_before(early, Some(fire));
        assert_eq!(reference, fire);
        assert_eq!(
            next_fire(&reference, hm(7, 31)).unwrap(),
            Moscow.with_ymd_and_hms(2024, 5, 11, 7, 31, 0).unwrap()
        );
    }

    #[test]
    fn test_not_before_passes_later_clock_through() {
        let fire = Moscow.with_ymd_and_hms(2024, 5, 10, 7, 31, 0).unwrap();
        let later = fire + ChronoDuration::seconds(2);
        assert_eq!(not_before(later, Some(fire)), later);
        assert_eq!(not_before(later, None), later);
    }

    #[test]
    fn test_next_fire_in_dst_gap_shifts_one_hour() {
        // 02:30 does not exist in Berlin on 2024-03-31
        let now = Berlin.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
        let fire = next_fire(&now, hm(2, 30)).unwrap();
        assert_eq!(fire.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!((fire.hour(), fire.minute()), (3, 30));
    }

    #[test]
    fn test_next_fire_ambiguous_takes_earliest() {
        // 02:30 happens twice in Berlin on 2024-10-27
        let now = Berlin.with_ymd_and_hms(2024, 10, 27, 0, 0, 0).unwrap();
        let fire = next_fire(&now, hm(2, 30)).unwrap();
        let LocalResult::Ambiguous(earliest, latest) = Berlin.from_local_datetime(
            &NaiveDate::from_ymd_opt(2024, 10, 27).unwrap().and_time(hm(2, 30)),
        ) else {
            panic!("expected an ambiguous local time");
        };
        assert_eq!(fire, earliest);
        assert!(fire < latest);
    }
}
