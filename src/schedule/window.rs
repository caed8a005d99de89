// Time-window resolver; both window bounds are inclusive

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::core::config::{WindowTimes, WindowsConfig};
use crate::models::checkin::{Slot, SlotKey};

#[derive(Debug, Clone)]
pub struct TimeWindows {
    tz: Tz,
    morning: WindowTimes,
    evening: WindowTimes,
}

impl TimeWindows {
    pub fn new(tz: Tz, windows: &WindowsConfig) -> Self {
        Self {
            tz,
            morning: windows.morning,
            evening: windows.evening,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Current instant in the course timezone
    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }

    /// Convert any instant into the course timezone
    pub fn localize(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        instant.with_timezone(&self.tz)
    }

    pub fn window(&self, slot: Slot) -> &WindowTimes {
        match slot {
            Slot::Morning => &self.morning,
            Slot::Evening => &self.evening,
        }
    }

    /// Local calendar date, not the UTC one
    pub fn local_date(&self, now: &DateTime<Tz>) -> NaiveDate {
        now.date_naive()
    }

    /// Slot whose [start, close] contains the time of day, if any
    pub fn current_slot(&self, now: &DateTime<Tz>) -> Option<Slot> {
        let t = now.time();
        if contains(&self.morning, t) {
            Some(Slot::Morning)
        } else if contains(&self.evening, t) {
            Some(Slot::Evening)
        } else {
            None
        }
    }

    /// Active slot keyed by today's local date
    pub fn current_key(&self, now: &DateTime<Tz>) -> Option<SlotKey> {
        self.current_slot(now)
            .map(|slot| SlotKey::new(self.local_date(now), slot))
    }

    /// Most recently completed window.
    ///
    /// At or before the morning close this is yesterday's evening; at or before
    /// the evening close it is today's morning; otherwise today's evening.
    pub fn last_closed_slot(&self, now: &DateTime<Tz>) -> SlotKey {
        let t = now.time();
        let today = self.local_date(now);

        if t <= self.morning.close {
            let yesterday = today
                .pred_opt()
                .unwrap_or_else(|| today - Duration::days(1));
            SlotKey::new(yesterday, Slot::Evening)
        } else if t <= self.evening.close {
            SlotKey::new(today, Slot::Morning)
        } else {
            SlotKey::new(today, Slot::Evening)
        }
    }
}

fn contains(window: &WindowTimes, t: NaiveTime) -> bool {
    window.start <= t && t <= window.close
}

/// "HH:MM" rendering used in user-facing messages
pub fn fmt_hm(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}
