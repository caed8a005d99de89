use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two daily attendance windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Morning,
    Evening,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Morning => "morning",
            Slot::Evening => "evening",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (date, slot) pair identifying one reporting round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotKey {
    pub date: NaiveDate,
    pub slot: Slot,
}

impl SlotKey {
    pub fn new(date: NaiveDate, slot: Slot) -> Self {
        Self { date, slot }
    }

    /// Calendar date as stored in the `checkins` table (YYYY-MM-DD)
    pub fn date_str(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_str() {
        let key = SlotKey::new(NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(), Slot::Evening);
        assert_eq!(key.date_str(), "2024-03-07");
    }
}
