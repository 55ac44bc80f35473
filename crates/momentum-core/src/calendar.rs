//! Local calendar-day values and day arithmetic.
//!
//! The engine keys everything temporal off [`CalendarDay`]: a
//! timezone-local date with no time-of-day component, rendered as
//! `YYYY-MM-DD` so that lexical ordering matches chronological ordering.

use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDate};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// A timezone-local date used as the canonical temporal key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDay(NaiveDate);

impl CalendarDay {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Build a day from year/month/day, `None` for out-of-range values.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The previous calendar day, `None` at the representable minimum.
    pub fn pred(self) -> Option<Self> {
        self.0.pred_opt().map(Self)
    }

    /// The next calendar day, `None` at the representable maximum.
    pub fn succ(self) -> Option<Self> {
        self.0.succ_opt().map(Self)
    }
}

/// Today's date in the host's local timezone.
pub fn today() -> CalendarDay {
    CalendarDay(Local::now().date_naive())
}

/// Signed day count `b - a`. Negative when `b` precedes `a`.
pub fn days_between(a: CalendarDay, b: CalendarDay) -> i64 {
    (b.0 - a.0).num_days()
}

impl fmt::Display for CalendarDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for CalendarDay {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map(CalendarDay)
    }
}

impl Serialize for CalendarDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CalendarDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
