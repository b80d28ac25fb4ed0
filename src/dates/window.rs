use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};

/// Trailing N-day window, compared by calendar date in the source offset
///
/// A date is inside the window when `today - days <= date <= today`.
/// Time of day is ignored, so an article published at 00:01 on the first
/// day of the window counts the same as one published at 23:59.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecencyWindow {
    days: u32,
    today: NaiveDate,
    offset: FixedOffset,
}

impl RecencyWindow {
    /// Creates a window anchored at an explicit `today`
    pub fn new(days: u32, today: NaiveDate, offset: FixedOffset) -> Self {
        Self {
            days,
            today,
            offset,
        }
    }

    /// Creates a window anchored at the current date in `offset`
    pub fn starting_today(days: u32, offset: FixedOffset) -> Self {
        let today = Utc::now().with_timezone(&offset).date_naive();
        Self::new(days, today, offset)
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// First calendar date still inside the window
    pub fn earliest(&self) -> NaiveDate {
        self.today - Duration::days(i64::from(self.days))
    }

    /// Returns true if the calendar date falls inside the window
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.earliest() && date <= self.today
    }

    /// Returns true if the timestamp's date, in the source offset, falls
    /// inside the window
    pub fn contains(&self, timestamp: &DateTime<FixedOffset>) -> bool {
        self.contains_date(timestamp.with_timezone(&self.offset).date_naive())
    }
}
