use crate::crawler::collapse_whitespace;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Utc};

/// How a pattern's parsed value becomes a full timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatternKind {
    /// Date and time of day
    DateTime,
    /// Date only; midnight in the source offset
    Date,
    /// Month, day and time; the current year is substituted
    MonthDayTime,
    /// Month and day; the current year is substituted, midnight
    MonthDay,
}

struct DatePattern {
    name: &'static str,
    format: &'static str,
    kind: PatternKind,
}

const fn pattern(name: &'static str, format: &'static str, kind: PatternKind) -> DatePattern {
    DatePattern { name, format, kind }
}

/// Ordered pattern table. Offset-aware RFC forms are tried before these.
const PATTERNS: &[DatePattern] = &[
    pattern("ymd-hms-dash", "%Y-%m-%d %H:%M:%S", PatternKind::DateTime),
    pattern("ymd-hm-dash", "%Y-%m-%d %H:%M", PatternKind::DateTime),
    pattern("ymd-t-hms", "%Y-%m-%dT%H:%M:%S", PatternKind::DateTime),
    pattern("ymd-hms-slash", "%Y/%m/%d %H:%M:%S", PatternKind::DateTime),
    pattern("ymd-hm-slash", "%Y/%m/%d %H:%M", PatternKind::DateTime),
    pattern("ymd-hm-dot", "%Y.%m.%d %H:%M", PatternKind::DateTime),
    pattern("ymd-hms-cjk", "%Y年%m月%d日 %H:%M:%S", PatternKind::DateTime),
    pattern("ymd-hm-cjk", "%Y年%m月%d日 %H:%M", PatternKind::DateTime),
    pattern("ymd-dash", "%Y-%m-%d", PatternKind::Date),
    pattern("ymd-slash", "%Y/%m/%d", PatternKind::Date),
    pattern("ymd-dot", "%Y.%m.%d", PatternKind::Date),
    pattern("ymd-cjk", "%Y年%m月%d日", PatternKind::Date),
    pattern("month-name-day-year", "%B %d, %Y", PatternKind::Date),
    pattern("month-abbr-day-year", "%b %d, %Y", PatternKind::Date),
    pattern("day-month-name-year", "%d %B %Y", PatternKind::Date),
    pattern("day-month-abbr-year", "%d %b %Y", PatternKind::Date),
    pattern("md-hm-dash", "%m-%d %H:%M", PatternKind::MonthDayTime),
    pattern("md-hm-slash", "%m/%d %H:%M", PatternKind::MonthDayTime),
    pattern("md-hm-cjk", "%m月%d日 %H:%M", PatternKind::MonthDayTime),
    pattern("md-dash", "%m-%d", PatternKind::MonthDay),
    pattern("md-slash", "%m/%d", PatternKind::MonthDay),
    pattern("md-cjk", "%m月%d日", PatternKind::MonthDay),
];

/// Names of every supported pattern, in the order they are tried
pub const PATTERN_NAMES: &[&str] = &[
    "rfc3339",
    "iso8601-offset",
    "rfc2822",
    "ymd-hms-dash",
    "ymd-hm-dash",
    "ymd-t-hms",
    "ymd-hms-slash",
    "ymd-hm-slash",
    "ymd-hm-dot",
    "ymd-hms-cjk",
    "ymd-hm-cjk",
    "ymd-dash",
    "ymd-slash",
    "ymd-dot",
    "ymd-cjk",
    "month-name-day-year",
    "month-abbr-day-year",
    "day-month-name-year",
    "day-month-abbr-year",
    "md-hm-dash",
    "md-hm-slash",
    "md-hm-cjk",
    "md-dash",
    "md-slash",
    "md-cjk",
];

impl DatePattern {
    fn apply(&self, text: &str, year: i32) -> Option<NaiveDateTime> {
        match self.kind {
            PatternKind::DateTime => NaiveDateTime::parse_from_str(text, self.format).ok(),
            PatternKind::Date => NaiveDate::parse_from_str(text, self.format)
                .ok()?
                .and_hms_opt(0, 0, 0),
            PatternKind::MonthDayTime => NaiveDateTime::parse_from_str(
                &format!("{} {}", year, text),
                &format!("%Y {}", self.format),
            )
            .ok(),
            PatternKind::MonthDay => NaiveDate::parse_from_str(
                &format!("{} {}", year, text),
                &format!("%Y {}", self.format),
            )
            .ok()?
            .and_hms_opt(0, 0, 0),
        }
    }
}

/// Parses the date strings found on listing and detail pages
///
/// Naive values are interpreted in the source site's offset. When no
/// pattern matches, the result is `None`: the parser never falls back to
/// the current time, because a fabricated "now" would slip undated
/// articles into every recency window.
#[derive(Debug, Clone, Copy)]
pub struct DateParser {
    offset: FixedOffset,
}

impl DateParser {
    /// Creates a parser for a site in the given offset
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// The source offset naive dates are interpreted in
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Parses `text`, substituting the current year for year-less forms
    pub fn parse(&self, text: &str) -> Option<DateTime<FixedOffset>> {
        self.parse_at(text, Utc::now().with_timezone(&self.offset))
    }

    /// Parses `text` with an explicit notion of "now"
    ///
    /// `now` only supplies the year for month/day-only patterns; it is
    /// never returned as a result.
    pub fn parse_at(&self, text: &str, now: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
        let cleaned = clean(text);
        if cleaned.is_empty() {
            tracing::debug!("Empty date text");
            return None;
        }

        if let Ok(ts) = DateTime::parse_from_rfc3339(&cleaned) {
            tracing::debug!(pattern = "rfc3339", text = %cleaned, "Parsed date");
            return Some(ts);
        }

        if let Ok(ts) = DateTime::parse_from_str(&cleaned, "%Y-%m-%dT%H:%M:%S%z") {
            tracing::debug!(pattern = "iso8601-offset", text = %cleaned, "Parsed date");
            return Some(ts);
        }

        if let Ok(ts) = DateTime::parse_from_rfc2822(&cleaned) {
            tracing::debug!(pattern = "rfc2822", text = %cleaned, "Parsed date");
            return Some(ts);
        }

        let year = now.with_timezone(&self.offset).year();
        for pattern in PATTERNS {
            let Some(naive) = pattern.apply(&cleaned, year) else {
                continue;
            };
            if let Some(ts) = naive.and_local_timezone(self.offset).single() {
                tracing::debug!(pattern = pattern.name, text = %cleaned, "Parsed date");
                return Some(ts);
            }
        }

        tracing::debug!(text = %cleaned, "No date pattern matched");
        None
    }
}

/// Collapses whitespace (including NBSP and ideographic space) and strips
/// bracket decorations around the date
fn clean(text: &str) -> String {
    collapse_whitespace(text)
        .trim_matches(|c: char| matches!(c, '[' | ']' | '(' | ')' | '【' | '】' | '|'))
        .trim()
        .to_string()
}
