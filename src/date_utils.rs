use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Local, Months, NaiveDate, NaiveDateTime, NaiveTime};

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Formats accepted for stored transaction timestamps, tried in order.
const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePreset {
    ThisWeek,
    ThisMonth,
    LastMonth,
    Last30Days,
    ThisYear,
    All,
}

impl FromStr for DatePreset {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "this_week" => Ok(Self::ThisWeek),
            "this_month" => Ok(Self::ThisMonth),
            "last_month" => Ok(Self::LastMonth),
            "last_30_days" => Ok(Self::Last30Days),
            "this_year" => Ok(Self::ThisYear),
            "all" => Ok(Self::All),
            _ => Err(()),
        }
    }
}

/// An inclusive range of calendar days.
///
/// `from > to` is allowed and simply contains nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// Resolve a preset relative to `today`. The caller supplies the day so the
    /// result never depends on the wall clock.
    pub fn from_preset(preset: DatePreset, today: NaiveDate) -> Self {
        let (from, to) = match preset {
            DatePreset::ThisWeek => (week_start(today), week_start(today) + Duration::days(6)),
            DatePreset::ThisMonth => (month_start(today), month_end(today)),
            DatePreset::LastMonth => {
                let last_month = shift_months(month_start(today), -1);
                (last_month, month_end(last_month))
            }
            DatePreset::Last30Days => (today - Duration::days(30), today),
            DatePreset::ThisYear => (year_start(today), year_end(today)),
            DatePreset::All => (NaiveDate::MIN, NaiveDate::MAX),
        };
        Self { from, to }
    }

    /// The whole calendar month containing `date`.
    pub fn month_of(date: NaiveDate) -> Self {
        Self::new(month_start(date), month_end(date))
    }

    pub fn is_empty(&self) -> bool {
        self.from > self.to
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        let day = at.date();
        self.from <= day && day <= self.to
    }
}

/// Parse a stored transaction timestamp. Accepts RFC 3339 (converted to local
/// time), naive date-times, and bare dates (local midnight).
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Local).naive_local());
    }

    for format in TIMESTAMP_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }

    parse_date(value).map(|d| d.and_time(NaiveTime::MIN))
}

/// The text to store for a submitted timestamp. Offset timestamps are stored
/// as the local date-time they parse to, so the stored day matches the day the
/// reports use. Other accepted forms are kept as given. `None` if unparseable.
pub fn storage_timestamp(value: &str) -> Option<String> {
    let value = value.trim();
    let parsed = parse_timestamp(value)?;
    if DateTime::parse_from_rfc3339(value).is_ok() {
        Some(parsed.format("%Y-%m-%dT%H:%M:%S").to_string())
    } else {
        Some(value.to_string())
    }
}

/// Parse a `YYYY-MM-DD` query parameter.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Parse a `YYYY-MM` month key into the first day of that month.
pub fn parse_month_key(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", value.trim()), "%Y-%m-%d").ok()
}

/// `YYYY-MM`, the key used for budgets and cash-flow predictions.
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// `"Mar 2024"`, the label used for monthly chart buckets.
pub fn month_label(year: i32, month: u32) -> String {
    let name = MONTH_ABBREVIATIONS
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("???");
    format!("{} {}", name, year)
}

/// `"Week 3 2024"`, the label used for weekly chart buckets.
pub fn week_label(year: i32, week: u32) -> String {
    format!("Week {} {}", week, year)
}

/// Week of the month, `(day + 6 - weekday) / 7 + 1` with weekdays counted from
/// Sunday = 0. Runs from 1 to 6 and restarts every month.
pub fn week_of_month(date: NaiveDate) -> u32 {
    (date.day() + 6 - date.weekday().num_days_from_sunday()) / 7 + 1
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    let days_from_monday = date.weekday().num_days_from_monday();
    date - Duration::days(days_from_monday as i64)
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.day0() as i64)
}

pub fn month_end(date: NaiveDate) -> NaiveDate {
    shift_months(month_start(date), 1) - Duration::days(1)
}

fn year_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.ordinal0() as i64)
}

fn year_end(date: NaiveDate) -> NaiveDate {
    shift_months(year_start(date), 12) - Duration::days(1)
}

/// Move `date` by a signed number of calendar months, clamping the day to the
/// end of the target month. Dates outside chrono's range are returned unchanged.
pub fn shift_months(date: NaiveDate, months: i32) -> NaiveDate {
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(months as u32))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}
