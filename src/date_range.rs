//! Inclusive date-range filtering over canonical view models.

use chrono::{DateTime, NaiveDate, Utc};

use crate::timestamps::parse_timestamp;

/// A view model that carries a point in time.
pub trait Timestamped {
    /// The record's instant, or `None` when it is missing or was unparseable.
    fn timestamp(&self) -> Option<DateTime<Utc>>;
}

/// Optional inclusive bounds. A missing bound is unbounded on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    /// Whole calendar days: `from` starts at midnight, `to` runs until the last
    /// nanosecond of its day.
    pub fn from_dates(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self {
            from: from.and_then(start_of_day),
            to: to.and_then(end_of_day),
        }
    }

    /// True when neither bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Checks an instant against the range.
    ///
    /// Without bounds everything passes, including records without a timestamp. Once
    /// any bound is set, a missing timestamp never matches.
    pub fn contains(&self, instant: Option<DateTime<Utc>>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(instant) = instant else {
            return false;
        };
        if let Some(from) = self.from {
            if instant < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if instant > to {
                return false;
            }
        }
        true
    }
}

fn start_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
}

fn end_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_nano_opt(23, 59, 59, 999_999_999)
        .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
}

/// Which side of a range a textual bound belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundSide {
    From,
    To,
}

/// Parses a user-supplied bound.
///
/// A bare `YYYY-MM-DD` covers the whole day (start of day for `From`, end of day for
/// `To`); anything else must be a full timestamp.
pub fn parse_bound(raw: &str, side: BoundSide) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return match side {
            BoundSide::From => start_of_day(date),
            BoundSide::To => end_of_day(date),
        };
    }
    parse_timestamp(raw)
}

/// Keeps the views whose timestamp lies inside `range`, preserving order.
///
/// `None` means no range was requested and returns every view.
pub fn filter_by_range<V>(views: &[V], range: Option<&DateRange>) -> Vec<V>
where
    V: Timestamped + Clone,
{
    match range {
        None => views.to_vec(),
        Some(range) => views
            .iter()
            .filter(|view| range.contains(view.timestamp()))
            .cloned()
            .collect(),
    }
}
