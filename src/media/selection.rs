use super::types::MediaItem;
use crate::error::UsageError;
use chrono::{DateTime, NaiveDate, Utc};

/// Which media a command acts on. Exactly one criterion per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The N oldest items.
    Count(usize),
    /// Every item taken strictly before this instant.
    DateCutoff(DateTime<Utc>),
}

impl Selection {
    /// Builds the criterion from the raw `--size` / `--date` flags.
    /// Empty strings are treated as not supplied.
    pub fn from_flags(size: Option<&str>, date: Option<&str>) -> Result<Self, UsageError> {
        let size = size.map(str::trim).filter(|s| !s.is_empty());
        let date = date.map(str::trim).filter(|s| !s.is_empty());

        match (size, date) {
            (None, None) => Err(UsageError::MissingSelection),
            (Some(_), Some(_)) => Err(UsageError::ConflictingSelection),
            (Some(size), None) => size
                .parse::<usize>()
                .map(Selection::Count)
                .map_err(|_| UsageError::InvalidSize(size.to_string())),
            (None, Some(date)) => parse_cutoff(date).map(Selection::DateCutoff),
        }
    }

    /// Picks the items to act on, keeping the order the platform returned them in.
    ///
    /// The platform lists newest first, so the oldest items sit at the tail.
    pub fn apply<'a>(&self, items: &'a [MediaItem]) -> Vec<&'a MediaItem> {
        match self {
            Selection::Count(n) => {
                let start = items.len().saturating_sub(*n);
                items[start..].iter().collect()
            }
            Selection::DateCutoff(cutoff) => items
                .iter()
                .filter(|item| item.taken_at < *cutoff)
                .collect(),
        }
    }
}

/// Parses `YYYY-MM-DD` as UTC midnight of that day.
pub fn parse_cutoff(date: &str) -> Result<DateTime<Utc>, UsageError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| UsageError::InvalidDate(date.to_string()))
}
