//! Core data models shared by the engine and every store backend.
//!
//! Every entity is scoped by an `owner` string; the engine never reasons
//! across owners.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;

use crate::error::{EngineError, Result};

/// Storage-assigned chunk id. The vector index maps positions to these.
pub type ChunkId = i64;

/// A diary entry as written by its owner.
#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    pub id: i64,
    pub owner: String,
    pub date: NaiveDate,
    pub text: String,
    /// Unix timestamp of the save action.
    pub created_at: i64,
}

/// A word window derived from an [`Entry`] by the chunker.
#[derive(Debug, Clone, Serialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub owner: String,
    pub entry_id: i64,
    pub entry_date: NaiveDate,
    pub text: String,
}

/// Summary granularity. Daily coverage comes from raw chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Weekly,
    Monthly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "weekly" | "week" => Some(Granularity::Weekly),
            "monthly" | "month" => Some(Granularity::Monthly),
            _ => None,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A precomputed weekly or monthly summary produced by the summarization job.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub id: i64,
    pub owner: String,
    pub granularity: Granularity,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub text: String,
}

impl Summary {
    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.start_date.min(self.end_date),
            end: self.end_date.max(self.start_date),
        }
    }
}

/// Write-once audit record of an answered query.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRecord {
    pub owner: String,
    pub query: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

/// An inclusive calendar date range with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(EngineError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    pub fn intersects(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Number of calendar days in the range (always at least 1).
    pub fn len_days(&self) -> usize {
        ((self.end - self.start).num_days() + 1) as usize
    }

    /// Every day in the range, ascending.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.len_days() as i64).map(move |offset| start + Duration::days(offset))
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_range_rejects_inverted() {
        let err = DateRange::new(d(2024, 1, 5), d(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidRange { .. }));
    }

    #[test]
    fn test_range_days_cross_month() {
        let range = DateRange::new(d(2024, 1, 30), d(2024, 2, 2)).unwrap();
        let days: Vec<_> = range.days().collect();
        assert_eq!(
            days,
            vec![d(2024, 1, 30), d(2024, 1, 31), d(2024, 2, 1), d(2024, 2, 2)]
        );
        assert_eq!(range.len_days(), 4);
    }

    #[test]
    fn test_intersects() {
        let jan = DateRange::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap();
        let week = DateRange::new(d(2024, 1, 29), d(2024, 2, 4)).unwrap();
        let feb = DateRange::new(d(2024, 2, 1), d(2024, 2, 29)).unwrap();
        assert!(jan.intersects(&week));
        assert!(week.intersects(&feb));
        assert!(!jan.intersects(&feb));
        assert!(DateRange::single(d(2024, 1, 31)).intersects(&jan));
    }

    #[test]
    fn test_granularity_parse() {
        assert_eq!(Granularity::parse("Weekly"), Some(Granularity::Weekly));
        assert_eq!(Granularity::parse("month"), Some(Granularity::Monthly));
        assert_eq!(Granularity::parse("daily"), None);
    }
}
