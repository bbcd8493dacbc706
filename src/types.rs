//! Core types and constants

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use std::fmt;

/// Account identifier (company name in most CRM exports)
pub type AccountId = String;

/// Sales agent identifier
pub type AgentId = String;

/// Product identifier
pub type ProductId = String;

/// Money type (close values, prices, revenue)
pub type Money = f64;

/// Percentage type (0.0 to 100.0)
pub type Percentage = f64;

/// Calendar month, used as the period for cohorts and monthly trends
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Create a new period; `month` is 1-based
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// Whole months elapsed from `earlier` to `self` (negative if `earlier` is later)
    pub fn months_since(&self, earlier: YearMonth) -> i32 {
        (self.year - earlier.year) * 12 + (self.month as i32 - earlier.month as i32)
    }
}

impl From<NaiveDate> for YearMonth {
    fn from(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month())
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
