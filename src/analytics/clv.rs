//! Customer lifetime value estimation

use super::binning::{bin_values, BinningStrategy, RankMode};
use super::rfm::RfmTable;
use crate::error::Result;
use crate::types::{AccountId, Money};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ClvSegment {
    Low,
    Medium,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

impl ClvSegment {
    pub const ALL: [ClvSegment; 4] = [
        ClvSegment::Low,
        ClvSegment::Medium,
        ClvSegment::High,
        ClvSegment::VeryHigh,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ClvSegment::Low => "Low",
            ClvSegment::Medium => "Medium",
            ClvSegment::High => "High",
            ClvSegment::VeryHigh => "Very High",
        }
    }
}

impl fmt::Display for ClvSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClvRecord {
    pub account_id: AccountId,
    pub clv: Money,
    pub segment: ClvSegment,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClvAnalysis {
    pub lifespan_years: f64,
    pub records: Vec<ClvRecord>,
    pub strategy: BinningStrategy,
    pub mean: Option<Money>,
    pub median: Option<Money>,
    pub min: Option<Money>,
    pub max: Option<Money>,
}

impl ClvAnalysis {
    pub fn get(&self, account_id: &str) -> Option<&ClvRecord> {
        self.records.iter().find(|r| r.account_id == account_id)
    }

    /// Accounts per segment, omitting empty segments
    pub fn segment_counts(&self) -> Vec<(ClvSegment, usize)> {
        ClvSegment::ALL
            .iter()
            .map(|&s| (s, self.records.iter().filter(|r| r.segment == s).count()))
            .filter(|(_, n)| *n > 0)
            .collect()
    }
}

/// Average purchase value x purchase frequency x lifespan.
///
/// Kept in this form rather than reduced to `monetary * lifespan`; undefined
/// when there are no purchases.
pub fn customer_lifetime_value(monetary: Money, frequency: usize, lifespan_years: f64) -> Option<Money> {
    if frequency == 0 {
        return None;
    }
    let frequency = frequency as f64;
    let avg_purchase_value = monetary / frequency;
    Some(avg_purchase_value * frequency * lifespan_years)
}

/// Estimate CLV for every RFM account and split into quartile segments
pub fn estimate_clv(rfm: &RfmTable, lifespan_years: f64) -> Result<ClvAnalysis> {
    let valued: Vec<(&str, Money)> = rfm
        .records
        .iter()
        .filter_map(|r| {
            customer_lifetime_value(r.monetary, r.frequency, lifespan_years)
                .map(|clv| (r.account_id.as_str(), clv))
        })
        .collect();

    let values: Vec<f64> = valued.iter().map(|(_, v)| *v).collect();
    let binning = bin_values(&values, &ClvSegment::ALL, RankMode::Raw);

    let records = valued
        .iter()
        .zip(binning.labels.iter())
        .map(|((account, clv), &segment)| ClvRecord {
            account_id: account.to_string(),
            clv: *clv,
            segment,
        })
        .collect();

    Ok(ClvAnalysis {
        lifespan_years,
        records,
        strategy: binning.strategy,
        mean: super::mean(&values),
        median: super::median(&values),
        min: values.iter().copied().reduce(f64::min),
        max: values.iter().copied().reduce(f64::max),
    })
}
