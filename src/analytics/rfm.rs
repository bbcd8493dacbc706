//! RFM (Recency, Frequency, Monetary) scoring and segmentation

use super::binning::{bin_values, BinningStrategy, RankMode};
use crate::data::Tables;
use crate::error::Result;
use crate::types::{AccountId, Money};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

const ASCENDING_SCORES: [u8; 5] = [1, 2, 3, 4, 5];
const RECENCY_SCORES: [u8; 5] = [5, 4, 3, 2, 1];

/// Customer segment derived from the summed R+F+M score (3..=15)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RfmSegment {
    #[serde(rename = "Champions")]
    Champions,
    #[serde(rename = "Loyal Customers")]
    LoyalCustomers,
    #[serde(rename = "Potential Loyalists")]
    PotentialLoyalists,
    #[serde(rename = "At Risk")]
    AtRisk,
    #[serde(rename = "Lost")]
    Lost,
}

impl RfmSegment {
    pub const ALL: [RfmSegment; 5] = [
        RfmSegment::Champions,
        RfmSegment::LoyalCustomers,
        RfmSegment::PotentialLoyalists,
        RfmSegment::AtRisk,
        RfmSegment::Lost,
    ];

    /// Band lower bounds are inclusive
    pub fn from_total(total: u8) -> Self {
        match total {
            t if t >= 13 => RfmSegment::Champions,
            t if t >= 10 => RfmSegment::LoyalCustomers,
            t if t >= 7 => RfmSegment::PotentialLoyalists,
            t if t >= 5 => RfmSegment::AtRisk,
            _ => RfmSegment::Lost,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RfmSegment::Champions => "Champions",
            RfmSegment::LoyalCustomers => "Loyal Customers",
            RfmSegment::PotentialLoyalists => "Potential Loyalists",
            RfmSegment::AtRisk => "At Risk",
            RfmSegment::Lost => "Lost",
        }
    }
}

impl fmt::Display for RfmSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-account RFM metrics and scores
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfmRecord {
    pub account_id: AccountId,
    pub last_purchase: NaiveDate,
    /// Days from the last won deal to the reference date
    pub recency_days: i64,
    /// Number of won deals
    pub frequency: usize,
    /// Sum of won close values
    pub monetary: Money,
    pub r_score: u8,
    pub f_score: u8,
    pub m_score: u8,
    pub segment: RfmSegment,
}

impl RfmRecord {
    pub fn total_score(&self) -> u8 {
        self.r_score + self.f_score + self.m_score
    }

    /// Concatenated scores, e.g. "545"
    pub fn score_code(&self) -> String {
        format!("{}{}{}", self.r_score, self.f_score, self.m_score)
    }
}

/// Strategies the three score columns were binned with
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RfmBinning {
    pub recency: BinningStrategy,
    pub frequency: BinningStrategy,
    pub monetary: BinningStrategy,
}

/// RFM records for every account with at least one dated won deal, ordered by account id
///
/// An account whose won deals all lack a close date has no recency and is left
/// out, so `frequency` equals the won-deal count only for accounts listed here.
#[derive(Debug, Clone, Serialize)]
pub struct RfmTable {
    pub reference_date: NaiveDate,
    pub records: Vec<RfmRecord>,
    pub binning: RfmBinning,
}

impl RfmTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, account_id: &str) -> Option<&RfmRecord> {
        self.records
            .binary_search_by(|r| r.account_id.as_str().cmp(account_id))
            .ok()
            .map(|i| &self.records[i])
    }

    /// Accounts per segment, in segment order, omitting empty segments
    pub fn segment_counts(&self) -> Vec<(RfmSegment, usize)> {
        RfmSegment::ALL
            .iter()
            .map(|&s| (s, self.records.iter().filter(|r| r.segment == s).count()))
            .filter(|(_, n)| *n > 0)
            .collect()
    }

    pub fn mean_recency(&self) -> Option<f64> {
        super::mean(&self.records.iter().map(|r| r.recency_days as f64).collect::<Vec<_>>())
    }

    pub fn mean_frequency(&self) -> Option<f64> {
        super::mean(&self.records.iter().map(|r| r.frequency as f64).collect::<Vec<_>>())
    }

    pub fn mean_monetary(&self) -> Option<f64> {
        super::mean(&self.records.iter().map(|r| r.monetary).collect::<Vec<_>>())
    }
}

#[derive(Default)]
struct Accumulator {
    last_purchase: Option<NaiveDate>,
    frequency: usize,
    monetary: Money,
}

/// Compute RFM metrics from won deals, measuring recency from `reference_date`
pub fn compute_rfm(tables: &Tables, reference_date: NaiveDate) -> Result<RfmTable> {
    let mut by_account: BTreeMap<&str, Accumulator> = BTreeMap::new();
    for deal in tables.won_deals() {
        let Some(account) = deal.account_id.as_deref() else {
            continue;
        };
        let acc = by_account.entry(account).or_default();
        acc.frequency += 1;
        acc.monetary += deal.close_value.unwrap_or(0.0);
        acc.last_purchase = match (acc.last_purchase, deal.close_date) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    let mut rows = Vec::with_capacity(by_account.len());
    for (account, acc) in by_account {
        match acc.last_purchase {
            Some(last) => rows.push((account, last, acc.frequency, acc.monetary)),
            None => log::debug!("Account {} has no dated won deal, excluded from RFM", account),
        }
    }

    let recency: Vec<f64> = rows
        .iter()
        .map(|(_, last, _, _)| (reference_date - *last).num_days() as f64)
        .collect();
    let frequency: Vec<f64> = rows.iter().map(|(_, _, f, _)| *f as f64).collect();
    let monetary: Vec<f64> = rows.iter().map(|(_, _, _, m)| *m).collect();

    let r_bins = bin_values(&recency, &RECENCY_SCORES, RankMode::Raw);
    let f_bins = bin_values(&frequency, &ASCENDING_SCORES, RankMode::FirstOccurrence);
    let m_bins = bin_values(&monetary, &ASCENDING_SCORES, RankMode::FirstOccurrence);

    let records = rows
        .into_iter()
        .enumerate()
        .map(|(i, (account, last, freq, money))| {
            let (r, f, m) = (r_bins.labels[i], f_bins.labels[i], m_bins.labels[i]);
            RfmRecord {
                account_id: account.to_string(),
                last_purchase: last,
                recency_days: (reference_date - last).num_days(),
                frequency: freq,
                monetary: money,
                r_score: r,
                f_score: f,
                m_score: m,
                segment: RfmSegment::from_total(r + f + m),
            }
        })
        .collect::<Vec<_>>();

    log::debug!("RFM computed for {} accounts", records.len());

    Ok(RfmTable {
        reference_date,
        records,
        binning: RfmBinning {
            recency: r_bins.strategy,
            frequency: f_bins.strategy,
            monetary: m_bins.strategy,
        },
    })
}
