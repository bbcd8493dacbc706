//! Churn estimation from RFM recency

use super::rfm::{RfmRecord, RfmTable};
use crate::error::Result;
use crate::types::{AccountId, Percentage};
use serde::Serialize;

/// Churn status of one account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChurnFlag {
    pub account_id: AccountId,
    pub recency_days: i64,
    pub is_churned: bool,
}

/// Mean RFM metrics of the accounts sharing one churn status
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChurnProfile {
    pub is_churned: bool,
    pub accounts: usize,
    pub mean_frequency: f64,
    pub mean_monetary: f64,
    pub mean_recency: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChurnAnalysis {
    pub threshold_days: i64,
    pub flags: Vec<ChurnFlag>,
    pub active: usize,
    pub churned: usize,
    /// Share of RFM accounts that are churned; undefined without accounts
    pub churn_rate: Option<Percentage>,
    /// Active profile first, then churned; statuses with no accounts are omitted
    pub profiles: Vec<ChurnProfile>,
}

impl ChurnAnalysis {
    pub fn is_churned(&self, account_id: &str) -> Option<bool> {
        self.flags
            .iter()
            .find(|f| f.account_id == account_id)
            .map(|f| f.is_churned)
    }
}

/// Strictly greater than: an account exactly at the threshold is still active
pub fn is_churned(recency_days: i64, threshold_days: i64) -> bool {
    recency_days > threshold_days
}

fn profile(is_churned: bool, records: &[&RfmRecord]) -> Option<ChurnProfile> {
    let n = records.len();
    if n == 0 {
        return None;
    }
    let avg = |f: &dyn Fn(&RfmRecord) -> f64| records.iter().map(|r| f(r)).sum::<f64>() / n as f64;
    Some(ChurnProfile {
        is_churned,
        accounts: n,
        mean_frequency: avg(&|r| r.frequency as f64),
        mean_monetary: avg(&|r| r.monetary),
        mean_recency: avg(&|r| r.recency_days as f64),
    })
}

/// Flag accounts whose recency exceeds `threshold_days`
pub fn estimate_churn(rfm: &RfmTable, threshold_days: i64) -> Result<ChurnAnalysis> {
    let flags: Vec<ChurnFlag> = rfm
        .records
        .iter()
        .map(|r| ChurnFlag {
            account_id: r.account_id.clone(),
            recency_days: r.recency_days,
            is_churned: is_churned(r.recency_days, threshold_days),
        })
        .collect();

    let (churned_records, active_records): (Vec<&RfmRecord>, Vec<&RfmRecord>) = rfm
        .records
        .iter()
        .partition(|r| is_churned(r.recency_days, threshold_days));

    let churned = churned_records.len();
    let active = active_records.len();
    let profiles = [profile(false, &active_records), profile(true, &churned_records)]
        .into_iter()
        .flatten()
        .collect();

    let churn_rate = super::rate(churned, flags.len());

    log::debug!("Churn: {} active, {} churned (threshold {} days)", active, churned, threshold_days);

    Ok(ChurnAnalysis {
        threshold_days,
        flags,
        active,
        churned,
        churn_rate,
        profiles,
    })
}
