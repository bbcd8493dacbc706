//! Full per-account customer record, assembled from the RFM, churn and CLV stages

use super::churn::ChurnAnalysis;
use super::clv::{ClvAnalysis, ClvSegment};
use super::rfm::{RfmSegment, RfmTable};
use crate::types::{AccountId, Money};
use hashbrown::HashMap;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerRecord {
    pub account_id: AccountId,
    pub recency_days: i64,
    pub frequency: usize,
    pub monetary: Money,
    pub r_score: u8,
    pub f_score: u8,
    pub m_score: u8,
    pub score_code: String,
    pub segment: RfmSegment,
    /// `None` when the churn stage did not complete
    pub is_churned: Option<bool>,
    pub clv: Option<Money>,
    pub clv_segment: Option<ClvSegment>,
}

/// Join the stage outputs on account id into a new table; inputs are left untouched
pub fn assemble_customers(
    rfm: &RfmTable,
    churn: Option<&ChurnAnalysis>,
    clv: Option<&ClvAnalysis>,
) -> Vec<CustomerRecord> {
    let churn_flags: HashMap<&str, bool> = churn
        .map(|c| {
            c.flags
                .iter()
                .map(|f| (f.account_id.as_str(), f.is_churned))
                .collect()
        })
        .unwrap_or_default();
    let clv_by_account: HashMap<&str, (Money, ClvSegment)> = clv
        .map(|c| {
            c.records
                .iter()
                .map(|r| (r.account_id.as_str(), (r.clv, r.segment)))
                .collect()
        })
        .unwrap_or_default();

    rfm.records
        .iter()
        .map(|r| {
            let value = clv_by_account.get(r.account_id.as_str());
            CustomerRecord {
                account_id: r.account_id.clone(),
                recency_days: r.recency_days,
                frequency: r.frequency,
                monetary: r.monetary,
                r_score: r.r_score,
                f_score: r.f_score,
                m_score: r.m_score,
                score_code: r.score_code(),
                segment: r.segment,
                is_churned: churn_flags.get(r.account_id.as_str()).copied(),
                clv: value.map(|(v, _)| *v),
                clv_segment: value.map(|(_, s)| *s),
            }
        })
        .collect()
}
