//! Average revenue per account, overall and by close month

use crate::data::Tables;
use crate::error::Result;
use crate::types::{Money, YearMonth};
use hashbrown::HashSet;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyArpu {
    pub month: YearMonth,
    pub revenue: Money,
    /// Distinct accounts with a won deal closing this month
    pub purchasers: usize,
    /// Month revenue over month purchasers
    pub arpu: Option<Money>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArpuAnalysis {
    pub total_revenue: Money,
    /// Distinct accounts in the accounts table, purchasing or not
    pub total_customers: usize,
    /// Total won revenue over the whole customer base
    pub arpu: Option<Money>,
    /// Ascending by month
    pub monthly: Vec<MonthlyArpu>,
}

impl ArpuAnalysis {
    /// The most recent `n` months
    pub fn last_months(&self, n: usize) -> &[MonthlyArpu] {
        &self.monthly[self.monthly.len().saturating_sub(n)..]
    }
}

/// Headline ARPU divides by every account; the monthly trend divides by that
/// month's purchasers only. The two divisors are distinct metrics.
pub fn compute_arpu(tables: &Tables) -> Result<ArpuAnalysis> {
    let total_revenue: Money = tables.won_deals().filter_map(|d| d.close_value).sum();
    let total_customers = tables.distinct_account_count();
    let arpu = (total_customers > 0).then(|| total_revenue / total_customers as f64);

    let mut months: BTreeMap<YearMonth, (Money, HashSet<&str>)> = BTreeMap::new();
    for deal in tables.won_deals() {
        let Some(closed) = deal.close_date else {
            continue;
        };
        let entry = months.entry(YearMonth::from(closed)).or_default();
        entry.0 += deal.close_value.unwrap_or(0.0);
        if let Some(account) = deal.account_id.as_deref() {
            entry.1.insert(account);
        }
    }

    let monthly = months
        .into_iter()
        .map(|(month, (revenue, accounts))| MonthlyArpu {
            month,
            revenue,
            purchasers: accounts.len(),
            arpu: (!accounts.is_empty()).then(|| revenue / accounts.len() as f64),
        })
        .collect();

    Ok(ArpuAnalysis {
        total_revenue,
        total_customers,
        arpu,
        monthly,
    })
}
