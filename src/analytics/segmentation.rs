//! Account segmentation by sector and by company size

use crate::data::{columns, table_names, Account, Tables};
use crate::error::{CrmError, Result};
use crate::types::Money;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Company size band on employee count
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum CompanySize {
    Small,
    Medium,
    Large,
    Enterprise,
}

impl CompanySize {
    pub const ALL: [CompanySize; 4] = [
        CompanySize::Small,
        CompanySize::Medium,
        CompanySize::Large,
        CompanySize::Enterprise,
    ];

    /// Band for an employee count: [0,50), [50,200), [200,1000), [1000,inf).
    /// Negative or non-finite counts have no band.
    pub fn from_employees(employees: f64) -> Option<Self> {
        if !employees.is_finite() || employees < 0.0 {
            None
        } else if employees < 50.0 {
            Some(CompanySize::Small)
        } else if employees < 200.0 {
            Some(CompanySize::Medium)
        } else if employees < 1000.0 {
            Some(CompanySize::Large)
        } else {
            Some(CompanySize::Enterprise)
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CompanySize::Small => "Small",
            CompanySize::Medium => "Medium",
            CompanySize::Large => "Large",
            CompanySize::Enterprise => "Enterprise",
        }
    }
}

impl fmt::Display for CompanySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Aggregates for one segment.
///
/// Every account in the segment is counted; revenue aggregates only cover
/// accounts with at least one won deal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentStats {
    pub segment: String,
    pub accounts: usize,
    pub purchasing_accounts: usize,
    pub total_revenue: Money,
    pub mean_revenue: Option<Money>,
}

impl SegmentStats {
    fn from_revenues(segment: impl Into<String>, revenues: &[Option<Money>]) -> Self {
        let present: Vec<f64> = revenues.iter().flatten().copied().collect();
        Self {
            segment: segment.into(),
            accounts: revenues.len(),
            purchasing_accounts: present.len(),
            total_revenue: present.iter().sum(),
            mean_revenue: super::mean(&present),
        }
    }
}

/// Per-account revenue, `None` for accounts without won deals
fn account_revenue<'a>(tables: &'a Tables) -> impl Iterator<Item = (&'a Account, Option<Money>)> {
    let totals = super::won_value_by_account(tables);
    tables.accounts.iter().map(move |a| {
        let revenue = totals.get(a.account_id.as_str()).copied();
        (a, revenue)
    })
}

/// Segments by sector, highest total revenue first. Accounts without a sector
/// are left out.
pub fn segment_by_sector(tables: &Tables) -> Result<Vec<SegmentStats>> {
    if !tables.account_columns.contains(columns::SECTOR) {
        return Err(CrmError::missing_column(table_names::ACCOUNTS, columns::SECTOR));
    }

    let mut groups: BTreeMap<&str, Vec<Option<Money>>> = BTreeMap::new();
    for (account, revenue) in account_revenue(tables) {
        if let Some(sector) = account.sector.as_deref() {
            groups.entry(sector).or_default().push(revenue);
        }
    }

    let mut segments: Vec<SegmentStats> = groups
        .iter()
        .map(|(sector, revenues)| SegmentStats::from_revenues(*sector, revenues))
        .collect();
    segments.sort_by(|a, b| {
        b.total_revenue
            .partial_cmp(&a.total_revenue)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(segments)
}

/// Segments by company size band, in band order, empty bands included
pub fn segment_by_size(tables: &Tables) -> Result<Vec<SegmentStats>> {
    if !tables.account_columns.contains(columns::EMPLOYEES) {
        return Err(CrmError::missing_column(table_names::ACCOUNTS, columns::EMPLOYEES));
    }

    let mut bands: BTreeMap<CompanySize, Vec<Option<Money>>> =
        CompanySize::ALL.iter().map(|s| (*s, Vec::new())).collect();
    let mut unbanded = 0usize;
    for (account, revenue) in account_revenue(tables) {
        match account.employees.and_then(CompanySize::from_employees) {
            Some(size) => bands.entry(size).or_default().push(revenue),
            None => unbanded += 1,
        }
    }
    if unbanded > 0 {
        log::debug!("{} accounts without a usable employee count left out of size bands", unbanded);
    }

    Ok(bands
        .iter()
        .map(|(size, revenues)| SegmentStats::from_revenues(size.label(), revenues))
        .collect())
}
