//! Cohort counts and retention by months since first purchase

use crate::data::Tables;
use crate::error::Result;
use crate::types::{Percentage, YearMonth};
use hashbrown::{HashMap, HashSet};
use serde::Serialize;
use std::collections::BTreeMap;

/// Distinct active accounts per (cohort month, months since cohort start).
///
/// Combinations with no activity are absent rather than zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CohortMatrix {
    cells: BTreeMap<YearMonth, BTreeMap<u32, usize>>,
}

impl CohortMatrix {
    pub fn get(&self, cohort: YearMonth, period: u32) -> Option<usize> {
        self.cells.get(&cohort).and_then(|row| row.get(&period)).copied()
    }

    /// Cohorts in ascending order
    pub fn cohorts(&self) -> impl Iterator<Item = YearMonth> + '_ {
        self.cells.keys().copied()
    }

    pub fn row(&self, cohort: YearMonth) -> Option<&BTreeMap<u32, usize>> {
        self.cells.get(&cohort)
    }

    /// Largest period number observed in any cohort
    pub fn max_period(&self) -> Option<u32> {
        self.cells
            .values()
            .filter_map(|row| row.keys().next_back().copied())
            .max()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Cohort counts normalised by each cohort's period-0 count, as percentages.
///
/// Values above 100 can appear when reactivations inflate a later period;
/// they are kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetentionMatrix {
    cells: BTreeMap<YearMonth, BTreeMap<u32, Percentage>>,
}

impl RetentionMatrix {
    pub fn get(&self, cohort: YearMonth, period: u32) -> Option<Percentage> {
        self.cells.get(&cohort).and_then(|row| row.get(&period)).copied()
    }

    pub fn cohorts(&self) -> impl Iterator<Item = YearMonth> + '_ {
        self.cells.keys().copied()
    }

    pub fn row(&self, cohort: YearMonth) -> Option<&BTreeMap<u32, Percentage>> {
        self.cells.get(&cohort)
    }

    /// Mean retention at `period` over the cohorts that have a value there
    pub fn average(&self, period: u32) -> Option<Percentage> {
        let values: Vec<f64> = self
            .cells
            .values()
            .filter_map(|row| row.get(&period).copied())
            .collect();
        super::mean(&values)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Assign each account to the month of its first won deal and count
/// distinct active accounts per elapsed month
pub fn build_cohorts(tables: &Tables) -> Result<CohortMatrix> {
    let dated: Vec<(&str, YearMonth)> = tables
        .won_deals()
        .filter_map(|d| Some((d.account_id.as_deref()?, YearMonth::from(d.close_date?))))
        .collect();

    let mut cohort_of: HashMap<&str, YearMonth> = HashMap::new();
    for &(account, month) in &dated {
        cohort_of
            .entry(account)
            .and_modify(|c| *c = (*c).min(month))
            .or_insert(month);
    }

    let mut active: BTreeMap<(YearMonth, u32), HashSet<&str>> = BTreeMap::new();
    for &(account, month) in &dated {
        let cohort = cohort_of[account];
        // non-negative: the cohort is the account's earliest month
        let period = month.months_since(cohort) as u32;
        active.entry((cohort, period)).or_default().insert(account);
    }

    let mut cells: BTreeMap<YearMonth, BTreeMap<u32, usize>> = BTreeMap::new();
    for ((cohort, period), accounts) in active {
        cells.entry(cohort).or_default().insert(period, accounts.len());
    }

    log::debug!("Built {} cohorts from {} dated won deals", cells.len(), dated.len());
    Ok(CohortMatrix { cells })
}

/// Normalise each cohort row by its period-0 count
pub fn compute_retention(matrix: &CohortMatrix) -> Result<RetentionMatrix> {
    let mut cells = BTreeMap::new();
    for (cohort, row) in &matrix.cells {
        let Some(&base) = row.get(&0).filter(|&&n| n > 0) else {
            log::warn!("Cohort {} has no period-0 accounts, excluded from retention", cohort);
            continue;
        };
        let retention = row
            .iter()
            .map(|(&period, &count)| (period, 100.0 * count as f64 / base as f64))
            .collect();
        cells.insert(*cohort, retention);
    }
    Ok(RetentionMatrix { cells })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Account, Opportunity};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fixture() -> Tables {
        Tables::new(
            vec![Account::new("A"), Account::new("B"), Account::new("C")],
            vec![
                // January cohort: A and B
                Opportunity::won("1", "A", "ag", date(2017, 1, 3), 10.0),
                Opportunity::won("2", "B", "ag", date(2017, 1, 20), 10.0),
                Opportunity::won("3", "A", "ag", date(2017, 1, 25), 10.0),
                Opportunity::won("4", "A", "ag", date(2017, 2, 10), 10.0),
                Opportunity::won("5", "B", "ag", date(2017, 4, 2), 10.0),
                // March cohort: C
                Opportunity::won("6", "C", "ag", date(2017, 3, 9), 10.0),
                Opportunity::lost("7", "C", "ag", date(2017, 4, 9)),
            ],
            vec![],
            vec![],
        )
    }

    #[test]
    fn test_cohort_counts() {
        let matrix = build_cohorts(&fixture()).unwrap();
        let jan = YearMonth::new(2017, 1);
        let mar = YearMonth::new(2017, 3);

        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix.get(jan, 0), Some(2));
        assert_eq!(matrix.get(jan, 1), Some(1));
        assert_eq!(matrix.get(jan, 2), None);
        assert_eq!(matrix.get(jan, 3), Some(1));
        assert_eq!(matrix.get(mar, 0), Some(1));
        assert_eq!(matrix.get(mar, 1), None);
        assert_eq!(matrix.max_period(), Some(3));
        assert_eq!(matrix.cohorts().collect::<Vec<_>>(), vec![jan, mar]);
    }

    #[test]
    fn test_retention_normalises_by_period_zero() {
        let matrix = build_cohorts(&fixture()).unwrap();
        let retention = compute_retention(&matrix).unwrap();
        let jan = YearMonth::new(2017, 1);

        for cohort in retention.cohorts() {
            assert_relative_eq!(retention.get(cohort, 0).unwrap(), 100.0);
        }
        assert_relative_eq!(retention.get(jan, 1).unwrap(), 50.0);
        assert_eq!(retention.get(jan, 2), None);
        assert_relative_eq!(retention.average(0).unwrap(), 100.0);
        assert_relative_eq!(retention.average(3).unwrap(), 50.0);
        assert_eq!(retention.average(7), None);
    }

    #[test]
    fn test_cohort_spanning_year_boundary() {
        let tables = Tables::new(
            vec![],
            vec![
                Opportunity::won("1", "A", "ag", date(2016, 11, 30), 1.0),
                Opportunity::won("2", "A", "ag", date(2017, 2, 1), 1.0),
            ],
            vec![],
            vec![],
        );
        let matrix = build_cohorts(&tables).unwrap();
        assert_eq!(matrix.get(YearMonth::new(2016, 11), 3), Some(1));
    }

    #[test]
    fn test_empty() {
        let matrix = build_cohorts(&Tables::new(vec![], vec![], vec![], vec![])).unwrap();
        assert!(matrix.is_empty());
        assert_eq!(matrix.max_period(), None);
        assert!(compute_retention(&matrix).unwrap().is_empty());
    }
}
