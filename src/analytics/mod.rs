//! Analysis stages - each a pure function from snapshot tables (and earlier
//! stage outputs) to a new result table

pub mod arpu;
pub mod binning;
pub mod churn;
pub mod clv;
pub mod cohort;
pub mod conversion;
pub mod correlation;
pub mod customer;
pub mod rfm;
pub mod roi;
pub mod segmentation;
pub mod team;

pub use arpu::{compute_arpu, ArpuAnalysis, MonthlyArpu};
pub use binning::{bin_values, Binning, BinningStrategy, RankMode};
pub use churn::{estimate_churn, is_churned, ChurnAnalysis, ChurnFlag, ChurnProfile};
pub use clv::{customer_lifetime_value, estimate_clv, ClvAnalysis, ClvRecord, ClvSegment};
pub use cohort::{build_cohorts, compute_retention, CohortMatrix, RetentionMatrix};
pub use conversion::{analyze_conversion, ConversionAnalysis, GroupConversion};
pub use correlation::{
    correlate_accounts, linear_regression, pearson, regress_close_value, CorrelationMatrix,
    RegressionAnalysis, RegressionResult,
};
pub use customer::{assemble_customers, CustomerRecord};
pub use rfm::{compute_rfm, RfmRecord, RfmSegment, RfmTable};
pub use roi::{analyze_roi, roi_percent, ProductRoi, RoiAnalysis};
pub use segmentation::{segment_by_sector, segment_by_size, CompanySize, SegmentStats};
pub use team::{analyze_teams, ManagerPerformance};

use crate::data::Tables;
use hashbrown::HashMap;
use statrs::statistics::{Data, Distribution, Median};
use std::cmp::Ordering;

/// Sum of won close values per account; accounts without won deals are absent
pub(crate) fn won_value_by_account(tables: &Tables) -> HashMap<&str, f64> {
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for deal in tables.won_deals() {
        if let Some(account) = deal.account_id.as_deref() {
            *totals.entry(account).or_insert(0.0) += deal.close_value.unwrap_or(0.0);
        }
    }
    totals
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Data::new(values.to_vec()).mean()
}

pub(crate) fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(Data::new(values.to_vec()).median())
}

/// Percentage `part / whole * 100`, undefined for an empty whole
pub(crate) fn rate(part: usize, whole: usize) -> Option<f64> {
    (whole > 0).then(|| part as f64 / whole as f64 * 100.0)
}

/// Descending order with undefined values last
pub(crate) fn desc_undefined_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Account, Opportunity};
    use chrono::NaiveDate;

    #[test]
    fn test_won_value_by_account() {
        let d = NaiveDate::from_ymd_opt(2017, 1, 1).unwrap();
        let mut no_value = Opportunity::won("3", "B", "ag", d, 0.0);
        no_value.close_value = None;
        let tables = Tables::new(
            vec![Account::new("A"), Account::new("B")],
            vec![
                Opportunity::won("1", "A", "ag", d, 100.0),
                Opportunity::won("2", "A", "ag", d, 50.0),
                no_value,
                Opportunity::lost("4", "B", "ag", d),
            ],
            vec![],
            vec![],
        );

        let totals = won_value_by_account(&tables);
        assert_eq!(totals.get("A"), Some(&150.0));
        assert_eq!(totals.get("B"), Some(&0.0));
    }

    #[test]
    fn test_helpers() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(median(&[3.0, 1.0, 2.0, 10.0]), Some(2.5));
        assert_eq!(rate(1, 4), Some(25.0));
        assert_eq!(rate(0, 0), None);

        let mut values = vec![Some(1.0), None, Some(3.0)];
        values.sort_by(|a, b| desc_undefined_last(*a, *b));
        assert_eq!(values, vec![Some(3.0), Some(1.0), None]);
    }
}
