use chrono::{Duration, NaiveDate};
use crm_insights::analytics::{
    analyze_conversion, bin_values, build_cohorts, compute_retention, compute_rfm,
    customer_lifetime_value, estimate_churn, estimate_clv, is_churned, RankMode,
};
use crm_insights::data::{Opportunity, Tables};
use proptest::prelude::*;

fn reference() -> NaiveDate {
    NaiveDate::from_ymd_opt(2017, 12, 31).unwrap()
}

/// (account index, days before the reference date, close value, stage)
fn deal_rows() -> impl Strategy<Value = Vec<(u8, u16, u32, u8)>> {
    prop::collection::vec((0u8..12, 0u16..720, 1u32..10_000, 0u8..4), 0..80)
}

fn tables_from(deals: &[(u8, u16, u32, u8)]) -> Tables {
    let opportunities = deals
        .iter()
        .enumerate()
        .map(|(i, &(account, days, value, stage))| {
            let id = i.to_string();
            let account = format!("ACC{}", account);
            let closed = reference() - Duration::days(days as i64);
            match stage {
                0 | 1 => Opportunity::won(id, account, "ag", closed, value as f64),
                2 => Opportunity::lost(id, account, "ag", closed),
                _ => Opportunity::open(id, "ag", "Engaging"),
            }
        })
        .collect();
    Tables::new(vec![], opportunities, vec![], vec![])
}

proptest! {
    /// Churn is a strict inequality on recency
    #[test]
    fn churn_is_strictly_greater(recency in 0i64..2000, threshold in 0i64..2000) {
        prop_assert_eq!(is_churned(recency, threshold), recency > threshold);
        prop_assert!(!is_churned(threshold, threshold));
    }

    /// Every churn flag agrees with the account's recency
    #[test]
    fn churn_flags_match_recency(deals in deal_rows(), threshold in 0i64..720) {
        let rfm = compute_rfm(&tables_from(&deals), reference()).unwrap();
        let churn = estimate_churn(&rfm, threshold).unwrap();
        prop_assert_eq!(churn.flags.len(), rfm.len());
        prop_assert_eq!(churn.active + churn.churned, rfm.len());
        for flag in &churn.flags {
            prop_assert_eq!(flag.is_churned, flag.recency_days > threshold);
        }
    }

    /// CLV reduces to monetary times lifespan
    #[test]
    fn clv_is_monetary_times_lifespan(deals in deal_rows()) {
        let rfm = compute_rfm(&tables_from(&deals), reference()).unwrap();
        let clv = estimate_clv(&rfm, 3.0).unwrap();
        prop_assert_eq!(clv.records.len(), rfm.len());
        for record in &clv.records {
            let monetary = rfm.get(&record.account_id).unwrap().monetary;
            prop_assert!((record.clv - monetary * 3.0).abs() <= 1e-9 * monetary.max(1.0));
        }
    }

    #[test]
    fn clv_formula_identity(monetary in 0.0f64..1e7, frequency in 1usize..500, lifespan in 0.5f64..10.0) {
        let clv = customer_lifetime_value(monetary, frequency, lifespan).unwrap();
        prop_assert!((clv - monetary * lifespan).abs() <= 1e-9 * (monetary * lifespan).max(1.0));
    }

    /// Frequency counts the won deals of each account
    #[test]
    fn rfm_frequency_counts_won_deals(deals in deal_rows()) {
        let tables = tables_from(&deals);
        let rfm = compute_rfm(&tables, reference()).unwrap();
        for record in &rfm.records {
            let won = tables
                .won_deals()
                .filter(|d| d.account_id.as_deref() == Some(record.account_id.as_str()))
                .count();
            prop_assert_eq!(record.frequency, won);
            prop_assert!((3..=15).contains(&(record.r_score + record.f_score + record.m_score)));
        }
    }

    /// Every cohort starts at 100% retention
    #[test]
    fn retention_starts_at_one_hundred(deals in deal_rows()) {
        let cohorts = build_cohorts(&tables_from(&deals)).unwrap();
        let retention = compute_retention(&cohorts).unwrap();
        prop_assert_eq!(retention.len(), cohorts.len());
        for cohort in retention.cohorts() {
            prop_assert_eq!(retention.get(cohort, 0), Some(100.0));
        }
    }

    /// Per-stage opportunity counts add up to the total
    #[test]
    fn stage_counts_sum_to_total(deals in deal_rows()) {
        let conversion = analyze_conversion(&tables_from(&deals)).unwrap();
        let by_stage: usize = conversion.by_stage.iter().map(|g| g.opportunities).sum();
        let by_agent: usize = conversion.by_agent.iter().map(|g| g.opportunities).sum();
        prop_assert_eq!(by_stage, conversion.total);
        prop_assert_eq!(by_agent, conversion.total);
    }

    /// Binning never panics and only emits the labels it was given
    #[test]
    fn binning_uses_given_labels(values in prop::collection::vec(0.0f64..1000.0, 0..200)) {
        let labels = [1u8, 2, 3, 4, 5];
        let binning = bin_values(&values, &labels, RankMode::FirstOccurrence);
        prop_assert_eq!(binning.labels.len(), values.len());
        prop_assert!(binning.labels.iter().all(|l| labels.contains(l)));
        prop_assert!(binning.bins <= labels.len());
    }
}
