//! End-to-end tests for crm-insights

use chrono::{Duration, NaiveDate};
use crm_insights::{
    analytics::{analyze_roi, RfmSegment},
    config::AnalysisConfig,
    data::{Account, CsvTableProvider, Opportunity, Product, TableProvider, Tables},
    error::CrmError,
    pipeline::{CrmPipeline, StageOutcome},
};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn reference() -> NaiveDate {
    NaiveDate::from_ymd_opt(2017, 12, 31).unwrap()
}

fn pipeline() -> CrmPipeline {
    CrmPipeline::new(AnalysisConfig::default().with_reference_date(reference())).unwrap()
}

/// Three accounts: A buys twice recently, B once long ago, C never
fn three_account_scenario() -> Tables {
    let r = reference();
    Tables::new(
        vec![Account::new("A"), Account::new("B"), Account::new("C")],
        vec![
            Opportunity::won("1", "A", "anna", r - Duration::days(20), 100.0),
            Opportunity::won("2", "A", "anna", r - Duration::days(10), 200.0),
            Opportunity::won("3", "B", "anna", r - Duration::days(200), 50.0),
            Opportunity::lost("4", "C", "anna", r - Duration::days(5)),
        ],
        vec![],
        vec![],
    )
}

#[test]
fn test_three_account_scenario() {
    let report = pipeline().run(&three_account_scenario());

    let rfm = report.rfm.completed().unwrap();
    assert_eq!(rfm.len(), 2);
    assert!(rfm.get("C").is_none());

    let a = rfm.get("A").unwrap();
    assert_eq!(a.frequency, 2);
    assert_eq!(a.monetary, 300.0);
    assert_eq!(a.recency_days, 10);
    assert_eq!(rfm.get("B").unwrap().frequency, 1);

    let churn = report.churn.completed().unwrap();
    assert_eq!(churn.is_churned("A"), Some(false));
    assert_eq!(churn.is_churned("B"), Some(true));
    assert_eq!(churn.is_churned("C"), None);

    let arpu = report.arpu.completed().unwrap();
    assert_eq!(arpu.total_customers, 3);
    assert!((arpu.arpu.unwrap() - 350.0 / 3.0).abs() < 1e-9);

    let clv = report.clv.completed().unwrap();
    assert!((clv.get("A").unwrap().clv - 900.0).abs() < 1e-9);
}

#[test]
fn test_churn_threshold_boundary() {
    let config = AnalysisConfig {
        churn_threshold_days: 200,
        ..AnalysisConfig::default().with_reference_date(reference())
    };
    let report = CrmPipeline::new(config).unwrap().run(&three_account_scenario());
    // recency exactly at the threshold is still active
    assert_eq!(report.churn.completed().unwrap().is_churned("B"), Some(false));
}

#[test]
fn test_zero_list_price_roi_is_undefined() {
    let tables = Tables::new(
        vec![],
        vec![Opportunity::won("1", "A", "ag", reference(), 500.0).with_product("FREE")],
        vec![Product::new("FREE", "Giveaway", 0.0)],
        vec![],
    );
    let roi = analyze_roi(&tables).unwrap();
    let free = roi.get("FREE").unwrap();
    assert_eq!(free.roi, None);
    assert_eq!(roi.mean_roi, None);
}

#[test]
fn test_empty_snapshot() {
    let report = pipeline().run(&Tables::new(vec![], vec![], vec![], vec![]));
    assert!(report.rfm.completed().unwrap().is_empty());
    assert!(report.cohorts.completed().unwrap().is_empty());
    assert_eq!(report.conversion.completed().unwrap().rate, None);
    assert!(report.regression.is_skipped());
    assert!(report.correlation.is_completed());
}

fn write_csv_snapshot(dir: &Path, with_sector: bool) {
    let r = reference();
    let mut accounts = String::from(if with_sector {
        "Account_ID,Sector,Employees,Revenue,Year_Established\n"
    } else {
        "account_id,employees,revenue,year_established\n"
    });
    let mut pipeline = String::from(
        "opportunity_id,agent_id,product_id,account_id,deal_stage,engage_date,close_date,close_value\n",
    );

    for i in 0..15 {
        let sector = ["retail", "software", "medical"][i % 3];
        let employees = 20 * (i + 1);
        if with_sector {
            writeln!(accounts, "ACC{:02},{},{},\"{},000\",{}", i, sector, employees, i + 1, 1990 + i).unwrap();
        } else {
            writeln!(accounts, "ACC{:02},{},{}.5,{}", i, employees, i + 1, 1990 + i).unwrap();
        }

        let closed = r - Duration::days((i * 25) as i64);
        let engaged = closed - Duration::days(30);
        let value = 100.0 + 7.0 * employees as f64 + if i % 2 == 0 { 40.0 } else { 0.0 };
        let agent = if i % 2 == 0 { "anna" } else { "boris" };
        writeln!(
            pipeline,
            "W{},{},GTX,ACC{:02},Won,{},{},{}",
            i, agent, i, engaged, closed, value
        )
        .unwrap();
        writeln!(pipeline, "L{},{},MG,ACC{:02},Lost,{},{},0", i, agent, i, engaged, closed).unwrap();
    }
    pipeline.push_str("X1,cleo,GTX,,Prospecting,,,\n");
    pipeline.push_str("X2,cleo,,ACC00,Engaging,2017-12-01,,not-a-number\n");

    fs::write(dir.join("accounts.csv"), accounts).unwrap();
    fs::write(dir.join("sales_pipeline.csv"), pipeline).unwrap();
    fs::write(
        dir.join("products.csv"),
        "product_id,product,sales_price\nGTX,GTX Basic,550\nMG,MG Special,55\n",
    )
    .unwrap();
    fs::write(
        dir.join("sales_teams.csv"),
        "agent_id,manager\nanna,Dustin Brinkman\nboris,Melvin Marxen\ncleo,Melvin Marxen\n",
    )
    .unwrap();
}

#[test]
fn test_csv_end_to_end() {
    let dir = tempdir().unwrap();
    write_csv_snapshot(dir.path(), true);

    let provider = CsvTableProvider::new(dir.path());
    let tables = provider.load().unwrap();
    assert_eq!(tables.accounts.len(), 15);
    assert_eq!(tables.accounts[3].revenue, Some(4000.0));
    assert_eq!(tables.opportunities.len(), 32);

    let report = pipeline().run_with(&provider).unwrap();
    assert_eq!(report.status_counts(), (14, 0, 0));

    let rfm = report.rfm.completed().unwrap();
    assert_eq!(rfm.len(), 15);
    let counted: usize = rfm.segment_counts().iter().map(|(_, n)| n).sum();
    assert_eq!(counted, 15);
    assert!(rfm.records.iter().all(|r| (1..=5).contains(&r.r_score)));

    let churn = report.churn.completed().unwrap();
    // closes at 0, 25, ... 350 days; recency above 180 from i = 8 on
    assert_eq!(churn.churned, 7);
    assert_eq!(churn.active, 8);

    let conversion = report.conversion.completed().unwrap();
    assert_eq!(conversion.total, 32);
    assert_eq!(conversion.won, 15);
    assert_eq!(conversion.lost, 15);

    let regression = report.regression.completed().unwrap();
    assert_eq!(regression.complete_rows, 15);
    let employees = regression.for_predictor("employees").unwrap();
    assert!((employees.slope - 7.0).abs() < 0.5);
    assert!(employees.significant);

    let roi = report.roi.completed().unwrap();
    assert_eq!(roi.products.len(), 1);
    assert_eq!(roi.products[0].name.as_deref(), Some("GTX Basic"));

    let teams = report.team_performance.completed().unwrap();
    assert_eq!(teams.len(), 2);
    let melvin = teams.iter().find(|t| t.manager == "Melvin Marxen").unwrap();
    assert_eq!(melvin.opportunities, 16);

    let sectors = report.sector_segments.completed().unwrap();
    assert_eq!(sectors.len(), 3);
    assert!(sectors.windows(2).all(|w| w[0].total_revenue >= w[1].total_revenue));

    let retention = report.retention.completed().unwrap();
    for cohort in retention.cohorts() {
        assert_eq!(retention.get(cohort, 0), Some(100.0));
    }
}

#[test]
fn test_csv_without_sector_skips_only_sector_segments() {
    let dir = tempdir().unwrap();
    write_csv_snapshot(dir.path(), false);

    let report = pipeline().run_with(&CsvTableProvider::new(dir.path())).unwrap();
    assert!(matches!(report.sector_segments, StageOutcome::Skipped(_)));
    assert!(report.size_segments.is_completed());
    assert!(report.correlation.is_completed());
    assert_eq!(report.status_counts(), (13, 1, 0));
}

#[test]
fn test_malformed_date_is_fatal() {
    let dir = tempdir().unwrap();
    write_csv_snapshot(dir.path(), true);
    let mut pipeline_csv = fs::read_to_string(dir.path().join("sales_pipeline.csv")).unwrap();
    pipeline_csv.push_str("BAD,anna,GTX,ACC01,Won,2017-01-01,sometime,10\n");
    fs::write(dir.path().join("sales_pipeline.csv"), pipeline_csv).unwrap();

    let err = pipeline().run_with(&CsvTableProvider::new(dir.path())).unwrap_err();
    assert!(matches!(err, CrmError::Parse { .. }));
    assert!(!err.is_skip());
}

#[test]
fn test_report_serializes_to_json() {
    let report = pipeline().run(&three_account_scenario());
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["reference_date"], "2017-12-31");
    assert_eq!(json["rfm"]["status"], "completed");
    assert_eq!(json["regression"]["status"], "skipped");
    let records = json["rfm"]["result"]["records"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert!(records[0]["segment"].is_string());

    let segments: Vec<RfmSegment> = report
        .customers
        .completed()
        .unwrap()
        .iter()
        .map(|c| c.segment)
        .collect();
    assert_eq!(segments.len(), 2);
}
