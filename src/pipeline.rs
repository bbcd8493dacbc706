//! Staged CRM analysis pipeline
//!
//! Stages run in a fixed order over one immutable table snapshot. Each stage
//! yields a [`StageOutcome`]: a stage that skips or fails does not stop the
//! run, and only stages that consume its output are marked unavailable.

use crate::analytics::{
    analyze_conversion, analyze_roi, analyze_teams, assemble_customers, build_cohorts,
    compute_arpu, compute_retention, compute_rfm, correlate_accounts, estimate_churn,
    estimate_clv, regress_close_value, segment_by_sector, segment_by_size, ArpuAnalysis,
    ChurnAnalysis, ClvAnalysis, CohortMatrix, ConversionAnalysis, CorrelationMatrix,
    CustomerRecord, ManagerPerformance, RegressionAnalysis, RetentionMatrix, RfmTable,
    RoiAnalysis, SegmentStats,
};
use crate::config::AnalysisConfig;
use crate::data::{TableProvider, Tables};
use crate::error::{CrmError, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::time::Instant;

/// Result of a single stage
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum StageOutcome<T> {
    Completed(T),
    /// A precondition was not met (missing optional column, too few rows,
    /// upstream stage unavailable)
    Skipped(String),
    Failed(String),
}

impl<T> StageOutcome<T> {
    /// Classify a stage result, logging skips and failures
    pub fn from_result(stage: &str, result: Result<T>) -> Self {
        match result {
            Ok(value) => StageOutcome::Completed(value),
            Err(e) if e.is_skip() => {
                log::warn!("Stage '{}' skipped: {}", stage, e);
                StageOutcome::Skipped(e.to_string())
            }
            Err(e) => {
                log::error!("Stage '{}' failed: {}", stage, e);
                StageOutcome::Failed(e.to_string())
            }
        }
    }

    pub fn completed(&self) -> Option<&T> {
        match self {
            StageOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, StageOutcome::Completed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, StageOutcome::Skipped(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StageOutcome::Failed(_))
    }

    /// Skip or failure reason
    pub fn reason(&self) -> Option<&str> {
        match self {
            StageOutcome::Completed(_) => None,
            StageOutcome::Skipped(reason) | StageOutcome::Failed(reason) => Some(reason),
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            StageOutcome::Completed(_) => "completed",
            StageOutcome::Skipped(_) => "skipped",
            StageOutcome::Failed(_) => "failed",
        }
    }
}

/// Every stage output of one run
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub reference_date: NaiveDate,
    pub rfm: StageOutcome<RfmTable>,
    pub churn: StageOutcome<ChurnAnalysis>,
    pub clv: StageOutcome<ClvAnalysis>,
    pub customers: StageOutcome<Vec<CustomerRecord>>,
    pub arpu: StageOutcome<ArpuAnalysis>,
    pub cohorts: StageOutcome<CohortMatrix>,
    pub retention: StageOutcome<RetentionMatrix>,
    pub conversion: StageOutcome<ConversionAnalysis>,
    pub correlation: StageOutcome<CorrelationMatrix>,
    pub regression: StageOutcome<RegressionAnalysis>,
    pub roi: StageOutcome<RoiAnalysis>,
    pub sector_segments: StageOutcome<Vec<SegmentStats>>,
    pub size_segments: StageOutcome<Vec<SegmentStats>>,
    pub team_performance: StageOutcome<Vec<ManagerPerformance>>,
}

impl AnalysisReport {
    /// Stage names paired with their status, in run order
    pub fn stage_statuses(&self) -> Vec<(&'static str, &'static str)> {
        vec![
            (stages::RFM, self.rfm.status()),
            (stages::CHURN, self.churn.status()),
            (stages::CLV, self.clv.status()),
            (stages::CUSTOMERS, self.customers.status()),
            (stages::ARPU, self.arpu.status()),
            (stages::COHORTS, self.cohorts.status()),
            (stages::RETENTION, self.retention.status()),
            (stages::CONVERSION, self.conversion.status()),
            (stages::CORRELATION, self.correlation.status()),
            (stages::REGRESSION, self.regression.status()),
            (stages::ROI, self.roi.status()),
            (stages::SECTOR_SEGMENTS, self.sector_segments.status()),
            (stages::SIZE_SEGMENTS, self.size_segments.status()),
            (stages::TEAM_PERFORMANCE, self.team_performance.status()),
        ]
    }

    /// Number of stages with each status: (completed, skipped, failed)
    pub fn status_counts(&self) -> (usize, usize, usize) {
        self.stage_statuses()
            .iter()
            .fold((0, 0, 0), |(c, s, f), (_, status)| match *status {
                "completed" => (c + 1, s, f),
                "skipped" => (c, s + 1, f),
                _ => (c, s, f + 1),
            })
    }
}

/// Stage names as they appear in logs and reports
pub mod stages {
    pub const RFM: &str = "rfm";
    pub const CHURN: &str = "churn";
    pub const CLV: &str = "clv";
    pub const CUSTOMERS: &str = "customers";
    pub const ARPU: &str = "arpu";
    pub const COHORTS: &str = "cohorts";
    pub const RETENTION: &str = "retention";
    pub const CONVERSION: &str = "conversion";
    pub const CORRELATION: &str = "correlation";
    pub const REGRESSION: &str = "regression";
    pub const ROI: &str = "roi";
    pub const SECTOR_SEGMENTS: &str = "sector_segments";
    pub const SIZE_SEGMENTS: &str = "size_segments";
    pub const TEAM_PERFORMANCE: &str = "team_performance";
}

/// Runs every analysis stage against a table snapshot
#[derive(Debug, Clone)]
pub struct CrmPipeline {
    config: AnalysisConfig,
}

impl CrmPipeline {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Load tables from `provider` and run. Load errors are fatal.
    pub fn run_with(&self, provider: &dyn TableProvider) -> Result<AnalysisReport> {
        log::info!("Loading tables from {}", provider.describe());
        let tables = provider.load()?;
        Ok(self.run(&tables))
    }

    pub fn run(&self, tables: &Tables) -> AnalysisReport {
        let started = Instant::now();
        let reference_date = self.config.resolved_reference_date();
        let cfg = &self.config;

        log::info!(
            "Starting CRM analysis: {} accounts, {} opportunities, reference date {}",
            tables.accounts.len(),
            tables.opportunities.len(),
            reference_date
        );

        let rfm = run_stage(stages::RFM, || compute_rfm(tables, reference_date));
        let churn = run_stage(stages::CHURN, || {
            estimate_churn(requires(stages::RFM, &rfm)?, cfg.churn_threshold_days)
        });
        let clv = run_stage(stages::CLV, || {
            estimate_clv(requires(stages::RFM, &rfm)?, cfg.customer_lifespan_years)
        });
        let customers = run_stage(stages::CUSTOMERS, || {
            Ok(assemble_customers(
                requires(stages::RFM, &rfm)?,
                churn.completed(),
                clv.completed(),
            ))
        });

        let arpu = run_stage(stages::ARPU, || compute_arpu(tables));
        let cohorts = run_stage(stages::COHORTS, || build_cohorts(tables));
        let retention = run_stage(stages::RETENTION, || {
            compute_retention(requires(stages::COHORTS, &cohorts)?)
        });
        let conversion = run_stage(stages::CONVERSION, || analyze_conversion(tables));
        let correlation = run_stage(stages::CORRELATION, || correlate_accounts(tables));
        let regression = run_stage(stages::REGRESSION, || {
            regress_close_value(tables, cfg.min_regression_rows, cfg.significance_level)
        });
        let roi = run_stage(stages::ROI, || analyze_roi(tables));
        let sector_segments = run_stage(stages::SECTOR_SEGMENTS, || segment_by_sector(tables));
        let size_segments = run_stage(stages::SIZE_SEGMENTS, || segment_by_size(tables));
        let team_performance = run_stage(stages::TEAM_PERFORMANCE, || analyze_teams(tables));

        let report = AnalysisReport {
            reference_date,
            rfm,
            churn,
            clv,
            customers,
            arpu,
            cohorts,
            retention,
            conversion,
            correlation,
            regression,
            roi,
            sector_segments,
            size_segments,
            team_performance,
        };

        let (completed, skipped, failed) = report.status_counts();
        log::info!(
            "CRM analysis complete in {:?}: {} completed, {} skipped, {} failed",
            started.elapsed(),
            completed,
            skipped,
            failed
        );
        report
    }
}

fn run_stage<T>(name: &str, stage: impl FnOnce() -> Result<T>) -> StageOutcome<T> {
    let started = Instant::now();
    let outcome = StageOutcome::from_result(name, stage());
    if outcome.is_completed() {
        log::info!("Stage '{}' completed in {:?}", name, started.elapsed());
    }
    outcome
}

fn requires<'a, T>(upstream: &str, outcome: &'a StageOutcome<T>) -> Result<&'a T> {
    outcome
        .completed()
        .ok_or_else(|| CrmError::UpstreamUnavailable(upstream.to_string()))
}
