//! Plain-text rendering of analysis results

use crate::analytics::{
    ArpuAnalysis, ChurnAnalysis, ClvAnalysis, CohortMatrix, ConversionAnalysis,
    CorrelationMatrix, CustomerRecord, GroupConversion, ManagerPerformance, RegressionAnalysis,
    RegressionResult, RetentionMatrix, RfmTable, RoiAnalysis, SegmentStats,
};
use crate::pipeline::{AnalysisReport, StageOutcome};
use std::fmt;

/// Rows shown for long per-account and per-group listings
const MAX_ROWS: usize = 10;

/// Months of ARPU trend shown
const TREND_MONTHS: usize = 6;

fn opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "n/a".to_string(),
    }
}

fn pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}%", v),
        None => "n/a".to_string(),
    }
}

impl<T: fmt::Display> fmt::Display for StageOutcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageOutcome::Completed(value) => write!(f, "{}", value),
            StageOutcome::Skipped(reason) => writeln!(f, "  (skipped: {})", reason),
            StageOutcome::Failed(reason) => writeln!(f, "  (failed: {})", reason),
        }
    }
}

impl fmt::Display for RfmTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Reference Date:     {}", self.reference_date)?;
        writeln!(f, "  Customers:          {}", self.len())?;
        writeln!(f, "  Mean Recency:       {} days", opt(self.mean_recency(), 1))?;
        writeln!(f, "  Mean Frequency:     {}", opt(self.mean_frequency(), 2))?;
        writeln!(f, "  Mean Monetary:      ${}", opt(self.mean_monetary(), 2))?;
        writeln!(
            f,
            "  Binning:            R {:?}, F {:?}, M {:?}",
            self.binning.recency, self.binning.frequency, self.binning.monetary
        )?;
        writeln!(f, "  Segments:")?;
        for (segment, count) in self.segment_counts() {
            writeln!(f, "    {:<22}{}", segment.to_string(), count)?;
        }
        Ok(())
    }
}

impl fmt::Display for ChurnAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Threshold:          {} days", self.threshold_days)?;
        writeln!(f, "  Active Customers:   {}", self.active)?;
        writeln!(f, "  Churned Customers:  {}", self.churned)?;
        writeln!(f, "  Churn Rate:         {}", pct(self.churn_rate))?;
        for p in &self.profiles {
            writeln!(
                f,
                "    {:<8} n={:<5} freq {:.2}  monetary ${:.2}  recency {:.1}d",
                if p.is_churned { "churned" } else { "active" },
                p.accounts,
                p.mean_frequency,
                p.mean_monetary,
                p.mean_recency
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for ClvAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Lifespan:           {} years", self.lifespan_years)?;
        writeln!(f, "  Mean CLV:           ${}", opt(self.mean, 2))?;
        writeln!(f, "  Median CLV:         ${}", opt(self.median, 2))?;
        writeln!(f, "  Min CLV:            ${}", opt(self.min, 2))?;
        writeln!(f, "  Max CLV:            ${}", opt(self.max, 2))?;
        writeln!(f, "  Segments ({:?}):", self.strategy)?;
        for (segment, count) in self.segment_counts() {
            writeln!(f, "    {:<22}{}", segment.to_string(), count)?;
        }
        Ok(())
    }
}

impl fmt::Display for CustomerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<24} R{} F{} M{} {:<20} recency {:>5}d  orders {:>3}  ${:>12.2}",
            self.account_id,
            self.r_score,
            self.f_score,
            self.m_score,
            self.segment.to_string(),
            self.recency_days,
            self.frequency,
            self.monetary
        )?;
        if let Some(churned) = self.is_churned {
            write!(f, "  {}", if churned { "churned" } else { "active" })?;
        }
        if let (Some(clv), Some(segment)) = (self.clv, self.clv_segment) {
            write!(f, "  CLV ${:.2} ({})", clv, segment)?;
        }
        Ok(())
    }
}

impl fmt::Display for ArpuAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Total Revenue:      ${:.2}", self.total_revenue)?;
        writeln!(f, "  Total Customers:    {}", self.total_customers)?;
        writeln!(f, "  ARPU:               ${}", opt(self.arpu, 2))?;
        writeln!(f, "  Monthly (last {}):", TREND_MONTHS)?;
        for m in self.last_months(TREND_MONTHS) {
            writeln!(
                f,
                "    {}  revenue ${:>12.2}  purchasers {:>4}  ARPU ${}",
                m.month,
                m.revenue,
                m.purchasers,
                opt(m.arpu, 2)
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for CohortMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Cohorts:            {}", self.len())?;
        for cohort in self.cohorts() {
            let row = self.row(cohort).into_iter().flatten();
            let cells: Vec<String> = row.map(|(p, n)| format!("m{}={}", p, n)).collect();
            writeln!(f, "    {}  {}", cohort, cells.join(" "))?;
        }
        Ok(())
    }
}

impl fmt::Display for RetentionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Avg Month-1:        {}", pct(self.average(1)))?;
        writeln!(f, "  Avg Month-3:        {}", pct(self.average(3)))?;
        for cohort in self.cohorts() {
            let row = self.row(cohort).into_iter().flatten();
            let cells: Vec<String> = row.map(|(p, r)| format!("m{}={:.1}", p, r)).collect();
            writeln!(f, "    {}  {}", cohort, cells.join(" "))?;
        }
        Ok(())
    }
}

impl fmt::Display for GroupConversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<24}{:>6.2}%  ({}/{})",
            self.key, self.rate, self.won, self.opportunities
        )
    }
}

impl fmt::Display for ConversionAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Opportunities:      {}", self.total)?;
        writeln!(f, "  Won:                {}", self.won)?;
        writeln!(f, "  Lost:               {}", self.lost)?;
        writeln!(f, "  Conversion Rate:    {}", pct(self.rate))?;
        writeln!(f, "  By Stage:")?;
        for g in &self.by_stage {
            writeln!(f, "    {}", g)?;
        }
        writeln!(f, "  Top Agents:")?;
        for g in self.by_agent.iter().take(MAX_ROWS) {
            writeln!(f, "    {}", g)?;
        }
        Ok(())
    }
}

impl fmt::Display for CorrelationMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  {:<18}", "")?;
        for c in &self.columns {
            write!(f, "{:>18}", c)?;
        }
        writeln!(f)?;
        for (name, row) in self.columns.iter().zip(&self.values) {
            write!(f, "  {:<18}", name)?;
            for v in row {
                write!(f, "{:>18}", opt(*v, 3))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for RegressionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ~ {}: slope {:.4}, intercept {:.2}, R² {:.4}, p {:.4}{}",
            self.response,
            self.predictor,
            self.slope,
            self.intercept,
            self.r_squared,
            self.p_value,
            if self.significant { " (significant)" } else { "" }
        )
    }
}

impl fmt::Display for RegressionAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Complete Rows:      {}", self.complete_rows)?;
        for r in &self.results {
            writeln!(f, "    {}", r)?;
        }
        Ok(())
    }
}

impl fmt::Display for RoiAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Mean ROI:           {}", pct(self.mean_roi))?;
        for p in &self.products {
            writeln!(
                f,
                "    {:<20} deals {:>5}  value ${:>12.2}  list ${:>12}  ROI {}",
                p.name.as_deref().unwrap_or(&p.product_id),
                p.deals,
                p.total_close_value,
                opt(p.total_list_price, 2),
                pct(p.roi)
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for SegmentStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<20} accounts {:>5}  purchasing {:>5}  total ${:>12.2}  mean ${}",
            self.segment,
            self.accounts,
            self.purchasing_accounts,
            self.total_revenue,
            opt(self.mean_revenue, 2)
        )
    }
}

impl fmt::Display for ManagerPerformance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<22} opps {:>5}  won {:>5}  value ${:>12.2}  conv {:>6.2}%  avg deal ${}",
            self.manager,
            self.opportunities,
            self.won,
            self.total_close_value,
            self.conversion_rate,
            opt(self.avg_deal_size, 2)
        )
    }
}

fn render<T: fmt::Display>(outcome: &StageOutcome<T>) -> String {
    outcome.to_string()
}

fn render_rows<T: fmt::Display>(outcome: &StageOutcome<Vec<T>>, limit: usize) -> String {
    match outcome {
        StageOutcome::Completed(rows) => {
            let mut out = String::new();
            for row in rows.iter().take(limit) {
                out.push_str(&format!("    {}\n", row));
            }
            if rows.len() > limit {
                out.push_str(&format!("    ... {} more\n", rows.len() - limit));
            }
            out
        }
        StageOutcome::Skipped(reason) => format!("  (skipped: {})\n", reason),
        StageOutcome::Failed(reason) => format!("  (failed: {})\n", reason),
    }
}

impl AnalysisReport {
    /// Section titles with their rendered bodies, in run order
    pub fn sections(&self) -> Vec<(&'static str, String)> {
        vec![
            ("RFM Analysis", render(&self.rfm)),
            ("Churn", render(&self.churn)),
            ("Customer Lifetime Value", render(&self.clv)),
            ("Customers", render_rows(&self.customers, MAX_ROWS)),
            ("ARPU", render(&self.arpu)),
            ("Cohorts", render(&self.cohorts)),
            ("Retention", render(&self.retention)),
            ("Conversion", render(&self.conversion)),
            ("Correlation", render(&self.correlation)),
            ("Regression", render(&self.regression)),
            ("Product ROI", render(&self.roi)),
            ("Sector Segments", render_rows(&self.sector_segments, usize::MAX)),
            ("Size Segments", render_rows(&self.size_segments, usize::MAX)),
            ("Team Performance", render_rows(&self.team_performance, usize::MAX)),
        ]
    }

    /// One-line status per stage
    pub fn status_table(&self) -> String {
        self.stage_statuses()
            .iter()
            .map(|(name, status)| format!("  {:<18}{}\n", name, status))
            .collect()
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CRM Analysis Report ({})", self.reference_date)?;
        for (title, body) in self.sections() {
            writeln!(f)?;
            writeln!(f, "{}:", title)?;
            write!(f, "{}", body)?;
        }
        let (completed, skipped, failed) = self.status_counts();
        writeln!(f)?;
        writeln!(
            f,
            "Stages: {} completed, {} skipped, {} failed",
            completed, skipped, failed
        )?;
        if skipped + failed > 0 {
            for (name, status) in self.stage_statuses() {
                if status != "completed" {
                    writeln!(f, "  {:<18}{}", name, status)?;
                }
            }
        }
        Ok(())
    }
}
