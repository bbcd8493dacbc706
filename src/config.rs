//! Analysis configuration

use crate::error::{CrmError, Result};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Tunable constants for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Instant recency is measured from; `None` means today (UTC)
    pub reference_date: Option<NaiveDate>,
    /// Accounts whose recency exceeds this many days are churned
    pub churn_threshold_days: i64,
    /// Assumed customer lifespan used by the CLV formula
    pub customer_lifespan_years: f64,
    /// Alpha for the regression slope significance test
    pub significance_level: f64,
    /// Regression runs only with strictly more complete rows than this
    pub min_regression_rows: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            reference_date: None,
            churn_threshold_days: 180,
            customer_lifespan_years: 3.0,
            significance_level: 0.05,
            min_regression_rows: 10,
        }
    }
}

impl AnalysisConfig {
    /// Fix the reference date
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    /// Resolve the reference date, falling back to today
    pub fn resolved_reference_date(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Utc::now().date_naive())
    }

    /// Reject values no analysis can use
    pub fn validate(&self) -> Result<()> {
        if self.churn_threshold_days < 0 {
            return Err(CrmError::ConfigError(format!(
                "churn_threshold_days must be non-negative, got {}",
                self.churn_threshold_days
            )));
        }
        if self.customer_lifespan_years.is_nan() || self.customer_lifespan_years <= 0.0 {
            return Err(CrmError::ConfigError(format!(
                "customer_lifespan_years must be positive, got {}",
                self.customer_lifespan_years
            )));
        }
        if self.significance_level.is_nan()
            || self.significance_level <= 0.0
            || self.significance_level >= 1.0
        {
            return Err(CrmError::ConfigError(format!(
                "significance_level must be in (0, 1), got {}",
                self.significance_level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.churn_threshold_days, 180);
        assert_eq!(config.customer_lifespan_years, 3.0);
        assert_eq!(config.significance_level, 0.05);
        assert_eq!(config.min_regression_rows, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AnalysisConfig::default();
        config.customer_lifespan_years = 0.0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.significance_level = 1.5;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.churn_threshold_days = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_nan() {
        let mut config = AnalysisConfig::default();
        config.customer_lifespan_years = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.significance_level = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"churn_threshold_days": 90, "reference_date": "2017-12-31"}"#)
                .unwrap();
        assert_eq!(config.churn_threshold_days, 90);
        assert_eq!(config.customer_lifespan_years, 3.0);
        assert_eq!(
            config.resolved_reference_date(),
            NaiveDate::from_ymd_opt(2017, 12, 31).unwrap()
        );
    }
}
