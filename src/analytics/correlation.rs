//! Correlation and simple linear regression between account attributes and won value
//!
//! Both analyses run on accounts inner-joined with their total won close value.

use crate::data::{columns, table_names, Account, Tables};
use crate::error::{CrmError, Result};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::{Data, Distribution};

/// Guards the t statistic against a perfect fit
const TINY: f64 = 1.0e-20;

const CANDIDATE_COLUMNS: [&str; 4] = [
    columns::EMPLOYEES,
    columns::REVENUE,
    columns::YEAR_ESTABLISHED,
    columns::CLOSE_VALUE,
];

/// Accounts that have at least one won deal, with their won total
struct MergedRow<'a> {
    account: &'a Account,
    close_value: f64,
}

impl MergedRow<'_> {
    fn value(&self, column: &str) -> Option<f64> {
        match column {
            columns::EMPLOYEES => self.account.employees,
            columns::REVENUE => self.account.revenue,
            columns::YEAR_ESTABLISHED => self.account.year_established,
            columns::CLOSE_VALUE => Some(self.close_value),
            _ => None,
        }
    }
}

fn merged_rows(tables: &Tables) -> Vec<MergedRow<'_>> {
    let totals = super::won_value_by_account(tables);
    tables
        .accounts
        .iter()
        .filter_map(|account| {
            totals.get(account.account_id.as_str()).map(|&close_value| MergedRow {
                account,
                close_value,
            })
        })
        .collect()
}

/// Pearson correlation coefficient; `None` with fewer than two points or zero variance
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }

    let x_data = Data::new(x[..n].to_vec());
    let y_data = Data::new(y[..n].to_vec());
    let x_mean = x_data.mean()?;
    let y_mean = y_data.mean()?;
    let x_std = x_data.std_dev()?;
    let y_std = y_data.std_dev()?;

    if x_std == 0.0 || y_std == 0.0 {
        return None;
    }

    let covariance: f64 = x[..n]
        .iter()
        .zip(y[..n].iter())
        .map(|(&xi, &yi)| (xi - x_mean) * (yi - y_mean))
        .sum::<f64>()
        / (n - 1) as f64;

    Some((covariance / (x_std * y_std)).clamp(-1.0, 1.0))
}

/// Pairwise Pearson correlations over the numeric columns that are present
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// Row-major, `values[i][j]` pairs `columns[i]` with `columns[j]`
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }

    /// Correlation of every other column with `target`, strongest positive first
    pub fn correlations_with(&self, target: &str) -> Vec<(String, Option<f64>)> {
        let Some(t) = self.columns.iter().position(|c| c == target) else {
            return Vec::new();
        };
        let mut pairs: Vec<(String, Option<f64>)> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != t)
            .map(|(i, c)| (c.clone(), self.values[i][t]))
            .collect();
        pairs.sort_by(|a, b| super::desc_undefined_last(a.1, b.1));
        pairs
    }
}

/// Correlate employees, revenue, year established and won value across accounts.
///
/// Absent account columns are left out; each pair uses the rows where both
/// values are present.
pub fn correlate_accounts(tables: &Tables) -> Result<CorrelationMatrix> {
    let available: Vec<&str> = CANDIDATE_COLUMNS
        .iter()
        .copied()
        .filter(|c| *c == columns::CLOSE_VALUE || tables.account_columns.contains(c))
        .collect();

    if available.len() < 2 {
        return Err(CrmError::InsufficientData(format!(
            "correlation needs two numeric columns, found {}",
            available.len()
        )));
    }

    let rows = merged_rows(tables);
    let values = available
        .iter()
        .map(|a| {
            available
                .iter()
                .map(|b| {
                    let (x, y): (Vec<f64>, Vec<f64>) = rows
                        .iter()
                        .filter_map(|r| Some((r.value(a)?, r.value(b)?)))
                        .unzip();
                    let r = pearson(&x, &y);
                    if a == b {
                        r.map(|_| 1.0)
                    } else {
                        r
                    }
                })
                .collect()
        })
        .collect();

    Ok(CorrelationMatrix {
        columns: available.iter().map(|c| c.to_string()).collect(),
        values,
    })
}

/// Ordinary least squares fit of one response on one predictor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionResult {
    pub predictor: String,
    pub response: String,
    pub observations: usize,
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// Two-sided p-value of the slope t-test
    pub p_value: f64,
    pub std_err: f64,
    pub significant: bool,
}

impl RegressionResult {
    /// Fitted response at `x`
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Simple linear regression of `y` on `x`.
///
/// Returns `None` with fewer than three points or when every `x` is identical.
pub fn linear_regression(x: &[f64], y: &[f64], alpha: f64) -> Result<Option<RegressionResult>> {
    let n = x.len().min(y.len());
    if n < 3 {
        return Ok(None);
    }
    let (x, y) = (&x[..n], &y[..n]);
    let nf = n as f64;

    let x_mean = x.iter().sum::<f64>() / nf;
    let y_mean = y.iter().sum::<f64>() / nf;
    let ss_x: f64 = x.iter().map(|xi| (xi - x_mean).powi(2)).sum::<f64>() / nf;
    let ss_y: f64 = y.iter().map(|yi| (yi - y_mean).powi(2)).sum::<f64>() / nf;
    let ss_xy: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| (xi - x_mean) * (yi - y_mean))
        .sum::<f64>()
        / nf;

    if ss_x == 0.0 {
        return Ok(None);
    }

    let r = if ss_y == 0.0 {
        0.0
    } else {
        (ss_xy / (ss_x * ss_y).sqrt()).clamp(-1.0, 1.0)
    };
    let slope = ss_xy / ss_x;
    let intercept = y_mean - slope * x_mean;

    let df = nf - 2.0;
    let t = r * (df / ((1.0 - r + TINY) * (1.0 + r + TINY))).sqrt();
    let dist = StudentsT::new(0.0, 1.0, df).map_err(|e| CrmError::DataError(e.to_string()))?;
    let p_value = (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0);
    let std_err = ((1.0 - r * r) * ss_y / ss_x / df).sqrt();

    Ok(Some(RegressionResult {
        predictor: String::new(),
        response: String::new(),
        observations: n,
        slope,
        intercept,
        r_squared: r * r,
        p_value,
        std_err,
        significant: p_value < alpha,
    }))
}

/// Regressions of won value on employees and on revenue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionAnalysis {
    /// Rows with employees, revenue and won value all present
    pub complete_rows: usize,
    pub results: Vec<RegressionResult>,
}

impl RegressionAnalysis {
    pub fn for_predictor(&self, predictor: &str) -> Option<&RegressionResult> {
        self.results.iter().find(|r| r.predictor == predictor)
    }
}

/// Fit won value against employees and, separately, against revenue.
///
/// Needs both columns and strictly more than `min_rows` complete rows.
pub fn regress_close_value(tables: &Tables, min_rows: usize, alpha: f64) -> Result<RegressionAnalysis> {
    for column in [columns::EMPLOYEES, columns::REVENUE] {
        if !tables.account_columns.contains(column) {
            return Err(CrmError::missing_column(table_names::ACCOUNTS, column));
        }
    }

    let complete: Vec<(f64, f64, f64)> = merged_rows(tables)
        .iter()
        .filter_map(|r| Some((r.account.employees?, r.account.revenue?, r.close_value)))
        .collect();

    if complete.len() <= min_rows {
        return Err(CrmError::InsufficientData(format!(
            "regression needs more than {} complete rows, found {}",
            min_rows,
            complete.len()
        )));
    }

    let close_values: Vec<f64> = complete.iter().map(|r| r.2).collect();
    let predictors = [
        (columns::EMPLOYEES, complete.iter().map(|r| r.0).collect::<Vec<_>>()),
        (columns::REVENUE, complete.iter().map(|r| r.1).collect::<Vec<_>>()),
    ];

    let mut results = Vec::new();
    for (name, x) in predictors {
        match linear_regression(&x, &close_values, alpha)? {
            Some(mut fit) => {
                fit.predictor = name.to_string();
                fit.response = columns::CLOSE_VALUE.to_string();
                results.push(fit);
            }
            None => log::warn!("All '{}' values identical, regression skipped", name),
        }
    }

    Ok(RegressionAnalysis {
        complete_rows: complete.len(),
        results,
    })
}
