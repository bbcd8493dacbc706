//! # CRM Insights
//!
//! Customer analytics over a CRM sales snapshot: RFM scoring, churn, customer
//! lifetime value, ARPU, cohort retention, conversion, correlation and
//! regression, product ROI, account segmentation and team performance.
//!
//! The four source tables (accounts, sales pipeline, products, sales teams)
//! are loaded once through a [`data::TableProvider`]; every analysis is a pure
//! function of that snapshot.
//!
//! ## Example
//!
//! ```rust,no_run
//! use crm_insights::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let provider = CsvTableProvider::new("data/crm");
//!     let pipeline = CrmPipeline::new(AnalysisConfig::default())?;
//!     let report = pipeline.run_with(&provider)?;
//!
//!     if let Some(churn) = report.churn.completed() {
//!         println!("churned accounts: {}", churn.churned);
//!     }
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod types;

pub mod prelude {
    //! Commonly used types and traits
    pub use crate::analytics::{ChurnAnalysis, ClvSegment, CustomerRecord, RfmSegment, RfmTable};
    pub use crate::config::AnalysisConfig;
    pub use crate::data::{
        Account, CsvTableProvider, InMemoryTableProvider, Opportunity, Product, TableProvider,
        Tables, TeamMember,
    };
    pub use crate::error::{CrmError, Result};
    pub use crate::pipeline::{AnalysisReport, CrmPipeline, StageOutcome};
    pub use crate::types::*;
}
