//! Source tables - typed rows, coercion, and table providers

pub mod csv_source;
pub mod model;
pub mod raw;
#[cfg(feature = "rusqlite-support")]
pub mod sqlite_source;

pub use csv_source::{CsvFormat, CsvTableProvider};
pub use model::{columns, table_names, Account, ColumnSet, Opportunity, Product, Tables, TeamMember};
pub use raw::RawTable;
#[cfg(feature = "rusqlite-support")]
pub use sqlite_source::SqliteTableProvider;

use crate::error::Result;

/// Supplies the four snapshot tables to a pipeline run
pub trait TableProvider {
    /// Load accounts, sales pipeline, products and sales teams
    fn load(&self) -> Result<Tables>;

    /// Short description for logs
    fn describe(&self) -> String {
        "table provider".to_string()
    }
}

/// Provider over tables already held in memory (fixtures, benches)
#[derive(Debug, Clone)]
pub struct InMemoryTableProvider {
    tables: Tables,
}

impl InMemoryTableProvider {
    pub fn new(tables: Tables) -> Self {
        Self { tables }
    }
}

impl TableProvider for InMemoryTableProvider {
    fn load(&self) -> Result<Tables> {
        Ok(self.tables.clone())
    }

    fn describe(&self) -> String {
        format!(
            "in-memory ({} accounts, {} opportunities)",
            self.tables.accounts.len(),
            self.tables.opportunities.len()
        )
    }
}
