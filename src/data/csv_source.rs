//! Table provider reading the four tables from CSV files

use super::model::{table_names, Tables};
use super::raw::RawTable;
use super::TableProvider;
use crate::error::{CrmError, Result};
use csv::ReaderBuilder;
use std::path::{Path, PathBuf};

/// CSV dialect and file naming
#[derive(Debug, Clone)]
pub struct CsvFormat {
    /// Field delimiter
    pub delimiter: u8,
    /// File extension appended to each table name
    pub extension: String,
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self {
            delimiter: b',',
            extension: "csv".to_string(),
        }
    }
}

/// Reads `accounts.csv`, `sales_pipeline.csv`, `products.csv` and
/// `sales_teams.csv` from one directory
#[derive(Debug, Clone)]
pub struct CsvTableProvider {
    dir: PathBuf,
    format: CsvFormat,
}

impl CsvTableProvider {
    /// Create with default format
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            format: CsvFormat::default(),
        }
    }

    /// Create with custom format
    pub fn with_format(dir: impl Into<PathBuf>, format: CsvFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
        }
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", table, self.format.extension))
    }

    /// Read one CSV file into a raw table
    pub fn read_raw(&self, table: &str) -> Result<RawTable> {
        let path = self.table_path(table);
        read_csv(&path, table, self.format.delimiter)
    }
}

fn read_csv(path: &Path, table: &str, delimiter: u8) -> Result<RawTable> {
    if !path.exists() {
        return Err(CrmError::DataError(format!(
            "Table '{}' not found at {}",
            table,
            path.display()
        )));
    }

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;

    let headers = rdr.headers()?.clone();
    let width = headers.len();
    let mut raw = RawTable::new(table, headers.iter());

    for result in rdr.records() {
        let record = result?;
        let cells = (0..width)
            .map(|i| record.get(i).map(str::to_string))
            .collect();
        raw.push_row(cells);
    }

    log::debug!("Read {} rows from {}", raw.len(), path.display());
    Ok(raw)
}

impl TableProvider for CsvTableProvider {
    fn load(&self) -> Result<Tables> {
        let accounts = self.read_raw(table_names::ACCOUNTS)?;
        let pipeline = self.read_raw(table_names::SALES_PIPELINE)?;
        let products = self.read_raw(table_names::PRODUCTS)?;
        let teams = self.read_raw(table_names::SALES_TEAMS)?;

        Tables::from_raw(&accounts, &pipeline, &products, &teams)
    }

    fn describe(&self) -> String {
        format!("csv directory {}", self.dir.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_tables(dir: &Path) {
        fs::write(
            dir.join("accounts.csv"),
            "account_id,sector,employees,revenue,year_established\n\
             Acme,retail,120,1500.5,1990\n\
             Globex,technology,,900,2001\n",
        )
        .unwrap();
        fs::write(
            dir.join("sales_pipeline.csv"),
            "opportunity_id,agent_id,product_id,account_id,deal_stage,engage_date,close_date,close_value,is_won,is_lost\n\
             O1,Anna,GTX,Acme,Won,2017-01-02,2017-02-10,1000,1,0\n\
             O2,Anna,GTX,Globex,Lost,2017-01-05,2017-03-01,0,0,1\n\
             O3,Boris,MG,,Engaging,2017-04-01,,,0,0\n",
        )
        .unwrap();
        fs::write(
            dir.join("products.csv"),
            "product_id,product,sales_price\nGTX,GTX Basic,550\nMG,MG Special,55\n",
        )
        .unwrap();
        fs::write(
            dir.join("sales_teams.csv"),
            "agent_id,manager\nAnna,Dustin\nBoris,Melvin\n",
        )
        .unwrap();
    }

    #[test]
    fn test_load_directory() {
        let dir = tempdir().unwrap();
        write_tables(dir.path());

        let tables = CsvTableProvider::new(dir.path()).load().unwrap();
        assert_eq!(tables.accounts.len(), 2);
        assert_eq!(tables.accounts[1].employees, None);
        assert_eq!(tables.opportunities.len(), 3);
        assert_eq!(tables.opportunities[2].account_id, None);
        assert_eq!(tables.opportunities[2].close_date, None);
        assert_eq!(tables.won_deals().count(), 1);
        assert_eq!(tables.products[0].sales_price, Some(550.0));
        assert_eq!(tables.sales_teams[1].manager, "Melvin");
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let result = CsvTableProvider::new(dir.path()).load();
        assert!(matches!(result, Err(CrmError::DataError(_))));
    }

    #[test]
    fn test_custom_delimiter() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("accounts.tsv"), "account_id\tsector\nAcme\tretail\n").unwrap();

        let provider = CsvTableProvider::with_format(
            dir.path(),
            CsvFormat {
                delimiter: b'\t',
                extension: "tsv".to_string(),
            },
        );
        let raw = provider.read_raw("accounts").unwrap();
        assert_eq!(raw.len(), 1);
        assert!(raw.columns().contains("sector"));
    }
}
