//! Table provider reading the four tables from a SQLite database

use super::model::{table_names, Tables};
use super::raw::RawTable;
use super::TableProvider;
use crate::error::{CrmError, Result};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

/// Reads `accounts`, `sales_pipeline`, `products` and `sales_teams` tables
#[derive(Debug, Clone)]
pub struct SqliteTableProvider {
    db_path: PathBuf,
}

impl SqliteTableProvider {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    fn open(&self) -> Result<Connection> {
        if !self.db_path.exists() {
            return Err(CrmError::DataError(format!(
                "Database not found at {}",
                self.db_path.display()
            )));
        }
        Ok(Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY,
        )?)
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }
}

/// Read a whole table with `SELECT *`, rendering every cell as text
pub fn read_table(conn: &Connection, table: &str) -> Result<RawTable> {
    // Table names come from a fixed list, never from user input
    let mut stmt = conn.prepare(&format!("SELECT * FROM \"{}\"", table))?;
    let headers: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = headers.len();
    let mut raw = RawTable::new(table, headers);

    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(width);
        for i in 0..width {
            cells.push(cell_text(row.get_ref(i)?));
        }
        raw.push_row(cells);
    }

    log::debug!("Read {} rows from table {}", raw.len(), table);
    Ok(raw)
}

fn cell_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(_) => None,
    }
}

impl TableProvider for SqliteTableProvider {
    fn load(&self) -> Result<Tables> {
        let conn = self.open()?;
        let accounts = read_table(&conn, table_names::ACCOUNTS)?;
        let pipeline = read_table(&conn, table_names::SALES_PIPELINE)?;
        let products = read_table(&conn, table_names::PRODUCTS)?;
        let teams = read_table(&conn, table_names::SALES_TEAMS)?;

        Tables::from_raw(&accounts, &pipeline, &products, &teams)
    }

    fn describe(&self) -> String {
        format!("sqlite database {}", self.db_path.display())
    }
}
