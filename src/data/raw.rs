//! Untyped source tables and their coercion into typed rows
//!
//! Every provider reduces its source to [`RawTable`]s: a header row plus
//! optional text cells. The coercion rules live here so CSV files and SQL
//! tables behave the same:
//!
//! - numeric cells that do not parse become missing
//! - non-empty date and flag cells must parse, otherwise the load fails
//! - required columns must exist; optional ones are recorded in a [`ColumnSet`]

use super::model::{columns, table_names, Account, ColumnSet, Opportunity, Product, Tables, TeamMember};
use crate::error::{CrmError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];

/// A source table before type coercion
#[derive(Debug, Clone)]
pub struct RawTable {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn new<I, S>(name: impl Into<String>, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            headers: headers.into_iter().map(|h| h.into().trim().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; blank cells are stored as missing
    pub fn push_row(&mut self, cells: Vec<Option<String>>) {
        let cells = cells
            .into_iter()
            .map(|c| c.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
            .collect();
        self.rows.push(cells);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Columns this table carries
    pub fn columns(&self) -> ColumnSet {
        ColumnSet::new(&self.headers)
    }

    fn index_of(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.eq_ignore_ascii_case(column))
    }

    fn required(&self, column: &str) -> Result<usize> {
        self.index_of(column).ok_or_else(|| CrmError::Schema {
            table: self.name.clone(),
            column: column.to_string(),
        })
    }

    fn cursor<'a>(&'a self, row: usize, cells: &'a [Option<String>]) -> Cursor<'a> {
        Cursor {
            table: &self.name,
            row: row + 1,
            cells,
        }
    }
}

/// Read access to one row with the coercion rules applied
struct Cursor<'a> {
    table: &'a str,
    row: usize,
    cells: &'a [Option<String>],
}

impl<'a> Cursor<'a> {
    fn text(&self, idx: Option<usize>) -> Option<String> {
        idx.and_then(|i| self.cells.get(i)).and_then(|c| c.clone())
    }

    fn required_text(&self, idx: usize, column: &str) -> Result<String> {
        self.text(Some(idx)).ok_or_else(|| self.parse_error(column, ""))
    }

    fn number(&self, idx: Option<usize>, column: &str) -> Option<f64> {
        let raw = self.text(idx)?;
        match raw.replace(',', "").parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                log::debug!(
                    "{} row {}: '{}' value {:?} is not numeric, treating as missing",
                    self.table,
                    self.row,
                    column,
                    raw
                );
                None
            }
        }
    }

    fn date(&self, idx: Option<usize>, column: &str) -> Result<Option<NaiveDate>> {
        match self.text(idx) {
            None => Ok(None),
            Some(raw) => parse_date(&raw)
                .map(Some)
                .ok_or_else(|| self.parse_error(column, &raw)),
        }
    }

    fn flag(&self, idx: Option<usize>, column: &str) -> Option<bool> {
        let raw = self.text(idx)?;
        let parsed = parse_flag(&raw);
        if parsed.is_none() {
            log::debug!(
                "{} row {}: '{}' value {:?} is not a boolean, deriving from deal_stage",
                self.table,
                self.row,
                column,
                raw
            );
        }
        parsed
    }

    fn parse_error(&self, column: &str, value: &str) -> CrmError {
        CrmError::Parse {
            table: self.table.to_string(),
            row: self.row,
            column: column.to_string(),
            value: value.to_string(),
        }
    }
}

/// Parse a date-like cell; time-of-day components are dropped
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
        })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" | "t" | "yes" | "y" => Some(true),
        "0" | "0.0" | "false" | "f" | "no" | "n" => Some(false),
        _ => None,
    }
}

fn accounts_from_raw(raw: &RawTable) -> Result<Vec<Account>> {
    let id = raw.required(columns::ACCOUNT_ID)?;
    let sector = raw.index_of(columns::SECTOR);
    let employees = raw.index_of(columns::EMPLOYEES);
    let revenue = raw.index_of(columns::REVENUE);
    let year = raw.index_of(columns::YEAR_ESTABLISHED);

    raw.rows
        .iter()
        .enumerate()
        .map(|(i, cells)| {
            let row = raw.cursor(i, cells);
            Ok(Account {
                account_id: row.required_text(id, columns::ACCOUNT_ID)?,
                sector: row.text(sector),
                employees: row.number(employees, columns::EMPLOYEES),
                revenue: row.number(revenue, columns::REVENUE),
                year_established: row.number(year, columns::YEAR_ESTABLISHED),
            })
        })
        .collect()
}

fn opportunities_from_raw(raw: &RawTable) -> Result<Vec<Opportunity>> {
    let id = raw.required(columns::OPPORTUNITY_ID)?;
    let agent = raw.required(columns::AGENT_ID)?;
    let stage = raw.required(columns::DEAL_STAGE)?;
    let account = raw.index_of(columns::ACCOUNT_ID);
    let product = raw.index_of(columns::PRODUCT_ID);
    let engage = raw.index_of(columns::ENGAGE_DATE);
    let close = raw.index_of(columns::CLOSE_DATE);
    let value = raw.index_of(columns::CLOSE_VALUE);
    let won = raw.index_of(columns::IS_WON);
    let lost = raw.index_of(columns::IS_LOST);

    raw.rows
        .iter()
        .enumerate()
        .map(|(i, cells)| {
            let row = raw.cursor(i, cells);
            let deal_stage = row.required_text(stage, columns::DEAL_STAGE)?;
            let is_won = row
                .flag(won, columns::IS_WON)
                .unwrap_or_else(|| deal_stage.eq_ignore_ascii_case("won"));
            let is_lost = row
                .flag(lost, columns::IS_LOST)
                .unwrap_or_else(|| deal_stage.eq_ignore_ascii_case("lost"));

            Ok(Opportunity {
                opportunity_id: row.required_text(id, columns::OPPORTUNITY_ID)?,
                account_id: row.text(account),
                agent_id: row.required_text(agent, columns::AGENT_ID)?,
                product_id: row.text(product),
                deal_stage,
                engage_date: row.date(engage, columns::ENGAGE_DATE)?,
                close_date: row.date(close, columns::CLOSE_DATE)?,
                close_value: row.number(value, columns::CLOSE_VALUE),
                is_won,
                is_lost,
            })
        })
        .collect()
}

fn products_from_raw(raw: &RawTable) -> Result<Vec<Product>> {
    let id = raw.required(columns::PRODUCT_ID)?;
    let name = raw.index_of(columns::PRODUCT_NAME);
    let price = raw.index_of(columns::SALES_PRICE);

    raw.rows
        .iter()
        .enumerate()
        .map(|(i, cells)| {
            let row = raw.cursor(i, cells);
            Ok(Product {
                product_id: row.required_text(id, columns::PRODUCT_ID)?,
                name: row.text(name),
                sales_price: row.number(price, columns::SALES_PRICE),
            })
        })
        .collect()
}

fn teams_from_raw(raw: &RawTable) -> Result<Vec<TeamMember>> {
    let agent = raw.required(columns::AGENT_ID)?;
    let manager = raw.required(columns::MANAGER)?;

    raw.rows
        .iter()
        .enumerate()
        .map(|(i, cells)| {
            let row = raw.cursor(i, cells);
            Ok(TeamMember {
                agent_id: row.required_text(agent, columns::AGENT_ID)?,
                manager: row.required_text(manager, columns::MANAGER)?,
            })
        })
        .collect()
}

impl Tables {
    /// Coerce the four raw source tables into a typed snapshot
    pub fn from_raw(
        accounts: &RawTable,
        sales_pipeline: &RawTable,
        products: &RawTable,
        sales_teams: &RawTable,
    ) -> Result<Self> {
        let tables = Tables {
            accounts: accounts_from_raw(accounts)?,
            opportunities: opportunities_from_raw(sales_pipeline)?,
            products: products_from_raw(products)?,
            sales_teams: teams_from_raw(sales_teams)?,
            account_columns: accounts.columns(),
            product_columns: products.columns(),
        };

        log::debug!(
            "Coerced {} {}, {} {}, {} {}, {} {}",
            tables.accounts.len(),
            table_names::ACCOUNTS,
            tables.opportunities.len(),
            table_names::SALES_PIPELINE,
            tables.products.len(),
            table_names::PRODUCTS,
            tables.sales_teams.len(),
            table_names::SALES_TEAMS
        );

        Ok(tables)
    }
}
