//! Typed snapshot rows and the four-table bundle

use crate::types::{AccountId, AgentId, Money, ProductId};
use chrono::NaiveDate;
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

/// Column names shared by the providers and the analyzers
pub mod columns {
    pub const ACCOUNT_ID: &str = "account_id";
    pub const SECTOR: &str = "sector";
    pub const EMPLOYEES: &str = "employees";
    pub const REVENUE: &str = "revenue";
    pub const YEAR_ESTABLISHED: &str = "year_established";

    pub const OPPORTUNITY_ID: &str = "opportunity_id";
    pub const AGENT_ID: &str = "agent_id";
    pub const PRODUCT_ID: &str = "product_id";
    pub const DEAL_STAGE: &str = "deal_stage";
    pub const ENGAGE_DATE: &str = "engage_date";
    pub const CLOSE_DATE: &str = "close_date";
    pub const CLOSE_VALUE: &str = "close_value";
    pub const IS_WON: &str = "is_won";
    pub const IS_LOST: &str = "is_lost";

    pub const PRODUCT_NAME: &str = "product";
    pub const SALES_PRICE: &str = "sales_price";

    pub const MANAGER: &str = "manager";
}

/// Table names as the providers see them
pub mod table_names {
    pub const ACCOUNTS: &str = "accounts";
    pub const SALES_PIPELINE: &str = "sales_pipeline";
    pub const PRODUCTS: &str = "products";
    pub const SALES_TEAMS: &str = "sales_teams";
}

/// Customer account snapshot row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: AccountId,
    pub sector: Option<String>,
    pub employees: Option<f64>,
    pub revenue: Option<Money>,
    pub year_established: Option<f64>,
}

impl Account {
    /// Account with only an id; attributes are filled with the `with_*` builders
    pub fn new(account_id: impl Into<AccountId>) -> Self {
        Self {
            account_id: account_id.into(),
            sector: None,
            employees: None,
            revenue: None,
            year_established: None,
        }
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    pub fn with_employees(mut self, employees: f64) -> Self {
        self.employees = Some(employees);
        self
    }

    pub fn with_revenue(mut self, revenue: Money) -> Self {
        self.revenue = Some(revenue);
        self
    }

    pub fn with_year_established(mut self, year: f64) -> Self {
        self.year_established = Some(year);
        self
    }
}

/// One row of the sales pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub opportunity_id: String,
    /// Open prospecting deals carry no account yet
    pub account_id: Option<AccountId>,
    pub agent_id: AgentId,
    pub product_id: Option<ProductId>,
    pub deal_stage: String,
    pub engage_date: Option<NaiveDate>,
    pub close_date: Option<NaiveDate>,
    pub close_value: Option<Money>,
    pub is_won: bool,
    pub is_lost: bool,
}

impl Opportunity {
    /// A closed-won deal
    pub fn won(
        opportunity_id: impl Into<String>,
        account_id: impl Into<AccountId>,
        agent_id: impl Into<AgentId>,
        close_date: NaiveDate,
        close_value: Money,
    ) -> Self {
        Self {
            opportunity_id: opportunity_id.into(),
            account_id: Some(account_id.into()),
            agent_id: agent_id.into(),
            product_id: None,
            deal_stage: "Won".to_string(),
            engage_date: None,
            close_date: Some(close_date),
            close_value: Some(close_value),
            is_won: true,
            is_lost: false,
        }
    }

    /// A closed-lost deal
    pub fn lost(
        opportunity_id: impl Into<String>,
        account_id: impl Into<AccountId>,
        agent_id: impl Into<AgentId>,
        close_date: NaiveDate,
    ) -> Self {
        Self {
            opportunity_id: opportunity_id.into(),
            account_id: Some(account_id.into()),
            agent_id: agent_id.into(),
            product_id: None,
            deal_stage: "Lost".to_string(),
            engage_date: None,
            close_date: Some(close_date),
            close_value: Some(0.0),
            is_won: false,
            is_lost: true,
        }
    }

    /// A deal still in progress at `stage`
    pub fn open(
        opportunity_id: impl Into<String>,
        agent_id: impl Into<AgentId>,
        stage: impl Into<String>,
    ) -> Self {
        Self {
            opportunity_id: opportunity_id.into(),
            account_id: None,
            agent_id: agent_id.into(),
            product_id: None,
            deal_stage: stage.into(),
            engage_date: None,
            close_date: None,
            close_value: None,
            is_won: false,
            is_lost: false,
        }
    }

    pub fn with_product(mut self, product_id: impl Into<ProductId>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    pub fn with_account(mut self, account_id: impl Into<AccountId>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn with_engage_date(mut self, date: NaiveDate) -> Self {
        self.engage_date = Some(date);
        self
    }
}

/// Product catalog row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: ProductId,
    pub name: Option<String>,
    pub sales_price: Option<Money>,
}

impl Product {
    pub fn new(product_id: impl Into<ProductId>, name: impl Into<String>, sales_price: Money) -> Self {
        Self {
            product_id: product_id.into(),
            name: Some(name.into()),
            sales_price: Some(sales_price),
        }
    }
}

/// Agent to manager mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub agent_id: AgentId,
    pub manager: String,
}

impl TeamMember {
    pub fn new(agent_id: impl Into<AgentId>, manager: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            manager: manager.into(),
        }
    }
}

/// Names of the columns a source table actually carried
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSet {
    names: HashSet<String>,
}

impl ColumnSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| n.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.names.contains(&column.to_ascii_lowercase())
    }

    pub fn remove(&mut self, column: &str) -> bool {
        self.names.remove(&column.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn all_accounts() -> Self {
        use columns::*;
        Self::new([ACCOUNT_ID, SECTOR, EMPLOYEES, REVENUE, YEAR_ESTABLISHED])
    }

    fn all_products() -> Self {
        use columns::*;
        Self::new([PRODUCT_ID, PRODUCT_NAME, SALES_PRICE])
    }
}

/// Immutable snapshot of the four source tables
#[derive(Debug, Clone)]
pub struct Tables {
    pub accounts: Vec<Account>,
    pub opportunities: Vec<Opportunity>,
    pub products: Vec<Product>,
    pub sales_teams: Vec<TeamMember>,
    /// Columns present in the accounts source
    pub account_columns: ColumnSet,
    /// Columns present in the products source
    pub product_columns: ColumnSet,
}

impl Tables {
    /// Bundle fixture rows; every optional column counts as present
    pub fn new(
        accounts: Vec<Account>,
        opportunities: Vec<Opportunity>,
        products: Vec<Product>,
        sales_teams: Vec<TeamMember>,
    ) -> Self {
        Self {
            accounts,
            opportunities,
            products,
            sales_teams,
            account_columns: ColumnSet::all_accounts(),
            product_columns: ColumnSet::all_products(),
        }
    }

    /// Mark an accounts column as absent, as if the source never had it
    pub fn without_account_column(mut self, column: &str) -> Self {
        self.account_columns.remove(column);
        self
    }

    /// Mark a products column as absent
    pub fn without_product_column(mut self, column: &str) -> Self {
        self.product_columns.remove(column);
        self
    }

    /// Closed-won opportunities, in source order
    pub fn won_deals(&self) -> impl Iterator<Item = &Opportunity> {
        self.opportunities.iter().filter(|o| o.is_won)
    }

    /// Number of distinct account ids in the accounts table
    pub fn distinct_account_count(&self) -> usize {
        self.accounts
            .iter()
            .map(|a| a.account_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_column_set_is_case_insensitive() {
        let mut set = ColumnSet::new(["Account_ID", "Sector"]);
        assert!(set.contains("account_id"));
        assert!(set.contains("SECTOR"));
        assert!(!set.contains("revenue"));
        assert!(set.remove("sector"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_fixture_tables_have_all_columns() {
        let tables = Tables::new(vec![], vec![], vec![], vec![]);
        assert!(tables.account_columns.contains(columns::SECTOR));
        assert!(tables.product_columns.contains(columns::SALES_PRICE));

        let tables = tables.without_account_column(columns::SECTOR);
        assert!(!tables.account_columns.contains(columns::SECTOR));
    }

    #[test]
    fn test_won_deals_and_distinct_accounts() {
        let tables = Tables::new(
            vec![Account::new("A"), Account::new("B"), Account::new("A")],
            vec![
                Opportunity::won("1", "A", "ag", date(2017, 1, 1), 10.0),
                Opportunity::lost("2", "B", "ag", date(2017, 1, 2)),
                Opportunity::open("3", "ag", "Engaging"),
            ],
            vec![],
            vec![],
        );

        assert_eq!(tables.won_deals().count(), 1);
        assert_eq!(tables.distinct_account_count(), 2);
    }
}
