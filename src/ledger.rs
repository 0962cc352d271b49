use crate::error::{ReportError, Result};
use crate::schema::StatementType;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub const MONTHS: usize = 12;

pub type MonthlyValues = [Option<f64>; MONTHS];

/// One long-format ledger row as supplied by the file reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecord {
    pub year: i32,
    /// 1 = January, 12 = December
    pub month: u32,
    pub account: String,
    pub value: f64,
}

/// Twelve monthly values for one account, plus the optional trailing prior-year column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LedgerEntry {
    #[schemars(description = "January..December. null means no data yet, which is different from zero.")]
    pub months: MonthlyValues,

    #[serde(default)]
    #[schemars(description = "Prior-year figure carried after December (prior-year total for cash flow, opening balance for balances)")]
    pub prior_year: Option<f64>,
}

impl LedgerEntry {
    /// Non-finite inputs are stored as missing so they can never reach the output.
    pub fn new(months: MonthlyValues) -> Self {
        Self {
            months: months.map(|v| v.filter(|x| x.is_finite())),
            prior_year: None,
        }
    }

    pub fn with_prior_year(mut self, value: f64) -> Self {
        self.prior_year = Some(value).filter(|x| x.is_finite());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AccountLedger {
    pub accounts: BTreeMap<String, LedgerEntry>,
}

impl AccountLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a ledger where every month of every account is present.
    pub fn from_values<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = (S, [f64; MONTHS])>,
        S: Into<String>,
    {
        let mut ledger = Self::new();
        for (account, values) in rows {
            ledger.insert(account, values.map(Some));
        }
        ledger
    }

    /// Folds long-format rows for `year` into a ledger.
    ///
    /// Rows for other years are skipped and repeated (account, month) rows are summed.
    pub fn from_records(records: &[FinancialRecord], year: i32) -> Result<Self> {
        let mut ledger = Self::new();
        let mut skipped = 0usize;

        for record in records {
            if record.year != year {
                skipped += 1;
                continue;
            }

            if !(1..=MONTHS as u32).contains(&record.month) {
                return Err(ReportError::InvalidRecord {
                    account: record.account.clone(),
                    details: format!("month {} is outside 1..=12", record.month),
                });
            }

            if !record.value.is_finite() {
                return Err(ReportError::InvalidRecord {
                    account: record.account.clone(),
                    details: format!("non-finite value in month {}", record.month),
                });
            }

            let entry = ledger
                .accounts
                .entry(record.account.trim().to_string())
                .or_default();
            let slot = &mut entry.months[record.month as usize - 1];
            *slot = Some(slot.unwrap_or(0.0) + record.value);
        }

        debug!(
            "Folded {} records into {} accounts for {} ({} rows from other years skipped)",
            records.len() - skipped,
            ledger.len(),
            year,
            skipped
        );

        Ok(ledger)
    }

    pub fn insert(&mut self, account: impl Into<String>, months: MonthlyValues) {
        self.accounts
            .insert(account.into(), LedgerEntry::new(months));
    }

    pub fn insert_entry(&mut self, account: impl Into<String>, entry: LedgerEntry) {
        self.accounts.insert(account.into(), entry);
    }

    pub fn with(mut self, account: impl Into<String>, months: MonthlyValues) -> Self {
        self.insert(account, months);
        self
    }

    pub fn get(&self, account: &str) -> Option<&LedgerEntry> {
        self.accounts.get(account)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn account_names(&self) -> impl Iterator<Item = &str> {
        self.accounts.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LedgerKey {
    pub statement: StatementType,
    pub year: i32,
    pub brand: Option<String>,
}

impl LedgerKey {
    pub fn corporate(statement: StatementType, year: i32) -> Self {
        Self {
            statement,
            year,
            brand: None,
        }
    }

    pub fn brand(statement: StatementType, year: i32, brand: &str) -> Self {
        Self {
            statement,
            year,
            brand: Some(brand.to_string()),
        }
    }
}

impl fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.brand {
            Some(brand) => write!(f, "{}/{}/{}", self.statement, brand, self.year),
            None => write!(f, "{}/{}", self.statement, self.year),
        }
    }
}

/// Supplies ledgers to the engine. File reading lives behind this trait.
pub trait LedgerSource {
    fn load(&self, key: &LedgerKey) -> Result<AccountLedger>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerSource {
    ledgers: HashMap<LedgerKey, AccountLedger>,
}

impl InMemoryLedgerSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: LedgerKey, ledger: AccountLedger) {
        self.ledgers.insert(key, ledger);
    }

    pub fn with(mut self, key: LedgerKey, ledger: AccountLedger) -> Self {
        self.insert(key, ledger);
        self
    }
}

impl LedgerSource for InMemoryLedgerSource {
    fn load(&self, key: &LedgerKey) -> Result<AccountLedger> {
        self.ledgers
            .get(key)
            .cloned()
            .ok_or_else(|| ReportError::LedgerUnavailable {
                key: key.to_string(),
                reason: "no ledger registered".to_string(),
            })
    }
}
