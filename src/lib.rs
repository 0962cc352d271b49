//! # Ledger Report Engine
//!
//! Turns monthly account ledgers into the hierarchical tables of a management report:
//! income statement, balance sheet, cash flow and balances, with year-over-year
//! comparisons, a per-brand breakdown and dealer credit concentration.
//!
//! ## Core Concepts
//!
//! - **Ledger**: twelve optional monthly values per account. `None` means "no data",
//!   which is never the same as zero.
//! - **Schema**: a declarative tree of rows. Group rows sum their children, formula rows
//!   are linear combinations or ratios of other rows.
//! - **Aggregation**: flow statements (PL, CF) sum months, snapshot statements (BS,
//!   balances) read the balance at the end of the period.
//! - **Base month**: the last month with complete data; month and YTD figures are read
//!   as of that month.
//! - **Residual brand**: corporate minus the sum of the known brands, so the brand
//!   breakdown always adds back up to the corporate figure.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ledger_report_engine::*;
//!
//! let source = InMemoryLedgerSource::new()
//!     .with(LedgerKey::corporate(StatementType::Pl, 2025), ledger_2025)
//!     .with(LedgerKey::corporate(StatementType::Pl, 2024), ledger_2024);
//!
//! let processor = ReportProcessor::new(source, EngineConfig::default())?;
//! let report = processor.comparison_report(&pl_schema(), 2025, BaseMonth::new(11)?)?;
//!
//! for facts in report.category_facts() {
//!     println!("{}", facts.default_text());
//! }
//! ```

pub mod balance;
pub mod brand;
pub mod comparison;
pub mod config;
pub mod credit;
pub mod error;
pub mod ledger;
pub mod narrative;
pub mod period;
pub mod recovery;
pub mod schema;
pub mod statements;
pub mod table;

pub use balance::{summarize_balances, BalanceSummary, BalanceTrack};
pub use brand::{BrandBreakdownMerger, BrandComparisonData, BrandValues};
pub use comparison::{ComparisonCalculator, ComparisonData};
pub use config::{BrandConfig, CreditConfig, EngineConfig, RecoveryConfig};
pub use credit::{
    ConcentrationMetrics, CreditAnalysis, CreditAnalyzer, CreditDealer, CreditDealerRow,
    CreditTotals, OthersAggregate, RiskLevel,
};
pub use error::{ReportError, Result};
pub use ledger::*;
pub use narrative::{category_facts, CategoryFacts, Direction};
pub use period::{BaseMonth, PeriodTotals};
pub use recovery::{
    latest_base_from_file_names, CreditRecoveryPlan, RecoveryEntry, RecoverySchedule,
    RecoveryScheduler, YearMonth,
};
pub use schema::*;
pub use statements::{balance_schema, bs_schema, builtin_schema, cf_schema, pl_schema};
pub use table::{flatten_rows, RowNode, TableBuilder, TotalColumn};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A statement table for one year, with whatever comparisons could be computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementReport {
    pub statement: StatementType,
    pub year: i32,
    pub base_month: BaseMonth,
    pub rows: Vec<RowNode>,
    /// Set when a prior-year or brand ledger was missing and the report was built without it
    pub incomplete: bool,
    pub missing_sources: Vec<String>,
}

impl StatementReport {
    pub fn category_facts(&self) -> Vec<CategoryFacts> {
        category_facts(&self.rows)
    }

    fn mark_missing(&mut self, key: &LedgerKey, error: &ReportError) {
        warn!("Building {} without {}: {}", self.statement, key, error);
        self.incomplete = true;
        self.missing_sources.push(key.to_string());
    }
}

pub struct ReportProcessor<S: LedgerSource> {
    source: S,
    config: EngineConfig,
}

impl<S: LedgerSource> ReportProcessor<S> {
    pub fn new(source: S, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { source, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn build_table(
        &self,
        schema: &StatementSchema,
        year: i32,
        total_column: TotalColumn,
    ) -> Result<Vec<RowNode>> {
        let key = LedgerKey::corporate(schema.statement, year);
        info!("Building {} table", key);

        let ledger = self.source.load(&key)?;
        debug!("Ledger {} holds {} accounts", key, ledger.len());

        TableBuilder::new(schema)
            .with_total_column(total_column)
            .build(&ledger)
    }

    /// Current-year table compared against the prior year.
    ///
    /// A missing current-year ledger is an error. A missing prior-year ledger only
    /// marks the report incomplete and leaves the rows without comparisons.
    pub fn comparison_report(
        &self,
        schema: &StatementSchema,
        year: i32,
        base_month: BaseMonth,
    ) -> Result<StatementReport> {
        info!(
            "Computing {} {} vs {} through month {}",
            schema.statement,
            year,
            year - 1,
            base_month
        );
        let current = self.build_table(schema, year, TotalColumn::None)?;

        let mut report = StatementReport {
            statement: schema.statement,
            year,
            base_month,
            rows: Vec::new(),
            incomplete: false,
            missing_sources: Vec::new(),
        };

        let prior_key = LedgerKey::corporate(schema.statement, year - 1);
        let rows = match self.source.load(&prior_key) {
            Ok(ledger) => {
                let prior = TableBuilder::new(schema).build(&ledger)?;
                ComparisonCalculator::new(schema, base_month).compare(&current, &prior)?
            }
            Err(e) => {
                report.mark_missing(&prior_key, &e);
                current
            }
        };
        report.rows = rows;

        Ok(report)
    }

    fn brand_rows(
        &self,
        schema: &StatementSchema,
        year: i32,
        base_month: BaseMonth,
        brand: &str,
        report: &mut StatementReport,
    ) -> Result<Vec<RowNode>> {
        let current_key = LedgerKey::brand(schema.statement, year, brand);
        let current = TableBuilder::new(schema).build(&self.source.load(&current_key)?)?;

        let prior_key = LedgerKey::brand(schema.statement, year - 1, brand);
        match self.source.load(&prior_key) {
            Ok(ledger) => {
                let prior = TableBuilder::new(schema).build(&ledger)?;
                ComparisonCalculator::new(schema, base_month).compare(&current, &prior)
            }
            Err(e) => {
                report.mark_missing(&prior_key, &e);
                Ok(current)
            }
        }
    }

    /// Corporate comparison report with `brandComparisons` on every row.
    ///
    /// Brands whose ledger cannot be loaded are left out of the breakdown, which
    /// puts their figures into the residual bucket and marks the report incomplete.
    /// A brand whose prior-year ledger is missing stays in the breakdown with null
    /// prior-year figures, which count as zero in the prior residual.
    pub fn brand_breakdown(
        &self,
        schema: &StatementSchema,
        year: i32,
        base_month: BaseMonth,
    ) -> Result<StatementReport> {
        let mut report = self.comparison_report(schema, year, base_month)?;
        info!(
            "Merging {} brands into {} {}",
            self.config.brands.brands.len(),
            schema.statement,
            year
        );

        let mut brands = BTreeMap::new();
        for brand in &self.config.brands.brands {
            match self.brand_rows(schema, year, base_month, brand, &mut report) {
                Ok(rows) => {
                    brands.insert(brand.clone(), rows);
                }
                Err(e) => {
                    report.mark_missing(&LedgerKey::brand(schema.statement, year, brand), &e);
                }
            }
        }
        debug!(
            "{} of {} brands available",
            brands.len(),
            self.config.brands.brands.len()
        );

        report.rows = BrandBreakdownMerger::new(schema, base_month)
            .with_other_label(&self.config.brands.other_label)
            .merge(&report.rows, &brands)?;

        Ok(report)
    }

    pub fn credit_analysis(
        &self,
        rows: &[CreditDealerRow],
        base: Option<YearMonth>,
    ) -> CreditAnalysis {
        info!("Analyzing credit concentration over {} dealer rows", rows.len());
        CreditAnalyzer::new(self.config.credit.clone()).analyze(rows, base)
    }

    pub fn recovery_schedule(
        &self,
        base: YearMonth,
        plan: &CreditRecoveryPlan,
    ) -> Result<RecoverySchedule> {
        info!("Scheduling credit recovery from {}", base);
        RecoveryScheduler::new(self.config.recovery.clone()).schedule(base, plan)
    }

    pub fn balance_summary(&self, year: i32) -> Result<BalanceSummary> {
        let key = LedgerKey::corporate(StatementType::Balance, year);
        info!("Summarizing balances from {}", key);
        summarize_balances(&self.source.load(&key)?)
    }
}
