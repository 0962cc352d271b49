//! Month / year-to-date / annual aggregation shared by the comparison and brand views.
//!
//! Every figure is an `Option<f64>`: `None` means "no data", which is never folded
//! into a zero. Degenerate arithmetic (zero denominators, non-finite results)
//! resolves to `None` as well.

use crate::error::{ReportError, Result};
use crate::ledger::MONTHS;
use crate::schema::{Aggregation, Formula, StatementSchema};
use crate::table::{flatten_rows, RowNode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// "Data complete through this month", 1 = January.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct BaseMonth(u32);

impl BaseMonth {
    pub const DECEMBER: BaseMonth = BaseMonth(12);

    pub fn new(month: u32) -> Result<Self> {
        if (1..=MONTHS as u32).contains(&month) {
            Ok(Self(month))
        } else {
            Err(ReportError::InvalidBaseMonth(month))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Zero-based column of the base month.
    pub fn index(self) -> usize {
        self.0 as usize - 1
    }
}

impl TryFrom<u32> for BaseMonth {
    type Error = ReportError;

    fn try_from(month: u32) -> Result<Self> {
        Self::new(month)
    }
}

impl From<BaseMonth> for u32 {
    fn from(month: BaseMonth) -> Self {
        month.0
    }
}

impl fmt::Display for BaseMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sum of the present values; `None` only when nothing is present.
pub fn sum_present<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    values
        .into_iter()
        .flatten()
        .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

pub fn ratio_percent(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d * 100.0).filter(|r| r.is_finite()),
        _ => None,
    }
}

pub fn difference(current: Option<f64>, prior: Option<f64>) -> Option<f64> {
    match (current, prior) {
        (Some(c), Some(p)) => Some(c - p),
        _ => None,
    }
}

/// `(current - prior) / |prior| * 100`.
pub fn change_percent(current: Option<f64>, prior: Option<f64>) -> Option<f64> {
    match (current, prior) {
        (Some(c), Some(p)) if p != 0.0 => Some((c - p) / p.abs() * 100.0).filter(|r| r.is_finite()),
        _ => None,
    }
}

fn value_at(values: &[Option<f64>], index: usize) -> Option<f64> {
    values.get(index).copied().flatten()
}

impl Aggregation {
    pub fn year_to_date(self, values: &[Option<f64>], base: BaseMonth) -> Option<f64> {
        match self {
            Aggregation::Flow => {
                let end = (base.get() as usize).min(values.len());
                sum_present(values[..end].iter().copied())
            }
            Aggregation::Snapshot => value_at(values, base.index()),
        }
    }

    pub fn annual(self, values: &[Option<f64>]) -> Option<f64> {
        match self {
            Aggregation::Flow => {
                let end = MONTHS.min(values.len());
                sum_present(values[..end].iter().copied())
            }
            Aggregation::Snapshot => value_at(values, MONTHS - 1),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodTotals {
    pub month: Option<f64>,
    pub ytd: Option<f64>,
    pub annual: Option<f64>,
}

impl PeriodTotals {
    pub fn from_values(values: &[Option<f64>], aggregation: Aggregation, base: BaseMonth) -> Self {
        Self {
            month: value_at(values, base.index()),
            ytd: aggregation.year_to_date(values, base),
            annual: aggregation.annual(values),
        }
    }

    /// Percent rows are recomputed from aggregated operands, never aggregated themselves.
    pub fn ratio(numerator: &PeriodTotals, denominator: &PeriodTotals) -> Self {
        Self {
            month: ratio_percent(numerator.month, denominator.month),
            ytd: ratio_percent(numerator.ytd, denominator.ytd),
            annual: ratio_percent(numerator.annual, denominator.annual),
        }
    }
}

/// Month / YTD / annual figures for every row of a built table, keyed by account.
///
/// Ratio rows are derived from their operands' totals. Rows that are in the table but
/// not in the schema fall back to the statement-level aggregation.
pub fn period_totals(
    schema: &StatementSchema,
    rows: &[RowNode],
    base: BaseMonth,
) -> Result<BTreeMap<String, PeriodTotals>> {
    let by_account: BTreeMap<&str, &RowNode> = flatten_rows(rows)
        .into_iter()
        .map(|row| (row.account.as_str(), row))
        .collect();

    let mut totals: BTreeMap<String, PeriodTotals> = BTreeMap::new();

    for node in schema.evaluation_order()? {
        let figures = match &node.formula {
            Some(Formula::Ratio {
                numerator,
                denominator,
            }) => {
                let missing = PeriodTotals::default();
                PeriodTotals::ratio(
                    totals.get(numerator).unwrap_or(&missing),
                    totals.get(denominator).unwrap_or(&missing),
                )
            }
            _ => match by_account.get(node.account.as_str()) {
                Some(row) => {
                    PeriodTotals::from_values(&row.values, schema.aggregation_for(node), base)
                }
                None => PeriodTotals::default(),
            },
        };
        totals.insert(node.account.clone(), figures);
    }

    for (account, row) in by_account {
        if !totals.contains_key(account) {
            totals.insert(
                account.to_string(),
                PeriodTotals::from_values(&row.values, schema.aggregation(), base),
            );
        }
    }

    Ok(totals)
}
