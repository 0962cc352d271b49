use crate::error::Result;
use crate::period::{change_percent, difference, period_totals, BaseMonth, PeriodTotals};
use crate::schema::{RowFormat, StatementSchema};
use crate::table::RowNode;
use log::debug;
use serde::{Deserialize, Serialize};

/// Prior-year vs current-year figures attached to a row.
///
/// For percent rows the YoY fields are percentage-point differences and the
/// YoY-percent fields stay null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonData {
    #[serde(rename = "prevYearMonth")]
    pub prev_year_month: Option<f64>,
    #[serde(rename = "currYearMonth")]
    pub curr_year_month: Option<f64>,
    #[serde(rename = "monthYoY")]
    pub month_yoy: Option<f64>,
    #[serde(rename = "monthYoYPercent")]
    pub month_yoy_percent: Option<f64>,

    #[serde(rename = "prevYearYTD")]
    pub prev_year_ytd: Option<f64>,
    #[serde(rename = "currYearYTD")]
    pub curr_year_ytd: Option<f64>,
    #[serde(rename = "ytdYoY")]
    pub ytd_yoy: Option<f64>,
    #[serde(rename = "ytdYoYPercent")]
    pub ytd_yoy_percent: Option<f64>,

    #[serde(rename = "prevYearAnnual")]
    pub prev_year_annual: Option<f64>,
    #[serde(rename = "currYearAnnual")]
    pub curr_year_annual: Option<f64>,
    #[serde(rename = "annualYoY")]
    pub annual_yoy: Option<f64>,
    #[serde(rename = "annualYoYPercent")]
    pub annual_yoy_percent: Option<f64>,
}

impl ComparisonData {
    pub fn from_totals(prior: &PeriodTotals, current: &PeriodTotals, format: RowFormat) -> Self {
        let percent = |c: Option<f64>, p: Option<f64>| match format {
            RowFormat::Number => change_percent(c, p),
            RowFormat::Percent => None,
        };

        Self {
            prev_year_month: prior.month,
            curr_year_month: current.month,
            month_yoy: difference(current.month, prior.month),
            month_yoy_percent: percent(current.month, prior.month),
            prev_year_ytd: prior.ytd,
            curr_year_ytd: current.ytd,
            ytd_yoy: difference(current.ytd, prior.ytd),
            ytd_yoy_percent: percent(current.ytd, prior.ytd),
            prev_year_annual: prior.annual,
            curr_year_annual: current.annual,
            annual_yoy: difference(current.annual, prior.annual),
            annual_yoy_percent: percent(current.annual, prior.annual),
        }
    }

    pub fn prior_totals(&self) -> PeriodTotals {
        PeriodTotals {
            month: self.prev_year_month,
            ytd: self.prev_year_ytd,
            annual: self.prev_year_annual,
        }
    }

    pub fn current_totals(&self) -> PeriodTotals {
        PeriodTotals {
            month: self.curr_year_month,
            ytd: self.curr_year_ytd,
            annual: self.curr_year_annual,
        }
    }
}

pub struct ComparisonCalculator<'a> {
    schema: &'a StatementSchema,
    base_month: BaseMonth,
}

impl<'a> ComparisonCalculator<'a> {
    pub fn new(schema: &'a StatementSchema, base_month: BaseMonth) -> Self {
        Self { schema, base_month }
    }

    /// Returns a copy of `current` with every row's `comparisons` populated.
    ///
    /// Rows are matched by account name; a row without a prior-year counterpart is
    /// compared against nothing, so its YoY fields are null.
    pub fn compare(&self, current: &[RowNode], prior: &[RowNode]) -> Result<Vec<RowNode>> {
        self.schema.ensure_tabular("year-over-year comparison")?;

        let current_totals = period_totals(self.schema, current, self.base_month)?;
        let prior_totals = period_totals(self.schema, prior, self.base_month)?;
        let prior_accounts: Vec<&str> = crate::table::flatten_rows(prior)
            .into_iter()
            .map(|row| row.account.as_str())
            .collect();

        let missing = PeriodTotals::default();
        let mut unmatched = 0usize;
        let mut rows = current.to_vec();

        for row in &mut rows {
            row.visit_mut(&mut |row: &mut RowNode| {
                let prior = if prior_accounts.contains(&row.account.as_str()) {
                    prior_totals.get(&row.account).unwrap_or(&missing)
                } else {
                    unmatched += 1;
                    &missing
                };
                let current = current_totals.get(&row.account).unwrap_or(&missing);
                row.comparisons = Some(ComparisonData::from_totals(prior, current, row.format));
            });
        }

        if unmatched > 0 {
            debug!(
                "{} rows of the {} table have no prior-year counterpart",
                unmatched, self.schema.statement
            );
        }

        Ok(rows)
    }
}
