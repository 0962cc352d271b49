//! Splits corporate figures into per-brand figures plus a residual "other" brand.

use crate::error::{ReportError, Result};
use crate::period::{period_totals, BaseMonth, PeriodTotals};
use crate::schema::{Formula, StatementSchema};
use crate::table::{flatten_rows, RowNode};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_OTHER_LABEL: &str = "other";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandValues {
    pub prev_year: BTreeMap<String, Option<f64>>,
    pub curr_year: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrandComparisonData {
    pub month: BrandValues,
    pub ytd: BrandValues,
    pub annual: BrandValues,
}

impl BrandComparisonData {
    fn insert(&mut self, brand: &str, prior: &PeriodTotals, current: &PeriodTotals) {
        let buckets = [
            (&mut self.month, prior.month, current.month),
            (&mut self.ytd, prior.ytd, current.ytd),
            (&mut self.annual, prior.annual, current.annual),
        ];
        for (bucket, prev, curr) in buckets {
            bucket.prev_year.insert(brand.to_string(), prev);
            bucket.curr_year.insert(brand.to_string(), curr);
        }
    }
}

/// Period totals of one source (corporate or a brand) for both years.
#[derive(Debug, Default)]
struct SourceTotals {
    current: BTreeMap<String, PeriodTotals>,
    prior: BTreeMap<String, PeriodTotals>,
}

impl SourceTotals {
    fn get(&self, account: &str) -> (PeriodTotals, PeriodTotals) {
        (
            self.prior.get(account).copied().unwrap_or_default(),
            self.current.get(account).copied().unwrap_or_default(),
        )
    }
}

/// `corporate - Σ brands`, where a brand without the figure counts as zero.
fn residual<I>(corporate: Option<f64>, brands: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    corporate.map(|total| {
        brands
            .into_iter()
            .fold(total, |rest, brand| rest - brand.unwrap_or(0.0))
    })
}

pub struct BrandBreakdownMerger<'a> {
    schema: &'a StatementSchema,
    base_month: BaseMonth,
    other_label: String,
}

impl<'a> BrandBreakdownMerger<'a> {
    pub fn new(schema: &'a StatementSchema, base_month: BaseMonth) -> Self {
        Self {
            schema,
            base_month,
            other_label: DEFAULT_OTHER_LABEL.to_string(),
        }
    }

    /// Label of the residual bucket. `merge` rejects brand maps that use the same id.
    pub fn with_other_label(mut self, label: &str) -> Self {
        self.other_label = label.to_string();
        self
    }

    /// Current-year totals are recomputed from each table's values; prior-year totals
    /// come from the rows' comparisons and are null when a table carries none.
    fn source_totals(&self, rows: &[RowNode]) -> Result<SourceTotals> {
        let current = period_totals(self.schema, rows, self.base_month)?;
        let prior = flatten_rows(rows)
            .into_iter()
            .filter_map(|row| {
                row.comparisons
                    .as_ref()
                    .map(|cmp| (row.account.clone(), cmp.prior_totals()))
            })
            .collect();
        Ok(SourceTotals { current, prior })
    }

    fn residual_totals(
        &self,
        corporate: &BTreeMap<String, PeriodTotals>,
        brands: &[&BTreeMap<String, PeriodTotals>],
    ) -> Result<BTreeMap<String, PeriodTotals>> {
        let ratio_rows: Vec<_> = self
            .schema
            .evaluation_order()?
            .into_iter()
            .filter(|node| node.is_ratio())
            .collect();

        let mut other: BTreeMap<String, PeriodTotals> = corporate
            .iter()
            .filter(|(account, _)| !ratio_rows.iter().any(|node| &node.account == *account))
            .map(|(account, totals)| {
                let brand_totals: Vec<PeriodTotals> = brands
                    .iter()
                    .map(|brand| brand.get(account).copied().unwrap_or_default())
                    .collect();
                let rest = PeriodTotals {
                    month: residual(totals.month, brand_totals.iter().map(|t| t.month)),
                    ytd: residual(totals.ytd, brand_totals.iter().map(|t| t.ytd)),
                    annual: residual(totals.annual, brand_totals.iter().map(|t| t.annual)),
                };
                (account.clone(), rest)
            })
            .collect();

        for node in ratio_rows {
            if let Some(Formula::Ratio {
                numerator,
                denominator,
            }) = &node.formula
            {
                let missing = PeriodTotals::default();
                let figures = PeriodTotals::ratio(
                    other.get(numerator).unwrap_or(&missing),
                    other.get(denominator).unwrap_or(&missing),
                );
                other.insert(node.account.clone(), figures);
            }
        }

        Ok(other)
    }

    /// Attaches `brandComparisons` to every corporate row.
    ///
    /// `brands` holds only the brand tables that loaded; absent brands are simply
    /// not part of the sum nor of the per-brand mapping.
    pub fn merge(
        &self,
        corporate: &[RowNode],
        brands: &BTreeMap<String, Vec<RowNode>>,
    ) -> Result<Vec<RowNode>> {
        self.schema.ensure_tabular("brand breakdown")?;
        if brands.contains_key(&self.other_label) {
            return Err(ReportError::InvalidConfig(format!(
                "brand '{}' collides with the residual bucket label",
                self.other_label
            )));
        }

        let corporate_totals = self.source_totals(corporate)?;
        let brand_totals: BTreeMap<&str, SourceTotals> = brands
            .iter()
            .map(|(brand, rows)| Ok((brand.as_str(), self.source_totals(rows)?)))
            .collect::<Result<_>>()?;

        let current_refs: Vec<_> = brand_totals.values().map(|t| &t.current).collect();
        let prior_refs: Vec<_> = brand_totals.values().map(|t| &t.prior).collect();
        let other = SourceTotals {
            current: self.residual_totals(&corporate_totals.current, &current_refs)?,
            prior: self.residual_totals(&corporate_totals.prior, &prior_refs)?,
        };

        debug!(
            "Merging {} brands into {} corporate rows (residual bucket '{}')",
            brand_totals.len(),
            flatten_rows(corporate).len(),
            self.other_label
        );

        let mut rows = corporate.to_vec();
        for row in &mut rows {
            row.visit_mut(&mut |row: &mut RowNode| {
                let mut data = BrandComparisonData::default();
                for (brand, totals) in &brand_totals {
                    let (prior, current) = totals.get(&row.account);
                    data.insert(brand, &prior, &current);
                }
                let (prior, current) = other.get(&row.account);
                data.insert(&self.other_label, &prior, &current);
                row.brand_comparisons = Some(data);
            });
        }

        Ok(rows)
    }
}
