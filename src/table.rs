use crate::brand::BrandComparisonData;
use crate::comparison::ComparisonData;
use crate::error::Result;
use crate::ledger::{AccountLedger, MONTHS};
use crate::period::{ratio_percent, sum_present};
use crate::schema::{Formula, Highlight, RowFormat, SchemaNode, StatementSchema};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowNode {
    pub account: String,
    /// Nesting depth, 0 = top level
    pub level: u32,
    pub is_group: bool,
    pub is_calculated: bool,
    pub highlight: Highlight,
    pub bold: bool,
    /// Twelve months, plus the total column when one was requested
    pub values: Vec<Option<f64>>,
    pub format: RowFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparisons: Option<ComparisonData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_comparisons: Option<BrandComparisonData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RowNode>,
}

impl RowNode {
    pub fn find<'a>(rows: &'a [RowNode], account: &str) -> Option<&'a RowNode> {
        rows.iter().find_map(|row| {
            if row.account == account {
                Some(row)
            } else {
                Self::find(&row.children, account)
            }
        })
    }

    pub fn month(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }

    /// Applies `f` to this row and all of its descendants, parents first.
    pub fn visit_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(&mut RowNode),
    {
        f(self);
        for child in &mut self.children {
            child.visit_mut(f);
        }
    }
}

/// Every row of a table in display order.
pub fn flatten_rows(rows: &[RowNode]) -> Vec<&RowNode> {
    fn walk<'a>(rows: &'a [RowNode], out: &mut Vec<&'a RowNode>) {
        for row in rows {
            out.push(row);
            walk(&row.children, out);
        }
    }

    let mut out = Vec::new();
    walk(rows, &mut out);
    out
}

/// Optional 13th column appended after December.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TotalColumn {
    #[default]
    None,
    /// Sum of the year for flow rows, December balance for snapshot rows.
    Annual,
    /// The ledger's trailing prior-year value.
    PriorYear,
}

pub struct TableBuilder<'a> {
    schema: &'a StatementSchema,
    total_column: TotalColumn,
}

impl<'a> TableBuilder<'a> {
    pub fn new(schema: &'a StatementSchema) -> Self {
        Self {
            schema,
            total_column: TotalColumn::None,
        }
    }

    pub fn with_total_column(mut self, total_column: TotalColumn) -> Self {
        self.total_column = total_column;
        self
    }

    fn width(&self) -> usize {
        match self.total_column {
            TotalColumn::None => MONTHS,
            TotalColumn::Annual | TotalColumn::PriorYear => MONTHS + 1,
        }
    }

    pub fn build(&self, ledger: &AccountLedger) -> Result<Vec<RowNode>> {
        self.schema.ensure_tabular("table building")?;
        let order = self.schema.evaluation_order()?;

        let mut resolved: HashMap<&str, Vec<Option<f64>>> = HashMap::with_capacity(order.len());
        for node in order {
            let values = self.resolve(node, ledger, &resolved);
            resolved.insert(node.account.as_str(), values);
        }

        let unmapped: Vec<&str> = ledger
            .account_names()
            .filter(|name| !resolved.contains_key(name))
            .collect();
        if !unmapped.is_empty() {
            debug!(
                "{} ledger accounts are not part of the {} schema: {:?}",
                unmapped.len(),
                self.schema.statement,
                unmapped
            );
        }

        Ok(self
            .schema
            .rows
            .iter()
            .map(|node| self.assemble(node, 0, &resolved))
            .collect())
    }

    fn resolve(
        &self,
        node: &SchemaNode,
        ledger: &AccountLedger,
        resolved: &HashMap<&str, Vec<Option<f64>>>,
    ) -> Vec<Option<f64>> {
        let cell = |account: &str, column: usize| -> Option<f64> {
            resolved
                .get(account)
                .and_then(|values| values.get(column))
                .copied()
                .flatten()
        };

        match &node.formula {
            Some(Formula::Linear { terms }) => (0..self.width())
                .map(|column| {
                    sum_present(
                        terms
                            .iter()
                            .map(|term| cell(&term.account, column).map(|v| v * term.coefficient)),
                    )
                })
                .collect(),
            Some(Formula::Ratio {
                numerator,
                denominator,
            }) => (0..self.width())
                .map(|column| ratio_percent(cell(numerator, column), cell(denominator, column)))
                .collect(),
            None if !node.children.is_empty() => (0..self.width())
                .map(|column| {
                    sum_present(
                        node.children
                            .iter()
                            .filter(|child| child.format == RowFormat::Number)
                            .map(|child| cell(&child.account, column)),
                    )
                })
                .collect(),
            None => self.leaf_values(node, ledger),
        }
    }

    fn leaf_values(&self, node: &SchemaNode, ledger: &AccountLedger) -> Vec<Option<f64>> {
        let Some(entry) = ledger.get(&node.account) else {
            debug!("Account '{}' not found in ledger, using empty row", node.account);
            return vec![None; self.width()];
        };

        let mut values = entry.months.to_vec();
        match self.total_column {
            TotalColumn::None => {}
            TotalColumn::Annual => {
                let total = self.schema.aggregation_for(node).annual(&entry.months);
                values.push(total);
            }
            TotalColumn::PriorYear => values.push(entry.prior_year),
        }
        values
    }

    fn assemble(
        &self,
        node: &SchemaNode,
        level: u32,
        resolved: &HashMap<&str, Vec<Option<f64>>>,
    ) -> RowNode {
        RowNode {
            account: node.account.clone(),
            level,
            is_group: !node.children.is_empty(),
            is_calculated: node.formula.is_some(),
            highlight: node.highlight,
            bold: node.bold,
            values: resolved
                .get(node.account.as_str())
                .cloned()
                .unwrap_or_else(|| vec![None; self.width()]),
            format: node.format,
            comparisons: None,
            brand_comparisons: None,
            children: node
                .children
                .iter()
                .map(|child| self.assemble(child, level + 1, resolved))
                .collect(),
        }
    }
}
