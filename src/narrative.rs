//! Default per-category facts and sentences for the executive summary.
//!
//! The sentences produced here are only defaults: an external store may replace
//! them per category with edited text, so the raw figures travel alongside.

use crate::schema::RowFormat;
use crate::table::RowNode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

impl Direction {
    fn of(change: f64) -> Self {
        if change > 0.0 {
            Direction::Up
        } else if change < 0.0 {
            Direction::Down
        } else {
            Direction::Flat
        }
    }

    /// Sign prefix used in the report: decreases are marked with a triangle.
    pub fn marker(self) -> &'static str {
        match self {
            Direction::Up => "+",
            Direction::Down => "△",
            Direction::Flat => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryFacts {
    pub account: String,
    pub format: RowFormat,
    pub prior_annual: Option<f64>,
    pub annual_total: Option<f64>,
    pub yoy_absolute: Option<f64>,
    pub yoy_percent: Option<f64>,
}

/// Thousands to millions, rounded.
fn millions(value: f64) -> String {
    // adding zero turns a rounded -0 into 0
    format!("{}M", (value / 1000.0).round() + 0.0)
}

impl CategoryFacts {
    pub fn direction(&self) -> Option<Direction> {
        self.yoy_absolute.map(Direction::of)
    }

    fn figure(&self, value: f64) -> String {
        match self.format {
            RowFormat::Number => millions(value),
            RowFormat::Percent => format!("{:.1}%", value),
        }
    }

    fn change(&self, direction: Direction) -> Option<String> {
        let marker = direction.marker();
        match self.format {
            RowFormat::Percent => self
                .yoy_absolute
                .map(|points| format!("{}{:.1}%p", marker, points.abs())),
            RowFormat::Number => match (self.yoy_percent, self.yoy_absolute) {
                (Some(percent), _) => Some(format!("{}{:.1}%", marker, percent.abs())),
                (None, Some(absolute)) => Some(format!("{}{}", marker, millions(absolute.abs()))),
                (None, None) => None,
            },
        }
    }

    /// e.g. `• 영업이익 120M → 150M (+25.0%)`
    pub fn default_text(&self) -> String {
        let Some(current) = self.annual_total else {
            return format!("• {}: no data", self.account);
        };

        let mut text = match self.prior_annual {
            Some(prior) => format!(
                "• {} {} → {}",
                self.account,
                self.figure(prior),
                self.figure(current)
            ),
            None => format!("• {} {}", self.account, self.figure(current)),
        };

        if let Some(change) = self.direction().and_then(|d| self.change(d)) {
            text.push_str(&format!(" ({})", change));
        }
        text
    }
}

/// Facts for every top-level row that carries comparisons.
pub fn category_facts(rows: &[RowNode]) -> Vec<CategoryFacts> {
    rows.iter()
        .filter_map(|row| {
            row.comparisons.as_ref().map(|cmp| CategoryFacts {
                account: row.account.clone(),
                format: row.format,
                prior_annual: cmp.prev_year_annual,
                annual_total: cmp.curr_year_annual,
                yoy_absolute: cmp.annual_yoy,
                yoy_percent: cmp.annual_yoy_percent,
            })
        })
        .collect()
}
