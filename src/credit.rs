use crate::config::CreditConfig;
use crate::recovery::YearMonth;
use log::debug;
use serde::{Deserialize, Serialize};

/// One dealer row as read from the receivables ledger, possibly the total row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditDealerRow {
    pub name: String,
    /// Trade receivable (외상매출금)
    pub receivable: f64,
    /// Advance payments received (선수금)
    pub advance: f64,
}

impl CreditDealerRow {
    pub fn new(name: &str, receivable: f64, advance: f64) -> Self {
        Self {
            name: name.to_string(),
            receivable,
            advance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditDealer {
    pub name: String,
    pub receivable: f64,
    pub advance: f64,
    pub net_credit: f64,
}

impl CreditDealer {
    fn from_row(row: &CreditDealerRow) -> Self {
        Self {
            name: row.name.clone(),
            receivable: row.receivable,
            advance: row.advance,
            net_credit: row.receivable - row.advance,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditTotals {
    pub receivable: f64,
    pub advance: f64,
    pub net_credit: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OthersAggregate {
    pub count: usize,
    pub receivable: f64,
    pub advance: f64,
    pub net_credit: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcentrationMetrics {
    pub top_n_ratio: f64,
    pub top1_ratio: f64,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<YearMonth>,
    pub total: CreditTotals,
    /// All non-empty dealers ranked by receivable, largest first
    pub dealers: Vec<CreditDealer>,
    pub top: Vec<CreditDealer>,
    pub others: OthersAggregate,
    pub others_list: Vec<CreditDealer>,
    pub analysis: ConcentrationMetrics,
}

pub struct CreditAnalyzer {
    config: CreditConfig,
}

impl CreditAnalyzer {
    pub fn new(config: CreditConfig) -> Self {
        Self { config }
    }

    fn is_total_row(&self, row: &CreditDealerRow) -> bool {
        row.name.trim() == self.config.total_label
    }

    /// Receivable and advance totals: the explicit total row when present,
    /// otherwise the sum of every named dealer row.
    fn gross_totals(&self, rows: &[CreditDealerRow]) -> (f64, f64) {
        if let Some(total) = rows.iter().find(|row| self.is_total_row(row)) {
            return (total.receivable, total.advance);
        }

        debug!("No '{}' row found, summing dealer rows", self.config.total_label);
        rows.iter()
            .filter(|row| !row.name.trim().is_empty())
            .fold((0.0, 0.0), |(receivable, advance), row| {
                (receivable + row.receivable, advance + row.advance)
            })
    }

    pub fn analyze(&self, rows: &[CreditDealerRow], base: Option<YearMonth>) -> CreditAnalysis {
        let (receivable, advance) = self.gross_totals(rows);

        let mut dealers: Vec<CreditDealer> = rows
            .iter()
            .filter(|row| !self.is_total_row(row) && !row.name.trim().is_empty())
            .filter(|row| !(row.receivable == 0.0 && row.advance == 0.0))
            .map(CreditDealer::from_row)
            .collect();

        // sort_by is stable: equal receivables keep their input order
        dealers.sort_by(|a, b| b.receivable.total_cmp(&a.receivable));

        let split = self.config.top_n.min(dealers.len());
        let top = dealers[..split].to_vec();
        let others_list = dealers[split..].to_vec();

        let others = others_list.iter().fold(
            OthersAggregate::default(),
            |acc, dealer| OthersAggregate {
                count: acc.count + 1,
                receivable: acc.receivable + dealer.receivable,
                advance: acc.advance + dealer.advance,
                net_credit: acc.net_credit + dealer.net_credit,
            },
        );

        let total_net_credit: f64 = dealers.iter().map(|d| d.net_credit).sum();
        let top_net_credit: f64 = top.iter().map(|d| d.net_credit).sum();

        // dealers with negative net credit can push a raw share past either bound
        let share = |amount: f64| {
            if total_net_credit > 0.0 {
                (amount / total_net_credit * 100.0).clamp(0.0, 100.0)
            } else {
                0.0
            }
        };
        let top_n_ratio = share(top_net_credit);
        let top1_ratio = top.first().map_or(0.0, |dealer| share(dealer.net_credit));

        let risk_level = if top1_ratio > self.config.risk_threshold_percent {
            RiskLevel::High
        } else {
            RiskLevel::Low
        };

        debug!(
            "Credit analysis: {} dealers, top {} hold {:.1}% of net credit, largest {:.1}%",
            dealers.len(),
            top.len(),
            top_n_ratio,
            top1_ratio
        );

        CreditAnalysis {
            base,
            total: CreditTotals {
                receivable,
                advance,
                net_credit: total_net_credit,
            },
            dealers,
            top,
            others,
            others_list,
            analysis: ConcentrationMetrics {
                top_n_ratio,
                top1_ratio,
                risk_level,
            },
        }
    }
}
