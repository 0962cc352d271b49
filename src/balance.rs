//! Cash and borrowing balance tracks from the BALANCE ledger.

use crate::error::{ReportError, Result};
use crate::ledger::{AccountLedger, LedgerEntry, MonthlyValues, MONTHS};
use crate::period::difference;
use crate::statements::{BORROWING_BALANCE, CASH_BALANCE};
use log::debug;
use serde::{Deserialize, Serialize};

/// One balance account across the year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceTrack {
    /// Prior year-end balance
    pub opening: Option<f64>,
    pub monthly: MonthlyValues,
    /// Balance of the latest month with data
    pub closing: Option<f64>,
}

impl BalanceTrack {
    pub fn from_entry(entry: &LedgerEntry) -> Self {
        Self {
            opening: entry.prior_year,
            monthly: entry.months,
            closing: entry.months.iter().rev().find_map(|v| *v),
        }
    }

    /// Change from the opening balance to the closing balance.
    pub fn movement(&self) -> Option<f64> {
        difference(self.closing, self.opening)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSummary {
    pub cash: BalanceTrack,
    pub borrowings: BalanceTrack,
    /// Cash minus borrowings; null in months where either side is missing
    pub net_cash: MonthlyValues,
}

pub fn summarize_balances(ledger: &AccountLedger) -> Result<BalanceSummary> {
    let track = |account: &str| {
        ledger
            .get(account)
            .map(BalanceTrack::from_entry)
            .ok_or_else(|| ReportError::InvalidRecord {
                account: account.to_string(),
                details: "required row is missing from the balance ledger".to_string(),
            })
    };

    let cash = track(CASH_BALANCE)?;
    let borrowings = track(BORROWING_BALANCE)?;

    let mut net_cash: MonthlyValues = [None; MONTHS];
    for (month, net) in net_cash.iter_mut().enumerate() {
        *net = difference(cash.monthly[month], borrowings.monthly[month]);
    }

    debug!(
        "Balances: cash {:?} -> {:?}, borrowings {:?} -> {:?}",
        cash.opening, cash.closing, borrowings.opening, borrowings.closing
    );

    Ok(BalanceSummary {
        cash,
        borrowings,
        net_cash,
    })
}
