use crate::config::RecoveryConfig;
use crate::error::{ReportError, Result};
use chrono::{Datelike, Months, NaiveDate};
use log::debug;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A two-digit-year calendar month, printed as `"YY.MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: u32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: u32, month: u32) -> Result<Self> {
        if year > 99 || !(1..=12).contains(&month) {
            return Err(ReportError::InvalidYearMonth(format!("{}.{}", year, month)));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year().rem_euclid(100) as u32,
            month: date.month(),
        }
    }

    pub fn year(&self) -> u32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Four-digit year, assuming the 2000s.
    pub fn full_year(&self) -> i32 {
        2000 + self.year as i32
    }

    pub fn first_day(&self) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(self.full_year(), self.month, 1)
            .ok_or_else(|| ReportError::InvalidYearMonth(self.to_string()))
    }

    /// The month `months` after this one; the two-digit year wraps after 99.
    pub fn plus_months(&self, months: u32) -> Result<Self> {
        let shifted = self
            .first_day()?
            .checked_add_months(Months::new(months))
            .ok_or_else(|| ReportError::InvalidYearMonth(format!("{} + {} months", self, months)))?;
        Ok(Self::from_date(shifted))
    }

    /// The `count` month labels following this one.
    pub fn following(&self, count: usize) -> Result<Vec<YearMonth>> {
        (1..=count as u32).map(|offset| self.plus_months(offset)).collect()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}.{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ReportError::InvalidYearMonth(s.to_string());
        let (year, month) = s.trim().split_once('.').ok_or_else(invalid)?;

        let two_digits = |part: &str| part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit());
        if !two_digits(year) || !two_digits(month) {
            return Err(invalid());
        }
        let year: u32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(serde::de::Error::custom)
    }
}

/// Picks the most recent base month among file names of the form `YY.MM.csv`.
pub fn latest_base_from_file_names<I, S>(names: I) -> Option<YearMonth>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .filter_map(|name| {
            name.as_ref()
                .strip_suffix(".csv")
                .and_then(|stem| stem.parse::<YearMonth>().ok())
        })
        .max()
}

/// Raw recovery plan row (대리상선수금, 대리상채권, 회수1..N).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditRecoveryPlan {
    pub dealer_advance: f64,
    pub dealer_receivable: f64,
    pub recoveries: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryEntry {
    pub label: YearMonth,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverySchedule {
    pub base_year_month: YearMonth,
    pub headers: Vec<YearMonth>,
    pub entries: Vec<RecoveryEntry>,
    pub dealer_advance: f64,
    pub dealer_receivable: f64,
    pub net_credit: f64,
    pub total_recovery: f64,
    pub remaining_after_recovery: f64,
}

pub struct RecoveryScheduler {
    config: RecoveryConfig,
}

impl RecoveryScheduler {
    pub fn new(config: RecoveryConfig) -> Self {
        Self { config }
    }

    pub fn schedule(&self, base: YearMonth, plan: &CreditRecoveryPlan) -> Result<RecoverySchedule> {
        if plan.recoveries.len() != self.config.periods {
            return Err(ReportError::InvalidConfig(format!(
                "expected {} recovery amounts, got {}",
                self.config.periods,
                plan.recoveries.len()
            )));
        }

        let headers = base.following(self.config.periods)?;
        let entries: Vec<RecoveryEntry> = headers
            .iter()
            .zip(&plan.recoveries)
            .filter(|&(_, &amount)| !(self.config.drop_zero_amounts && amount == 0.0))
            .map(|(&label, &amount)| RecoveryEntry { label, amount })
            .collect();

        debug!(
            "Recovery schedule from {}: {} of {} periods carry an amount",
            base,
            entries.len(),
            headers.len()
        );

        let total_recovery: f64 = plan.recoveries.iter().sum();
        let net_credit = plan.dealer_receivable - plan.dealer_advance;

        Ok(RecoverySchedule {
            base_year_month: base,
            headers,
            entries,
            dealer_advance: plan.dealer_advance,
            dealer_receivable: plan.dealer_receivable,
            net_credit,
            total_recovery,
            remaining_after_recovery: net_credit - total_recovery,
        })
    }
}
