use crate::brand::DEFAULT_OTHER_LABEL;
use crate::error::{ReportError, Result};
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CreditConfig {
    /// Number of dealers kept in the top band
    pub top_n: usize,
    /// Largest-dealer share (percent of net credit) above which risk is "high"
    pub risk_threshold_percent: f64,
    /// Dealer name that marks the ledger's total row
    pub total_label: String,
}

impl Default for CreditConfig {
    fn default() -> Self {
        Self {
            top_n: 17,
            risk_threshold_percent: 20.0,
            total_label: "합계".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Months scheduled after the base month
    pub periods: usize,
    /// Drop zero recovery amounts together with their labels
    pub drop_zero_amounts: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            periods: 4,
            drop_zero_amounts: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BrandConfig {
    pub brands: Vec<String>,
    /// Name of the residual bucket
    pub other_label: String,
}

impl Default for BrandConfig {
    fn default() -> Self {
        Self {
            brands: ["mlb", "kids", "discovery", "duvetica", "supra"]
                .into_iter()
                .map(String::from)
                .collect(),
            other_label: DEFAULT_OTHER_LABEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EngineConfig {
    pub credit: CreditConfig,
    pub recovery: RecoveryConfig,
    pub brands: BrandConfig,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schema_for!(EngineConfig)
    }

    pub fn validate(&self) -> Result<()> {
        if self.credit.top_n == 0 {
            return Err(ReportError::InvalidConfig(
                "credit.top_n must be at least 1".to_string(),
            ));
        }
        let threshold = self.credit.risk_threshold_percent;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(ReportError::InvalidConfig(format!(
                "credit.risk_threshold_percent must be between 0 and 100, got {}",
                threshold
            )));
        }
        if !(1..=12).contains(&self.recovery.periods) {
            return Err(ReportError::InvalidConfig(format!(
                "recovery.periods must be between 1 and 12, got {}",
                self.recovery.periods
            )));
        }

        let mut seen = HashSet::new();
        for brand in &self.brands.brands {
            if brand.trim().is_empty() {
                return Err(ReportError::InvalidConfig("brand ids cannot be blank".to_string()));
            }
            if !seen.insert(brand.as_str()) {
                return Err(ReportError::InvalidConfig(format!(
                    "brand '{}' is listed more than once",
                    brand
                )));
            }
        }
        if self.brands.other_label.trim().is_empty() || seen.contains(self.brands.other_label.as_str()) {
            return Err(ReportError::InvalidConfig(format!(
                "residual label '{}' must be non-blank and differ from every brand id",
                self.brands.other_label
            )));
        }

        Ok(())
    }
}
