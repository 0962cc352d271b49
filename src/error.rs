use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Invalid base month {0}: must be between 1 and 12")]
    InvalidBaseMonth(u32),

    #[error("Invalid year-month label '{0}': expected YY.MM")]
    InvalidYearMonth(String),

    #[error("Invalid ledger record for account '{account}': {details}")]
    InvalidRecord { account: String, details: String },

    #[error("Account '{0}' appears more than once in the statement schema")]
    DuplicateAccount(String),

    #[error("Formula row '{formula}' references unknown row '{operand}'")]
    UnknownOperand { formula: String, operand: String },

    #[error("Cyclic formula dependency: {}", .0.join(" -> "))]
    CyclicFormula(Vec<String>),

    #[error("Statement type {statement} does not support {operation}")]
    UnsupportedStatement {
        statement: String,
        operation: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Ledger {key} could not be loaded: {reason}")]
    LedgerUnavailable { key: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
