//! Spread engine error types

use thiserror::Error;

/// Errors scoped to a single strike pair; enumeration continues past them
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpreadError {
    /// Strike width yields no buying power, so ROI is undefined
    #[error("Invalid spread {strikes} on {expiration}: buying power {buying_power}")]
    InvalidSpread {
        expiration: String,
        strikes: String,
        buying_power: f64,
    },

    /// A strike key with no contracts under it
    #[error("No contract under strike {strike} on {expiration}")]
    MissingContract { expiration: String, strike: String },
}

/// Result type for spread operations
pub type Result<T> = std::result::Result<T, SpreadError>;
