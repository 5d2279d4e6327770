//! Common types used across Sleet
//!
//! This module provides the fundamental domain types shared by the
//! market data and spread crates.

use serde::{Deserialize, Serialize};

/// Option side (call or put)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionSide {
    /// Call option
    #[serde(alias = "call", alias = "Call")]
    Call,
    /// Put option
    #[serde(alias = "put", alias = "Put")]
    Put,
}

impl OptionSide {
    /// Both sides, in dispatch order
    pub const BOTH: [OptionSide; 2] = [OptionSide::Call, OptionSide::Put];

    /// Upstream wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionSide::Call => "CALL",
            OptionSide::Put => "PUT",
        }
    }
}

impl std::fmt::Display for OptionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OptionSide {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CALL" | "C" => Ok(OptionSide::Call),
            "PUT" | "P" => Ok(OptionSide::Put),
            _ => Err(format!("unknown option side: {}", s)),
        }
    }
}

/// Contract type filter sent upstream with a chain request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContractType {
    /// Calls only
    Call,
    /// Puts only
    Put,
    /// Both sides in one response
    #[default]
    All,
}

impl ContractType {
    /// Upstream query value
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractType::Call => "CALL",
            ContractType::Put => "PUT",
            ContractType::All => "ALL",
        }
    }
}

impl From<OptionSide> for ContractType {
    fn from(side: OptionSide) -> Self {
        match side {
            OptionSide::Call => ContractType::Call,
            OptionSide::Put => ContractType::Put,
        }
    }
}

impl std::fmt::Display for ContractType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Underlying ticker (e.g., "SPY", "$SPX")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ticker(pub String);

impl Ticker {
    /// Create a new Ticker
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Parse a user-supplied ticker, rejecting blanks and embedded whitespace
    pub fn parse(s: &str) -> crate::Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(crate::Error::invalid_input("ticker is empty"));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(crate::Error::invalid_input(format!(
                "ticker contains whitespace: {:?}",
                trimmed
            )));
        }
        Ok(Self::new(trimmed))
    }

    /// Get the ticker as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Ticker {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Ticker {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
