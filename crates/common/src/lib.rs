//! Common types and utilities for Sleet
//!
//! This crate provides shared types used across all Sleet crates.
//!
//! # Modules
//!
//! - [`error`] - Common error types
//! - [`types`] - Shared domain types (OptionSide, ContractType, Ticker)

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
