//! Vertical spread analytics for Sleet
//!
//! Consumes one side of an [`market_data::OptionChain`] and produces ranked
//! vertical spreads with price, buying power, ROI and Greek differentials.
//!
//! # Key Invariants
//!
//! - Strikes are ordered numerically, never lexically
//! - Leg assignment depends only on side and strike order
//! - Zero buying power is an error for that pair, never an infinite ROI
//! - All rounding is half-up on the exact binary value of the input
//! - Buying power and ROI are computed in decimal and rounded once

pub mod engine;
pub mod error;
pub mod ranking;
pub mod rounding;
pub mod spread;

pub use engine::{otm_slice, sorted_strikes, SpreadConfig, SpreadEngine, SpreadScan};
pub use error::{Result, SpreadError};
pub use ranking::{compare_by_roi, rank, SpreadFilter};
pub use spread::Spread;
