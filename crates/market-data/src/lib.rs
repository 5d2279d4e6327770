//! Option chain fetching and aggregation for Sleet
//!
//! This crate fetches two-sided option chains from an upstream market-data
//! API that only returns one side per request.
//!
//! # Core Components
//!
//! - [`fetch`] - Shared async HTTP executor with bounded in-flight requests
//! - [`aggregator`] - Per-side leg fan-out, bounded join and merge
//! - [`chain`] - Two-sided option chain model
//! - [`request`] - Chain request parameters and leg URL building
//! - [`credentials`] - Injected API key and bearer token
//! - [`types`] - Contract wire types and key helpers
//!
//! # Key Invariants
//!
//! - An aggregation returns a complete chain or an error, never a partial chain
//! - A rejected credential halts the aggregator that saw it
//! - Expiration key day counts match every contract stored under them

pub mod aggregator;
pub mod chain;
pub mod credentials;
pub mod error;
pub mod fetch;
pub mod metrics;
pub mod request;
pub mod types;

pub use aggregator::{merge_legs, AggregatorConfig, ChainAggregator, PartialChain};
pub use chain::{ExpirationMap, OptionChain, StrikeMap};
pub use credentials::{Credentials, StaticToken, TokenProvider};
pub use error::{MarketDataError, Result};
pub use fetch::{FetchClient, FetchConfig, FetchHandle, FetchResponse, HttpConfig};
pub use request::{ChainLeg, ChainRequest, DEFAULT_CHAIN_URL, DEFAULT_STRIKE_COUNT};
pub use types::{Contract, ExpirationKey};
