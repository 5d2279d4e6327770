//! Vertical spread enumeration
//!
//! For each expiration on one side of a chain, every pair of strikes
//! `i < j` (after numeric sorting and the optional OTM cut) becomes a spread:
//!
//! - CALL: short at the lower strike `i`, long at the higher strike `j`
//! - PUT: short at the higher strike `j`, long at the lower strike `i`

use crate::error::SpreadError;
use crate::ranking::rank;
use crate::spread::Spread;
use common::OptionSide;
use market_data::types::{is_same_day_key, parse_strike};
use market_data::{Contract, ExpirationMap, OptionChain, StrikeMap};
use ordered_float::OrderedFloat;
use tracing::{debug, warn};

/// Enumeration options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpreadConfig {
    /// CALL keeps the upper half of strikes, PUT the lower half
    pub otm_only: bool,
    /// Skip expirations whose day count is 0
    pub skip_same_day: bool,
}

/// Spreads found in one pass, plus the pairs that were skipped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpreadScan {
    pub spreads: Vec<Spread>,
    pub skipped: Vec<SpreadError>,
}

impl SpreadScan {
    /// Append another scan
    pub fn extend(&mut self, other: SpreadScan) {
        self.spreads.extend(other.spreads);
        self.skipped.extend(other.skipped);
    }

    /// Spreads sorted best ROI first
    pub fn ranked(mut self) -> Vec<Spread> {
        rank(&mut self.spreads);
        self.spreads
    }

    pub fn is_empty(&self) -> bool {
        self.spreads.is_empty()
    }
}

/// Stateless spread enumerator
#[derive(Debug, Clone, Default)]
pub struct SpreadEngine {
    config: SpreadConfig,
}

impl SpreadEngine {
    pub fn new(config: SpreadConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SpreadConfig {
        &self.config
    }

    /// Enumerate spreads on one side of a chain
    pub fn spreads(&self, chain: &OptionChain, side: OptionSide) -> SpreadScan {
        let scan = self.spreads_for_map(side, chain.get(side));
        debug!(
            symbol = %chain.symbol,
            %side,
            spreads = scan.spreads.len(),
            skipped = scan.skipped.len(),
            "Enumerated spreads"
        );
        scan
    }

    /// Enumerate spreads on both sides, CALL first
    pub fn all_spreads(&self, chain: &OptionChain) -> SpreadScan {
        let mut scan = SpreadScan::default();
        for side in OptionSide::BOTH {
            scan.extend(self.spreads(chain, side));
        }
        scan
    }

    /// Enumerate spreads over a single side's mapping
    pub fn spreads_for_map(&self, side: OptionSide, expirations: &ExpirationMap) -> SpreadScan {
        let mut scan = SpreadScan::default();
        for (expiration, strikes) in expirations {
            if self.config.skip_same_day && is_same_day_key(expiration) {
                continue;
            }
            self.expiration_spreads(side, expiration, strikes, &mut scan);
        }
        scan
    }

    fn expiration_spreads(&self, side: OptionSide, expiration: &str, strikes: &StrikeMap, scan: &mut SpreadScan) {
        let sorted = sorted_strikes(expiration, strikes);
        let candidates = if self.config.otm_only {
            otm_slice(side, &sorted)
        } else {
            &sorted[..]
        };

        for i in 0..candidates.len() {
            for j in (i + 1)..candidates.len() {
                let (short_key, long_key) = match side {
                    OptionSide::Call => (candidates[i], candidates[j]),
                    OptionSide::Put => (candidates[j], candidates[i]),
                };

                let result = first_contract(expiration, strikes, short_key).and_then(|short| {
                    let long = first_contract(expiration, strikes, long_key)?;
                    Spread::new(side, expiration, short, long)
                });
                match result {
                    Ok(spread) => scan.spreads.push(spread),
                    Err(err) => {
                        debug!(%side, error = %err, "Skipping strike pair");
                        scan.skipped.push(err);
                    }
                }
            }
        }
    }
}

/// Strike keys sorted by numeric value; unparseable keys are dropped
pub fn sorted_strikes<'a>(expiration: &str, strikes: &'a StrikeMap) -> Vec<&'a str> {
    let mut parsed: Vec<(OrderedFloat<f64>, &str)> = strikes
        .keys()
        .filter_map(|key| match parse_strike(key) {
            Some(value) => Some((OrderedFloat(value), key.as_str())),
            None => {
                warn!(expiration, strike = %key, "Ignoring unparseable strike key");
                None
            }
        })
        .collect();
    parsed.sort_by_key(|(value, _)| *value);
    parsed.into_iter().map(|(_, key)| key).collect()
}

/// Out-of-the-money half of ascending strikes: upper half for calls, lower
/// half for puts, split at `len / 2`
pub fn otm_slice<T>(side: OptionSide, sorted: &[T]) -> &[T] {
    let split = sorted.len() / 2;
    match side {
        OptionSide::Call => &sorted[split..],
        OptionSide::Put => &sorted[..split],
    }
}

fn first_contract<'a>(expiration: &str, strikes: &'a StrikeMap, key: &str) -> Result<&'a Contract, SpreadError> {
    strikes
        .get(key)
        .and_then(|contracts| contracts.first())
        .ok_or_else(|| SpreadError::MissingContract {
            expiration: expiration.to_string(),
            strike: key.to_string(),
        })
}
