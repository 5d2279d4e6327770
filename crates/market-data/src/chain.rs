//! Two-sided option chain model
//!
//! An [`OptionChain`] holds one `expirationDateKey -> strikeKey -> contracts`
//! mapping per side. Maps are ordered so iteration is deterministic.

use crate::error::{MarketDataError, Result};
use crate::types::{lenient_f64, Contract, ExpirationKey};
use common::OptionSide;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// `strikeKey -> contracts` for one expiration
pub type StrikeMap = BTreeMap<String, Vec<Contract>>;

/// `expirationDateKey -> strikes` for one side
pub type ExpirationMap = BTreeMap<String, StrikeMap>;

/// Option chain for a single underlying
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionChain {
    #[serde(default)]
    pub symbol: String,
    #[serde(default, with = "lenient_f64")]
    pub interest_rate: f64,
    #[serde(default, with = "lenient_f64")]
    pub underlying_price: f64,
    #[serde(default, with = "lenient_f64")]
    pub volatility: f64,
    #[serde(default, deserialize_with = "null_as_empty")]
    call_exp_date_map: ExpirationMap,
    #[serde(default, deserialize_with = "null_as_empty")]
    put_exp_date_map: ExpirationMap,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<ExpirationMap, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<ExpirationMap>::deserialize(deserializer)?.unwrap_or_default())
}

impl OptionChain {
    /// Create an empty chain for a symbol
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    /// Parse an upstream JSON payload
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body)
            .map_err(|e| MarketDataError::UpstreamData(format!("malformed chain payload: {}", e)))
    }

    /// Mapping for one side
    pub fn get(&self, side: OptionSide) -> &ExpirationMap {
        match side {
            OptionSide::Call => &self.call_exp_date_map,
            OptionSide::Put => &self.put_exp_date_map,
        }
    }

    /// Replace the mapping for one side
    pub fn set(&mut self, side: OptionSide, map: ExpirationMap) {
        match side {
            OptionSide::Call => self.call_exp_date_map = map,
            OptionSide::Put => self.put_exp_date_map = map,
        }
    }

    /// Move the mapping for one side out, leaving it empty
    pub fn take(&mut self, side: OptionSide) -> ExpirationMap {
        match side {
            OptionSide::Call => std::mem::take(&mut self.call_exp_date_map),
            OptionSide::Put => std::mem::take(&mut self.put_exp_date_map),
        }
    }

    /// True iff the side has zero expiration keys
    pub fn is_empty(&self, side: OptionSide) -> bool {
        self.get(side).is_empty()
    }

    pub fn expiration_keys(&self, side: OptionSide) -> impl Iterator<Item = &str> + '_ {
        self.get(side).keys().map(String::as_str)
    }

    /// Total contracts stored for a side
    pub fn contract_count(&self, side: OptionSide) -> usize {
        self.get(side)
            .values()
            .flat_map(|strikes| strikes.values())
            .map(Vec::len)
            .sum()
    }

    /// Same header, both sides empty
    pub fn scaffold(&self) -> Self {
        Self {
            symbol: self.symbol.clone(),
            interest_rate: self.interest_rate,
            underlying_price: self.underlying_price,
            volatility: self.volatility,
            ..Default::default()
        }
    }

    /// Check that every expiration key parses and that its day count matches
    /// `daysToExpiration` of each contract stored under it.
    pub fn validate(&self) -> Result<()> {
        for side in OptionSide::BOTH {
            for (key, strikes) in self.get(side) {
                let parsed: ExpirationKey = key.parse().map_err(MarketDataError::UpstreamData)?;

                for (strike, contracts) in strikes {
                    if let Some(bad) = contracts
                        .iter()
                        .find(|c| c.days_to_expiration != parsed.days)
                    {
                        return Err(MarketDataError::UpstreamData(format!(
                            "{} {} {} @ {}: daysToExpiration {} does not match key",
                            self.symbol, side, key, strike, bad.days_to_expiration
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::contract;
    use assert_matches::assert_matches;

    fn side_map(side: OptionSide, key: &str, days: i64, strikes: &[f64]) -> ExpirationMap {
        let mut strike_map = StrikeMap::new();
        for &s in strikes {
            strike_map.insert(crate::types::format_strike(s), vec![contract(side, s, days, 1.0)]);
        }
        let mut map = ExpirationMap::new();
        map.insert(key.to_string(), strike_map);
        map
    }

    #[test]
    fn test_get_set_is_empty() {
        let mut chain = OptionChain::new("SPY");
        assert!(chain.is_empty(OptionSide::Call));
        assert!(chain.is_empty(OptionSide::Put));

        chain.set(OptionSide::Put, side_map(OptionSide::Put, "2024-09-20:30", 30, &[290.0, 295.0]));
        assert!(chain.is_empty(OptionSide::Call));
        assert!(!chain.is_empty(OptionSide::Put));
        assert_eq!(chain.contract_count(OptionSide::Put), 2);
        assert_eq!(
            chain.expiration_keys(OptionSide::Put).collect::<Vec<_>>(),
            vec!["2024-09-20:30"]
        );

        let taken = chain.take(OptionSide::Put);
        assert_eq!(taken.len(), 1);
        assert!(chain.is_empty(OptionSide::Put));
    }

    #[test]
    fn test_deserialize_partial_leg() {
        let body = r#"{
            "symbol": "SPY",
            "status": "SUCCESS",
            "underlyingPrice": 301.2,
            "interestRate": 5.1,
            "volatility": 29.0,
            "callExpDateMap": {
                "2024-09-20:30": {
                    "300.0": [{"putCall":"CALL","strikePrice":300.0,"daysToExpiration":30,"mark":1.0}]
                }
            },
            "putExpDateMap": null
        }"#;

        let chain = OptionChain::from_json(body).unwrap();
        assert_eq!(chain.symbol, "SPY");
        assert_eq!(chain.underlying_price, 301.2);
        assert!(!chain.is_empty(OptionSide::Call));
        assert!(chain.is_empty(OptionSide::Put));
        assert!(chain.validate().is_ok());
    }

    #[test]
    fn test_malformed_payload() {
        assert_matches!(
            OptionChain::from_json("<html>busy</html>"),
            Err(MarketDataError::UpstreamData(_))
        );
    }

    #[test]
    fn test_validate_rejects_day_mismatch() {
        let mut chain = OptionChain::new("SPY");
        chain.set(OptionSide::Call, side_map(OptionSide::Call, "2024-09-20:31", 30, &[300.0]));
        assert_matches!(chain.validate(), Err(MarketDataError::UpstreamData(_)));

        let mut chain = OptionChain::new("SPY");
        chain.set(OptionSide::Call, side_map(OptionSide::Call, "not-a-key", 30, &[300.0]));
        assert_matches!(chain.validate(), Err(MarketDataError::UpstreamData(_)));
    }

    #[test]
    fn test_scaffold_keeps_header_only() {
        let mut chain = OptionChain::new("SPY");
        chain.underlying_price = 301.0;
        chain.set(OptionSide::Call, side_map(OptionSide::Call, "2024-09-20:30", 30, &[300.0]));

        let scaffold = chain.scaffold();
        assert_eq!(scaffold.symbol, "SPY");
        assert_eq!(scaffold.underlying_price, 301.0);
        assert!(scaffold.is_empty(OptionSide::Call));
    }
}
