//! Wire types for option chain payloads
//!
//! Field names follow the upstream JSON (camelCase). Unknown fields are
//! ignored so newer payloads keep deserializing.

use chrono::NaiveDate;
use common::OptionSide;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Snapshot of a single option contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    /// Option symbol (e.g., "SPY_092024C300" or OCC "SPY   240920C00300000")
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub description: String,
    /// Underlying ticker, when upstream reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underlying: Option<String>,
    #[serde(rename = "putCall")]
    pub side: OptionSide,
    pub strike_price: f64,
    #[serde(
        default,
        with = "expiration_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiration_date: Option<NaiveDate>,
    pub days_to_expiration: i64,
    #[serde(default)]
    pub bid: f64,
    #[serde(default)]
    pub ask: f64,
    #[serde(default)]
    pub last: f64,
    #[serde(default)]
    pub mark: f64,
    #[serde(default)]
    pub open_interest: i64,
    #[serde(default)]
    pub total_volume: i64,
    #[serde(default)]
    pub in_the_money: bool,
    #[serde(default, with = "lenient_f64")]
    pub delta: f64,
    #[serde(default, with = "lenient_f64")]
    pub gamma: f64,
    #[serde(default, with = "lenient_f64")]
    pub theta: f64,
    #[serde(default, with = "lenient_f64")]
    pub vega: f64,
}

impl Contract {
    /// Underlying ticker, falling back to the root of the option symbol
    pub fn underlying_ticker(&self) -> String {
        if let Some(underlying) = self.underlying.as_deref().filter(|u| !u.trim().is_empty()) {
            return underlying.trim().to_string();
        }

        // Legacy "ROOT_MMDDYYC100" symbols; weekly roots carry a trailing 'W'
        if let Some((root, _)) = self.symbol.split_once('_') {
            if root.len() > 1 {
                if let Some(stripped) = root.strip_suffix('W') {
                    return stripped.to_string();
                }
            }
            return root.to_string();
        }

        self.symbol
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string()
    }
}

/// Parsed `expirationDateKey` ("yyyy-MM-dd:N")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExpirationKey {
    pub date: NaiveDate,
    /// Days to expiration
    pub days: i64,
}

impl ExpirationKey {
    /// True when the contract expires today
    pub fn is_same_day(&self) -> bool {
        self.days == 0
    }
}

impl fmt::Display for ExpirationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.date.format("%Y-%m-%d"), self.days)
    }
}

impl FromStr for ExpirationKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (date, days) = s
            .split_once(':')
            .ok_or_else(|| format!("expiration key missing ':' separator: {}", s))?;
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| format!("bad expiration date in key {}: {}", s, e))?;
        let days = days
            .parse::<i64>()
            .map_err(|e| format!("bad day count in key {}: {}", s, e))?;
        Ok(Self { date, days })
    }
}

/// True when a raw expiration key parses and its day count is 0
pub fn is_same_day_key(key: &str) -> bool {
    key.parse::<ExpirationKey>()
        .map(|key| key.is_same_day())
        .unwrap_or(false)
}

/// Parse a strike key ("295.0") into a finite number
pub fn parse_strike(key: &str) -> Option<f64> {
    key.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Format a strike the way upstream keys do ("300.0", "297.5")
pub fn format_strike(strike: f64) -> String {
    if strike.fract() == 0.0 {
        format!("{:.1}", strike)
    } else {
        format!("{}", strike)
    }
}

/// `expirationDate` arrives as ISO text or epoch milliseconds and is
/// written back as `yyyy-MM-dd`.
pub mod expiration_date {
    use chrono::{DateTime, NaiveDate};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => serializer.serialize_str(&date.format("%Y-%m-%d").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            Value::Number(n) => {
                let millis = n
                    .as_i64()
                    .ok_or_else(|| D::Error::custom(format!("bad epoch millis: {}", n)))?;
                DateTime::from_timestamp_millis(millis)
                    .map(|dt| Some(dt.date_naive()))
                    .ok_or_else(|| D::Error::custom(format!("epoch millis out of range: {}", millis)))
            }
            Value::String(s) => {
                let day = s.get(..10).unwrap_or(s.as_str());
                NaiveDate::parse_from_str(day, "%Y-%m-%d")
                    .map(Some)
                    .map_err(|e| D::Error::custom(format!("bad expiration date {}: {}", s, e)))
            }
            other => Err(D::Error::custom(format!(
                "unexpected expiration date: {}",
                other
            ))),
        }
    }
}

/// Greeks come back as numbers, numeric strings, or "NaN".
pub mod lenient_f64 {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_str("NaN")
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(f64::NAN),
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| D::Error::custom(format!("bad number: {}", n))),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| D::Error::custom(format!("bad numeric string {:?}: {}", s, e))),
            other => Err(D::Error::custom(format!("expected number, got {}", other))),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn contract(side: OptionSide, strike: f64, days: i64, mark: f64) -> Contract {
        Contract {
            symbol: format!("SPY_092024{}{}", if side == OptionSide::Call { 'C' } else { 'P' }, strike),
            description: String::new(),
            underlying: None,
            side,
            strike_price: strike,
            expiration_date: NaiveDate::from_ymd_opt(2024, 9, 20),
            days_to_expiration: days,
            bid: mark - 0.05,
            ask: mark + 0.05,
            last: mark,
            mark,
            open_interest: 1200,
            total_volume: 340,
            in_the_money: false,
            delta: if side == OptionSide::Call { 0.35 } else { -0.35 },
            gamma: 0.02,
            theta: -0.11,
            vega: 0.18,
        }
    }

    #[test]
    fn test_contract_deserialize_upstream_shape() {
        let json = r#"{
            "putCall": "PUT",
            "symbol": "SPY   240920P00295000",
            "description": "SPY 09/20/2024 295.00 P",
            "bid": 0.2, "ask": 0.3, "last": 0.25, "mark": 0.25,
            "totalVolume": 88, "openInterest": 4021,
            "strikePrice": 295.0,
            "expirationDate": "2024-09-20T20:00:00.000+00:00",
            "daysToExpiration": 30,
            "inTheMoney": false,
            "delta": -0.12, "gamma": "0.01", "theta": "NaN", "vega": 0.05,
            "isPennyPilot": true
        }"#;

        let c: Contract = serde_json::from_str(json).unwrap();
        assert_eq!(c.side, OptionSide::Put);
        assert_eq!(c.strike_price, 295.0);
        assert_eq!(c.expiration_date, NaiveDate::from_ymd_opt(2024, 9, 20));
        assert_eq!(c.gamma, 0.01);
        assert!(c.theta.is_nan());
        assert_eq!(c.underlying_ticker(), "SPY");
    }

    #[test]
    fn test_expiration_date_epoch_millis() {
        let json = r#"{"putCall":"CALL","strikePrice":300,"daysToExpiration":0,
                       "expirationDate":1726862400000}"#;
        let c: Contract = serde_json::from_str(json).unwrap();
        assert_eq!(c.expiration_date, NaiveDate::from_ymd_opt(2024, 9, 20));
    }

    #[test]
    fn test_contract_round_trip_preserves_numbers() {
        let original = contract(OptionSide::Call, 302.5, 30, 1.37);
        let json = serde_json::to_string(&original).unwrap();
        assert!(json.contains("\"expirationDate\":\"2024-09-20\""));

        let back: Contract = serde_json::from_str(&json).unwrap();
        assert_eq!(back.side, original.side);
        assert_eq!(back.expiration_date, original.expiration_date);
        assert_eq!(back.open_interest, original.open_interest);
        for (a, b) in [
            (back.strike_price, original.strike_price),
            (back.bid, original.bid),
            (back.ask, original.ask),
            (back.mark, original.mark),
            (back.delta, original.delta),
            (back.theta, original.theta),
        ] {
            assert!((a - b).abs() < 0.005, "{} != {}", a, b);
        }
    }

    #[test]
    fn test_underlying_from_legacy_symbol() {
        let mut c = contract(OptionSide::Call, 100.0, 3, 1.0);
        c.symbol = "SPYW_092024C100".to_string();
        assert_eq!(c.underlying_ticker(), "SPY");

        c.symbol = "W_092024C100".to_string();
        assert_eq!(c.underlying_ticker(), "W");

        c.underlying = Some("QQQ".to_string());
        assert_eq!(c.underlying_ticker(), "QQQ");
    }

    #[test]
    fn test_expiration_key() {
        let key: ExpirationKey = "2024-09-20:30".parse().unwrap();
        assert_eq!(key.days, 30);
        assert_eq!(key.to_string(), "2024-09-20:30");
        assert!(!key.is_same_day());

        assert!("2024-09-20".parse::<ExpirationKey>().is_err());
        assert!("2024-13-01:4".parse::<ExpirationKey>().is_err());
        assert!("2024-09-20:x".parse::<ExpirationKey>().is_err());
    }

    #[test]
    fn test_same_day_key() {
        assert!(is_same_day_key("2024-09-20:0"));
        assert!(!is_same_day_key("2024-09-20:10"));
        assert!(!is_same_day_key("garbage"));
        assert!(!is_same_day_key("2024-13-40:0"));
    }

    #[test]
    fn test_strike_helpers() {
        assert_eq!(parse_strike("295.0"), Some(295.0));
        assert_eq!(parse_strike("abc"), None);
        assert_eq!(parse_strike("NaN"), None);
        assert_eq!(format_strike(300.0), "300.0");
        assert_eq!(format_strike(297.5), "297.5");
    }
}
