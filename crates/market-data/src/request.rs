//! Chain request parameters and per-leg URL building
//!
//! URLs are built per call from immutable values; nothing here is shared
//! between concurrent requests.

use crate::error::{MarketDataError, Result};
use chrono::{Days, Local, NaiveDate};
use common::{ContractType, OptionSide, Ticker};
use url::Url;

/// Default upstream chains endpoint
pub const DEFAULT_CHAIN_URL: &str = "https://api.schwabapi.com/marketdata/v1/chains";

/// Strikes above and below the money returned per expiration
pub const DEFAULT_STRIKE_COUNT: u32 = 100;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Filter parameters for one logical chain request
#[derive(Debug, Clone, PartialEq)]
pub struct ChainRequest {
    pub ticker: Ticker,
    pub strike_count: Option<u32>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub strike: Option<f64>,
    pub otm_only: bool,
    /// Explicit expiration dates; each becomes its own leg per side
    pub expirations: Vec<NaiveDate>,
}

/// One upstream request produced from a [`ChainRequest`]
#[derive(Debug, Clone, PartialEq)]
pub struct ChainLeg {
    /// Side requested, `None` for a combined (ALL) request
    pub side: Option<OptionSide>,
    pub expiration: Option<NaiveDate>,
    pub url: Url,
}

impl ChainRequest {
    /// Request with the default strike count
    pub fn new(ticker: impl Into<Ticker>) -> Self {
        Self {
            ticker: ticker.into(),
            strike_count: Some(DEFAULT_STRIKE_COUNT),
            from_date: None,
            to_date: None,
            strike: None,
            otm_only: false,
            expirations: Vec::new(),
        }
    }

    /// Contracts expiring within `days_ahead` days of today
    pub fn close_expiration(ticker: impl Into<Ticker>, days_ahead: u32, otm_only: bool) -> Self {
        Self::close_expiration_from(ticker, Local::now().date_naive(), days_ahead, otm_only)
    }

    /// Contracts expiring within `days_ahead` days of `today`
    pub fn close_expiration_from(
        ticker: impl Into<Ticker>,
        today: NaiveDate,
        days_ahead: u32,
        otm_only: bool,
    ) -> Self {
        let mut request = Self::new(ticker).otm_only(otm_only);
        request.strike_count = None;
        request.to_date = today.checked_add_days(Days::new(days_ahead.into()));
        request
    }

    pub fn strike_count(mut self, count: u32) -> Self {
        self.strike_count = Some(count);
        self
    }

    pub fn from_date(mut self, date: NaiveDate) -> Self {
        self.from_date = Some(date);
        self
    }

    pub fn to_date(mut self, date: NaiveDate) -> Self {
        self.to_date = Some(date);
        self
    }

    /// Single strike
    pub fn strike(mut self, strike: f64) -> Self {
        self.strike = Some(strike);
        self
    }

    /// Restrict upstream results to out-of-the-money contracts
    pub fn otm_only(mut self, otm_only: bool) -> Self {
        self.otm_only = otm_only;
        self
    }

    pub fn expirations(mut self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.expirations = dates.into_iter().collect();
        self.expirations.sort();
        self.expirations.dedup();
        self
    }

    /// Reject parameters upstream would refuse or misread
    pub fn validate(&self) -> Result<()> {
        if self.ticker.as_str().is_empty() {
            return Err(MarketDataError::InvalidRequest("ticker is empty".to_string()));
        }
        if self.strike_count == Some(0) {
            return Err(MarketDataError::InvalidRequest("strike count must be positive".to_string()));
        }
        if let (Some(from), Some(to)) = (self.from_date, self.to_date) {
            if from > to {
                return Err(MarketDataError::InvalidRequest(format!(
                    "fromDate {} is after toDate {}",
                    from, to
                )));
            }
        }
        if let Some(strike) = self.strike {
            if !strike.is_finite() || strike <= 0.0 {
                return Err(MarketDataError::InvalidRequest(format!("invalid strike {}", strike)));
            }
        }
        Ok(())
    }

    /// One leg per side, or per (side, date) when explicit expirations are set.
    /// CALL legs come first.
    pub fn split_legs(&self, base_url: &Url, api_key: Option<&str>) -> Result<Vec<ChainLeg>> {
        self.validate()?;

        let mut legs = Vec::new();
        for side in OptionSide::BOTH {
            if self.expirations.is_empty() {
                legs.push(ChainLeg {
                    side: Some(side),
                    expiration: None,
                    url: self.leg_url(base_url, api_key, side.into(), None),
                });
            } else {
                for &date in &self.expirations {
                    legs.push(ChainLeg {
                        side: Some(side),
                        expiration: Some(date),
                        url: self.leg_url(base_url, api_key, side.into(), Some(date)),
                    });
                }
            }
        }
        Ok(legs)
    }

    /// Single `contractType=ALL` leg
    pub fn combined_leg(&self, base_url: &Url, api_key: Option<&str>) -> Result<ChainLeg> {
        self.validate()?;
        Ok(ChainLeg {
            side: None,
            expiration: None,
            url: self.leg_url(base_url, api_key, ContractType::All, None),
        })
    }

    fn leg_url(
        &self,
        base_url: &Url,
        api_key: Option<&str>,
        contract_type: ContractType,
        date: Option<NaiveDate>,
    ) -> Url {
        let mut url = base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            if let Some(key) = api_key {
                query.append_pair("apikey", key);
            }
            query.append_pair("symbol", self.ticker.as_str());
            if let Some(count) = self.strike_count {
                query.append_pair("strikeCount", &count.to_string());
            }
            query.append_pair("contractType", contract_type.as_str());

            let (from, to) = match date {
                Some(date) => (Some(date), Some(date)),
                None => (self.from_date, self.to_date),
            };
            if let Some(from) = from {
                query.append_pair("fromDate", &from.format(DATE_FORMAT).to_string());
            }
            if let Some(to) = to {
                query.append_pair("toDate", &to.format(DATE_FORMAT).to_string());
            }
            if let Some(strike) = self.strike {
                query.append_pair("strike", &strike.to_string());
            }
            if self.otm_only {
                query.append_pair("range", "OTM");
            }
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn base() -> Url {
        Url::parse(DEFAULT_CHAIN_URL).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_split_legs_one_per_side() {
        let legs = ChainRequest::new("spy").split_legs(&base(), Some("KEY")).unwrap();

        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].side, Some(OptionSide::Call));
        assert_eq!(legs[1].side, Some(OptionSide::Put));
        assert_eq!(
            legs[0].url.as_str(),
            "https://api.schwabapi.com/marketdata/v1/chains?apikey=KEY&symbol=SPY&strikeCount=100&contractType=CALL"
        );
        assert!(legs[1].url.as_str().ends_with("contractType=PUT"));
    }

    #[test]
    fn test_close_expiration_request() {
        let request = ChainRequest::close_expiration_from("QQQ", date(2024, 9, 1), 40, true);
        let legs = request.split_legs(&base(), None).unwrap();

        assert_eq!(
            legs[1].url.query(),
            Some("symbol=QQQ&contractType=PUT&toDate=2024-10-11&range=OTM")
        );
    }

    #[test]
    fn test_split_legs_per_expiration() {
        let request = ChainRequest::new("SPY").expirations([date(2024, 9, 27), date(2024, 9, 20), date(2024, 9, 20)]);
        let legs = request.split_legs(&base(), None).unwrap();

        assert_eq!(legs.len(), 4);
        assert_eq!(legs[0].expiration, Some(date(2024, 9, 20)));
        assert_eq!(legs[2].side, Some(OptionSide::Put));
        assert!(legs[1]
            .url
            .as_str()
            .ends_with("contractType=CALL&fromDate=2024-09-27&toDate=2024-09-27"));
    }

    #[test]
    fn test_combined_leg() {
        let leg = ChainRequest::new("SPY")
            .strike(300.0)
            .combined_leg(&base(), None)
            .unwrap();
        assert_eq!(leg.side, None);
        assert_eq!(
            leg.url.query(),
            Some("symbol=SPY&strikeCount=100&contractType=ALL&strike=300")
        );
    }

    #[test]
    fn test_invalid_requests() {
        let base = base();
        assert_matches!(
            ChainRequest::new("SPY").strike_count(0).split_legs(&base, None),
            Err(MarketDataError::InvalidRequest(_))
        );
        assert_matches!(
            ChainRequest::new("SPY")
                .from_date(date(2024, 9, 2))
                .to_date(date(2024, 9, 1))
                .split_legs(&base, None),
            Err(MarketDataError::InvalidRequest(_))
        );
        assert_matches!(
            ChainRequest::new("  ").split_legs(&base, None),
            Err(MarketDataError::InvalidRequest(_))
        );
    }
}
