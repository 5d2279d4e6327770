//! Vertical spread economics

use crate::error::{Result, SpreadError};
use crate::rounding::{round2, round_product, round_quotient};
use common::OptionSide;
use market_data::types::format_strike;
use market_data::Contract;
use serde::Serialize;
use std::fmt;

/// Contract multiplier for equity options
pub const CONTRACT_MULTIPLIER: i64 = 100;

/// One short/long vertical spread
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spread {
    pub ticker: String,
    pub side: OptionSide,
    /// Expiration key the legs were listed under ("yyyy-MM-dd:N")
    pub expiration: String,
    /// "short/long" strike label
    pub strikes: String,
    pub short_strike: f64,
    pub long_strike: f64,
    pub days_to_expiration: i64,
    /// Net credit per share
    pub price: f64,
    pub buying_power: f64,
    pub roi: f64,
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
}

impl Spread {
    /// Price a spread from its two legs.
    ///
    /// Fails with [`SpreadError::InvalidSpread`] when the strikes give no
    /// buying power.
    pub fn new(side: OptionSide, expiration: &str, short: &Contract, long: &Contract) -> Result<Self> {
        let strikes = format!(
            "{}/{}",
            format_strike(short.strike_price),
            format_strike(long.strike_price)
        );

        let buying_power = round_product(
            (short.strike_price - long.strike_price).abs(),
            CONTRACT_MULTIPLIER,
            2,
        );
        if buying_power.is_nan() || buying_power <= 0.0 {
            return Err(SpreadError::InvalidSpread {
                expiration: expiration.to_string(),
                strikes,
                buying_power,
            });
        }

        let price = round2(short.mark - long.mark);
        let roi = round_quotient(price, CONTRACT_MULTIPLIER, buying_power, 3);

        Ok(Self {
            ticker: short.underlying_ticker(),
            side,
            expiration: expiration.to_string(),
            strikes,
            short_strike: short.strike_price,
            long_strike: long.strike_price,
            days_to_expiration: short.days_to_expiration,
            price,
            buying_power,
            roi,
            delta: round2(short.delta - long.delta),
            gamma: round2(short.gamma - long.gamma),
            theta: round2(short.theta - long.theta),
            vega: round2(short.vega - long.vega),
        })
    }
}

impl fmt::Display for Spread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} price={:.2} bp={:.2} roi={:.3}",
            self.ticker, self.side, self.expiration, self.strikes, self.price, self.buying_power, self.roi
        )
    }
}
