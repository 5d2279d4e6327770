//! Ranking and filtering of spreads

use crate::spread::Spread;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Best ROI first. Equal ROIs compare equal, so this is an ordering for
/// "best first" display, not a key for sets.
pub fn compare_by_roi(a: &Spread, b: &Spread) -> Ordering {
    b.roi.partial_cmp(&a.roi).unwrap_or(Ordering::Equal)
}

/// Stable sort, best ROI first
pub fn rank(spreads: &mut [Spread]) {
    spreads.sort_by(compare_by_roi);
}

/// Keeps spreads within a capital budget and above a return threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadFilter {
    pub max_buying_power: f64,
    pub min_roi: f64,
}

impl Default for SpreadFilter {
    fn default() -> Self {
        Self {
            max_buying_power: 5000.0,
            min_roi: 0.25,
        }
    }
}

impl SpreadFilter {
    pub fn accepts(&self, spread: &Spread) -> bool {
        spread.buying_power <= self.max_buying_power && spread.roi >= self.min_roi
    }

    /// Filter, keeping input order
    pub fn apply(&self, spreads: Vec<Spread>) -> Vec<Spread> {
        spreads.into_iter().filter(|s| self.accepts(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spread::tests::leg;
    use common::OptionSide;

    fn spread(short: f64, long: f64, short_mark: f64, long_mark: f64) -> Spread {
        Spread::new(
            OptionSide::Call,
            "2024-09-20:30",
            &leg(OptionSide::Call, short, short_mark, 0.3),
            &leg(OptionSide::Call, long, long_mark, 0.2),
        )
        .unwrap()
    }

    #[test]
    fn test_compare_by_roi() {
        let high = spread(300.0, 301.0, 0.60, 0.20); // roi 0.4
        let low = spread(300.0, 305.0, 1.00, 0.50); // roi 0.1

        assert_eq!(compare_by_roi(&high, &low), Ordering::Less);
        assert_eq!(compare_by_roi(&low, &high), Ordering::Greater);
        assert_eq!(compare_by_roi(&high, &high.clone()), Ordering::Equal);
    }

    #[test]
    fn test_rank_is_stable_for_ties() {
        let a = spread(300.0, 301.0, 0.60, 0.20);
        let b = spread(310.0, 311.0, 0.90, 0.50);
        let c = spread(300.0, 305.0, 1.00, 0.50);
        assert_eq!(a.roi, b.roi);

        let mut spreads = vec![c.clone(), a.clone(), b.clone()];
        rank(&mut spreads);
        assert_eq!(spreads, vec![a, b, c]);
    }

    #[test]
    fn test_filter() {
        let filter = SpreadFilter::default();
        let keep = spread(300.0, 301.0, 0.60, 0.20); // bp 100, roi 0.4
        let low_roi = spread(300.0, 305.0, 1.00, 0.50); // roi 0.1
        let too_wide = spread(300.0, 360.0, 20.0, 1.0); // bp 6000

        assert!(filter.accepts(&keep));
        assert!(!filter.accepts(&low_roi));
        assert!(!filter.accepts(&too_wide));
        assert_eq!(filter.apply(vec![low_roi, keep.clone(), too_wide]), vec![keep]);
    }
}
