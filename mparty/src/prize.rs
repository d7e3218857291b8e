//! Prize calculator for paid events.
//!
//! Paid events always seat [`PAID_EVENT_CAPACITY`] players. The pot is split
//! into fixed percentages that add up to 100%.

use crate::errors::{MPartyError, MPartyResult};
use serde::{Deserialize, Serialize};

/// Roster size of every paid event
pub const PAID_EVENT_CAPACITY: u32 = 10;

/// Platform fee share of the pot (percent)
pub const APP_FEE_PCT: u32 = 17;
/// Host profit share of the pot (percent)
pub const HOST_PROFIT_PCT: u32 = 33;
/// First place share of the pot (percent)
pub const FIRST_PRIZE_PCT: u32 = 24;
/// Second place share of the pot (percent)
pub const SECOND_PRIZE_PCT: u32 = 16;
/// Third place share of the pot (percent)
pub const THIRD_PRIZE_PCT: u32 = 10;

/// Prize split for one paid event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrizeDistribution {
    pub entry_fee: f64,
}

impl PrizeDistribution {
    /// `entry_fee` must already be validated (see [`parse_entry_fee`])
    pub fn new(entry_fee: f64) -> Self {
        Self { entry_fee }
    }

    pub fn total_pot(&self) -> f64 {
        self.entry_fee * f64::from(PAID_EVENT_CAPACITY)
    }

    fn share(&self, pct: u32) -> f64 {
        self.total_pot() * f64::from(pct) / 100.0
    }

    pub fn app_fee(&self) -> f64 {
        self.share(APP_FEE_PCT)
    }

    pub fn host_profit(&self) -> f64 {
        self.share(HOST_PROFIT_PCT)
    }

    pub fn first_prize(&self) -> f64 {
        self.share(FIRST_PRIZE_PCT)
    }

    pub fn second_prize(&self) -> f64 {
        self.share(SECOND_PRIZE_PCT)
    }

    pub fn third_prize(&self) -> f64 {
        self.share(THIRD_PRIZE_PCT)
    }

    /// Prize for a 1-indexed placement, if that placement is paid
    pub fn prize_for_position(&self, position: usize) -> Option<f64> {
        match position {
            1 => Some(self.first_prize()),
            2 => Some(self.second_prize()),
            3 => Some(self.third_prize()),
            _ => None,
        }
    }
}

/// Parse a user-entered entry fee.
///
/// Rejects empty, non-numeric, negative and non-finite input rather than
/// coercing it to zero.
pub fn parse_entry_fee(raw: &str) -> MPartyResult<f64> {
    let trimmed = raw.trim().trim_start_matches('$').trim();
    let fee: f64 = trimmed
        .parse()
        .map_err(|_| MPartyError::InvalidInput(format!("entry fee '{raw}' is not a number")))?;

    if !fee.is_finite() {
        return Err(MPartyError::InvalidInput(format!(
            "entry fee '{raw}' is not a finite amount"
        )));
    }
    if fee < 0.0 {
        return Err(MPartyError::InvalidInput(format!(
            "entry fee '{raw}' must not be negative"
        )));
    }

    // "-0" parses to -0.0
    Ok(fee.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentages_sum_to_one_hundred() {
        assert_eq!(
            APP_FEE_PCT + HOST_PROFIT_PCT + FIRST_PRIZE_PCT + SECOND_PRIZE_PCT + THIRD_PRIZE_PCT,
            100
        );
    }

    #[test]
    fn test_ten_dollar_scenario() {
        let prize = PrizeDistribution::new(10.0);
        assert_eq!(prize.total_pot(), 100.0);
        assert_eq!(prize.app_fee(), 17.0);
        assert_eq!(prize.host_profit(), 33.0);
        assert_eq!(prize.first_prize(), 24.0);
        assert_eq!(prize.second_prize(), 16.0);
        assert_eq!(prize.third_prize(), 10.0);
    }

    #[test]
    fn test_prize_for_position() {
        let prize = PrizeDistribution::new(10.0);
        assert_eq!(prize.prize_for_position(1), Some(24.0));
        assert_eq!(prize.prize_for_position(3), Some(10.0));
        assert_eq!(prize.prize_for_position(4), None);
        assert_eq!(prize.prize_for_position(0), None);
    }

    #[test]
    fn test_parse_entry_fee_accepts_plain_and_dollar() {
        assert_eq!(parse_entry_fee("10").unwrap(), 10.0);
        assert_eq!(parse_entry_fee(" $12.50 ").unwrap(), 12.5);
        assert_eq!(parse_entry_fee("0").unwrap(), 0.0);
    }

    #[test]
    fn test_parse_entry_fee_normalizes_negative_zero() {
        let fee = parse_entry_fee("-0").unwrap();
        assert_eq!(fee, 0.0);
        assert!(fee.is_sign_positive());
    }

    #[test]
    fn test_parse_entry_fee_rejects_bad_input() {
        for raw in ["", "abc", "-5", "NaN", "inf", "10,00"] {
            let err = parse_entry_fee(raw).unwrap_err();
            assert!(
                matches!(err, MPartyError::InvalidInput(_)),
                "expected InvalidInput for {raw:?}, got {err:?}"
            );
        }
    }
}
