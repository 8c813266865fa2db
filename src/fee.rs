// 5.0: protocol fee. accrues linearly on managed assets at an annual bps rate and is
// minted as new shares to the treasury on an explicit, throttled call.
// 5.0 has the params/state structs. 5.1+ the accrual math.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::types::{Assets, Bps, Shares, Timestamp, BPS_DENOM};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeParams {
    pub annual_rate_bps: u32,
    pub cooling_period_secs: u64,
    // decimal places kept on minted fee shares. the rest is floored away.
    pub share_scale: u32,
}

impl Default for FeeParams {
    fn default() -> Self {
        Self {
            annual_rate_bps: 100,              // 1% a year
            cooling_period_secs: 24 * 60 * 60, // once a day
            share_scale: 9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeeError {
    #[error("Cooling period not elapsed: {elapsed_secs}s of {required_secs}s")]
    CoolingPeriodNotElapsed { elapsed_secs: Decimal, required_secs: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeAccrualState {
    pub last_mint: Timestamp,
    pub annual_rate_bps: Bps,
    pub cooling_period_secs: u64,
}

impl FeeAccrualState {
    pub fn new(params: &FeeParams, start: Timestamp) -> Self {
        Self {
            last_mint: start,
            annual_rate_bps: Bps::new(params.annual_rate_bps),
            cooling_period_secs: params.cooling_period_secs,
        }
    }

    // 5.1: fee in assets since the last mint. pure in (now, total managed).
    pub fn accrued_assets(&self, total_managed: Assets, now: Timestamp) -> Assets {
        calculate_accrued_fee(
            total_managed,
            self.annual_rate_bps,
            now.elapsed_years_since(&self.last_mint),
        )
    }

    // 5.2: cooling gate. the second mint inside one window fails.
    pub fn check_cooling(&self, now: Timestamp) -> Result<(), FeeError> {
        let elapsed = now.elapsed_secs_since(&self.last_mint);
        if elapsed < Decimal::from(self.cooling_period_secs) {
            return Err(FeeError::CoolingPeriodNotElapsed {
                elapsed_secs: elapsed,
                required_secs: self.cooling_period_secs,
            });
        }
        Ok(())
    }

    pub fn record_mint(&mut self, now: Timestamp) {
        self.last_mint = now;
    }
}

// 5.3: total × rate × years. never negative.
pub fn calculate_accrued_fee(total_managed: Assets, rate: Bps, years_elapsed: Decimal) -> Assets {
    if !total_managed.is_positive() || years_elapsed <= Decimal::ZERO {
        return Assets::zero();
    }
    let rate = Decimal::from(rate.value()) / Decimal::from(BPS_DENOM);
    total_managed.mul(rate * years_elapsed)
}

// 5.4: fee shares are floored at share_scale places so minting never dilutes
// holders by more than the accrued amount.
pub fn floor_shares(shares: Shares, scale: u32) -> Shares {
    Shares::new(
        shares
            .value()
            .round_dp_with_strategy(scale, RoundingStrategy::ToZero),
    )
}
