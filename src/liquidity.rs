// 9.3 liquidity.rs: instant-liquidity bypass. a swap pool that buys shares for base
// asset right away, so a holder can skip the withdrawal queue at a fee.
// the pricing curve belongs to the pool. the engine only asks for a quote and
// executes it. FixedFeeLiquidity is the flat-fee stand-in used by tests.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{AccountId, Assets, Bps, Shares, BPS_DENOM};

// Quote for swapping shares into base asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityQuote {
    pub shares_in: Shares,
    // fair value of shares_in at the vault's share price
    pub fair_value: Assets,
    pub fee: Assets,
    pub assets_out: Assets,
    // how long this quote is valid (in seconds)
    pub valid_for_seconds: u64,
    pub timestamp: i64,
}

impl LiquidityQuote {
    pub fn is_expired(&self, current_time_secs: i64) -> bool {
        current_time_secs > self.timestamp + self.valid_for_seconds as i64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LiquidityError {
    #[error("Insufficient instant liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity { requested: Assets, available: Assets },

    #[error("Instant liquidity pool inactive")]
    PoolInactive,

    #[error("Quote expired")]
    QuoteExpired,
}

pub trait InstantLiquidity {
    fn name(&self) -> &str;

    // account that holds the shares the pool buys
    fn pool_account(&self) -> AccountId;

    fn quote(&self, shares_in: Shares, fair_value: Assets) -> Result<LiquidityQuote, LiquidityError>;

    // pays out quote.assets_out from the pool's reserve
    fn execute(&mut self, quote: &LiquidityQuote) -> Result<Assets, LiquidityError>;

    fn available_liquidity(&self) -> Assets;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedFeeLiquidity {
    name: String,
    account: AccountId,
    reserve: Assets,
    fee: Bps,
    active: bool,
    // shares bought so far
    shares_held: Shares,
}

impl FixedFeeLiquidity {
    pub fn new(account: AccountId, reserve: Assets, fee: Bps) -> Self {
        Self {
            name: "fixed-fee".to_string(),
            account,
            reserve,
            fee,
            active: true,
            shares_held: Shares::zero(),
        }
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn reserve(&self) -> Assets {
        self.reserve
    }

    pub fn shares_held(&self) -> Shares {
        self.shares_held
    }
}

impl InstantLiquidity for FixedFeeLiquidity {
    fn name(&self) -> &str {
        &self.name
    }

    fn pool_account(&self) -> AccountId {
        self.account
    }

    fn quote(&self, shares_in: Shares, fair_value: Assets) -> Result<LiquidityQuote, LiquidityError> {
        if !self.active {
            return Err(LiquidityError::PoolInactive);
        }

        let fee = fair_value.mul(Decimal::from(self.fee.value()) / Decimal::from(BPS_DENOM));
        let assets_out = fair_value.saturating_sub(fee);
        if assets_out > self.reserve {
            return Err(LiquidityError::InsufficientLiquidity {
                requested: assets_out,
                available: self.reserve,
            });
        }

        Ok(LiquidityQuote {
            shares_in,
            fair_value,
            fee,
            assets_out,
            valid_for_seconds: 30,
            timestamp: 0, // caller should set
        })
    }

    fn execute(&mut self, quote: &LiquidityQuote) -> Result<Assets, LiquidityError> {
        if !self.active {
            return Err(LiquidityError::PoolInactive);
        }
        if quote.assets_out > self.reserve {
            return Err(LiquidityError::InsufficientLiquidity {
                requested: quote.assets_out,
                available: self.reserve,
            });
        }
        self.reserve = self.reserve.saturating_sub(quote.assets_out);
        self.shares_held = self.shares_held.add(quote.shares_in);
        Ok(quote.assets_out)
    }

    fn available_liquidity(&self) -> Assets {
        self.reserve
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{assets, shares};

    fn pool() -> FixedFeeLiquidity {
        FixedFeeLiquidity::new(AccountId(900), assets(1_000), Bps::new(30))
    }

    #[test]
    fn quote_charges_fee() {
        let quote = pool().quote(shares(100), assets(100)).unwrap();
        assert_eq!(quote.fee, Assets::new(Decimal::new(3, 1)));
        assert_eq!(quote.assets_out, Assets::new(Decimal::new(997, 1)));
    }

    #[test]
    fn execute_moves_reserve() {
        let mut pool = pool();
        let quote = pool.quote(shares(100), assets(100)).unwrap();
        let out = pool.execute(&quote).unwrap();

        assert_eq!(pool.reserve(), assets(1_000).saturating_sub(out));
        assert_eq!(pool.shares_held(), shares(100));
    }

    #[test]
    fn quote_beyond_reserve_fails() {
        let result = pool().quote(shares(5_000), assets(5_000));
        assert!(matches!(result, Err(LiquidityError::InsufficientLiquidity { .. })));
    }

    #[test]
    fn inactive_pool_refuses() {
        let mut pool = pool();
        pool.set_active(false);
        assert_eq!(pool.quote(shares(1), assets(1)), Err(LiquidityError::PoolInactive));
    }

    #[test]
    fn quote_expiry() {
        let mut quote = pool().quote(shares(1), assets(1)).unwrap();
        quote.timestamp = 1000;
        assert!(!quote.is_expired(1030));
        assert!(quote.is_expired(1031));
    }
}
