//! Protocol fee minting.

use super::core::Engine;
use super::results::{EngineError, FeeMintResult};
use crate::events::{EventPayload, FeeMintedEvent};
use crate::fee::floor_shares;
use crate::shares::ShareLedgerError;
use crate::types::{Assets, Shares};

impl Engine {
    /// Accrued, unminted fee in assets. pure in (now, total managed assets).
    pub fn accrued_fee_assets(&self) -> Result<Assets, EngineError> {
        let total = self.total_managed_assets()?;
        Ok(self.fee_state.accrued_assets(total, self.current_time))
    }

    /// Accrued fee in shares at the current price, floored at the configured
    /// share scale.
    pub fn available_fee(&self) -> Result<Shares, EngineError> {
        let fee_assets = self.accrued_fee_assets()?;
        if fee_assets.is_zero() {
            return Ok(Shares::zero());
        }
        let shares = match self.shares.convert_to_shares(fee_assets, self.net_assets()?) {
            Ok(shares) => shares,
            // nothing backs the outstanding supply, so a fee share has no value either
            Err(ShareLedgerError::NoBackingAssets { .. }) => Shares::zero(),
            Err(e) => return Err(e.into()),
        };
        Ok(floor_shares(shares, self.config.vault.fee.share_scale))
    }

    /// Mint the accrued fee to the treasury. At most once per cooling period;
    /// the accrual clock restarts even when the floored fee is zero.
    pub fn mint_fee(&mut self) -> Result<FeeMintResult, EngineError> {
        self.fee_state.check_cooling(self.current_time)?;

        let fee_assets = self.accrued_fee_assets()?;
        let shares = self.available_fee()?;
        let treasury = self.config.vault.treasury;

        if !shares.is_zero() {
            self.shares.mint_shares(treasury, shares)?;
        }
        self.fee_state.record_mint(self.current_time);

        tracing::info!(treasury = treasury.0, %fee_assets, %shares, "fee minted");
        self.emit_event(EventPayload::FeeMinted(FeeMintedEvent {
            treasury,
            fee_assets,
            shares,
        }));

        Ok(FeeMintResult {
            treasury,
            fee_assets,
            shares,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::config::VaultConfig;
    use crate::engine::{Engine, EngineConfig, EngineError};
    use crate::fee::FeeError;
    use crate::pool::InMemoryYieldSource;
    use crate::types::{assets, shares, AccountId, Assets, Shares, SECONDS_PER_YEAR};

    fn engine() -> Engine {
        let mut vault = VaultConfig::default();
        vault.fee.annual_rate_bps = 100;
        vault.fee.cooling_period_secs = 86_400;
        vault.treasury = AccountId(99);
        let mut engine = Engine::new(EngineConfig::with_vault(vault)).unwrap();
        engine
            .insert_pool(Box::new(InMemoryYieldSource::new("a", Assets::zero())))
            .unwrap();
        engine.deposit(AccountId(1), assets(1_000_000)).unwrap();
        engine
    }

    #[test]
    fn fee_grows_with_time() {
        let mut engine = engine();
        assert_eq!(engine.available_fee().unwrap(), Shares::zero());

        engine.advance_secs(SECONDS_PER_YEAR as u64 / 2);
        let half = engine.available_fee().unwrap();
        engine.advance_secs(SECONDS_PER_YEAR as u64 / 2);
        let full = engine.available_fee().unwrap();

        assert!(half > Shares::zero());
        assert!(full > half);
        // 1% of 1_000_000 priced at 1 asset per share
        assert_eq!(full, shares(10_000));
    }

    #[test]
    fn mint_credits_treasury_and_restarts_clock() {
        let mut engine = engine();
        engine.advance_secs(SECONDS_PER_YEAR as u64);

        let result = engine.mint_fee().unwrap();
        assert_eq!(result.shares, shares(10_000));
        assert_eq!(engine.share_balance(AccountId(99)), shares(10_000));
        assert_eq!(engine.fee_state().last_mint, engine.time());
        assert_eq!(engine.available_fee().unwrap(), Shares::zero());
    }

    #[test]
    fn second_mint_inside_cooling_fails() {
        let mut engine = engine();
        engine.advance_secs(86_400);
        engine.mint_fee().unwrap();

        engine.advance_secs(3_600);
        assert!(matches!(
            engine.mint_fee(),
            Err(EngineError::Fee(FeeError::CoolingPeriodNotElapsed { .. }))
        ));
    }

    #[test]
    fn mint_before_first_cooling_fails() {
        let mut engine = engine();
        engine.advance_secs(10);
        assert!(engine.mint_fee().is_err());
    }
}
