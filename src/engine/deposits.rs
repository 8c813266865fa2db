//! Deposits and instant redemptions.

use super::core::Engine;
use super::results::{DepositResult, EngineError, InstantRedeemResult};
use crate::allocation::select_for_deposit;
use crate::events::{DepositEvent, EventPayload, InstantRedeemedEvent};
use crate::liquidity::{LiquidityError, LiquidityQuote};
use crate::pool::PoolError;
use crate::shares::ShareLedgerError;
use crate::types::{AccountId, Assets, Bps, Shares};

impl Engine {
    /// Deposit base asset into the active pool and mint shares at the current
    /// share price.
    pub fn deposit(&mut self, account_id: AccountId, amount: Assets) -> Result<DepositResult, EngineError> {
        self.require_operational()?;
        if !amount.is_positive() {
            return Err(EngineError::ZeroAmount);
        }

        let pools = self.registry.snapshot()?;
        let pool = select_for_deposit(&pools)?;

        // priced before the deposit lands. fails when outstanding shares have
        // no net assets behind them rather than diluting the new depositor
        let net_assets = self.net_assets()?;
        let shares_minted = self.shares.convert_to_shares(amount, net_assets)?;
        if shares_minted.is_zero() {
            return Err(EngineError::ZeroAmount);
        }

        self.shares.mint_shares(account_id, shares_minted)?;

        let deposited = match self.registry.get_mut(pool) {
            Some(entry) => entry.source_mut().deposit(amount),
            None => Err(PoolError::PoolNotFound(pool)),
        };
        if let Err(e) = deposited {
            if let Err(burn_err) = self.shares.burn_shares(account_id, shares_minted) {
                tracing::error!(account = account_id.0, error = %burn_err, "failed to unwind deposit mint");
            }
            return Err(e.into());
        }

        // a deposit landing on a drained pool makes it active again
        self.registry.set_exhausted(pool, false)?;

        self.emit_event(EventPayload::Deposit(DepositEvent {
            account_id,
            pool,
            assets: amount,
            shares_minted,
        }));

        Ok(DepositResult {
            pool,
            assets: amount,
            shares_minted,
        })
    }

    /// Quote for swapping `shares` through the instant-liquidity pool, without
    /// executing it.
    pub fn quote_instant_redeem(&self, shares: Shares) -> Result<LiquidityQuote, EngineError> {
        let liquidity = self.liquidity.as_ref().ok_or(EngineError::NoInstantLiquidity)?;
        let fair_value = self.shares.convert_to_assets(shares, self.net_assets()?)?;
        let mut quote = liquidity.quote(shares, fair_value)?;
        quote.timestamp = self.current_time.as_millis() / 1000;
        Ok(quote)
    }

    /// Skip the withdrawal queue: sell `shares` to the instant-liquidity pool.
    /// The shares move to the pool's account and the quoted assets are paid to
    /// `account_id` right away.
    pub fn instant_redeem(
        &mut self,
        account_id: AccountId,
        shares: Shares,
        min_assets: Assets,
    ) -> Result<InstantRedeemResult, EngineError> {
        self.require_operational()?;
        if shares.is_zero() {
            return Err(EngineError::ZeroAmount);
        }
        let quote = self.quote_instant_redeem(shares)?;
        self.execute_instant_quote(account_id, &quote, min_assets)
    }

    /// Execute a quote obtained earlier from [`Engine::quote_instant_redeem`].
    pub fn execute_instant_quote(
        &mut self,
        account_id: AccountId,
        quote: &LiquidityQuote,
        min_assets: Assets,
    ) -> Result<InstantRedeemResult, EngineError> {
        self.require_operational()?;
        let shares = quote.shares_in;
        if shares.is_zero() {
            return Err(EngineError::ZeroAmount);
        }
        if quote.is_expired(self.current_time.as_millis() / 1000) {
            return Err(LiquidityError::QuoteExpired.into());
        }

        let balance = self.shares.balance_of(account_id);
        if balance < shares {
            return Err(ShareLedgerError::InsufficientShares {
                account: account_id,
                requested: shares,
                balance,
            }
            .into());
        }

        let cap = quote
            .fair_value
            .mul(Bps::new(self.config.vault.max_instant_fee_bps).as_fraction());
        if quote.fee > cap {
            return Err(EngineError::InstantFeeTooHigh { fee: quote.fee, cap });
        }
        if quote.assets_out < min_assets {
            return Err(EngineError::SlippageExceeded {
                quoted: quote.assets_out,
                minimum: min_assets,
            });
        }

        let Some(liquidity) = self.liquidity.as_mut() else {
            return Err(EngineError::NoInstantLiquidity);
        };
        let pool_account = liquidity.pool_account();

        self.shares.burn_shares(account_id, shares)?;
        self.shares.mint_shares(pool_account, shares)?;

        let assets_out = match liquidity.execute(quote) {
            Ok(out) => out,
            Err(e) => {
                // hand the shares back
                let unwind = self
                    .shares
                    .burn_shares(pool_account, shares)
                    .and_then(|_| self.shares.mint_shares(account_id, shares));
                if let Err(unwind_err) = unwind {
                    tracing::error!(account = account_id.0, error = %unwind_err, "failed to unwind instant redeem");
                }
                return Err(e.into());
            }
        };

        self.credit_payout(account_id, assets_out);

        tracing::info!(account = account_id.0, %shares, %assets_out, fee = %quote.fee, "instant redeem");
        self.emit_event(EventPayload::InstantRedeemed(InstantRedeemedEvent {
            account_id,
            shares,
            assets_out,
            fee: quote.fee,
        }));

        Ok(InstantRedeemResult {
            shares,
            assets_out,
            fee: quote.fee,
        })
    }
}
