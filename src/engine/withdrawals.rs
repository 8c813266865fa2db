//! Redemption requests and claims.

use super::core::Engine;
use super::results::{ClaimResult, EngineError, RedeemResult};
use crate::events::{ClaimedEvent, EventPayload, WithdrawRejectedEvent, WithdrawRequestedEvent};
use crate::ledger::{LedgerError, OrderPhase};
use crate::types::{AccountId, Assets, Shares};

impl Engine {
    /// Queue a redemption of `amount` base asset. Burns the equivalent shares.
    pub fn request_withdraw(&mut self, account_id: AccountId, amount: Assets) -> Result<RedeemResult, EngineError> {
        if !amount.is_positive() {
            return Err(EngineError::ZeroAmount);
        }
        let shares = self.shares.convert_to_shares(amount, self.net_assets()?)?;
        self.queue_redemption(account_id, shares, amount)
    }

    /// Queue a redemption of `shares`, valued at the current share price.
    pub fn redeem(&mut self, account_id: AccountId, shares: Shares) -> Result<RedeemResult, EngineError> {
        if shares.is_zero() {
            return Err(EngineError::ZeroAmount);
        }
        let amount = self.shares.convert_to_assets(shares, self.net_assets()?)?;
        self.queue_redemption(account_id, shares, amount)
    }

    // capacity is checked before the burn so a rejected request costs nothing
    fn queue_redemption(
        &mut self,
        account_id: AccountId,
        shares: Shares,
        amount: Assets,
    ) -> Result<RedeemResult, EngineError> {
        if let Err(e) = self.ledger.check_request(account_id, amount) {
            if matches!(e, LedgerError::CapacityExceeded { .. }) {
                self.emit_event(EventPayload::WithdrawRejected(WithdrawRejectedEvent {
                    account_id,
                    shares,
                    reason: e.to_string(),
                }));
            }
            return Err(e.into());
        }

        self.shares.burn_shares(account_id, shares)?;
        let order_total = self.ledger.request(account_id, amount)?;

        self.emit_event(EventPayload::WithdrawRequested(WithdrawRequestedEvent {
            account_id,
            shares_burned: shares,
            assets: amount,
            order_total,
        }));

        Ok(RedeemResult {
            shares_burned: shares,
            assets: amount,
            order_total,
        })
    }

    /// Claimable amount for `account_id`.
    pub fn available_to_claim(&self, account_id: AccountId) -> Assets {
        self.ledger.order_amount(account_id, OrderPhase::Available)
    }

    /// Pay `amount` of a settled order out of custody to `recipient`.
    pub fn claim(
        &mut self,
        account_id: AccountId,
        amount: Assets,
        recipient: AccountId,
    ) -> Result<ClaimResult, EngineError> {
        self.require_operational()?;
        if !amount.is_positive() {
            return Err(EngineError::ZeroAmount);
        }

        let remaining = self.ledger.claim(account_id, amount)?;
        self.custody = self.custody.saturating_sub(amount);
        self.credit_payout(recipient, amount);

        self.emit_event(EventPayload::Claimed(ClaimedEvent {
            account_id,
            recipient,
            amount,
            remaining,
        }));

        Ok(ClaimResult {
            recipient,
            amount,
            remaining,
        })
    }
}
