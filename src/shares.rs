// 4.0 shares.rs: share ledger collaborator. mint/burn bookkeeping lives outside the
// settlement core. the engine only needs supply, mint, burn and the two conversions.
// conversions price against the vault's net assets, which the engine passes in.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{AccountId, Assets, Shares};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShareLedgerError {
    #[error("Account {account:?} holds {balance} shares, {requested} requested")]
    InsufficientShares {
        account: AccountId,
        requested: Shares,
        balance: Shares,
    },

    #[error("Share amount must be greater than zero")]
    ZeroShares,

    #[error("{supply} shares outstanding but no net assets back them")]
    NoBackingAssets { supply: Shares },

    #[error("Share conversion overflowed")]
    Overflow,
}

// a × b / c. divides first when the product is out of Decimal range.
fn mul_div(a: Decimal, b: Decimal, c: Decimal) -> Result<Decimal, ShareLedgerError> {
    match a.checked_mul(b) {
        Some(product) => product.checked_div(c),
        None => a.checked_div(c).and_then(|ratio| ratio.checked_mul(b)),
    }
    .ok_or(ShareLedgerError::Overflow)
}

pub trait ShareLedger {
    fn total_shares(&self) -> Shares;

    fn balance_of(&self, account: AccountId) -> Shares;

    fn mint_shares(&mut self, to: AccountId, amount: Shares) -> Result<(), ShareLedgerError>;

    fn burn_shares(&mut self, from: AccountId, amount: Shares) -> Result<(), ShareLedgerError>;

    /// assets × supply / net_assets. 1:1 only while no shares exist; shares
    /// outstanding against zero net assets cannot be priced.
    fn convert_to_shares(&self, assets: Assets, net_assets: Assets) -> Result<Shares, ShareLedgerError> {
        let supply = self.total_shares();
        if supply.is_zero() {
            return Ok(Shares::new(assets.value()));
        }
        if !net_assets.is_positive() {
            return Err(ShareLedgerError::NoBackingAssets { supply });
        }
        mul_div(assets.value(), supply.value(), net_assets.value()).map(Shares::new)
    }

    /// shares × net_assets / supply. 1:1 while no shares exist.
    fn convert_to_assets(&self, shares: Shares, net_assets: Assets) -> Result<Assets, ShareLedgerError> {
        let supply = self.total_shares();
        if supply.is_zero() {
            return Ok(Assets::new(shares.value()));
        }
        mul_div(shares.value(), net_assets.value(), supply.value()).map(Assets::new)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryShareLedger {
    balances: HashMap<AccountId, Shares>,
    total_supply: Shares,
}

impl InMemoryShareLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ShareLedger for InMemoryShareLedger {
    fn total_shares(&self) -> Shares {
        self.total_supply
    }

    fn balance_of(&self, account: AccountId) -> Shares {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    fn mint_shares(&mut self, to: AccountId, amount: Shares) -> Result<(), ShareLedgerError> {
        if !amount.is_positive() {
            return Err(ShareLedgerError::ZeroShares);
        }
        let balance = self.balances.entry(to).or_default();
        *balance = balance.add(amount);
        self.total_supply = self.total_supply.add(amount);
        Ok(())
    }

    fn burn_shares(&mut self, from: AccountId, amount: Shares) -> Result<(), ShareLedgerError> {
        if !amount.is_positive() {
            return Err(ShareLedgerError::ZeroShares);
        }
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(ShareLedgerError::InsufficientShares {
                account: from,
                requested: amount,
                balance,
            });
        }
        let remaining = balance.saturating_sub(amount);
        if remaining.is_zero() {
            self.balances.remove(&from);
        } else {
            self.balances.insert(from, remaining);
        }
        self.total_supply = self.total_supply.saturating_sub(amount);
        Ok(())
    }
}
