// 13.0 sync.rs: one mutex around the whole engine. deposits, requests, claims,
// ticks, fee mints and emergency clears all take the same lock, so a tick is a
// single atomic unit against every other entry point.

use std::ops::Range;
use std::sync::{Arc, Mutex};

use crate::checkpoint::VaultSnapshot;
use crate::engine::{
    ClaimResult, DepositResult, EmergencyReport, Engine, EngineError, FeeMintResult, RedeemResult,
    TickReport,
};
use crate::types::{AccountId, Assets, Shares};

#[derive(Debug, Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<Engine>>,
}

impl SharedEngine {
    pub fn new(engine: Engine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Run `f` under the lock. A poisoned lock is reported, never recovered.
    pub fn with<R>(&self, f: impl FnOnce(&mut Engine) -> Result<R, EngineError>) -> Result<R, EngineError> {
        let mut guard = self.inner.lock().map_err(|_| EngineError::LockPoisoned)?;
        f(&mut *guard)
    }

    pub fn deposit(&self, account_id: AccountId, amount: Assets) -> Result<DepositResult, EngineError> {
        self.with(|engine| engine.deposit(account_id, amount))
    }

    pub fn request_withdraw(&self, account_id: AccountId, amount: Assets) -> Result<RedeemResult, EngineError> {
        self.with(|engine| engine.request_withdraw(account_id, amount))
    }

    pub fn redeem(&self, account_id: AccountId, shares: Shares) -> Result<RedeemResult, EngineError> {
        self.with(|engine| engine.redeem(account_id, shares))
    }

    pub fn claim(
        &self,
        account_id: AccountId,
        amount: Assets,
        recipient: AccountId,
    ) -> Result<ClaimResult, EngineError> {
        self.with(|engine| engine.claim(account_id, amount, recipient))
    }

    pub fn tick(&self) -> Result<TickReport, EngineError> {
        self.with(|engine| engine.tick())
    }

    pub fn mint_fee(&self) -> Result<FeeMintResult, EngineError> {
        self.with(|engine| engine.mint_fee())
    }

    pub fn emergency_clear_requested(&self, range: Range<usize>) -> Result<EmergencyReport, EngineError> {
        self.with(|engine| engine.emergency_clear_requested(range))
    }

    pub fn snapshot(&self) -> Result<VaultSnapshot, EngineError> {
        self.with(|engine| Ok(engine.snapshot()))
    }
}
