// 2.0 pool.rs: sub-pool registry. an ordered list of yield sources ("depositors").
// 2.1 YieldSource is the external position. InMemoryYieldSource is the test double.
// insertion order is the registry order and never changes.

use serde::{Deserialize, Serialize};

use crate::types::{Assets, PoolId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("Registry is full ({max} pools)")]
    RegistryFull { max: usize },

    #[error("Pool {0} not found")]
    PoolNotFound(PoolId),

    #[error("{pool} balance unavailable: {reason}")]
    BalanceUnavailable { pool: PoolId, reason: String },

    #[error("{pool} rejected deposit of {amount}: {reason}")]
    DepositRejected { pool: PoolId, amount: Assets, reason: String },

    #[error("{pool} withdraw of {requested} failed, {available} available")]
    InsufficientLiquidity {
        pool: PoolId,
        requested: Assets,
        available: Assets,
    },

    #[error("{pool} withdraw failed: {reason}")]
    WithdrawFailed { pool: PoolId, reason: String },
}

// External yield-bearing position. every call is synchronous but may fail,
// and deposit/withdraw have side effects outside the engine.
pub trait YieldSource {
    fn name(&self) -> &str;

    // externally reported value of the position
    fn balance(&self) -> Result<Assets, PoolError>;

    fn deposit(&mut self, amount: Assets) -> Result<(), PoolError>;

    // returns what was actually released. may revert on thin internal liquidity.
    fn withdraw(&mut self, amount: Assets) -> Result<Assets, PoolError>;
}

/// Registry entry. `exhausted` is set when a cascade drains the pool to zero and
/// cleared when a deposit lands on it again.
pub struct PoolEntry {
    pub id: PoolId,
    pub exhausted: bool,
    source: Box<dyn YieldSource + Send>,
}

impl std::fmt::Debug for PoolEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolEntry")
            .field("id", &self.id)
            .field("name", &self.source.name())
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

impl PoolEntry {
    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn source(&self) -> &dyn YieldSource {
        self.source.as_ref()
    }

    pub fn source_mut(&mut self) -> &mut (dyn YieldSource + Send) {
        self.source.as_mut()
    }
}

/// Point-in-time view of one pool, fed to the allocation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub id: PoolId,
    pub balance: Assets,
    pub exhausted: bool,
}

#[derive(Debug)]
pub struct PoolRegistry {
    pools: Vec<PoolEntry>,
    max_pools: usize,
    // where withdrawal cascades start. independent of the deposit target.
    drain_first: PoolId,
}

impl PoolRegistry {
    pub fn new(max_pools: usize) -> Self {
        Self {
            pools: Vec::new(),
            max_pools,
            drain_first: PoolId(0),
        }
    }

    /// Append a pool at the next ordinal index.
    pub fn insert(&mut self, source: Box<dyn YieldSource + Send>) -> Result<PoolId, PoolError> {
        if self.pools.len() >= self.max_pools {
            return Err(PoolError::RegistryFull { max: self.max_pools });
        }
        let id = PoolId(self.pools.len() as u32);
        self.pools.push(PoolEntry {
            id,
            exhausted: false,
            source,
        });
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn max_pools(&self) -> usize {
        self.max_pools
    }

    pub fn get(&self, id: PoolId) -> Option<&PoolEntry> {
        self.pools.get(id.index())
    }

    pub fn get_mut(&mut self, id: PoolId) -> Option<&mut PoolEntry> {
        self.pools.get_mut(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &PoolEntry> {
        self.pools.iter()
    }

    pub fn drain_first(&self) -> PoolId {
        self.drain_first
    }

    pub fn set_drain_first(&mut self, id: PoolId) -> Result<(), PoolError> {
        if id.index() >= self.pools.len() {
            return Err(PoolError::PoolNotFound(id));
        }
        self.drain_first = id;
        Ok(())
    }

    pub fn set_exhausted(&mut self, id: PoolId, exhausted: bool) -> Result<(), PoolError> {
        let entry = self.get_mut(id).ok_or(PoolError::PoolNotFound(id))?;
        entry.exhausted = exhausted;
        Ok(())
    }

    pub fn balance_of(&self, id: PoolId) -> Result<Assets, PoolError> {
        self.get(id)
            .ok_or(PoolError::PoolNotFound(id))?
            .source
            .balance()
    }

    /// Sum of every pool's externally reported balance. the first failing read
    /// fails the whole sum.
    pub fn total_managed_assets(&self) -> Result<Assets, PoolError> {
        let mut total = Assets::zero();
        for entry in &self.pools {
            total = total.add(entry.source.balance()?);
        }
        Ok(total)
    }

    /// Fresh read of every pool. never cached past the caller's operation.
    pub fn snapshot(&self) -> Result<Vec<PoolSnapshot>, PoolError> {
        self.pools
            .iter()
            .map(|entry| {
                Ok(PoolSnapshot {
                    id: entry.id,
                    balance: entry.source.balance()?,
                    exhausted: entry.exhausted,
                })
            })
            .collect()
    }
}

/// In-memory yield source for tests and simulation. failures can be injected
/// per operation to exercise the rollback path.
#[derive(Debug, Clone)]
pub struct InMemoryYieldSource {
    id: PoolId,
    name: String,
    balance: Assets,
    fail_withdraw: bool,
    fail_deposit: bool,
    fail_balance: bool,
    // withdrawals release at most this much and still succeed
    release_cap: Option<Assets>,
}

impl InMemoryYieldSource {
    pub fn new(name: impl Into<String>, balance: Assets) -> Self {
        Self {
            id: PoolId(u32::MAX),
            name: name.into(),
            balance,
            fail_withdraw: false,
            fail_deposit: false,
            fail_balance: false,
            release_cap: None,
        }
    }

    // only used to label errors
    pub fn with_id(mut self, id: PoolId) -> Self {
        self.id = id;
        self
    }

    pub fn failing_withdraw(mut self) -> Self {
        self.fail_withdraw = true;
        self
    }

    pub fn set_fail_withdraw(&mut self, fail: bool) {
        self.fail_withdraw = fail;
    }

    pub fn set_fail_deposit(&mut self, fail: bool) {
        self.fail_deposit = fail;
    }

    pub fn set_fail_balance(&mut self, fail: bool) {
        self.fail_balance = fail;
    }

    // simulated thin exit liquidity: withdraw reports success but releases short
    pub fn set_release_cap(&mut self, cap: Option<Assets>) {
        self.release_cap = cap;
    }

    // simulated slashing or an external rebalance
    pub fn set_balance(&mut self, balance: Assets) {
        self.balance = balance;
    }

    // simulated reward accrual
    pub fn accrue(&mut self, yield_amount: Assets) {
        self.balance = self.balance.add(yield_amount);
    }
}

impl YieldSource for InMemoryYieldSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn balance(&self) -> Result<Assets, PoolError> {
        if self.fail_balance {
            return Err(PoolError::BalanceUnavailable {
                pool: self.id,
                reason: "source offline".to_string(),
            });
        }
        Ok(self.balance)
    }

    fn deposit(&mut self, amount: Assets) -> Result<(), PoolError> {
        if self.fail_deposit {
            return Err(PoolError::DepositRejected {
                pool: self.id,
                amount,
                reason: "source offline".to_string(),
            });
        }
        self.balance = self.balance.add(amount);
        Ok(())
    }

    fn withdraw(&mut self, amount: Assets) -> Result<Assets, PoolError> {
        if self.fail_withdraw {
            return Err(PoolError::WithdrawFailed {
                pool: self.id,
                reason: "withdraw reverted".to_string(),
            });
        }
        if amount > self.balance {
            return Err(PoolError::InsufficientLiquidity {
                pool: self.id,
                requested: amount,
                available: self.balance,
            });
        }
        let released = match self.release_cap {
            Some(cap) => amount.min(cap),
            None => amount,
        };
        self.balance = self.balance.saturating_sub(released);
        Ok(released)
    }
}

/// Handle that lets a test keep poking a source after the registry owns it.
#[derive(Debug, Clone)]
pub struct SharedYieldSource {
    name: String,
    inner: std::sync::Arc<std::sync::Mutex<InMemoryYieldSource>>,
}

impl SharedYieldSource {
    pub fn new(source: InMemoryYieldSource) -> Self {
        Self {
            name: source.name.clone(),
            inner: std::sync::Arc::new(std::sync::Mutex::new(source)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut InMemoryYieldSource) -> R) -> R {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

impl YieldSource for SharedYieldSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn balance(&self) -> Result<Assets, PoolError> {
        self.with(|s| s.balance())
    }

    fn deposit(&mut self, amount: Assets) -> Result<(), PoolError> {
        self.with(|s| s.deposit(amount))
    }

    fn withdraw(&mut self, amount: Assets) -> Result<Assets, PoolError> {
        self.with(|s| s.withdraw(amount))
    }
}
