// 8.0 engine/core.rs: main engine. holds the pool registry, the order ledger, fee
// state and the settlement clock. collaborators (share ledger, instant liquidity)
// are boxed trait objects owned by the engine.

use super::config::EngineConfig;
use super::results::EngineError;
use crate::events::{Event, EventId, EventPayload, ModeChangedEvent, PoolInsertedEvent};
use crate::fee::FeeAccrualState;
use crate::ledger::{OrderLedger, OrderPhase};
use crate::liquidity::InstantLiquidity;
use crate::pool::{PoolRegistry, PoolSnapshot, YieldSource};
use crate::shares::{InMemoryShareLedger, ShareLedger};
use crate::types::{AccountId, Assets, PoolId, Shares, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Operational mode flag. Deposits and claims need `Operational`; the emergency
/// clear needs anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationalMode {
    Operational,
    Paused,
}

impl OperationalMode {
    pub fn is_operational(&self) -> bool {
        matches!(self, OperationalMode::Operational)
    }
}

/** 8.1: main engine struct. all state lives here */
pub struct Engine {
    pub(super) config: EngineConfig,
    pub(super) registry: PoolRegistry,
    pub(super) ledger: OrderLedger,
    pub(super) shares: Box<dyn ShareLedger + Send>,
    pub(super) liquidity: Option<Box<dyn InstantLiquidity + Send>>,
    pub(super) fee_state: FeeAccrualState,
    pub(super) mode: OperationalMode,
    // base asset held by the engine: pulled for Pending/Available orders
    pub(super) custody: Assets,
    // assets transferred out to recipients by claims and instant redemptions
    pub(super) payouts: HashMap<AccountId, Assets>,
    pub(super) next_tick: Timestamp,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) current_time: Timestamp,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("ledger", &self.ledger)
            .field("mode", &self.mode)
            .field("custody", &self.custody)
            .field("next_tick", &self.next_tick)
            .field("current_time", &self.current_time)
            .finish()
    }
}

impl Engine {
    /// Engine with an in-memory share ledger, clock at zero.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_share_ledger(config, Box::new(InMemoryShareLedger::new()))
    }

    pub fn with_share_ledger(
        config: EngineConfig,
        shares: Box<dyn ShareLedger + Send>,
    ) -> Result<Self, EngineError> {
        Self::starting_at(config, shares, Timestamp::from_millis(0))
    }

    /// The first settlement window closes one interval after `start`.
    pub fn starting_at(
        config: EngineConfig,
        shares: Box<dyn ShareLedger + Send>,
        start: Timestamp,
    ) -> Result<Self, EngineError> {
        config.vault.validate()?;
        let vault = &config.vault;
        Ok(Self {
            registry: PoolRegistry::new(vault.max_pools),
            ledger: OrderLedger::new(vault.max_orders),
            shares,
            liquidity: None,
            fee_state: FeeAccrualState::new(&vault.fee, start),
            mode: OperationalMode::Operational,
            custody: Assets::zero(),
            payouts: HashMap::new(),
            next_tick: start.plus_secs(vault.settlement_interval_secs),
            events: Vec::new(),
            next_event_id: 1,
            current_time: start,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = Timestamp::from_millis(self.current_time.as_millis() + millis);
    }

    pub fn advance_secs(&mut self, secs: u64) {
        self.current_time = self.current_time.plus_secs(secs);
    }

    // admin surface

    /// Append a sub-pool to the registry.
    pub fn insert_pool(&mut self, source: Box<dyn YieldSource + Send>) -> Result<PoolId, EngineError> {
        let name = source.name().to_string();
        let pool = self.registry.insert(source)?;
        self.emit_event(EventPayload::PoolInserted(PoolInsertedEvent { pool, name }));
        Ok(pool)
    }

    pub fn set_drain_first(&mut self, pool: PoolId) -> Result<(), EngineError> {
        self.registry.set_drain_first(pool)?;
        Ok(())
    }

    pub fn set_mode(&mut self, mode: OperationalMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        tracing::info!(operational = mode.is_operational(), "vault mode changed");
        self.emit_event(EventPayload::ModeChanged(ModeChangedEvent {
            operational: mode.is_operational(),
        }));
    }

    pub fn mode(&self) -> OperationalMode {
        self.mode
    }

    pub fn attach_instant_liquidity(&mut self, pool: Box<dyn InstantLiquidity + Send>) {
        self.liquidity = Some(pool);
    }

    pub fn instant_liquidity(&self) -> Option<&(dyn InstantLiquidity + Send)> {
        self.liquidity.as_deref()
    }

    pub(super) fn require_operational(&self) -> Result<(), EngineError> {
        if !self.mode.is_operational() {
            return Err(EngineError::NotOperational);
        }
        Ok(())
    }

    // value queries

    /// Sum of every sub-pool's reported balance. fails if any pool read fails.
    pub fn total_managed_assets(&self) -> Result<Assets, EngineError> {
        Ok(self.registry.total_managed_assets()?)
    }

    /// Pools plus engine custody.
    pub fn vault_assets(&self) -> Result<Assets, EngineError> {
        Ok(self.total_managed_assets()?.add(self.custody))
    }

    /// Value backing outstanding shares: vault assets minus queued redemptions.
    pub fn net_assets(&self) -> Result<Assets, EngineError> {
        Ok(self
            .vault_assets()?
            .saturating_sub(self.ledger.outstanding_liability()))
    }

    pub fn outstanding_liability(&self) -> Assets {
        self.ledger.outstanding_liability()
    }

    pub fn custody(&self) -> Assets {
        self.custody
    }

    pub fn payouts(&self, recipient: AccountId) -> Assets {
        self.payouts.get(&recipient).copied().unwrap_or_default()
    }

    pub fn pool_snapshots(&self) -> Result<Vec<PoolSnapshot>, EngineError> {
        Ok(self.registry.snapshot()?)
    }

    pub fn registry(&self) -> &PoolRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &OrderLedger {
        &self.ledger
    }

    pub fn order_amount(&self, account: AccountId, phase: OrderPhase) -> Assets {
        self.ledger.order_amount(account, phase)
    }

    pub fn total_requested_orders(&self) -> usize {
        self.ledger.total_requested_orders()
    }

    pub fn total_pending_orders(&self) -> usize {
        self.ledger.total_pending_orders()
    }

    pub fn next_tick(&self) -> Timestamp {
        self.next_tick
    }

    pub fn fee_state(&self) -> &FeeAccrualState {
        &self.fee_state
    }

    pub fn share_balance(&self, account: AccountId) -> Shares {
        self.shares.balance_of(account)
    }

    pub fn total_shares(&self) -> Shares {
        self.shares.total_shares()
    }

    /// Current asset value of `account`'s shares.
    pub fn shares_value(&self, account: AccountId) -> Result<Assets, EngineError> {
        let balance = self.shares.balance_of(account);
        Ok(self.shares.convert_to_assets(balance, self.net_assets()?)?)
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub(super) fn credit_payout(&mut self, recipient: AccountId, amount: Assets) {
        let paid = self.payouts.entry(recipient).or_default();
        *paid = paid.add(amount);
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;

        if self.config.verbose {
            tracing::debug!(event_id = event.id.0, payload = ?event.payload, "event");
        }

        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }
}
