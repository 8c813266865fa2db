//! Settlement ticks: phase transitions and the withdrawal cascade.
//!
//! A tick works on a staged copy of the order ledger. The cascade is planned
//! read-only against fresh pool balances, executed leg by leg, and the staged
//! ledger only replaces the live one once every pull has landed in custody.

use super::core::Engine;
use super::results::{EngineError, TickReport};
use crate::allocation::{select_for_withdraw, CascadePlan};
use crate::events::{
    CascadeRolledBackEvent, EventPayload, PoolDrawnEvent, PoolExhaustedEvent, TickFailedEvent,
    TickSettledEvent,
};
use crate::pool::PoolError;
use crate::types::{Assets, PoolId, Timestamp};

impl Engine {
    /// Windows due at the current time, capped per call.
    pub fn due_windows(&self) -> u32 {
        if self.current_time < self.next_tick {
            return 0;
        }
        let interval_ms = self.interval_millis();
        let behind = (self.current_time.as_millis() - self.next_tick.as_millis()) / interval_ms;
        let due = u32::try_from(behind.saturating_add(1)).unwrap_or(u32::MAX);
        due.min(self.config.vault.max_windows_per_tick)
    }

    fn interval_millis(&self) -> i64 {
        (self.config.vault.settlement_interval_secs as i64).saturating_mul(1000)
    }

    /// Run every due settlement window, Step B (Pending→Available) before
    /// Step A (Requested→Pending) in each. all-or-nothing: on error the ledger,
    /// counters, custody and schedule are exactly as before the call.
    pub fn tick(&mut self) -> Result<TickReport, EngineError> {
        if self.current_time < self.next_tick {
            return Err(EngineError::TooEarly {
                now: self.current_time,
                next_tick: self.next_tick,
            });
        }

        let windows = self.due_windows();
        let mut staged = self.ledger.clone();
        let mut to_pending = 0;
        let mut to_available = 0;
        let mut aggregate = Assets::zero();

        for _ in 0..windows {
            let released = staged.advance_pending();
            let secured = staged.advance_requested();
            to_available += released.orders;
            to_pending += secured.orders;
            aggregate = aggregate.add(secured.amount);
        }

        let plan = match self.plan_cascade(aggregate) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(requested = %aggregate, error = %e, "settlement tick failed at planning");
                self.emit_event(EventPayload::TickFailed(TickFailedEvent {
                    requested_total: aggregate,
                    reason: e.to_string(),
                }));
                return Err(e);
            }
        };

        let pulled = match self.execute_cascade(&plan) {
            Ok(pulled) => pulled,
            Err(e) => {
                tracing::warn!(requested = %aggregate, error = %e, "settlement tick failed during cascade");
                self.emit_event(EventPayload::TickFailed(TickFailedEvent {
                    requested_total: aggregate,
                    reason: e.to_string(),
                }));
                return Err(e);
            }
        };

        // commit
        self.ledger = staged;
        self.custody = self.custody.add(pulled);

        for leg in plan.legs.iter().filter(|leg| leg.amount.is_positive()) {
            self.emit_event(EventPayload::PoolDrawn(PoolDrawnEvent {
                pool: leg.pool,
                amount: leg.amount,
            }));
        }
        let drained: Vec<PoolId> = plan.drained_pools().collect();
        for pool in drained {
            let already = self.registry.get(pool).is_some_and(|entry| entry.exhausted);
            if already {
                continue;
            }
            self.registry.set_exhausted(pool, true)?;
            self.emit_event(EventPayload::PoolExhausted(PoolExhaustedEvent { pool }));
        }

        let advance_ms = self.interval_millis().saturating_mul(i64::from(windows));
        self.next_tick = Timestamp::from_millis(self.next_tick.as_millis().saturating_add(advance_ms));

        tracing::info!(
            windows,
            to_pending,
            to_available,
            pulled = %pulled,
            next_tick = %self.next_tick,
            "settlement tick"
        );
        self.emit_event(EventPayload::TickSettled(TickSettledEvent {
            windows,
            to_pending,
            to_available,
            pulled,
            next_tick: self.next_tick,
        }));

        Ok(TickReport {
            windows,
            to_pending,
            to_available,
            pulled,
            cascade: plan,
            next_tick: self.next_tick,
        })
    }

    /// Read-only cascade plan for `amount` against fresh balances.
    pub fn plan_cascade(&self, amount: Assets) -> Result<CascadePlan, EngineError> {
        if amount.is_zero() {
            return Ok(CascadePlan::default());
        }
        let pools = self.registry.snapshot()?;
        Ok(select_for_withdraw(&pools, self.registry.drain_first(), amount)?)
    }

    /// Pull every leg and return what was released. If any pull fails or
    /// releases short, the legs already executed are deposited back in reverse
    /// order before the error returns.
    fn execute_cascade(&mut self, plan: &CascadePlan) -> Result<Assets, EngineError> {
        let mut executed: Vec<(PoolId, Assets)> = Vec::with_capacity(plan.legs.len());

        for leg in &plan.legs {
            if leg.amount.is_zero() {
                continue;
            }
            let entry = self
                .registry
                .get_mut(leg.pool)
                .ok_or(PoolError::PoolNotFound(leg.pool))?;

            let failure = match entry.source_mut().withdraw(leg.amount) {
                Ok(released) if released >= leg.amount => {
                    executed.push((leg.pool, released));
                    continue;
                }
                Ok(released) => {
                    // short release still moved funds out of the pool
                    if released.is_positive() {
                        executed.push((leg.pool, released));
                    }
                    PoolError::InsufficientLiquidity {
                        pool: leg.pool,
                        requested: leg.amount,
                        available: released,
                    }
                }
                Err(e) => e,
            };

            self.compensate(leg.pool, executed);
            return Err(failure.into());
        }

        Ok(executed.iter().map(|(_, released)| *released).sum())
    }

    fn compensate(&mut self, failed_pool: PoolId, executed: Vec<(PoolId, Assets)>) {
        let mut restored = Vec::with_capacity(executed.len());

        for (pool, amount) in executed.into_iter().rev() {
            let result = match self.registry.get_mut(pool) {
                Some(entry) => entry.source_mut().deposit(amount),
                None => Err(PoolError::PoolNotFound(pool)),
            };
            match result {
                Ok(()) => restored.push((pool, amount)),
                Err(e) => {
                    // funds left the pool and cannot go back. hold them rather than lose them.
                    tracing::error!(%pool, %amount, error = %e, "compensating deposit failed, holding in custody");
                    self.custody = self.custody.add(amount);
                }
            }
        }

        tracing::warn!(%failed_pool, restored = restored.len(), "cascade rolled back");
        self.emit_event(EventPayload::CascadeRolledBack(CascadeRolledBackEvent {
            failed_pool,
            restored,
        }));
    }
}
