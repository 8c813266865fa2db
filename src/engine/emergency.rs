//! Emergency recovery: write Requested orders off the queue.

use std::ops::Range;

use super::core::Engine;
use super::results::{EmergencyReport, EngineError};
use crate::events::{EmergencyClearedEvent, EventPayload};
use crate::ledger::OrderPhase;
use crate::types::Assets;

impl Engine {
    /// Force-clear the Requested orders at `range` positions of the oldest-first
    /// ordering, without sourcing any funds. Only while the vault is not
    /// operational. Pending and Available orders are already backed by custody
    /// and stay untouched.
    pub fn emergency_clear_requested(&mut self, range: Range<usize>) -> Result<EmergencyReport, EngineError> {
        if self.mode.is_operational() {
            return Err(EngineError::EmergencyNotPermitted);
        }

        let cleared = self.ledger.clear_requested(range);
        let total: Assets = cleared.iter().map(|o| o.amount).sum();

        tracing::warn!(orders = cleared.len(), %total, "emergency clear of requested orders");
        self.emit_event(EventPayload::EmergencyCleared(EmergencyClearedEvent {
            orders: cleared.iter().map(|o| (o.account, o.amount)).collect(),
            total,
            phase: OrderPhase::Requested,
        }));

        Ok(EmergencyReport { cleared, total })
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::{Engine, EngineConfig, EngineError, OperationalMode};
    use crate::pool::InMemoryYieldSource;
    use crate::types::{assets, AccountId, Assets};

    fn engine_with_requests(accounts: &[u64]) -> Engine {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        engine
            .insert_pool(Box::new(InMemoryYieldSource::new("a", Assets::zero())))
            .unwrap();
        for (i, account) in accounts.iter().enumerate() {
            engine.deposit(AccountId(*account), assets(100)).unwrap();
            engine
                .request_withdraw(AccountId(*account), assets(10 * (i as i64 + 1)))
                .unwrap();
        }
        engine
    }

    #[test]
    fn not_permitted_while_operational() {
        let mut engine = engine_with_requests(&[1]);
        assert!(matches!(
            engine.emergency_clear_requested(0..1),
            Err(EngineError::EmergencyNotPermitted)
        ));
        assert_eq!(engine.total_requested_orders(), 1);
    }

    #[test]
    fn clears_oldest_first() {
        let mut engine = engine_with_requests(&[7, 3, 5]);
        engine.set_mode(OperationalMode::Paused);

        let report = engine.emergency_clear_requested(0..2).unwrap();
        let accounts: Vec<AccountId> = report.cleared.iter().map(|o| o.account).collect();

        assert_eq!(accounts, vec![AccountId(7), AccountId(3)]);
        assert_eq!(report.total, assets(30));
        assert_eq!(engine.total_requested_orders(), 1);
        assert!(engine.ledger().counters_consistent());
        assert_eq!(engine.outstanding_liability(), assets(30));
    }
}
