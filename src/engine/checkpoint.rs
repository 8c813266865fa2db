//! Snapshot and restore.

use super::config::EngineConfig;
use super::core::Engine;
use super::results::EngineError;
use crate::checkpoint::{CheckpointError, PoolMeta, VaultSnapshot, SNAPSHOT_VERSION};
use crate::ledger::{OrderLedger, PhaseCounts};
use crate::pool::YieldSource;
use crate::shares::ShareLedger;

impl Engine {
    /// Capture persisted state. Payouts and the event log are not part of it.
    pub fn snapshot(&self) -> VaultSnapshot {
        VaultSnapshot {
            version: SNAPSHOT_VERSION,
            pools: self
                .registry
                .iter()
                .map(|entry| PoolMeta {
                    id: entry.id,
                    name: entry.name().to_string(),
                    exhausted: entry.exhausted,
                })
                .collect(),
            drain_first: self.registry.drain_first(),
            orders: self.ledger.orders().cloned().collect(),
            counters: PhaseCounts {
                requested: self.ledger.total_requested_orders(),
                pending: self.ledger.total_pending_orders(),
                available: self.ledger.recount().available,
            },
            next_sequence: self.ledger.next_sequence(),
            custody: self.custody,
            fee_state: self.fee_state.clone(),
            next_tick: self.next_tick,
            mode: self.mode,
            current_time: self.current_time,
        }
    }

    /// Rebuild an engine from a snapshot. `sources` are the live yield
    /// sources in registry order and must match the snapshot's pool names.
    pub fn restore(
        config: EngineConfig,
        snapshot: VaultSnapshot,
        sources: Vec<Box<dyn YieldSource + Send>>,
        shares: Box<dyn ShareLedger + Send>,
    ) -> Result<Engine, EngineError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            }
            .into());
        }
        if sources.len() != snapshot.pools.len() {
            return Err(CheckpointError::SourceCountMismatch {
                expected: snapshot.pools.len(),
                supplied: sources.len(),
            }
            .into());
        }

        let mut engine = Engine::starting_at(config, shares, snapshot.current_time)?;

        for (meta, source) in snapshot.pools.iter().zip(sources) {
            if source.name() != meta.name {
                return Err(CheckpointError::PoolMismatch {
                    pool: meta.id,
                    expected: meta.name.clone(),
                    found: source.name().to_string(),
                }
                .into());
            }
            let id = engine.registry.insert(source)?;
            engine.registry.set_exhausted(id, meta.exhausted)?;
        }
        if !engine.registry.is_empty() {
            engine.registry.set_drain_first(snapshot.drain_first)?;
        }

        let ledger = OrderLedger::from_orders(engine.config.vault.max_orders, snapshot.orders)
            .with_next_sequence(snapshot.next_sequence);
        let recounted = ledger.recount();
        if recounted != snapshot.counters {
            return Err(CheckpointError::CounterMismatch {
                stored: snapshot.counters,
                recounted,
            }
            .into());
        }

        engine.ledger = ledger;
        engine.custody = snapshot.custody;
        engine.fee_state = snapshot.fee_state;
        engine.next_tick = snapshot.next_tick;
        engine.mode = snapshot.mode;

        tracing::info!(
            pools = engine.registry.len(),
            orders = engine.ledger.orders().count(),
            next_tick = %engine.next_tick,
            "engine restored from snapshot"
        );
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use crate::checkpoint::CheckpointError;
    use crate::engine::{Engine, EngineConfig, EngineError};
    use crate::ledger::OrderPhase;
    use crate::pool::{InMemoryYieldSource, SharedYieldSource, YieldSource};
    use crate::shares::InMemoryShareLedger;
    use crate::types::{assets, AccountId, Assets};

    #[test]
    fn source_count_must_match() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        engine
            .insert_pool(Box::new(InMemoryYieldSource::new("a", assets(10))))
            .unwrap();

        let result = Engine::restore(
            EngineConfig::default(),
            engine.snapshot(),
            Vec::new(),
            Box::new(InMemoryShareLedger::new()),
        );
        assert!(matches!(
            result,
            Err(EngineError::Checkpoint(CheckpointError::SourceCountMismatch {
                expected: 1,
                supplied: 0
            }))
        ));
    }

    #[test]
    fn tampered_counters_rejected() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        let source = SharedYieldSource::new(InMemoryYieldSource::new("a", Assets::zero()));
        engine.insert_pool(Box::new(source.clone())).unwrap();
        engine.deposit(AccountId(1), assets(100)).unwrap();
        engine.request_withdraw(AccountId(1), assets(10)).unwrap();

        let mut snapshot = engine.snapshot();
        snapshot.counters.requested = 5;

        let sources: Vec<Box<dyn YieldSource + Send>> = vec![Box::new(source)];
        let result = Engine::restore(
            EngineConfig::default(),
            snapshot,
            sources,
            Box::new(InMemoryShareLedger::new()),
        );
        assert!(matches!(
            result,
            Err(EngineError::Checkpoint(CheckpointError::CounterMismatch { .. }))
        ));
    }

    #[test]
    fn restore_preserves_orders_and_schedule() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        let source = SharedYieldSource::new(InMemoryYieldSource::new("a", Assets::zero()));
        engine.insert_pool(Box::new(source.clone())).unwrap();
        engine.deposit(AccountId(1), assets(100)).unwrap();
        engine.request_withdraw(AccountId(1), assets(10)).unwrap();

        let snapshot = engine.snapshot();
        let sources: Vec<Box<dyn YieldSource + Send>> = vec![Box::new(source)];
        let restored = Engine::restore(
            EngineConfig::default(),
            snapshot,
            sources,
            Box::new(InMemoryShareLedger::new()),
        )
        .unwrap();

        assert_eq!(restored.ledger(), engine.ledger());
        assert_eq!(restored.next_tick(), engine.next_tick());
        assert_eq!(restored.order_amount(AccountId(1), OrderPhase::Requested), assets(10));
        assert_eq!(restored.total_managed_assets().unwrap(), assets(100));
    }
}
