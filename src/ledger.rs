//! Withdraw-order ledger.
//!
//! Tracks requested-but-unsettled redemptions per account and phase. An account
//! holds at most one order per phase, so a second request before settlement tops
//! up the existing Requested order instead of opening a new one.
//!
//! Phase counters are maintained in the same mutation that changes the maps and
//! can always be recomputed with [`OrderLedger::recount`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;

use crate::types::{AccountId, Assets};

/// Lifecycle phase. Orders only move forward, and only inside a settlement tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPhase {
    Requested,
    Pending,
    Available,
}

impl OrderPhase {
    pub fn next(&self) -> Option<OrderPhase> {
        match self {
            OrderPhase::Requested => Some(OrderPhase::Pending),
            OrderPhase::Pending => Some(OrderPhase::Available),
            OrderPhase::Available => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawOrder {
    pub account: AccountId,
    pub amount: Assets,
    pub phase: OrderPhase,
    /// Creation order across the whole ledger. Oldest first for the emergency path.
    pub sequence: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Withdraw queue full: {max} outstanding orders")]
    CapacityExceeded { max: usize },

    #[error("Insufficient available: requested {requested}, available {available}")]
    InsufficientAvailable { requested: Assets, available: Assets },
}

/// Literal count of non-zero orders per phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseCounts {
    pub requested: usize,
    pub pending: usize,
    pub available: usize,
}

/// Result of moving every order of one phase into the next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseAdvance {
    pub orders: usize,
    pub amount: Assets,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLedger {
    requested: BTreeMap<AccountId, WithdrawOrder>,
    pending: BTreeMap<AccountId, WithdrawOrder>,
    available: BTreeMap<AccountId, WithdrawOrder>,
    total_requested_orders: usize,
    total_pending_orders: usize,
    max_orders: usize,
    next_sequence: u64,
}

impl OrderLedger {
    pub fn new(max_orders: usize) -> Self {
        Self {
            requested: BTreeMap::new(),
            pending: BTreeMap::new(),
            available: BTreeMap::new(),
            total_requested_orders: 0,
            total_pending_orders: 0,
            max_orders,
            next_sequence: 1,
        }
    }

    /// Rebuild from persisted orders. Counters are derived, not trusted.
    pub fn from_orders(max_orders: usize, orders: Vec<WithdrawOrder>) -> Self {
        let mut ledger = Self::new(max_orders);
        for order in orders {
            ledger.next_sequence = ledger.next_sequence.max(order.sequence + 1);
            if order.amount.is_zero() {
                continue;
            }
            ledger.phase_map_mut(order.phase).insert(order.account, order);
        }
        let counts = ledger.recount();
        ledger.total_requested_orders = counts.requested;
        ledger.total_pending_orders = counts.pending;
        ledger
    }

    /// Raise the next sequence number to at least `next`. Fully claimed orders
    /// leave no trace in the maps, so a persisted ledger carries its own floor.
    pub fn with_next_sequence(mut self, next: u64) -> Self {
        self.next_sequence = self.next_sequence.max(next);
        self
    }

    pub fn max_orders(&self) -> usize {
        self.max_orders
    }

    pub fn total_requested_orders(&self) -> usize {
        self.total_requested_orders
    }

    pub fn total_pending_orders(&self) -> usize {
        self.total_pending_orders
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    fn phase_map(&self, phase: OrderPhase) -> &BTreeMap<AccountId, WithdrawOrder> {
        match phase {
            OrderPhase::Requested => &self.requested,
            OrderPhase::Pending => &self.pending,
            OrderPhase::Available => &self.available,
        }
    }

    fn phase_map_mut(&mut self, phase: OrderPhase) -> &mut BTreeMap<AccountId, WithdrawOrder> {
        match phase {
            OrderPhase::Requested => &mut self.requested,
            OrderPhase::Pending => &mut self.pending,
            OrderPhase::Available => &mut self.available,
        }
    }

    /// Capacity check with no mutation. The engine runs this before burning the
    /// caller's shares so a rejected request consumes nothing.
    pub fn check_request(&self, account: AccountId, amount: Assets) -> Result<(), LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::ZeroAmount);
        }
        if !self.requested.contains_key(&account)
            && self.total_requested_orders >= self.max_orders
        {
            return Err(LedgerError::CapacityExceeded {
                max: self.max_orders,
            });
        }
        Ok(())
    }

    /// Create or top up the account's Requested order. Returns the new amount.
    pub fn request(&mut self, account: AccountId, amount: Assets) -> Result<Assets, LedgerError> {
        self.check_request(account, amount)?;

        if let Some(order) = self.requested.get_mut(&account) {
            order.amount = order.amount.add(amount);
            return Ok(order.amount);
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.requested.insert(
            account,
            WithdrawOrder {
                account,
                amount,
                phase: OrderPhase::Requested,
                sequence,
            },
        );
        self.total_requested_orders += 1;
        Ok(amount)
    }

    pub fn order(&self, account: AccountId, phase: OrderPhase) -> Option<&WithdrawOrder> {
        self.phase_map(phase).get(&account)
    }

    pub fn order_amount(&self, account: AccountId, phase: OrderPhase) -> Assets {
        self.order(account, phase)
            .map(|o| o.amount)
            .unwrap_or_else(Assets::zero)
    }

    pub fn phase_total(&self, phase: OrderPhase) -> Assets {
        self.phase_map(phase).values().map(|o| o.amount).sum()
    }

    /// Sum of every order amount across all phases.
    pub fn outstanding_liability(&self) -> Assets {
        self.orders().map(|o| o.amount).sum()
    }

    pub fn orders(&self) -> impl Iterator<Item = &WithdrawOrder> {
        self.requested
            .values()
            .chain(self.pending.values())
            .chain(self.available.values())
    }

    pub fn is_empty(&self) -> bool {
        self.requested.is_empty() && self.pending.is_empty() && self.available.is_empty()
    }

    /// Requested → Pending. Called by the batch processor only after the
    /// cascade for the aggregate has been secured.
    pub fn advance_requested(&mut self) -> PhaseAdvance {
        let moved = self.move_phase(OrderPhase::Requested, OrderPhase::Pending);
        self.sync_counters();
        moved
    }

    /// Pending → Available. Funds are already in custody.
    pub fn advance_pending(&mut self) -> PhaseAdvance {
        let moved = self.move_phase(OrderPhase::Pending, OrderPhase::Available);
        self.sync_counters();
        moved
    }

    fn move_phase(&mut self, from: OrderPhase, to: OrderPhase) -> PhaseAdvance {
        let drained = std::mem::take(self.phase_map_mut(from));
        let mut advance = PhaseAdvance::default();

        for (account, mut order) in drained {
            advance.orders += 1;
            advance.amount = advance.amount.add(order.amount);
            order.phase = to;

            let target = self.phase_map_mut(to);
            match target.get_mut(&account) {
                // an unclaimed order from an earlier window absorbs the new one
                Some(existing) => {
                    existing.amount = existing.amount.add(order.amount);
                    existing.sequence = existing.sequence.min(order.sequence);
                }
                None => {
                    target.insert(account, order);
                }
            }
        }
        advance
    }

    fn sync_counters(&mut self) {
        self.total_requested_orders = self.requested.len();
        self.total_pending_orders = self.pending.len();
    }

    /// Decrement the Available order. The order is removed when it reaches zero.
    /// Returns what remains claimable.
    pub fn claim(&mut self, account: AccountId, amount: Assets) -> Result<Assets, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::ZeroAmount);
        }
        let available = self.order_amount(account, OrderPhase::Available);
        if available < amount {
            return Err(LedgerError::InsufficientAvailable {
                requested: amount,
                available,
            });
        }

        let remaining = available.saturating_sub(amount);
        if remaining.is_zero() {
            self.available.remove(&account);
        } else if let Some(order) = self.available.get_mut(&account) {
            order.amount = remaining;
        }
        Ok(remaining)
    }

    /// Requested orders sorted oldest first.
    pub fn requested_by_age(&self) -> Vec<&WithdrawOrder> {
        let mut orders: Vec<&WithdrawOrder> = self.requested.values().collect();
        orders.sort_by_key(|o| o.sequence);
        orders
    }

    /// Remove the Requested orders at `range` positions of the oldest-first
    /// ordering. Out-of-range bounds are clamped.
    pub fn clear_requested(&mut self, range: Range<usize>) -> Vec<WithdrawOrder> {
        let targets: Vec<AccountId> = {
            let by_age = self.requested_by_age();
            let end = range.end.min(by_age.len());
            let start = range.start.min(end);
            by_age[start..end].iter().map(|o| o.account).collect()
        };

        let cleared: Vec<WithdrawOrder> = targets
            .iter()
            .filter_map(|account| self.requested.remove(account))
            .collect();
        self.sync_counters();
        cleared
    }

    /// Full scan of the maps, independent of the maintained counters.
    pub fn recount(&self) -> PhaseCounts {
        let count = |map: &BTreeMap<AccountId, WithdrawOrder>| {
            map.values().filter(|o| o.amount.is_positive()).count()
        };
        PhaseCounts {
            requested: count(&self.requested),
            pending: count(&self.pending),
            available: count(&self.available),
        }
    }

    pub fn counters_consistent(&self) -> bool {
        let counts = self.recount();
        counts.requested == self.total_requested_orders
            && counts.pending == self.total_pending_orders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::assets;

    #[test]
    fn phases_only_move_forward() {
        assert_eq!(OrderPhase::Requested.next(), Some(OrderPhase::Pending));
        assert_eq!(OrderPhase::Pending.next(), Some(OrderPhase::Available));
        assert_eq!(OrderPhase::Available.next(), None);
    }

    #[test]
    fn request_creates_then_tops_up() {
        let mut ledger = OrderLedger::new(10);
        ledger.request(AccountId(1), assets(100)).unwrap();
        let total = ledger.request(AccountId(1), assets(50)).unwrap();

        assert_eq!(total, assets(150));
        assert_eq!(ledger.total_requested_orders(), 1);
        assert_eq!(ledger.order_amount(AccountId(1), OrderPhase::Requested), assets(150));
    }

    #[test]
    fn zero_request_rejected() {
        let mut ledger = OrderLedger::new(10);
        assert_eq!(
            ledger.request(AccountId(1), assets(0)),
            Err(LedgerError::ZeroAmount)
        );
        assert!(ledger.is_empty());
    }

    #[test]
    fn capacity_blocks_new_accounts_only() {
        let mut ledger = OrderLedger::new(2);
        ledger.request(AccountId(1), assets(10)).unwrap();
        ledger.request(AccountId(2), assets(10)).unwrap();

        assert_eq!(
            ledger.request(AccountId(3), assets(10)),
            Err(LedgerError::CapacityExceeded { max: 2 })
        );
        // existing account can still top up
        assert!(ledger.request(AccountId(2), assets(5)).is_ok());
        assert_eq!(ledger.total_requested_orders(), 2);
    }

    #[test]
    fn absent_order_reads_zero() {
        let ledger = OrderLedger::new(1);
        assert_eq!(ledger.order_amount(AccountId(9), OrderPhase::Pending), Assets::zero());
    }

    #[test]
    fn phases_advance_in_order() {
        let mut ledger = OrderLedger::new(10);
        ledger.request(AccountId(1), assets(100)).unwrap();

        let moved = ledger.advance_requested();
        assert_eq!(moved, PhaseAdvance { orders: 1, amount: assets(100) });
        assert_eq!(ledger.total_requested_orders(), 0);
        assert_eq!(ledger.total_pending_orders(), 1);
        assert_eq!(ledger.order(AccountId(1), OrderPhase::Pending).unwrap().phase, OrderPhase::Pending);

        ledger.advance_pending();
        assert_eq!(ledger.total_pending_orders(), 0);
        assert_eq!(ledger.order_amount(AccountId(1), OrderPhase::Available), assets(100));
    }

    #[test]
    fn available_orders_merge_across_windows() {
        let mut ledger = OrderLedger::new(10);
        ledger.request(AccountId(1), assets(100)).unwrap();
        ledger.advance_requested();
        ledger.advance_pending();

        ledger.request(AccountId(1), assets(20)).unwrap();
        ledger.advance_requested();
        ledger.advance_pending();

        assert_eq!(ledger.order_amount(AccountId(1), OrderPhase::Available), assets(120));
        assert_eq!(ledger.recount().available, 1);
    }

    #[test]
    fn partial_claims_then_removal() {
        let mut ledger = OrderLedger::new(10);
        ledger.request(AccountId(1), assets(100)).unwrap();
        ledger.advance_requested();
        ledger.advance_pending();

        assert_eq!(ledger.claim(AccountId(1), assets(60)).unwrap(), assets(40));
        assert_eq!(
            ledger.claim(AccountId(1), assets(41)),
            Err(LedgerError::InsufficientAvailable {
                requested: assets(41),
                available: assets(40),
            })
        );
        assert_eq!(ledger.claim(AccountId(1), assets(40)).unwrap(), Assets::zero());
        assert!(ledger.order(AccountId(1), OrderPhase::Available).is_none());
    }

    #[test]
    fn claim_ignores_unsettled_phases() {
        let mut ledger = OrderLedger::new(10);
        ledger.request(AccountId(1), assets(100)).unwrap();
        ledger.advance_requested();

        assert!(matches!(
            ledger.claim(AccountId(1), assets(1)),
            Err(LedgerError::InsufficientAvailable { .. })
        ));
    }

    #[test]
    fn clear_requested_oldest_first() {
        let mut ledger = OrderLedger::new(10);
        ledger.request(AccountId(5), assets(10)).unwrap();
        ledger.request(AccountId(2), assets(20)).unwrap();
        ledger.request(AccountId(9), assets(30)).unwrap();

        let cleared = ledger.clear_requested(0..2);
        let accounts: Vec<AccountId> = cleared.iter().map(|o| o.account).collect();
        assert_eq!(accounts, vec![AccountId(5), AccountId(2)]);
        assert_eq!(ledger.total_requested_orders(), 1);
        assert!(ledger.counters_consistent());
    }

    #[test]
    fn clear_requested_clamps_range() {
        let mut ledger = OrderLedger::new(10);
        ledger.request(AccountId(1), assets(10)).unwrap();

        assert_eq!(ledger.clear_requested(3..7).len(), 0);
        assert_eq!(ledger.clear_requested(0..100).len(), 1);
        assert!(ledger.is_empty());
    }

    #[test]
    fn rebuild_from_orders_recounts() {
        let mut ledger = OrderLedger::new(10);
        ledger.request(AccountId(1), assets(10)).unwrap();
        ledger.request(AccountId(2), assets(20)).unwrap();
        ledger.advance_requested();
        ledger.request(AccountId(3), assets(30)).unwrap();

        let orders: Vec<WithdrawOrder> = ledger.orders().cloned().collect();
        let rebuilt = OrderLedger::from_orders(10, orders);

        assert_eq!(rebuilt, ledger);
        assert_eq!(rebuilt.total_pending_orders(), 2);
        assert_eq!(rebuilt.total_requested_orders(), 1);
    }
}
