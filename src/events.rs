// 11.0: every state change produces an event. used for audit trails and notifying
// external systems. the EventPayload enum lists all event types.

use crate::ledger::OrderPhase;
use crate::types::{AccountId, Assets, PoolId, Shares, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Registry events
    PoolInserted(PoolInsertedEvent),
    PoolDrawn(PoolDrawnEvent),
    PoolExhausted(PoolExhaustedEvent),

    // Account events
    Deposit(DepositEvent),
    WithdrawRequested(WithdrawRequestedEvent),
    WithdrawRejected(WithdrawRejectedEvent),
    Claimed(ClaimedEvent),
    InstantRedeemed(InstantRedeemedEvent),

    // Settlement events
    TickSettled(TickSettledEvent),
    TickFailed(TickFailedEvent),
    CascadeRolledBack(CascadeRolledBackEvent),

    // Fee events
    FeeMinted(FeeMintedEvent),

    // Admin events
    ModeChanged(ModeChangedEvent),
    EmergencyCleared(EmergencyClearedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolInsertedEvent {
    pub pool: PoolId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolDrawnEvent {
    pub pool: PoolId,
    pub amount: Assets,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolExhaustedEvent {
    pub pool: PoolId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositEvent {
    pub account_id: AccountId,
    pub pool: PoolId,
    pub assets: Assets,
    pub shares_minted: Shares,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawRequestedEvent {
    pub account_id: AccountId,
    pub shares_burned: Shares,
    pub assets: Assets,
    pub order_total: Assets,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawRejectedEvent {
    pub account_id: AccountId,
    pub shares: Shares,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimedEvent {
    pub account_id: AccountId,
    pub recipient: AccountId,
    pub amount: Assets,
    pub remaining: Assets,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstantRedeemedEvent {
    pub account_id: AccountId,
    pub shares: Shares,
    pub assets_out: Assets,
    pub fee: Assets,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickSettledEvent {
    pub windows: u32,
    pub to_pending: usize,
    pub to_available: usize,
    pub pulled: Assets,
    pub next_tick: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickFailedEvent {
    pub requested_total: Assets,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeRolledBackEvent {
    pub failed_pool: PoolId,
    pub restored: Vec<(PoolId, Assets)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeMintedEvent {
    pub treasury: AccountId,
    pub fee_assets: Assets,
    pub shares: Shares,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeChangedEvent {
    pub operational: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyClearedEvent {
    pub orders: Vec<(AccountId, Assets)>,
    pub total: Assets,
    pub phase: OrderPhase,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{assets, shares};

    #[test]
    fn events_serialize_for_audit() {
        let event = Event::new(
            EventId(7),
            Timestamp::from_secs(10),
            EventPayload::Deposit(DepositEvent {
                account_id: AccountId(1),
                pool: PoolId(0),
                assets: assets(100),
                shares_minted: shares(100),
            }),
        );

        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, EventId(7));
        assert!(matches!(back.payload, EventPayload::Deposit(ref d) if d.pool == PoolId(0)));
    }
}
