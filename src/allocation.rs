// 3.0 allocation.rs: which pool(s) a deposit or withdrawal touches.
// pure functions over a PoolSnapshot slice. no storage side effects, so the engine
// can plan a whole cascade read-only before any funds move.
//
// deposits: one pool, the lowest index not flagged exhausted. never split.
// withdrawals: start at drain_first, spill into the next pool in registry order
// (wrapping) until the amount is sourced. a pool emptied on the way is marked
// exhausted, which pushes the deposit target forward.

use serde::{Deserialize, Serialize};

use crate::pool::PoolSnapshot;
use crate::types::{Assets, PoolId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    #[error("No sub-pools registered")]
    NoPools,

    #[error("Cascade exhausted: requested {requested}, pools hold {available}")]
    CascadeExhausted { requested: Assets, available: Assets },
}

/// One pull in a withdrawal cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeLeg {
    pub pool: PoolId,
    pub amount: Assets,
    // pool balance hits zero after this leg
    pub drains: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadePlan {
    pub legs: Vec<CascadeLeg>,
    pub total: Assets,
}

impl CascadePlan {
    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    pub fn drained_pools(&self) -> impl Iterator<Item = PoolId> + '_ {
        self.legs.iter().filter(|leg| leg.drains).map(|leg| leg.pool)
    }
}

/// Deposit target: lowest-index pool not flagged exhausted. when every pool is
/// flagged the lowest index takes it, which un-flags it.
pub fn select_for_deposit(pools: &[PoolSnapshot]) -> Result<PoolId, AllocationError> {
    let first = pools.first().ok_or(AllocationError::NoPools)?;
    Ok(pools
        .iter()
        .find(|p| !p.exhausted)
        .map(|p| p.id)
        .unwrap_or(first.id))
}

/// Registry order starting at `drain_first`, wrapping once around.
pub fn cascade_order(pool_count: usize, drain_first: PoolId) -> impl Iterator<Item = usize> {
    let start = if pool_count == 0 {
        0
    } else {
        drain_first.index() % pool_count
    };
    (0..pool_count).map(move |offset| (start + offset) % pool_count)
}

/// Plan the withdrawal cascade for `amount`. fails without a partial plan when
/// the pools together cannot source it.
pub fn select_for_withdraw(
    pools: &[PoolSnapshot],
    drain_first: PoolId,
    amount: Assets,
) -> Result<CascadePlan, AllocationError> {
    if amount.is_zero() {
        return Ok(CascadePlan::default());
    }
    if pools.is_empty() {
        return Err(AllocationError::NoPools);
    }

    let available: Assets = pools.iter().map(|p| p.balance).sum();
    if available < amount {
        return Err(AllocationError::CascadeExhausted {
            requested: amount,
            available,
        });
    }

    let mut remaining = amount;
    let mut legs = Vec::new();

    for idx in cascade_order(pools.len(), drain_first) {
        if remaining.is_zero() {
            break;
        }
        let pool = &pools[idx];
        // already flagged and still empty: nothing to pull, nothing to flag
        if pool.exhausted && pool.balance.is_zero() {
            continue;
        }
        let take = remaining.min(pool.balance);
        legs.push(CascadeLeg {
            pool: pool.id,
            amount: take,
            drains: take == pool.balance,
        });
        remaining = remaining.saturating_sub(take);
    }

    Ok(CascadePlan { legs, total: amount })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::assets;

    fn snap(id: u32, balance: i64, exhausted: bool) -> PoolSnapshot {
        PoolSnapshot {
            id: PoolId(id),
            balance: assets(balance),
            exhausted,
        }
    }

    #[test]
    fn deposit_goes_to_lowest_non_exhausted() {
        let pools = [snap(0, 0, true), snap(1, 130, false), snap(2, 50, false)];
        assert_eq!(select_for_deposit(&pools), Ok(PoolId(1)));
    }

    #[test]
    fn deposit_falls_back_to_first_when_all_exhausted() {
        let pools = [snap(0, 0, true), snap(1, 0, true)];
        assert_eq!(select_for_deposit(&pools), Ok(PoolId(0)));
    }

    #[test]
    fn deposit_without_pools_fails() {
        assert_eq!(select_for_deposit(&[]), Err(AllocationError::NoPools));
    }

    #[test]
    fn withdraw_cascades_into_next_pool() {
        let pools = [snap(0, 30, false), snap(1, 200, false)];
        let plan = select_for_withdraw(&pools, PoolId(0), assets(100)).unwrap();

        assert_eq!(
            plan.legs,
            vec![
                CascadeLeg { pool: PoolId(0), amount: assets(30), drains: true },
                CascadeLeg { pool: PoolId(1), amount: assets(70), drains: false },
            ]
        );
        assert_eq!(plan.total, assets(100));
        assert_eq!(plan.drained_pools().collect::<Vec<_>>(), vec![PoolId(0)]);
    }

    #[test]
    fn withdraw_single_pool_when_sufficient() {
        let pools = [snap(0, 500, false), snap(1, 200, false)];
        let plan = select_for_withdraw(&pools, PoolId(0), assets(100)).unwrap();

        assert_eq!(plan.legs.len(), 1);
        assert!(!plan.legs[0].drains);
    }

    #[test]
    fn withdraw_starts_at_drain_first_and_wraps() {
        let pools = [snap(0, 100, false), snap(1, 10, false), snap(2, 20, false)];
        let plan = select_for_withdraw(&pools, PoolId(1), assets(50)).unwrap();

        let order: Vec<PoolId> = plan.legs.iter().map(|l| l.pool).collect();
        assert_eq!(order, vec![PoolId(1), PoolId(2), PoolId(0)]);
        assert_eq!(plan.legs[2].amount, assets(20));
    }

    #[test]
    fn withdraw_beyond_all_pools_fails() {
        let pools = [snap(0, 30, false), snap(1, 20, false)];
        let result = select_for_withdraw(&pools, PoolId(0), assets(100));

        assert_eq!(
            result,
            Err(AllocationError::CascadeExhausted {
                requested: assets(100),
                available: assets(50),
            })
        );
    }

    #[test]
    fn zero_withdraw_is_empty_plan() {
        let plan = select_for_withdraw(&[], PoolId(0), Assets::zero()).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn flagged_empty_pool_gets_no_leg() {
        let pools = [snap(0, 0, true), snap(1, 80, false)];
        let plan = select_for_withdraw(&pools, PoolId(0), assets(10)).unwrap();

        assert_eq!(plan.legs, vec![CascadeLeg { pool: PoolId(1), amount: assets(10), drains: false }]);
        assert_eq!(plan.drained_pools().count(), 0);
    }

    #[test]
    fn empty_pool_on_path_is_marked_drained() {
        let pools = [snap(0, 0, false), snap(1, 80, false)];
        let plan = select_for_withdraw(&pools, PoolId(0), assets(10)).unwrap();

        assert_eq!(plan.legs[0], CascadeLeg { pool: PoolId(0), amount: Assets::zero(), drains: true });
        assert_eq!(plan.legs[1].amount, assets(10));
    }
}
