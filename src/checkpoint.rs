// 12.0 checkpoint.rs: persisted vault state. everything the engine needs to pick
// up after a restart except the yield sources themselves (external positions,
// reattached by the caller) and the share ledger (external collaborator).
// 12.1 JSON encoding through serde_json.

use serde::{Deserialize, Serialize};

use crate::engine::OperationalMode;
use crate::fee::FeeAccrualState;
use crate::ledger::{PhaseCounts, WithdrawOrder};
use crate::types::{Assets, PoolId, Timestamp};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckpointError {
    #[error("Unsupported snapshot version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Snapshot has {expected} pools, {supplied} sources supplied")]
    SourceCountMismatch { expected: usize, supplied: usize },

    #[error("Source for {pool} is {found:?}, snapshot expects {expected:?}")]
    PoolMismatch {
        pool: PoolId,
        expected: String,
        found: String,
    },

    #[error("Stored counters {stored:?} disagree with recount {recounted:?}")]
    CounterMismatch {
        stored: PhaseCounts,
        recounted: PhaseCounts,
    },

    #[error("Snapshot encoding failed: {0}")]
    Encoding(String),
}

// Registry entry without its live source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolMeta {
    pub id: PoolId,
    pub name: String,
    pub exhausted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultSnapshot {
    pub version: u32,
    pub pools: Vec<PoolMeta>,
    pub drain_first: PoolId,
    pub orders: Vec<WithdrawOrder>,
    // stored so a restore can detect a corrupted order list
    pub counters: PhaseCounts,
    pub next_sequence: u64,
    pub custody: Assets,
    pub fee_state: FeeAccrualState,
    pub next_tick: Timestamp,
    pub mode: OperationalMode,
    pub current_time: Timestamp,
}

impl VaultSnapshot {
    pub fn to_json(&self) -> Result<String, CheckpointError> {
        serde_json::to_string_pretty(self).map_err(|e| CheckpointError::Encoding(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        let snapshot: VaultSnapshot =
            serde_json::from_str(json).map_err(|e| CheckpointError::Encoding(e.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        Ok(snapshot)
    }
}
