// 8.0.2: result types and errors for engine operations.

use crate::allocation::{AllocationError, CascadePlan};
use crate::checkpoint::CheckpointError;
use crate::config::ConfigError;
use crate::fee::FeeError;
use crate::ledger::{LedgerError, WithdrawOrder};
use crate::liquidity::LiquidityError;
use crate::pool::PoolError;
use crate::shares::ShareLedgerError;
use crate::types::{AccountId, Assets, PoolId, Shares, Timestamp};

#[derive(Debug, Clone)]
pub struct DepositResult {
    pub pool: PoolId,
    pub assets: Assets,
    pub shares_minted: Shares,
}

#[derive(Debug, Clone)]
pub struct RedeemResult {
    pub shares_burned: Shares,
    pub assets: Assets,
    // Requested amount for the account after this request
    pub order_total: Assets,
}

#[derive(Debug, Clone)]
pub struct TickReport {
    pub windows: u32,
    pub to_pending: usize,
    pub to_available: usize,
    pub pulled: Assets,
    pub cascade: CascadePlan,
    pub next_tick: Timestamp,
}

#[derive(Debug, Clone)]
pub struct ClaimResult {
    pub recipient: AccountId,
    pub amount: Assets,
    pub remaining: Assets,
}

#[derive(Debug, Clone)]
pub struct FeeMintResult {
    pub treasury: AccountId,
    pub fee_assets: Assets,
    pub shares: Shares,
}

#[derive(Debug, Clone)]
pub struct InstantRedeemResult {
    pub shares: Shares,
    pub assets_out: Assets,
    pub fee: Assets,
}

#[derive(Debug, Clone)]
pub struct EmergencyReport {
    pub cleared: Vec<WithdrawOrder>,
    pub total: Assets,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Tick too early: now {now}, next window opens at {next_tick}")]
    TooEarly { now: Timestamp, next_tick: Timestamp },

    #[error("Vault is not operational")]
    NotOperational,

    #[error("Emergency clear not permitted while operational")]
    EmergencyNotPermitted,

    #[error("No instant liquidity attached")]
    NoInstantLiquidity,

    #[error("Slippage exceeded: quoted {quoted}, minimum {minimum}")]
    SlippageExceeded { quoted: Assets, minimum: Assets },

    #[error("Instant fee {fee} above cap {cap}")]
    InstantFeeTooHigh { fee: Assets, cap: Assets },

    #[error("Engine lock poisoned")]
    LockPoisoned,

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Allocation error: {0}")]
    Allocation(#[from] AllocationError),

    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Fee error: {0}")]
    Fee(#[from] FeeError),

    #[error("Share ledger error: {0}")]
    Shares(#[from] ShareLedgerError),

    #[error("Liquidity error: {0}")]
    Liquidity(#[from] LiquidityError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

impl EngineError {
    /// Cascade shortfall: the pools together cannot source the tick's aggregate.
    pub fn is_cascade_exhausted(&self) -> bool {
        matches!(
            self,
            EngineError::Allocation(AllocationError::CascadeExhausted { .. })
        )
    }
}
