// 8.0: settlement engine. coordinates deposits, the withdrawal queue, batch
// settlement ticks, fee minting and the emergency path.
// deterministic: the clock is set by the caller and every pool call is synchronous.

mod checkpoint;
mod config;
mod core;
mod deposits;
mod emergency;
mod fees;
mod results;
mod settlement;
mod withdrawals;

pub use config::EngineConfig;
pub use core::{Engine, OperationalMode};
pub use results::{
    ClaimResult, DepositResult, EmergencyReport, EngineError, FeeMintResult, InstantRedeemResult,
    RedeemResult, TickReport,
};
