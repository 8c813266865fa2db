// vault-settlement: liquid staking settlement engine.
// deposits mint shares, redemptions queue as withdraw orders and settle in
// batches on a fixed cadence, pulling from sub-pools in cascade order.
// all computation is deterministic; pools and the share ledger sit behind traits.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: AccountId, PoolId, Assets, Shares, Bps, Timestamp
//   2.x  pool.rs: sub-pool registry, YieldSource trait, in-memory sources
//   3.x  allocation.rs: deposit target and withdrawal cascade planning
//   4.x  shares.rs: share ledger trait and in-memory ledger
//   5.x  fee.rs: time-accrued protocol fee
//   6.x  ledger.rs: withdraw-order ledger, phases and counters
//   7.x  config.rs: vault params, env presets
//   8.x  engine/: core engine: deposits, withdrawals, settlement, fees, emergency
//   9.3  liquidity.rs: instant-liquidity bypass
//   11.x events.rs: state transition events for audit
//   12.x checkpoint.rs: persisted snapshots
//   13.x sync.rs: shared engine behind one mutex

pub mod allocation;
pub mod engine;
pub mod events;
pub mod fee;
pub mod ledger;
pub mod pool;
pub mod shares;
pub mod types;

// integration modules
pub mod checkpoint;
pub mod config;
pub mod liquidity;
pub mod sync;

// re exports for convenience
pub use allocation::*;
pub use engine::*;
pub use events::*;
pub use fee::*;
pub use ledger::*;
pub use pool::*;
pub use shares::*;
pub use types::*;
pub use checkpoint::{CheckpointError, PoolMeta, VaultSnapshot};
pub use config::{ConfigError, Environment, VaultConfig};
pub use liquidity::{FixedFeeLiquidity, InstantLiquidity, LiquidityError, LiquidityQuote};
pub use sync::SharedEngine;
