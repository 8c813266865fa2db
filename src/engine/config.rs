//! Engine configuration options.

use crate::config::VaultConfig;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Vault parameters: registry and queue bounds, cadence, fees.
    pub vault: VaultConfig,
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    /// Trace every emitted event at debug level.
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            vault: VaultConfig::default(),
            max_events: 100_000,
            verbose: false,
        }
    }
}

impl EngineConfig {
    pub fn with_vault(vault: VaultConfig) -> Self {
        Self {
            vault,
            ..Self::default()
        }
    }
}
