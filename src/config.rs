// 7.0 config.rs: all vault settings in one place. registry and queue bounds,
// settlement cadence, fee params, treasury.
// 7.1 presets per environment. validate() before handing a config to the engine.

use serde::{Deserialize, Serialize};

use crate::fee::FeeParams;
use crate::types::AccountId;

// Complete configuration for one vault
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    // Human readable vault name
    pub name: String,
    // Base asset symbol (what depositors bring)
    pub base_asset: String,
    // Upper bound on registered sub-pools
    pub max_pools: usize,
    // Upper bound on non-zero orders per phase. bounds per-tick work.
    pub max_orders: usize,
    // Fixed settlement window in seconds
    pub settlement_interval_secs: u64,
    // Most windows one tick call will process when ticks were missed
    pub max_windows_per_tick: u32,
    // Protocol fee accrual
    pub fee: FeeParams,
    // Receives minted fee shares
    pub treasury: AccountId,
    // Highest fee the instant-liquidity bypass may charge, in bps
    pub max_instant_fee_bps: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            name: "Staked Vault".to_string(),
            base_asset: "ETH".to_string(),
            max_pools: 8,
            max_orders: 256,
            settlement_interval_secs: 24 * 60 * 60, // daily
            max_windows_per_tick: 2,
            fee: FeeParams::default(),
            treasury: AccountId(0),
            max_instant_fee_bps: 300, // 3%
        }
    }
}

impl VaultConfig {
    // Short windows and no cooling so local runs settle quickly
    pub fn development() -> Self {
        let mut config = Self::default();
        config.name = "Staked Vault Dev".to_string();
        config.settlement_interval_secs = 60;
        config.fee.cooling_period_secs = 0;
        config
    }

    pub fn testnet() -> Self {
        let mut config = Self::default();
        config.name = "Staked Vault Testnet".to_string();
        config.settlement_interval_secs = 60 * 60; // hourly
        config.fee.cooling_period_secs = 60 * 60;
        config.max_orders = 64;
        config
    }

    pub fn mainnet_conservative() -> Self {
        let mut config = Self::default();
        config.max_orders = 128;
        config.fee.annual_rate_bps = 50; // 0.5%
        config.fee.cooling_period_secs = 7 * 24 * 60 * 60; // weekly
        config
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_pools == 0 {
            return Err(ConfigError::InvalidRegistry {
                reason: "Need room for at least 1 pool".to_string(),
            });
        }

        if self.max_orders == 0 {
            return Err(ConfigError::InvalidQueue {
                reason: "Queue capacity must be positive".to_string(),
            });
        }

        if self.settlement_interval_secs == 0 {
            return Err(ConfigError::InvalidSettlement {
                reason: "Settlement interval must be positive".to_string(),
            });
        }

        // fewer than 2 would leave orders stuck one phase behind after a missed tick
        if self.max_windows_per_tick < 2 {
            return Err(ConfigError::InvalidSettlement {
                reason: "Must process at least 2 windows per tick".to_string(),
            });
        }

        if self.fee.annual_rate_bps > 2_000 {
            return Err(ConfigError::InvalidFees {
                reason: "Annual fee too high (>20%)".to_string(),
            });
        }

        if self.fee.share_scale > 18 {
            return Err(ConfigError::InvalidFees {
                reason: "Share scale above 18 decimals".to_string(),
            });
        }

        if self.max_instant_fee_bps > 10_000 {
            return Err(ConfigError::InvalidFees {
                reason: "Instant fee cap above 100%".to_string(),
            });
        }

        Ok(())
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid registry: {reason}")]
    InvalidRegistry { reason: String },
    #[error("Invalid queue: {reason}")]
    InvalidQueue { reason: String },
    #[error("Invalid settlement: {reason}")]
    InvalidSettlement { reason: String },
    #[error("Invalid fees: {reason}")]
    InvalidFees { reason: String },
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testnet,
    Mainnet,
}

impl Environment {
    pub fn config(&self) -> VaultConfig {
        match self {
            Environment::Development => VaultConfig::development(),
            Environment::Testnet => VaultConfig::testnet(),
            Environment::Mainnet => VaultConfig::mainnet_conservative(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(VaultConfig::default().validate().is_ok());
    }

    #[test]
    fn test_environment_presets() {
        assert!(Environment::Development.config().validate().is_ok());
        assert!(Environment::Testnet.config().validate().is_ok());
        assert!(Environment::Mainnet.config().validate().is_ok());
    }

    #[test]
    fn test_mainnet_fee() {
        let config = VaultConfig::mainnet_conservative();
        assert_eq!(config.fee.annual_rate_bps, 50);
        assert_eq!(config.fee.cooling_period_secs, 604_800);
    }

    #[test]
    fn test_zero_queue_invalid() {
        let mut config = VaultConfig::default();
        config.max_orders = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidQueue { .. })));
    }

    #[test]
    fn test_single_window_invalid() {
        let mut config = VaultConfig::default();
        config.max_windows_per_tick = 1;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidSettlement { .. })));
    }

    #[test]
    fn test_excessive_fee_invalid() {
        let mut config = VaultConfig::default();
        config.fee.annual_rate_bps = 5_000;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidFees { .. })));
    }

    #[test]
    fn test_config_serialization() {
        let config = VaultConfig::testnet();
        let json = serde_json::to_string(&config).unwrap();
        let back: VaultConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, config.name);
        assert_eq!(back.settlement_interval_secs, 3600);
    }
}
