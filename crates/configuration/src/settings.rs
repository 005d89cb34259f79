use crate::error::ConfigError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::time::Duration;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub trading: TradingSettings,
    pub service: ServiceSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

/// Market rules used to price orders and settle them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TradingSettings {
    /// Cash a fresh account starts with.
    pub starting_balance: Decimal,
    /// Brokerage fee, charged on both sides. 0.001425 corresponds to 0.1425%.
    pub fee_rate: Decimal,
    /// Securities transaction tax, charged on sells only.
    pub tax_rate: Decimal,
    /// Shares per round lot.
    pub lot_size: u64,
    /// Local hour of day at which T+2 settlement happens.
    pub settlement_hour: u32,
    /// Offset of the exchange's local time from UTC, in hours.
    pub utc_offset_hours: i32,
}

/// Cadence and bounds for the account service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub tick_interval_secs: u64,
    pub sync_interval_secs: u64,
    /// Upper bound on any single storage or remote call.
    pub io_timeout_ms: u64,
    /// Tolerance used when deciding whether a merge changed balances or prices.
    pub change_epsilon: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Root directory of the local store.
    pub data_dir: String,
    /// Root directory of a second store treated as the remote replica.
    pub remote_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<String>,
}

// --- Default Implementations ---
// These allow a user to omit any section (or the whole file) and still get a
// working setup.

impl Default for TradingSettings {
    fn default() -> Self {
        Self {
            starting_balance: dec!(1000000),
            fee_rate: dec!(0.001425),
            tax_rate: dec!(0.003),
            lot_size: 1000,
            settlement_hour: 10,
            utc_offset_hours: 8,
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            tick_interval_secs: 10,
            sync_interval_secs: 10,
            io_timeout_ms: 5000,
            change_epsilon: dec!(0.01),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            remote_dir: None,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

impl ServiceSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }
}

impl Config {
    /// Rejects settings that would make the ledger arithmetic meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.trading;
        if t.starting_balance <= Decimal::ZERO {
            return Err(invalid("trading.starting_balance must be greater than 0"));
        }
        for (name, rate) in [("fee_rate", t.fee_rate), ("tax_rate", t.tax_rate)] {
            if rate < Decimal::ZERO || rate >= Decimal::ONE {
                return Err(invalid(&format!("trading.{name} must be in [0, 1)")));
            }
        }
        if t.lot_size == 0 {
            return Err(invalid("trading.lot_size must be greater than 0"));
        }
        if t.settlement_hour > 23 {
            return Err(invalid("trading.settlement_hour must be between 0 and 23"));
        }
        if !(-12..=14).contains(&t.utc_offset_hours) {
            return Err(invalid("trading.utc_offset_hours must be between -12 and 14"));
        }

        let s = &self.service;
        if s.tick_interval_secs == 0 || s.sync_interval_secs == 0 {
            return Err(invalid("service intervals must be greater than 0"));
        }
        if s.io_timeout_ms == 0 {
            return Err(invalid("service.io_timeout_ms must be greater than 0"));
        }
        if s.change_epsilon < Decimal::ZERO {
            return Err(invalid("service.change_epsilon must not be negative"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}

#[cfg(test)]
mod tests {
    use crate::load_config_from_str;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_file_yields_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.trading.fee_rate, dec!(0.001425));
        assert_eq!(config.trading.lot_size, 1000);
        assert_eq!(config.service.io_timeout_ms, 5000);
        assert!(config.storage.remote_dir.is_none());
    }

    #[test]
    fn sections_override_only_what_they_name() {
        let config = load_config_from_str(
            r#"
            [trading]
            starting_balance = "250000"
            lot_size = 100

            [storage]
            remote_dir = "/tmp/remote"
            "#,
        )
        .unwrap();
        assert_eq!(config.trading.starting_balance, dec!(250000));
        assert_eq!(config.trading.lot_size, 100);
        assert_eq!(config.trading.settlement_hour, 10);
        assert_eq!(config.storage.remote_dir.as_deref(), Some("/tmp/remote"));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(load_config_from_str("[trading]\nsettlement_hour = 24").is_err());
        assert!(load_config_from_str("[trading]\ntax_rate = \"1.5\"").is_err());
        assert!(load_config_from_str("[service]\ntick_interval_secs = 0").is_err());
    }
}
