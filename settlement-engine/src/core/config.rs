use rust_decimal::Decimal;
use std::str::FromStr;

use crate::wallet::RealMoneyPolicy;

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local maps (tests, demos)
    Memory,
    /// Durable redb file under `work_dir`
    Redb,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redb" => Ok(Self::Redb),
            other => Err(format!("unknown store backend: {}", other)),
        }
    }
}

/// Engine configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | ./data | redb file and log directory |
/// | ENVIRONMENT | development | development / staging / production |
/// | LOG_LEVEL | info | tracing max level |
/// | STORE_BACKEND | memory | memory / redb |
/// | MAX_CONFLICT_RETRIES | 5 | optimistic-concurrency retry budget |
/// | DEFAULT_CURRENCY | INR | currency stamped on ledger entries |
/// | HARD_FALLBACK_FEE_PERCENT | 10.0 | fee when nothing is configured |
/// | ORDER_EARNING_IS_REAL | true | ORDER_EARNING credits count as real cash |
/// | CASHBACK_IS_REAL | false | CASHBACK credits count as real cash |
///
/// # Example
///
/// ```ignore
/// STORE_BACKEND=redb WORK_DIR=/var/lib/settlement cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: String,
    pub environment: String,
    pub log_level: String,
    pub store_backend: StoreBackend,
    /// Attempts for a read-compute-conditional-write cycle before giving up
    pub max_conflict_retries: u32,
    pub default_currency: String,
    pub hard_fallback_fee_percent: Decimal,
    pub order_earning_is_real: bool,
    pub cashback_is_real: bool,
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            store_backend: std::env::var("STORE_BACKEND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(StoreBackend::Memory),
            max_conflict_retries: std::env::var("MAX_CONFLICT_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &u32| *v > 0)
                .unwrap_or(5),
            default_currency: std::env::var("DEFAULT_CURRENCY").unwrap_or_else(|_| "INR".into()),
            hard_fallback_fee_percent: std::env::var("HARD_FALLBACK_FEE_PERCENT")
                .ok()
                .and_then(|v| Decimal::from_str(&v).ok())
                .unwrap_or(Decimal::TEN),
            order_earning_is_real: std::env::var("ORDER_EARNING_IS_REAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            cashback_is_real: std::env::var("CASHBACK_IS_REAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }

    /// Override the storage location and retry budget
    ///
    /// Used by tests
    pub fn with_overrides(
        work_dir: impl Into<String>,
        store_backend: StoreBackend,
        max_conflict_retries: u32,
    ) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.store_backend = store_backend;
        config.max_conflict_retries = max_conflict_retries.max(1);
        config
    }

    /// Per-kind realness flags for wallet credits
    pub fn real_money_policy(&self) -> RealMoneyPolicy {
        RealMoneyPolicy {
            order_earning_is_real: self.order_earning_is_real,
            cashback_is_real: self.cashback_is_real,
        }
    }

    /// Path of the redb file
    pub fn database_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join("settlement.redb")
    }

    pub fn log_dir(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join("logs")
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_backend_parse() {
        assert_eq!("memory".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert_eq!("REDB".parse::<StoreBackend>(), Ok(StoreBackend::Redb));
        assert!("postgres".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_with_overrides() {
        let config = Config::with_overrides("/tmp/settlement", StoreBackend::Redb, 0);
        assert_eq!(config.work_dir, "/tmp/settlement");
        assert_eq!(config.store_backend, StoreBackend::Redb);
        assert_eq!(config.max_conflict_retries, 1);
        assert!(config.database_path().ends_with("settlement.redb"));
    }
}
