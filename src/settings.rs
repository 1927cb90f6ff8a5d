//! Application settings
//!
//! Loaded once at startup from an optional TOML file and `FINBOT__`-prefixed
//! environment variables (`FINBOT__SYNC__MAX_ATTEMPTS=8`). Every field has a
//! default, so an empty configuration is valid.
//!
//! ```toml
//! [account]
//! currency = "BRL"
//! initial_balance = "1500.00"
//! opened_on = "2025-01-01"
//! precision = "reject"
//!
//! [[categories]]
//! name = "alimentação"
//! budget_limit = "800"
//! ```

use crate::core::{AccountTemplate, PrecisionPolicy};
use crate::dispatch::DispatchOptions;
use crate::sync::RetryPolicy;
use crate::types::{Category, Currency};
use chrono::NaiveDate;
use config::{Config, ConfigError, Environment, File, FileFormat};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "FINBOT";

/// Categories every account starts with when none are configured
pub const DEFAULT_CATEGORIES: [&str; 8] = [
    "alimentação",
    "transporte",
    "moradia",
    "saúde",
    "lazer",
    "educação",
    "salário",
    "outros",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub account: AccountSettings,
    pub categories: Vec<CategorySettings>,
    pub dispatch: DispatchSettings,
    pub sync: SyncSettings,
    pub runtime: RuntimeSettings,
    pub log: LogSettings,
}

/// Facts shared by every account
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccountSettings {
    pub currency: Currency,
    pub initial_balance: Decimal,
    /// Entries dated before this day are rejected
    pub opened_on: NaiveDate,
    pub precision: PrecisionPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategorySettings {
    pub name: String,
    #[serde(default)]
    pub budget_limit: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// How long an entry waits for "sim" before it is dropped
    pub confirmation_expiry_secs: u64,
    /// Entries listed by `extrato` without a count
    pub recent_default: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub replay_interval_secs: u64,
    /// Idle time after which an account's push worker stops
    pub worker_idle_secs: u64,
    /// Unpushed transactions above which responses carry a warning
    pub degraded_depth: usize,
    /// Directory of the CSV sheet files
    pub sheet_dir: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Tokio worker threads; unset or zero means one per CPU
    pub worker_threads: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `EnvFilter` directive, e.g. `info` or `rust_finance_bot=debug`
    pub level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            account: AccountSettings::default(),
            categories: DEFAULT_CATEGORIES
                .iter()
                .map(|name| CategorySettings {
                    name: name.to_string(),
                    budget_limit: None,
                })
                .collect(),
            dispatch: DispatchSettings::default(),
            sync: SyncSettings::default(),
            runtime: RuntimeSettings::default(),
            log: LogSettings::default(),
        }
    }
}

impl Default for AccountSettings {
    fn default() -> Self {
        AccountSettings {
            currency: Currency::Brl,
            initial_balance: Decimal::ZERO,
            opened_on: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
            precision: PrecisionPolicy::Reject,
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        DispatchSettings {
            confirmation_expiry_secs: 300, // 5 minutes
            recent_default: 5,
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        SyncSettings {
            max_attempts: retry.max_attempts,
            base_delay_ms: retry.base_delay.as_millis() as u64,
            max_delay_ms: retry.max_delay.as_millis() as u64,
            replay_interval_secs: retry.replay_interval.as_secs(),
            worker_idle_secs: retry.idle_timeout.as_secs(),
            degraded_depth: 20,
            sheet_dir: PathBuf::from("sheets"),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a file and the environment
    ///
    /// # Arguments
    ///
    /// * `path` - Explicit settings file (must exist); when `None`, an
    ///   optional `finbot.toml` in the working directory is used
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read, a value has the wrong
    /// type, or a category budget is not positive.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("finbot").required(false),
        };

        let config = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::from_config(config)
    }

    /// Parse settings from TOML text, without environment overrides
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?;

        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self, ConfigError> {
        let settings: Settings = config.try_deserialize()?;
        settings.check()?;
        Ok(settings)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if let Some(category) = self
            .categories
            .iter()
            .find(|c| c.budget_limit.is_some_and(|limit| limit <= Decimal::ZERO))
        {
            return Err(ConfigError::Message(format!(
                "budget limit of category '{}' must be positive",
                category.name
            )));
        }
        if self.sync.max_attempts == 0 {
            return Err(ConfigError::Message(
                "sync.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Template every new account ledger is created from
    pub fn to_template(&self) -> AccountTemplate {
        AccountTemplate {
            currency: self.account.currency,
            opening_balance: self.account.initial_balance,
            opened_on: self.account.opened_on,
            categories: self
                .categories
                .iter()
                .map(|c| Category::new(c.name.trim()).with_budget(c.budget_limit))
                .collect(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.sync.max_attempts,
            base_delay: Duration::from_millis(self.sync.base_delay_ms),
            max_delay: Duration::from_millis(self.sync.max_delay_ms),
            replay_interval: Duration::from_secs(self.sync.replay_interval_secs),
            idle_timeout: Duration::from_secs(self.sync.worker_idle_secs),
        }
    }

    pub fn confirmation_expiry(&self) -> Duration {
        Duration::from_secs(self.dispatch.confirmation_expiry_secs)
    }

    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            precision: self.account.precision,
            confirmation_expiry: self.confirmation_expiry(),
            recent_default: self.dispatch.recent_default,
            degraded_depth: self.sync.degraded_depth,
        }
    }

    pub fn worker_threads(&self) -> usize {
        match self.runtime.worker_threads {
            Some(threads) if threads > 0 => threads,
            _ => num_cpus::get(),
        }
    }
}
