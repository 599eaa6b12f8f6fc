use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::shared::errors::{AppError, AppResult};

const ENV_PREFIX: &str = "RESILIENT_";

/// Most ids a single batch request may carry, whatever the config says
pub const MAX_BATCH_CEILING: usize = 100;

/// Tuning knobs for one client instance.
///
/// Built by the caller and handed to the client; there is no process-wide default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestLayerConfig {
    pub request_timeout_secs: u64,

    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,

    pub default_rate_limit: u32,
    pub aggressive_rate_limit: u32,
    pub conservative_rate_limit: u32,

    /// Hard per-request ceiling for batch calls
    pub max_batch_size: usize,
    pub optimal_batch_size: usize,

    pub max_metrics_stored: usize,

    pub max_retries: u32,
    pub backoff_factor: f64,

    pub user_agent: String,
}

impl Default for RequestLayerConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            cache_ttl_secs: 300,
            cache_max_entries: 1000,
            default_rate_limit: 120,
            aggressive_rate_limit: 180,
            conservative_rate_limit: 60,
            max_batch_size: 100,
            optimal_batch_size: 50,
            max_metrics_stored: 1000,
            max_retries: 3,
            backoff_factor: 1.0,
            user_agent: format!("resilient-request/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl RequestLayerConfig {
    /// Balanced configuration for general use
    pub fn balanced() -> Self {
        Self::default()
    }

    /// Bigger cache, higher call budget, larger batches
    pub fn high_performance() -> Self {
        Self {
            cache_ttl_secs: 600,
            cache_max_entries: 2000,
            default_rate_limit: 180,
            optimal_batch_size: 75,
            ..Self::default()
        }
    }

    /// Long-lived cache and small batches to keep traffic down
    pub fn low_bandwidth() -> Self {
        Self {
            cache_ttl_secs: 900,
            cache_max_entries: 500,
            default_rate_limit: 60,
            optimal_batch_size: 25,
            ..Self::default()
        }
    }

    /// Start from `balanced()` and apply `RESILIENT_*` overrides (a `.env` file is honoured)
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::balanced().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key/value source, e.g. environment variables
    pub fn with_overrides<F>(mut self, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        override_parsed(&mut self.request_timeout_secs, get("REQUEST_TIMEOUT_SECS"))?;
        override_parsed(&mut self.cache_ttl_secs, get("CACHE_TTL_SECS"))?;
        override_parsed(&mut self.cache_max_entries, get("CACHE_MAX_ENTRIES"))?;
        override_parsed(&mut self.default_rate_limit, get("DEFAULT_RATE_LIMIT"))?;
        override_parsed(&mut self.aggressive_rate_limit, get("AGGRESSIVE_RATE_LIMIT"))?;
        override_parsed(&mut self.conservative_rate_limit, get("CONSERVATIVE_RATE_LIMIT"))?;
        override_parsed(&mut self.max_batch_size, get("MAX_BATCH_SIZE"))?;
        override_parsed(&mut self.optimal_batch_size, get("OPTIMAL_BATCH_SIZE"))?;
        override_parsed(&mut self.max_metrics_stored, get("MAX_METRICS_STORED"))?;
        override_parsed(&mut self.max_retries, get("MAX_RETRIES"))?;
        override_parsed(&mut self.backoff_factor, get("BACKOFF_FACTOR"))?;
        if let Some(user_agent) = get("USER_AGENT") {
            self.user_agent = user_agent;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> AppResult<()> {
        let positive = [
            ("request_timeout_secs", self.request_timeout_secs as usize),
            ("cache_max_entries", self.cache_max_entries),
            ("default_rate_limit", self.default_rate_limit as usize),
            ("aggressive_rate_limit", self.aggressive_rate_limit as usize),
            ("conservative_rate_limit", self.conservative_rate_limit as usize),
            ("max_batch_size", self.max_batch_size),
            ("optimal_batch_size", self.optimal_batch_size),
            ("max_metrics_stored", self.max_metrics_stored),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(AppError::InvalidInput(format!("{} must be > 0", name)));
        }

        if self.max_batch_size > MAX_BATCH_CEILING {
            return Err(AppError::InvalidInput(format!(
                "max_batch_size ({}) exceeds the per-request ceiling of {}",
                self.max_batch_size, MAX_BATCH_CEILING
            )));
        }

        if self.optimal_batch_size > self.max_batch_size {
            return Err(AppError::InvalidInput(format!(
                "optimal_batch_size ({}) exceeds max_batch_size ({})",
                self.optimal_batch_size, self.max_batch_size
            )));
        }

        if !self.backoff_factor.is_finite() || self.backoff_factor < 0.0 {
            return Err(AppError::InvalidInput(format!(
                "backoff_factor must be a non-negative number, got {}",
                self.backoff_factor
            )));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn override_parsed<T>(field: &mut T, raw: Option<String>) -> AppResult<()>
where
    T: FromStr,
    AppError: From<T::Err>,
{
    if let Some(raw) = raw {
        *field = raw.trim().parse::<T>()?;
    }
    Ok(())
}
