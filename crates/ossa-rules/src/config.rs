//! Rule defaults configuration.
//!
//! A `MigrationConfig` is deserialized from TOML and controls the default
//! values migration rules synthesize for newly introduced blocks. Every field
//! has a built-in default, so an empty file (or no file) is valid.
//!
//! Example:
//! ```toml
//! target = "current"
//!
//! [llm]
//! provider_env = "LLM_PROVIDER"
//! model_env = "LLM_MODEL"
//!
//! [cost]
//! currency = "EUR"
//!
//! [retry]
//! max_attempts = 5
//! backoff_strategy = "exponential"
//! initial_delay_ms = 500
//! max_delay_ms = 20000
//! multiplier = 2.0
//!
//! [observability]
//! log_level = "debug"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use ossa_contracts::error::{OssaError, OssaResult};

const BACKOFF_STRATEGIES: [&str; 3] = ["exponential", "linear", "fixed"];
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Top-level structure of a rule defaults file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationConfig {
    /// Version migrations run towards unless the caller overrides it.
    pub target: String,
    pub llm: LlmDefaults,
    pub cost: CostDefaults,
    pub retry: RetryDefaults,
    pub observability: ObservabilityDefaults,
}

/// Environment variable names recorded in the runtime model block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LlmDefaults {
    pub provider_env: String,
    pub model_env: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostDefaults {
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryDefaults {
    pub max_attempts: u32,
    pub backoff_strategy: String,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObservabilityDefaults {
    pub log_level: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            target: "current".to_string(),
            llm: LlmDefaults::default(),
            cost: CostDefaults::default(),
            retry: RetryDefaults::default(),
            observability: ObservabilityDefaults::default(),
        }
    }
}

impl Default for LlmDefaults {
    fn default() -> Self {
        Self {
            provider_env: "LLM_PROVIDER".to_string(),
            model_env: "LLM_MODEL".to_string(),
        }
    }
}

impl Default for CostDefaults {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
        }
    }
}

impl Default for RetryDefaults {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_strategy: "exponential".to_string(),
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
            multiplier: 2.0,
        }
    }
}

impl Default for ObservabilityDefaults {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl MigrationConfig {
    /// Parse `s` as TOML and check the resulting values.
    ///
    /// Returns `OssaError::ConfigError` if the TOML is malformed, carries
    /// unknown keys, or holds out-of-range values.
    pub fn from_toml_str(s: &str) -> OssaResult<Self> {
        let config: MigrationConfig = toml::from_str(s).map_err(|e| OssaError::ConfigError {
            reason: format!("failed to parse migration config TOML: {}", e),
        })?;
        config.check()?;
        Ok(config)
    }

    /// Read the file at `path` and parse it as migration configuration.
    pub fn from_file(path: &Path) -> OssaResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| OssaError::ConfigError {
            reason: format!("failed to read migration config '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Reject values no rule could sensibly emit.
    pub fn check(&self) -> OssaResult<()> {
        let retry = &self.retry;
        if retry.max_attempts == 0 {
            return Err(config_error("retry.max_attempts must be at least 1"));
        }
        if !BACKOFF_STRATEGIES.contains(&retry.backoff_strategy.as_str()) {
            return Err(config_error(format!(
                "retry.backoff_strategy '{}' is not one of {:?}",
                retry.backoff_strategy, BACKOFF_STRATEGIES
            )));
        }
        if retry.initial_delay_ms > retry.max_delay_ms {
            return Err(config_error(
                "retry.initial_delay_ms must not exceed retry.max_delay_ms",
            ));
        }
        if retry.multiplier.is_nan() || retry.multiplier < 1.0 {
            return Err(config_error("retry.multiplier must be at least 1.0"));
        }
        if !LOG_LEVELS.contains(&self.observability.log_level.as_str()) {
            return Err(config_error(format!(
                "observability.log_level '{}' is not one of {:?}",
                self.observability.log_level, LOG_LEVELS
            )));
        }
        if self.cost.currency.len() != 3 || !self.cost.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(config_error(format!(
                "cost.currency '{}' must be a three-letter ISO 4217 code",
                self.cost.currency
            )));
        }
        Ok(())
    }

    // ── Default blocks ───────────────────────────────────────────────────────

    /// Runtime-configurable model selection, disabled.
    pub fn runtime_block(&self) -> Value {
        json!({
            "enabled": false,
            "provider_env": self.llm.provider_env,
            "model_env": self.llm.model_env,
        })
    }

    /// Cost tracking with no budget alerts, disabled.
    pub fn cost_tracking_block(&self) -> Value {
        json!({
            "enabled": false,
            "currency": self.cost.currency,
            "budget_alerts": [],
        })
    }

    /// Retry with the configured backoff parameters, disabled.
    pub fn retry_block(&self) -> Value {
        json!({
            "enabled": false,
            "max_attempts": self.retry.max_attempts,
            "backoff_strategy": self.retry.backoff_strategy,
            "initial_delay_ms": self.retry.initial_delay_ms,
            "max_delay_ms": self.retry.max_delay_ms,
            "multiplier": self.retry.multiplier,
        })
    }

    /// Content filtering and guardrails, disabled.
    pub fn safety_block(&self) -> Value {
        json!({
            "content_filtering": { "enabled": false, "categories": [] },
            "guardrails": { "enabled": false, "rules": [] },
        })
    }

    /// Tracing, metrics, and logging, disabled.
    pub fn observability_block(&self) -> Value {
        json!({
            "tracing": { "enabled": false },
            "metrics": { "enabled": false },
            "logging": { "enabled": false, "level": self.observability.log_level },
        })
    }
}

fn config_error(reason: impl Into<String>) -> OssaError {
    OssaError::ConfigError {
        reason: reason.into(),
    }
}
