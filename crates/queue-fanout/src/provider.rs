//! Provider types and configuration.

use crate::error::ConfigurationError;
use crate::idempotency::DEFAULT_IDEMPOTENCY_CAPACITY;
use crate::retry::{
    RetryPolicy, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_DELAY,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Optional configuration file, resolved relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config/queue";

/// Prefix of environment variables, e.g. `QUEUE__PROVIDERS=sqs,rabbitmq`
pub const ENV_PREFIX: &str = "QUEUE";

/// Enumeration of known queue providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProviderType {
    AwsSqs,
    RabbitMq,
    InMemory,
}

impl ProviderType {
    /// Name stamped on delivered messages and used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwsSqs => "sqs",
            Self::RabbitMq => "rabbitmq",
            Self::InMemory => "in-memory",
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "SQS" | "AWS_SQS" => Ok(Self::AwsSqs),
            "RABBITMQ" | "RABBIT_MQ" => Ok(Self::RabbitMq),
            "IN_MEMORY" | "MEMORY" => Ok(Self::InMemory),
            other => Err(ConfigurationError::Invalid {
                message: format!("unknown queue provider '{}'", other),
            }),
        }
    }
}

impl TryFrom<String> for ProviderType {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProviderType> for String {
    fn from(value: ProviderType) -> Self {
        value.as_str().to_string()
    }
}

/// Retry settings in configuration-friendly units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub attempt_timeout_ms: Option<u64>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay_ms: DEFAULT_INITIAL_DELAY.as_millis() as u64,
            max_delay_ms: DEFAULT_MAX_DELAY.as_millis() as u64,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            attempt_timeout_ms: None,
        }
    }
}

impl RetrySettings {
    pub fn to_policy(&self) -> RetryPolicy {
        let mut policy = RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_millis(self.max_delay_ms),
            self.backoff_multiplier,
        );
        if let Some(timeout_ms) = self.attempt_timeout_ms {
            policy = policy.with_attempt_timeout(Duration::from_millis(timeout_ms));
        }
        policy
    }
}

/// Configuration consumed when wiring queue clients
///
/// All fields carry defaults, so an unconfigured environment yields a single
/// SQS provider with a 1000-entry idempotency store and three publish attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    /// Providers to publish to and subscribe from, in fan-out order
    pub providers: Vec<ProviderType>,

    /// Capacity of the shared in-memory idempotency store
    pub idempotency_capacity: usize,

    pub retry: RetrySettings,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            providers: vec![ProviderType::AwsSqs],
            idempotency_capacity: DEFAULT_IDEMPOTENCY_CAPACITY,
            retry: RetrySettings::default(),
        }
    }
}

impl QueueSettings {
    /// Load settings from `config/queue.*` (optional) and `QUEUE__*` variables
    pub fn load() -> Result<Self, ConfigurationError> {
        Self::load_with(None, None)
    }

    /// Load settings with an explicit file and/or environment map
    ///
    /// Sources are applied in order, later ones overriding earlier ones:
    ///  1. `config/queue.{toml,yaml,json}` if present
    ///  2. `file`, which must exist when given
    ///  3. environment variables prefixed `QUEUE__`, or `env` instead of the
    ///     process environment when given
    pub fn load_with(
        file: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigurationError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false));

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let environment = config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("providers")
            .source(env);

        let settings: Self = builder.add_source(environment).build()?.try_deserialize()?;
        settings.validate()?;

        tracing::debug!(
            providers = ?settings.providers,
            idempotency_capacity = settings.idempotency_capacity,
            max_attempts = settings.retry.max_attempts,
            "Loaded queue settings"
        );

        Ok(settings)
    }

    /// Check the settings for values the clients cannot work with
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.providers.is_empty() {
            return Err(ConfigurationError::Invalid {
                message: "at least one queue provider must be selected".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if !seen.insert(provider) {
                return Err(ConfigurationError::Invalid {
                    message: format!("queue provider '{}' selected more than once", provider),
                });
            }
        }

        if self.idempotency_capacity == 0 {
            return Err(ConfigurationError::Invalid {
                message: "idempotency_capacity must be greater than zero".to_string(),
            });
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigurationError::Invalid {
                message: "retry.max_attempts must be greater than zero".to_string(),
            });
        }

        if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
            return Err(ConfigurationError::Invalid {
                message: "retry.backoff_multiplier must be a finite value of at least 1.0"
                    .to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
