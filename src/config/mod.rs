//! Configuration management

use crate::domain::dialing::RouteRuleConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub events: EventsConfig,
    pub dial_plan: DialPlanConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub routes: Vec<RouteRuleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Worker tasks delivering asynchronous events
    pub workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialPlanConfig {
    /// Let the first path segment of the inbound request pick the entry point
    pub request_override: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            events: EventsConfig { workers: 4 },
            dial_plan: DialPlanConfig {
                request_override: true,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            routes: Vec::new(),
        }
    }
}

impl Config {
    /// Load defaults, then an optional TOML file, then `DIALPLAN_*` variables
    ///
    /// Nested keys use `__`, e.g. `DIALPLAN_EVENTS__WORKERS=8`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let mut builder = ::config::Config::builder()
            .set_default("events.workers", defaults.events.workers as i64)?
            .set_default("dial_plan.request_override", defaults.dial_plan.request_override)?
            .set_default("logging.level", defaults.logging.level)?;

        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path));
        }

        let config = builder
            .add_source(
                ::config::Environment::with_prefix("DIALPLAN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
