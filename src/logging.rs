//! Tracing setup for binaries embedding this crate.
//!
//! The library itself only ever calls `tracing::{info,warn,debug,trace}!` —
//! nothing in `src/` other than this module touches a global subscriber.

use std::env;

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Registry;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Logging configuration, overridable via environment variables.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    pub include_location: bool,
    pub json_format: bool,
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            include_location: false,
            json_format: false,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        let level = env::var("CODEVAULT_LOG_LEVEL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(Level::INFO);
        let include_location = env::var("CODEVAULT_LOG_LOCATION")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(false);
        let json_format = env::var("CODEVAULT_LOG_JSON")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(false);
        let env_filter = env::var("RUST_LOG").ok();

        Self {
            level,
            include_location,
            json_format,
            env_filter,
        }
    }

    pub fn init(&self) -> Result<()> {
        let filter = self.build_env_filter()?;

        let fmt_layer = fmt::layer()
            .with_file(self.include_location)
            .with_line_number(self.include_location)
            .with_target(true);

        if self.json_format {
            Registry::default()
                .with(filter)
                .with(fmt_layer.json())
                .try_init()?;
        } else {
            Registry::default()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }

        Ok(())
    }

    fn build_env_filter(&self) -> Result<EnvFilter> {
        if let Some(ref directive) = self.env_filter {
            return Ok(EnvFilter::try_new(directive)?);
        }

        Ok(EnvFilter::default()
            .add_directive(format!("codevault={}", self.level).parse()?)
            .add_directive("tokio=info".parse()?))
    }
}

pub fn init_default_logging() -> Result<()> {
    LoggingConfig::from_env().init()
}
