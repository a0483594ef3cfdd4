//! Logging configuration shared by the watcher and the ingestion service

use std::env;

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Logging configuration for ragsync
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level for this crate when `RUST_LOG` is not set
    pub level: Level,
    /// Whether to include file and line numbers
    pub include_location: bool,
    /// Whether to include timestamps
    pub include_timestamps: bool,
    /// Whether to use JSON formatting
    pub json_format: bool,
    /// Whether to log span enter/exit
    pub log_spans: bool,
    /// Environment filter string, overrides `level` when present
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            include_location: false,
            include_timestamps: true,
            json_format: false,
            log_spans: false,
            env_filter: None,
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

impl LoggingConfig {
    /// Create a new logging configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            level: env::var("LOG_LEVEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.level),
            include_location: env_flag("LOG_INCLUDE_LOCATION", defaults.include_location),
            include_timestamps: env_flag("LOG_INCLUDE_TIMESTAMPS", defaults.include_timestamps),
            json_format: env_flag("LOG_JSON_FORMAT", defaults.json_format),
            log_spans: env_flag("LOG_SPANS", defaults.log_spans),
            env_filter: env::var("RUST_LOG").ok(),
        }
    }

    /// Initialize the global tracing subscriber
    pub fn init_tracing(&self) -> Result<()> {
        let env_filter = self.build_env_filter()?;
        let span_events = if self.log_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let fmt_layer = if self.json_format {
            let layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_file(self.include_location)
                .with_line_number(self.include_location)
                .with_target(true)
                .with_span_events(span_events);
            if self.include_timestamps {
                layer.boxed()
            } else {
                layer.without_time().boxed()
            }
        } else {
            let layer = fmt::layer()
                .with_file(self.include_location)
                .with_line_number(self.include_location)
                .with_target(false)
                .with_span_events(span_events);
            if self.include_timestamps {
                layer.boxed()
            } else {
                layer.without_time().boxed()
            }
        };

        Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }

    fn build_env_filter(&self) -> Result<EnvFilter> {
        let filter = if let Some(ref env_filter) = self.env_filter {
            EnvFilter::try_new(env_filter)?
        } else {
            EnvFilter::default()
                .add_directive(format!("ragsync_indexer={}", self.level).parse()?)
                .add_directive(format!("ragsync={}", self.level).parse()?)
                .add_directive(format!("ingest_api={}", self.level).parse()?)
                .add_directive("tower_http=info".parse()?)
                .add_directive("hyper=warn".parse()?)
                .add_directive("reqwest=warn".parse()?)
                .add_directive("qdrant_client=info".parse()?)
        };

        Ok(filter)
    }
}

/// Initialize default logging for the application
pub fn init_default_logging() -> Result<()> {
    LoggingConfig::from_env().init_tracing()
}

/// Initialize production logging with JSON format
pub fn init_production_logging() -> Result<()> {
    let mut config = LoggingConfig::from_env();
    config.json_format = true;
    config.include_location = false;
    config.log_spans = false;
    config.init_tracing()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_builds() {
        let fixture = LoggingConfig::default();
        assert!(fixture.build_env_filter().is_ok());
    }

    #[test]
    fn test_explicit_filter_wins() {
        let fixture = LoggingConfig { env_filter: Some("debug".to_string()), ..Default::default() };
        let actual = fixture.build_env_filter().unwrap().to_string();
        assert_eq!(actual, "debug");
    }
}
