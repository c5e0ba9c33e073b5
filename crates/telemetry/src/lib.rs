//! Structured logging for droidplan
//!
//! - `tracing` subscriber setup (compact text or JSON lines)
//! - Filter precedence: `DROIDPLAN_LOG`, then CLI verbosity, then config level
//! - Per-run session id for correlating log lines
//! - Scoped timers

use droidplan_core::config::LoggingConfig;
use once_cell::sync::Lazy;
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

/// Environment variable that overrides every other filter source
pub const LOG_ENV: &str = "DROIDPLAN_LOG";

/// Global session ID for correlating logs
static SESSION_ID: Lazy<String> = Lazy::new(|| Uuid::new_v4().to_string());

/// Logging options resolved from CLI flags and configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Filter directive used when `DROIDPLAN_LOG` is unset
    pub log_level: String,
    /// Emit JSON lines
    pub json: bool,
    /// Include the event target in each line
    pub show_target: bool,
}

impl TelemetryConfig {
    /// Combine configuration with `-v` / `-q` flags
    pub fn from_cli(config: &LoggingConfig, verbose: u8, quiet: bool) -> Self {
        let log_level = if quiet {
            "error".to_string()
        } else {
            match verbose {
                0 => config.level.clone(),
                1 => "info".to_string(),
                2 => "debug".to_string(),
                _ => "trace".to_string(),
            }
        };

        Self {
            log_level,
            json: config.json,
            show_target: verbose >= 2,
        }
    }
}

/// Initialize the global subscriber; logs go to stderr
pub fn init_with_config(config: TelemetryConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(config.show_target)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
    };
    result.map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    tracing::debug!(
        session_id = %session_id(),
        version = env!("CARGO_PKG_VERSION"),
        "Logging initialized"
    );

    Ok(())
}

/// Get the current session ID
pub fn session_id() -> &'static str {
    &SESSION_ID
}

/// Timer for measuring operation duration
#[derive(Debug)]
pub struct Timer {
    name: String,
    start: Instant,
}

impl Timer {
    /// Start a new timer
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
        }
    }

    /// Stop the timer and log the duration
    pub fn stop(self) -> Duration {
        let duration = self.start.elapsed();
        tracing::debug!(
            operation = %self.name,
            duration_ms = duration.as_millis(),
            "Timer completed"
        );
        duration
    }
}
