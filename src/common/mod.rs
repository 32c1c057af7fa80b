//! Common Infrastructure Module
//!
//! This module contains:
//! - Versioned configuration loading (environment or TOML)
//! - Structured logging setup
//! - The root custody error type

pub mod config;
pub mod error;
pub mod logging;

// Re-exports for convenience
pub use config::{ConfigError, CustodyConfig, Network, CONFIG_VERSION};
pub use error::{CustodyError, Result};
pub use logging::{
    generate_correlation_id, init_from_config, init_logging, log_custody_event,
    log_custody_failure, log_security_event, EventCategory, LogEvent, LogLevel, LoggingError,
};
