//! Structured Logging for the BitDSM custody core
//!
//! - JSON or pretty output selected from configuration
//! - Correlation IDs tying every log line of one custody call together
//! - Security events for accepted and rejected authorizations
//!
//! # Usage
//!
//! ```rust,ignore
//! use bitdsm::common::logging::{init_logging, LogLevel};
//!
//! init_logging(LogLevel::Info, true)?;
//! tracing::info!(target: "bitdsm::custody", pod = %pod, "confirming deposit");
//! ```

use serde::Serialize;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::types::CustodyEvent;

// ============================================================================
// Log Levels
// ============================================================================

/// Application log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl From<&str> for LogLevel {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

// ============================================================================
// Structured Event Types
// ============================================================================

/// Event categories for structured logging
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Deposit confirmations
    Deposit,
    /// Withdrawal signing and confirmation
    Withdrawal,
    /// Operator Bitcoin address verification
    Address,
    /// Authorization failures
    Security,
    /// Startup, configuration
    System,
}

/// Structured log event
#[derive(Debug, Serialize)]
pub struct LogEvent {
    /// Event timestamp (RFC 3339)
    pub timestamp: String,
    /// Log level
    pub level: String,
    /// Event category
    pub category: EventCategory,
    /// Human-readable message
    pub message: String,
    /// Correlation ID of the custody call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Additional structured data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
}

/// Error details for error events
#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl LogEvent {
    /// Create a new log event
    pub fn new(level: LogLevel, category: EventCategory, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level: level.as_filter().to_uppercase(),
            category,
            message: message.into(),
            correlation_id: None,
            data: None,
            error: None,
        }
    }

    /// Add correlation ID
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Add structured data
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Add error details
    pub fn with_error(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.error = Some(ErrorDetails {
            code: code.into(),
            message: message.into(),
        });
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "{{\"error\": \"failed to serialize log\", \"message\": \"{}\"}}",
                self.message
            )
        })
    }
}

// ============================================================================
// Event Logging
// ============================================================================

/// Record of an authorization attempt: INFO when accepted, WARN when rejected
pub fn security_record(
    operation: &str,
    success: bool,
    details: serde_json::Value,
    correlation_id: Option<&str>,
) -> LogEvent {
    let level = if success { LogLevel::Info } else { LogLevel::Warn };
    let event = LogEvent::new(level, EventCategory::Security, operation).with_data(
        serde_json::json!({
            "success": success,
            "details": details
        }),
    );

    match correlation_id {
        Some(id) => event.with_correlation_id(id),
        None => event,
    }
}

/// Log an accepted or rejected authorization attempt
pub fn log_security_event(
    operation: &str,
    success: bool,
    details: serde_json::Value,
    correlation_id: Option<&str>,
) {
    let event = security_record(operation, success, details, correlation_id);

    if success {
        tracing::info!(target: "bitdsm::security", "{}", event.to_json());
    } else {
        tracing::warn!(target: "bitdsm::security", "{}", event.to_json());
    }
}

/// Log a failed custody call
pub fn log_custody_failure(operation: &str, code: &str, message: &str, correlation_id: &str) {
    let event = LogEvent::new(LogLevel::Error, EventCategory::System, operation)
        .with_correlation_id(correlation_id)
        .with_error(code, message);

    tracing::error!(target: "bitdsm::custody", "{}", event.to_json());
}

/// Record of an emitted custody event, keyed by pod (null for address attestations)
pub fn custody_event_record(event: &CustodyEvent, correlation_id: Option<&str>) -> LogEvent {
    let category = match event {
        CustodyEvent::BitcoinDepositConfirmed { .. } => EventCategory::Deposit,
        CustodyEvent::BitcoinWithdrawalTransactionSigned { .. }
        | CustodyEvent::BitcoinWithdrawalConfirmed { .. } => EventCategory::Withdrawal,
        CustodyEvent::BtcAddressVerified { .. } => EventCategory::Address,
    };

    let data = serde_json::json!({
        "pod": event.pod(),
        "event": serde_json::to_value(event).unwrap_or(serde_json::Value::Null),
    });
    let log = LogEvent::new(LogLevel::Info, category, event.name()).with_data(data);

    match correlation_id {
        Some(id) => log.with_correlation_id(id),
        None => log,
    }
}

/// Log an emitted custody event
pub fn log_custody_event(event: &CustodyEvent, correlation_id: Option<&str>) {
    let log = custody_event_record(event, correlation_id);
    tracing::info!(target: "bitdsm::events", "{}", log.to_json());
}

// ============================================================================
// Initialization
// ============================================================================

/// Initialize the logging system
///
/// `RUST_LOG` takes precedence over `level` when set.
pub fn init_logging(level: LogLevel, json_format: bool) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bitdsm={}", level.as_filter())));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))?;
    }

    Ok(())
}

/// Initialize logging from CustodyConfig
pub fn init_from_config(config: &super::config::CustodyConfig) -> Result<(), LoggingError> {
    init_logging(LogLevel::from(config.log_level.as_str()), config.json_logs)
}

/// Logging errors
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to initialize logging: {0}")]
    InitFailed(String),
}

/// Generate a unique correlation ID for one custody call
pub fn generate_correlation_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EthAddress;

    #[test]
    fn test_log_event_serialization() {
        let event = LogEvent::new(LogLevel::Warn, EventCategory::Security, "confirm_deposit")
            .with_correlation_id("call-123")
            .with_data(serde_json::json!({"pod": "0xabc"}))
            .with_error("UNAUTHORIZED_SIGNER", "wrong key");

        let json = event.to_json();
        assert!(json.contains("confirm_deposit"));
        assert!(json.contains("call-123"));
        assert!(json.contains("UNAUTHORIZED_SIGNER"));
        assert!(json.contains("\"level\":\"WARN\""));
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from("debug"), LogLevel::Debug);
        assert_eq!(LogLevel::from("INFO"), LogLevel::Info);
        assert_eq!(LogLevel::from("warning"), LogLevel::Warn);
        assert_eq!(LogLevel::from("unknown"), LogLevel::Info);
    }

    #[test]
    fn test_correlation_ids_are_unique() {
        let id1 = generate_correlation_id();
        let id2 = generate_correlation_id();
        assert_eq!(id1.len(), 32);
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_security_record_levels() {
        let accepted = security_record(
            "confirm_deposit",
            true,
            serde_json::json!({"operator": "0x01"}),
            Some("call-7"),
        );
        assert_eq!(accepted.level, "INFO");
        assert_eq!(accepted.correlation_id.as_deref(), Some("call-7"));
        assert_eq!(accepted.data.as_ref().unwrap()["success"], true);

        let rejected = security_record("confirm_deposit", false, serde_json::json!({}), None);
        assert_eq!(rejected.level, "WARN");
        assert!(rejected.correlation_id.is_none());
    }

    #[test]
    fn test_custody_event_record_carries_pod() {
        let pod = EthAddress::new([1u8; 20]);
        let deposit = CustodyEvent::BitcoinDepositConfirmed {
            pod,
            operator: EthAddress::new([2u8; 20]),
            amount_sats: 50_000,
        };
        let record = custody_event_record(&deposit, Some("call-2"));
        let data = record.data.unwrap();
        assert_eq!(data["pod"], pod.to_string());
        assert_eq!(data["event"]["amount_sats"], 50_000);

        let verified = CustodyEvent::BtcAddressVerified {
            operator: EthAddress::new([2u8; 20]),
            btc_address: "tb1qexample".to_string(),
        };
        let record = custody_event_record(&verified, None);
        assert!(record.data.unwrap()["pod"].is_null());
    }

    #[test]
    fn test_custody_event_logging_does_not_panic() {
        let event = CustodyEvent::BitcoinDepositConfirmed {
            pod: EthAddress::new([1u8; 20]),
            operator: EthAddress::new([2u8; 20]),
            amount_sats: 50_000,
        };
        log_custody_event(&event, Some("call-1"));
    }
}
