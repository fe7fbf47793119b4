//! Error types for the dyndns system
//!
//! This module defines all error types used throughout the crate.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for dyndns operations
pub type Result<T> = std::result::Result<T, Error>;

/// A single entry of a provider error chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCause {
    /// Provider error code
    pub code: i64,
    /// Human readable message
    pub message: String,
}

impl fmt::Display for ProviderCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

/// Core error type for the dyndns system
#[derive(Error, Debug)]
pub enum Error {
    /// The WAN IP lookup failed at the transport or protocol level
    #[error("IP resolution failed: {0}")]
    Resolution(String),

    /// The resolver answered without any answer records
    #[error("no DNS answer received for {0}")]
    NoAnswer(String),

    /// The first answer record was not a TXT record
    #[error("DNS answer is not a TXT record (got {0})")]
    UnexpectedRecordType(String),

    /// The TXT answer carried no character-strings
    #[error("TXT record for {0} is empty")]
    EmptyRecord(String),

    /// The TXT answer is not an IP literal
    #[error("invalid IP address format: {0}")]
    InvalidAddress(String),

    /// Zone or record not found
    #[error("not found: {0}")]
    NotFound(String),

    /// More than one match where exactly one was expected
    #[error("ambiguous result: {0}")]
    Ambiguous(String),

    /// The provider API reported a failure
    #[error("provider error {code}: {message}{}", format_chain(.chain))]
    Provider {
        /// Provider error code (HTTP status when the body carries none)
        code: i64,
        /// Error message
        message: String,
        /// Nested causes reported by the provider
        chain: Vec<ProviderCause>,
    },

    /// A network call exceeded its deadline
    #[error("{operation} timed out after {}s", .after.as_secs_f64())]
    Timeout {
        /// What was being attempted
        operation: String,
        /// The deadline that expired
        after: Duration,
    },

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

fn format_chain(chain: &[ProviderCause]) -> String {
    if chain.is_empty() {
        return String::new();
    }
    let causes: Vec<String> = chain.iter().map(ToString::to_string).collect();
    format!(" (caused by: {})", causes.join(" <- "))
}

impl Error {
    /// Create a resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create a "no answer" error for the queried name
    pub fn no_answer(target: impl Into<String>) -> Self {
        Self::NoAnswer(target.into())
    }

    /// Create an unexpected record type error
    pub fn unexpected_record_type(record_type: impl Into<String>) -> Self {
        Self::UnexpectedRecordType(record_type.into())
    }

    /// Create an empty record error for the queried name
    pub fn empty_record(target: impl Into<String>) -> Self {
        Self::EmptyRecord(target.into())
    }

    /// Create an invalid address error
    pub fn invalid_address(value: impl Into<String>) -> Self {
        Self::InvalidAddress(value.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an ambiguous result error
    pub fn ambiguous(msg: impl Into<String>) -> Self {
        Self::Ambiguous(msg.into())
    }

    /// Create a provider error without nested causes
    pub fn provider(code: i64, message: impl Into<String>) -> Self {
        Self::Provider {
            code,
            message: message.into(),
            chain: Vec::new(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after,
        }
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for the "zone or record does not exist" kind
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// True when a deadline expired
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display_includes_chain() {
        let err = Error::Provider {
            code: 1004,
            message: "DNS Validation Error".to_string(),
            chain: vec![ProviderCause {
                code: 9005,
                message: "Content for A record is invalid".to_string(),
            }],
        };

        let text = err.to_string();
        assert!(text.contains("1004"));
        assert!(text.contains("DNS Validation Error"));
        assert!(text.contains("Content for A record is invalid (9005)"));
    }

    #[test]
    fn test_provider_error_display_without_chain() {
        let err = Error::provider(10000, "Authentication error");
        assert_eq!(err.to_string(), "provider error 10000: Authentication error");
    }

    #[test]
    fn test_kind_predicates() {
        assert!(Error::not_found("record home.example.com").is_not_found());
        assert!(!Error::provider(404, "record not found").is_not_found());
        assert!(Error::timeout("find record", Duration::from_secs(5)).is_timeout());
        assert!(!Error::http("connection reset").is_timeout());
    }

    #[test]
    fn test_timeout_display() {
        let err = Error::timeout("reconcile home.example.com", Duration::from_secs(5));
        assert_eq!(err.to_string(), "reconcile home.example.com timed out after 5s");
    }

    /// Every variant is built through a helper; the match has no wildcard so
    /// a variant without a constructor fails to compile here
    #[test]
    fn test_every_kind_has_a_constructor() {
        let errors = [
            Error::resolution("socket closed"),
            Error::no_answer("whoami.cloudflare"),
            Error::unexpected_record_type("A"),
            Error::empty_record("whoami.cloudflare"),
            Error::invalid_address("hello"),
            Error::not_found("zone example.com"),
            Error::ambiguous("2 zones named example.com"),
            Error::provider(9109, "Invalid access token"),
            Error::timeout("list zones", Duration::from_secs(5)),
            Error::http("connection refused"),
            Error::config("CFDD_TOKEN is required"),
        ];

        let kinds: Vec<&str> = errors
            .iter()
            .map(|e| match e {
                Error::Resolution(_) => "resolution",
                Error::NoAnswer(_) => "no_answer",
                Error::UnexpectedRecordType(_) => "unexpected_record_type",
                Error::EmptyRecord(_) => "empty_record",
                Error::InvalidAddress(_) => "invalid_address",
                Error::NotFound(_) => "not_found",
                Error::Ambiguous(_) => "ambiguous",
                Error::Provider { .. } => "provider",
                Error::Timeout { .. } => "timeout",
                Error::Http(_) => "http",
                Error::Config(_) => "config",
            })
            .collect();

        let mut unique = kinds.clone();
        unique.dedup();
        assert_eq!(unique.len(), errors.len());
    }
}
