//! Custom error types for netpulse.
//!
//! All errors are explicit enum variants - no `Box<dyn Error>`, no
//! `anyhow::Result` in the library. The prober itself never lets these
//! escape its public boundary; they are folded into the probe outcome.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while setting up or driving a probe run.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Socket setup failed: {context} - {source}")]
    Setup {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Peer address did not resolve: {address}:{port}")]
    PeerUnresolvable { address: String, port: u16 },
}

/// Field-level validation failures. Raised at construction time, before a
/// probe starts.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid port: {port} - {reason}")]
    InvalidPort { port: u16, reason: String },
}

/// Errors from loading and validating the settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Settings file not found: {path}")]
    SettingsNotFound { path: PathBuf },

    #[error("Settings parse error: {message}")]
    SettingsParse { message: String },

    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },
}

/// Errors from the blob storage collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Blob not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("Storage IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },
}

/// Result type alias using ProbeError.
pub type ProbeResult<T> = Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::InvalidFieldValue {
            field: "request_id",
            value: "".to_string(),
            reason: "identifier cannot be empty".to_string(),
        };
        assert!(err.to_string().contains("request_id"));
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_error_chain() {
        let validation_err = ValidationError::InvalidPort {
            port: 0,
            reason: "Port must be non-zero".to_string(),
        };
        let probe_err: ProbeError = validation_err.into();
        assert!(matches!(probe_err, ProbeError::Validation(_)));
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::NotFound {
            bucket: "results".to_string(),
            key: "run-1.csv".to_string(),
        };
        assert_eq!(err.to_string(), "Blob not found: results/run-1.csv");
    }
}
