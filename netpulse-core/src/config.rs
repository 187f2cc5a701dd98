// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML settings parser with strict schema validation.
//!
//! Every tunable of the probe loop lives here with its default, so the
//! attempt cap and the two receive timeouts are configuration rather than
//! loop constants. Any invalid field fails the load before a probe starts.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, ValidationError};
use crate::types::{Port, RequestId};

/// Raw settings as parsed from YAML (before validation).
#[derive(Debug, Deserialize)]
struct RawProbeSettings {
    #[serde(default = "default_probe_timeout_ms")]
    probe_timeout_ms: u64,
    #[serde(default = "default_steady_timeout_ms")]
    steady_timeout_ms: u64,
    #[serde(default = "default_failure_threshold")]
    failure_threshold: u32,
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,
}

fn default_probe_timeout_ms() -> u64 {
    4 // fail fast when no peer is reachable at all
}

fn default_steady_timeout_ms() -> u64 {
    4000
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_max_attempts() -> u32 {
    1000
}

/// Validated probe tunables.
///
/// `probe_timeout` bounds the very first receive; `steady_timeout` bounds
/// every receive after the first successful exchange.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub probe_timeout: Duration,
    pub steady_timeout: Duration,
    /// Consecutive receive timeouts after which the run aborts.
    pub failure_threshold: u32,
    /// Hard cap on loop iterations, convergence or not.
    pub max_attempts: u32,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_millis(default_probe_timeout_ms()),
            steady_timeout: Duration::from_millis(default_steady_timeout_ms()),
            failure_threshold: default_failure_threshold(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Settings loader with strict validation.
pub struct SettingsLoader;

impl SettingsLoader {
    /// Load and validate settings from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> Result<ProbeSettings, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::SettingsNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            context: "reading settings file",
            source: e,
        })?;

        Self::load_string(&content)
    }

    /// Load and validate settings from a YAML string.
    pub fn load_string(content: &str) -> Result<ProbeSettings, ConfigError> {
        let raw: RawProbeSettings =
            serde_yaml::from_str(content).map_err(|e| ConfigError::SettingsParse {
                message: format!("YAML parse error: {}", e),
            })?;

        Self::validate(raw)
    }

    fn validate(raw: RawProbeSettings) -> Result<ProbeSettings, ConfigError> {
        if raw.probe_timeout_ms == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "probe_timeout_ms",
                value: raw.probe_timeout_ms.to_string(),
                reason: "Probe timeout must be greater than 0".to_string(),
            }
            .into());
        }

        if raw.steady_timeout_ms < raw.probe_timeout_ms {
            return Err(ValidationError::InvalidFieldValue {
                field: "steady_timeout_ms",
                value: raw.steady_timeout_ms.to_string(),
                reason: format!(
                    "Steady timeout must not be shorter than the probe timeout ({}ms)",
                    raw.probe_timeout_ms
                ),
            }
            .into());
        }

        if raw.failure_threshold == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "failure_threshold",
                value: raw.failure_threshold.to_string(),
                reason: "Failure threshold must be greater than 0".to_string(),
            }
            .into());
        }

        if raw.max_attempts == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "max_attempts",
                value: raw.max_attempts.to_string(),
                reason: "Attempt cap must be greater than 0".to_string(),
            }
            .into());
        }

        if raw.failure_threshold > raw.max_attempts {
            return Err(ValidationError::InvalidFieldValue {
                field: "failure_threshold",
                value: raw.failure_threshold.to_string(),
                reason: format!(
                    "Failure threshold must not exceed the attempt cap ({})",
                    raw.max_attempts
                ),
            }
            .into());
        }

        Ok(ProbeSettings {
            probe_timeout: Duration::from_millis(raw.probe_timeout_ms),
            steady_timeout: Duration::from_millis(raw.steady_timeout_ms),
            failure_threshold: raw.failure_threshold,
            max_attempts: raw.max_attempts,
        })
    }
}

/// One probe run's inputs.
///
/// The peer is an echo responder: it returns every datagram unchanged and
/// stops responding when it receives the `"stop"` sentinel.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    /// Identifier carried as the payload of every probing datagram.
    pub request_id: RequestId,
    /// Echo peer host name or IP address.
    pub peer_address: String,
    /// Echo peer UDP port.
    pub peer_port: Port,
    /// Local port the peer's echoes arrive on. Defaults to `peer_port`,
    /// which is the deployed topology; override it to run a probe and a
    /// responder on one host.
    pub listen_port: Option<Port>,
    /// Consecutive non-improving measurements required for convergence.
    /// Zero is treated as 1.
    pub repetitions: u32,
    /// Keep the per-attempt time series and hand it to storage.
    pub debug: bool,
}

impl ProbeRequest {
    /// Create a request with validation. Repetitions default to 1 and
    /// `debug` to false; adjust the public fields afterwards as needed.
    pub fn new(
        request_id: RequestId,
        peer_address: impl Into<String>,
        peer_port: Port,
    ) -> Result<Self, ValidationError> {
        let peer_address = peer_address.into();

        if peer_address.is_empty() {
            return Err(ValidationError::InvalidFieldValue {
                field: "peer_address",
                value: peer_address,
                reason: "Peer address cannot be empty".to_string(),
            });
        }

        Ok(Self {
            request_id,
            peer_address,
            peer_port,
            listen_port: None,
            repetitions: 1,
            debug: false,
        })
    }

    /// The convergence threshold, with zero normalized to 1.
    pub fn convergence_threshold(&self) -> u32 {
        self.repetitions.max(1)
    }

    /// The port the receive socket binds to.
    pub fn effective_listen_port(&self) -> Port {
        self.listen_port.unwrap_or(self.peer_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let settings = SettingsLoader::load_string("{}").unwrap();
        assert_eq!(settings.probe_timeout, Duration::from_millis(4));
        assert_eq!(settings.steady_timeout, Duration::from_millis(4000));
        assert_eq!(settings.failure_threshold, 5);
        assert_eq!(settings.max_attempts, 1000);
    }

    #[test]
    fn test_default_matches_loader_defaults() {
        let loaded = SettingsLoader::load_string("{}").unwrap();
        let default = ProbeSettings::default();
        assert_eq!(loaded.probe_timeout, default.probe_timeout);
        assert_eq!(loaded.max_attempts, default.max_attempts);
    }

    #[test]
    fn test_valid_settings() {
        let yaml = r#"
probe_timeout_ms: 10
steady_timeout_ms: 2000
failure_threshold: 3
max_attempts: 500
"#;
        let settings = SettingsLoader::load_string(yaml).unwrap();
        assert_eq!(settings.probe_timeout, Duration::from_millis(10));
        assert_eq!(settings.steady_timeout, Duration::from_millis(2000));
        assert_eq!(settings.failure_threshold, 3);
        assert_eq!(settings.max_attempts, 500);
    }

    #[test]
    fn test_zero_probe_timeout_rejected() {
        let result = SettingsLoader::load_string("probe_timeout_ms: 0");
        assert!(result.is_err());
    }

    #[test]
    fn test_inverted_timeouts_rejected() {
        let yaml = r#"
probe_timeout_ms: 100
steady_timeout_ms: 50
"#;
        assert!(SettingsLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_zero_failure_threshold_rejected() {
        assert!(SettingsLoader::load_string("failure_threshold: 0").is_err());
    }

    #[test]
    fn test_zero_attempt_cap_rejected() {
        assert!(SettingsLoader::load_string("max_attempts: 0").is_err());
    }

    #[test]
    fn test_threshold_above_cap_rejected() {
        let yaml = r#"
failure_threshold: 20
max_attempts: 10
"#;
        assert!(SettingsLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = SettingsLoader::load_file("/nonexistent/netpulse.yaml");
        assert!(matches!(result, Err(ConfigError::SettingsNotFound { .. })));
    }

    #[test]
    fn test_request_empty_address_rejected() {
        let id = RequestId::new("run-1").unwrap();
        let port = Port::new(11211).unwrap();
        assert!(ProbeRequest::new(id, "", port).is_err());
    }

    #[test]
    fn test_request_defaults() {
        let id = RequestId::new("run-1").unwrap();
        let port = Port::new(11211).unwrap();
        let req = ProbeRequest::new(id, "10.0.0.7", port).unwrap();
        assert_eq!(req.repetitions, 1);
        assert!(!req.debug);
        assert_eq!(req.effective_listen_port(), port);
    }

    #[test]
    fn test_zero_repetitions_normalized() {
        let id = RequestId::new("run-1").unwrap();
        let port = Port::new(11211).unwrap();
        let mut req = ProbeRequest::new(id, "10.0.0.7", port).unwrap();
        req.repetitions = 0;
        assert_eq!(req.convergence_threshold(), 1);
    }

    #[test]
    fn test_listen_port_override() {
        let id = RequestId::new("run-1").unwrap();
        let port = Port::new(11211).unwrap();
        let mut req = ProbeRequest::new(id, "10.0.0.7", port).unwrap();
        req.listen_port = Some(Port::new(11212).unwrap());
        assert_eq!(req.effective_listen_port().value(), 11212);
    }
}
