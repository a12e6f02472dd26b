use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::kem::types::SharedSecretLength;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Hybrid KEM service configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KemServiceConfig {
    /// Run classical-only when no PQ backend is found. When false, a missing
    /// backend fails initialization with `INIT_FAILED_NO_FALLBACK`.
    pub allow_fallback: bool,
    /// Skip backend probing and run classical-only.
    pub force_classical_only: bool,
    /// Length of every shared secret handed out, in both modes.
    pub shared_secret_len: SharedSecretLength,
    /// Weight of the newest sample in the smoothed latency averages (0.0, 1.0].
    pub latency_smoothing: f64,
}

impl Default for KemServiceConfig {
    fn default() -> Self {
        Self {
            allow_fallback: true,
            force_classical_only: false,
            shared_secret_len: SharedSecretLength::Bytes32,
            latency_smoothing: 0.2,
        }
    }
}

impl KemServiceConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: Self =
            serde_json::from_str(json).context("invalid hybrid KEM service config")?;
        Ok(config)
    }

    /// Smoothing factor clamped into (0, 1]; non-finite values use the default.
    pub(crate) fn smoothing(&self) -> f64 {
        if !self.latency_smoothing.is_finite() || self.latency_smoothing <= 0.0 {
            return Self::default().latency_smoothing;
        }
        self.latency_smoothing.min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KemServiceConfig::default();
        assert!(config.allow_fallback);
        assert!(!config.force_classical_only);
        assert_eq!(config.shared_secret_len.bytes(), 32);
    }

    #[test]
    fn test_from_json_partial() {
        let config = KemServiceConfig::from_json(
            r#"{ "allow_fallback": false, "shared_secret_len": "64" }"#,
        )
        .unwrap();
        assert!(!config.allow_fallback);
        assert_eq!(config.shared_secret_len, SharedSecretLength::Bytes64);
        assert_eq!(config.latency_smoothing, 0.2);
    }

    #[test]
    fn test_from_json_invalid() {
        let err = KemServiceConfig::from_json("{ \"allow_fallback\": 3 }").unwrap_err();
        assert!(err.to_string().contains("invalid hybrid KEM service config"));
    }

    #[test]
    fn test_smoothing_clamped() {
        let mut config = KemServiceConfig {
            latency_smoothing: 5.0,
            ..Default::default()
        };
        assert_eq!(config.smoothing(), 1.0);
        config.latency_smoothing = -1.0;
        assert_eq!(config.smoothing(), 0.2);
        config.latency_smoothing = f64::NAN;
        assert_eq!(config.smoothing(), 0.2);
    }
}
