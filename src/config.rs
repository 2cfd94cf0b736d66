use folio_caps::ProbeConfig;
use folio_particles::ParticleConfig;
use folio_render::{SupervisorConfig, DEFAULT_FAULT_SIGNATURES};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Everything a session can be tuned with. Every field falls back to its default, so a
/// host only spells out what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub probe: ProbeConfig,
    pub supervisor: SupervisorConfig,
    pub particles: ParticleConfig,
    /// Error-message substrings treated as the integration-layer incompatibility.
    pub fault_signatures: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            probe: ProbeConfig::default(),
            supervisor: SupervisorConfig::default(),
            particles: ParticleConfig::default(),
            fault_signatures: DEFAULT_FAULT_SIGNATURES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_env_overrides(mut self) -> Self {
        self.probe = self.probe.with_env_overrides();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.supervisor.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "supervisor.maxAttempts must be at least 1".into(),
            ));
        }
        if self.particles.sample_window == 0 {
            return Err(ConfigError::Invalid(
                "particles.sampleWindow must be at least 1".into(),
            ));
        }
        if self.particles.reduction_step == 0 {
            return Err(ConfigError::Invalid(
                "particles.reductionStep must be at least 1".into(),
            ));
        }
        if self.probe.throttle_ratio.is_nan() || self.probe.throttle_ratio <= 0.0 {
            return Err(ConfigError::Invalid(
                "probe.throttleRatio must be positive".into(),
            ));
        }
        if self.fault_signatures.is_empty() {
            return Err(ConfigError::Invalid(
                "faultSignatures must name at least one pattern".into(),
            ));
        }
        if self.fault_signatures.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "faultSignatures must not contain empty patterns".into(),
            ));
        }
        Ok(())
    }
}
