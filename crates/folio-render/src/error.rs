use thiserror::Error;

use crate::IntegrationVersion;

/// A fault caused by the integration layer not finding runtime state it expects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompatFault {
    #[error("integration layer expected runtime field `{0}`")]
    MissingField(String),

    #[error("integration layer rejected the runtime: {0}")]
    Incompatible(String),
}

/// Typed outcome of mounting or driving a render surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderFault {
    #[error("compatibility fault: {0}")]
    Compatibility(#[from] CompatFault),

    /// The browser reclaimed the rendering context. Handled by the loss/restore pair,
    /// not by remounting.
    #[error("rendering context lost")]
    ContextLost,

    #[error("surface initialisation failed: {0}")]
    Init(String),

    #[error("frame failed: {0}")]
    Frame(String),
}

impl RenderFault {
    pub fn is_compatibility(&self) -> bool {
        matches!(self, RenderFault::Compatibility(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompatError {
    #[error("invalid integration version `{0}`")]
    InvalidVersion(String),

    #[error("integration version {0} is not in the supported-version table")]
    UnsupportedVersion(IntegrationVersion),

    #[error("could not install stand-in for `{field}`: {reason}")]
    StandIn { field: String, reason: String },
}
