use thiserror::Error;

/// Failure while reading hardware capabilities.
///
/// These never leave [`crate::CapabilityProbe`]; they are logged and replaced with a
/// conservative profile.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("rendering context unavailable")]
    ContextUnavailable,

    #[error("extension query failed: {0}")]
    ExtensionQuery(String),

    #[error("platform query failed: {0}")]
    Platform(String),

    #[error("probe panicked: {0}")]
    Panicked(String),
}
