use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderEventSeverity {
    Info,
    Warning,
    Error,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderEventCategory {
    Mount,
    Compatibility,
    Frame,
    ContextLoss,
    Recovery,
    Fallback,
}

/// Diagnostic record of a supervisor transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderEvent {
    pub time_ms: f64,
    pub severity: RenderEventSeverity,
    pub category: RenderEventCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, String>>,
}

impl RenderEvent {
    pub fn new(
        time_ms: f64,
        severity: RenderEventSeverity,
        category: RenderEventCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            time_ms,
            severity,
            category,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details
            .as_ref()
            .and_then(|d| d.get(key))
            .map(String::as_str)
    }
}
