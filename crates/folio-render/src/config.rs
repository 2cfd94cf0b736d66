use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SupervisorConfig {
    /// Faults tolerated before the supervisor gives up on 3D for the session.
    pub max_attempts: u32,
    /// Recovery events retained for diagnostics; oldest are dropped first.
    pub event_log_capacity: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
        }
    }
}
