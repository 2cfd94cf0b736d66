//! Probe thresholds.
//!
//! None of these values are derived from measurements; they are tunable defaults. Native
//! builds can force the conservative profile pair with `FOLIO_FORCE_LOW_END=1`, which is
//! useful for:
//! - CI runs that must exercise the low-end rendering path deterministically.
//! - Reproducing user reports from weak devices on a fast workstation.

use serde::{Deserialize, Serialize};

/// Env var that replaces every probe result with the conservative profile pair.
pub const FORCE_LOW_END_ENV: &str = "FOLIO_FORCE_LOW_END";

pub const DEFAULT_HIGH_END_CORES: usize = 8;
pub const DEFAULT_LOW_END_CORES: usize = 2;
pub const DEFAULT_THROTTLE_RATIO: f64 = 2.0;
pub const DEFAULT_WORKLOAD_ITERATIONS: u32 = 200_000;
pub const DEFAULT_EXPECTED_WORKLOAD_MICROS: u64 = 1_500;

pub fn env_var_truthy(name: &str) -> bool {
    let Ok(raw) = std::env::var(name) else {
        return false;
    };

    let v = raw.trim();
    v == "1"
        || v.eq_ignore_ascii_case("true")
        || v.eq_ignore_ascii_case("yes")
        || v.eq_ignore_ascii_case("on")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProbeConfig {
    /// Minimum logical core count for a high-end CPU.
    pub high_end_cores: usize,
    /// Logical core count at or below which a CPU is low-end.
    pub low_end_cores: usize,
    /// Measured/expected workload time above which the main thread counts as throttled.
    pub throttle_ratio: f64,
    pub workload_iterations: u32,
    /// Expected wall time of `workload_iterations` on an unthrottled mid-range core.
    pub expected_workload_micros: u64,
    pub force_low_end: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            high_end_cores: DEFAULT_HIGH_END_CORES,
            low_end_cores: DEFAULT_LOW_END_CORES,
            throttle_ratio: DEFAULT_THROTTLE_RATIO,
            workload_iterations: DEFAULT_WORKLOAD_ITERATIONS,
            expected_workload_micros: DEFAULT_EXPECTED_WORKLOAD_MICROS,
            force_low_end: false,
        }
    }
}

impl ProbeConfig {
    /// Applies `FOLIO_FORCE_LOW_END` on top of `self`.
    ///
    /// Browser builds have no process environment; this is a no-op there.
    pub fn with_env_overrides(mut self) -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        {
            if env_var_truthy(FORCE_LOW_END_ENV) {
                self.force_low_end = true;
            }
        }
        self
    }
}
