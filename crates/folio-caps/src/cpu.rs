use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ProbeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CpuArchitecture {
    X86,
    X86_64,
    Arm,
    Aarch64,
    Wasm32,
    Unknown,
}

impl CpuArchitecture {
    /// Architecture this binary was compiled for.
    pub fn host() -> Self {
        Self::from_arch_str(std::env::consts::ARCH)
    }

    pub fn from_arch_str(arch: &str) -> Self {
        match arch {
            "x86" => CpuArchitecture::X86,
            "x86_64" => CpuArchitecture::X86_64,
            "arm" => CpuArchitecture::Arm,
            "aarch64" => CpuArchitecture::Aarch64,
            "wasm32" => CpuArchitecture::Wasm32,
            _ => CpuArchitecture::Unknown,
        }
    }
}

/// Result of the main-thread timing workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTiming {
    pub measured: Duration,
    pub expected: Duration,
}

impl CpuTiming {
    /// Measured time over expected time. A zero expectation yields `1.0`.
    pub fn ratio(&self) -> f64 {
        let expected = self.expected.as_secs_f64();
        if expected <= 0.0 {
            return 1.0;
        }
        self.measured.as_secs_f64() / expected
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuProfile {
    pub cores: usize,
    pub logical_cores: usize,
    pub architecture: CpuArchitecture,
    pub is_low_end: bool,
    pub is_high_end: bool,
    pub throttled: bool,
    pub concurrency_level: usize,
    pub supports_simd: bool,
    /// Measured/expected workload time that decided `throttled`. `None` when nothing
    /// was measured.
    pub timing_ratio: Option<f64>,
}

impl CpuProfile {
    pub fn conservative() -> Self {
        Self {
            cores: 1,
            logical_cores: 1,
            architecture: CpuArchitecture::Unknown,
            is_low_end: true,
            is_high_end: false,
            throttled: true,
            concurrency_level: 1,
            supports_simd: false,
            timing_ratio: None,
        }
    }

    /// A low-end, throttled copy of `self`, used after the browser reclaimed the context.
    pub fn conservative_from(&self) -> Self {
        Self {
            is_low_end: true,
            is_high_end: false,
            throttled: true,
            ..self.clone()
        }
    }

    pub fn classify(
        logical_cores: usize,
        architecture: CpuArchitecture,
        supports_simd: bool,
        timing: CpuTiming,
        config: &ProbeConfig,
    ) -> Self {
        let logical_cores = logical_cores.max(1);
        // Browsers only expose logical cores; assume SMT once there are enough of them.
        let cores = if logical_cores >= 4 {
            logical_cores / 2
        } else {
            logical_cores
        };

        let timing_ratio = timing.ratio();
        let throttled = timing_ratio > config.throttle_ratio;
        let is_high_end = logical_cores >= config.high_end_cores && !throttled;
        let is_low_end = logical_cores <= config.low_end_cores || throttled;

        Self {
            cores,
            logical_cores,
            architecture,
            is_low_end,
            is_high_end,
            throttled,
            concurrency_level: (logical_cores / 2).clamp(1, 4),
            supports_simd,
            timing_ratio: Some(timing_ratio),
        }
    }
}
