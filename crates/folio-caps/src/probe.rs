use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::{
    AdapterReport, CpuArchitecture, CpuProfile, CpuTiming, GpuProfile, ProbeConfig, ProbeError,
};

/// Source of GPU facts, normally a disposable rendering context.
pub trait GpuProbeSource {
    fn acquire(&mut self) -> Result<AdapterReport, ProbeError>;
}

/// Source of CPU facts and the timing workload.
pub trait CpuProbeSource {
    fn logical_cores(&mut self) -> Result<usize, ProbeError>;
    fn architecture(&self) -> CpuArchitecture;
    fn supports_simd(&self) -> bool;
    /// Wall time spent running [`spin_workload`] for `iterations`.
    fn time_workload(&mut self, iterations: u32) -> Result<Duration, ProbeError>;
}

/// Fixed unit of integer work for the throttle probe; the return value keeps the loop
/// from being optimised away.
pub fn spin_workload(iterations: u32) -> u64 {
    let mut acc = 0x9e37_79b9_7f4a_7c15u64;
    for i in 0..iterations {
        acc = std::hint::black_box(acc.rotate_left(5) ^ u64::from(i)).wrapping_mul(31);
    }
    acc
}

/// CPU source for native hosts (tests, tooling).
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeCpuSource;

#[cfg(not(target_arch = "wasm32"))]
impl CpuProbeSource for NativeCpuSource {
    fn logical_cores(&mut self) -> Result<usize, ProbeError> {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .map_err(|err| ProbeError::Platform(err.to_string()))
    }

    fn architecture(&self) -> CpuArchitecture {
        CpuArchitecture::host()
    }

    fn supports_simd(&self) -> bool {
        cfg!(any(
            target_feature = "sse2",
            target_feature = "neon",
            target_feature = "simd128"
        ))
    }

    fn time_workload(&mut self, iterations: u32) -> Result<Duration, ProbeError> {
        let start = std::time::Instant::now();
        std::hint::black_box(spin_workload(iterations));
        Ok(start.elapsed())
    }
}

/// Runs both hardware probes once and never fails.
///
/// Any error or panic from a source is contained here and replaced with the matching
/// conservative profile.
pub struct CapabilityProbe<G, C> {
    gpu: G,
    cpu: C,
    config: ProbeConfig,
}

impl<G: GpuProbeSource, C: CpuProbeSource> CapabilityProbe<G, C> {
    pub fn new(gpu: G, cpu: C, config: ProbeConfig) -> Self {
        Self { gpu, cpu, config }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn probe(&mut self) -> (GpuProfile, CpuProfile) {
        if self.config.force_low_end {
            info!("capability probe skipped: low-end profile forced by configuration");
            return (GpuProfile::conservative(), CpuProfile::conservative());
        }
        (self.probe_gpu(), self.probe_cpu())
    }

    pub fn probe_gpu(&mut self) -> GpuProfile {
        let gpu = &mut self.gpu;
        match contain(|| gpu.acquire()) {
            Ok(report) => {
                let profile = GpuProfile::from_report(&report);
                debug!(
                    vendor = ?profile.vendor,
                    renderer = %profile.renderer,
                    integrated = profile.is_integrated,
                    mobile = profile.is_mobile,
                    low_end = profile.is_low_end,
                    "gpu profile detected"
                );
                profile
            }
            Err(err) => {
                warn!(error = %err, "gpu probe failed; using conservative profile");
                GpuProfile::conservative()
            }
        }
    }

    pub fn probe_cpu(&mut self) -> CpuProfile {
        let cpu = &mut self.cpu;
        let config = &self.config;
        let result = contain(|| {
            let logical_cores = cpu.logical_cores()?;
            let measured = cpu.time_workload(config.workload_iterations)?;
            Ok(CpuProfile::classify(
                logical_cores,
                cpu.architecture(),
                cpu.supports_simd(),
                CpuTiming {
                    measured,
                    expected: Duration::from_micros(config.expected_workload_micros),
                },
                config,
            ))
        });

        match result {
            Ok(profile) => {
                debug!(
                    logical_cores = profile.logical_cores,
                    throttled = profile.throttled,
                    timing_ratio = ?profile.timing_ratio,
                    high_end = profile.is_high_end,
                    low_end = profile.is_low_end,
                    "cpu profile detected"
                );
                profile
            }
            Err(err) => {
                warn!(error = %err, "cpu probe failed; using conservative profile");
                CpuProfile::conservative()
            }
        }
    }
}

fn contain<T>(f: impl FnOnce() -> Result<T, ProbeError>) -> Result<T, ProbeError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| String::from("unknown panic"));
            Err(ProbeError::Panicked(msg))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workload_depends_on_iterations() {
        assert_ne!(spin_workload(10), spin_workload(11));
        assert_eq!(spin_workload(64), spin_workload(64));
    }

    #[test]
    fn contain_turns_panics_into_errors() {
        let res: Result<(), ProbeError> = contain(|| panic!("boom"));
        assert_eq!(res, Err(ProbeError::Panicked("boom".to_string())));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn native_source_reports_at_least_one_core() {
        let mut src = NativeCpuSource;
        assert!(src.logical_cores().unwrap() >= 1);
        assert!(src.time_workload(1_000).is_ok());
    }
}
