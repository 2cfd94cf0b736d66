use std::time::Duration;

use folio::caps::{spin_workload, CpuArchitecture, CpuProbeSource, ProbeError};
use web_sys::Window;

pub struct BrowserCpuSource {
    window: Window,
}

impl BrowserCpuSource {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl CpuProbeSource for BrowserCpuSource {
    fn logical_cores(&mut self) -> Result<usize, ProbeError> {
        let reported = self.window.navigator().hardware_concurrency();
        if !reported.is_finite() || reported < 1.0 {
            return Err(ProbeError::Platform(
                "navigator.hardwareConcurrency unavailable".into(),
            ));
        }
        Ok(reported as usize)
    }

    fn architecture(&self) -> CpuArchitecture {
        CpuArchitecture::Wasm32
    }

    fn supports_simd(&self) -> bool {
        cfg!(target_feature = "simd128")
    }

    fn time_workload(&mut self, iterations: u32) -> Result<Duration, ProbeError> {
        let performance = self
            .window
            .performance()
            .ok_or_else(|| ProbeError::Platform("window.performance unavailable".into()))?;
        let start = performance.now();
        std::hint::black_box(spin_workload(iterations));
        let elapsed_ms = (performance.now() - start).max(0.0);
        Ok(Duration::from_secs_f64(elapsed_ms / 1000.0))
    }
}
