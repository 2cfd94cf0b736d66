#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;

use folio::caps::{
    AdapterReport, CpuArchitecture, CpuProbeSource, GpuExtensions, GpuProbeSource, ProbeError,
    RenderConfig,
};
use folio::render::{
    CompatError, FrameHandle, FrameScheduler, Notification, RenderFault, RenderSurface,
    RuntimeHost, SurfaceFactory,
};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct Gpu(pub Option<AdapterReport>);

impl Gpu {
    pub fn discrete() -> Self {
        Self(Some(AdapterReport {
            vendor: "NVIDIA Corporation".into(),
            renderer: "ANGLE (NVIDIA, NVIDIA GeForce RTX 3070 Direct3D11 vs_5_0 ps_5_0)".into(),
            extensions: GpuExtensions::all(),
            max_texture_size: 16384,
            mobile_platform: false,
            extension_query_failed: false,
        }))
    }

    pub fn unavailable() -> Self {
        Self(None)
    }
}

impl GpuProbeSource for Gpu {
    fn acquire(&mut self) -> Result<AdapterReport, ProbeError> {
        self.0.clone().ok_or(ProbeError::ContextUnavailable)
    }
}

pub struct Cpu {
    pub logical: usize,
    pub workload: Duration,
}

impl Cpu {
    pub fn workstation() -> Self {
        Self {
            logical: 16,
            workload: Duration::from_micros(900),
        }
    }
}

impl CpuProbeSource for Cpu {
    fn logical_cores(&mut self) -> Result<usize, ProbeError> {
        Ok(self.logical)
    }

    fn architecture(&self) -> CpuArchitecture {
        CpuArchitecture::X86_64
    }

    fn supports_simd(&self) -> bool {
        true
    }

    fn time_workload(&mut self, _iterations: u32) -> Result<Duration, ProbeError> {
        Ok(self.workload)
    }
}

/// The integration layer's runtime object; starts with none of the expected fields.
#[derive(Default)]
pub struct Runtime {
    pub fields: HashSet<String>,
}

impl RuntimeHost for Runtime {
    fn has_field(&self, name: &str) -> bool {
        self.fields.contains(name)
    }

    fn install_stand_in(&mut self, name: &str) -> Result<(), CompatError> {
        self.fields.insert(name.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct Page {
    pub mounted: Vec<u32>,
    pub configs: Vec<RenderConfig>,
    pub frames: u32,
    pub fallback_visible: bool,
    pub next_handle: FrameHandle,
    pub cancelled: Vec<FrameHandle>,
    pub notifications: Vec<Notification>,
}

pub type SharedPage = Rc<RefCell<Page>>;

pub struct Scene {
    page: SharedPage,
}

impl RenderSurface for Scene {
    fn mount(&mut self, config: &RenderConfig) -> Result<(), RenderFault> {
        self.page.borrow_mut().configs.push(*config);
        Ok(())
    }

    fn apply_config(&mut self, config: &RenderConfig) {
        self.page.borrow_mut().configs.push(*config);
    }

    fn render_frame(&mut self, _now_ms: f64) -> Result<(), RenderFault> {
        self.page.borrow_mut().frames += 1;
        Ok(())
    }

    fn teardown(&mut self) {}
}

pub struct Scenes(pub SharedPage);

impl SurfaceFactory for Scenes {
    type Surface = Scene;

    fn create(&mut self, generation: u32) -> Scene {
        self.0.borrow_mut().mounted.push(generation);
        Scene {
            page: self.0.clone(),
        }
    }

    fn show_fallback(&mut self) {
        self.0.borrow_mut().fallback_visible = true;
    }
}

pub struct Frames(pub SharedPage);

impl FrameScheduler for Frames {
    fn request_frame(&mut self) -> Option<FrameHandle> {
        let mut page = self.0.borrow_mut();
        page.next_handle += 1;
        Some(page.next_handle)
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.0.borrow_mut().cancelled.push(handle);
    }
}
