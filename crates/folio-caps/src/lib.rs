//! `folio-caps` decides how much rendering work the host hardware can take.
//!
//! The crate provides:
//! - Hardware probing with conservative fallbacks (see [`CapabilityProbe`]).
//! - GPU/CPU profile classification (see [`GpuProfile`] and [`CpuProfile`]).
//! - A pure merge of both profiles into one [`RenderConfig`] (see [`merge`]).
//! - A swap-only store so readers never see a half-updated snapshot (see
//!   [`CapabilityStore`]).
#![forbid(unsafe_code)]

mod config;
mod cpu;
mod error;
mod gpu;
mod merge;
mod probe;
mod snapshot;

pub use config::{env_var_truthy, ProbeConfig, FORCE_LOW_END_ENV};
pub use cpu::{CpuArchitecture, CpuProfile, CpuTiming};
pub use error::ProbeError;
pub use gpu::{
    AdapterReport, ContextSettings, GpuExtensions, GpuProfile, GpuVendor, PowerPreference,
};
pub use merge::{
    classify, merge, DetailLevels, DeviceCategory, OptimizationParams, RenderConfig,
    ShaderPrecision,
};
pub use probe::{spin_workload, CapabilityProbe, CpuProbeSource, GpuProbeSource};
#[cfg(not(target_arch = "wasm32"))]
pub use probe::NativeCpuSource;
pub use snapshot::{CapabilitySnapshot, CapabilityStore};
