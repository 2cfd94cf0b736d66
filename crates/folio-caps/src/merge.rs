//! Pure merge of GPU and CPU profiles into one rendering configuration.
//!
//! The merge is "most conservative wins": each profile recommends its own parameter
//! set and the merged set takes the stricter value of every field, so the result is
//! never more aggressive than either recommendation.

use serde::{Deserialize, Serialize};

use crate::{CpuProfile, GpuProfile, PowerPreference};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceCategory {
    LowEnd,
    MidRange,
    HighEnd,
}

impl DeviceCategory {
    pub const ALL: [DeviceCategory; 3] = [
        DeviceCategory::LowEnd,
        DeviceCategory::MidRange,
        DeviceCategory::HighEnd,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceCategory::LowEnd => "low-end",
            DeviceCategory::MidRange => "mid-range",
            DeviceCategory::HighEnd => "high-end",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderPrecision {
    Low,
    Medium,
    High,
}

impl ShaderPrecision {
    /// GLSL precision qualifier.
    pub fn as_glsl(self) -> &'static str {
        match self {
            ShaderPrecision::Low => "lowp",
            ShaderPrecision::Medium => "mediump",
            ShaderPrecision::High => "highp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationParams {
    pub max_fps: u32,
    pub max_pixel_ratio: f32,
    pub antialias: bool,
    pub shader_precision: ShaderPrecision,
    pub fog: bool,
    pub tone_mapping: bool,
    pub shadows: bool,
    pub power_preference: PowerPreference,
}

impl OptimizationParams {
    pub const fn low() -> Self {
        Self {
            max_fps: 30,
            max_pixel_ratio: 1.0,
            antialias: false,
            shader_precision: ShaderPrecision::Low,
            fog: false,
            tone_mapping: false,
            shadows: false,
            power_preference: PowerPreference::LowPower,
        }
    }

    /// What the GPU alone would allow.
    pub fn for_gpu(gpu: &GpuProfile) -> Self {
        if gpu.is_low_end {
            return Self::low();
        }

        let rec = gpu.recommended;
        if gpu.is_integrated || gpu.is_mobile {
            Self {
                max_fps: 60,
                max_pixel_ratio: 1.5,
                antialias: rec.antialias,
                shader_precision: ShaderPrecision::Medium,
                fog: true,
                tone_mapping: true,
                shadows: false,
                power_preference: rec.power_preference,
            }
        } else {
            Self {
                max_fps: 60,
                max_pixel_ratio: 2.0,
                antialias: rec.antialias,
                shader_precision: ShaderPrecision::High,
                fog: true,
                tone_mapping: true,
                shadows: true,
                power_preference: rec.power_preference,
            }
        }
    }

    /// What the CPU alone would allow.
    pub fn for_cpu(cpu: &CpuProfile) -> Self {
        if cpu.is_low_end || cpu.throttled {
            return Self::low();
        }

        if cpu.is_high_end {
            Self {
                max_fps: 60,
                max_pixel_ratio: 2.0,
                antialias: true,
                shader_precision: ShaderPrecision::High,
                fog: true,
                tone_mapping: true,
                shadows: true,
                power_preference: PowerPreference::HighPerformance,
            }
        } else {
            Self {
                max_fps: 60,
                max_pixel_ratio: 1.5,
                antialias: true,
                shader_precision: ShaderPrecision::Medium,
                fog: true,
                tone_mapping: true,
                shadows: false,
                power_preference: PowerPreference::Default,
            }
        }
    }

    /// Field-wise stricter of `a` and `b`.
    pub fn most_conservative(a: &Self, b: &Self) -> Self {
        Self {
            max_fps: a.max_fps.min(b.max_fps),
            max_pixel_ratio: a.max_pixel_ratio.min(b.max_pixel_ratio),
            antialias: a.antialias && b.antialias,
            shader_precision: a.shader_precision.min(b.shader_precision),
            fog: a.fog && b.fog,
            tone_mapping: a.tone_mapping && b.tone_mapping,
            shadows: a.shadows && b.shadows,
            power_preference: if a.power_preference.rank() <= b.power_preference.rank() {
                a.power_preference
            } else {
                b.power_preference
            },
        }
    }

    /// True when no field of `self` is more demanding than the matching field of `other`.
    pub fn is_within(&self, other: &Self) -> bool {
        self.max_fps <= other.max_fps
            && self.max_pixel_ratio <= other.max_pixel_ratio
            && (!self.antialias || other.antialias)
            && self.shader_precision <= other.shader_precision
            && (!self.fog || other.fog)
            && (!self.tone_mapping || other.tone_mapping)
            && (!self.shadows || other.shadows)
            && self.power_preference.rank() <= other.power_preference.rank()
    }

    /// Clamp the device pixel ratio to the configured ceiling.
    pub fn effective_pixel_ratio(&self, device_pixel_ratio: f32) -> f32 {
        if !device_pixel_ratio.is_finite() || device_pixel_ratio <= 0.0 {
            return 1.0;
        }
        device_pixel_ratio.min(self.max_pixel_ratio)
    }
}

/// Geometry and particle complexity for the scene consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailLevels {
    pub sphere_segments: u32,
    pub torus_radial_segments: u32,
    pub torus_tubular_segments: u32,
    pub icosahedron_detail: u32,
    pub particle_count: u32,
}

impl DetailLevels {
    pub const fn for_category(category: DeviceCategory) -> Self {
        match category {
            DeviceCategory::LowEnd => Self {
                sphere_segments: 16,
                torus_radial_segments: 8,
                torus_tubular_segments: 24,
                icosahedron_detail: 0,
                particle_count: 150,
            },
            DeviceCategory::MidRange => Self {
                sphere_segments: 32,
                torus_radial_segments: 12,
                torus_tubular_segments: 48,
                icosahedron_detail: 1,
                particle_count: 400,
            },
            DeviceCategory::HighEnd => Self {
                sphere_segments: 64,
                torus_radial_segments: 16,
                torus_tubular_segments: 96,
                icosahedron_detail: 2,
                particle_count: 800,
            },
        }
    }

    /// Every tier value as a flat list, in declaration order.
    pub fn tiers(&self) -> [u32; 5] {
        [
            self.sphere_segments,
            self.torus_radial_segments,
            self.torus_tubular_segments,
            self.icosahedron_detail,
            self.particle_count,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderConfig {
    pub params: OptimizationParams,
    pub detail: DetailLevels,
    pub category: DeviceCategory,
}

/// First match wins: any low-end side, then a strong CPU on a discrete GPU.
pub fn classify(gpu: &GpuProfile, cpu: &CpuProfile) -> DeviceCategory {
    if gpu.is_low_end || cpu.is_low_end {
        DeviceCategory::LowEnd
    } else if cpu.is_high_end && !cpu.throttled && !gpu.is_integrated {
        DeviceCategory::HighEnd
    } else {
        DeviceCategory::MidRange
    }
}

pub fn merge(gpu: &GpuProfile, cpu: &CpuProfile) -> RenderConfig {
    let category = classify(gpu, cpu);
    let params = OptimizationParams::most_conservative(
        &OptimizationParams::for_gpu(gpu),
        &OptimizationParams::for_cpu(cpu),
    );
    RenderConfig {
        params,
        detail: DetailLevels::for_category(category),
        category,
    }
}
