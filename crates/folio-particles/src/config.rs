use folio_caps::DeviceCategory;
use serde::{Deserialize, Serialize};

use crate::Viewport;

pub const DEFAULT_FPS_FLOOR: f64 = 30.0;
pub const DEFAULT_MIN_PARTICLES: u32 = 20;
pub const DEFAULT_REDUCTION_STEP: u32 = 10;
/// Rendered frames per FPS sample.
pub const DEFAULT_SAMPLE_WINDOW: u32 = 10;
pub const DEFAULT_SEED: u64 = 0x5EED;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParticleConfig {
    /// Measured FPS below this sheds particles.
    pub fps_floor: f64,
    pub min_particles: u32,
    pub reduction_step: u32,
    pub sample_window: u32,

    pub low_end_multiplier: f64,
    pub mid_range_multiplier: f64,
    pub high_end_multiplier: f64,

    pub low_end_target_fps: f64,
    pub mid_range_target_fps: f64,
    pub high_end_target_fps: f64,

    /// Viewport the detail tiers' particle counts were tuned for.
    pub reference_viewport: Viewport,
    pub min_viewport_scale: f64,
    pub max_viewport_scale: f64,

    pub seed: u64,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            fps_floor: DEFAULT_FPS_FLOOR,
            min_particles: DEFAULT_MIN_PARTICLES,
            reduction_step: DEFAULT_REDUCTION_STEP,
            sample_window: DEFAULT_SAMPLE_WINDOW,
            low_end_multiplier: 0.5,
            mid_range_multiplier: 0.85,
            high_end_multiplier: 1.0,
            low_end_target_fps: 20.0,
            mid_range_target_fps: 30.0,
            high_end_target_fps: 60.0,
            reference_viewport: Viewport::new(1920.0, 1080.0),
            min_viewport_scale: 0.25,
            max_viewport_scale: 1.5,
            seed: DEFAULT_SEED,
        }
    }
}

impl ParticleConfig {
    pub fn multiplier(&self, category: DeviceCategory) -> f64 {
        match category {
            DeviceCategory::LowEnd => self.low_end_multiplier,
            DeviceCategory::MidRange => self.mid_range_multiplier,
            DeviceCategory::HighEnd => self.high_end_multiplier,
        }
    }

    pub fn target_fps(&self, category: DeviceCategory) -> f64 {
        match category {
            DeviceCategory::LowEnd => self.low_end_target_fps,
            DeviceCategory::MidRange => self.mid_range_target_fps,
            DeviceCategory::HighEnd => self.high_end_target_fps,
        }
    }

    /// Minimum milliseconds between rendered frames.
    pub fn frame_budget_ms(&self, category: DeviceCategory) -> f64 {
        let fps = self.target_fps(category);
        if fps > 0.0 {
            1000.0 / fps
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budgets_follow_target_fps() {
        let config = ParticleConfig::default();
        assert_eq!(config.frame_budget_ms(DeviceCategory::LowEnd), 50.0);
        assert!((config.frame_budget_ms(DeviceCategory::MidRange) - 33.333).abs() < 0.01);
        assert!((config.frame_budget_ms(DeviceCategory::HighEnd) - 16.666).abs() < 0.01);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ParticleConfig =
            serde_json::from_str(r#"{ "minParticles": 40, "seed": 7 }"#).unwrap();
        assert_eq!(config.min_particles, 40);
        assert_eq!(config.seed, 7);
        assert_eq!(config.reduction_step, DEFAULT_REDUCTION_STEP);
        assert_eq!(config.reference_viewport, Viewport::new(1920.0, 1080.0));
    }
}
