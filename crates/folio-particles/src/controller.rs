use folio_caps::{DeviceCategory, RenderConfig};
use tracing::{debug, info};

use crate::{ParticleConfig, ParticleField, Viewport};

/// rAF timestamps jitter around the display period; without this a 60 fps budget
/// would skip every other vsync.
const FRAME_BUDGET_SLACK_MS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleTick {
    /// Page hidden.
    Paused,
    /// Inside the frame budget; nothing drawn.
    Skipped,
    Rendered {
        /// The particle set was shrunk and rebuilt this frame.
        rebuilt: bool,
    },
}

/// Particles to start with for `base` (the detail tier's count) on `viewport`.
pub fn initial_count(
    base: u32,
    category: DeviceCategory,
    viewport: Viewport,
    config: &ParticleConfig,
) -> u32 {
    let reference = config.reference_viewport.area();
    let scale = if reference > 0.0 {
        (viewport.area() / reference).clamp(config.min_viewport_scale, config.max_viewport_scale)
    } else {
        1.0
    };
    let scaled = f64::from(base) * scale * config.multiplier(category);
    (scaled.round() as u32).max(config.min_particles)
}

pub struct AdaptiveParticleController {
    config: ParticleConfig,
    category: DeviceCategory,
    budget_ms: f64,
    count: u32,
    field: ParticleField,
    visible: bool,
    last_frame_ms: Option<f64>,
    window_start_ms: f64,
    frames_in_window: u32,
    last_fps: Option<f64>,
}

impl AdaptiveParticleController {
    pub fn new(config: ParticleConfig, render: &RenderConfig, viewport: Viewport) -> Self {
        let category = render.category;
        let count = initial_count(render.detail.particle_count, category, viewport, &config);
        let budget_ms = config.frame_budget_ms(category);
        info!(
            category = category.as_str(),
            count,
            budget_ms,
            "particle controller initialised"
        );
        Self {
            field: ParticleField::new(count, viewport, config.seed),
            config,
            category,
            budget_ms,
            count,
            visible: true,
            last_frame_ms: None,
            window_start_ms: 0.0,
            frames_in_window: 0,
            last_fps: None,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn category(&self) -> DeviceCategory {
        self.category
    }

    pub fn field(&self) -> &ParticleField {
        &self.field
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// FPS from the most recent completed sample window.
    pub fn last_fps(&self) -> Option<f64> {
        self.last_fps
    }

    pub fn tick(&mut self, now_ms: f64) -> ParticleTick {
        if !self.visible {
            return ParticleTick::Paused;
        }

        let Some(last) = self.last_frame_ms else {
            // First frame after start or resume: only establishes the timeline.
            self.last_frame_ms = Some(now_ms);
            self.window_start_ms = now_ms;
            self.frames_in_window = 0;
            return ParticleTick::Rendered { rebuilt: false };
        };

        let elapsed = now_ms - last;
        if elapsed + FRAME_BUDGET_SLACK_MS < self.budget_ms {
            return ParticleTick::Skipped;
        }

        self.field.advance(elapsed);
        self.last_frame_ms = Some(now_ms);
        self.frames_in_window += 1;

        let rebuilt = if self.frames_in_window >= self.config.sample_window.max(1) {
            self.sample(now_ms)
        } else {
            false
        };
        ParticleTick::Rendered { rebuilt }
    }

    /// Hidden pages pause; on return the timeline restarts from the next frame.
    pub fn set_visible(&mut self, visible: bool) {
        if visible == self.visible {
            return;
        }
        self.visible = visible;
        self.last_frame_ms = None;
        self.frames_in_window = 0;
        debug!(visible, "particle animation visibility changed");
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.field.resize(viewport);
    }

    /// Follow a newly published configuration. The budget always follows the category; the
    /// count only ever shrinks, to what the new category would have started with.
    pub fn apply_render_config(&mut self, render: &RenderConfig) {
        if render.category == self.category {
            return;
        }
        self.category = render.category;
        self.budget_ms = self.config.frame_budget_ms(render.category);
        let cap = initial_count(
            render.detail.particle_count,
            render.category,
            self.field.viewport(),
            &self.config,
        );
        if cap < self.count {
            self.count = cap;
            self.field.rebuild(cap);
        }
        // Frames timed against the old budget say nothing about the new one.
        self.last_frame_ms = None;
        self.frames_in_window = 0;
        info!(
            category = render.category.as_str(),
            count = self.count,
            budget_ms = self.budget_ms,
            "particle controller switched category"
        );
    }

    fn sample(&mut self, now_ms: f64) -> bool {
        let window_ms = now_ms - self.window_start_ms;
        let frames = self.frames_in_window;
        self.window_start_ms = now_ms;
        self.frames_in_window = 0;
        if window_ms <= 0.0 {
            return false;
        }

        let fps = f64::from(frames) * 1000.0 / window_ms;
        self.last_fps = Some(fps);
        // A category capped below the floor is still keeping up at its own cap.
        let mean_interval_ms = window_ms / f64::from(frames);
        let keeping_up = mean_interval_ms <= self.budget_ms + FRAME_BUDGET_SLACK_MS;
        if keeping_up || fps >= self.config.fps_floor || self.count <= self.config.min_particles {
            return false;
        }

        let next = self
            .count
            .saturating_sub(self.config.reduction_step)
            .max(self.config.min_particles);
        info!(fps, from = self.count, to = next, "shedding particles");
        self.count = next;
        self.field.rebuild(next);
        true
    }
}
