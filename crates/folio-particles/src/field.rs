use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// CSS-pixel size of the drawing area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> f64 {
        f64::from(self.width.max(0.0)) * f64::from(self.height.max(0.0))
    }
}

const MAX_SPEED_PX_PER_SEC: f32 = 24.0;
const MIN_RADIUS: f32 = 0.5;
const MAX_RADIUS: f32 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    /// Pixels per second.
    pub vx: f32,
    pub vy: f32,
    pub radius: f32,
}

/// The particle set itself. Rebuilding draws fresh particles from the same seeded
/// generator, so a given seed replays the same sequence of sets.
#[derive(Debug, Clone)]
pub struct ParticleField {
    particles: Vec<Particle>,
    viewport: Viewport,
    rng: StdRng,
}

impl ParticleField {
    pub fn new(count: u32, viewport: Viewport, seed: u64) -> Self {
        let mut field = Self {
            particles: Vec::new(),
            viewport,
            rng: StdRng::seed_from_u64(seed),
        };
        field.rebuild(count);
        field
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn rebuild(&mut self, count: u32) {
        let (w, h) = (self.viewport.width.max(1.0), self.viewport.height.max(1.0));
        let rng = &mut self.rng;
        self.particles.clear();
        self.particles.extend((0..count).map(|_| Particle {
            x: rng.gen_range(0.0..w),
            y: rng.gen_range(0.0..h),
            vx: rng.gen_range(-MAX_SPEED_PX_PER_SEC..=MAX_SPEED_PX_PER_SEC),
            vy: rng.gen_range(-MAX_SPEED_PX_PER_SEC..=MAX_SPEED_PX_PER_SEC),
            radius: rng.gen_range(MIN_RADIUS..=MAX_RADIUS),
        }));
    }

    /// Move every particle by `dt_ms`, wrapping at the viewport edges.
    pub fn advance(&mut self, dt_ms: f64) {
        let dt = (dt_ms.max(0.0) / 1000.0) as f32;
        let (w, h) = (self.viewport.width.max(1.0), self.viewport.height.max(1.0));
        for p in &mut self.particles {
            p.x = wrap(p.x + p.vx * dt, w);
            p.y = wrap(p.y + p.vy * dt, h);
        }
    }

    /// Stretch positions to a new viewport. The particle count is left alone.
    pub fn resize(&mut self, viewport: Viewport) {
        let sx = viewport.width.max(1.0) / self.viewport.width.max(1.0);
        let sy = viewport.height.max(1.0) / self.viewport.height.max(1.0);
        for p in &mut self.particles {
            p.x *= sx;
            p.y *= sy;
        }
        self.viewport = viewport;
    }
}

/// `v` folded into `[0, extent)`. `rem_euclid` rounds tiny negatives up to `extent` itself.
fn wrap(v: f32, extent: f32) -> f32 {
    let r = v.rem_euclid(extent);
    if r >= extent {
        0.0
    } else {
        r
    }
}
