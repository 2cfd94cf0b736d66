//! Self-tuning decorative particle animation.
//!
//! [`AdaptiveParticleController`] sizes the particle set from the merged
//! [`folio_caps::RenderConfig`] and the viewport, throttles itself to a per-category
//! frame rate, and sheds particles while the measured frame rate stays low. It runs
//! independently of the render supervisor.
#![forbid(unsafe_code)]

mod config;
mod controller;
mod field;

pub use config::{
    ParticleConfig, DEFAULT_FPS_FLOOR, DEFAULT_MIN_PARTICLES, DEFAULT_REDUCTION_STEP,
    DEFAULT_SAMPLE_WINDOW, DEFAULT_SEED,
};
pub use controller::{initial_count, AdaptiveParticleController, ParticleTick};
pub use field::{Particle, ParticleField, Viewport};
