//! Adaptive render control for the portfolio's 3D scene.
//!
//! The pieces live in their own crates and are re-exported here:
//! - [`caps`]: GPU/CPU capability probe and the parameter merge.
//! - [`render`]: compatibility shim, error watcher and the render supervisor.
//! - [`particles`]: the self-tuning particle animation.
//!
//! [`Session`] wires them together for one page load; [`Config`] carries every tunable.
#![forbid(unsafe_code)]

mod config;
mod session;

pub use folio_caps as caps;
pub use folio_particles as particles;
pub use folio_render as render;

pub use config::{Config, ConfigError};
pub use session::{detect, Platform, Session};
