use folio_caps::RenderConfig;

use crate::RenderFault;

/// One instance of the 3D render surface.
///
/// Instances are never reused across a remount: the supervisor tears one down and asks
/// its [`SurfaceFactory`] for a fresh one, so all derived GPU state is rebuilt.
pub trait RenderSurface {
    /// Initialise the surface with `config`. A returned fault counts as a render fault.
    fn mount(&mut self, config: &RenderConfig) -> Result<(), RenderFault>;

    /// Apply a new configuration to an already mounted surface (after context restore).
    fn apply_config(&mut self, config: &RenderConfig);

    fn render_frame(&mut self, now_ms: f64) -> Result<(), RenderFault>;

    /// Release everything the surface holds. Must be safe to call more than once.
    fn teardown(&mut self);
}

pub trait SurfaceFactory {
    type Surface: RenderSurface;

    /// `generation` starts at 1 and increases with every remount.
    fn create(&mut self, generation: u32) -> Self::Surface;

    /// Show the permanent static (non-3D) view.
    fn show_fallback(&mut self);
}

pub type FrameHandle = i32;

/// Per-frame callback mechanism (`requestAnimationFrame` in the browser).
pub trait FrameScheduler {
    /// `None` when the platform refused to schedule.
    fn request_frame(&mut self) -> Option<FrameHandle>;
    fn cancel_frame(&mut self, handle: FrameHandle);
}
