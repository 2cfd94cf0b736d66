//! `folio-render` keeps the 3D surface alive or gives up on it cleanly.
//!
//! Currently this crate provides:
//! - A versioned compatibility shim for the scene integration layer (see
//!   [`CompatibilityShim`]).
//! - A filtered global-error watcher that routes known faults to the shim and the
//!   supervisor (see [`install_watcher`]).
//! - The render supervisor state machine with bounded remount retries, context-loss
//!   handling and a terminal fallback (see [`RenderSupervisor`]).
#![forbid(unsafe_code)]

mod compat;
mod config;
mod error;
mod event;
mod notify;
mod supervisor;
mod surface;
mod watcher;

pub mod stats;

pub use compat::{
    CompatAdapter, CompatRepair, CompatibilityShim, IntegrationVersion, PatchState, RuntimeHost,
    SharedRepair, SUPPORTED_VERSIONS,
};
pub use config::SupervisorConfig;
pub use error::{CompatError, CompatFault, RenderFault};
pub use event::{RenderEvent, RenderEventCategory, RenderEventSeverity};
pub use notify::{Notification, NotificationKind, NotificationSeverity, Notifier};
pub use stats::RenderStats;
pub use supervisor::{FaultOutcome, Phase, RecoveryState, RenderSupervisor, TickOutcome};
pub use surface::{FrameHandle, FrameScheduler, RenderSurface, SurfaceFactory};
pub use watcher::{
    install_watcher, Disposer, ErrorChannel, ErrorDisposition, ErrorHandler, ErrorReport,
    FaultFilter, FaultInbox, ListenerId, LocalErrorChannel, WatcherGuard,
    DEFAULT_FAULT_SIGNATURES,
};
