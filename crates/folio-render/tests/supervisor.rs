use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use folio_caps::{
    CapabilitySnapshot, CapabilityStore, CpuProfile, DeviceCategory, GpuProfile, RenderConfig,
};
use folio_render::{
    install_watcher, CompatError, CompatibilityShim, ErrorChannel, ErrorDisposition, ErrorReport,
    FaultFilter, FrameHandle, FrameScheduler, IntegrationVersion, LocalErrorChannel, Notification,
    NotificationKind, Phase, RenderFault, RenderSupervisor, RenderSurface, RuntimeHost,
    SharedRepair, SupervisorConfig, SurfaceFactory, TickOutcome,
};
use pretty_assertions::assert_eq;

#[derive(Default)]
struct Runtime {
    fields: HashSet<String>,
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
struct Recorder {
    mounted: Vec<u32>,
    torn_down: Vec<u32>,
    applied: Vec<RenderConfig>,
    fallback_shown: u32,
    next_frame: FrameHandle,
    cancelled: Vec<FrameHandle>,
    notifications: Vec<Notification>,
}

type Shared = Rc<RefCell<Recorder>>;

struct Scene {
    id: u32,
    rec: Shared,
}

impl RenderSurface for Scene {
    fn mount(&mut self, _config: &RenderConfig) -> Result<(), RenderFault> {
        self.rec.borrow_mut().mounted.push(self.id);
        Ok(())
    }

    fn apply_config(&mut self, config: &RenderConfig) {
        self.rec.borrow_mut().applied.push(*config);
    }

    fn render_frame(&mut self, _now_ms: f64) -> Result<(), RenderFault> {
        Ok(())
    }

    fn teardown(&mut self) {
        self.rec.borrow_mut().torn_down.push(self.id);
    }
}

struct Scenes(Shared);

impl SurfaceFactory for Scenes {
    type Surface = Scene;

    fn create(&mut self, generation: u32) -> Scene {
        Scene {
            id: generation,
            rec: self.0.clone(),
        }
    }

    fn show_fallback(&mut self) {
        self.0.borrow_mut().fallback_shown += 1;
    }
}

struct Frames(Shared);

impl FrameScheduler for Frames {
    fn request_frame(&mut self) -> Option<FrameHandle> {
        let mut rec = self.0.borrow_mut();
        rec.next_frame += 1;
        Some(rec.next_frame)
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.0.borrow_mut().cancelled.push(handle);
    }
}

fn capable_store() -> CapabilityStore {
    let mut gpu = GpuProfile::conservative();
    gpu.is_low_end = false;
    let mut cpu = CpuProfile::conservative();
    cpu.is_low_end = false;
    cpu.throttled = false;
    CapabilityStore::new(CapabilitySnapshot::new(gpu, cpu))
}

struct Harness {
    rec: Shared,
    shim: Rc<RefCell<CompatibilityShim<Runtime>>>,
    channel: Rc<LocalErrorChannel>,
    supervisor: RenderSupervisor<Scenes>,
}

fn harness() -> Harness {
    let rec = Shared::default();
    let mut shim = CompatibilityShim::new(Runtime::default());
    shim.ensure_compat(IntegrationVersion::new(8, 16, 2))
        .expect("8.16 is supported");
    let shim = shim.into_shared();
    let repair: SharedRepair = shim.clone();

    let notes = rec.clone();
    let mut supervisor = RenderSupervisor::new(
        &SupervisorConfig::default(),
        Scenes(rec.clone()),
        capable_store(),
        repair.clone(),
        Box::new(Frames(rec.clone())),
        Box::new(move |n: Notification| notes.borrow_mut().notifications.push(n)),
    );

    let channel = Rc::new(LocalErrorChannel::new());
    let guard = install_watcher(
        repair,
        FaultFilter::default(),
        channel.clone() as Rc<dyn ErrorChannel>,
        supervisor.fault_inbox(),
    );
    supervisor.attach(Box::new(guard));

    Harness {
        rec,
        shim,
        channel,
        supervisor,
    }
}

fn integration_error() -> ErrorReport {
    ErrorReport::new("TypeError: Cannot read properties of undefined (reading 'currentOwner')")
}

#[test]
fn three_compatibility_faults_end_in_a_permanent_fallback() {
    let mut h = harness();
    assert_eq!(h.supervisor.start(0.0), Phase::Rendering);

    for attempt in 1..=2 {
        assert_eq!(h.channel.dispatch(&integration_error()), ErrorDisposition::Handled);
        assert_eq!(
            h.supervisor.tick(attempt as f64 * 16.0),
            TickOutcome::Recovered { attempt }
        );
        assert_eq!(h.supervisor.phase(), Phase::Rendering);
    }

    assert_eq!(h.channel.dispatch(&integration_error()), ErrorDisposition::Handled);
    assert_eq!(h.supervisor.tick(48.0), TickOutcome::Fallback);
    assert_eq!(h.supervisor.phase(), Phase::Fallback);
    assert_eq!(h.channel.listener_count(), 0);
    assert_eq!(h.rec.borrow().fallback_shown, 1);

    let repairs_before = h.shim.borrow().invocations();
    assert_eq!(
        h.channel.dispatch(&integration_error()),
        ErrorDisposition::PassThrough
    );
    assert_eq!(h.supervisor.tick(64.0), TickOutcome::Idle);
    assert_eq!(h.shim.borrow().invocations(), repairs_before);
    assert_eq!(h.supervisor.phase(), Phase::Fallback);
    assert_eq!(h.supervisor.attempts(), 3);

    let kinds: Vec<_> = h
        .rec
        .borrow()
        .notifications
        .iter()
        .map(|n| n.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            NotificationKind::RecoveryInProgress,
            NotificationKind::RecoveryInProgress,
            NotificationKind::Fallback,
        ]
    );
}

#[test]
fn every_remount_gets_a_fresh_surface() {
    let mut h = harness();
    h.supervisor.start(0.0);
    h.channel.dispatch(&integration_error());
    h.supervisor.tick(16.0);
    h.channel.dispatch(&integration_error());
    h.supervisor.tick(32.0);

    assert_eq!(h.rec.borrow().mounted, vec![1, 2, 3]);
    assert_eq!(h.rec.borrow().torn_down, vec![1, 2]);
    assert_eq!(h.supervisor.generation(), 3);
    assert!(h.shim.borrow().state().applied);
    assert!(h.shim.borrow().host().has_field("currentBatchConfig"));
}

#[test]
fn context_loss_then_restore_keeps_rendering_with_conservative_params() {
    let mut h = harness();
    h.supervisor.start(0.0);
    let before = h.supervisor.store().load();
    assert_ne!(before.config.category, DeviceCategory::LowEnd);

    h.supervisor.on_context_lost(10.0);
    assert_eq!(h.supervisor.tick(16.0), TickOutcome::Suspended);
    h.supervisor.on_context_restored(20.0);

    assert_eq!(h.supervisor.phase(), Phase::Rendering);
    assert_eq!(h.supervisor.tick(32.0), TickOutcome::Rendered);

    let after = h.supervisor.store().load();
    assert_eq!(after.config.category, DeviceCategory::LowEnd);
    assert!(after.gpu.is_low_end);
    assert!(after.cpu.throttled);
    assert!(after.config.params.is_within(&before.config.params));
    assert_eq!(h.rec.borrow().applied, vec![after.config]);
    // The reader that held the old snapshot still sees it unchanged.
    assert_eq!(before.generation, 0);
    assert_ne!(before.config, after.config);
}

#[test]
fn teardown_unsubscribes_and_cancels_the_pending_frame() {
    let mut h = harness();
    h.supervisor.start(0.0);
    let pending = h.supervisor.pending_frame();
    assert!(pending.is_some());

    h.supervisor.teardown();
    assert_eq!(h.channel.listener_count(), 0);
    assert_eq!(h.rec.borrow().cancelled, pending.into_iter().collect::<Vec<_>>());
    assert_eq!(h.rec.borrow().torn_down, vec![1]);
    assert_eq!(h.supervisor.pending_frame(), None);
}

#[test]
fn stats_track_the_session() {
    let mut h = harness();
    h.supervisor.start(0.0);
    h.supervisor.tick(16.0);
    h.channel.dispatch(&integration_error());
    h.supervisor.tick(32.0);

    let stats = h.supervisor.stats().snapshot();
    assert_eq!(stats.mounts_attempted, 2);
    assert_eq!(stats.mounts_succeeded, 2);
    assert_eq!(stats.frames_rendered, 2);
    assert_eq!(stats.compat_faults, 1);
    assert_eq!(stats.recoveries_succeeded, 1);
    assert_eq!(stats.fallbacks, 0);
}
