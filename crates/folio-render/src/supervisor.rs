use std::collections::VecDeque;

use folio_caps::CapabilityStore;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
    CompatRepair, Disposer, FaultInbox, FrameHandle, FrameScheduler, Notification, Notifier,
    RenderEvent, RenderEventCategory, RenderEventSeverity, RenderFault, RenderStats,
    RenderSurface, SharedRepair, SupervisorConfig, SurfaceFactory,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Mounted,
    Rendering,
    Recovering,
    /// Terminal for the session.
    Fallback,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Mounted => "mounted",
            Phase::Rendering => "rendering",
            Phase::Recovering => "recovering",
            Phase::Fallback => "fallback",
        }
    }
}

/// Retry bookkeeping. `attempts` only ever grows within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryState {
    pub attempts: u32,
    pub max_attempts: u32,
    pub phase: Phase,
}

impl RecoveryState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            max_attempts: max_attempts.max(1),
            phase: Phase::Mounted,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Rendered,
    /// Context lost; waiting for the restore event.
    Suspended,
    /// A fault was handled this tick and the surface was remounted.
    Recovered { attempt: u32 },
    Fallback,
    /// Not started, torn down, or already in fallback.
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOutcome {
    /// Fallback already reached, supervisor torn down, or the fault was a context loss.
    Ignored,
    Recovered { attempt: u32 },
    Fallback,
}

/// Owns the render surface lifecycle: mount, bounded remount on faults, context
/// loss/restore, and the terminal fallback.
pub struct RenderSupervisor<F: SurfaceFactory> {
    state: RecoveryState,
    factory: F,
    surface: Option<F::Surface>,
    generation: u32,
    store: CapabilityStore,
    repair: SharedRepair,
    inbox: FaultInbox,
    scheduler: Box<dyn FrameScheduler>,
    notifier: Box<dyn Notifier>,
    pending_frame: Option<FrameHandle>,
    suspended: bool,
    fallback_notified: bool,
    closed: bool,
    attachments: Vec<Box<dyn Disposer>>,
    events: VecDeque<RenderEvent>,
    event_log_capacity: usize,
    stats: RenderStats,
}

impl<F: SurfaceFactory> RenderSupervisor<F> {
    pub fn new(
        config: &SupervisorConfig,
        factory: F,
        store: CapabilityStore,
        repair: SharedRepair,
        scheduler: Box<dyn FrameScheduler>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            state: RecoveryState::new(config.max_attempts),
            factory,
            surface: None,
            generation: 0,
            store,
            repair,
            inbox: FaultInbox::new(),
            scheduler,
            notifier,
            pending_frame: None,
            suspended: false,
            fallback_notified: false,
            closed: false,
            attachments: Vec::new(),
            events: VecDeque::new(),
            event_log_capacity: config.event_log_capacity,
            stats: RenderStats::new(),
        }
    }

    pub fn state(&self) -> RecoveryState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn attempts(&self) -> u32 {
        self.state.attempts
    }

    /// Surface instances created so far; the live one carries this number.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn surface(&self) -> Option<&F::Surface> {
        self.surface.as_ref()
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn store(&self) -> &CapabilityStore {
        &self.store
    }

    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.pending_frame
    }

    /// Handle for producers (the error watcher) that cannot call into the supervisor
    /// directly.
    pub fn fault_inbox(&self) -> FaultInbox {
        self.inbox.clone()
    }

    pub fn events(&self) -> impl Iterator<Item = &RenderEvent> {
        self.events.iter()
    }

    pub fn take_events(&mut self) -> Vec<RenderEvent> {
        self.events.drain(..).collect()
    }

    /// Register something to release on fallback or teardown.
    pub fn attach(&mut self, mut disposer: Box<dyn Disposer>) {
        if self.closed || self.state.phase == Phase::Fallback {
            disposer.dispose();
            return;
        }
        self.attachments.push(disposer);
    }

    /// Create and mount the first surface. Calling it again is a no-op.
    pub fn start(&mut self, now_ms: f64) -> Phase {
        if self.closed || self.state.phase != Phase::Mounted || self.surface.is_some() {
            return self.state.phase;
        }
        match self.mount_fresh() {
            Ok(()) => {
                self.state.phase = Phase::Rendering;
                let category = self.store.load().config.category;
                self.record(
                    RenderEvent::new(
                        now_ms,
                        RenderEventSeverity::Info,
                        RenderEventCategory::Mount,
                        "render surface mounted",
                    )
                    .with_detail("generation", self.generation.to_string())
                    .with_detail("category", category.as_str()),
                );
                self.schedule_frame();
            }
            Err(fault) => {
                self.report_fault(fault, now_ms);
            }
        }
        self.state.phase
    }

    /// Frame callback: drain queued faults, then render if the loop is live.
    pub fn tick(&mut self, now_ms: f64) -> TickOutcome {
        // This call is the frame the pending handle was for.
        self.pending_frame = None;
        if self.closed || self.state.phase == Phase::Fallback {
            return TickOutcome::Idle;
        }

        let mut recovered = None;
        while let Some(fault) = self.inbox.pop() {
            match self.report_fault(fault, now_ms) {
                FaultOutcome::Fallback => return TickOutcome::Fallback,
                FaultOutcome::Recovered { attempt } => recovered = Some(attempt),
                FaultOutcome::Ignored => {}
            }
        }

        if self.state.phase != Phase::Rendering {
            return TickOutcome::Idle;
        }
        if self.suspended {
            return TickOutcome::Suspended;
        }

        let Some(surface) = self.surface.as_mut() else {
            return TickOutcome::Idle;
        };
        match surface.render_frame(now_ms) {
            Ok(()) => {
                self.stats.inc_frames_rendered();
                self.schedule_frame();
                match recovered {
                    Some(attempt) => TickOutcome::Recovered { attempt },
                    None => TickOutcome::Rendered,
                }
            }
            Err(fault) => match self.report_fault(fault, now_ms) {
                FaultOutcome::Fallback => TickOutcome::Fallback,
                FaultOutcome::Recovered { attempt } => TickOutcome::Recovered { attempt },
                FaultOutcome::Ignored if self.suspended => TickOutcome::Suspended,
                FaultOutcome::Ignored => TickOutcome::Idle,
            },
        }
    }

    /// Route one fault into the state machine.
    pub fn report_fault(&mut self, fault: RenderFault, now_ms: f64) -> FaultOutcome {
        if self.closed || self.state.phase == Phase::Fallback {
            debug!(%fault, "fault after fallback ignored");
            return FaultOutcome::Ignored;
        }
        if fault == RenderFault::ContextLost && self.state.phase == Phase::Rendering {
            self.on_context_lost(now_ms);
            return FaultOutcome::Ignored;
        }
        self.recover(fault, now_ms)
    }

    /// The browser reclaimed the rendering context.
    pub fn on_context_lost(&mut self, now_ms: f64) {
        if self.closed || self.state.phase != Phase::Rendering || self.suspended {
            return;
        }
        self.stats.inc_context_losses();
        let snapshot = self.store.degrade();
        self.suspended = true;
        self.cancel_frame();
        self.record(
            RenderEvent::new(
                now_ms,
                RenderEventSeverity::Warning,
                RenderEventCategory::ContextLoss,
                "rendering context lost; render loop suspended",
            )
            .with_detail("snapshotGeneration", snapshot.generation.to_string())
            .with_detail("category", snapshot.config.category.as_str()),
        );
        self.notifier.notify(Notification::context_lost());
    }

    /// Resume after a context loss with the conservative parameters published then.
    pub fn on_context_restored(&mut self, now_ms: f64) {
        if self.closed || self.state.phase != Phase::Rendering || !self.suspended {
            return;
        }
        let snapshot = self.store.load();
        if let Some(surface) = self.surface.as_mut() {
            surface.apply_config(&snapshot.config);
        }
        self.suspended = false;
        self.stats.inc_context_restores();
        self.record(
            RenderEvent::new(
                now_ms,
                RenderEventSeverity::Info,
                RenderEventCategory::ContextLoss,
                "rendering context restored",
            )
            .with_detail("category", snapshot.config.category.as_str()),
        );
        self.notifier.notify(Notification::context_restored());
        self.schedule_frame();
    }

    /// Release listeners, the pending frame and the surface. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.release();
        debug!(phase = self.state.phase.as_str(), "render supervisor torn down");
    }

    fn recover(&mut self, first: RenderFault, now_ms: f64) -> FaultOutcome {
        let mut fault = first;
        loop {
            let compat = fault.is_compatibility();
            self.stats.inc_faults_observed(compat);
            self.state.attempts += 1;
            self.state.phase = Phase::Recovering;
            let attempt = self.state.attempts;

            let category = if compat {
                RenderEventCategory::Compatibility
            } else {
                RenderEventCategory::Frame
            };
            self.record(
                RenderEvent::new(now_ms, RenderEventSeverity::Error, category, fault.to_string())
                    .with_detail("attempt", attempt.to_string())
                    .with_detail("maxAttempts", self.state.max_attempts.to_string()),
            );

            if self.state.is_exhausted() {
                self.enter_fallback(now_ms);
                return FaultOutcome::Fallback;
            }

            self.stats.inc_recoveries_attempted();
            self.notifier
                .notify(Notification::recovery_in_progress(attempt, self.state.max_attempts));

            let created = match self.repair.try_borrow_mut() {
                Ok(mut shim) if compat => shim.force_repair(),
                Ok(mut shim) => shim.repair(),
                Err(_) => {
                    warn!("compatibility shim busy; remounting without repair");
                    false
                }
            };

            match self.remount() {
                Ok(()) => {
                    self.state.phase = Phase::Rendering;
                    self.suspended = false;
                    self.stats.inc_recoveries_succeeded();
                    self.record(
                        RenderEvent::new(
                            now_ms,
                            RenderEventSeverity::Info,
                            RenderEventCategory::Recovery,
                            "render surface remounted",
                        )
                        .with_detail("attempt", attempt.to_string())
                        .with_detail("generation", self.generation.to_string())
                        .with_detail("shimCreatedFields", created.to_string()),
                    );
                    self.schedule_frame();
                    return FaultOutcome::Recovered { attempt };
                }
                Err(next) => fault = next,
            }
        }
    }

    /// Replace the live surface with a fresh instance.
    fn remount(&mut self) -> Result<(), RenderFault> {
        self.cancel_frame();
        if let Some(mut old) = self.surface.take() {
            old.teardown();
        }
        self.mount_fresh()
    }

    fn mount_fresh(&mut self) -> Result<(), RenderFault> {
        self.generation += 1;
        let mut surface = self.factory.create(self.generation);
        self.stats.inc_mounts_attempted();
        let snapshot = self.store.load();
        match surface.mount(&snapshot.config) {
            Ok(()) => {
                self.stats.inc_mounts_succeeded();
                self.surface = Some(surface);
                Ok(())
            }
            Err(fault) => {
                surface.teardown();
                Err(fault)
            }
        }
    }

    fn enter_fallback(&mut self, now_ms: f64) {
        self.state.phase = Phase::Fallback;
        self.suspended = false;
        self.inbox.clear();
        self.release();
        self.factory.show_fallback();
        self.stats.inc_fallbacks();
        self.record(
            RenderEvent::new(
                now_ms,
                RenderEventSeverity::Fatal,
                RenderEventCategory::Fallback,
                "recovery exhausted; showing static view",
            )
            .with_detail("attempts", self.state.attempts.to_string()),
        );
        if !self.fallback_notified {
            self.fallback_notified = true;
            self.notifier.notify(Notification::fallback());
        }
    }

    fn release(&mut self) {
        for mut attachment in self.attachments.drain(..) {
            attachment.dispose();
        }
        self.cancel_frame();
        if let Some(mut surface) = self.surface.take() {
            surface.teardown();
        }
    }

    fn schedule_frame(&mut self) {
        if self.pending_frame.is_none() {
            self.pending_frame = self.scheduler.request_frame();
        }
    }

    fn cancel_frame(&mut self) {
        if let Some(handle) = self.pending_frame.take() {
            self.scheduler.cancel_frame(handle);
        }
    }

    fn record(&mut self, event: RenderEvent) {
        match event.severity {
            RenderEventSeverity::Info => info!(
                category = ?event.category,
                details = ?event.details,
                "{}",
                event.message
            ),
            RenderEventSeverity::Warning => warn!(
                category = ?event.category,
                details = ?event.details,
                "{}",
                event.message
            ),
            RenderEventSeverity::Error | RenderEventSeverity::Fatal => error!(
                category = ?event.category,
                details = ?event.details,
                "{}",
                event.message
            ),
        }
        if self.event_log_capacity == 0 {
            return;
        }
        while self.events.len() >= self.event_log_capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

impl<F: SurfaceFactory> Drop for RenderSupervisor<F> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use folio_caps::{
        CapabilitySnapshot, CpuArchitecture, CpuProfile, CpuTiming, DeviceCategory, GpuProfile,
        ProbeConfig, RenderConfig,
    };

    use super::*;

    #[derive(Default)]
    struct Log {
        mounts: Vec<u32>,
        teardowns: Vec<u32>,
        applied: Vec<RenderConfig>,
        fallback_shown: u32,
        requested: i32,
        cancelled: Vec<FrameHandle>,
        notes: Vec<Notification>,
        repairs: u32,
        forced: u32,
    }

    type Shared = Rc<RefCell<Log>>;

    struct Surface {
        id: u32,
        log: Shared,
        fail_mount: bool,
    }

    impl RenderSurface for Surface {
        fn mount(&mut self, _config: &RenderConfig) -> Result<(), RenderFault> {
            self.log.borrow_mut().mounts.push(self.id);
            if self.fail_mount {
                return Err(RenderFault::Init(format!("surface {} refused", self.id)));
            }
            Ok(())
        }

        fn apply_config(&mut self, config: &RenderConfig) {
            self.log.borrow_mut().applied.push(*config);
        }

        fn render_frame(&mut self, _now_ms: f64) -> Result<(), RenderFault> {
            Ok(())
        }

        fn teardown(&mut self) {
            self.log.borrow_mut().teardowns.push(self.id);
        }
    }

    struct Factory {
        log: Shared,
        failing_generations: Vec<u32>,
    }

    impl SurfaceFactory for Factory {
        type Surface = Surface;

        fn create(&mut self, generation: u32) -> Surface {
            Surface {
                id: generation,
                log: self.log.clone(),
                fail_mount: self.failing_generations.contains(&generation),
            }
        }

        fn show_fallback(&mut self) {
            self.log.borrow_mut().fallback_shown += 1;
        }
    }

    struct Scheduler(Shared);

    impl FrameScheduler for Scheduler {
        fn request_frame(&mut self) -> Option<FrameHandle> {
            let mut log = self.0.borrow_mut();
            log.requested += 1;
            Some(log.requested)
        }

        fn cancel_frame(&mut self, handle: FrameHandle) {
            self.0.borrow_mut().cancelled.push(handle);
        }
    }

    struct Repair(Shared);

    impl CompatRepair for Repair {
        fn repair(&mut self) -> bool {
            self.0.borrow_mut().repairs += 1;
            false
        }

        fn force_repair(&mut self) -> bool {
            self.0.borrow_mut().forced += 1;
            true
        }
    }

    fn high_end_store() -> CapabilityStore {
        let mut gpu = GpuProfile::conservative();
        gpu.is_low_end = false;
        gpu.is_integrated = false;
        let cpu = CpuProfile::classify(
            16,
            CpuArchitecture::X86_64,
            true,
            CpuTiming {
                measured: Duration::from_micros(1000),
                expected: Duration::from_micros(1500),
            },
            &ProbeConfig::default(),
        );
        CapabilityStore::new(CapabilitySnapshot::new(gpu, cpu))
    }

    fn supervisor(log: &Shared, failing: Vec<u32>) -> RenderSupervisor<Factory> {
        let notes = log.clone();
        RenderSupervisor::new(
            &SupervisorConfig::default(),
            Factory {
                log: log.clone(),
                failing_generations: failing,
            },
            high_end_store(),
            Rc::new(RefCell::new(Repair(log.clone()))),
            Box::new(Scheduler(log.clone())),
            Box::new(move |n: Notification| notes.borrow_mut().notes.push(n)),
        )
    }

    #[test]
    fn start_mounts_and_schedules() {
        let log = Shared::default();
        let mut sup = supervisor(&log, vec![]);
        assert_eq!(sup.start(0.0), Phase::Rendering);
        assert_eq!(sup.generation(), 1);
        assert_eq!(sup.pending_frame(), Some(1));
        assert_eq!(sup.tick(16.0), TickOutcome::Rendered);
        assert_eq!(sup.stats().snapshot().frames_rendered, 1);
    }

    #[test]
    fn remount_uses_a_new_instance() {
        let log = Shared::default();
        let mut sup = supervisor(&log, vec![]);
        sup.start(0.0);
        let outcome = sup.report_fault(RenderFault::Frame("boom".into()), 5.0);
        assert_eq!(outcome, FaultOutcome::Recovered { attempt: 1 });
        assert_eq!(sup.phase(), Phase::Rendering);
        assert_eq!(log.borrow().mounts, vec![1, 2]);
        assert_eq!(log.borrow().teardowns, vec![1]);
        assert_eq!(log.borrow().repairs, 1);
        assert_eq!(log.borrow().forced, 0);
    }

    #[test]
    fn compatibility_faults_force_the_repair() {
        let log = Shared::default();
        let mut sup = supervisor(&log, vec![]);
        sup.start(0.0);
        sup.report_fault(
            RenderFault::Compatibility(crate::CompatFault::MissingField("currentOwner".into())),
            1.0,
        );
        assert_eq!(log.borrow().forced, 1);
        assert_eq!(log.borrow().repairs, 0);
    }

    #[test]
    fn third_fault_is_terminal() {
        let log = Shared::default();
        let mut sup = supervisor(&log, vec![]);
        sup.start(0.0);
        for _ in 0..2 {
            sup.report_fault(RenderFault::Frame("boom".into()), 1.0);
        }
        assert_eq!(sup.phase(), Phase::Rendering);
        assert_eq!(
            sup.report_fault(RenderFault::Frame("boom".into()), 2.0),
            FaultOutcome::Fallback
        );
        assert_eq!(sup.phase(), Phase::Fallback);
        assert_eq!(log.borrow().fallback_shown, 1);
        assert!(sup.surface().is_none());

        let repairs = log.borrow().repairs;
        assert_eq!(
            sup.report_fault(RenderFault::Frame("boom".into()), 3.0),
            FaultOutcome::Ignored
        );
        assert_eq!(log.borrow().repairs, repairs);
        assert_eq!(sup.attempts(), 3);
        assert_eq!(sup.tick(4.0), TickOutcome::Idle);

        let fallback_notes = log
            .borrow()
            .notes
            .iter()
            .filter(|n| n.kind == crate::NotificationKind::Fallback)
            .count();
        assert_eq!(fallback_notes, 1);
    }

    #[test]
    fn failed_remounts_consume_attempts() {
        let log = Shared::default();
        let mut sup = supervisor(&log, vec![2, 3]);
        sup.start(0.0);
        let outcome = sup.report_fault(RenderFault::Frame("boom".into()), 1.0);
        assert_eq!(outcome, FaultOutcome::Fallback);
        assert_eq!(sup.attempts(), 3);
        assert_eq!(log.borrow().mounts, vec![1, 2, 3]);
    }

    #[test]
    fn failed_first_mount_enters_recovery() {
        let log = Shared::default();
        let mut sup = supervisor(&log, vec![1]);
        assert_eq!(sup.start(0.0), Phase::Rendering);
        assert_eq!(sup.attempts(), 1);
        assert_eq!(sup.generation(), 2);
    }

    #[test]
    fn context_loss_suspends_and_restore_applies_conservative_config() {
        let log = Shared::default();
        let mut sup = supervisor(&log, vec![]);
        sup.start(0.0);
        assert_eq!(sup.store().load().config.category, DeviceCategory::HighEnd);

        sup.on_context_lost(10.0);
        assert!(sup.is_suspended());
        assert_eq!(sup.pending_frame(), None);
        assert_eq!(log.borrow().cancelled, vec![1]);
        assert_eq!(sup.tick(20.0), TickOutcome::Suspended);

        sup.on_context_restored(30.0);
        assert!(!sup.is_suspended());
        assert_eq!(sup.phase(), Phase::Rendering);
        let applied = log.borrow().applied.clone();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].category, DeviceCategory::LowEnd);
        assert_eq!(sup.attempts(), 0);
        assert_eq!(sup.tick(40.0), TickOutcome::Rendered);
    }

    #[test]
    fn context_lost_fault_from_a_frame_is_not_a_retry() {
        let log = Shared::default();
        let mut sup = supervisor(&log, vec![]);
        sup.start(0.0);
        assert_eq!(
            sup.report_fault(RenderFault::ContextLost, 1.0),
            FaultOutcome::Ignored
        );
        assert!(sup.is_suspended());
        assert_eq!(sup.attempts(), 0);
    }

    #[test]
    fn event_log_is_bounded() {
        let log = Shared::default();
        let mut sup = RenderSupervisor::new(
            &SupervisorConfig {
                max_attempts: 100,
                event_log_capacity: 4,
            },
            Factory {
                log: log.clone(),
                failing_generations: vec![],
            },
            high_end_store(),
            Rc::new(RefCell::new(Repair(log.clone()))),
            Box::new(Scheduler(log.clone())),
            Box::new(|_: Notification| {}),
        );
        sup.start(0.0);
        for i in 0..10 {
            sup.report_fault(RenderFault::Frame(format!("fault {i}")), i as f64);
        }
        assert_eq!(sup.events().count(), 4);
        let last = sup.take_events().pop().map(|e| e.category);
        assert_eq!(last, Some(RenderEventCategory::Recovery));
        assert_eq!(sup.events().count(), 0);
    }

    #[test]
    fn teardown_is_idempotent_and_drop_releases() {
        let log = Shared::default();
        {
            let mut sup = supervisor(&log, vec![]);
            sup.start(0.0);
            sup.teardown();
            sup.teardown();
            assert_eq!(sup.tick(1.0), TickOutcome::Idle);
        }
        assert_eq!(log.borrow().teardowns, vec![1]);
        assert_eq!(log.borrow().cancelled, vec![1]);
    }
}
