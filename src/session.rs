use std::rc::Rc;

use folio_caps::{
    CapabilityProbe, CapabilitySnapshot, CapabilityStore, CpuProbeSource, GpuProbeSource,
};
use folio_particles::{AdaptiveParticleController, ParticleTick, Viewport};
use folio_render::{
    install_watcher, Disposer, ErrorChannel, FaultFilter, FrameScheduler, Notifier, Phase,
    RenderSupervisor, SharedRepair, SurfaceFactory, TickOutcome,
};
use tracing::info;

use crate::Config;

/// Run the probe once and publish the first snapshot.
pub fn detect<G: GpuProbeSource, C: CpuProbeSource>(
    probe: &mut CapabilityProbe<G, C>,
) -> CapabilityStore {
    let (gpu, cpu) = probe.probe();
    let snapshot = CapabilitySnapshot::new(gpu, cpu);
    info!(
        category = snapshot.config.category.as_str(),
        renderer = %snapshot.gpu.renderer,
        logical_cores = snapshot.cpu.logical_cores,
        throttled = snapshot.cpu.throttled,
        "capabilities detected"
    );
    CapabilityStore::new(snapshot)
}

/// Host-provided collaborators for one page session.
pub struct Platform<F: SurfaceFactory> {
    pub factory: F,
    pub scheduler: Box<dyn FrameScheduler>,
    pub notifier: Box<dyn Notifier>,
    pub errors: Rc<dyn ErrorChannel>,
    pub viewport: Viewport,
}

/// The render supervisor and the particle controller wired to one capability store and
/// one compatibility shim.
pub struct Session<F: SurfaceFactory> {
    store: CapabilityStore,
    supervisor: RenderSupervisor<F>,
    particles: AdaptiveParticleController,
}

impl<F: SurfaceFactory> Session<F> {
    pub fn new(
        config: &Config,
        store: CapabilityStore,
        repair: SharedRepair,
        platform: Platform<F>,
    ) -> Self {
        let Platform {
            factory,
            scheduler,
            notifier,
            errors,
            viewport,
        } = platform;

        let mut supervisor = RenderSupervisor::new(
            &config.supervisor,
            factory,
            store.clone(),
            repair.clone(),
            scheduler,
            notifier,
        );
        let guard = install_watcher(
            repair,
            FaultFilter::new(config.fault_signatures.iter().cloned()),
            errors,
            supervisor.fault_inbox(),
        );
        supervisor.attach(Box::new(guard));

        let particles = AdaptiveParticleController::new(
            config.particles.clone(),
            &store.load().config,
            viewport,
        );

        Self {
            store,
            supervisor,
            particles,
        }
    }

    pub fn store(&self) -> &CapabilityStore {
        &self.store
    }

    pub fn snapshot(&self) -> Rc<CapabilitySnapshot> {
        self.store.load()
    }

    pub fn supervisor(&self) -> &RenderSupervisor<F> {
        &self.supervisor
    }

    pub fn supervisor_mut(&mut self) -> &mut RenderSupervisor<F> {
        &mut self.supervisor
    }

    pub fn particles(&self) -> &AdaptiveParticleController {
        &self.particles
    }

    pub fn phase(&self) -> Phase {
        self.supervisor.phase()
    }

    /// Extra listeners to release together with the watcher.
    pub fn attach(&mut self, disposer: Box<dyn Disposer>) {
        self.supervisor.attach(disposer);
    }

    pub fn start(&mut self, now_ms: f64) -> Phase {
        self.supervisor.start(now_ms)
    }

    pub fn render_tick(&mut self, now_ms: f64) -> TickOutcome {
        self.supervisor.tick(now_ms)
    }

    pub fn particle_tick(&mut self, now_ms: f64) -> ParticleTick {
        self.particles.tick(now_ms)
    }

    /// Suspends rendering and moves the particles to the degraded category.
    pub fn context_lost(&mut self, now_ms: f64) {
        self.supervisor.on_context_lost(now_ms);
        self.particles.apply_render_config(&self.store.load().config);
    }

    pub fn context_restored(&mut self, now_ms: f64) {
        self.supervisor.on_context_restored(now_ms);
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.particles.set_visible(visible);
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.particles.resize(viewport);
    }

    pub fn teardown(&mut self) {
        self.supervisor.teardown();
    }
}
