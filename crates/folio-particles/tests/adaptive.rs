use folio_caps::{merge, CpuProfile, DetailLevels, DeviceCategory, GpuProfile, RenderConfig};
use folio_particles::{AdaptiveParticleController, ParticleConfig, ParticleTick, Viewport};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn render_for(category: DeviceCategory) -> RenderConfig {
    let mut config = merge(&GpuProfile::conservative(), &CpuProfile::conservative());
    config.category = category;
    config.detail = DetailLevels::for_category(category);
    config
}

fn category() -> impl Strategy<Value = DeviceCategory> {
    prop::sample::select(DeviceCategory::ALL.to_vec())
}

#[test]
fn sustained_slowness_settles_at_the_floor() {
    let config = ParticleConfig::default();
    let mut controller = AdaptiveParticleController::new(
        config.clone(),
        &render_for(DeviceCategory::HighEnd),
        Viewport::new(1920.0, 1080.0),
    );
    assert_eq!(controller.count(), 800);
    let mut now = 0.0;
    for _ in 0..5_000 {
        controller.tick(now);
        now += 100.0;
    }
    assert_eq!(controller.count(), config.min_particles);
    assert_eq!(controller.field().len(), config.min_particles as usize);
}

#[test]
fn low_end_starts_smaller_than_high_end() {
    let viewport = Viewport::new(1280.0, 720.0);
    let low = AdaptiveParticleController::new(
        ParticleConfig::default(),
        &render_for(DeviceCategory::LowEnd),
        viewport,
    );
    let high = AdaptiveParticleController::new(
        ParticleConfig::default(),
        &render_for(DeviceCategory::HighEnd),
        viewport,
    );
    assert!(low.count() < high.count());
}

proptest! {
    #[test]
    fn count_never_drops_below_floor(
        category in category(),
        width in 1.0f32..4000.0,
        height in 1.0f32..4000.0,
        intervals in prop::collection::vec(0.0f64..250.0, 1..400),
    ) {
        let config = ParticleConfig::default();
        let mut controller = AdaptiveParticleController::new(
            config.clone(),
            &render_for(category),
            Viewport::new(width, height),
        );
        let mut previous = controller.count();
        prop_assert!(previous >= config.min_particles);

        let mut now = 0.0;
        for dt in intervals {
            now += dt;
            if let ParticleTick::Rendered { rebuilt: true } = controller.tick(now) {
                prop_assert_eq!(controller.count(), previous.saturating_sub(config.reduction_step).max(config.min_particles));
            }
            prop_assert!(controller.count() >= config.min_particles);
            prop_assert!(controller.count() <= previous);
            prop_assert_eq!(controller.field().len(), controller.count() as usize);
            previous = controller.count();
        }
    }

    #[test]
    fn hidden_ticks_never_render(intervals in prop::collection::vec(0.0f64..1000.0, 1..50)) {
        let mut controller = AdaptiveParticleController::new(
            ParticleConfig::default(),
            &render_for(DeviceCategory::MidRange),
            Viewport::new(800.0, 600.0),
        );
        controller.set_visible(false);
        let mut now = 0.0;
        for dt in intervals {
            now += dt;
            prop_assert_eq!(controller.tick(now), ParticleTick::Paused);
        }
    }
}
