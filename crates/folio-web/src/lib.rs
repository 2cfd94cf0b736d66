//! Browser bindings: WebGL/CPU probe sources, the window error channel, the JS-backed
//! scene surface and the `FolioController` exported to the page.
#![forbid(unsafe_code)]

// The full implementation is only meaningful on wasm32.
#[cfg(target_arch = "wasm32")]
mod cpu;
#[cfg(target_arch = "wasm32")]
mod errors;
#[cfg(target_arch = "wasm32")]
mod gpu;
#[cfg(target_arch = "wasm32")]
mod runtime;
#[cfg(target_arch = "wasm32")]
mod surface;
#[cfg(target_arch = "wasm32")]
mod visibility;

#[cfg(target_arch = "wasm32")]
pub use wasm::*;

#[cfg(target_arch = "wasm32")]
mod wasm {
    use std::cell::{Ref, RefCell, RefMut};
    use std::rc::{Rc, Weak};
    use std::str::FromStr;

    use folio::caps::CapabilityProbe;
    use folio::particles::Viewport;
    use folio::render::{
        CompatibilityShim, FaultFilter, IntegrationVersion, SharedRepair, TickOutcome,
    };
    use folio::{detect, Config, Platform, Session};
    use js_sys::{Float32Array, Function, Object};
    use tracing::{info, warn};
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, Event, HtmlCanvasElement, Window};

    pub use crate::cpu::BrowserCpuSource;
    pub use crate::errors::WindowErrorChannel;
    pub use crate::gpu::WebGlProbe;
    pub use crate::runtime::JsRuntimeHost;
    pub use crate::surface::{
        FrameCallback, JsScene, JsSceneFactory, NotificationQueue, RafScheduler,
    };
    pub use crate::visibility::{is_visible, DomListener};

    #[wasm_bindgen(start)]
    pub fn wasm_start() {
        console_error_panic_hook::set_once();
        tracing_wasm::set_as_global_default();
    }

    type SharedSession = Rc<RefCell<Session<JsSceneFactory>>>;

    fn browser() -> Result<(Window, Document), JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        Ok((window, document))
    }

    fn now(window: &Window) -> f64 {
        window.performance().map_or(0.0, |p| p.now())
    }

    /// Runs `f` on the session, then hands queued notifications to the page with the
    /// session released.
    fn with_session(
        weak: &Weak<RefCell<Session<JsSceneFactory>>>,
        notifications: &NotificationQueue,
        f: impl FnOnce(&mut Session<JsSceneFactory>),
    ) {
        let Some(session) = weak.upgrade() else {
            return;
        };
        match session.try_borrow_mut() {
            Ok(mut session) => f(&mut session),
            Err(_) => warn!("session busy; browser event dropped"),
        };
        notifications.flush();
    }

    fn busy() -> JsValue {
        JsValue::from_str("folio controller is busy; retry outside scene callbacks")
    }

    /// One page's adaptive 3D controller.
    #[wasm_bindgen]
    pub struct FolioController {
        window: Window,
        session: SharedSession,
        frame: FrameCallback,
        notifications: NotificationQueue,
        // Not attached to the supervisor: particles keep following visibility after a
        // fallback.
        visibility: Option<DomListener>,
    }

    #[wasm_bindgen]
    impl FolioController {
        /// `scene` provides `create(generation)` and `showFallback()`; `notify` receives
        /// `{ kind, title, description, severity }` objects. `config` may be `undefined`.
        #[wasm_bindgen(constructor)]
        pub fn new(
            canvas: HtmlCanvasElement,
            runtime: Object,
            integration_version: &str,
            scene: JsValue,
            notify: Function,
            config: JsValue,
        ) -> Result<FolioController, JsValue> {
            let config: Config = if config.is_undefined() || config.is_null() {
                Config::default()
            } else {
                serde_wasm_bindgen::from_value(config)?
            };
            config
                .validate()
                .map_err(|err| JsValue::from_str(&err.to_string()))?;

            let (window, document) = browser()?;
            let user_agent = window.navigator().user_agent().unwrap_or_default();

            let mut probe = CapabilityProbe::new(
                WebGlProbe::new(document.clone(), user_agent),
                BrowserCpuSource::new(window.clone()),
                config.probe.clone(),
            );
            let store = detect(&mut probe);

            let mut shim = CompatibilityShim::new(JsRuntimeHost::new(runtime));
            match IntegrationVersion::from_str(integration_version)
                .and_then(|version| shim.ensure_compat(version))
            {
                Ok(adapter) => info!(adapter = adapter.name, "compatibility adapter selected"),
                Err(err) => warn!(error = %err, "no compatibility adapter; repairs disabled"),
            }
            let repair: SharedRepair = shim.into_shared();

            let filter = Rc::new(FaultFilter::new(config.fault_signatures.iter().cloned()));
            let frame: FrameCallback = Rc::new(RefCell::new(None));
            let notifications = NotificationQueue::new(notify);
            let platform = Platform {
                factory: JsSceneFactory::from_host(&scene, filter)?,
                scheduler: Box::new(RafScheduler::new(window.clone(), Rc::clone(&frame))),
                notifier: Box::new(notifications.clone()),
                errors: Rc::new(WindowErrorChannel::new(window.clone())),
                viewport: Viewport::new(
                    canvas.client_width() as f32,
                    canvas.client_height() as f32,
                ),
            };
            let session: SharedSession =
                Rc::new(RefCell::new(Session::new(&config, store, repair, platform)));

            let weak = Rc::downgrade(&session);
            let queue = notifications.clone();
            *frame.borrow_mut() = Some(Closure::wrap(Box::new(move |now_ms: f64| {
                with_session(&weak, &queue, |session| {
                    if session.render_tick(now_ms) == TickOutcome::Fallback {
                        info!("3D view switched to static fallback");
                    }
                });
            }) as Box<dyn FnMut(f64)>));

            let weak = Rc::downgrade(&session);
            let clock = window.clone();
            let queue = notifications.clone();
            let lost =
                DomListener::listen(canvas.as_ref(), "webglcontextlost", move |event: Event| {
                    // Required for the browser to ever fire `webglcontextrestored`.
                    event.prevent_default();
                    with_session(&weak, &queue, |session| session.context_lost(now(&clock)));
                })?;

            let weak = Rc::downgrade(&session);
            let clock = window.clone();
            let queue = notifications.clone();
            let restored =
                DomListener::listen(canvas.as_ref(), "webglcontextrestored", move |_: Event| {
                    with_session(&weak, &queue, |session| {
                        session.context_restored(now(&clock))
                    });
                })?;

            {
                let mut session = session.borrow_mut();
                session.attach(Box::new(lost));
                session.attach(Box::new(restored));
            }

            let weak = Rc::downgrade(&session);
            let queue = notifications.clone();
            let doc = document.clone();
            let visibility =
                DomListener::listen(document.as_ref(), "visibilitychange", move |_: Event| {
                    let visible = is_visible(&doc);
                    with_session(&weak, &queue, |session| session.set_visible(visible));
                })?;
            session.borrow_mut().set_visible(is_visible(&document));

            Ok(FolioController {
                window,
                session,
                frame,
                notifications,
                visibility: Some(visibility),
            })
        }

        /// Mount the first scene and start the frame loop. Returns the phase.
        pub fn start(&self) -> Result<String, JsValue> {
            let now_ms = now(&self.window);
            let phase = self.write()?.start(now_ms);
            self.notifications.flush();
            Ok(phase.as_str().to_string())
        }

        pub fn phase(&self) -> Result<String, JsValue> {
            Ok(self.read()?.phase().as_str().to_string())
        }

        pub fn attempts(&self) -> Result<u32, JsValue> {
            Ok(self.read()?.supervisor().attempts())
        }

        pub fn category(&self) -> Result<String, JsValue> {
            Ok(self.read()?.snapshot().config.category.as_str().to_string())
        }

        /// The current merged configuration as a plain object.
        #[wasm_bindgen(js_name = renderConfig)]
        pub fn render_config(&self) -> Result<JsValue, JsValue> {
            let snapshot = self.read()?.snapshot();
            Ok(serde_wasm_bindgen::to_value(&snapshot.config)?)
        }

        /// Advance the particle animation; `true` when the page should redraw it.
        #[wasm_bindgen(js_name = particleTick)]
        pub fn particle_tick(&self, now_ms: f64) -> Result<bool, JsValue> {
            Ok(matches!(
                self.write()?.particle_tick(now_ms),
                folio::particles::ParticleTick::Rendered { .. }
            ))
        }

        /// Flat `[x, y, radius, ...]` of the current particle set.
        pub fn particles(&self) -> Result<Float32Array, JsValue> {
            let session = self.read()?;
            let flat: Vec<f32> = session
                .particles()
                .field()
                .particles()
                .iter()
                .flat_map(|p| [p.x, p.y, p.radius])
                .collect();
            Ok(Float32Array::from(flat.as_slice()))
        }

        pub fn resize(&self, width: f32, height: f32) -> Result<(), JsValue> {
            self.write()?.resize(Viewport::new(width, height));
            Ok(())
        }

        pub fn stats(&self) -> Result<JsValue, JsValue> {
            let stats = self.read()?.supervisor().stats().snapshot();
            Ok(serde_wasm_bindgen::to_value(&stats)?)
        }

        /// Recovery events recorded since the last call.
        #[wasm_bindgen(js_name = takeEvents)]
        pub fn take_events(&self) -> Result<JsValue, JsValue> {
            let events = self.write()?.supervisor_mut().take_events();
            Ok(serde_wasm_bindgen::to_value(&events)?)
        }

        pub fn dispose(&mut self) {
            // Dropping the listener removes it.
            self.visibility = None;
            match self.session.try_borrow_mut() {
                Ok(mut session) => session.teardown(),
                Err(_) => warn!("dispose called from a scene callback; teardown skipped"),
            }
            self.frame.borrow_mut().take();
            self.notifications.flush();
        }
    }

    impl FolioController {
        fn read(&self) -> Result<Ref<'_, Session<JsSceneFactory>>, JsValue> {
            self.session.try_borrow().map_err(|_| busy())
        }

        fn write(&self) -> Result<RefMut<'_, Session<JsSceneFactory>>, JsValue> {
            self.session.try_borrow_mut().map_err(|_| busy())
        }
    }

    impl Drop for FolioController {
        fn drop(&mut self) {
            self.dispose();
        }
    }
}

/// Best-effort text of a thrown JS value.
#[cfg(target_arch = "wasm32")]
pub(crate) fn js_message(value: &wasm_bindgen::JsValue) -> String {
    use wasm_bindgen::JsCast;

    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}
