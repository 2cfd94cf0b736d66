use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use folio::caps::RenderConfig;
use folio::render::{
    ErrorReport, FaultFilter, FrameHandle, FrameScheduler, Notification, Notifier, RenderFault,
    RenderSurface, SurfaceFactory,
};
use js_sys::{Array, Function, Reflect};
use tracing::warn;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::Window;

use crate::js_message;

pub type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

fn call_method(target: &JsValue, name: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let method: Function = Reflect::get(target, &JsValue::from_str(name))?.dyn_into()?;
    method.apply(target, &args.iter().collect::<Array>())
}

fn get_function(target: &JsValue, name: &str) -> Result<Function, JsValue> {
    Reflect::get(target, &JsValue::from_str(name))?
        .dyn_into()
        .map_err(|_| JsValue::from_str(&format!("scene host is missing `{name}()`")))
}

/// One scene instance created by the page's `create(generation)` callback.
///
/// Scene objects expose `mount(config)`, `applyConfig(config)`, `renderFrame(now)` and
/// `teardown()`.
pub struct JsScene {
    object: Result<JsValue, RenderFault>,
    filter: Rc<FaultFilter>,
}

impl JsScene {
    fn fault(&self, err: &JsValue, stage: fn(String) -> RenderFault) -> RenderFault {
        let message = js_message(err);
        match self.filter.classify(&ErrorReport::new(message.clone())) {
            Some(fault) => RenderFault::Compatibility(fault),
            None => stage(message),
        }
    }

    fn call(
        &self,
        name: &str,
        args: &[JsValue],
        stage: fn(String) -> RenderFault,
    ) -> Result<JsValue, RenderFault> {
        let object = self.object.as_ref().map_err(Clone::clone)?;
        call_method(object, name, args).map_err(|err| self.fault(&err, stage))
    }
}

fn config_value(config: &RenderConfig) -> Result<JsValue, RenderFault> {
    serde_wasm_bindgen::to_value(config).map_err(|err| RenderFault::Init(err.to_string()))
}

impl RenderSurface for JsScene {
    fn mount(&mut self, config: &RenderConfig) -> Result<(), RenderFault> {
        let config = config_value(config)?;
        self.call("mount", &[config], RenderFault::Init).map(drop)
    }

    fn apply_config(&mut self, config: &RenderConfig) {
        let result = config_value(config)
            .and_then(|config| self.call("applyConfig", &[config], RenderFault::Init));
        if let Err(err) = result {
            warn!(error = %err, "scene rejected the restored configuration");
        }
    }

    fn render_frame(&mut self, now_ms: f64) -> Result<(), RenderFault> {
        self.call("renderFrame", &[JsValue::from_f64(now_ms)], RenderFault::Frame)
            .map(drop)
    }

    fn teardown(&mut self) {
        if self.object.is_err() {
            return;
        }
        if let Err(err) = self.call("teardown", &[], RenderFault::Frame) {
            warn!(error = %err, "scene teardown failed");
        }
    }
}

pub struct JsSceneFactory {
    create: Function,
    show_fallback: Function,
    filter: Rc<FaultFilter>,
}

impl JsSceneFactory {
    /// `host` must provide `create(generation)` and `showFallback()`.
    pub fn from_host(host: &JsValue, filter: Rc<FaultFilter>) -> Result<Self, JsValue> {
        Ok(Self {
            create: get_function(host, "create")?,
            show_fallback: get_function(host, "showFallback")?,
            filter,
        })
    }
}

impl SurfaceFactory for JsSceneFactory {
    type Surface = JsScene;

    fn create(&mut self, generation: u32) -> JsScene {
        let object = self
            .create
            .call1(&JsValue::NULL, &JsValue::from(generation))
            .map_err(|err| RenderFault::Init(js_message(&err)));
        JsScene {
            object,
            filter: Rc::clone(&self.filter),
        }
    }

    fn show_fallback(&mut self) {
        if let Err(err) = self.show_fallback.call0(&JsValue::NULL) {
            warn!(error = %js_message(&err), "fallback view could not be shown");
        }
    }
}

/// `requestAnimationFrame` driving a callback installed after construction.
pub struct RafScheduler {
    window: Window,
    callback: FrameCallback,
}

impl RafScheduler {
    pub fn new(window: Window, callback: FrameCallback) -> Self {
        Self { window, callback }
    }
}

impl FrameScheduler for RafScheduler {
    fn request_frame(&mut self) -> Option<FrameHandle> {
        let callback = self.callback.borrow();
        let callback = callback.as_ref()?;
        self.window
            .request_animation_frame(callback.as_ref().unchecked_ref())
            .ok()
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        let _ = self.window.cancel_animation_frame(handle);
    }
}

/// Notifications raised while the session is borrowed, delivered to the page callback
/// once it is released so the callback may call back into the controller.
#[derive(Clone)]
pub struct NotificationQueue {
    pending: Rc<RefCell<VecDeque<Notification>>>,
    callback: Function,
}

impl NotificationQueue {
    pub fn new(callback: Function) -> Self {
        Self {
            pending: Rc::new(RefCell::new(VecDeque::new())),
            callback,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    /// Deliver everything queued, including anything queued by the callback itself.
    pub fn flush(&self) {
        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(notification) = next else {
                return;
            };
            let value = match serde_wasm_bindgen::to_value(&notification) {
                Ok(value) => value,
                Err(err) => {
                    warn!(error = %err, "notification could not be serialised");
                    continue;
                }
            };
            if let Err(err) = self.callback.call1(&JsValue::NULL, &value) {
                warn!(error = %js_message(&err), "notification callback failed");
            }
        }
    }
}

impl Notifier for NotificationQueue {
    fn notify(&mut self, notification: Notification) {
        self.pending.borrow_mut().push_back(notification);
    }
}
