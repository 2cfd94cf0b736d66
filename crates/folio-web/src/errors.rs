use std::cell::{Cell, RefCell};

use folio::render::{ErrorChannel, ErrorDisposition, ErrorHandler, ErrorReport, ListenerId};
use tracing::warn;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{ErrorEvent, Window};

use crate::js_message;

type ErrorClosure = Closure<dyn FnMut(ErrorEvent)>;

/// `window` `error` events, observed in the capture phase. A handled error has its
/// default console report suppressed.
pub struct WindowErrorChannel {
    window: Window,
    next_id: Cell<ListenerId>,
    listeners: RefCell<Vec<(ListenerId, ErrorClosure)>>,
}

impl WindowErrorChannel {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            next_id: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
        }
    }
}

impl ErrorChannel for WindowErrorChannel {
    fn subscribe(&self, mut handler: ErrorHandler) -> ListenerId {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);

        let closure = Closure::wrap(Box::new(move |event: ErrorEvent| {
            let filename = event.filename();
            let report = ErrorReport {
                message: event.message(),
                source: (!filename.is_empty()).then_some(filename),
            };
            if handler(&report) == ErrorDisposition::Handled {
                event.prevent_default();
                event.stop_immediate_propagation();
            }
        }) as Box<dyn FnMut(ErrorEvent)>);

        if let Err(err) = self.window.add_event_listener_with_callback_and_bool(
            "error",
            closure.as_ref().unchecked_ref(),
            true,
        ) {
            warn!(error = %js_message(&err), "could not observe window errors");
        }
        self.listeners.borrow_mut().push((id, closure));
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        let mut listeners = self.listeners.borrow_mut();
        let Some(pos) = listeners.iter().position(|(lid, _)| *lid == id) else {
            return;
        };
        let (_, closure) = listeners.remove(pos);
        let _ = self.window.remove_event_listener_with_callback_and_bool(
            "error",
            closure.as_ref().unchecked_ref(),
            true,
        );
    }
}

impl Drop for WindowErrorChannel {
    fn drop(&mut self) {
        for (_, closure) in self.listeners.get_mut().drain(..) {
            let _ = self.window.remove_event_listener_with_callback_and_bool(
                "error",
                closure.as_ref().unchecked_ref(),
                true,
            );
        }
    }
}
