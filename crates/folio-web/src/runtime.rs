use folio::render::{CompatError, RuntimeHost};
use js_sys::{Object, Reflect};
use wasm_bindgen::JsValue;

use crate::js_message;

/// The runtime-internals object the 3D integration layer reads from.
pub struct JsRuntimeHost {
    internals: Object,
}

impl JsRuntimeHost {
    pub fn new(internals: Object) -> Self {
        Self { internals }
    }
}

impl RuntimeHost for JsRuntimeHost {
    fn has_field(&self, name: &str) -> bool {
        Reflect::get(&self.internals, &JsValue::from_str(name))
            .map(|v| !v.is_undefined() && !v.is_null())
            .unwrap_or(false)
    }

    /// Installs `{ current: null }`, the shape every expected field has.
    fn install_stand_in(&mut self, name: &str) -> Result<(), CompatError> {
        let stand_in = Object::new();
        Reflect::set(&stand_in, &JsValue::from_str("current"), &JsValue::NULL)
            .and_then(|_| Reflect::set(&self.internals, &JsValue::from_str(name), &stand_in))
            .map_err(|err| CompatError::StandIn {
                field: name.to_string(),
                reason: js_message(&err),
            })
            .and_then(|written| {
                if written {
                    Ok(())
                } else {
                    Err(CompatError::StandIn {
                        field: name.to_string(),
                        reason: "object is frozen".into(),
                    })
                }
            })
    }
}
