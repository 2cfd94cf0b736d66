use folio::caps::{AdapterReport, GpuExtensions, GpuProbeSource, ProbeError};
use js_sys::{Function, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, HtmlCanvasElement, WebGlRenderingContext as Gl};

use crate::js_message;

/// `WEBGL_debug_renderer_info` enums; web-sys does not expose the extension object.
const UNMASKED_VENDOR_WEBGL: u32 = 0x9245;
const UNMASKED_RENDERER_WEBGL: u32 = 0x9246;

const EXTENSIONS: &[(&str, GpuExtensions)] = &[
    ("ANGLE_instanced_arrays", GpuExtensions::INSTANCED_ARRAYS),
    ("WEBGL_draw_buffers", GpuExtensions::DRAW_BUFFERS),
    ("OES_texture_float", GpuExtensions::FLOAT_TEXTURES),
    ("EXT_texture_filter_anisotropic", GpuExtensions::ANISOTROPIC_FILTERING),
];

const MOBILE_USER_AGENT_HINTS: &[&str] = &["Mobi", "Android", "iPhone", "iPad"];

/// Reads the adapter through a throwaway WebGL context on a detached canvas.
pub struct WebGlProbe {
    document: Document,
    user_agent: String,
}

impl WebGlProbe {
    pub fn new(document: Document, user_agent: String) -> Self {
        Self {
            document,
            user_agent,
        }
    }

    fn context(&self) -> Result<Gl, ProbeError> {
        let canvas: HtmlCanvasElement = self
            .document
            .create_element("canvas")
            .map_err(|err| ProbeError::Platform(js_message(&err)))?
            .dyn_into()
            .map_err(|_| ProbeError::Platform("created element is not a canvas".into()))?;
        canvas
            .get_context("webgl")
            .map_err(|err| ProbeError::Platform(js_message(&err)))?
            .ok_or(ProbeError::ContextUnavailable)?
            .dyn_into::<Gl>()
            .map_err(|_| ProbeError::ContextUnavailable)
    }
}

impl GpuProbeSource for WebGlProbe {
    fn acquire(&mut self) -> Result<AdapterReport, ProbeError> {
        let gl = self.context()?;

        let (vendor, renderer) = match gl.get_extension("WEBGL_debug_renderer_info") {
            Ok(Some(_)) => (
                string_parameter(&gl, UNMASKED_VENDOR_WEBGL),
                string_parameter(&gl, UNMASKED_RENDERER_WEBGL),
            ),
            _ => (
                string_parameter(&gl, Gl::VENDOR),
                string_parameter(&gl, Gl::RENDERER),
            ),
        };

        let mut extensions = GpuExtensions::empty();
        let mut extension_query_failed = false;
        for &(name, flag) in EXTENSIONS {
            match gl.get_extension(name) {
                Ok(Some(_)) => extensions |= flag,
                Ok(None) => {}
                Err(_) => extension_query_failed = true,
            }
        }

        let max_texture_size = gl
            .get_parameter(Gl::MAX_TEXTURE_SIZE)
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0) as u32;

        release(&gl);

        Ok(AdapterReport {
            vendor,
            renderer,
            extensions,
            max_texture_size,
            mobile_platform: MOBILE_USER_AGENT_HINTS
                .iter()
                .any(|hint| self.user_agent.contains(hint)),
            extension_query_failed,
        })
    }
}

fn string_parameter(gl: &Gl, pname: u32) -> String {
    gl.get_parameter(pname)
        .ok()
        .and_then(|v| v.as_string())
        .unwrap_or_default()
}

/// Browsers cap live contexts per page; hand the probe's back right away.
fn release(gl: &Gl) {
    let Ok(Some(ext)) = gl.get_extension("WEBGL_lose_context") else {
        return;
    };
    let lose = Reflect::get(&ext, &JsValue::from_str("loseContext"))
        .ok()
        .and_then(|f| f.dyn_into::<Function>().ok());
    if let Some(lose) = lose {
        let _ = lose.call0(&ext);
    }
}
