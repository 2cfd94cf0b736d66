use std::sync::OnceLock;

use aho_corasick::{AhoCorasick, MatchKind};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Smallest `MAX_TEXTURE_SIZE` we still treat as a capable GPU.
pub const MIN_CAPABLE_TEXTURE_SIZE: u32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    Apple,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerPreference {
    Default,
    HighPerformance,
    LowPower,
}

impl PowerPreference {
    /// Rank used when two recommendations disagree; lower is more conservative.
    pub(crate) fn rank(self) -> u8 {
        match self {
            PowerPreference::LowPower => 0,
            PowerPreference::Default => 1,
            PowerPreference::HighPerformance => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PowerPreference::Default => "default",
            PowerPreference::HighPerformance => "high-performance",
            PowerPreference::LowPower => "low-power",
        }
    }
}

bitflags! {
    /// Optional rendering-context extensions the scene can take advantage of.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct GpuExtensions: u32 {
        const INSTANCED_ARRAYS = 1 << 0;
        const DRAW_BUFFERS = 1 << 1;
        const FLOAT_TEXTURES = 1 << 2;
        const ANISOTROPIC_FILTERING = 1 << 3;
    }
}

/// Context creation attributes recommended for the detected GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSettings {
    pub antialias: bool,
    pub stencil: bool,
    pub depth: bool,
    pub preserve_drawing_buffer: bool,
    pub power_preference: PowerPreference,
}

impl ContextSettings {
    pub const fn minimal() -> Self {
        Self {
            antialias: false,
            stencil: false,
            depth: true,
            preserve_drawing_buffer: false,
            power_preference: PowerPreference::LowPower,
        }
    }
}

/// Raw facts read from a throwaway rendering context, before any classification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AdapterReport {
    /// Unmasked vendor string (`UNMASKED_VENDOR_WEBGL`), or the masked one if the debug
    /// extension is missing.
    pub vendor: String,
    /// Unmasked renderer string (`UNMASKED_RENDERER_WEBGL`).
    pub renderer: String,
    pub extensions: GpuExtensions,
    pub max_texture_size: u32,
    /// The platform itself says it is a phone/tablet.
    pub mobile_platform: bool,
    /// One of the extension queries failed; the extension set is incomplete.
    pub extension_query_failed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuProfile {
    pub vendor: GpuVendor,
    pub renderer: String,
    pub is_integrated: bool,
    pub is_mobile: bool,
    pub is_apple_silicon: bool,
    pub is_low_end: bool,
    pub extensions: GpuExtensions,
    pub max_texture_size: u32,
    pub recommended: ContextSettings,
}

impl GpuProfile {
    /// The profile used when no rendering context could be inspected at all.
    pub fn conservative() -> Self {
        Self {
            vendor: GpuVendor::Unknown,
            renderer: String::from("unknown"),
            is_integrated: true,
            is_mobile: false,
            is_apple_silicon: false,
            is_low_end: true,
            extensions: GpuExtensions::empty(),
            max_texture_size: 2048,
            recommended: ContextSettings::minimal(),
        }
    }

    /// A low-end copy of `self`, used after the browser reclaimed the context.
    ///
    /// Identification fields are kept so logs still name the real GPU.
    pub fn conservative_from(&self) -> Self {
        Self {
            is_low_end: true,
            recommended: ContextSettings::minimal(),
            ..self.clone()
        }
    }

    pub fn from_report(report: &AdapterReport) -> Self {
        let vendor = detect_vendor(&report.renderer)
            .or_else(|| detect_vendor(&report.vendor))
            .unwrap_or(GpuVendor::Unknown);

        let renderer = report.renderer.as_str();
        let is_apple_silicon = matches(renderer, &APPLE_SILICON, APPLE_SILICON_SIGNATURES);
        let is_mobile = report.mobile_platform || matches(renderer, &MOBILE, MOBILE_SIGNATURES);
        let is_integrated = !is_apple_silicon
            && (is_mobile || matches(renderer, &INTEGRATED, INTEGRATED_SIGNATURES));
        let is_low_end = report.extension_query_failed
            || !report.extensions.contains(GpuExtensions::INSTANCED_ARRAYS)
            || report.max_texture_size < MIN_CAPABLE_TEXTURE_SIZE
            || matches(renderer, &LOW_END, LOW_END_SIGNATURES);

        let recommended = if is_low_end {
            ContextSettings::minimal()
        } else {
            ContextSettings {
                antialias: !is_mobile,
                stencil: false,
                depth: true,
                preserve_drawing_buffer: false,
                power_preference: if is_integrated || is_mobile {
                    PowerPreference::Default
                } else {
                    PowerPreference::HighPerformance
                },
            }
        };

        Self {
            vendor,
            renderer: report.renderer.clone(),
            is_integrated,
            is_mobile,
            is_apple_silicon,
            is_low_end,
            extensions: report.extensions,
            max_texture_size: report.max_texture_size,
            recommended,
        }
    }
}

const VENDOR_SIGNATURES: &[(&str, GpuVendor)] = &[
    ("nvidia", GpuVendor::Nvidia),
    ("geforce", GpuVendor::Nvidia),
    ("quadro", GpuVendor::Nvidia),
    ("radeon", GpuVendor::Amd),
    ("amd", GpuVendor::Amd),
    ("ati technologies", GpuVendor::Amd),
    ("intel", GpuVendor::Intel),
    ("apple", GpuVendor::Apple),
];

const APPLE_SILICON_SIGNATURES: &[&str] =
    &["apple m1", "apple m2", "apple m3", "apple m4", "apple gpu"];

const MOBILE_SIGNATURES: &[&str] = &["mali", "adreno", "powervr", "videocore", "tegra"];

const INTEGRATED_SIGNATURES: &[&str] = &[
    "hd graphics",
    "uhd graphics",
    "iris",
    "mesa intel",
    "radeon graphics",
    "radeon(tm) graphics",
    "radeon vega",
    "swiftshader",
    "llvmpipe",
    "microsoft basic render",
];

const LOW_END_SIGNATURES: &[&str] = &[
    "swiftshader",
    "llvmpipe",
    "softpipe",
    "software",
    "microsoft basic render",
    "gma",
    "hd graphics 2",
    "hd graphics 3",
    "hd graphics 4",
    "mali-4",
    "mali-t",
    "adreno (tm) 3",
    "adreno 3",
    "powervr sgx",
];

static VENDOR: OnceLock<Option<AhoCorasick>> = OnceLock::new();
static APPLE_SILICON: OnceLock<Option<AhoCorasick>> = OnceLock::new();
static MOBILE: OnceLock<Option<AhoCorasick>> = OnceLock::new();
static INTEGRATED: OnceLock<Option<AhoCorasick>> = OnceLock::new();
static LOW_END: OnceLock<Option<AhoCorasick>> = OnceLock::new();

fn automaton<'a>(
    cell: &'a OnceLock<Option<AhoCorasick>>,
    patterns: impl IntoIterator<Item = &'static str>,
) -> Option<&'a AhoCorasick> {
    cell.get_or_init(|| {
        AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostFirst)
            .build(patterns)
            .ok()
    })
    .as_ref()
}

fn matches(
    haystack: &str,
    cell: &OnceLock<Option<AhoCorasick>>,
    patterns: &[&'static str],
) -> bool {
    automaton(cell, patterns.iter().copied()).is_some_and(|ac| ac.is_match(haystack))
}

fn detect_vendor(haystack: &str) -> Option<GpuVendor> {
    let ac = automaton(&VENDOR, VENDOR_SIGNATURES.iter().map(|(pat, _)| *pat))?;
    let hit = ac.find(haystack)?;
    Some(VENDOR_SIGNATURES[hit.pattern().as_usize()].1)
}
