//! Compatibility adapter for the scene integration layer.
//!
//! Some releases of the integration layer read runtime fields that newer runtimes no
//! longer export, and fail with an exception the first time a scene mounts. The shim
//! installs minimal stand-ins for exactly the fields the detected release needs. Which
//! fields that is comes from [`SUPPORTED_VERSIONS`]; releases past the last shimmed
//! range need nothing.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::CompatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct IntegrationVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl IntegrationVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for IntegrationVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for IntegrationVersion {
    type Err = CompatError;

    /// Accepts `major[.minor[.patch]]` with an optional leading `v` and ignores any
    /// pre-release/build suffix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CompatError::InvalidVersion(s.to_string());
        let trimmed = s.trim().trim_start_matches('v');
        let core = trimmed
            .split(|c: char| c == '-' || c == '+')
            .next()
            .ok_or_else(invalid)?;

        let mut parts = [0u32; 3];
        let mut count = 0;
        for (slot, raw) in parts.iter_mut().zip(core.split('.')) {
            *slot = raw.parse().map_err(|_| invalid())?;
            count += 1;
        }
        if count == 0 || core.split('.').count() > 3 {
            return Err(invalid());
        }
        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

/// One row of the supported-version table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompatAdapter {
    pub name: &'static str,
    /// Inclusive.
    pub min: IntegrationVersion,
    /// Exclusive; `None` means open-ended.
    pub max: Option<IntegrationVersion>,
    /// Runtime fields that must exist before a scene mounts.
    pub fields: &'static [&'static str],
}

impl CompatAdapter {
    pub fn supports(&self, version: IntegrationVersion) -> bool {
        version >= self.min && self.max.map_or(true, |max| version < max)
    }

    pub fn needs_shim(&self) -> bool {
        !self.fields.is_empty()
    }
}

pub const SUPPORTED_VERSIONS: &[CompatAdapter] = &[
    CompatAdapter {
        name: "bridge-8-early",
        min: IntegrationVersion::new(8, 0, 0),
        max: Some(IntegrationVersion::new(8, 15, 0)),
        fields: &["currentOwner", "currentBatchConfig", "currentDispatcher"],
    },
    CompatAdapter {
        name: "bridge-8-late",
        min: IntegrationVersion::new(8, 15, 0),
        max: Some(IntegrationVersion::new(9, 0, 0)),
        fields: &["currentOwner", "currentBatchConfig"],
    },
    CompatAdapter {
        name: "bridge-9",
        min: IntegrationVersion::new(9, 0, 0),
        max: None,
        fields: &[],
    },
];

/// The runtime objects the integration layer reads.
pub trait RuntimeHost {
    fn has_field(&self, name: &str) -> bool;
    fn install_stand_in(&mut self, name: &str) -> Result<(), CompatError>;
}

/// What the shim did so far. Owned by one [`CompatibilityShim`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchState {
    pub applied: bool,
    pub shimmed: BTreeSet<String>,
}

/// Repair entry points shared between the supervisor and the error watcher.
pub trait CompatRepair {
    /// Idempotent: a no-op once the patch is applied. Returns whether any field was
    /// newly created.
    fn repair(&mut self) -> bool;

    /// Error-observer path: re-applies even when the patch is marked applied.
    fn force_repair(&mut self) -> bool;
}

pub type SharedRepair = Rc<RefCell<dyn CompatRepair>>;

pub struct CompatibilityShim<H> {
    host: H,
    adapter: Option<&'static CompatAdapter>,
    state: PatchState,
    invocations: u64,
}

impl<H: RuntimeHost> CompatibilityShim<H> {
    /// A shim with no adapter selected; repairs are no-ops until
    /// [`CompatibilityShim::ensure_compat`] picks one.
    pub fn new(host: H) -> Self {
        Self {
            host,
            adapter: None,
            state: PatchState::default(),
            invocations: 0,
        }
    }

    pub fn adapter_for(version: IntegrationVersion) -> Result<&'static CompatAdapter, CompatError> {
        SUPPORTED_VERSIONS
            .iter()
            .find(|adapter| adapter.supports(version))
            .ok_or(CompatError::UnsupportedVersion(version))
    }

    /// Select the adapter for `version` and apply it.
    pub fn ensure_compat(
        &mut self,
        version: IntegrationVersion,
    ) -> Result<&'static CompatAdapter, CompatError> {
        let adapter = Self::adapter_for(version)?;
        let changed = self.adapter.map_or(true, |current| current.name != adapter.name);
        if changed {
            self.adapter = Some(adapter);
            self.state.applied = false;
        }
        if adapter.needs_shim() {
            info!(%version, adapter = adapter.name, "integration layer needs compatibility shim");
            self.repair();
        } else {
            debug!(%version, adapter = adapter.name, "integration layer needs no shim");
            self.state.applied = true;
        }
        Ok(adapter)
    }

    pub fn adapter(&self) -> Option<&'static CompatAdapter> {
        self.adapter
    }

    pub fn state(&self) -> &PatchState {
        &self.state
    }

    /// Number of repair passes that actually inspected the host.
    pub fn invocations(&self) -> u64 {
        self.invocations
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_shared(self) -> Rc<RefCell<Self>>
    where
        H: 'static,
    {
        Rc::new(RefCell::new(self))
    }

    fn apply(&mut self) -> bool {
        let Some(adapter) = self.adapter else {
            return false;
        };
        self.invocations += 1;

        let mut created = false;
        for &field in adapter.fields {
            if self.host.has_field(field) {
                continue;
            }
            match self.host.install_stand_in(field) {
                Ok(()) => {
                    debug!(field, "installed runtime stand-in");
                    self.state.shimmed.insert(field.to_string());
                    created = true;
                }
                Err(err) => warn!(field, error = %err, "runtime stand-in not installed"),
            }
        }
        self.state.applied = true;
        created
    }
}

impl<H: RuntimeHost> CompatRepair for CompatibilityShim<H> {
    fn repair(&mut self) -> bool {
        if self.state.applied {
            return false;
        }
        self.apply()
    }

    fn force_repair(&mut self) -> bool {
        self.apply()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[derive(Default)]
    struct Host {
        fields: HashSet<String>,
        refuse: Option<&'static str>,
    }

    impl RuntimeHost for Host {
        fn has_field(&self, name: &str) -> bool {
            self.fields.contains(name)
        }

        fn install_stand_in(&mut self, name: &str) -> Result<(), CompatError> {
            if self.refuse == Some(name) {
                return Err(CompatError::StandIn {
                    field: name.to_string(),
                    reason: "frozen object".to_string(),
                });
            }
            self.fields.insert(name.to_string());
            Ok(())
        }
    }

    #[test]
    fn version_parsing_accepts_common_shapes() {
        assert_eq!("8.15.1".parse::<IntegrationVersion>(), Ok(IntegrationVersion::new(8, 15, 1)));
        assert_eq!("v9".parse::<IntegrationVersion>(), Ok(IntegrationVersion::new(9, 0, 0)));
        assert_eq!("8.17.10-rc.1".parse::<IntegrationVersion>(), Ok(IntegrationVersion::new(8, 17, 10)));
        assert!("eight".parse::<IntegrationVersion>().is_err());
        assert!("1.2.3.4".parse::<IntegrationVersion>().is_err());
        assert!("".parse::<IntegrationVersion>().is_err());
    }

    #[test]
    fn table_rows_do_not_overlap() {
        for (i, a) in SUPPORTED_VERSIONS.iter().enumerate() {
            for b in &SUPPORTED_VERSIONS[i + 1..] {
                assert!(!a.supports(b.min) && !b.supports(a.min), "{} / {}", a.name, b.name);
            }
        }
    }

    #[test]
    fn unsupported_versions_are_rejected() {
        let mut shim = CompatibilityShim::new(Host::default());
        let err = shim.ensure_compat(IntegrationVersion::new(7, 2, 0)).unwrap_err();
        assert_eq!(err, CompatError::UnsupportedVersion(IntegrationVersion::new(7, 2, 0)));
        assert!(shim.adapter().is_none());
    }

    #[test]
    fn shimmed_version_installs_missing_fields_once() {
        let mut shim = CompatibilityShim::new(Host::default());
        let adapter = shim.ensure_compat(IntegrationVersion::new(8, 16, 0)).unwrap();
        assert_eq!(adapter.name, "bridge-8-late");
        assert!(shim.state().applied);
        assert_eq!(shim.state().shimmed.len(), 2);
        assert_eq!(shim.invocations(), 1);

        assert!(!shim.repair());
        assert_eq!(shim.invocations(), 1);
    }

    #[test]
    fn force_repair_reinstalls_removed_fields() {
        let mut shim = CompatibilityShim::new(Host::default());
        shim.ensure_compat(IntegrationVersion::new(8, 2, 0)).unwrap();
        shim.host_mut().fields.remove("currentOwner");

        assert!(!shim.repair());
        assert!(shim.force_repair());
        assert!(shim.host().has_field("currentOwner"));
        assert!(!shim.force_repair());
    }

    #[test]
    fn existing_fields_are_left_alone() {
        let mut host = Host::default();
        host.fields.insert("currentOwner".to_string());
        let mut shim = CompatibilityShim::new(host);
        shim.ensure_compat(IntegrationVersion::new(8, 15, 0)).unwrap();
        assert_eq!(
            shim.state().shimmed.iter().collect::<Vec<_>>(),
            vec!["currentBatchConfig"]
        );
    }

    #[test]
    fn failed_stand_in_is_skipped() {
        let host = Host {
            refuse: Some("currentBatchConfig"),
            ..Host::default()
        };
        let mut shim = CompatibilityShim::new(host);
        shim.ensure_compat(IntegrationVersion::new(8, 15, 0)).unwrap();
        assert!(shim.state().applied);
        assert!(!shim.state().shimmed.contains("currentBatchConfig"));
    }

    #[test]
    fn modern_versions_need_no_shim() {
        let mut shim = CompatibilityShim::new(Host::default());
        let adapter = shim.ensure_compat(IntegrationVersion::new(9, 3, 0)).unwrap();
        assert!(!adapter.needs_shim());
        assert!(shim.state().applied);
        assert!(!shim.force_repair());
        assert!(shim.host().fields.is_empty());
    }
}
