use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use crate::{merge, CpuProfile, GpuProfile, RenderConfig};

/// Profiles plus the configuration merged from them. Never mutated once published.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitySnapshot {
    /// Bumped on every publish; 0 for the first snapshot of a session.
    pub generation: u64,
    pub gpu: GpuProfile,
    pub cpu: CpuProfile,
    pub config: RenderConfig,
}

impl CapabilitySnapshot {
    pub fn new(gpu: GpuProfile, cpu: CpuProfile) -> Self {
        let config = merge(&gpu, &cpu);
        Self {
            generation: 0,
            gpu,
            cpu,
            config,
        }
    }

    /// Both profiles forced conservative and merged again.
    pub fn conservative_successor(&self) -> Self {
        let gpu = self.gpu.conservative_from();
        let cpu = self.cpu.conservative_from();
        let config = merge(&gpu, &cpu);
        Self {
            generation: self.generation + 1,
            gpu,
            cpu,
            config,
        }
    }
}

/// Single-writer, multi-reader holder of the current [`CapabilitySnapshot`].
///
/// Readers get an `Rc` to a whole snapshot; writers swap in a new one. A reader holding
/// an old snapshot keeps seeing it unchanged.
#[derive(Debug, Clone)]
pub struct CapabilityStore {
    current: Rc<RefCell<Rc<CapabilitySnapshot>>>,
}

impl CapabilityStore {
    pub fn new(snapshot: CapabilitySnapshot) -> Self {
        Self {
            current: Rc::new(RefCell::new(Rc::new(snapshot))),
        }
    }

    pub fn load(&self) -> Rc<CapabilitySnapshot> {
        Rc::clone(&self.current.borrow())
    }

    pub fn generation(&self) -> u64 {
        self.current.borrow().generation
    }

    /// Swap in `snapshot`, returning the one it replaced.
    pub fn replace(&self, snapshot: CapabilitySnapshot) -> Rc<CapabilitySnapshot> {
        self.current.replace(Rc::new(snapshot))
    }

    /// Re-derive from new profiles and publish as the next generation.
    pub fn publish(&self, gpu: GpuProfile, cpu: CpuProfile) -> Rc<CapabilitySnapshot> {
        let mut next = CapabilitySnapshot::new(gpu, cpu);
        next.generation = self.generation() + 1;
        self.replace(next);
        self.load()
    }

    /// Publish the conservative successor of the current snapshot.
    pub fn degrade(&self) -> Rc<CapabilitySnapshot> {
        let next = self.load().conservative_successor();
        self.replace(next);
        self.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DeviceCategory;

    #[test]
    fn readers_keep_their_snapshot_across_swaps() {
        let store = CapabilityStore::new(CapabilitySnapshot::new(
            GpuProfile::conservative(),
            CpuProfile::conservative(),
        ));
        let before = store.load();
        let after = store.degrade();

        assert_eq!(before.generation, 0);
        assert_eq!(after.generation, 1);
        assert_eq!(store.generation(), 1);
        assert!(!Rc::ptr_eq(&before, &after));
        assert_eq!(after.config.category, DeviceCategory::LowEnd);
    }

    #[test]
    fn clones_share_the_same_slot() {
        let store = CapabilityStore::new(CapabilitySnapshot::new(
            GpuProfile::conservative(),
            CpuProfile::conservative(),
        ));
        let reader = store.clone();
        store.publish(GpuProfile::conservative(), CpuProfile::conservative());
        assert_eq!(reader.generation(), 1);
    }
}
