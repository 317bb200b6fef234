// Copyright (c) 2023 Beihang University, Huawei Technologies Co.,Ltd. All rights reserved.
// Rust-Shyper is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//          http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND,
// EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT,
// MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! Domain identity and the scheduler's per-domain bookkeeping
//! (`a653sched_domain_t` in the original ARINC 653 scheduler).

/// The statically-configured number of domains (partitions) a single
/// scheduler instance can track, mirroring rust_shyper's `VM_NUM_MAX` table
/// sizing convention.
pub const MAX_DOMAINS: usize = 64;

/// Opaque 16-byte domain handle ("UUID"), used by service providers to name
/// the domain that should run a VCPU. The all-zero handle is reserved for
/// the bootstrap domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct DomainHandle(pub [u8; 16]);

impl DomainHandle {
    pub const ZERO: DomainHandle = DomainHandle([0u8; 16]);
}

/// The numeric domain identifier used by the per-domain adjust protocol and
/// by a domain record's `parent` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DomainId(pub i32);

impl DomainId {
    pub const BOOTSTRAP: DomainId = DomainId(0);

    /// Sentinel owner recorded for idle-VCPU registry entries (see
    /// `SchedulerInstance::switch_sched`). Never a valid domain slot, and
    /// never named by any schedule entry's providers, so it can't be
    /// selected as a service provider or looked up in `DomainRegistry`.
    pub const IDLE: DomainId = DomainId(-1);

    fn slot(self) -> Option<usize> {
        if self.0 < 0 {
            return None;
        }
        let idx = self.0 as usize;
        (idx < MAX_DOMAINS).then_some(idx)
    }
}

/// Per-domain scheduler-private state, identical in shape to
/// `a653sched_domain_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainRecord {
    pub parent: DomainId,
    pub primary: bool,
    pub healthy: bool,
}

impl DomainRecord {
    /// Defaults at creation: `parent = self`, `primary = true`,
    /// `healthy = true`.
    fn new(id: DomainId) -> Self {
        DomainRecord { parent: id, primary: true, healthy: true }
    }
}

/// A fixed-capacity table of domain records, one slot per configured
/// domain id, sized and indexed the way rust_shyper's `VM_IF_LIST` is.
pub struct DomainRegistry {
    domains: [Option<DomainRecord>; MAX_DOMAINS],
}

impl DomainRegistry {
    pub const fn new() -> Self {
        DomainRegistry { domains: [None; MAX_DOMAINS] }
    }

    pub fn get(&self, id: DomainId) -> Option<&DomainRecord> {
        self.domains.get(id.slot()?)?.as_ref()
    }

    /// Registers `id`, creating it with default field values if it does not
    /// already exist (`init_domain`/`alloc_domdata`).
    pub fn ensure(&mut self, id: DomainId) -> crate::error::Result<&mut DomainRecord> {
        let slot = id.slot().ok_or(crate::error::ErrorKind::Invalid)?;
        if self.domains[slot].is_none() {
            self.domains[slot] = Some(DomainRecord::new(id));
        }
        Ok(self.domains[slot].as_mut().unwrap())
    }

    /// Removes the domain's scheduler-private state (`destroy_domain`/
    /// `free_domdata`).
    pub fn remove(&mut self, id: DomainId) {
        if let Some(slot) = id.slot() {
            self.domains[slot] = None;
        }
    }

    /// Applies a per-domain adjust `putinfo`: `parent == -1` leaves the
    /// parent unchanged, any other value sets it and recomputes `primary`.
    /// `healthy` is always overwritten, with no "leave unchanged" sentinel.
    pub fn adjust_put(&mut self, id: DomainId, parent: i32, healthy: bool) -> crate::error::Result<()> {
        let record = self.ensure(id)?;
        if parent != -1 {
            record.parent = DomainId(parent);
            record.primary = record.parent.0 == id.0;
        }
        record.healthy = healthy;
        Ok(())
    }
}

impl Default for DomainRegistry {
    fn default() -> Self {
        Self::new()
    }
}
