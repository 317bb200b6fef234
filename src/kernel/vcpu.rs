// Copyright (c) 2023 Beihang University, Huawei Technologies Co.,Ltd. All rights reserved.
// Rust-Shyper is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//          http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND,
// EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT,
// MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! The VCPU registry (`arinc653_vcpu_t` + the scheduler-private `vcpu_list`
//! in the original), trimmed down to the identity fields a cyclic scheduler
//! actually needs: no context frame, no GIC state, no VM page tables.

use crate::error::{ErrorKind, Result};
use crate::kernel::domain::{DomainHandle, DomainId};

/// The statically-configured maximum number of VCPUs a single scheduler
/// instance can track, the same sizing convention as rust_shyper's
/// `PLATFORM_VCPU_NUM_MAX`.
pub const MAX_VCPUS: usize = 128;

/// A stable handle into the registry, returned by `insert` and passed back
/// on every later `remove`/`sleep`/`wake` call. Indices never move once
/// assigned, since the backing table is a fixed-size array rather than a
/// `Vec` that could reallocate or shift on removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VcpuToken(pub usize);

struct VcpuSlot<V> {
    dom_id: DomainId,
    dom_handle: DomainHandle,
    vcpu_id: i32,
    host_vcpu: V,
}

/// A resolved identity read out of the registry for provider matching.
pub struct VcpuIdentity<'a, V> {
    pub dom_id: DomainId,
    pub dom_handle: DomainHandle,
    pub vcpu_id: i32,
    pub host_vcpu: &'a V,
}

/// The VCPU registry: the structural membership half of a VCPU's scheduler
/// state. The `awake` flag lives separately on `SchedulerInstance`, outside
/// the lock that guards this table, so that `sleep`/`wake` stay lock-free
/// (§4.6) — see `kernel::sched::arinc653`.
pub struct VcpuRegistry<V> {
    slots: [Option<VcpuSlot<V>>; MAX_VCPUS],
}

impl<V> VcpuRegistry<V> {
    pub const fn new() -> Self {
        VcpuRegistry { slots: [const { None }; MAX_VCPUS] }
    }

    /// Registers a VCPU, exactly as `a653sched_alloc_vdata` followed by
    /// `a653sched_insert_vcpu` does.
    pub fn insert(
        &mut self,
        dom_id: DomainId,
        dom_handle: DomainHandle,
        vcpu_id: i32,
        host_vcpu: V,
    ) -> Result<VcpuToken> {
        let slot = self.slots.iter().position(Option::is_none).ok_or(ErrorKind::NoMemory)?;
        self.slots[slot] = Some(VcpuSlot { dom_id, dom_handle, vcpu_id, host_vcpu });
        Ok(VcpuToken(slot))
    }

    pub fn remove(&mut self, token: VcpuToken) {
        if let Some(slot) = self.slots.get_mut(token.0) {
            *slot = None;
        }
    }

    pub fn identity(&self, token: VcpuToken) -> Option<VcpuIdentity<'_, V>> {
        let slot = self.slots.get(token.0)?.as_ref()?;
        Some(VcpuIdentity {
            dom_id: slot.dom_id,
            dom_handle: slot.dom_handle,
            vcpu_id: slot.vcpu_id,
            host_vcpu: &slot.host_vcpu,
        })
    }

    /// Finds the registry slot matching `(dom_handle, vcpu_id)`, the same
    /// linear scan `find_vcpu` performs in the original.
    pub fn find(&self, dom_handle: DomainHandle, vcpu_id: i32) -> Option<VcpuToken> {
        self.slots
            .iter()
            .position(|slot| matches!(slot, Some(s) if s.dom_handle == dom_handle && s.vcpu_id == vcpu_id))
            .map(VcpuToken)
    }
}

impl<V> Default for VcpuRegistry<V> {
    fn default() -> Self {
        Self::new()
    }
}
