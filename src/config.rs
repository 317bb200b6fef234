// Copyright (c) 2023 Beihang University, Huawei Technologies Co.,Ltd. All rights reserved.
// Rust-Shyper is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//          http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND,
// EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT,
// MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! The wire shape of the global-adjust (PUTINFO/GETINFO) protocol —
//! `xen_sysctl_arinc653_schedule_t` in the original — plus the transport
//! abstraction standing in for `copy_from_guest`/`copy_to_guest`.

use alloc::vec::Vec;

use crate::error::Result;
use crate::kernel::domain::DomainHandle;

/// One entry of `sched_providers_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceProviderConfig {
    pub dom_handle: DomainHandle,
    pub vcpu_id: i32,
}

/// One entry of `sched_entry_t`, as exchanged with the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntryConfig {
    pub service_id: i32,
    pub runtime_ns: i64,
    pub providers: Vec<ServiceProviderConfig>,
}

/// A full candidate (or current) schedule, as exchanged with the host —
/// `xen_sysctl_arinc653_schedule_t`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScheduleConfig {
    pub major_frame_ns: i64,
    pub entries: Vec<ScheduleEntryConfig>,
}

/// Stands in for the guest/hypervisor memory-copy boundary a real
/// `putinfo`/`getinfo` hypercall crosses. A real host implementation copies
/// bytes out of guest memory and fails with `Fault` if that copy traps;
/// `copy_out` is likewise expected to pre-fill its destination with
/// all-ones bytes before writing, the way `arinc653_sched_get`'s caller
/// `memset`s `local_sched` to `-1` first, so a truncated write is visibly
/// distinguishable from a zeroed one.
pub trait ConfigTransport {
    fn copy_in(&self) -> Result<ScheduleConfig>;
    fn copy_out(&mut self, schedule: &ScheduleConfig) -> Result<()>;
}
