// Copyright (c) 2023 Beihang University, Huawei Technologies Co.,Ltd. All rights reserved.
// Rust-Shyper is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//          http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND,
// EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT,
// MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! The scheduler surface: the ARINC 653 cyclic scheduler itself, plus the
//! host-facing `SchedulerOps` vtable that mirrors the `struct scheduler`
//! descriptor a real Xen scheduler registers (`sched_arinc653_def`).

mod arinc653;

pub use self::arinc653::{DispatchResult, GlobalAdjust, SchedulerInstance, DEFAULT_TIMESLICE_NS, MAX_PROVIDERS_PER_ENTRY, MAX_SCHED_ENTRIES};

use crate::config::ConfigTransport;
use crate::error::Result;
use crate::host::Host;
use crate::kernel::domain::DomainId;
use crate::kernel::vcpu::VcpuToken;

/// A stable identifier for the scheduler implementation, analogous to
/// `struct scheduler`'s `sched_id` field (`XEN_SCHEDULER_ARINC653`).
pub const SCHED_ID_ARINC653: u32 = 4;

/// Static descriptor for this scheduler, mirroring `sched_arinc653_def`: a
/// human-readable name plus the short option string a host would use to
/// select it at boot (`sched=arinc653`).
pub struct SchedulerDescriptor {
    pub name: &'static str,
    pub opt_name: &'static str,
    pub sched_id: u32,
}

pub static SCHEDULER_DESCRIPTOR: SchedulerDescriptor = SchedulerDescriptor {
    name: "ARINC 653 Scheduler",
    opt_name: "arinc653",
    sched_id: SCHED_ID_ARINC653,
};

/// The host-facing operations vtable every scheduler implementation exposes,
/// the same shape as `struct scheduler`'s function-pointer table. Kept as a
/// trait so a host can hold a `&dyn SchedulerOps<Vcpu = ...>` without caring
/// which concrete policy backs it.
pub trait SchedulerOps {
    type Vcpu: Clone;

    fn init_domain(&self, id: DomainId) -> Result<()>;
    fn destroy_domain(&self, id: DomainId);
    fn adjust_domain(&self, id: DomainId, parent: i32, healthy: bool) -> Result<()>;

    fn insert_vcpu(
        &self,
        dom_id: DomainId,
        dom_handle: crate::kernel::domain::DomainHandle,
        vcpu_id: i32,
        host_vcpu: Self::Vcpu,
    ) -> Result<VcpuToken>;
    fn remove_vcpu(&self, token: VcpuToken);

    fn sleep(&self, token: VcpuToken, cpu: usize);
    fn wake(&self, token: VcpuToken, cpu: usize);

    fn pick_cpu(&self, current_processor: usize) -> usize;

    /// Adopts `cpu` into this scheduler's pool: attaches its idle VCPU's
    /// scheduler-private record and re-points the host's per-CPU lock to its
    /// default (`a653sched_switch_sched`).
    fn switch_sched(
        &self,
        cpu: usize,
        idle_dom_handle: crate::kernel::domain::DomainHandle,
        idle_vcpu_id: i32,
        idle_host_vcpu: Self::Vcpu,
    ) -> Result<VcpuToken>;

    fn do_schedule(&self, cpu: usize, now: u64, tasklet_work_scheduled: bool) -> DispatchResult<Self::Vcpu>;

    fn adjust_global(&self, now: u64, op: GlobalAdjust, transport: &mut dyn ConfigTransport) -> Result<()>;
}

impl<H: Host> SchedulerOps for SchedulerInstance<H> {
    type Vcpu = H::Vcpu;

    fn init_domain(&self, id: DomainId) -> Result<()> {
        SchedulerInstance::init_domain(self, id)
    }

    fn destroy_domain(&self, id: DomainId) {
        SchedulerInstance::destroy_domain(self, id)
    }

    fn adjust_domain(&self, id: DomainId, parent: i32, healthy: bool) -> Result<()> {
        SchedulerInstance::adjust_domain(self, id, parent, healthy)
    }

    fn insert_vcpu(
        &self,
        dom_id: DomainId,
        dom_handle: crate::kernel::domain::DomainHandle,
        vcpu_id: i32,
        host_vcpu: Self::Vcpu,
    ) -> Result<VcpuToken> {
        SchedulerInstance::insert_vcpu(self, dom_id, dom_handle, vcpu_id, host_vcpu)
    }

    fn remove_vcpu(&self, token: VcpuToken) {
        SchedulerInstance::remove_vcpu(self, token)
    }

    fn sleep(&self, token: VcpuToken, cpu: usize) {
        SchedulerInstance::sleep(self, token, cpu)
    }

    fn wake(&self, token: VcpuToken, cpu: usize) {
        SchedulerInstance::wake(self, token, cpu)
    }

    fn pick_cpu(&self, current_processor: usize) -> usize {
        SchedulerInstance::pick_cpu(self, current_processor)
    }

    fn switch_sched(
        &self,
        cpu: usize,
        idle_dom_handle: crate::kernel::domain::DomainHandle,
        idle_vcpu_id: i32,
        idle_host_vcpu: Self::Vcpu,
    ) -> Result<VcpuToken> {
        SchedulerInstance::switch_sched(self, cpu, idle_dom_handle, idle_vcpu_id, idle_host_vcpu)
    }

    fn do_schedule(&self, cpu: usize, now: u64, tasklet_work_scheduled: bool) -> DispatchResult<Self::Vcpu> {
        SchedulerInstance::do_schedule(self, cpu, now, tasklet_work_scheduled)
    }

    fn adjust_global(&self, now: u64, op: GlobalAdjust, transport: &mut dyn ConfigTransport) -> Result<()> {
        SchedulerInstance::adjust_global(self, now, op, transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_reports_the_arinc653_name() {
        assert_eq!(SCHEDULER_DESCRIPTOR.opt_name, "arinc653");
        assert_eq!(SCHEDULER_DESCRIPTOR.name, "ARINC 653 Scheduler");
    }
}
