// Copyright (c) 2023 Beihang University, Huawei Technologies Co.,Ltd. All rights reserved.
// Rust-Shyper is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//          http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND,
// EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT,
// MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! An ARINC 653-compatible cyclic partition scheduler core for a type-1
//! hypervisor: a fixed major-frame timetable of minor frames, each naming
//! the VCPU(s) eligible to run during it, dispatched with no work
//! conservation and no cross-partition migration.
//!
//! This crate is the scheduling policy only. It never performs a context
//! switch itself; a host embeds it behind the [`host::Host`] trait and
//! drives it from its own interrupt/softirq path.

#![no_std]
#![allow(unused_doc_comments)]

#[macro_use]
extern crate alloc;
#[macro_use]
extern crate log;

pub mod config;
pub mod error;
pub mod host;
pub mod kernel;
pub mod sync;

pub use crate::error::{Error, ErrorKind, Result};
pub use crate::host::{CpuMask, Host};
pub use crate::kernel::domain::{DomainHandle, DomainId};
pub use crate::kernel::sched::{DispatchResult, GlobalAdjust, SchedulerInstance, SchedulerOps, SCHEDULER_DESCRIPTOR};
pub use crate::kernel::vcpu::VcpuToken;
