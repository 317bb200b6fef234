// Copyright (c) 2023 Beihang University, Huawei Technologies Co.,Ltd. All rights reserved.
// Rust-Shyper is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//          http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND,
// EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT,
// MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! Physical-CPU-facing helpers (`pick_cpu`, `switch_sched`). Everything
//! arch-specific that the original `Cpu` struct carried — the context
//! frame, the boot stack, the GICv3 register writes in `schedule_to` — has
//! no counterpart here: a scheduler core does not perform context switches,
//! it only picks *which* VCPU the host should switch to.

pub const CPU_MASTER: usize = 0;

use crate::host::CpuMask;

/// Selects a physical CPU for a VCPU: prefer its currently-recorded
/// processor if it is online, otherwise the first online CPU.
/// Identical to `a653sched_pick_cpu`.
pub fn pick_cpu(current_processor: usize, online: CpuMask) -> usize {
    if online.is_set(current_processor) {
        current_processor
    } else {
        online.first_set().unwrap_or(current_processor)
    }
}
