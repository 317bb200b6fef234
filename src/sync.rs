// Copyright (c) 2023 Beihang University, Huawei Technologies Co.,Ltd. All rights reserved.
// Rust-Shyper is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//          http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND,
// EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT,
// MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! The single interrupt-safe lock a scheduler instance is built around.
//!
//! Grounded on `spin::Mutex` (the lock rust_shyper uses everywhere) plus the
//! `without_interrupts` closure idiom used for irq-safe critical sections in
//! the SafaOS kernel scheduler.

use spin::{Mutex, MutexGuard};

/// A lock that must nest *inside* the host's own CPU-pool lock, and must
/// never be held across a call back into the host that could recurse into
/// the scheduler (see `Host`). Callers are responsible for disabling
/// interrupts on the current core before acquiring it; this type only
/// provides the mutual-exclusion half of "interrupt-safe".
pub struct IrqLock<T> {
    inner: Mutex<T>,
}

impl<T> IrqLock<T> {
    pub const fn new(value: T) -> Self {
        Self { inner: Mutex::new(value) }
    }

    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock()
    }
}
