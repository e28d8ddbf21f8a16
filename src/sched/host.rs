// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Hosted scheduler backend
//!
//! Maps block/wake onto `std::thread::park_timeout` / `Thread::unpark`. The
//! unpark token gives the "wake before block is not lost" guarantee.

use alloc::sync::Arc;
use core::time::Duration;
use std::time::Instant;

use super::thread::{alloc_thread_id, ThreadId, ThreadRef, WakeToken};
use super::{BlockResult, Deadline, Scheduler, INFINITE};

/// Scheduler used when none was installed
pub static HOST_SCHEDULER: HostScheduler = HostScheduler::new();

std::thread_local! {
    static CURRENT_ID: ThreadId = alloc_thread_id();
}

/// std-thread backed scheduler
pub struct HostScheduler {
    epoch: spin::Once<Instant>,
}

impl HostScheduler {
    /// Create a host scheduler; its clock starts on first use
    pub const fn new() -> Self {
        Self {
            epoch: spin::Once::new(),
        }
    }

    fn epoch(&self) -> Instant {
        *self.epoch.call_once(Instant::now)
    }
}

struct HostThread(std::thread::Thread);

impl WakeToken for HostThread {
    fn wake(&self) {
        self.0.unpark();
    }
}

impl Scheduler for HostScheduler {
    fn now(&self) -> Deadline {
        u64::try_from(self.epoch().elapsed().as_nanos()).unwrap_or(INFINITE - 1)
    }

    fn current_thread(&self) -> ThreadRef {
        let id = CURRENT_ID.with(|id| *id);
        ThreadRef::new(id, Arc::new(HostThread(std::thread::current())))
    }

    fn block_current_thread(&self, deadline: Deadline) -> BlockResult {
        if deadline == INFINITE {
            std::thread::park();
            return BlockResult::Woken;
        }

        let now = self.now();
        if now >= deadline {
            return BlockResult::TimedOut;
        }

        std::thread::park_timeout(Duration::from_nanos(deadline - now));

        if self.now() >= deadline {
            BlockResult::TimedOut
        } else {
            BlockResult::Woken
        }
    }
}
