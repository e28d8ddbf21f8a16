// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Scheduler interface
//!
//! The wait/notify substrate never schedules threads itself. It consumes two
//! primitives from the scheduler: block the calling thread until a deadline
//! and wake a specific blocked thread. Both are expressed by the
//! [`Scheduler`] trait and the [`ThreadRef`] token it hands out.
//!
//! # Contract
//!
//! - A wake delivered to a thread before it blocks is not lost: the next
//!   `block_current_thread` returns immediately.
//! - `BlockResult::Woken` may be spurious. Every caller re-checks its own
//!   condition under its own lock before trusting it.
//!
//! # Usage
//!
//! ```ignore
//! use rustux_sync::sched;
//!
//! let deadline = sched::deadline_after(core::time::Duration::from_millis(5));
//! let me = sched::scheduler().current_thread();
//! // publish `me` somewhere a waker can see it, then:
//! sched::scheduler().block_current_thread(deadline);
//! ```

pub mod thread;

#[cfg(any(test, feature = "std"))]
pub mod host;

use core::time::Duration;

use crate::status::{RxResult, RxStatus};

pub use thread::{ThreadId, ThreadRef, WakeToken};

/// Absolute time in nanoseconds on the scheduler's monotonic clock
pub type Deadline = u64;

/// Deadline that never expires
pub const INFINITE: Deadline = u64::MAX;

/// Why `block_current_thread` returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockResult {
    /// Woken by `ThreadRef::wake` (or spuriously)
    Woken,

    /// The deadline passed
    TimedOut,
}

/// Block/wake primitives provided by the thread scheduler
pub trait Scheduler: Send + Sync {
    /// Current monotonic time
    fn now(&self) -> Deadline;

    /// Token for the calling thread
    fn current_thread(&self) -> ThreadRef;

    /// Block the calling thread until woken or `deadline` passes
    fn block_current_thread(&self, deadline: Deadline) -> BlockResult;

    /// Wake a thread previously returned by `current_thread`
    fn wake_thread(&self, thread: &ThreadRef) {
        thread.wake();
    }
}

static SCHEDULER: spin::Once<&'static dyn Scheduler> = spin::Once::new();

/// Install the scheduler used by every blocking operation
///
/// Only the first install wins; later calls return `ERR_BAD_STATE`.
pub fn install(scheduler: &'static dyn Scheduler) -> RxResult<()> {
    let mut installed = false;
    SCHEDULER.call_once(|| {
        installed = true;
        scheduler
    });
    if installed {
        Ok(())
    } else {
        Err(RxStatus::ERR_BAD_STATE)
    }
}

/// The installed scheduler
///
/// Hosted builds fall back to [`host::HostScheduler`] when nothing was
/// installed.
#[cfg(any(test, feature = "std"))]
pub fn scheduler() -> &'static dyn Scheduler {
    *SCHEDULER.call_once(|| &host::HOST_SCHEDULER as &'static dyn Scheduler)
}

/// The installed scheduler
///
/// Panics if no scheduler was installed.
#[cfg(not(any(test, feature = "std")))]
pub fn scheduler() -> &'static dyn Scheduler {
    match SCHEDULER.get() {
        Some(scheduler) => *scheduler,
        None => panic!("sched: no scheduler installed"),
    }
}

/// Current monotonic time
pub fn now() -> Deadline {
    scheduler().now()
}

/// Deadline `timeout` from now, saturating at [`INFINITE`]
pub fn deadline_after(timeout: Duration) -> Deadline {
    let nanos = u64::try_from(timeout.as_nanos()).unwrap_or(INFINITE);
    now().saturating_add(nanos)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_after_saturates() {
        assert_eq!(deadline_after(Duration::MAX), INFINITE);
    }

    #[test]
    fn test_now_is_monotonic() {
        let a = now();
        let b = now();
        assert!(b >= a);
    }

    #[test]
    fn test_block_past_deadline_times_out() {
        let result = scheduler().block_current_thread(now());
        assert_eq!(result, BlockResult::TimedOut);
    }
}
