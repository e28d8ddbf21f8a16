// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Kernel Event
//!
//! The wake primitive behind multi-object waits. One `Event` is shared by
//! every wait observer created for a single `object_wait_many` call; the
//! first observer to signal it decides the wait result and wakes the
//! blocked thread.
//!
//! # Design
//!
//! - **Manual reset**: Event remains signaled until explicitly unsignaled
//! - **Auto reset**: The waiter that consumes the signal clears it
//! - **Sticky result**: The status passed by the first signaler is what
//!   `wait` returns; later signals while signaled are ignored
//!
//! # Usage
//!
//! ```ignore
//! let event = Event::new(false, EventFlags::empty());
//!
//! // Another thread: event.signal();
//! event.wait(INFINITE)?;
//!
//! event.unsignal();
//! ```

use alloc::vec::Vec;
use bitflags::bitflags;

use crate::sched::{self, Deadline, ThreadRef};
use crate::status::{RxResult, RxStatus};
use crate::sync::SpinMutex;

bitflags! {
    /// Event flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EventFlags: u32 {
        /// Auto-unsignal after waking one thread
        const AUTO_UNSIGNAL = 0x01;
    }
}

struct EventInner {
    signaled: bool,
    result: RxResult<()>,
    waiters: Vec<ThreadRef>,
}

/// Event synchronization primitive
pub struct Event {
    flags: EventFlags,
    inner: SpinMutex<EventInner>,
}

impl Event {
    /// Create a new event
    ///
    /// # Arguments
    ///
    /// * `initial` - Initial signaled state
    /// * `flags` - Event flags
    pub const fn new(initial: bool, flags: EventFlags) -> Self {
        Self {
            flags,
            inner: SpinMutex::new(EventInner {
                signaled: initial,
                result: Ok(()),
                waiters: Vec::new(),
            }),
        }
    }

    /// Signal the event with a success result
    ///
    /// Returns the number of threads woken.
    pub fn signal(&self) -> usize {
        self.signal_etc(Ok(()))
    }

    /// Signal the event, recording the result `wait` will return
    ///
    /// Does nothing if the event is already signaled.
    pub fn signal_etc(&self, result: RxResult<()>) -> usize {
        let woken: Vec<ThreadRef> = {
            let mut inner = self.inner.lock();
            if inner.signaled {
                return 0;
            }
            inner.signaled = true;
            inner.result = result;

            if self.flags.contains(EventFlags::AUTO_UNSIGNAL) {
                if inner.waiters.is_empty() {
                    Vec::new()
                } else {
                    alloc::vec![inner.waiters.remove(0)]
                }
            } else {
                core::mem::take(&mut inner.waiters)
            }
        };

        let scheduler = sched::scheduler();
        for thread in &woken {
            scheduler.wake_thread(thread);
        }
        woken.len()
    }

    /// Clear the signal
    pub fn unsignal(&self) {
        let mut inner = self.inner.lock();
        inner.signaled = false;
        inner.result = Ok(());
    }

    /// Check if the event is signaled
    pub fn is_signaled(&self) -> bool {
        self.inner.lock().signaled
    }

    /// Number of threads currently blocked in `wait`
    pub fn waiter_count(&self) -> usize {
        self.inner.lock().waiters.len()
    }

    /// Wait for the event to be signaled
    ///
    /// # Returns
    ///
    /// - The result recorded by the signaler
    /// - `Err(ERR_TIMED_OUT)` if `deadline` passed first
    pub fn wait(&self, deadline: Deadline) -> RxResult<()> {
        let scheduler = sched::scheduler();
        let me = scheduler.current_thread();

        loop {
            {
                let mut inner = self.inner.lock();
                if inner.signaled {
                    let result = inner.result;
                    if self.flags.contains(EventFlags::AUTO_UNSIGNAL) {
                        inner.signaled = false;
                        inner.result = Ok(());
                    }
                    inner.waiters.retain(|t| t.id() != me.id());
                    return result;
                }

                if scheduler.now() >= deadline {
                    inner.waiters.retain(|t| t.id() != me.id());
                    return Err(RxStatus::ERR_TIMED_OUT);
                }

                if !inner.waiters.iter().any(|t| t.id() == me.id()) {
                    inner.waiters.push(me.clone());
                }
            }

            scheduler.block_current_thread(deadline);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
