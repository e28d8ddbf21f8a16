// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Thread references
//!
//! A [`ThreadRef`] is what a blocked thread leaves behind in a wait queue so
//! that another thread can wake it.

use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

/// Thread ID type
pub type ThreadId = u64;

/// Next thread ID counter
static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a new thread ID
pub fn alloc_thread_id() -> ThreadId {
    NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed)
}

/// Scheduler-side wake capability for one thread
pub trait WakeToken: Send + Sync {
    /// Make the thread runnable (or pre-arm its next block)
    fn wake(&self);
}

/// Wakeable reference to a thread
#[derive(Clone)]
pub struct ThreadRef {
    id: ThreadId,
    token: Arc<dyn WakeToken>,
}

impl ThreadRef {
    /// Create a thread reference
    pub fn new(id: ThreadId, token: Arc<dyn WakeToken>) -> Self {
        Self { id, token }
    }

    /// Get thread ID
    pub const fn id(&self) -> ThreadId {
        self.id
    }

    /// Wake the thread
    pub fn wake(&self) {
        self.token.wake();
    }
}

impl fmt::Debug for ThreadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadRef").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::AtomicUsize;

    struct CountingToken(AtomicUsize);

    impl WakeToken for CountingToken {
        fn wake(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_thread_ref_wake_forwards_to_token() {
        let token = Arc::new(CountingToken(AtomicUsize::new(0)));
        let thread = ThreadRef::new(7, token.clone());
        let copy = thread.clone();

        thread.wake();
        copy.wake();

        assert_eq!(thread.id(), 7);
        assert_eq!(token.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_thread_ids_unique() {
        assert_ne!(alloc_thread_id(), alloc_thread_id());
    }
}
