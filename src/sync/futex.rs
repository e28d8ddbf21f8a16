// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Futex Table
//!
//! Address-keyed wait queues for user-mode locks. One table exists per
//! address space; a futex costs nothing until a thread blocks on it, at
//! which point exactly one node is allocated for that thread.
//!
//! # Design
//!
//! - **FIFO**: waiters are woken and requeued oldest-first
//! - **Sparse**: an address with no waiters has no table entry
//! - **Lock discipline**: the table lock serializes every queue mutation;
//!   threads block and wake with the lock released
//! - **Wake wins**: a waiter whose node was dequeued by a wake returns
//!   success even if its deadline expired at the same moment
//!
//! # Usage
//!
//! ```ignore
//! let table = FutexTable::new();
//! let word = AtomicU32::new(0);
//!
//! // Waiter
//! table.wait(&word, 0, INFINITE)?;
//!
//! // Waker
//! word.store(1, Ordering::SeqCst);
//! table.wake(&word, 1)?;
//! ```

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};
use log::trace;

use crate::sched::{self, BlockResult, Deadline, ThreadRef};
use crate::status::{RxResult, RxStatus};
use crate::sync::list::{IndexArena, ListHead, NodeId};
use crate::sync::SpinMutex;

/// Futex key: the address of the futex word
pub type FutexKey = usize;

/// Wake or requeue every waiter
pub const FUTEX_ALL: u32 = u32::MAX;

fn key_of(value_ptr: &AtomicU32) -> FutexKey {
    value_ptr as *const AtomicU32 as usize
}

/// One blocked thread
struct FutexNode {
    /// Queue the node is (or was last) linked on
    key: FutexKey,
    thread: ThreadRef,
    /// Set by the waker when it dequeues the node
    woken: bool,
}

struct FutexInner {
    nodes: IndexArena<FutexNode>,
    queues: BTreeMap<FutexKey, ListHead>,
}

impl FutexInner {
    /// Dequeue up to `count` waiters at `key`, marking them woken
    fn take_waiters(&mut self, key: FutexKey, count: u32) -> Vec<ThreadRef> {
        let mut woken = Vec::new();
        let Some(mut queue) = self.queues.remove(&key) else {
            return woken;
        };

        while (woken.len() as u64) < u64::from(count) {
            let Some(id) = self.nodes.pop_front(&mut queue) else {
                break;
            };
            if let Some(node) = self.nodes.get_mut(id) {
                node.woken = true;
                woken.push(node.thread.clone());
            }
        }

        if !queue.is_empty() {
            self.queues.insert(key, queue);
        }
        woken
    }

    /// Unlink a still-queued node from whatever queue it is on
    fn dequeue(&mut self, id: NodeId) {
        let Some(key) = self.nodes.get(id).map(|node| node.key) else {
            return;
        };
        let queue = self
            .queues
            .get_mut(&key)
            .unwrap_or_else(|| panic!("futex: node {} has no queue at {:#x}", id.index(), key));
        self.nodes.unlink(queue, id);
        if queue.is_empty() {
            self.queues.remove(&key);
        }
    }
}

/// Per-address-space futex registry
pub struct FutexTable {
    inner: SpinMutex<FutexInner>,
}

impl Default for FutexTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FutexTable {
    /// Create an empty futex table
    pub fn new() -> Self {
        Self {
            inner: SpinMutex::new(FutexInner {
                nodes: IndexArena::new(),
                queues: BTreeMap::new(),
            }),
        }
    }

    /// Block until woken, if `*value_ptr` still equals `current_value`
    ///
    /// # Returns
    ///
    /// - `Ok(())` when a wake (possibly after a requeue) dequeued us
    /// - `Err(ERR_FAILED_PRECONDITION)` if the value changed; nothing blocked
    /// - `Err(ERR_TIMED_OUT)` if `deadline` passed first
    pub fn wait(&self, value_ptr: &AtomicU32, current_value: u32, deadline: Deadline) -> RxResult<()> {
        let scheduler = sched::scheduler();
        let key = key_of(value_ptr);

        let id = {
            let mut inner = self.inner.lock();
            if value_ptr.load(Ordering::SeqCst) != current_value {
                return Err(RxStatus::ERR_FAILED_PRECONDITION);
            }

            let id = inner.nodes.insert(FutexNode {
                key,
                thread: scheduler.current_thread(),
                woken: false,
            });
            let FutexInner { nodes, queues } = &mut *inner;
            let queue = queues.entry(key).or_insert_with(|| nodes.new_list());
            nodes.push_back(queue, id);
            id
        };

        trace!("futex: wait key={:#x} node={}", key, id.index());

        loop {
            let result = scheduler.block_current_thread(deadline);

            let mut inner = self.inner.lock();
            let woken = inner.nodes.get(id).map_or(false, |node| node.woken);
            if woken {
                inner.nodes.remove(id);
                return Ok(());
            }

            if result == BlockResult::TimedOut || scheduler.now() >= deadline {
                inner.dequeue(id);
                inner.nodes.remove(id);
                trace!("futex: timeout key={:#x} node={}", key, id.index());
                return Err(RxStatus::ERR_TIMED_OUT);
            }
            // Spurious wakeup: still queued, block again
        }
    }

    /// Wake up to `count` waiters on `value_ptr`, oldest first
    pub fn wake(&self, value_ptr: &AtomicU32, count: u32) -> RxResult<()> {
        let key = key_of(value_ptr);
        let woken = self.inner.lock().take_waiters(key, count);

        trace!("futex: wake key={:#x} woken={}", key, woken.len());

        let scheduler = sched::scheduler();
        for thread in &woken {
            scheduler.wake_thread(thread);
        }
        Ok(())
    }

    /// Wake some waiters on `wake_ptr` and move others to `requeue_ptr`
    ///
    /// The value check, the wake and the move happen under one lock hold.
    /// Moved waiters are not woken; they now wait for a wake on
    /// `requeue_ptr`.
    ///
    /// # Returns
    ///
    /// - `Err(ERR_INVALID_ARGS)` if both pointers name the same futex
    /// - `Err(ERR_FAILED_PRECONDITION)` if `*wake_ptr != current_value`;
    ///   nothing is woken or moved
    pub fn requeue(
        &self,
        wake_ptr: &AtomicU32,
        wake_count: u32,
        current_value: u32,
        requeue_ptr: &AtomicU32,
        requeue_count: u32,
    ) -> RxResult<()> {
        let wake_key = key_of(wake_ptr);
        let requeue_key = key_of(requeue_ptr);
        if wake_key == requeue_key {
            return Err(RxStatus::ERR_INVALID_ARGS);
        }

        let (woken, moved) = {
            let mut inner = self.inner.lock();
            if wake_ptr.load(Ordering::SeqCst) != current_value {
                return Err(RxStatus::ERR_FAILED_PRECONDITION);
            }

            let woken = inner.take_waiters(wake_key, wake_count);

            let mut moved = 0u32;
            let FutexInner { nodes, queues } = &mut *inner;
            if let Some(mut from) = queues.remove(&wake_key) {
                let mut to = queues.remove(&requeue_key).unwrap_or_else(|| nodes.new_list());

                while moved < requeue_count {
                    let Some(id) = nodes.pop_front(&mut from) else {
                        break;
                    };
                    if let Some(node) = nodes.get_mut(id) {
                        node.key = requeue_key;
                    }
                    nodes.push_back(&mut to, id);
                    moved += 1;
                }

                if !from.is_empty() {
                    queues.insert(wake_key, from);
                }
                if !to.is_empty() {
                    queues.insert(requeue_key, to);
                }
            }
            (woken, moved)
        };

        trace!(
            "futex: requeue {:#x} -> {:#x} woken={} moved={}",
            wake_key,
            requeue_key,
            woken.len(),
            moved
        );

        let scheduler = sched::scheduler();
        for thread in &woken {
            scheduler.wake_thread(thread);
        }
        Ok(())
    }

    /// Number of threads blocked on `value_ptr`
    pub fn waiter_count(&self, value_ptr: &AtomicU32) -> usize {
        self.inner
            .lock()
            .queues
            .get(&key_of(value_ptr))
            .map_or(0, ListHead::len)
    }

    /// Number of addresses with at least one waiter
    pub fn active_keys(&self) -> usize {
        self.inner.lock().queues.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
