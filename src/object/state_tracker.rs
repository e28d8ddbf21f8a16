// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Signal state tracking and observer registry
//!
//! Each kernel object owns one [`StateTracker`]. It holds the object's
//! current [`Signals`] and the observers registered on it, and calls every
//! observer back whenever the state changes or a handle is canceled.
//!
//! # Locking
//!
//! Observer callbacks run with the tracker lock held. A callback may take
//! the lock of whatever it feeds (a wait event, a port) but must never call
//! back into a tracker. Nothing takes a tracker lock while holding a port
//! lock.

use alloc::sync::Arc;
use alloc::vec::Vec;
use bitflags::bitflags;
use slab::Slab;

use crate::object::handle::{Handle, HandleId};
use crate::object::port::PortId;
use crate::object::signals::Signals;
use crate::status::{RxResult, RxStatus};
use crate::sync::SpinMutex;

bitflags! {
    /// What an observer callback asks the tracker to do
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ObserverFlags: u32 {
        /// Unregister this observer after the callback
        const NEED_REMOVAL = 0x01;
        /// The callback consumed the cancellation
        const HANDLED = 0x02;
    }
}

/// Callbacks delivered by a [`StateTracker`]
pub trait StateObserver: Send + Sync {
    /// Called once, during registration, with the state at that moment
    fn on_initialize(&self, initial_state: Signals) -> ObserverFlags;

    /// Called after every change of the signal state
    fn on_state_change(&self, new_state: Signals) -> ObserverFlags;

    /// Called when a handle to the object is being closed
    fn on_cancel(&self, handle: HandleId) -> ObserverFlags;

    /// Called when a port asks to drop the bindings made with `key`
    fn on_cancel_by_key(&self, _port: PortId, _key: u64) -> ObserverFlags {
        ObserverFlags::empty()
    }
}

/// Registration token returned by [`StateTracker::add_observer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverKey {
    slot: usize,
    serial: u64,
}

struct ObserverEntry {
    serial: u64,
    /// Handle the observer was registered through
    handle: HandleId,
    observer: Arc<dyn StateObserver>,
}

struct TrackerInner {
    signals: Signals,
    observers: Slab<ObserverEntry>,
    next_serial: u64,
    defunct: bool,
}

impl TrackerInner {
    /// Run `callback` on every observer, dropping those that ask for it
    ///
    /// Returns true if any observer reported `HANDLED`.
    fn notify<F>(&mut self, mut callback: F) -> bool
    where
        F: FnMut(&dyn StateObserver) -> ObserverFlags,
    {
        let mut handled = false;
        let mut removals = Vec::new();

        for (slot, entry) in self.observers.iter() {
            let flags = callback(entry.observer.as_ref());
            handled |= flags.contains(ObserverFlags::HANDLED);
            if flags.contains(ObserverFlags::NEED_REMOVAL) {
                removals.push(slot);
            }
        }

        for slot in removals {
            self.observers.remove(slot);
        }
        handled
    }
}

/// Signal state and observers of one object
pub struct StateTracker {
    inner: SpinMutex<TrackerInner>,
}

impl StateTracker {
    pub fn new(initial: Signals) -> Self {
        Self {
            inner: SpinMutex::new(TrackerInner {
                signals: initial,
                observers: Slab::new(),
                next_serial: 1,
                defunct: false,
            }),
        }
    }

    /// Current signal state
    pub fn signals(&self) -> Signals {
        self.inner.lock().signals
    }

    /// Number of registered observers
    pub fn observer_count(&self) -> usize {
        self.inner.lock().observers.len()
    }

    /// Register an observer through `handle`
    ///
    /// `on_initialize` runs under the tracker lock before this returns, so
    /// no state change can slip between the initial snapshot and the first
    /// `on_state_change`. Returns `Ok(None)` when the observer asked for
    /// removal from `on_initialize` and was never kept.
    ///
    /// # Errors
    ///
    /// - `ERR_CANCELED` if `handle` is already closed
    /// - `ERR_BAD_STATE` if the object's last handle is already closed
    pub fn add_observer(
        &self,
        handle: &Handle,
        observer: Arc<dyn StateObserver>,
    ) -> RxResult<Option<ObserverKey>> {
        let mut inner = self.inner.lock();
        // Checked under the lock that `cancel` marks the handle with.
        if handle.is_closed() {
            return Err(RxStatus::ERR_CANCELED);
        }
        if inner.defunct {
            return Err(RxStatus::ERR_BAD_STATE);
        }

        let flags = observer.on_initialize(inner.signals);
        if flags.contains(ObserverFlags::NEED_REMOVAL) {
            return Ok(None);
        }

        let serial = inner.next_serial;
        inner.next_serial += 1;
        let slot = inner.observers.insert(ObserverEntry {
            serial,
            handle: handle.id(),
            observer,
        });
        Ok(Some(ObserverKey { slot, serial }))
    }

    /// Unregister an observer
    ///
    /// Does nothing if the observer already removed itself. Returns the
    /// signal state at the moment of removal.
    pub fn remove_observer(&self, key: ObserverKey) -> Signals {
        let mut inner = self.inner.lock();
        let registered = inner
            .observers
            .get(key.slot)
            .is_some_and(|entry| entry.serial == key.serial);
        if registered {
            inner.observers.remove(key.slot);
        }
        inner.signals
    }

    /// Clear then set signal bits, notifying observers on change
    pub fn update_state(&self, clear: Signals, set: Signals) {
        let mut inner = self.inner.lock();
        let previous = inner.signals;
        let next = previous.difference(clear).union(set);
        if next == previous {
            return;
        }
        inner.signals = next;
        log::trace!("state tracker: {:?} -> {:?}", previous, next);
        inner.notify(|observer| observer.on_state_change(next));
    }

    /// Close `handle` and tell every observer about it
    ///
    /// The handle refuses new registrations from this point on. Returns
    /// true if some observer was registered through it.
    pub fn cancel(&self, handle: &Handle) -> bool {
        let mut inner = self.inner.lock();
        handle.mark_closed();
        let id = handle.id();
        inner.notify(|observer| observer.on_cancel(id))
    }

    /// Tell every observer that `port` is dropping bindings made with `key`
    pub fn cancel_by_key(&self, port: PortId, key: u64) -> bool {
        self.inner
            .lock()
            .notify(|observer| observer.on_cancel_by_key(port, key))
    }

    /// Refuse further registrations and cancel every remaining observer
    ///
    /// Each observer is canceled through the handle it was registered with
    /// and removed whatever it answers.
    pub(crate) fn set_defunct(&self) {
        let mut inner = self.inner.lock();
        inner.defunct = true;
        if inner.observers.is_empty() {
            return;
        }

        log::debug!(
            "state tracker: canceling {} observers on last close",
            inner.observers.len()
        );
        for entry in inner.observers.drain() {
            entry.observer.on_cancel(entry.handle);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::event::event_create;
    use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    /// Records the last state seen and removes itself once `stop` is seen
    struct Recorder {
        last: AtomicU32,
        changes: AtomicUsize,
        cancels: AtomicUsize,
        stop: Signals,
        handle: HandleId,
    }

    impl Recorder {
        fn new(stop: Signals, handle: &Handle) -> Arc<Self> {
            Arc::new(Self {
                last: AtomicU32::new(0),
                changes: AtomicUsize::new(0),
                cancels: AtomicUsize::new(0),
                stop,
                handle: handle.id(),
            })
        }

        fn last(&self) -> Signals {
            Signals::from_bits_retain(self.last.load(Ordering::SeqCst))
        }

        fn flags_for(&self, state: Signals) -> ObserverFlags {
            if state.intersects(self.stop) {
                ObserverFlags::NEED_REMOVAL
            } else {
                ObserverFlags::empty()
            }
        }
    }

    impl StateObserver for Recorder {
        fn on_initialize(&self, initial: Signals) -> ObserverFlags {
            self.last.store(initial.bits(), Ordering::SeqCst);
            self.flags_for(initial)
        }

        fn on_state_change(&self, new_state: Signals) -> ObserverFlags {
            self.last.store(new_state.bits(), Ordering::SeqCst);
            self.changes.fetch_add(1, Ordering::SeqCst);
            self.flags_for(new_state)
        }

        fn on_cancel(&self, handle: HandleId) -> ObserverFlags {
            if handle == self.handle {
                self.cancels.fetch_add(1, Ordering::SeqCst);
                ObserverFlags::NEED_REMOVAL | ObserverFlags::HANDLED
            } else {
                ObserverFlags::empty()
            }
        }
    }

    #[test]
    fn test_initialize_sees_current_state() {
        let handle = event_create();
        let tracker = StateTracker::new(Signals::WRITABLE);
        let recorder = Recorder::new(Signals::PEER_CLOSED, &handle);

        let key = tracker.add_observer(&handle, recorder.clone()).unwrap();
        assert!(key.is_some());
        assert_eq!(recorder.last(), Signals::WRITABLE);
        assert_eq!(tracker.observer_count(), 1);
        handle.close();
    }

    #[test]
    fn test_update_notifies_only_on_change() {
        let handle = event_create();
        let tracker = StateTracker::new(Signals::empty());
        let recorder = Recorder::new(Signals::PEER_CLOSED, &handle);
        tracker.add_observer(&handle, recorder.clone()).unwrap();

        tracker.update_state(Signals::empty(), Signals::READABLE);
        tracker.update_state(Signals::empty(), Signals::READABLE);
        assert_eq!(recorder.changes.load(Ordering::SeqCst), 1);

        tracker.update_state(Signals::READABLE, Signals::WRITABLE);
        assert_eq!(recorder.last(), Signals::WRITABLE);
        assert_eq!(tracker.signals(), Signals::WRITABLE);
        handle.close();
    }

    #[test]
    fn test_need_removal_from_callbacks() {
        let handle = event_create();
        let tracker = StateTracker::new(Signals::PEER_CLOSED);
        let eager = Recorder::new(Signals::PEER_CLOSED, &handle);
        assert_eq!(tracker.add_observer(&handle, eager).unwrap(), None);
        assert_eq!(tracker.observer_count(), 0);

        let tracker = StateTracker::new(Signals::empty());
        let recorder = Recorder::new(Signals::PEER_CLOSED, &handle);
        tracker.add_observer(&handle, recorder).unwrap();
        tracker.update_state(Signals::empty(), Signals::PEER_CLOSED);
        assert_eq!(tracker.observer_count(), 0);
        handle.close();
    }

    #[test]
    fn test_cancel_matches_handle() {
        let first = event_create();
        let second = event_create();
        let other = event_create();
        let tracker = StateTracker::new(Signals::empty());
        tracker
            .add_observer(&first, Recorder::new(Signals::empty(), &first))
            .unwrap();
        tracker
            .add_observer(&second, Recorder::new(Signals::empty(), &second))
            .unwrap();

        assert!(!tracker.cancel(&other));
        assert_eq!(tracker.observer_count(), 2);
        assert!(tracker.cancel(&first));
        assert_eq!(tracker.observer_count(), 1);

        first.close();
        second.close();
        other.close();
    }

    #[test]
    fn test_canceled_handle_refuses_registration() {
        let handle = event_create();
        let tracker = StateTracker::new(Signals::empty());
        tracker.cancel(&handle);
        assert!(handle.is_closed());

        let recorder = Recorder::new(Signals::empty(), &handle);
        assert_eq!(
            tracker.add_observer(&handle, recorder.clone()).unwrap_err(),
            RxStatus::ERR_CANCELED
        );
        assert_eq!(tracker.observer_count(), 0);
        assert_eq!(recorder.last(), Signals::empty());
        handle.close();
    }

    #[test]
    fn test_remove_stale_key_is_noop() {
        let first = event_create();
        let second = event_create();
        let tracker = StateTracker::new(Signals::empty());
        let key = tracker
            .add_observer(&first, Recorder::new(Signals::empty(), &first))
            .unwrap()
            .unwrap();
        tracker.cancel(&first);

        // Slot is reused by a new registration; the old key must not evict it
        tracker
            .add_observer(&second, Recorder::new(Signals::empty(), &second))
            .unwrap();
        tracker.remove_observer(key);
        assert_eq!(tracker.observer_count(), 1);

        first.close();
        second.close();
    }

    #[test]
    fn test_defunct_cancels_remaining_and_refuses_registration() {
        let handle = event_create();
        let tracker = StateTracker::new(Signals::empty());
        let recorder = Recorder::new(Signals::empty(), &handle);
        tracker.add_observer(&handle, recorder.clone()).unwrap();

        tracker.set_defunct();
        assert_eq!(recorder.cancels.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.observer_count(), 0);
        assert_eq!(
            tracker
                .add_observer(&handle, Recorder::new(Signals::empty(), &handle))
                .unwrap_err(),
            RxStatus::ERR_BAD_STATE
        );
        handle.close();
    }
}
