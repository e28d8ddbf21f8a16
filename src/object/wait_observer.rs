// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Wait observer
//!
//! Links one handle of a multi-object wait to the shared wake [`Event`].
//! The observer records every state it sees so that [`WaitObserver::end`]
//! can report why the object woke the waiter, and reports
//! [`Signals::HANDLE_CLOSED`] when the handle it watches is closed.

use alloc::sync::{Arc, Weak};
use core::sync::atomic::{AtomicU32, Ordering};

use crate::object::dispatcher::KernelObject;
use crate::object::handle::{Handle, HandleId, Rights};
use crate::object::signals::Signals;
use crate::object::state_tracker::{ObserverFlags, ObserverKey, StateObserver};
use crate::status::{RxResult, RxStatus};
use crate::sync::Event;

struct WaitState {
    event: Arc<Event>,
    handle: HandleId,
    watched: Signals,
    wakeup_reasons: AtomicU32,
}

impl WaitState {
    fn record(&self, state: Signals) {
        self.wakeup_reasons.fetch_or(state.bits(), Ordering::AcqRel);
        if state.intersects(self.watched) {
            self.event.signal();
        }
    }
}

impl StateObserver for WaitState {
    fn on_initialize(&self, initial_state: Signals) -> ObserverFlags {
        self.record(initial_state);
        ObserverFlags::empty()
    }

    fn on_state_change(&self, new_state: Signals) -> ObserverFlags {
        self.record(new_state);
        ObserverFlags::empty()
    }

    fn on_cancel(&self, handle: HandleId) -> ObserverFlags {
        if handle != self.handle {
            return ObserverFlags::empty();
        }
        self.wakeup_reasons
            .fetch_or(Signals::HANDLE_CLOSED.bits(), Ordering::AcqRel);
        self.event.signal_etc(Err(RxStatus::ERR_CANCELED));
        ObserverFlags::NEED_REMOVAL | ObserverFlags::HANDLED
    }
}

struct Registration {
    state: Arc<WaitState>,
    object: Weak<KernelObject>,
    key: Option<ObserverKey>,
}

/// One handle's part in a wait
///
/// Call [`begin`](Self::begin), block on the event, then
/// [`end`](Self::end). Dropping an active observer ends it.
#[derive(Default)]
pub struct WaitObserver {
    registration: Option<Registration>,
}

impl WaitObserver {
    pub const fn new() -> Self {
        Self { registration: None }
    }

    /// Start watching `handle` for any of `watched`
    ///
    /// If the object already matches, `event` is signaled before this
    /// returns.
    ///
    /// # Errors
    ///
    /// - `ERR_ACCESS_DENIED` if the handle lacks [`Rights::WAIT`]
    /// - `ERR_BAD_STATE` if the observer is already active or the object
    ///   is being destroyed
    /// - `ERR_CANCELED` if the handle was already closed
    pub fn begin(&mut self, event: &Arc<Event>, handle: &Handle, watched: Signals) -> RxResult<()> {
        if self.registration.is_some() {
            return Err(RxStatus::ERR_BAD_STATE);
        }
        handle.require(Rights::WAIT)?;

        let state = Arc::new(WaitState {
            event: event.clone(),
            handle: handle.id(),
            watched,
            wakeup_reasons: AtomicU32::new(0),
        });
        let key = handle.object().tracker().add_observer(handle, state.clone())?;

        self.registration = Some(Registration {
            state,
            object: Arc::downgrade(handle.object()),
            key,
        });
        Ok(())
    }

    /// True between `begin` and `end`
    pub fn is_active(&self) -> bool {
        self.registration.is_some()
    }

    /// Stop watching and return every signal seen while registered
    ///
    /// Includes [`Signals::HANDLE_CLOSED`] if the handle was closed during
    /// the wait. Returns empty if the observer was never started.
    pub fn end(&mut self) -> Signals {
        let Some(registration) = self.registration.take() else {
            return Signals::empty();
        };

        if let (Some(key), Some(object)) = (registration.key, registration.object.upgrade()) {
            object.tracker().remove_observer(key);
        }

        Signals::from_bits_retain(registration.state.wakeup_reasons.load(Ordering::Acquire))
    }
}

impl Drop for WaitObserver {
    fn drop(&mut self) {
        self.end();
    }
}

// ============================================================================
// Tests
// ============================================================================
