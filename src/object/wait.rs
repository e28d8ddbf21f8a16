// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Object wait and signal operations
//!
//! The blocking waits are built from one wake [`Event`] shared by a
//! [`WaitObserver`] per handle. The first observer to fire decides the
//! result; each observer's `end` reports what its object did.

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::config::MAX_WAIT_MANY_ITEMS;
use crate::object::handle::{Handle, Rights};
use crate::object::signals::Signals;
use crate::object::wait_observer::WaitObserver;
use crate::sched::Deadline;
use crate::status::{RxResult, RxStatus};
use crate::sync::{Event, EventFlags};

/// One entry of an [`object_wait_many`] call
#[derive(Debug)]
pub struct WaitItem<'a> {
    pub handle: &'a Handle,
    /// Signals that end the wait
    pub waitfor: Signals,
    /// Filled in on return with the signals observed on this object
    pub pending: Signals,
}

impl<'a> WaitItem<'a> {
    pub fn new(handle: &'a Handle, waitfor: Signals) -> Self {
        Self {
            handle,
            waitfor,
            pending: Signals::empty(),
        }
    }
}

/// Wait for any of `signals` on one object
///
/// Returns the observed signal state on success.
///
/// # Errors
///
/// - `ERR_TIMED_OUT` if `deadline` passed first
/// - `ERR_CANCELED` if the handle was closed during the wait
/// - `ERR_ACCESS_DENIED` if the handle lacks [`Rights::WAIT`]
pub fn object_wait_one(handle: &Handle, signals: Signals, deadline: Deadline) -> RxResult<Signals> {
    let mut items = [WaitItem::new(handle, signals)];
    object_wait_many(&mut items, deadline)?;
    Ok(items[0].pending)
}

/// Wait until any item's object matches its signals
///
/// On return, successful or not, every item's `pending` holds the signals
/// seen on its object.
///
/// # Errors
///
/// - `ERR_INVALID_ARGS` for more than [`MAX_WAIT_MANY_ITEMS`] items
/// - `ERR_TIMED_OUT` / `ERR_CANCELED` as for [`object_wait_one`]
/// - The first registration failure, after undoing earlier registrations
pub fn object_wait_many(items: &mut [WaitItem<'_>], deadline: Deadline) -> RxResult<()> {
    if items.len() > MAX_WAIT_MANY_ITEMS {
        return Err(RxStatus::ERR_INVALID_ARGS);
    }

    let event = Arc::new(Event::new(false, EventFlags::empty()));
    let mut observers: Vec<WaitObserver> = items.iter().map(|_| WaitObserver::new()).collect();

    let mut registered = Ok(());
    for (item, observer) in items.iter().zip(observers.iter_mut()) {
        registered = observer.begin(&event, item.handle, item.waitfor);
        if registered.is_err() {
            break;
        }
    }

    // Observers that never started report nothing from `end`.
    let result = registered.and_then(|()| event.wait(deadline));

    for (item, observer) in items.iter_mut().zip(observers.iter_mut()) {
        item.pending = observer.end();
    }

    if let Err(err) = result {
        log::trace!("wait many: {} items ended with {:?}", items.len(), err);
    }
    result
}

/// Set or clear user signals on the handle's object
pub fn object_signal(handle: &Handle, clear: Signals, set: Signals) -> RxResult<()> {
    handle.require(Rights::SIGNAL)?;
    handle.object().user_signal(clear, set)
}

/// Set or clear user signals on the peer of the handle's object
pub fn object_signal_peer(handle: &Handle, clear: Signals, set: Signals) -> RxResult<()> {
    handle.require(Rights::SIGNAL_PEER)?;
    handle.object().user_signal_peer(clear, set)
}

// ============================================================================
// Tests
// ============================================================================
