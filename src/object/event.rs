// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Event Objects
//!
//! User-visible events and event pairs. Neither has behavior of its own
//! beyond its signal state: user code sets [`Signals::SIGNALED`] and the
//! user bits through `object_signal`, and waits on them like any other
//! object.
//!
//! # Design
//!
//! - **Event**: Single object, no peer
//! - **Event pair**: Two linked objects; closing the last handle to one
//!   raises [`Signals::PEER_CLOSED`] on the other
//!
//! # Usage
//!
//! ```ignore
//! let (left, right) = eventpair_create();
//! object_signal_peer(&left, Signals::empty(), Signals::SIGNALED)?;
//! object_wait_one(&right, Signals::SIGNALED, INFINITE)?;
//! ```

use alloc::sync::Arc;

use crate::object::dispatcher::{link_peers, Dispatcher, KernelObject, ObjectKind, PeerLink};
use crate::object::handle::{Handle, ObjectType, Rights};
use crate::object::signals::Signals;
use crate::status::RxResult;

/// ============================================================================
/// Event
/// ============================================================================

/// Event object
pub struct EventDispatcher;

impl Dispatcher for EventDispatcher {
    fn object_type(&self) -> ObjectType {
        ObjectType::Event
    }

    fn allowed_user_signals(&self) -> Signals {
        Signals::SIGNALED | Signals::USER_ALL
    }
}

/// Create an event and return its first handle
pub fn event_create() -> Handle {
    let object = KernelObject::new(ObjectKind::Event(EventDispatcher), Signals::empty());
    Handle::new(object, Rights::default_for_type(ObjectType::Event))
}

/// ============================================================================
/// Event Pair
/// ============================================================================

/// One half of an event pair
pub struct EventPairDispatcher {
    peer: PeerLink,
}

impl EventPairDispatcher {
    pub(crate) fn link(&self) -> &PeerLink {
        &self.peer
    }
}

impl Dispatcher for EventPairDispatcher {
    fn object_type(&self) -> ObjectType {
        ObjectType::EventPair
    }

    fn allowed_user_signals(&self) -> Signals {
        Signals::SIGNALED | Signals::USER_ALL
    }

    fn peer(&self) -> RxResult<Arc<KernelObject>> {
        self.peer.get()
    }

    fn on_zero_handles(&self, _object: &KernelObject) {
        if let Some(peer) = self.peer.take() {
            if let ObjectKind::EventPair(other) = peer.kind() {
                other.peer.take();
            }
            peer.tracker().update_state(Signals::empty(), Signals::PEER_CLOSED);
        }
    }
}

/// Create an event pair and return one handle to each half
pub fn eventpair_create() -> (Handle, Handle) {
    let make = || {
        KernelObject::new(
            ObjectKind::EventPair(EventPairDispatcher {
                peer: PeerLink::new(),
            }),
            Signals::empty(),
        )
    };
    let (left, right) = (make(), make());
    link_peers(&left, &right);

    let rights = Rights::default_for_type(ObjectType::EventPair);
    (Handle::new(left, rights), Handle::new(right, rights))
}

// ============================================================================
// Tests
// ============================================================================
