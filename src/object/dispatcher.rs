// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Kernel Object Base
//!
//! A [`KernelObject`] couples the state every waitable object shares
//! (koid, handle count, signal tracker) with the per-type behavior in
//! [`ObjectKind`]. Per-type hooks go through the [`Dispatcher`] trait.

use alloc::sync::{Arc, Weak};
use core::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use crate::object::channel::ChannelDispatcher;
use crate::object::event::{EventDispatcher, EventPairDispatcher};
use crate::object::handle::ObjectType;
use crate::object::signals::Signals;
use crate::object::state_tracker::StateTracker;
use crate::status::{RxResult, RxStatus};
use crate::sync::SpinMutex;

/// Kernel object identifier
pub type Koid = u64;

static NEXT_KOID: AtomicU64 = AtomicU64::new(1);

/// Allocate a new koid
///
/// Ports draw from the same space so that ids never collide.
pub(crate) fn alloc_koid() -> Koid {
    NEXT_KOID.fetch_add(1, Ordering::Relaxed)
}

/// Per-type hooks
pub trait Dispatcher: Send + Sync {
    /// Object type reported through handles
    fn object_type(&self) -> ObjectType;

    /// Signals user code may set or clear
    fn allowed_user_signals(&self) -> Signals;

    /// Object on the other end, for paired types
    fn peer(&self) -> RxResult<Arc<KernelObject>> {
        Err(RxStatus::ERR_NOT_SUPPORTED)
    }

    /// Called once when the last handle is closed
    fn on_zero_handles(&self, _object: &KernelObject) {}
}

/// Type-specific state
pub enum ObjectKind {
    Event(EventDispatcher),
    EventPair(EventPairDispatcher),
    Channel(ChannelDispatcher),
}

/// Kernel object base
///
/// All kernel objects share this common structure.
pub struct KernelObjectBase {
    koid: Koid,
    handle_count: AtomicUsize,
    destroying: AtomicBool,
    tracker: StateTracker,
}

impl KernelObjectBase {
    fn new(initial: Signals) -> Self {
        Self {
            koid: alloc_koid(),
            handle_count: AtomicUsize::new(0),
            destroying: AtomicBool::new(false),
            tracker: StateTracker::new(initial),
        }
    }
}

/// A waitable kernel object
pub struct KernelObject {
    base: KernelObjectBase,
    kind: ObjectKind,
}

impl KernelObject {
    /// Create an object with no handles yet
    pub fn new(kind: ObjectKind, initial: Signals) -> Arc<Self> {
        Arc::new(Self {
            base: KernelObjectBase::new(initial),
            kind,
        })
    }

    /// Kernel object id
    pub fn koid(&self) -> Koid {
        self.base.koid
    }

    /// Type-specific state
    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    /// Per-type hooks
    pub fn dispatcher(&self) -> &dyn Dispatcher {
        match &self.kind {
            ObjectKind::Event(d) => d,
            ObjectKind::EventPair(d) => d,
            ObjectKind::Channel(d) => d,
        }
    }

    pub fn obj_type(&self) -> ObjectType {
        self.dispatcher().object_type()
    }

    /// Signal tracker and observer registry
    pub fn tracker(&self) -> &StateTracker {
        &self.base.tracker
    }

    /// Current signal state
    pub fn signals(&self) -> Signals {
        self.base.tracker.signals()
    }

    /// Number of open handles
    pub fn handle_count(&self) -> usize {
        self.base.handle_count.load(Ordering::Acquire)
    }

    /// Check if the last handle has been closed
    pub fn is_destroying(&self) -> bool {
        self.base.destroying.load(Ordering::Acquire)
    }

    /// Set or clear user-settable signals
    pub fn user_signal(&self, clear: Signals, set: Signals) -> RxResult<()> {
        let allowed = self.dispatcher().allowed_user_signals();
        if !allowed.contains(clear | set) {
            return Err(RxStatus::ERR_INVALID_ARGS);
        }
        self.base.tracker.update_state(clear, set);
        Ok(())
    }

    /// Set or clear user-settable signals on the peer
    pub fn user_signal_peer(&self, clear: Signals, set: Signals) -> RxResult<()> {
        self.dispatcher().peer()?.user_signal(clear, set)
    }

    pub(crate) fn acquire_handle(&self) {
        self.base.handle_count.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn release_handle(&self) {
        let prev = self.base.handle_count.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "handle count underflow on koid {}", self.base.koid);
        if prev != 1 {
            return;
        }

        self.base.destroying.store(true, Ordering::Release);
        self.base.tracker.set_defunct();
        log::debug!(
            "object {} ({}): last handle closed",
            self.base.koid,
            self.obj_type().name()
        );
        self.dispatcher().on_zero_handles(self);
    }
}

/// Weak link to the other half of a paired object
pub(crate) struct PeerLink {
    peer: SpinMutex<Weak<KernelObject>>,
}

impl PeerLink {
    pub(crate) fn new() -> Self {
        Self {
            peer: SpinMutex::new(Weak::new()),
        }
    }

    pub(crate) fn set(&self, peer: &Arc<KernelObject>) {
        *self.peer.lock() = Arc::downgrade(peer);
    }

    pub(crate) fn get(&self) -> RxResult<Arc<KernelObject>> {
        self.peer.lock().upgrade().ok_or(RxStatus::ERR_PEER_CLOSED)
    }

    /// Sever the link and return the peer if it is still alive
    pub(crate) fn take(&self) -> Option<Arc<KernelObject>> {
        core::mem::take(&mut *self.peer.lock()).upgrade()
    }
}

/// Link two freshly created objects as peers
///
/// Panics if either object is not a paired type.
pub(crate) fn link_peers(a: &Arc<KernelObject>, b: &Arc<KernelObject>) {
    fn link_of(object: &KernelObject) -> &PeerLink {
        match object.kind() {
            ObjectKind::EventPair(d) => d.link(),
            ObjectKind::Channel(d) => d.link(),
            ObjectKind::Event(_) => panic!("object {} has no peer", object.koid()),
        }
    }
    link_of(a).set(b);
    link_of(b).set(a);
}
