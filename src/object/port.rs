// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Completion Ports
//!
//! A port is a FIFO of packets that threads dequeue with [`Port::wait`].
//! Packets come from two places:
//!
//! - **User packets** queued directly with [`Port::queue`]
//! - **Signal packets** produced when an object bound with [`Port::bind`]
//!   enters one of its trigger signals
//!
//! # Signal packets
//!
//! Each binding (a "source") owns exactly one signal packet for its whole
//! life. Firing a source whose packet is still queued does not queue a
//! second packet; it bumps the packet's re-fire `count` instead and records
//! the latest observed state. `count` is a `u32` that saturates at
//! `u32::MAX`. Delivery resets it.
//!
//! When a source is retired (its handle closed, its one-shot delivered, or
//! canceled by key) its packet moves to a zero-reference list once it is no
//! longer queued. Zero-reference packets are only freed with the port.
//!
//! # Locking
//!
//! Observer callbacks reach the port under the bound object's tracker lock,
//! so the port lock nests inside tracker locks and never the other way.

use alloc::collections::{BTreeMap, VecDeque};
use alloc::sync::{Arc, Weak};
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::config::{MAX_PENDING_USER_PACKETS, USER_PACKET_PAYLOAD_SIZE};
use crate::object::dispatcher::{alloc_koid, Koid};
use crate::object::handle::{Handle, HandleId, Rights};
use crate::object::signals::Signals;
use crate::object::state_tracker::{ObserverFlags, StateObserver};
use crate::sched::{self, Deadline, ThreadRef};
use crate::status::{RxResult, RxStatus};
use crate::sync::{IndexArena, ListHead, NodeId, SpinMutex};

/// Port identifier
pub type PortId = Koid;

// ============================================================================
// Packets
// ============================================================================

/// How long a binding stays armed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitAsyncMode {
    /// Deliver one packet, then unbind
    Once,
    /// Stay bound until canceled
    Repeating,
}

/// Kind of a dequeued packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    User,
    SignalOne,
    SignalRepeating,
}

/// Payload of a signal packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalPayload {
    /// Signals the binding was armed with
    pub trigger: Signals,
    /// Object state at the most recent firing
    pub observed: Signals,
    /// Firings since the previous delivery, saturating
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketPayload {
    User([u8; USER_PACKET_PAYLOAD_SIZE]),
    Signal(SignalPayload),
}

/// A packet returned by [`Port::wait`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortPacket {
    pub key: u64,
    pub packet_type: PacketType,
    pub status: i32,
    pub payload: PacketPayload,
}

impl PortPacket {
    /// Build a user packet
    pub const fn user(key: u64, status: i32, payload: [u8; USER_PACKET_PAYLOAD_SIZE]) -> Self {
        Self {
            key,
            packet_type: PacketType::User,
            status,
            payload: PacketPayload::User(payload),
        }
    }

    /// Signal payload, if this is a signal packet
    pub fn signal(&self) -> Option<&SignalPayload> {
        match &self.payload {
            PacketPayload::Signal(signal) => Some(signal),
            PacketPayload::User(_) => None,
        }
    }
}

static NEXT_SOURCE_COOKIE: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy)]
struct SignalSource {
    cookie: u64,
    key: u64,
    /// Object the binding was made on
    koid: Koid,
    trigger: Signals,
    mode: WaitAsyncMode,
}

struct SignalSlot {
    source: SignalSource,
    observed: Signals,
    count: u32,
    retired: bool,
}

impl SignalSlot {
    fn snapshot(&self) -> PortPacket {
        let packet_type = match self.source.mode {
            WaitAsyncMode::Once => PacketType::SignalOne,
            WaitAsyncMode::Repeating => PacketType::SignalRepeating,
        };
        PortPacket {
            key: self.source.key,
            packet_type,
            status: 0,
            payload: PacketPayload::Signal(SignalPayload {
                trigger: self.source.trigger,
                observed: self.observed,
                count: self.count,
            }),
        }
    }
}

enum PacketSlot {
    User(PortPacket),
    Signal(SignalSlot),
}

// ============================================================================
// Port
// ============================================================================

struct PortInner {
    packets: IndexArena<PacketSlot>,
    pending: ListHead,
    zero_ref: ListHead,
    /// Signal packet of each source, by cookie
    sources: BTreeMap<u64, NodeId>,
    user_pending: usize,
    waiters: VecDeque<ThreadRef>,
}

impl PortInner {
    fn signal_slot(&mut self, id: NodeId) -> Option<&mut SignalSlot> {
        match self.packets.get_mut(id) {
            Some(PacketSlot::Signal(slot)) => Some(slot),
            _ => None,
        }
    }

    /// Park a retired, unqueued signal packet on the zero-reference list
    fn park_if_idle(&mut self, id: NodeId) {
        if !self.packets.is_linked(id) {
            self.packets.push_back(&mut self.zero_ref, id);
        }
    }
}

/// Completion port
pub struct Port {
    id: PortId,
    inner: SpinMutex<PortInner>,
}

impl Port {
    /// Create a new port
    pub fn create() -> Arc<Self> {
        let mut packets = IndexArena::new();
        let pending = packets.new_list();
        let zero_ref = packets.new_list();
        let port = Arc::new(Self {
            id: alloc_koid(),
            inner: SpinMutex::new(PortInner {
                packets,
                pending,
                zero_ref,
                sources: BTreeMap::new(),
                user_pending: 0,
                waiters: VecDeque::new(),
            }),
        });
        log::debug!("port {}: created", port.id);
        port
    }

    pub fn id(&self) -> PortId {
        self.id
    }

    /// Number of packets waiting to be dequeued
    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Number of retired signal packets kept until the port is destroyed
    pub fn zero_ref_count(&self) -> usize {
        self.inner.lock().zero_ref.len()
    }

    /// Queue a user packet
    ///
    /// # Errors
    ///
    /// - `ERR_INVALID_ARGS` if `packet` is not a user packet
    /// - `ERR_SHOULD_WAIT` if the user packet limit is reached
    pub fn queue(&self, packet: PortPacket) -> RxResult<()> {
        if packet.packet_type != PacketType::User || packet.signal().is_some() {
            return Err(RxStatus::ERR_INVALID_ARGS);
        }

        let waiter = {
            let mut inner = self.inner.lock();
            if inner.user_pending >= MAX_PENDING_USER_PACKETS {
                log::warn!("port {}: user packet limit reached", self.id);
                return Err(RxStatus::ERR_SHOULD_WAIT);
            }
            let inner = &mut *inner;
            let id = inner.packets.insert(PacketSlot::User(packet));
            inner.packets.push_back(&mut inner.pending, id);
            inner.user_pending += 1;
            inner.waiters.pop_front()
        };

        if let Some(thread) = waiter {
            sched::scheduler().wake_thread(&thread);
        }
        Ok(())
    }

    /// Fire a source, queueing or coalescing its signal packet
    ///
    /// Returns false if the source is already retired.
    fn signal(&self, source: &SignalSource, observed: Signals) -> bool {
        let waiter = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;

            match inner.sources.get(&source.cookie).copied() {
                Some(id) => {
                    let queued = inner.packets.is_on(&inner.pending, id);
                    let Some(slot) = inner.signal_slot(id) else {
                        log::warn!("port {}: source {} lost its packet", self.id, source.cookie);
                        return false;
                    };
                    if slot.retired {
                        log::warn!(
                            "port {}: dropping signal for retired source {}",
                            self.id,
                            source.cookie
                        );
                        return false;
                    }
                    slot.observed = observed;
                    if queued {
                        slot.count = slot.count.saturating_add(1);
                        log::trace!(
                            "port {}: coalesced key {} (count {})",
                            self.id,
                            source.key,
                            slot.count
                        );
                        return true;
                    }
                    slot.count = 1;
                    inner.packets.push_back(&mut inner.pending, id);
                }
                None => {
                    let id = inner.packets.insert(PacketSlot::Signal(SignalSlot {
                        source: *source,
                        observed,
                        count: 1,
                        retired: false,
                    }));
                    inner.sources.insert(source.cookie, id);
                    inner.packets.push_back(&mut inner.pending, id);
                }
            }

            log::trace!("port {}: queued signal key {}", self.id, source.key);
            inner.waiters.pop_front()
        };

        if let Some(thread) = waiter {
            sched::scheduler().wake_thread(&thread);
        }
        true
    }

    /// Mark a source as retired
    ///
    /// A queued packet is still delivered and parked afterwards.
    fn retire_source(&self, cookie: u64) {
        let mut inner = self.inner.lock();
        let Some(id) = inner.sources.get(&cookie).copied() else {
            return;
        };
        if let Some(slot) = inner.signal_slot(id) {
            slot.retired = true;
        }
        inner.park_if_idle(id);
    }

    /// Retire a source and discard its queued packet
    fn cancel_source(&self, cookie: u64) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let Some(id) = inner.sources.get(&cookie).copied() else {
            return;
        };
        if let Some(slot) = inner.signal_slot(id) {
            slot.retired = true;
        }
        if inner.packets.is_on(&inner.pending, id) {
            inner.packets.unlink(&mut inner.pending, id);
        }
        inner.park_if_idle(id);
    }

    /// Discard queued signal packets for `key` on object `koid`
    fn discard_queued(&self, koid: Koid, key: u64) -> bool {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let mut discarded = false;

        for id in inner.packets.ids(&inner.pending) {
            let matches = match inner.packets.get(id) {
                Some(PacketSlot::Signal(slot)) => slot.source.koid == koid && slot.source.key == key,
                _ => false,
            };
            if !matches {
                continue;
            }
            inner.packets.unlink(&mut inner.pending, id);
            if let Some(slot) = inner.signal_slot(id) {
                slot.retired = true;
            }
            inner.park_if_idle(id);
            discarded = true;
        }
        discarded
    }

    /// Dequeue the next packet
    ///
    /// # Errors
    ///
    /// `ERR_TIMED_OUT` if `deadline` passes with nothing queued.
    pub fn wait(&self, deadline: Deadline) -> RxResult<PortPacket> {
        let scheduler = sched::scheduler();
        let me = scheduler.current_thread();

        loop {
            {
                let mut guard = self.inner.lock();
                let inner = &mut *guard;

                if let Some(id) = inner.packets.pop_front(&mut inner.pending) {
                    inner.waiters.retain(|t| t.id() != me.id());
                    return Ok(Self::take_packet(inner, id));
                }

                if scheduler.now() >= deadline {
                    inner.waiters.retain(|t| t.id() != me.id());
                    return Err(RxStatus::ERR_TIMED_OUT);
                }

                if !inner.waiters.iter().any(|t| t.id() == me.id()) {
                    inner.waiters.push_back(me.clone());
                }
            }

            scheduler.block_current_thread(deadline);
        }
    }

    /// Hand a just-dequeued packet to the caller
    fn take_packet(inner: &mut PortInner, id: NodeId) -> PortPacket {
        if let Some(slot) = inner.signal_slot(id) {
            let packet = slot.snapshot();
            slot.count = 0;
            let retired = slot.retired;
            if retired {
                inner.packets.push_back(&mut inner.zero_ref, id);
            }
            return packet;
        }

        inner.user_pending -= 1;
        match inner.packets.remove(id) {
            PacketSlot::User(packet) => packet,
            PacketSlot::Signal(_) => unreachable!("port: signal slot taken as user packet"),
        }
    }

    /// Deliver a packet for `key` whenever `handle`'s object enters any of
    /// `signals`
    ///
    /// If the object already matches, the first packet is queued before this
    /// returns.
    ///
    /// # Errors
    ///
    /// - `ERR_ACCESS_DENIED` if the handle lacks [`Rights::WAIT`]
    /// - `ERR_CANCELED` if the handle was already closed
    /// - `ERR_BAD_STATE` if the object is being destroyed
    pub fn bind(
        self: &Arc<Self>,
        handle: &Handle,
        key: u64,
        signals: Signals,
        mode: WaitAsyncMode,
    ) -> RxResult<()> {
        handle.require(Rights::WAIT)?;

        let observer = Arc::new(PortObserver {
            port: Arc::downgrade(self),
            port_id: self.id,
            handle: handle.id(),
            source: SignalSource {
                cookie: NEXT_SOURCE_COOKIE.fetch_add(1, Ordering::Relaxed),
                key,
                koid: handle.object().koid(),
                trigger: signals,
                mode,
            },
            retired: AtomicBool::new(false),
        });
        handle.object().tracker().add_observer(handle, observer)?;
        log::debug!(
            "port {}: bound key {} to object {}",
            self.id,
            key,
            handle.object().koid()
        );
        Ok(())
    }

    /// Drop bindings and queued packets for `key` on `handle`'s object
    ///
    /// # Errors
    ///
    /// - `ERR_ACCESS_DENIED` if the handle lacks [`Rights::WAIT`]
    /// - `ERR_NOT_FOUND` if nothing matched
    pub fn cancel(&self, handle: &Handle, key: u64) -> RxResult<()> {
        handle.require(Rights::WAIT)?;

        let object = handle.object();
        let unbound = object.tracker().cancel_by_key(self.id, key);
        let discarded = self.discard_queued(object.koid(), key);

        if unbound || discarded {
            Ok(())
        } else {
            Err(RxStatus::ERR_NOT_FOUND)
        }
    }
}

impl Drop for Port {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        log::debug!(
            "port {}: destroyed with {} pending, {} zero-ref packets",
            self.id,
            inner.pending.len(),
            inner.zero_ref.len()
        );
    }
}

// ============================================================================
// Port Observer
// ============================================================================

/// Binding of one object to a port
struct PortObserver {
    port: Weak<Port>,
    port_id: PortId,
    handle: HandleId,
    source: SignalSource,
    retired: AtomicBool,
}

impl PortObserver {
    fn deliver(&self, state: Signals) -> ObserverFlags {
        if self.retired.load(Ordering::Acquire) {
            return ObserverFlags::NEED_REMOVAL;
        }
        let Some(port) = self.port.upgrade() else {
            log::debug!("port {}: gone, unbinding key {}", self.port_id, self.source.key);
            return ObserverFlags::NEED_REMOVAL;
        };
        if !state.intersects(self.source.trigger) {
            return ObserverFlags::empty();
        }

        port.signal(&self.source, state);
        match self.source.mode {
            WaitAsyncMode::Once => {
                self.retired.store(true, Ordering::Release);
                port.retire_source(self.source.cookie);
                ObserverFlags::NEED_REMOVAL
            }
            WaitAsyncMode::Repeating => ObserverFlags::empty(),
        }
    }
}

impl StateObserver for PortObserver {
    fn on_initialize(&self, initial_state: Signals) -> ObserverFlags {
        self.deliver(initial_state)
    }

    fn on_state_change(&self, new_state: Signals) -> ObserverFlags {
        self.deliver(new_state)
    }

    fn on_cancel(&self, handle: HandleId) -> ObserverFlags {
        if handle != self.handle {
            return ObserverFlags::empty();
        }
        self.retired.store(true, Ordering::Release);
        if let Some(port) = self.port.upgrade() {
            port.retire_source(self.source.cookie);
        }
        ObserverFlags::NEED_REMOVAL | ObserverFlags::HANDLED
    }

    fn on_cancel_by_key(&self, port: PortId, key: u64) -> ObserverFlags {
        if port != self.port_id || key != self.source.key {
            return ObserverFlags::empty();
        }
        self.retired.store(true, Ordering::Release);
        if let Some(port) = self.port.upgrade() {
            port.cancel_source(self.source.cookie);
        }
        ObserverFlags::NEED_REMOVAL | ObserverFlags::HANDLED
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::event::event_create;
    use crate::object::wait::object_signal;
    use crate::sched::{deadline_after, INFINITE};
    use core::time::Duration;

    fn short_deadline() -> Deadline {
        deadline_after(Duration::from_millis(10))
    }

    fn set(handle: &Handle, signals: Signals) {
        object_signal(handle, Signals::empty(), signals).unwrap();
    }

    fn clear(handle: &Handle, signals: Signals) {
        object_signal(handle, signals, Signals::empty()).unwrap();
    }

    #[test]
    fn test_user_packets_fifo() {
        let port = Port::create();
        port.queue(PortPacket::user(1, 0, [1; USER_PACKET_PAYLOAD_SIZE])).unwrap();
        port.queue(PortPacket::user(2, -5, [2; USER_PACKET_PAYLOAD_SIZE])).unwrap();
        assert_eq!(port.pending_count(), 2);

        let first = port.wait(INFINITE).unwrap();
        assert_eq!(first.key, 1);
        assert_eq!(first.payload, PacketPayload::User([1; USER_PACKET_PAYLOAD_SIZE]));

        let second = port.wait(INFINITE).unwrap();
        assert_eq!(second.key, 2);
        assert_eq!(second.status, -5);
        assert_eq!(port.pending_count(), 0);
    }

    #[test]
    fn test_queue_rejects_signal_packets() {
        let port = Port::create();
        let mut packet = PortPacket::user(1, 0, [0; USER_PACKET_PAYLOAD_SIZE]);
        packet.packet_type = PacketType::SignalOne;
        assert_eq!(port.queue(packet), Err(RxStatus::ERR_INVALID_ARGS));
    }

    #[test]
    fn test_user_packet_limit() {
        let port = Port::create();
        let packet = PortPacket::user(0, 0, [0; USER_PACKET_PAYLOAD_SIZE]);
        for _ in 0..MAX_PENDING_USER_PACKETS {
            port.queue(packet).unwrap();
        }
        assert_eq!(port.queue(packet), Err(RxStatus::ERR_SHOULD_WAIT));

        port.wait(INFINITE).unwrap();
        port.queue(packet).unwrap();
    }

    #[test]
    fn test_wait_times_out() {
        let port = Port::create();
        assert_eq!(port.wait(short_deadline()), Err(RxStatus::ERR_TIMED_OUT));
    }

    #[test]
    fn test_wait_cross_thread() {
        let port = Port::create();
        let consumer = {
            let port = port.clone();
            std::thread::spawn(move || port.wait(deadline_after(Duration::from_secs(10))))
        };

        port.queue(PortPacket::user(9, 0, [0; USER_PACKET_PAYLOAD_SIZE])).unwrap();
        assert_eq!(consumer.join().unwrap().unwrap().key, 9);
    }

    #[test]
    fn test_bind_fires_on_current_state() {
        let port = Port::create();
        let handle = event_create();
        set(&handle, Signals::SIGNALED);

        port.bind(&handle, 7, Signals::SIGNALED, WaitAsyncMode::Once).unwrap();
        let packet = port.wait(short_deadline()).unwrap();

        assert_eq!(packet.key, 7);
        assert_eq!(packet.packet_type, PacketType::SignalOne);
        let signal = packet.signal().unwrap();
        assert_eq!(signal.trigger, Signals::SIGNALED);
        assert!(signal.observed.contains(Signals::SIGNALED));
        assert_eq!(signal.count, 1);
        handle.close();
    }

    #[test]
    fn test_refire_coalesces_into_one_packet() {
        let port = Port::create();
        let handle = event_create();
        port.bind(&handle, 3, Signals::SIGNALED, WaitAsyncMode::Repeating).unwrap();

        set(&handle, Signals::SIGNALED);
        clear(&handle, Signals::SIGNALED);
        set(&handle, Signals::SIGNALED | Signals::USER_0);
        assert_eq!(port.pending_count(), 1);

        let packet = port.wait(short_deadline()).unwrap();
        let signal = packet.signal().unwrap();
        assert_eq!(signal.count, 2);
        assert_eq!(signal.observed, Signals::SIGNALED | Signals::USER_0);
        assert_eq!(port.wait(short_deadline()), Err(RxStatus::ERR_TIMED_OUT));

        // Delivery resets the counter
        clear(&handle, Signals::SIGNALED);
        set(&handle, Signals::SIGNALED);
        assert_eq!(port.wait(short_deadline()).unwrap().signal().unwrap().count, 1);
        handle.close();
    }

    #[test]
    fn test_refire_counter_saturates() {
        let port = Port::create();
        let handle = event_create();
        port.bind(&handle, 3, Signals::SIGNALED, WaitAsyncMode::Repeating).unwrap();
        set(&handle, Signals::SIGNALED);

        {
            let mut inner = port.inner.lock();
            let id = inner.packets.front(&inner.pending).unwrap();
            inner.signal_slot(id).unwrap().count = u32::MAX - 1;
        }
        clear(&handle, Signals::SIGNALED);
        set(&handle, Signals::SIGNALED);
        clear(&handle, Signals::SIGNALED);
        set(&handle, Signals::SIGNALED);

        assert_eq!(port.wait(short_deadline()).unwrap().signal().unwrap().count, u32::MAX);
        handle.close();
    }

    #[test]
    fn test_once_unbinds_after_firing() {
        let port = Port::create();
        let handle = event_create();
        port.bind(&handle, 1, Signals::SIGNALED, WaitAsyncMode::Once).unwrap();

        set(&handle, Signals::SIGNALED);
        assert_eq!(handle.object().tracker().observer_count(), 0);
        clear(&handle, Signals::SIGNALED);
        set(&handle, Signals::SIGNALED);

        assert_eq!(port.wait(short_deadline()).unwrap().signal().unwrap().count, 1);
        assert_eq!(port.wait(short_deadline()), Err(RxStatus::ERR_TIMED_OUT));
        assert_eq!(port.zero_ref_count(), 1);
        handle.close();
    }

    #[test]
    fn test_handle_close_retires_binding() {
        let port = Port::create();
        let handle = event_create();
        let object = handle.object().clone();
        let other = handle.duplicate(Rights::SAME_RIGHTS).unwrap();
        port.bind(&handle, 1, Signals::SIGNALED, WaitAsyncMode::Repeating).unwrap();

        handle.close();
        assert_eq!(object.tracker().observer_count(), 0);
        set(&other, Signals::SIGNALED);
        assert_eq!(port.pending_count(), 0);
        other.close();
    }

    #[test]
    fn test_queued_packet_survives_handle_close() {
        let port = Port::create();
        let handle = event_create();
        port.bind(&handle, 4, Signals::SIGNALED, WaitAsyncMode::Repeating).unwrap();
        set(&handle, Signals::SIGNALED);

        handle.close();
        assert_eq!(port.zero_ref_count(), 0);
        assert_eq!(port.wait(short_deadline()).unwrap().key, 4);
        assert_eq!(port.zero_ref_count(), 1);
    }

    #[test]
    fn test_cancel_by_key() {
        let port = Port::create();
        let handle = event_create();
        port.bind(&handle, 1, Signals::SIGNALED, WaitAsyncMode::Repeating).unwrap();
        port.bind(&handle, 2, Signals::SIGNALED, WaitAsyncMode::Repeating).unwrap();
        set(&handle, Signals::SIGNALED);
        assert_eq!(port.pending_count(), 2);

        port.cancel(&handle, 1).unwrap();
        assert_eq!(port.pending_count(), 1);
        assert_eq!(handle.object().tracker().observer_count(), 1);
        assert_eq!(port.wait(short_deadline()).unwrap().key, 2);

        assert_eq!(port.cancel(&handle, 1), Err(RxStatus::ERR_NOT_FOUND));
        handle.close();
    }

    #[test]
    fn test_cancel_discards_delivered_once_packet() {
        let port = Port::create();
        let handle = event_create();
        set(&handle, Signals::SIGNALED);
        port.bind(&handle, 5, Signals::SIGNALED, WaitAsyncMode::Once).unwrap();
        assert_eq!(port.pending_count(), 1);

        port.cancel(&handle, 5).unwrap();
        assert_eq!(port.pending_count(), 0);
        assert_eq!(port.zero_ref_count(), 1);
        handle.close();
    }

    #[test]
    fn test_bind_requires_wait_right() {
        let port = Port::create();
        let handle = event_create();
        let no_wait = handle.duplicate(Rights::SIGNAL).unwrap();
        assert_eq!(
            port.bind(&no_wait, 1, Signals::SIGNALED, WaitAsyncMode::Once),
            Err(RxStatus::ERR_ACCESS_DENIED)
        );
        no_wait.close();
        handle.close();
    }

    #[test]
    fn test_port_drop_unbinds_lazily() {
        let handle = event_create();
        {
            let port = Port::create();
            port.bind(&handle, 1, Signals::SIGNALED, WaitAsyncMode::Repeating).unwrap();
        }
        assert_eq!(handle.object().tracker().observer_count(), 1);
        set(&handle, Signals::SIGNALED);
        assert_eq!(handle.object().tracker().observer_count(), 0);
        handle.close();
    }
}
