// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! IPC Channels
//!
//! Channels provide bidirectional message passing. Each message is a
//! [`MessagePacket`]: bytes plus transferred handles.
//!
//! # Design
//!
//! - **Bidirectional**: Created as pairs of endpoints
//! - **FIFO ordering**: Messages delivered in order
//! - **Bounded queue**: `ERR_SHOULD_WAIT` when the peer's queue is full
//! - **Handle passing**: Handles move into the message and out to the reader
//! - **Peer closure**: Closing one end raises PEER_CLOSED on the other
//!
//! # Signals
//!
//! - `READABLE` while the endpoint's own queue is non-empty
//! - `WRITABLE` while the peer is alive
//! - `PEER_CLOSED` once the peer's last handle is closed
//!
//! # Usage
//!
//! ```ignore
//! let (a, b) = channel_create();
//! channel_write(&a, MessagePacket::create(b"ping", 0)?)?;
//! let msg = channel_read(&b)?;
//! ```

use alloc::collections::VecDeque;
use alloc::sync::Arc;

use crate::config::CHANNEL_MAX_PENDING_MESSAGES;
use crate::object::dispatcher::{link_peers, Dispatcher, KernelObject, ObjectKind, PeerLink};
use crate::object::handle::{Handle, ObjectType, Rights};
use crate::object::message::MessagePacket;
use crate::object::signals::Signals;
use crate::status::{RxResult, RxStatus};
use crate::sync::SpinMutex;

struct MessageQueue {
    messages: VecDeque<MessagePacket>,
    /// Set under the queue lock when the endpoint's last handle closes
    closed: bool,
}

/// One endpoint of a channel
pub struct ChannelDispatcher {
    peer: PeerLink,
    /// Messages waiting to be read from this endpoint
    queue: SpinMutex<MessageQueue>,
}

impl ChannelDispatcher {
    fn new() -> Self {
        Self {
            peer: PeerLink::new(),
            queue: SpinMutex::new(MessageQueue {
                messages: VecDeque::new(),
                closed: false,
            }),
        }
    }

    pub(crate) fn link(&self) -> &PeerLink {
        &self.peer
    }

    /// Number of queued messages
    pub fn queue_len(&self) -> usize {
        self.queue.lock().messages.len()
    }

    /// Append a message written by the peer, raising READABLE on `object`
    ///
    /// `object` is the kernel object owning this endpoint.
    fn enqueue(&self, object: &KernelObject, msg: MessagePacket) -> RxResult<()> {
        let mut queue = self.queue.lock();
        if queue.closed {
            drop(queue);
            log::debug!("channel {}: write raced last close", object.koid());
            return Err(RxStatus::ERR_PEER_CLOSED);
        }
        if queue.messages.len() >= CHANNEL_MAX_PENDING_MESSAGES {
            drop(queue);
            log::warn!("channel {}: queue full", object.koid());
            return Err(RxStatus::ERR_SHOULD_WAIT);
        }
        log::trace!(
            "channel {}: queued {} bytes, {} handles",
            object.koid(),
            msg.data_size(),
            msg.num_handles()
        );
        queue.messages.push_back(msg);
        // Signal under the queue lock so READABLE always matches the queue.
        object.tracker().update_state(Signals::empty(), Signals::READABLE);
        Ok(())
    }
}

impl Dispatcher for ChannelDispatcher {
    fn object_type(&self) -> ObjectType {
        ObjectType::Channel
    }

    fn allowed_user_signals(&self) -> Signals {
        Signals::USER_ALL
    }

    fn peer(&self) -> RxResult<Arc<KernelObject>> {
        self.peer.get()
    }

    fn on_zero_handles(&self, object: &KernelObject) {
        // Unread messages die with the endpoint, closing handles they carry.
        let unread = {
            let mut queue = self.queue.lock();
            queue.closed = true;
            core::mem::take(&mut queue.messages)
        };
        if !unread.is_empty() {
            log::debug!(
                "channel {}: discarding {} unread messages",
                object.koid(),
                unread.len()
            );
        }
        drop(unread);

        if let Some(peer) = self.peer.take() {
            if let ObjectKind::Channel(other) = peer.kind() {
                other.peer.take();
            }
            peer.tracker()
                .update_state(Signals::WRITABLE, Signals::PEER_CLOSED);
        }
    }
}

fn endpoint(handle: &Handle) -> RxResult<&ChannelDispatcher> {
    match handle.object().kind() {
        ObjectKind::Channel(channel) => Ok(channel),
        _ => Err(RxStatus::ERR_WRONG_TYPE),
    }
}

/// Create a channel and return a handle to each endpoint
pub fn channel_create() -> (Handle, Handle) {
    let make = || KernelObject::new(ObjectKind::Channel(ChannelDispatcher::new()), Signals::WRITABLE);
    let (a, b) = (make(), make());
    link_peers(&a, &b);

    let rights = Rights::default_for_type(ObjectType::Channel);
    (Handle::new(a, rights), Handle::new(b, rights))
}

/// Write a message to the peer of `handle`
///
/// The message is consumed either way; on failure, handles it carries are
/// closed with it.
///
/// # Errors
///
/// - `ERR_WRONG_TYPE` / `ERR_ACCESS_DENIED` for a bad endpoint handle
/// - `ERR_INVALID_ARGS` if a handle slot was left empty
/// - `ERR_ACCESS_DENIED` if a carried handle lacks [`Rights::TRANSFER`]
/// - `ERR_NOT_SUPPORTED` if the message carries a handle to this endpoint
/// - `ERR_PEER_CLOSED` if the peer is gone
/// - `ERR_SHOULD_WAIT` if the peer's queue is full
pub fn channel_write(handle: &Handle, msg: MessagePacket) -> RxResult<()> {
    let channel = endpoint(handle)?;
    handle.require(Rights::WRITE)?;

    if !msg.is_populated() {
        return Err(RxStatus::ERR_INVALID_ARGS);
    }
    let own_koid = handle.object().koid();
    for index in 0..msg.num_handles() {
        if let Some(carried) = msg.handle(index) {
            if carried.object().koid() == own_koid {
                return Err(RxStatus::ERR_NOT_SUPPORTED);
            }
            carried.require(Rights::TRANSFER)?;
        }
    }

    let peer = channel.peer.get()?;
    let ObjectKind::Channel(peer_channel) = peer.kind() else {
        return Err(RxStatus::ERR_INTERNAL);
    };

    peer_channel.enqueue(&peer, msg)
}

/// Read the next message queued on `handle`'s endpoint
///
/// # Errors
///
/// - `ERR_WRONG_TYPE` / `ERR_ACCESS_DENIED` for a bad endpoint handle
/// - `ERR_SHOULD_WAIT` if the queue is empty and the peer is alive
/// - `ERR_PEER_CLOSED` if the queue is empty and the peer is gone
pub fn channel_read(handle: &Handle) -> RxResult<MessagePacket> {
    let channel = endpoint(handle)?;
    handle.require(Rights::READ)?;

    let mut queue = channel.queue.lock();
    match queue.messages.pop_front() {
        Some(msg) => {
            if queue.messages.is_empty() {
                handle
                    .object()
                    .tracker()
                    .update_state(Signals::READABLE, Signals::empty());
            }
            Ok(msg)
        }
        None if channel.peer.get().is_err() => Err(RxStatus::ERR_PEER_CLOSED),
        None => Err(RxStatus::ERR_SHOULD_WAIT),
    }
}

// ============================================================================
// Tests
// ============================================================================
