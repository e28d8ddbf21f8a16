// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Kernel Objects & Signaling (Zircon-style)
//!
//! Waitable kernel objects and the machinery that lets threads and ports
//! observe them.
//!
//! # Design
//!
//! - **Capability-based access**: All operations go through handles with rights
//! - **Signal state**: Each object carries a [`Signals`] word kept by its
//!   [`StateTracker`]
//! - **Observers**: Waits and port bindings register [`StateObserver`]s that
//!   the tracker calls back on every change and on handle close
//! - **Handle passing**: Channel messages move handles between owners
//!
//! # Modules
//!
//! - [`handle`] - Handle and rights model
//! - [`dispatcher`] - Kernel object base and per-type hooks
//! - [`state_tracker`] - Signal state and observer registry
//! - [`wait_observer`] - Observer backing blocking waits
//! - [`wait`] - `object_wait_one` / `object_wait_many` / `object_signal`
//! - [`port`] - Completion ports
//! - [`message`] - Channel message packets
//! - [`channel`] - IPC channels
//! - [`event`] - Event objects

pub mod channel;
pub mod dispatcher;
pub mod event;
pub mod handle;
pub mod message;
pub mod port;
pub mod signals;
pub mod state_tracker;
pub mod wait;
pub mod wait_observer;

// Re-exports
pub use channel::{channel_create, channel_read, channel_write, ChannelDispatcher};
pub use dispatcher::{Dispatcher, KernelObject, Koid, ObjectKind};
pub use event::{event_create, eventpair_create, EventDispatcher, EventPairDispatcher};
pub use handle::{Handle, HandleId, HandleOwner, HandleTable, HandleValue, ObjectType, Rights};
pub use message::MessagePacket;
pub use port::{
    PacketPayload, PacketType, Port, PortId, PortPacket, SignalPayload, WaitAsyncMode,
};
pub use signals::Signals;
pub use state_tracker::{ObserverFlags, ObserverKey, StateObserver, StateTracker};
pub use wait::{object_signal, object_signal_peer, object_wait_many, object_wait_one, WaitItem};
pub use wait_observer::WaitObserver;
