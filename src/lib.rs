// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! # Rustux Sync - Kernel Wait/Notify Substrate
//!
//! The pieces of the Rustux kernel that let threads block on, and be woken
//! by, changes in the world:
//!
//! - **Futexes**: Address-keyed wait queues with wait/wake/requeue
//! - **Observers**: Per-object signal state with registered callbacks
//! - **Waits**: Blocking waits on one or many objects
//! - **Ports**: Completion queues fed by user packets and object signals
//! - **Messages**: Single-allocation envelopes of bytes plus handles
//!
//! ## Architecture
//!
//! ```text
//! src/
//! ├── sched/             # Scheduler interface (block/wake), host backend
//! ├── sync/              # SpinMutex, wake Event, FutexTable, index lists
//! ├── object/            # Handles, objects, observers, ports, channels
//! ├── config.rs          # Limits
//! ├── status.rs          # RxStatus / RxResult
//! └── lib.rs             # This file
//! ```
//!
//! ## Scheduler
//!
//! Blocking goes through the [`sched::Scheduler`] trait. A kernel installs
//! its scheduler once with [`sched::install`]; with the `std` feature, a
//! host backend built on thread park/unpark is used until then.
//!
//! ## Using a Port
//!
//! ```ignore
//! use rustux_sync::object::{event_create, object_signal, Port, Signals, WaitAsyncMode};
//! use rustux_sync::sched::INFINITE;
//!
//! let port = Port::create();
//! let event = event_create();
//! port.bind(&event, 42, Signals::SIGNALED, WaitAsyncMode::Once)?;
//! object_signal(&event, Signals::empty(), Signals::SIGNALED)?;
//! let packet = port.wait(INFINITE)?;
//! assert_eq!(packet.key, 42);
//! ```

#![no_std]

// Alloc crate for heap allocations
extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

// Status codes
pub mod status;

// Limits
pub mod config;

// Block/wake interface
pub mod sched;

// Locks, futexes and wait queues
pub mod sync;

// Kernel objects and signaling
pub mod object;

#[cfg(test)]
mod tests;

// Re-exports
pub use status::{RxResult, RxStatus};
pub use sync::FutexTable;
