// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Kernel Synchronization Primitives
//!
//! # Primitives
//!
//! - **SpinMutex**: Spin-based lock for the short critical sections that
//!   guard every table, queue and tracker in this crate
//! - **Event**: Single-signal wake primitive shared by multi-object waits
//! - **FutexTable**: Address-keyed wait queues for user-mode locks
//! - **IndexArena**: Index-linked lists replacing intrusive pointers

pub mod event;
pub mod futex;
pub mod list;

// Re-exports
pub use spin::{Mutex as SpinMutex, MutexGuard as SpinMutexGuard};
pub use event::{Event, EventFlags};
pub use futex::{FutexKey, FutexTable, FUTEX_ALL};
pub use list::{IndexArena, ListHead, NodeId};
