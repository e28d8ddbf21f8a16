// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Object signal bits
//!
//! Every waitable object exposes a 32-bit signal state. The low bits are
//! object-defined, bit 23 is synthesized by wait observers when the handle
//! they watch is closed, and the top eight bits are free for user code.

use bitflags::bitflags;

bitflags! {
    /// Signal state of a kernel object
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Signals: u32 {
        /// Channel has a message to read
        const READABLE = 1 << 0;
        /// Channel peer can accept a message
        const WRITABLE = 1 << 1;
        /// Other end of a channel or event pair is gone
        const PEER_CLOSED = 1 << 2;
        /// Event is signaled
        const SIGNALED = 1 << 3;

        /// Reported by a wait when its handle was closed mid-wait
        const HANDLE_CLOSED = 1 << 23;

        const USER_0 = 1 << 24;
        const USER_1 = 1 << 25;
        const USER_2 = 1 << 26;
        const USER_3 = 1 << 27;
        const USER_4 = 1 << 28;
        const USER_5 = 1 << 29;
        const USER_6 = 1 << 30;
        const USER_7 = 1 << 31;

        /// All user-settable bits
        const USER_ALL = 0xff << 24;
    }
}
