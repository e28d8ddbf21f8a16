// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Compile-time limits
//!
//! Every bound enforced by the wait/notify substrate lives here so the
//! numbers can be tuned in one place.

/// Maximum message size in bytes
pub const MAX_MSG_SIZE: usize = 64 * 1024;

/// Maximum handles per message
pub const MAX_MSG_HANDLES: usize = 64;

/// Size of the transaction id at the front of a call/response payload
pub const TXID_SIZE: usize = core::mem::size_of::<u32>();

/// Maximum queued messages per channel endpoint
pub const CHANNEL_MAX_PENDING_MESSAGES: usize = 1024;

/// Maximum manual packets pending on one port
pub const MAX_PENDING_USER_PACKETS: usize = 2048;

/// Opaque payload carried by a user packet
pub const USER_PACKET_PAYLOAD_SIZE: usize = 32;

/// Maximum handles installed in one handle table
pub const MAX_HANDLES_PER_TABLE: usize = 256;

/// Maximum items in one `object_wait_many` call
pub const MAX_WAIT_MANY_ITEMS: usize = 64;

static_assertions::const_assert!(MAX_MSG_SIZE <= u32::MAX as usize);
static_assertions::const_assert!(MAX_MSG_HANDLES <= u16::MAX as usize);
static_assertions::const_assert!(TXID_SIZE <= MAX_MSG_SIZE);
