// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Status Codes
//!
//! Every fallible operation in this crate returns [`RxResult`]. The raw
//! values follow the syscall convention: success is zero or positive,
//! failures are negative codes.

use thiserror::Error;

/// Status return type
#[allow(non_camel_case_types)]
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RxStatus {
    /// Bookkeeping failure that should not be user-triggerable
    #[error("internal error")]
    ERR_INTERNAL = -1,

    /// Operation not supported on this object
    #[error("not supported")]
    ERR_NOT_SUPPORTED = -2,

    /// Resource limit hit (message too large, too many handles)
    #[error("no resources")]
    ERR_NO_RESOURCES = -3,

    /// Allocation failed
    #[error("no memory")]
    ERR_NO_MEMORY = -4,

    /// Invalid argument
    #[error("invalid args")]
    ERR_INVALID_ARGS = -10,

    /// Handle is not valid for this operation
    #[error("bad handle")]
    ERR_BAD_HANDLE = -11,

    /// Object is of the wrong type
    #[error("wrong type")]
    ERR_WRONG_TYPE = -12,

    /// Nothing matched the request
    #[error("not found")]
    ERR_NOT_FOUND = -13,

    /// Object is in a state that forbids the operation
    #[error("bad state")]
    ERR_BAD_STATE = -20,

    /// Deadline passed
    #[error("timed out")]
    ERR_TIMED_OUT = -21,

    /// Operation would block; retry later
    #[error("should wait")]
    ERR_SHOULD_WAIT = -22,

    /// Wait canceled because the handle was closed
    #[error("canceled")]
    ERR_CANCELED = -23,

    /// Other end of a paired object is gone
    #[error("peer closed")]
    ERR_PEER_CLOSED = -24,

    /// Handle lacks the required rights
    #[error("access denied")]
    ERR_ACCESS_DENIED = -30,

    /// Caller-supplied memory is unusable
    #[error("bad address")]
    ERR_BAD_ADDRESS = -40,

    /// Value check failed; caller must retry
    #[error("failed precondition")]
    ERR_FAILED_PRECONDITION = -41,

    /// Destination buffer too small
    #[error("buffer too small")]
    ERR_BUFFER_TOO_SMALL = -42,
}

/// Result type using RxStatus
pub type RxResult<T> = Result<T, RxStatus>;

impl RxStatus {
    /// Raw negative ABI value
    pub const fn into_raw(self) -> i32 {
        self as i32
    }

    /// Map a raw ABI value back to a status
    ///
    /// Returns `None` for zero/positive values and unknown codes.
    pub const fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            -1 => Self::ERR_INTERNAL,
            -2 => Self::ERR_NOT_SUPPORTED,
            -3 => Self::ERR_NO_RESOURCES,
            -4 => Self::ERR_NO_MEMORY,
            -10 => Self::ERR_INVALID_ARGS,
            -11 => Self::ERR_BAD_HANDLE,
            -12 => Self::ERR_WRONG_TYPE,
            -13 => Self::ERR_NOT_FOUND,
            -20 => Self::ERR_BAD_STATE,
            -21 => Self::ERR_TIMED_OUT,
            -22 => Self::ERR_SHOULD_WAIT,
            -23 => Self::ERR_CANCELED,
            -24 => Self::ERR_PEER_CLOSED,
            -30 => Self::ERR_ACCESS_DENIED,
            -40 => Self::ERR_BAD_ADDRESS,
            -41 => Self::ERR_FAILED_PRECONDITION,
            -42 => Self::ERR_BUFFER_TOO_SMALL,
            _ => return None,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::ToString;

    #[test]
    fn test_status_raw_mapping() {
        assert_eq!(RxStatus::ERR_TIMED_OUT.into_raw(), -21);
        assert_eq!(RxStatus::from_raw(-41), Some(RxStatus::ERR_FAILED_PRECONDITION));
        assert_eq!(RxStatus::from_raw(0), None);
        assert_eq!(RxStatus::from_raw(-999), None);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(RxStatus::ERR_BAD_ADDRESS.to_string(), "bad address");
    }
}
