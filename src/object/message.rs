// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Message Packets
//!
//! A [`MessagePacket`] carries one channel message: a byte payload plus a
//! fixed number of handle slots. Both live in a single heap allocation,
//! handle slots first, payload bytes after them.
//!
//! # Handle ownership
//!
//! While `owns_handles` is set, dropping the packet closes every handle
//! still in its slots. [`MessagePacket::take_handles`] moves the handles out
//! to the receiver and clears the flag.

use alloc::alloc::{alloc, dealloc, Layout};
use alloc::vec::Vec;
use core::fmt;
use core::ptr::{self, NonNull};
use core::slice;

use crate::config::{MAX_MSG_HANDLES, MAX_MSG_SIZE, TXID_SIZE};
use crate::object::handle::Handle;
use crate::status::{RxResult, RxStatus};

type HandleSlot = Option<Handle>;

/// Envelope for one channel message
pub struct MessagePacket {
    ptr: NonNull<u8>,
    layout: Layout,
    data_offset: usize,
    data_size: u32,
    num_handles: u16,
    owns_handles: bool,
}

// SAFETY: the packet uniquely owns its allocation; the slots hold `Handle`s,
// which are Send + Sync.
unsafe impl Send for MessagePacket {}
unsafe impl Sync for MessagePacket {}

impl MessagePacket {
    fn layout_for(data_size: usize, num_handles: usize) -> Option<(Layout, usize)> {
        let slots = Layout::array::<HandleSlot>(num_handles).ok()?;
        let bytes = Layout::array::<u8>(data_size).ok()?;
        let (layout, data_offset) = slots.extend(bytes).ok()?;
        Some((layout.pad_to_align(), data_offset))
    }

    /// Allocate a packet holding a copy of `data` and `num_handles` empty
    /// handle slots
    ///
    /// # Errors
    ///
    /// - `ERR_NO_RESOURCES` if `data` exceeds [`MAX_MSG_SIZE`] or
    ///   `num_handles` exceeds [`MAX_MSG_HANDLES`]
    /// - `ERR_NO_MEMORY` if the allocation fails
    pub fn create(data: &[u8], num_handles: usize) -> RxResult<Self> {
        if data.len() > MAX_MSG_SIZE || num_handles > MAX_MSG_HANDLES {
            log::debug!(
                "message: rejecting {} bytes / {} handles",
                data.len(),
                num_handles
            );
            return Err(RxStatus::ERR_NO_RESOURCES);
        }

        let (layout, data_offset) =
            Self::layout_for(data.len(), num_handles).ok_or(RxStatus::ERR_NO_MEMORY)?;

        let ptr = if layout.size() == 0 {
            NonNull::<HandleSlot>::dangling().cast::<u8>()
        } else {
            // SAFETY: layout has non-zero size.
            NonNull::new(unsafe { alloc(layout) }).ok_or(RxStatus::ERR_NO_MEMORY)?
        };

        // SAFETY: the allocation holds `num_handles` slots at offset 0 and
        // `data.len()` bytes at `data_offset`; both regions are in bounds and
        // suitably aligned.
        unsafe {
            let slots = ptr.as_ptr().cast::<HandleSlot>();
            for index in 0..num_handles {
                slots.add(index).write(None);
            }
            ptr::copy_nonoverlapping(data.as_ptr(), ptr.as_ptr().add(data_offset), data.len());
        }

        Ok(Self {
            ptr,
            layout,
            data_offset,
            data_size: data.len() as u32,
            num_handles: num_handles as u16,
            owns_handles: true,
        })
    }

    /// Payload size in bytes
    pub fn data_size(&self) -> usize {
        self.data_size as usize
    }

    /// Number of handle slots
    pub fn num_handles(&self) -> usize {
        self.num_handles as usize
    }

    pub fn owns_handles(&self) -> bool {
        self.owns_handles
    }

    /// Choose whether dropping the packet closes its remaining handles
    pub fn set_owns_handles(&mut self, owns: bool) {
        self.owns_handles = owns;
    }

    /// Payload bytes
    pub fn data(&self) -> &[u8] {
        // SAFETY: `data_size` initialized bytes live at `data_offset`.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr().add(self.data_offset), self.data_size()) }
    }

    fn slots(&self) -> &[HandleSlot] {
        // SAFETY: `num_handles` initialized slots live at offset 0.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr().cast::<HandleSlot>(), self.num_handles()) }
    }

    fn slots_mut(&mut self) -> &mut [HandleSlot] {
        // SAFETY: as for `slots`, and `&mut self` gives exclusive access.
        unsafe {
            slice::from_raw_parts_mut(self.ptr.as_ptr().cast::<HandleSlot>(), self.num_handles())
        }
    }

    /// Copy the payload into `dest`
    ///
    /// # Errors
    ///
    /// `ERR_BAD_ADDRESS` if `dest` is smaller than the payload.
    pub fn copy_data_to(&self, dest: &mut [u8]) -> RxResult<()> {
        let data = self.data();
        let dest = dest.get_mut(..data.len()).ok_or(RxStatus::ERR_BAD_ADDRESS)?;
        dest.copy_from_slice(data);
        Ok(())
    }

    /// Transaction id stored in the first four payload bytes
    ///
    /// Returns 0 for payloads shorter than a transaction id.
    pub fn leading_transaction_id(&self) -> u32 {
        match self.data().first_chunk::<TXID_SIZE>() {
            Some(bytes) => u32::from_ne_bytes(*bytes),
            None => 0,
        }
    }

    /// Fill handle slot `index`
    ///
    /// Hands the handle back if the index is out of range or the slot is
    /// already filled.
    pub fn set_handle(&mut self, index: usize, handle: Handle) -> Result<(), Handle> {
        match self.slots_mut().get_mut(index) {
            Some(slot) if slot.is_none() => {
                *slot = Some(handle);
                Ok(())
            }
            _ => Err(handle),
        }
    }

    /// Handle in slot `index`, if filled
    pub fn handle(&self, index: usize) -> Option<&Handle> {
        self.slots().get(index).and_then(Option::as_ref)
    }

    /// True once every handle slot is filled
    pub fn is_populated(&self) -> bool {
        self.slots().iter().all(Option::is_some)
    }

    /// Move every handle out of the packet
    ///
    /// The receiver owns the returned handles; the packet no longer does.
    pub fn take_handles(&mut self) -> Vec<Handle> {
        self.owns_handles = false;
        self.slots_mut().iter_mut().filter_map(Option::take).collect()
    }
}

impl Drop for MessagePacket {
    fn drop(&mut self) {
        let owns = self.owns_handles;
        for handle in self.slots_mut().iter_mut().filter_map(Option::take) {
            if owns {
                handle.close();
            }
        }

        // SAFETY: every slot is `None` now, so no drop glue is skipped; the
        // allocation was made with `self.layout`.
        unsafe {
            if self.layout.size() != 0 {
                dealloc(self.ptr.as_ptr(), self.layout);
            }
        }
    }
}

impl fmt::Debug for MessagePacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessagePacket")
            .field("data_size", &self.data_size)
            .field("num_handles", &self.num_handles)
            .field("owns_handles", &self.owns_handles)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
