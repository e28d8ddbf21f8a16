// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Handle & Rights Model
//!
//! Waitable objects are reached through handles carrying rights. A handle
//! counts toward its object's handle count; when the last one is closed the
//! object starts tearing down.
//!
//! # Design
//!
//! - **Handles**: Move-only capability tokens referencing a kernel object
//! - **Rights**: Bitmask checked before every operation
//! - **Close**: Explicit. [`Handle::close`] cancels waits on the handle and
//!   drops the handle count; dropping a `Handle` value without closing it
//!   leaves the count untouched (the handle is still accounted for by
//!   whatever table holds it)
//! - **Table**: [`HandleTable`] maps small integer values to handles so that
//!   a handle can be closed from one thread while another waits on it
//!
//! # Usage
//!
//! ```ignore
//! let handle = event_create();
//! handle.require(Rights::SIGNAL)?;
//! handle.close();
//! ```

use alloc::sync::Arc;
use bitflags::bitflags;
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use slab::Slab;

use crate::config::MAX_HANDLES_PER_TABLE;
use crate::object::dispatcher::KernelObject;
use crate::status::{RxResult, RxStatus};
use crate::sync::SpinMutex;

/// ============================================================================
/// Handle Rights
/// ============================================================================

bitflags! {
    /// Handle rights bitmask
    ///
    /// Rights are permissions that control what operations can be performed
    /// on a kernel object through a handle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Rights: u32 {
        /// Read state or messages
        const READ = 0x01;
        /// Write messages
        const WRITE = 0x02;
        /// Duplicate handle
        const DUPLICATE = 0x04;
        /// Send through a channel
        const TRANSFER = 0x08;
        /// Change user signals on the object
        const SIGNAL = 0x10;
        /// Change user signals on the object's peer
        const SIGNAL_PEER = 0x20;
        /// Wait on the object or bind it to a port
        const WAIT = 0x40;

        /// Keep same rights on dup
        const SAME_RIGHTS = 0x8000_0000;

        /// Rights every object type grants
        const BASIC = Self::DUPLICATE.bits() | Self::TRANSFER.bits() | Self::WAIT.bits();
    }
}

impl Rights {
    /// Require specific rights
    ///
    /// # Returns
    ///
    /// - Ok(()) if all rights are present
    /// - Err(ERR_ACCESS_DENIED) if any right is missing
    pub fn require(self, required: Self) -> RxResult<()> {
        if self.contains(required) {
            Ok(())
        } else {
            Err(RxStatus::ERR_ACCESS_DENIED)
        }
    }

    /// Get default rights for a given object type
    pub const fn default_for_type(obj_type: ObjectType) -> Self {
        match obj_type {
            ObjectType::Event => Self::BASIC.union(Self::SIGNAL),
            ObjectType::EventPair => Self::BASIC.union(Self::SIGNAL).union(Self::SIGNAL_PEER),
            ObjectType::Channel => Self::BASIC
                .union(Self::READ)
                .union(Self::WRITE)
                .union(Self::SIGNAL)
                .union(Self::SIGNAL_PEER),
            ObjectType::Unknown => Self::empty(),
        }
    }
}

/// ============================================================================
/// Handle ID
/// ============================================================================

/// Handle identifier
///
/// Unique for the lifetime of the system; observers use it to recognize
/// cancellation of the handle they were registered through.
pub type HandleId = u64;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

fn alloc_handle_id() -> HandleId {
    NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed)
}

/// ============================================================================
/// Kernel Object Types
/// ============================================================================

/// Kernel object type
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    /// Unknown type
    Unknown = 0,

    /// Channel endpoint
    Channel = 5,

    /// Event object
    Event = 6,

    /// Event pair
    EventPair = 7,
}

impl ObjectType {
    /// Get name as string
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Channel => "channel",
            Self::Event => "event",
            Self::EventPair => "eventpair",
        }
    }
}

/// ============================================================================
/// Handle
/// ============================================================================

/// Handle to a kernel object
///
/// A handle is a capability token that references a kernel object
/// and specifies what operations are permitted on it.
pub struct Handle {
    id: HandleId,
    object: Arc<KernelObject>,
    rights: Rights,
    /// Set once the handle is closed or moved out of its table; no new
    /// registrations are accepted through it afterwards
    closed: AtomicBool,
}

impl Handle {
    /// Create a new handle, counting it against `object`
    pub fn new(object: Arc<KernelObject>, rights: Rights) -> Self {
        object.acquire_handle();
        Self {
            id: alloc_handle_id(),
            object,
            rights,
            closed: AtomicBool::new(false),
        }
    }

    /// Get handle ID
    pub const fn id(&self) -> HandleId {
        self.id
    }

    /// Get the rights for this handle
    pub const fn rights(&self) -> Rights {
        self.rights
    }

    /// Object this handle refers to
    pub fn object(&self) -> &Arc<KernelObject> {
        &self.object
    }

    /// Get the object type for this handle
    pub fn object_type(&self) -> ObjectType {
        self.object.obj_type()
    }

    /// Require specific rights
    pub fn require(&self, required: Rights) -> RxResult<()> {
        self.rights.require(required)
    }

    /// Check if handle has specific rights
    pub fn has_right(&self, right: Rights) -> bool {
        self.rights.contains(right)
    }

    /// Check if the handle was closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stop accepting registrations through this handle
    ///
    /// Called by the object's tracker with its lock held while it cancels
    /// the handle, so no registration can slip in after the cancel.
    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Duplicate the handle
    ///
    /// `rights` is either [`Rights::SAME_RIGHTS`] or a subset of this
    /// handle's rights.
    ///
    /// # Errors
    ///
    /// - `ERR_BAD_HANDLE` if the handle was already closed
    /// - `ERR_ACCESS_DENIED` without [`Rights::DUPLICATE`]
    /// - `ERR_INVALID_ARGS` if `rights` is not a subset
    pub fn duplicate(&self, rights: Rights) -> RxResult<Self> {
        if self.is_closed() {
            return Err(RxStatus::ERR_BAD_HANDLE);
        }
        self.require(Rights::DUPLICATE)?;

        let new_rights = if rights.contains(Rights::SAME_RIGHTS) {
            self.rights
        } else if self.rights.contains(rights) {
            rights
        } else {
            return Err(RxStatus::ERR_INVALID_ARGS);
        };

        Ok(Self::new(self.object.clone(), new_rights))
    }

    /// Close the handle
    ///
    /// Waits and port bindings made through this handle are canceled before
    /// the object's handle count drops.
    pub fn close(self) {
        self.release();
    }

    fn release(&self) {
        self.object.tracker().cancel(self);
        self.object.release_handle();
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("koid", &self.object.koid())
            .field("type", &self.object.obj_type())
            .field("rights", &self.rights)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// ============================================================================
/// Handle Owner
/// ============================================================================

/// Owned handle that auto-closes on drop
pub struct HandleOwner {
    handle: Option<Handle>,
}

impl HandleOwner {
    /// Take ownership of a handle
    pub fn new(handle: Handle) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// Get the underlying handle
    pub fn get(&self) -> &Handle {
        // Only `take` empties the slot, and it consumes the owner.
        match &self.handle {
            Some(handle) => handle,
            None => unreachable!("handle owner emptied"),
        }
    }

    /// Take the handle out without closing it
    pub fn take(mut self) -> Handle {
        match self.handle.take() {
            Some(handle) => handle,
            None => unreachable!("handle owner emptied"),
        }
    }
}

impl Drop for HandleOwner {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.close();
        }
    }
}

/// ============================================================================
/// Handle Table
/// ============================================================================

/// Value naming a handle inside a [`HandleTable`]
pub type HandleValue = u32;

/// Handle table
///
/// Lookups hand out shared references so a wait can run on a handle while
/// another thread closes it through the table.
pub struct HandleTable {
    slots: SpinMutex<Slab<Arc<Handle>>>,
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleTable {
    /// Create a new handle table
    pub fn new() -> Self {
        Self {
            slots: SpinMutex::new(Slab::new()),
        }
    }

    /// Add a handle to the table
    ///
    /// The handle is closed if the table is full.
    pub fn add(&self, handle: Handle) -> RxResult<HandleValue> {
        let mut slots = self.slots.lock();
        if Self::slots_full(&slots) {
            drop(slots);
            log::warn!("handle table: full, closing handle {}", handle.id());
            handle.close();
            return Err(RxStatus::ERR_NO_RESOURCES);
        }
        let slot = slots.insert(Arc::new(handle));
        Ok(slot as HandleValue)
    }

    /// Look up a handle
    pub fn get(&self, value: HandleValue) -> RxResult<Arc<Handle>> {
        self.slots
            .lock()
            .get(value as usize)
            .cloned()
            .ok_or(RxStatus::ERR_BAD_HANDLE)
    }

    /// Remove a handle from the table and close it
    pub fn close(&self, value: HandleValue) -> RxResult<()> {
        let handle = self
            .slots
            .lock()
            .try_remove(value as usize)
            .ok_or(RxStatus::ERR_BAD_HANDLE)?;
        handle.release();
        Ok(())
    }

    /// Remove a handle from the table without closing it
    ///
    /// Used to move a handle into a message. References obtained earlier
    /// through [`get`](Self::get) stop accepting new registrations; waits
    /// already registered stay attached to the moved handle.
    pub fn take(&self, value: HandleValue) -> RxResult<Handle> {
        let handle = self
            .slots
            .lock()
            .try_remove(value as usize)
            .ok_or(RxStatus::ERR_BAD_HANDLE)?;
        handle.mark_closed();
        Ok(Handle {
            id: handle.id,
            object: handle.object.clone(),
            rights: handle.rights,
            closed: AtomicBool::new(false),
        })
    }

    /// Duplicate a handle in the table
    pub fn duplicate(&self, value: HandleValue, rights: Rights) -> RxResult<HandleValue> {
        let dup = self.get(value)?.duplicate(rights)?;
        self.add(dup)
    }

    /// Get handle count
    pub fn count(&self) -> usize {
        self.slots.lock().len()
    }

    /// Check if handle table is full
    pub fn is_full(&self) -> bool {
        Self::slots_full(&self.slots.lock())
    }

    fn slots_full(slots: &Slab<Arc<Handle>>) -> bool {
        slots.len() >= MAX_HANDLES_PER_TABLE
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::event::event_create;

    #[test]
    fn test_rights_basic() {
        let rights = Rights::READ | Rights::WRITE;

        assert!(rights.contains(Rights::READ));
        assert!(rights.contains(Rights::WRITE));
        assert!(!rights.contains(Rights::WAIT));
        assert_ne!(Rights::WAIT, Rights::SIGNAL);

        assert_eq!(rights & Rights::READ, Rights::READ);
    }

    #[test]
    fn test_rights_require() {
        let rights = Rights::READ | Rights::WRITE;

        assert!(rights.require(Rights::READ).is_ok());
        assert_eq!(rights.require(Rights::WAIT), Err(RxStatus::ERR_ACCESS_DENIED));
    }

    #[test]
    fn test_object_type() {
        assert_eq!(ObjectType::Channel as u32, 5);
        assert_eq!(ObjectType::Channel.name(), "channel");
        assert_eq!(Rights::default_for_type(ObjectType::Unknown), Rights::empty());
    }

    #[test]
    fn test_handle_basic() {
        let handle = event_create();

        assert_eq!(handle.object_type(), ObjectType::Event);
        assert!(handle.has_right(Rights::WAIT));
        assert!(handle.has_right(Rights::SIGNAL));
        assert_eq!(handle.object().handle_count(), 1);

        handle.close();
    }

    #[test]
    fn test_handle_duplicate() {
        let handle = event_create();
        let dup = handle.duplicate(Rights::SAME_RIGHTS).unwrap();

        assert_ne!(dup.id(), handle.id());
        assert_eq!(dup.rights(), handle.rights());
        assert_eq!(handle.object().handle_count(), 2);

        let reduced = handle.duplicate(Rights::WAIT).unwrap();
        assert_eq!(reduced.rights(), Rights::WAIT);
        assert_eq!(
            reduced.duplicate(Rights::SAME_RIGHTS).unwrap_err(),
            RxStatus::ERR_ACCESS_DENIED
        );
        assert_eq!(
            handle.duplicate(Rights::READ).unwrap_err(),
            RxStatus::ERR_INVALID_ARGS
        );

        reduced.close();
        dup.close();
        handle.close();
    }

    #[test]
    fn test_handle_close_last_marks_destroying() {
        let handle = event_create();
        let object = handle.object().clone();
        let dup = handle.duplicate(Rights::SAME_RIGHTS).unwrap();

        handle.close();
        assert!(!object.is_destroying());

        dup.close();
        assert_eq!(object.handle_count(), 0);
        assert!(object.is_destroying());
    }

    #[test]
    fn test_handle_owner() {
        let handle = event_create();
        let object = handle.object().clone();

        {
            let owner = HandleOwner::new(handle);
            assert_eq!(owner.get().object().handle_count(), 1);
        }

        assert_eq!(object.handle_count(), 0);
    }

    #[test]
    fn test_handle_owner_take() {
        let owner = HandleOwner::new(event_create());
        let handle = owner.take();
        assert_eq!(handle.object().handle_count(), 1);
        handle.close();
    }

    #[test]
    fn test_handle_table() {
        let table = HandleTable::new();
        assert_eq!(table.count(), 0);
        assert!(!table.is_full());

        let handle = event_create();
        let object = handle.object().clone();

        let value = table.add(handle).unwrap();
        assert_eq!(table.count(), 1);

        let retrieved = table.get(value).unwrap();
        assert_eq!(retrieved.object_type(), ObjectType::Event);

        table.close(value).unwrap();
        assert_eq!(table.count(), 0);
        assert_eq!(object.handle_count(), 0);
        assert_eq!(table.get(value).unwrap_err(), RxStatus::ERR_BAD_HANDLE);
        assert_eq!(table.close(value), Err(RxStatus::ERR_BAD_HANDLE));
    }

    #[test]
    fn test_handle_table_duplicate_and_take() {
        let table = HandleTable::new();
        let value = table.add(event_create()).unwrap();

        let dup_value = table.duplicate(value, Rights::SAME_RIGHTS).unwrap();
        assert_ne!(value, dup_value);
        assert_eq!(table.count(), 2);

        let taken = table.take(dup_value).unwrap();
        assert_eq!(table.count(), 1);
        assert_eq!(taken.object().handle_count(), 2);

        taken.close();
        table.close(value).unwrap();
    }

    #[test]
    fn test_handle_table_full_closes_rejected_handle() {
        let table = HandleTable::new();
        let first = event_create();
        let object = first.object().clone();
        table.add(first).unwrap();
        for _ in 1..MAX_HANDLES_PER_TABLE {
            table.duplicate(0, Rights::SAME_RIGHTS).unwrap();
        }
        assert!(table.is_full());
        assert_eq!(object.handle_count(), MAX_HANDLES_PER_TABLE);

        assert_eq!(
            table.duplicate(0, Rights::SAME_RIGHTS).unwrap_err(),
            RxStatus::ERR_NO_RESOURCES
        );
        assert_eq!(object.handle_count(), MAX_HANDLES_PER_TABLE);

        for value in 0..MAX_HANDLES_PER_TABLE {
            table.close(value as HandleValue).unwrap();
        }
        assert!(object.is_destroying());
    }

    #[test]
    fn test_closed_lookup_refuses_duplicate() {
        let table = HandleTable::new();
        let value = table.add(event_create()).unwrap();
        let keep = table.duplicate(value, Rights::SAME_RIGHTS).unwrap();

        let stale = table.get(value).unwrap();
        table.close(value).unwrap();
        assert!(stale.is_closed());
        assert_eq!(
            stale.duplicate(Rights::SAME_RIGHTS).unwrap_err(),
            RxStatus::ERR_BAD_HANDLE
        );

        let moved = table.get(keep).unwrap();
        let taken = table.take(keep).unwrap();
        assert!(moved.is_closed());
        assert!(!taken.is_closed());
        taken.close();
    }
}
