// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Index-linked lists
//!
//! Wait queues and packet queues need O(1) unlink from the middle and the
//! ability to move a node from one list to another without reallocating.
//! Nodes live in one [`IndexArena`] and are addressed by [`NodeId`]; each
//! [`ListHead`] threads a doubly-linked list through the arena by index.
//!
//! # Invariants
//!
//! - A node is on at most one list at a time. Linking an already linked
//!   node, or unlinking a node from a list it is not on, is a bookkeeping
//!   corruption and panics.
//! - A node must be unlinked before it is removed from the arena.

use alloc::vec::Vec;
use slab::Slab;

/// Stable index of a node in an [`IndexArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Raw slot index
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Head of one list threaded through an arena
#[derive(Debug)]
pub struct ListHead {
    tag: u32,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl ListHead {
    /// Number of linked nodes
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True when no node is linked
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

struct Node<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
    /// Tag of the list this node is linked on
    owner: Option<u32>,
}

/// Arena of list nodes
pub struct IndexArena<T> {
    nodes: Slab<Node<T>>,
    next_tag: u32,
}

impl<T> Default for IndexArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IndexArena<T> {
    /// Create an empty arena
    pub fn new() -> Self {
        Self {
            nodes: Slab::new(),
            next_tag: 1,
        }
    }

    /// Create a new, empty list head bound to this arena
    pub fn new_list(&mut self) -> ListHead {
        let tag = self.next_tag;
        self.next_tag = self.next_tag.wrapping_add(1);
        ListHead {
            tag,
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Number of live nodes, linked or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the arena holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Store a value as an unlinked node
    pub fn insert(&mut self, value: T) -> NodeId {
        NodeId(self.nodes.insert(Node {
            value,
            prev: None,
            next: None,
            owner: None,
        }))
    }

    /// Remove an unlinked node and return its value
    pub fn remove(&mut self, id: NodeId) -> T {
        assert!(
            self.nodes[id.0].owner.is_none(),
            "list: removing node {} while still linked",
            id.0
        );
        self.nodes.remove(id.0).value
    }

    /// Shared access to a node's value
    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.nodes.get(id.0).map(|node| &node.value)
    }

    /// Exclusive access to a node's value
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.nodes.get_mut(id.0).map(|node| &mut node.value)
    }

    /// True if the node is on any list
    pub fn is_linked(&self, id: NodeId) -> bool {
        self.nodes[id.0].owner.is_some()
    }

    /// True if the node is on `list`
    pub fn is_on(&self, list: &ListHead, id: NodeId) -> bool {
        self.nodes[id.0].owner == Some(list.tag)
    }

    /// Append a node to the tail of `list`
    pub fn push_back(&mut self, list: &mut ListHead, id: NodeId) {
        let old_tail = list.tail;
        {
            let node = &mut self.nodes[id.0];
            assert!(node.owner.is_none(), "list: node {} linked twice", id.0);
            node.owner = Some(list.tag);
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(tail) => self.nodes[tail].next = Some(id.0),
            None => list.head = Some(id.0),
        }
        list.tail = Some(id.0);
        list.len += 1;
    }

    /// First node of `list`
    pub fn front(&self, list: &ListHead) -> Option<NodeId> {
        list.head.map(NodeId)
    }

    /// Unlink and return the first node of `list`
    pub fn pop_front(&mut self, list: &mut ListHead) -> Option<NodeId> {
        let id = self.front(list)?;
        self.unlink(list, id);
        Some(id)
    }

    /// Unlink a node from `list`
    pub fn unlink(&mut self, list: &mut ListHead, id: NodeId) {
        let (prev, next) = {
            let node = &mut self.nodes[id.0];
            assert!(
                node.owner == Some(list.tag),
                "list: node {} is not on this list",
                id.0
            );
            node.owner = None;
            (node.prev.take(), node.next.take())
        };
        match prev {
            Some(prev) => self.nodes[prev].next = next,
            None => list.head = next,
        }
        match next {
            Some(next) => self.nodes[next].prev = prev,
            None => list.tail = prev,
        }
        list.len -= 1;
    }

    /// Node ids of `list` in order
    pub fn ids(&self, list: &ListHead) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(list.len);
        let mut cursor = list.head;
        while let Some(index) = cursor {
            ids.push(NodeId(index));
            cursor = self.nodes[index].next;
        }
        ids
    }
}

// ============================================================================
// Tests
// ============================================================================
