//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for cache eviction.

use std::collections::HashMap;

/// Index into the node arena.
type NodeIndex = usize;

/// Sentinel for a missing link.
const NIL: NodeIndex = usize::MAX;

#[derive(Debug)]
struct Node {
    key: String,
    /// Neighbour closer to the front (more recently used)
    prev: NodeIndex,
    /// Neighbour closer to the back (less recently used)
    next: NodeIndex,
}

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Keys live in an arena-backed doubly linked list indexed by a hash map:
/// - Front = Most recently used
/// - Back = Least recently used
///
/// `touch`, `remove` and `evict_oldest` are all O(1). Freed slots are reused
/// through a free list.
#[derive(Debug)]
pub struct LruTracker {
    nodes: Vec<Node>,
    free: Vec<NodeIndex>,
    index: HashMap<String, NodeIndex>,
    head: NodeIndex,
    tail: NodeIndex,
}

impl Default for LruTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: NIL,
            tail: NIL,
        }
    }

    // == Touch ==
    /// Marks a key as recently used (moves to front).
    ///
    /// If key exists, unlinks it then relinks it at the front.
    /// If key is new, allocates a node at the front.
    pub fn touch(&mut self, key: &str) {
        if let Some(&idx) = self.index.get(key) {
            if self.head != idx {
                self.unlink(idx);
                self.push_front(idx);
            }
            return;
        }

        let node = Node {
            key: key.to_string(),
            prev: NIL,
            next: NIL,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = node;
                idx
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };
        self.index.insert(key.to_string(), idx);
        self.push_front(idx);
    }

    // == Remove ==
    /// Removes a key from the tracker. Returns false if it was not tracked.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.index.remove(key) {
            Some(idx) => {
                self.release(idx);
                true
            }
            None => false,
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<String> {
        if self.tail == NIL {
            return None;
        }
        let idx = self.tail;
        let key = std::mem::take(&mut self.nodes[idx].key);
        self.index.remove(&key);
        self.release(idx);
        Some(key)
    }

    /// Iterates keys from most to least recently used.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            if cursor == NIL {
                return None;
            }
            let node = &self.nodes[cursor];
            cursor = node.next;
            Some(node.key.as_str())
        })
    }

    /// Forgets every tracked key.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.index.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Checks if a key is being tracked.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    // == Linked List Plumbing ==
    fn push_front(&mut self, idx: NodeIndex) {
        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = self.head;
        if self.head != NIL {
            self.nodes[self.head].prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }

    fn unlink(&mut self, idx: NodeIndex) {
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);

        if prev != NIL {
            self.nodes[prev].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.nodes[next].prev = prev;
        } else {
            self.tail = prev;
        }

        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = NIL;
    }

    fn release(&mut self, idx: NodeIndex) {
        self.unlink(idx);
        self.nodes[idx].key.clear();
        self.free.push(idx);
    }
}
