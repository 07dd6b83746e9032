// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Byte-budgeted storage with least-recently-used eviction.
//!
//! A [`Store`] keeps entries in recency order and charges each one
//! `key.len() + value.weight()` bytes against an optional budget. Inserting past the
//! budget evicts from the least-recently-used end until the charge fits again.
//!
//! The store is not internally synchronized; callers wrap it in their own exclusion
//! (the group's cache holds one behind a mutex).
//!
//! # Examples
//!
//! ```
//! use hoard::ByteView;
//! use hoard::store::Store;
//!
//! let mut store = Store::new(20);
//! store.insert("aaa", ByteView::copied_from_slice(b"1"));
//! store.insert("bbb", ByteView::copied_from_slice(b"22"));
//! assert_eq!(store.len(), 2);
//! assert_eq!(store.used_bytes(), 9);
//! ```

use std::collections::HashMap;

/// A byte charge for values stored in a [`Store`].
pub trait Weigh {
    /// The number of bytes this value is charged against the store budget.
    fn weight(&self) -> u64;
}

/// Hook invoked with each entry evicted by budget pressure.
pub type EvictionHook<V> = Box<dyn FnMut(&str, &V) + Send>;

/// Index marker for "no slot".
const NIL: usize = usize::MAX;

struct Slot<V> {
    key: String,
    value: V,
    prev: usize,
    next: usize,
}

/// An ordered key/value store with byte-budgeted LRU eviction.
///
/// Both lookups and insertions promote the touched entry to the most-recently-used
/// end; a budget of 0 disables eviction entirely.
pub struct Store<V> {
    max_bytes: u64,
    used_bytes: u64,
    /// Arena for the recency list; `free` recycles vacated positions.
    slots: Vec<Option<Slot<V>>>,
    free: Vec<usize>,
    /// Most-recently-used end of the recency list.
    head: usize,
    /// Least-recently-used end of the recency list.
    tail: usize,
    index: HashMap<String, usize>,
    on_evict: Option<EvictionHook<V>>,
}

impl<V: Weigh> Store<V> {
    /// Creates a store that evicts past `max_bytes` of charge; 0 means unbounded.
    #[must_use]
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            used_bytes: 0,
            slots: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            index: HashMap::new(),
            on_evict: None,
        }
    }

    /// Creates a store that reports each eviction to `hook`.
    #[must_use]
    pub fn with_eviction_hook(max_bytes: u64, hook: EvictionHook<V>) -> Self {
        Self {
            on_evict: Some(hook),
            ..Self::new(max_bytes)
        }
    }

    /// Looks up `key`, promoting the entry to most-recently-used on a hit.
    ///
    /// A miss does not perturb the recency order.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let idx = *self.index.get(key)?;
        self.promote(idx);
        self.slots[idx].as_ref().map(|slot| &slot.value)
    }

    /// Inserts or replaces `key`, promotes it, and then evicts while over budget.
    ///
    /// Replacement adjusts the charge by the difference of the value weights; a fresh
    /// entry is charged `key.len() + value.weight()`.
    pub fn insert(&mut self, key: &str, value: V) {
        match self.index.get(key).copied() {
            Some(idx) => {
                let slot = self.slots[idx].as_mut().expect("indexed slot is occupied");
                let old_weight = slot.value.weight();
                let new_weight = value.weight();
                slot.value = value;
                self.used_bytes = self.used_bytes - old_weight + new_weight;
                self.promote(idx);
            }
            None => {
                let weight = value.weight();
                let idx = self.alloc(Slot {
                    key: key.to_owned(),
                    value,
                    prev: NIL,
                    next: NIL,
                });
                self.link_front(idx);
                self.index.insert(key.to_owned(), idx);
                self.used_bytes += key.len() as u64 + weight;
            }
        }

        while self.max_bytes > 0 && self.used_bytes > self.max_bytes {
            self.remove_oldest();
        }
    }

    /// Evicts the least-recently-used entry, if any, and fires the eviction hook.
    pub fn remove_oldest(&mut self) {
        if self.tail == NIL {
            return;
        }
        let idx = self.tail;
        self.unlink(idx);
        let slot = self.slots[idx].take().expect("tail slot is occupied");
        self.free.push(idx);
        self.index.remove(&slot.key);
        self.used_bytes -= slot.key.len() as u64 + slot.value.weight();
        if let Some(hook) = self.on_evict.as_mut() {
            hook(&slot.key, &slot.value);
        }
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns the current byte charge.
    #[must_use]
    pub fn used_bytes(&self) -> u64 {
        self.used_bytes
    }

    /// Returns the byte budget; 0 means unbounded.
    #[must_use]
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    fn alloc(&mut self, slot: Slot<V>) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(slot);
                idx
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        }
    }

    /// Moves an existing entry to the most-recently-used end.
    fn promote(&mut self, idx: usize) {
        if self.head == idx {
            return;
        }
        self.unlink(idx);
        self.link_front(idx);
    }

    fn link_front(&mut self, idx: usize) {
        let head = self.head;
        {
            let slot = self.slots[idx].as_mut().expect("linked slot is occupied");
            slot.prev = NIL;
            slot.next = head;
        }
        if head != NIL {
            self.slots[head].as_mut().expect("head slot is occupied").prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let slot = self.slots[idx].as_ref().expect("unlinked slot is occupied");
            (slot.prev, slot.next)
        };
        if prev == NIL {
            self.head = next;
        } else {
            self.slots[prev].as_mut().expect("prev slot is occupied").next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.slots[next].as_mut().expect("next slot is occupied").prev = prev;
        }
    }
}

impl<V> std::fmt::Debug for Store<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("max_bytes", &self.max_bytes)
            .field("used_bytes", &self.used_bytes)
            .field("len", &self.index.len())
            .finish_non_exhaustive()
    }
}
