//! Lightweight identity hash table mapping graph nodes to integer handles.
//!
//! Handles are assigned in ascending order starting at 0, one per distinct
//! allocation, so a value written more than once is emitted once in full and
//! thereafter as a two-byte back-reference. Lookup is by reference identity
//! only: two equal but distinct instances receive distinct handles.
//!
//! The table is an entry array (handle -> identity token + pinned value +
//! next-candidate link) plus a hash spine (hashed token -> first candidate
//! handle). The spine doubles (+1) and is fully rehashed when the load factor
//! threshold is exceeded; `clear` resets the table in place without
//! releasing the backing storage, so an encoder can be reused across
//! sessions without reallocating.

use crate::value::Value;
use std::hash::Hasher;
use twox_hash::XxHash64;

const INITIAL_CAPACITY: usize = 16;
const LOAD_FACTOR: f32 = 0.75;

/// Hashes an identity token, masked non-negative like the original
/// identity-hash scheme.
fn hash_token(token: usize) -> usize {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write_usize(token);
    (hasher.finish() & 0x7FFF_FFFF) as usize
}

struct HandleEntry {
    /// Identity token of the pinned value.
    token: usize,
    /// Clone of the assigned value. Keeps the allocation (and therefore the
    /// token) alive for the whole session.
    value: Value,
    /// Next candidate handle in this spine chain, or -1.
    next: i32,
}

/// Identity-keyed handle table for the encode side.
pub struct HandleTable {
    /// Maps hashed token -> first candidate handle, -1 when empty.
    spine: Vec<i32>,
    /// Maps handle -> entry. `entries.len()` is the next available handle.
    entries: Vec<HandleEntry>,
    /// Entry count at which the spine is regrown.
    threshold: usize,
}

impl HandleTable {
    /// Creates an empty table with the default initial capacity.
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    /// Creates an empty table with the given spine capacity.
    pub fn with_capacity(initial_capacity: usize) -> Self {
        let capacity = initial_capacity.max(1);
        Self {
            spine: vec![-1; capacity],
            entries: Vec::with_capacity(capacity),
            threshold: (capacity as f32 * LOAD_FACTOR) as usize,
        }
    }

    /// Number of assigned handles.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no handles are assigned.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Assigns the next available handle to the value and returns it.
    ///
    /// The caller must have checked `lookup` first; assigning the same
    /// identity twice creates a second handle that `lookup` will never
    /// return.
    pub fn assign(&mut self, token: usize, value: Value) -> usize {
        if self.entries.len() >= self.threshold {
            self.grow_spine();
        }
        let handle = self.entries.len();
        let index = hash_token(token) % self.spine.len();
        self.entries.push(HandleEntry {
            token,
            value,
            next: self.spine[index],
        });
        self.spine[index] = handle as i32;
        handle
    }

    /// Looks up the handle previously assigned to this identity token.
    pub fn lookup(&self, token: usize) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        let index = hash_token(token) % self.spine.len();
        let mut candidate = self.spine[index];
        while candidate >= 0 {
            let entry = &self.entries[candidate as usize];
            if entry.token == token {
                return Some(candidate as usize);
            }
            candidate = entry.next;
        }
        None
    }

    /// Returns the value pinned for a handle.
    pub fn get(&self, handle: usize) -> Option<&Value> {
        self.entries.get(handle).map(|e| &e.value)
    }

    /// Resets the table in place. Backing storage capacity is retained.
    pub fn clear(&mut self) {
        self.spine.fill(-1);
        self.entries.clear();
    }

    /// Doubles (+1) the spine and reinserts every entry.
    fn grow_spine(&mut self) {
        let new_len = (self.spine.len() << 1) + 1;
        self.spine = vec![-1; new_len];
        self.threshold = (new_len as f32 * LOAD_FACTOR) as usize;
        for handle in 0..self.entries.len() {
            let index = hash_token(self.entries[handle].token) % new_len;
            self.entries[handle].next = self.spine[index];
            self.spine[index] = handle as i32;
        }
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}
