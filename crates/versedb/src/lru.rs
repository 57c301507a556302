//! Byte-budgeted LRU read cache for the log store
//!
//! Slots live in a `Vec` and are linked by index, so promotion and eviction
//! are O(1). Capacity is measured in bytes (key + value), not entries.

use std::collections::HashMap;
use std::sync::Arc;

use ahash::RandomState;

struct Slot {
    key: String,
    value: Arc<[u8]>,
    prev: Option<usize>,
    next: Option<usize>,
}

impl Slot {
    fn weight(&self) -> usize {
        self.key.len() + self.value.len()
    }
}

/// LRU cache of raw values bounded by total byte weight
pub struct ByteLru {
    map: HashMap<String, usize, RandomState>,
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    budget: usize,
    used: usize,
}

impl ByteLru {
    /// Create a cache holding at most `budget` bytes. A zero budget caches nothing.
    pub fn new(budget: usize) -> Self {
        Self {
            map: HashMap::with_hasher(RandomState::new()),
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            budget,
            used: 0,
        }
    }

    /// Look up a value and mark it most recently used
    pub fn get(&mut self, key: &str) -> Option<Arc<[u8]>> {
        let idx = *self.map.get(key)?;
        self.promote(idx);
        self.slots[idx].as_ref().map(|slot| Arc::clone(&slot.value))
    }

    /// Insert or replace a value, evicting from the tail until it fits
    pub fn insert(&mut self, key: &str, value: Arc<[u8]>) {
        self.remove(key);

        let weight = key.len() + value.len();
        if weight > self.budget {
            return;
        }
        while self.used + weight > self.budget {
            if !self.evict_tail() {
                break;
            }
        }

        let idx = match self.free.pop() {
            Some(idx) => idx,
            None => {
                self.slots.push(None);
                self.slots.len() - 1
            }
        };
        self.slots[idx] = Some(Slot {
            key: key.to_string(),
            value,
            prev: None,
            next: self.head,
        });
        if let Some(head) = self.head.and_then(|h| self.slots[h].as_mut()) {
            head.prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }

        self.used += weight;
        self.map.insert(key.to_string(), idx);
    }

    /// Drop a key if cached
    pub fn remove(&mut self, key: &str) {
        if let Some(idx) = self.map.remove(key) {
            self.unlink(idx);
            if let Some(slot) = self.slots[idx].take() {
                self.used -= slot.weight();
            }
            self.free.push(idx);
        }
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.map.clear();
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.used = 0;
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Bytes currently held
    pub fn used_bytes(&self) -> usize {
        self.used
    }

    fn evict_tail(&mut self) -> bool {
        let Some(tail) = self.tail else {
            return false;
        };
        let key = match &self.slots[tail] {
            Some(slot) => slot.key.clone(),
            None => return false,
        };
        self.remove(&key);
        true
    }

    fn promote(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }

        self.unlink(idx);
        let old_head = self.head;
        if let Some(slot) = self.slots[idx].as_mut() {
            slot.prev = None;
            slot.next = old_head;
        }
        if let Some(head) = old_head.and_then(|h| self.slots[h].as_mut()) {
            head.prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match &self.slots[idx] {
            Some(slot) => (slot.prev, slot.next),
            None => return,
        };

        match prev.and_then(|p| self.slots[p].as_mut()) {
            Some(prev_slot) => prev_slot.next = next,
            None => self.head = next,
        }
        match next.and_then(|n| self.slots[n].as_mut()) {
            Some(next_slot) => next_slot.prev = prev,
            None => self.tail = prev,
        }

        if let Some(slot) = self.slots[idx].as_mut() {
            slot.prev = None;
            slot.next = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(s: &str) -> Arc<[u8]> {
        Arc::from(s.as_bytes())
    }

    #[test]
    fn test_lru_basic() {
        let mut lru = ByteLru::new(64);
        lru.insert("a", bytes("alpha"));
        lru.insert("b", bytes("beta"));

        assert_eq!(lru.get("a").as_deref(), Some(&b"alpha"[..]));
        assert_eq!(lru.get("b").as_deref(), Some(&b"beta"[..]));
        assert_eq!(lru.len(), 2);
        assert_eq!(lru.used_bytes(), 1 + 5 + 1 + 4);
    }

    #[test]
    fn test_lru_evicts_least_recent_by_bytes() {
        // each entry weighs 1 + 9 = 10 bytes
        let mut lru = ByteLru::new(25);
        lru.insert("a", bytes("123456789"));
        lru.insert("b", bytes("123456789"));
        lru.get("a");
        lru.insert("c", bytes("123456789"));

        assert!(lru.get("b").is_none());
        assert!(lru.get("a").is_some());
        assert!(lru.get("c").is_some());
        assert_eq!(lru.used_bytes(), 20);
    }

    #[test]
    fn test_lru_skips_oversized_values() {
        let mut lru = ByteLru::new(8);
        lru.insert("k", bytes("way too large for the budget"));

        assert!(lru.is_empty());
        assert_eq!(lru.used_bytes(), 0);
    }

    #[test]
    fn test_lru_replace_adjusts_weight() {
        let mut lru = ByteLru::new(64);
        lru.insert("k", bytes("short"));
        lru.insert("k", bytes("a bit longer"));

        assert_eq!(lru.len(), 1);
        assert_eq!(lru.used_bytes(), 1 + 12);
        assert_eq!(lru.get("k").as_deref(), Some(&b"a bit longer"[..]));
    }

    #[test]
    fn test_lru_remove_and_clear() {
        let mut lru = ByteLru::new(64);
        lru.insert("a", bytes("1"));
        lru.insert("b", bytes("2"));
        lru.remove("a");

        assert!(lru.get("a").is_none());
        assert_eq!(lru.len(), 1);

        lru.clear();
        assert!(lru.is_empty());
        assert_eq!(lru.used_bytes(), 0);
    }

    #[test]
    fn test_lru_zero_budget() {
        let mut lru = ByteLru::new(0);
        lru.insert("a", bytes("1"));
        assert!(lru.get("a").is_none());
    }
}
