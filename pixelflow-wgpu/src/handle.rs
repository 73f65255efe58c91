//! Slab of GPU resources addressed by the opaque u64 handles handed to
//! the platform-independent core.

use std::collections::HashMap;

pub struct HandleStore<T> {
    items: HashMap<u64, T>,
    next: u64,
}

impl<T> Default for HandleStore<T> {
    fn default() -> Self {
        Self {
            items: HashMap::new(),
            next: 0,
        }
    }
}

impl<T> HandleStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: T) -> u64 {
        self.next += 1;
        self.items.insert(self.next, item);
        self.next
    }

    pub fn get(&self, handle: u64) -> Option<&T> {
        self.items.get(&handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_assigns_distinct_handles() {
        let mut store = HandleStore::new();
        let a = store.insert("a");
        let b = store.insert("b");
        assert_ne!(a, b);
        assert_eq!(store.get(a), Some(&"a"));
        assert_eq!(store.get(b), Some(&"b"));
    }

    #[test]
    fn test_zero_is_never_a_valid_handle() {
        let mut store = HandleStore::new();
        store.insert(1);
        assert_eq!(store.get(0), None);
    }
}
