//! A single fixed-size generation of the chained hash table

use super::Hashed;

/// Link to the next node of a bucket chain
pub(crate) type Link<T> = Option<Box<Node<T>>>;

/// Chain node: owns its payload and the rest of the chain
pub(crate) struct Node<T> {
    pub(crate) item: T,
    pub(crate) next: Link<T>,
}

/// Fixed-capacity table of bucket chains
///
/// Capacity is always a power of two so that a bucket index is `hash & mask`.
/// A table with zero capacity is "unallocated" and holds nothing.
pub(crate) struct Table<T> {
    slots: Box<[Link<T>]>,
    mask: usize,
    len: usize,
}

impl<T: Hashed> Table<T> {
    /// A table that owns no bucket storage yet
    pub(crate) fn unallocated() -> Self {
        Table {
            slots: Box::new([]),
            mask: 0,
            len: 0,
        }
    }

    /// Allocate `capacity` empty buckets (must be a power of two)
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        assert!(capacity.is_power_of_two(), "table capacity must be a power of two");

        Table {
            slots: (0..capacity).map(|_| None).collect(),
            mask: capacity - 1,
            len: 0,
        }
    }

    pub(crate) fn is_allocated(&self) -> bool {
        !self.slots.is_empty()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Average chain length, rounded down
    pub(crate) fn load_factor(&self) -> usize {
        if self.slots.is_empty() {
            return 0;
        }
        self.len / self.slots.len()
    }

    fn bucket(&self, hash: u64) -> usize {
        (hash as usize) & self.mask
    }

    /// Prepend a node to its bucket chain
    pub(crate) fn insert_node(&mut self, mut node: Box<Node<T>>) {
        let pos = self.bucket(node.item.hash_code());
        node.next = self.slots[pos].take();
        self.slots[pos] = Some(node);
        self.len += 1;
    }

    pub(crate) fn find<F>(&self, hash: u64, eq: F) -> Option<&T>
    where
        F: Fn(&T) -> bool,
    {
        if !self.is_allocated() {
            return None;
        }

        let mut cur = self.slots[self.bucket(hash)].as_deref();
        while let Some(node) = cur {
            if node.item.hash_code() == hash && eq(&node.item) {
                return Some(&node.item);
            }
            cur = node.next.as_deref();
        }
        None
    }

    pub(crate) fn find_mut<F>(&mut self, hash: u64, eq: F) -> Option<&mut T>
    where
        F: Fn(&T) -> bool,
    {
        if !self.is_allocated() {
            return None;
        }

        let pos = self.bucket(hash);
        let mut cur = self.slots[pos].as_deref_mut();
        while let Some(node) = cur {
            if node.item.hash_code() == hash && eq(&node.item) {
                return Some(&mut node.item);
            }
            cur = node.next.as_deref_mut();
        }
        None
    }

    /// Unlink the matching node from its chain and hand back its payload
    pub(crate) fn detach<F>(&mut self, hash: u64, eq: F) -> Option<T>
    where
        F: Fn(&T) -> bool,
    {
        if !self.is_allocated() {
            return None;
        }

        let pos = self.bucket(hash);
        let mut link = &mut self.slots[pos];
        while link
            .as_ref()
            .is_some_and(|node| !(node.item.hash_code() == hash && eq(&node.item)))
        {
            link = &mut link.as_mut()?.next;
        }

        let mut node = link.take()?;
        *link = node.next.take();
        self.len -= 1;
        Some(node.item)
    }

    /// Pop the head node of bucket `pos`, if any
    pub(crate) fn pop_bucket(&mut self, pos: usize) -> Option<Box<Node<T>>> {
        let mut node = self.slots[pos].take()?;
        self.slots[pos] = node.next.take();
        self.len -= 1;
        Some(node)
    }

    /// Check that every node sits in the bucket its hash selects
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        let mut count = 0;
        for (pos, slot) in self.slots.iter().enumerate() {
            let mut cur = slot.as_deref();
            while let Some(node) = cur {
                if self.bucket(node.item.hash_code()) != pos {
                    return false;
                }
                count += 1;
                cur = node.next.as_deref();
            }
        }
        count == self.len
    }
}

impl<T> Drop for Table<T> {
    fn drop(&mut self) {
        // Unroll chains so long buckets don't recurse through Box drops
        for slot in self.slots.iter_mut() {
            let mut cur = slot.take();
            while let Some(mut node) = cur {
                cur = node.next.take();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item(u64, &'static str);

    impl Hashed for Item {
        fn hash_code(&self) -> u64 {
            self.0
        }
    }

    fn node(hash: u64, name: &'static str) -> Box<Node<Item>> {
        Box::new(Node { item: Item(hash, name), next: None })
    }

    #[test]
    fn test_unallocated_table_finds_nothing() {
        let mut table: Table<Item> = Table::unallocated();
        assert!(!table.is_allocated());
        assert!(table.find(1, |_| true).is_none());
        assert!(table.detach(1, |_| true).is_none());
        assert_eq!(table.load_factor(), 0);
    }

    #[test]
    fn test_same_bucket_chain() {
        let mut table = Table::with_capacity(4);
        table.insert_node(node(1, "a"));
        table.insert_node(node(5, "b"));
        table.insert_node(node(9, "c"));

        assert_eq!(table.len(), 3);
        assert!(table.is_consistent());
        assert_eq!(table.find(5, |i| i.1 == "b").map(|i| i.1), Some("b"));

        // Detach from the middle of the chain
        assert_eq!(table.detach(5, |i| i.1 == "b").map(|i| i.1), Some("b"));
        assert_eq!(table.len(), 2);
        assert!(table.find(5, |_| true).is_none());
        assert!(table.find(1, |_| true).is_some());
        assert!(table.find(9, |_| true).is_some());
        assert!(table.is_consistent());
    }

    #[test]
    fn test_hash_must_match_exactly() {
        let mut table = Table::with_capacity(4);
        table.insert_node(node(3, "x"));

        // Same bucket, different hash: predicate alone is not enough
        assert!(table.find(7, |_| true).is_none());
        assert!(table.find_mut(3, |_| true).is_some());
    }

    #[test]
    fn test_pop_bucket() {
        let mut table = Table::with_capacity(2);
        table.insert_node(node(0, "a"));
        table.insert_node(node(2, "b"));

        assert_eq!(table.pop_bucket(0).map(|n| n.item.1), Some("b"));
        assert_eq!(table.pop_bucket(0).map(|n| n.item.1), Some("a"));
        assert!(table.pop_bucket(0).is_none());
        assert_eq!(table.len(), 0);
    }
}
