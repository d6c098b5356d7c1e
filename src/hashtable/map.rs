//! Progressive-resizing hash index
//!
//! Two table generations exist only while a resize is in flight. Every
//! operation moves a bounded batch of entries from the older generation to
//! the newer one, so growing the table never stalls a single call.

use super::table::{Node, Table};
use super::Hashed;
use std::mem;
use tracing::debug;

/// Capacity of the first allocated table
pub const INITIAL_CAPACITY: usize = 4;

/// Average chain length that triggers a resize
pub const MAX_LOAD_FACTOR: usize = 8;

/// Maximum number of entries moved by one migration step
pub const MIGRATION_QUOTA: usize = 128;

enum State<T> {
    /// One generation; may still be unallocated
    Steady(Table<T>),

    /// Resize in progress: `older` drains into `newer` starting at `cursor`
    Migrating {
        newer: Table<T>,
        older: Table<T>,
        cursor: usize,
    },
}

/// Chained hash index with incremental resizing
pub struct HashIndex<T> {
    state: State<T>,

    /// Entries moved by the most recent migration step
    last_migration_work: usize,
}

impl<T: Hashed> HashIndex<T> {
    pub fn new() -> Self {
        HashIndex {
            state: State::Steady(Table::unallocated()),
            last_migration_work: 0,
        }
    }

    /// Number of live entries across both generations
    pub fn len(&self) -> usize {
        match &self.state {
            State::Steady(table) => table.len(),
            State::Migrating { newer, older, .. } => newer.len() + older.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether an older generation is still being drained
    pub fn is_resizing(&self) -> bool {
        matches!(self.state, State::Migrating { .. })
    }

    /// Bucket count of the generation receiving inserts
    pub fn capacity(&self) -> usize {
        match &self.state {
            State::Steady(table) => table.capacity(),
            State::Migrating { newer, .. } => newer.capacity(),
        }
    }

    /// Entries moved by the most recent operation's migration step
    pub fn last_migration_work(&self) -> usize {
        self.last_migration_work
    }

    /// Insert an entry; duplicates are not checked
    pub fn insert(&mut self, item: T) {
        let node = Box::new(Node { item, next: None });

        match &mut self.state {
            State::Steady(table) => {
                if !table.is_allocated() {
                    *table = Table::with_capacity(INITIAL_CAPACITY);
                }
                table.insert_node(node);

                if table.load_factor() >= MAX_LOAD_FACTOR {
                    self.start_resizing();
                }
            }
            State::Migrating { newer, .. } => newer.insert_node(node),
        }

        self.help_resizing();
    }

    pub fn lookup<F>(&mut self, hash: u64, eq: F) -> Option<&T>
    where
        F: Fn(&T) -> bool,
    {
        self.help_resizing();

        match &self.state {
            State::Steady(table) => table.find(hash, eq),
            State::Migrating { newer, older, .. } => {
                newer.find(hash, &eq).or_else(|| older.find(hash, &eq))
            }
        }
    }

    pub fn lookup_mut<F>(&mut self, hash: u64, eq: F) -> Option<&mut T>
    where
        F: Fn(&T) -> bool,
    {
        self.help_resizing();

        match &mut self.state {
            State::Steady(table) => table.find_mut(hash, eq),
            State::Migrating { newer, older, .. } => {
                match newer.find_mut(hash, &eq) {
                    Some(item) => Some(item),
                    None => older.find_mut(hash, &eq),
                }
            }
        }
    }

    /// Detach the matching entry from whichever generation holds it
    pub fn remove<F>(&mut self, hash: u64, eq: F) -> Option<T>
    where
        F: Fn(&T) -> bool,
    {
        self.help_resizing();

        match &mut self.state {
            State::Steady(table) => table.detach(hash, eq),
            State::Migrating { newer, older, .. } => newer
                .detach(hash, &eq)
                .or_else(|| older.detach(hash, &eq)),
        }
    }

    fn start_resizing(&mut self) {
        let state = mem::replace(&mut self.state, State::Steady(Table::unallocated()));

        self.state = match state {
            State::Steady(older) => {
                let capacity = older.capacity() * 2;
                debug!(
                    "Starting progressive resize: {} entries, {} -> {} buckets",
                    older.len(),
                    older.capacity(),
                    capacity
                );
                State::Migrating {
                    newer: Table::with_capacity(capacity),
                    older,
                    cursor: 0,
                }
            }
            // Only one resize at a time
            migrating => migrating,
        };
    }

    /// Move up to `MIGRATION_QUOTA` entries from the older generation
    fn help_resizing(&mut self) {
        let State::Migrating { newer, older, cursor } = &mut self.state else {
            self.last_migration_work = 0;
            return;
        };

        let mut moved = 0;
        while moved < MIGRATION_QUOTA && older.len() > 0 {
            // Empty buckets are skipped without counting as work
            match older.pop_bucket(*cursor) {
                Some(node) => {
                    newer.insert_node(node);
                    moved += 1;
                }
                None => *cursor += 1,
            }
        }
        self.last_migration_work = moved;

        if older.len() == 0 {
            let newer = mem::replace(newer, Table::unallocated());
            debug!("Progressive resize finished: {} buckets", newer.capacity());
            self.state = State::Steady(newer);
        }
    }

    #[cfg(test)]
    fn is_consistent(&self) -> bool {
        match &self.state {
            State::Steady(table) => table.is_consistent(),
            State::Migrating { newer, older, .. } => {
                newer.is_consistent() && older.is_consistent() && older.len() > 0
            }
        }
    }
}

impl<T: Hashed> Default for HashIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}
