//! Ringbuffer module for bounded snapshot history.
//!
//! A fixed-capacity circular buffer with predictable memory usage. Once full,
//! every push overwrites the oldest entry.

/// A circular buffer with fixed capacity.
#[derive(Debug, Clone)]
pub struct Ringbuffer<T> {
    entries: Vec<Option<T>>,
    capacity: usize,
    write_index: usize,
    count: usize,
}

impl<T: Clone> Ringbuffer<T> {
    /// Creates a new ringbuffer with the specified capacity (at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut entries = Vec::with_capacity(capacity);
        entries.resize_with(capacity, || None);

        Self {
            entries,
            capacity,
            write_index: 0,
            count: 0,
        }
    }

    /// Pushes a new entry into the ringbuffer.
    ///
    /// If the buffer is full, the oldest entry will be overwritten.
    pub fn push(&mut self, entry: T) {
        self.entries[self.write_index] = Some(entry);
        self.write_index = (self.write_index + 1) % self.capacity;

        if self.count < self.capacity {
            self.count += 1;
        }
    }

    /// Returns all entries in chronological order (oldest to newest).
    pub fn get_history(&self) -> Vec<T> {
        if self.count == 0 {
            return Vec::new();
        }

        let mut result = Vec::with_capacity(self.count);

        if self.count < self.capacity {
            result.extend(self.entries[0..self.count].iter().flatten().cloned());
        } else {
            // Full: oldest entry sits at write_index
            result.extend(self.entries[self.write_index..].iter().flatten().cloned());
            result.extend(self.entries[0..self.write_index].iter().flatten().cloned());
        }

        result
    }

    /// Most recently pushed entry.
    pub fn latest(&self) -> Option<&T> {
        if self.count == 0 {
            return None;
        }
        let idx = (self.write_index + self.capacity - 1) % self.capacity;
        self.entries[idx].as_ref()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
