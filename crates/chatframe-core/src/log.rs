//! Bounded message log — append-only, oldest entry evicted on overflow.

use std::collections::VecDeque;

use crate::types::Message;

/// Default number of messages kept in memory.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Ordered message buffer that never holds more than `capacity` entries.
#[derive(Debug, Clone)]
pub struct BoundedLog {
    messages: VecDeque<Message>,
    capacity: usize,
}

impl BoundedLog {
    /// A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a message, evicting the oldest first when full.
    /// Returns the evicted message, if any.
    pub fn push(&mut self, msg: Message) -> Option<Message> {
        let evicted = if self.messages.len() >= self.capacity {
            self.messages.pop_front()
        } else {
            None
        };
        self.messages.push_back(msg);
        evicted
    }

    /// Replace the whole contents, keeping only the last `capacity` entries.
    pub fn replace(&mut self, snapshot: Vec<Message>) {
        let skip = snapshot.len().saturating_sub(self.capacity);
        self.messages.clear();
        self.messages.extend(snapshot.into_iter().skip(skip));
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Message> + ExactSizeIterator {
        self.messages.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn to_vec(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }
}

impl Default for BoundedLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
