//! A first-in first-out queue.
//!
//! Holds the chunks waiting in the stream reader and the frames of a message
//! under reassembly. The queue owns its elements: popping hands ownership back
//! to the caller, dropping the queue drops whatever is left.
use std::collections::VecDeque;

/// Ordered FIFO of values.
#[derive(Debug, Clone)]
pub struct Queue<T> {
    items: VecDeque<T>,
}

impl<T> Queue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    /// Appends `value` at the tail.
    #[inline]
    pub fn push(&mut self, value: T) {
        self.items.push_back(value);
    }

    /// Returns the head without removing it.
    #[inline]
    pub fn peek(&self) -> Option<&T> {
        self.items.front()
    }

    /// Returns the head mutably without removing it.
    #[inline]
    pub fn peek_mut(&mut self) -> Option<&mut T> {
        self.items.front_mut()
    }

    /// Removes and returns the head.
    #[inline]
    pub fn shift(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates from head to tail.
    pub fn iter(&self) -> std::collections::vec_deque::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IntoIterator for Queue<T> {
    type Item = T;
    type IntoIter = std::collections::vec_deque::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Queue<T> {
    type Item = &'a T;
    type IntoIter = std::collections::vec_deque::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue = Queue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.peek(), None);
        assert_eq!(queue.shift(), None);

        queue.push(1);
        queue.push(2);
        queue.push(3);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.peek(), Some(&1));

        assert_eq!(queue.shift(), Some(1));
        assert_eq!(queue.shift(), Some(2));
        queue.push(4);
        assert_eq!(queue.iter().copied().collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(queue.into_iter().collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn test_peek_mut() {
        let mut queue = Queue::new();
        queue.push(String::from("a"));
        if let Some(head) = queue.peek_mut() {
            head.push('b');
        }
        assert_eq!(queue.peek().map(String::as_str), Some("ab"));
    }
}
