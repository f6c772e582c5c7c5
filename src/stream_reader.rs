//! # StreamReader
//!
//! Buffers the chunks handed to the parser and serves exact-length reads that
//! may span several of them.
//!
//! Reads are all-or-nothing: a read of `n` bytes either consumes exactly `n`
//! bytes or, when fewer than `n` are buffered, consumes nothing and leaves the
//! reader untouched. That is what lets the parser stop in the middle of a frame
//! and pick up again on the next call.
use crate::{chunk::Chunk, queue::Queue};

/// Upper bound on the number of unread bytes the reader will hold, 0xfffffff (~256 MiB).
///
/// A peer that keeps sending while the parser cannot make progress is cut off here.
pub const MAX_READ_BUFFER: usize = 0xfffffff;

/// Accumulates pushed chunks and serves reads across chunk boundaries.
#[derive(Debug)]
pub struct StreamReader {
    queue: Queue<Chunk>,
    /// Unread bytes across all queued chunks.
    capacity: usize,
    /// Bytes already consumed from the head chunk.
    cursor: usize,
    max_capacity: usize,
}

impl StreamReader {
    pub fn new() -> Self {
        Self::with_max_capacity(MAX_READ_BUFFER)
    }

    /// Creates a reader that refuses to buffer more than `max_capacity` unread bytes.
    pub fn with_max_capacity(max_capacity: usize) -> Self {
        Self {
            queue: Queue::new(),
            capacity: 0,
            cursor: 0,
            max_capacity,
        }
    }

    /// Queues a chunk.
    ///
    /// Returns `false`, leaving the reader unchanged, if the chunk would take the
    /// buffered total over the configured maximum. Empty chunks are accepted and
    /// dropped.
    pub fn push(&mut self, chunk: Chunk) -> bool {
        let length = chunk.len();
        if length > self.max_capacity - self.capacity {
            return false;
        }
        if length == 0 {
            return true;
        }

        self.queue.push(chunk);
        self.capacity += length;
        true
    }

    /// Whether at least `length` unread bytes are buffered.
    #[inline]
    pub fn has_capacity(&self, length: usize) -> bool {
        self.capacity >= length
    }

    /// Number of unread bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes already consumed from the head chunk.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of queued chunks.
    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Copies the next `length` bytes into the front of `target`.
    ///
    /// Returns `length`, or `0` without consuming anything when fewer than
    /// `length` bytes are buffered or `target` is too small.
    pub fn read(&mut self, length: usize, target: &mut [u8]) -> usize {
        if self.capacity < length || target.len() < length {
            return 0;
        }

        let mut offset = 0;
        while offset < length {
            let Some(chunk) = self.queue.peek() else {
                break;
            };

            let available = chunk.len() - self.cursor;
            let take = available.min(length - offset);

            target[offset..offset + take].copy_from_slice(&chunk[self.cursor..self.cursor + take]);
            offset += take;
            self.consume(take, available);
        }

        offset
    }

    /// Reads the next `length` bytes into a chunk of their own.
    ///
    /// When the head chunk is exactly the requested bytes it is handed over as is,
    /// otherwise a new chunk is allocated and filled. Returns `None` without
    /// consuming anything if not enough bytes are buffered or the allocation fails.
    pub fn read_chunk(&mut self, length: usize) -> Option<Chunk> {
        if self.capacity < length {
            return None;
        }

        if self.cursor == 0 && self.queue.peek().is_some_and(|chunk| chunk.len() == length) {
            self.capacity -= length;
            return self.queue.shift();
        }

        let mut chunk = Chunk::try_alloc(length)?;
        let read = self.read(length, chunk.as_bytes_mut());
        debug_assert_eq!(read, length);

        Some(chunk)
    }

    /// Accounts for `take` bytes read out of the head chunk, which had `available` unread.
    fn consume(&mut self, take: usize, available: usize) {
        self.capacity -= take;
        if take == available {
            self.cursor = 0;
            self.queue.shift();
        } else {
            self.cursor += take;
        }
    }
}

impl Default for StreamReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader_with(chunks: &[&str]) -> StreamReader {
        let mut reader = StreamReader::new();
        for chunk in chunks {
            assert!(reader.push(Chunk::from(*chunk)));
        }
        reader
    }

    #[test]
    fn test_read_within_one_chunk() {
        let mut reader = reader_with(&["abcdef"]);
        let mut buf = [0u8; 4];

        assert_eq!(reader.read(2, &mut buf), 2);
        assert_eq!(&buf[..2], b"ab");
        assert_eq!(reader.cursor(), 2);
        assert_eq!(reader.capacity(), 4);

        assert_eq!(reader.read(4, &mut buf), 4);
        assert_eq!(&buf, b"cdef");
        assert_eq!(reader.cursor(), 0);
        assert_eq!(reader.capacity(), 0);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_read_across_chunks() {
        let mut reader = reader_with(&["ab", "c", "defg"]);
        let mut buf = [0u8; 5];

        assert_eq!(reader.read(5, &mut buf), 5);
        assert_eq!(&buf, b"abcde");
        assert_eq!(reader.len(), 1);
        assert_eq!(reader.cursor(), 2);
        assert_eq!(reader.capacity(), 2);
    }

    #[test]
    fn test_short_read_changes_nothing() {
        let mut reader = reader_with(&["abc", "de"]);
        let mut buf = [0u8; 8];
        assert_eq!(reader.read(1, &mut buf), 1);

        let (capacity, cursor, len) = (reader.capacity(), reader.cursor(), reader.len());
        assert_eq!(reader.read(5, &mut buf), 0);
        assert_eq!(reader.capacity(), capacity);
        assert_eq!(reader.cursor(), cursor);
        assert_eq!(reader.len(), len);

        // target too small is refused the same way
        assert_eq!(reader.read(4, &mut buf[..2]), 0);
        assert_eq!(reader.capacity(), capacity);

        assert_eq!(reader.read(4, &mut buf), 4);
        assert_eq!(&buf[..4], b"bcde");
    }

    #[test]
    fn test_capacity_ceiling() {
        let mut reader = StreamReader::with_max_capacity(8);
        assert!(reader.push(Chunk::from(&[0u8; 5][..])));
        assert!(!reader.push(Chunk::from(&[0u8; 4][..])));
        assert_eq!(reader.capacity(), 5);
        assert!(reader.push(Chunk::from(&[0u8; 3][..])));
        assert_eq!(reader.capacity(), 8);
        assert!(reader.push(Chunk::new(0)));
        assert_eq!(reader.len(), 2);
    }

    #[test]
    fn test_read_chunk_hands_over_aligned_chunk() {
        let mut reader = reader_with(&["head", "payload"]);
        let mut head = [0u8; 4];
        reader.read(4, &mut head);

        let chunk = reader.read_chunk(7).expect("payload");
        assert_eq!(chunk.as_bytes(), b"payload");
        assert!(reader.is_empty());
        assert_eq!(reader.capacity(), 0);
    }

    #[test]
    fn test_read_chunk_copies_unaligned_data() {
        let mut reader = reader_with(&["xxpay", "lo", "ad!"]);
        let mut skip = [0u8; 2];
        reader.read(2, &mut skip);

        assert!(reader.read_chunk(9).is_none());
        assert_eq!(reader.capacity(), 8);

        let chunk = reader.read_chunk(7).expect("payload");
        assert_eq!(chunk.as_bytes(), b"payload");
        assert_eq!(reader.capacity(), 1);

        let empty = reader.read_chunk(0).expect("empty");
        assert!(empty.is_empty());
    }
}
