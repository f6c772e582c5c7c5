//! # Chunk
//!
//! [`Chunk`] is the byte buffer that travels through the parser: every piece of
//! input pushed into the [`StreamReader`](crate::stream_reader::StreamReader)
//! and every frame payload is a `Chunk`.
//!
//! A chunk always owns its storage. Non-owning views are plain `&[u8]` slices
//! obtained through [`Chunk::slice`] and [`Chunk::tail`]; they borrow from the
//! chunk, so a view can never outlive the bytes it points into, and dropping a
//! view never releases anything.
//!
//! All indexed accessors are bounds-checked against the chunk length. Reads
//! outside the buffer return `0` and writes outside it do nothing, reporting
//! `0` or `false` to the caller.
use std::ops::Deref;

use bytes::{Bytes, BytesMut};

/// An owned, bounds-checked byte buffer.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    data: BytesMut,
}

impl Chunk {
    /// Allocates a zero-filled chunk of `length` bytes.
    pub fn new(length: usize) -> Self {
        Self {
            data: BytesMut::zeroed(length),
        }
    }

    /// Allocates a zero-filled chunk, returning `None` if the allocator refuses.
    ///
    /// The parser uses this for payload buffers whose size comes from the peer.
    pub fn try_alloc(length: usize) -> Option<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(length).ok()?;
        data.resize(length, 0);
        Some(Self::from(data))
    }

    /// Number of bytes in the chunk.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the chunk holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether `n` bytes starting at `start` fit inside the chunk.
    #[inline]
    fn in_bounds(&self, start: usize, n: usize) -> bool {
        start <= self.len() && n <= self.len() - start
    }

    /// Returns the byte at `n`, or `0` when `n` is out of range.
    pub fn get(&self, n: usize) -> u8 {
        self.data.get(n).copied().unwrap_or(0)
    }

    /// Sets the byte at `n`. Returns `false` and does nothing when `n` is out of range.
    pub fn set(&mut self, n: usize, value: u8) -> bool {
        match self.data.get_mut(n) {
            Some(byte) => {
                *byte = value;
                true
            }
            None => false,
        }
    }

    /// Reads a big-endian `u16` at offset `n`, or `0` if it does not fit.
    pub fn read_u16(&self, n: usize) -> u16 {
        match self.slice(n, 2) {
            Some(bytes) => u16::from_be_bytes([bytes[0], bytes[1]]),
            None => 0,
        }
    }

    /// Reads a big-endian `u64` at offset `n`, or `0` if it does not fit.
    pub fn read_u64(&self, n: usize) -> u64 {
        self.slice(n, 8)
            .and_then(|bytes| <[u8; 8]>::try_from(bytes).ok())
            .map(u64::from_be_bytes)
            .unwrap_or(0)
    }

    /// Writes a big-endian `u16` at offset `n`, returning the number of bytes written.
    pub fn write_u16(&mut self, n: usize, value: u16) -> usize {
        self.write_at(n, &value.to_be_bytes())
    }

    /// Writes a big-endian `u64` at offset `n`, returning the number of bytes written.
    pub fn write_u64(&mut self, n: usize, value: u64) -> usize {
        self.write_at(n, &value.to_be_bytes())
    }

    fn write_at(&mut self, n: usize, bytes: &[u8]) -> usize {
        if !self.in_bounds(n, bytes.len()) {
            return 0;
        }
        self.data[n..n + bytes.len()].copy_from_slice(bytes);
        bytes.len()
    }

    /// Copies `n` bytes from `src[src_start..]` into `dst[dst_start..]`.
    ///
    /// Returns `n`, or `0` without touching `dst` when either range falls outside
    /// its chunk.
    pub fn copy(src: &Chunk, src_start: usize, dst: &mut Chunk, dst_start: usize, n: usize) -> usize {
        if !src.in_bounds(src_start, n) || !dst.in_bounds(dst_start, n) {
            return 0;
        }
        dst.data[dst_start..dst_start + n].copy_from_slice(&src.data[src_start..src_start + n]);
        n
    }

    /// Overwrites the start of the chunk with `src`.
    ///
    /// Returns the number of bytes copied, `0` when `src` is longer than the chunk.
    pub fn fill(&mut self, src: &[u8]) -> usize {
        self.write_at(0, src)
    }

    /// Borrows `len` bytes starting at `offset`, without copying.
    pub fn slice(&self, offset: usize, len: usize) -> Option<&[u8]> {
        if !self.in_bounds(offset, len) {
            return None;
        }
        Some(&self.data[offset..offset + len])
    }

    /// Borrows everything from `offset` to the end of the chunk.
    pub fn tail(&self, offset: usize) -> Option<&[u8]> {
        self.data.get(offset..)
    }

    /// XORs every byte with `key[i % key.len()]`, in place.
    ///
    /// Returns the number of bytes processed. Applying the same key twice
    /// restores the original contents.
    pub fn mask(&mut self, key: &[u8]) -> usize {
        crate::mask::apply_mask_cycled(&mut self.data, key);
        self.len()
    }

    /// Borrows the whole chunk.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutably borrows the whole chunk.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Converts the chunk into immutable [`Bytes`] without copying.
    #[inline]
    pub fn into_bytes(self) -> Bytes {
        self.data.freeze()
    }

    /// Converts the chunk into its underlying [`BytesMut`].
    #[inline]
    pub fn into_inner(self) -> BytesMut {
        self.data
    }
}

impl Deref for Chunk {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl AsRef<[u8]> for Chunk {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk").field("len", &self.len()).finish()
    }
}

impl From<BytesMut> for Chunk {
    fn from(data: BytesMut) -> Self {
        Self { data }
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(data: Vec<u8>) -> Self {
        Self {
            data: BytesMut::from(Bytes::from(data)),
        }
    }
}

impl From<&[u8]> for Chunk {
    fn from(data: &[u8]) -> Self {
        Self {
            data: BytesMut::from(data),
        }
    }
}

impl<const N: usize> From<&[u8; N]> for Chunk {
    fn from(data: &[u8; N]) -> Self {
        Self::from(&data[..])
    }
}

impl From<&str> for Chunk {
    fn from(data: &str) -> Self {
        Self::from(data.as_bytes())
    }
}

impl From<String> for Chunk {
    fn from(data: String) -> Self {
        Self::from(data.into_bytes())
    }
}

impl From<Bytes> for Chunk {
    fn from(data: Bytes) -> Self {
        Self {
            data: BytesMut::from(data),
        }
    }
}
