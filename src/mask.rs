//! XOR masking as described in [RFC 6455 Section 5.3](https://datatracker.ietf.org/doc/html/rfc6455#section-5.3).
//!
//! Masking is its own inverse, so the same functions mask outgoing payloads
//! and unmask incoming ones.

/// Mask/unmask a buffer with a 4-byte key.
///
/// Works on whole 32-bit words and finishes the tail byte by byte.
#[inline]
pub fn apply_mask(buf: &mut [u8], mask: [u8; 4]) {
    let key = u32::from_ne_bytes(mask);

    let mut words = buf.chunks_exact_mut(4);
    for word in &mut words {
        let value = u32::from_ne_bytes([word[0], word[1], word[2], word[3]]) ^ key;
        word.copy_from_slice(&value.to_ne_bytes());
    }

    // the remainder starts on a multiple of 4, so the key restarts at index 0
    for (byte, k) in words.into_remainder().iter_mut().zip(mask) {
        *byte ^= k;
    }
}

/// Mask/unmask a buffer with a key of any length, cycling through it.
///
/// An empty key leaves the buffer untouched.
pub fn apply_mask_cycled(buf: &mut [u8], key: &[u8]) {
    if let Ok(mask) = <[u8; 4]>::try_from(key) {
        return apply_mask(buf, mask);
    }
    if key.is_empty() {
        return;
    }

    for (byte, k) in buf.iter_mut().zip(key.iter().cycle()) {
        *byte ^= k;
    }
}
