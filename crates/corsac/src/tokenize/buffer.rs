//! A multi-use byte buffer, designed to minimize reallocation during
//! parsing.
//!
//! One [`TokenBuffer`] is reused across many short-lived fields and lines:
//! [`TokenBuffer::clear`] resets the logical length without releasing
//! capacity, so after the first few lines the per-byte hot path performs no
//! allocation at all. One instance per (thread, role); the type is not
//! meant to be shared.

/// Reusable growable byte buffer.
#[derive(Debug, Default, Clone)]
pub struct TokenBuffer {
    buf: Vec<u8>,
}

impl TokenBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a buffer with `capacity` bytes preallocated.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Appends one byte, growing capacity to at least `2 * capacity + 1`
    /// on overflow. The extra slot keeps growth from stalling at capacity
    /// zero.
    #[inline]
    pub fn push(&mut self, byte: u8) {
        if self.buf.len() == self.buf.capacity() {
            self.buf.reserve_exact(self.buf.capacity() + 1);
        }
        self.buf.push(byte);
    }

    /// Resets the logical length to zero, retaining capacity.
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Read-only view of the current content.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Current logical length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` when the buffer holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Current capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_read_back() {
        let mut buf = TokenBuffer::new();
        for b in b"hello" {
            buf.push(*b);
        }
        assert_eq!(buf.as_bytes(), b"hello");
        assert_eq!(buf.len(), 5);
        assert!(!buf.is_empty());
    }

    #[test]
    fn test_clear_retains_capacity() {
        let mut buf = TokenBuffer::new();
        for b in 0..100u8 {
            buf.push(b);
        }
        let capacity = buf.capacity();
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), capacity);
    }

    #[test]
    fn test_refill_after_clear_does_not_reallocate() {
        let mut buf = TokenBuffer::new();
        for b in 0..200u8 {
            buf.push(b);
        }
        buf.clear();
        let capacity = buf.capacity();
        let ptr = buf.as_bytes().as_ptr();
        for b in 0..200u8 {
            buf.push(b);
        }
        assert_eq!(buf.capacity(), capacity);
        assert_eq!(buf.as_bytes().as_ptr(), ptr);
    }

    #[test]
    fn test_growth_from_zero() {
        let mut buf = TokenBuffer::new();
        assert_eq!(buf.capacity(), 0);
        buf.push(b'x');
        assert!(buf.capacity() >= 1);
        assert_eq!(buf.as_bytes(), b"x");
    }
}
