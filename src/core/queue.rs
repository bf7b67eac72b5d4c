//! Bounded queue of bytes awaiting transmission to the device.

/// Queue capacity in bytes. Typed input beyond this is dropped with an alert
/// until the device drains the backlog.
pub const QUEUE_CAPACITY: usize = 256;

/// Ordered, bounded buffer of pending output bytes.
///
/// Bytes enter at the tail as the user types and leave from the head once the
/// device accepts them. Overflow drops the newest byte; queued bytes are never
/// reordered or silently discarded.
#[derive(Debug)]
pub struct WriteQueue {
    buf: Vec<u8>,
    capacity: usize,
}

impl WriteQueue {
    pub fn new() -> Self {
        Self::with_capacity(QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a byte. Returns false if the queue is full and the byte was
    /// dropped; the caller is expected to alert the user.
    #[must_use]
    pub fn enqueue(&mut self, byte: u8) -> bool {
        if self.buf.len() >= self.capacity {
            return false;
        }
        self.buf.push(byte);
        true
    }

    /// Remove exactly `n` accepted bytes from the head, preserving the order
    /// of the remainder. `n` is clamped to the current length.
    pub fn drain_ready(&mut self, n: usize) {
        let n = n.min(self.buf.len());
        self.buf.drain(..n);
    }

    /// Discard all pending bytes. Used when the device parameters change
    /// underneath data framed for the old configuration.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Default for WriteQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enqueue_and_drain_preserve_order() {
        let mut q = WriteQueue::new();
        for b in 0..10u8 {
            assert!(q.enqueue(b));
        }
        assert_eq!(q.len(), 10);

        q.drain_ready(4);
        assert_eq!(q.as_bytes(), &[4, 5, 6, 7, 8, 9]);

        q.drain_ready(6);
        assert!(q.is_empty());
    }

    #[test]
    fn test_overflow_drops_newest_keeps_prior_order() {
        let mut q = WriteQueue::with_capacity(4);
        assert!(q.enqueue(b'a'));
        assert!(q.enqueue(b'b'));
        assert!(q.enqueue(b'c'));
        assert!(q.enqueue(b'd'));
        assert!(!q.enqueue(b'e'));
        assert_eq!(q.as_bytes(), b"abcd");
    }

    #[test]
    fn test_length_never_exceeds_capacity() {
        let mut q = WriteQueue::new();
        for b in 0..=255u8 {
            let _ = q.enqueue(b);
        }
        let _ = q.enqueue(0);
        assert_eq!(q.len(), QUEUE_CAPACITY);
    }

    #[test]
    fn test_drain_more_than_len_is_clamped() {
        let mut q = WriteQueue::new();
        assert!(q.enqueue(1));
        assert!(q.enqueue(2));
        q.drain_ready(10);
        assert!(q.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut q = WriteQueue::new();
        assert!(q.enqueue(1));
        q.clear();
        assert!(q.is_empty());
        assert!(q.enqueue(2));
        assert_eq!(q.as_bytes(), &[2]);
    }
}
