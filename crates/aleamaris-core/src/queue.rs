//! Bounded FIFO byte queue sitting between the conditioner and the DRBG.
//!
//! A queue of chunks rather than one flat buffer — avoids repeated
//! `Vec` shifting on partial reads, mirroring the teacher's preference
//! for simple collection types over a custom ring buffer.

use std::collections::VecDeque;

/// Byte-capped FIFO of conditioned entropy blocks.
#[derive(Debug)]
pub struct ByteQueue {
    chunks: VecDeque<Vec<u8>>,
    cap: usize,
    size: usize,
}

impl ByteQueue {
    pub fn new(cap_bytes: usize) -> Self {
        Self {
            chunks: VecDeque::new(),
            cap: cap_bytes,
            size: 0,
        }
    }

    /// Append as much of `data` as fits under the capacity, truncating
    /// if necessary. Returns the number of bytes actually accepted.
    pub fn offer(&mut self, data: &[u8]) -> usize {
        let room = self.cap.saturating_sub(self.size);
        if room == 0 || data.is_empty() {
            return 0;
        }
        let to_write = data.len().min(room);
        self.chunks.push_back(data[..to_write].to_vec());
        self.size += to_write;
        to_write
    }

    /// Remove up to `count` bytes from the front of the queue.
    pub fn poll(&mut self, count: usize) -> Vec<u8> {
        if self.size == 0 || count == 0 {
            return Vec::new();
        }
        let n = count.min(self.size);
        let mut out = Vec::with_capacity(n);
        let mut remaining = n;
        while remaining > 0 {
            let Some(head) = self.chunks.front_mut() else {
                break;
            };
            if head.len() <= remaining {
                let head = self.chunks.pop_front().unwrap();
                remaining -= head.len();
                out.extend(head);
            } else {
                out.extend(head.drain(..remaining));
                remaining = 0;
            }
        }
        self.size -= out.len();
        out
    }

    pub fn available(&self) -> usize {
        self.size
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_then_poll_round_trips() {
        let mut q = ByteQueue::new(100);
        assert_eq!(q.offer(b"hello"), 5);
        assert_eq!(q.available(), 5);
        assert_eq!(q.poll(5), b"hello");
        assert_eq!(q.available(), 0);
    }

    #[test]
    fn offer_truncates_at_capacity() {
        let mut q = ByteQueue::new(3);
        assert_eq!(q.offer(b"hello"), 3);
        assert_eq!(q.available(), 3);
        assert_eq!(q.offer(b"more"), 0);
    }

    #[test]
    fn poll_spans_multiple_chunks() {
        let mut q = ByteQueue::new(100);
        q.offer(b"ab");
        q.offer(b"cd");
        q.offer(b"ef");
        assert_eq!(q.poll(5), b"abcde");
        assert_eq!(q.available(), 1);
        assert_eq!(q.poll(10), b"f");
    }

    #[test]
    fn poll_on_empty_queue_returns_empty() {
        let mut q = ByteQueue::new(10);
        assert!(q.poll(5).is_empty());
    }

    #[test]
    fn poll_zero_returns_empty_without_consuming() {
        let mut q = ByteQueue::new(10);
        q.offer(b"xyz");
        assert!(q.poll(0).is_empty());
        assert_eq!(q.available(), 3);
    }

    #[test]
    fn offer_splits_partial_head_chunk_correctly() {
        let mut q = ByteQueue::new(10);
        q.offer(b"abcdef");
        let first = q.poll(2);
        assert_eq!(first, b"ab");
        q.offer(b"ghi");
        assert_eq!(q.poll(20), b"cdefghi");
    }
}
