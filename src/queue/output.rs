use super::{OutputQueue, stored_size, until_nul};
use crate::Error;

/// Output queue that shifts the remaining items down to offset zero on every flush.
///
/// The head item always starts at offset zero, so the bytes in use are exactly
/// `0..tail`. A flush costs a copy of whatever is queued behind the head item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftQueue<const N: usize> {
    buf: [u8; N],
    /// Read cursor inside the head item.
    head: usize,
    /// First free byte.
    tail: usize,
    items: usize,
}

impl<const N: usize> ShiftQueue<N> {
    /// Creates an empty queue.
    pub const fn new() -> Self {
        const { assert!(N > 0, "an output queue needs at least one byte") };
        Self {
            buf: [0; N],
            head: 0,
            tail: 0,
            items: 0,
        }
    }
}

impl<const N: usize> Default for ShiftQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> OutputQueue for ShiftQueue<N> {
    #[inline]
    fn capacity(&self) -> usize {
        N
    }

    #[inline]
    fn len(&self) -> usize {
        self.items
    }

    #[inline]
    fn bytes(&self) -> usize {
        self.tail
    }

    fn push(&mut self, item: &[u8], suffix: &[u8]) -> Result<(), Error> {
        let (item, suffix) = (until_nul(item), until_nul(suffix));
        let size = stored_size(item, suffix);
        if size > N - self.tail {
            return Err(Error::Overflow);
        }

        let mid = self.tail + item.len();
        let end = mid + suffix.len();
        self.buf[self.tail..mid].copy_from_slice(item);
        self.buf[mid..end].copy_from_slice(suffix);
        self.buf[end] = 0;

        self.tail += size;
        self.items += 1;
        Ok(())
    }

    #[inline]
    fn peek(&self) -> u8 {
        if self.items == 0 { 0 } else { self.buf[self.head] }
    }

    #[inline]
    fn advance(&mut self) {
        if self.peek() != 0 {
            self.head += 1;
        }
    }

    fn pop(&mut self) {
        if self.items == 0 {
            return;
        }

        // One past the head item's NUL.
        let end = self.buf[self.head..self.tail]
            .iter()
            .position(|&b| b == 0)
            .map_or(self.tail, |nul| self.head + nul + 1);

        self.buf.copy_within(end..self.tail, 0);
        self.tail -= end;
        self.head = 0;
        self.items -= 1;

        if self.items == 0 {
            self.tail = 0;
            self.buf[0] = 0;
        }
    }

    fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.items = 0;
        self.buf[0] = 0;
    }

    fn bufs(&self) -> (&[u8], &[u8]) {
        if self.items == 0 {
            return (&[], &[]);
        }
        (&self.buf[self.head..self.tail], &[])
    }
}

/// Output queue that advances the head in place and wraps items around the end of the
/// buffer.
///
/// A flush only moves indexes. Items may be split across the end of the buffer, which
/// is why [`OutputQueue::bufs`] returns two slices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingQueue<const N: usize> {
    buf: [u8; N],
    /// Start of the head item.
    start: usize,
    /// Read cursor inside the head item.
    head: usize,
    /// First free byte.
    tail: usize,
    /// Bytes held from `start` up to `tail`.
    used: usize,
    items: usize,
}

impl<const N: usize> RingQueue<N> {
    /// Creates an empty queue.
    pub const fn new() -> Self {
        const { assert!(N > 0, "an output queue needs at least one byte") };
        Self {
            buf: [0; N],
            start: 0,
            head: 0,
            tail: 0,
            used: 0,
            items: 0,
        }
    }

    #[inline]
    fn wrap(index: usize) -> usize {
        index % N
    }
}

impl<const N: usize> Default for RingQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> OutputQueue for RingQueue<N> {
    #[inline]
    fn capacity(&self) -> usize {
        N
    }

    #[inline]
    fn len(&self) -> usize {
        self.items
    }

    #[inline]
    fn bytes(&self) -> usize {
        self.used
    }

    fn push(&mut self, item: &[u8], suffix: &[u8]) -> Result<(), Error> {
        let (item, suffix) = (until_nul(item), until_nul(suffix));
        let size = stored_size(item, suffix);
        if size > N - self.used {
            return Err(Error::Overflow);
        }

        let mut at = self.tail;
        for &byte in item.iter().chain(suffix).chain(&[0]) {
            self.buf[at] = byte;
            at = Self::wrap(at + 1);
        }

        self.tail = at;
        self.used += size;
        self.items += 1;
        Ok(())
    }

    #[inline]
    fn peek(&self) -> u8 {
        if self.items == 0 { 0 } else { self.buf[self.head] }
    }

    #[inline]
    fn advance(&mut self) {
        if self.peek() != 0 {
            self.head = Self::wrap(self.head + 1);
        }
    }

    fn pop(&mut self) {
        if self.items == 0 {
            return;
        }

        let mut nul = self.head;
        let mut scanned = 0;
        while self.buf[nul] != 0 && scanned < self.used {
            nul = Self::wrap(nul + 1);
            scanned += 1;
        }

        let released = Self::wrap(nul + N - self.start) + 1;
        self.used -= released.min(self.used);
        self.items -= 1;
        self.start = Self::wrap(nul + 1);
        self.head = self.start;

        if self.items == 0 {
            self.clear();
        }
    }

    fn clear(&mut self) {
        self.start = 0;
        self.head = 0;
        self.tail = 0;
        self.used = 0;
        self.items = 0;
    }

    fn bufs(&self) -> (&[u8], &[u8]) {
        if self.items == 0 {
            return (&[], &[]);
        }

        let sent = Self::wrap(self.head + N - self.start);
        let end = self.head + (self.used - sent);
        if end <= N {
            (&self.buf[self.head..end], &[])
        } else {
            (&self.buf[self.head..], &self.buf[..end - N])
        }
    }
}
