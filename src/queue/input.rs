use core::fmt;

use heapless::Deque;

use crate::{ENTER, Error};

/// A pending input request: where received bytes go and how many may still land there.
#[derive(Debug)]
struct Slot<'a> {
    buf: &'a mut [u8],
    limit: usize,
    len: usize,
    /// Counts down from `limit`. At 1 only the terminator fits.
    remaining: usize,
    overflowed: bool,
}

/// What happened to a byte handed to [`InputQueue::accept`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Accept {
    /// Stored in the head request's buffer.
    Stored,
    /// Dropped: a NUL byte, or the request is past its overflow boundary.
    Discarded,
    /// The terminator: the head request is complete.
    Line,
}

/// An input request that was not queued.
///
/// Hands the caller's buffer back so it can be reused.
#[derive(Debug, PartialEq, Eq)]
pub struct RequestError<'a> {
    /// Why the request was refused.
    pub error: Error,
    /// The buffer the request named. `None` if it named none, or if the request was
    /// queued and `error` came from its first receive step.
    pub buf: Option<&'a mut [u8]>,
}

impl<'a> RequestError<'a> {
    pub(crate) const fn new(error: Error, buf: Option<&'a mut [u8]>) -> Self {
        Self { error, buf }
    }
}

impl From<RequestError<'_>> for Error {
    fn from(err: RequestError<'_>) -> Self {
        err.error
    }
}

impl fmt::Display for RequestError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "input request refused: {}", self.error)
    }
}

impl core::error::Error for RequestError<'_> {}

/// A completed input request, handing the caller's buffer back.
#[derive(Debug)]
pub struct Received<'a> {
    buf: &'a mut [u8],
    len: usize,
    overflowed: bool,
}

impl<'a> Received<'a> {
    /// The received line, without terminator.
    pub fn line(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Returns `true` if bytes were dropped because the line was longer than the
    /// request allowed.
    pub fn is_overflowed(&self) -> bool {
        self.overflowed
    }

    /// The whole destination buffer. When the request allowed at least one byte the
    /// line is followed by a NUL.
    pub fn into_buf(self) -> &'a mut [u8] {
        self.buf
    }
}

/// FIFO of input requests over a fixed slot table.
///
/// Completed requests move to a second FIFO until the caller collects them with
/// [`InputQueue::take_received`]. Both share the `N` slots, since an uncollected buffer
/// is still lent to the queue.
#[derive(Debug)]
pub struct InputQueue<'a, const N: usize> {
    pending: Deque<Slot<'a>, N>,
    done: Deque<Received<'a>, N>,
}

impl<'a, const N: usize> InputQueue<'a, N> {
    /// Creates an empty queue.
    pub const fn new() -> Self {
        Self {
            pending: Deque::new(),
            done: Deque::new(),
        }
    }

    /// Number of requests still waiting for their terminator.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if no request is waiting.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of completed requests not collected yet.
    pub fn received(&self) -> usize {
        self.done.len()
    }

    /// Queues a request for at most `limit` bytes into `buf`, terminator included.
    ///
    /// `limit` must not exceed `buf.len()`. A `limit` of 0 accepts a bare terminator
    /// and never writes to `buf`. On failure `buf` is handed back in the error.
    pub fn push(&mut self, buf: &'a mut [u8], limit: usize) -> Result<(), RequestError<'a>> {
        if limit > buf.len() {
            return Err(RequestError::new(Error::Undefined, Some(buf)));
        }
        if self.pending.len() + self.done.len() >= N {
            return Err(RequestError::new(Error::Overflow, Some(buf)));
        }

        let slot = Slot {
            buf,
            limit,
            len: 0,
            remaining: limit,
            overflowed: false,
        };
        self.pending
            .push_back(slot)
            .map_err(|slot| RequestError::new(Error::Overflow, Some(slot.buf)))
    }

    /// Hands one received byte to the head request.
    ///
    /// Returns `None` if no request is waiting.
    pub fn accept(&mut self, byte: u8) -> Option<Accept> {
        let slot = self.pending.front_mut()?;

        let accepted = if byte == ENTER {
            if slot.limit > 0 {
                slot.buf[slot.len] = 0;
            }
            Accept::Line
        } else if byte == 0 {
            Accept::Discarded
        } else if slot.remaining > 1 {
            slot.buf[slot.len] = byte;
            slot.len += 1;
            slot.remaining -= 1;
            Accept::Stored
        } else {
            slot.overflowed = true;
            Accept::Discarded
        };
        Some(accepted)
    }

    /// Retires the head request, moving it to the completed FIFO.
    pub fn complete(&mut self) {
        if let Some(slot) = self.pending.pop_front() {
            let received = Received {
                buf: slot.buf,
                len: slot.len,
                overflowed: slot.overflowed,
            };
            // Cannot fail: `push` keeps pending + done within N.
            let _ = self.done.push_back(received);
        }
    }

    /// Takes the oldest completed request.
    pub fn take_received(&mut self) -> Option<Received<'a>> {
        self.done.pop_front()
    }

    /// Whether the head request has dropped bytes so far.
    pub fn head_overflowed(&self) -> bool {
        self.pending.front().is_some_and(|slot| slot.overflowed)
    }

    /// Drops every pending and completed request.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.done.clear();
    }
}

impl<const N: usize> Default for InputQueue<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn feed<const N: usize>(q: &mut InputQueue<'_, N>, bytes: &[u8]) -> Option<Accept> {
        let mut last = None;
        for &byte in bytes {
            last = q.accept(byte);
        }
        last
    }

    #[test]
    fn lines_complete_in_order() {
        let mut a = [0xff; 5];
        let mut b = [0xff; 5];
        let mut q = InputQueue::<'_, 4>::new();
        q.push(&mut a, 5).unwrap();
        q.push(&mut b, 5).unwrap();
        assert_eq!(q.len(), 2);

        assert_eq!(feed(&mut q, b"ab"), Some(Accept::Stored));
        assert_eq!(q.accept(ENTER), Some(Accept::Line));
        q.complete();
        assert_eq!(feed(&mut q, b"xyz\r"), Some(Accept::Line));
        q.complete();
        assert!(q.is_empty());
        assert_eq!(q.received(), 2);

        let first = q.take_received().unwrap();
        assert_eq!(first.line(), b"ab");
        assert!(!first.is_overflowed());
        assert_eq!(first.into_buf(), &[b'a', b'b', 0, 0xff, 0xff]);
        assert_eq!(q.take_received().unwrap().line(), b"xyz");
        assert!(q.take_received().is_none());
    }

    #[test]
    fn overflow_boundary_keeps_room_for_terminator() {
        let mut buf = [0xff; 4];
        let mut q = InputQueue::<'_, 2>::new();
        q.push(&mut buf, 4).unwrap();

        assert_eq!(feed(&mut q, b"abc"), Some(Accept::Stored));
        assert!(!q.head_overflowed());
        assert_eq!(q.accept(b'd'), Some(Accept::Discarded));
        assert!(q.head_overflowed());
        assert_eq!(q.accept(ENTER), Some(Accept::Line));
        q.complete();

        let received = q.take_received().unwrap();
        assert_eq!(received.line(), b"abc");
        assert!(received.is_overflowed());
        assert_eq!(received.into_buf(), b"abc\0");
    }

    #[test]
    fn zero_limit_accepts_only_terminator() {
        let mut q = InputQueue::<'_, 2>::new();
        q.push(Default::default(), 0).unwrap();
        assert_eq!(q.accept(ENTER), Some(Accept::Line));
        q.complete();

        let received = q.take_received().unwrap();
        assert!(received.line().is_empty());
        assert!(received.into_buf().is_empty());
    }

    #[test]
    fn slot_table_is_bounded() {
        let mut bufs = [[0u8; 2]; 3];
        let [a, b, c] = &mut bufs;
        let mut q = InputQueue::<'_, 2>::new();
        q.push(a, 2).unwrap();
        q.push(b, 2).unwrap();
        let refused = q.push(c, 2).unwrap_err();
        assert_eq!(refused.error, Error::Overflow);
        assert_eq!(q.len(), 2);

        // A completed but uncollected request still holds its slot.
        q.accept(ENTER);
        q.complete();
        let refused = q.push(refused.buf.unwrap(), 2).unwrap_err();
        assert_eq!(refused.error, Error::Overflow);

        // The refused buffer comes back and can be queued once a slot frees up.
        q.take_received().unwrap();
        q.push(refused.buf.unwrap(), 2).unwrap();
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn limit_larger_than_buffer_is_rejected() {
        let mut buf = [0u8; 2];
        let mut q = InputQueue::<'_, 2>::new();
        let refused = q.push(&mut buf, 3).unwrap_err();
        assert_eq!(refused.error, Error::Undefined);
        assert_eq!(refused.buf.map(|buf| buf.len()), Some(2));
        assert!(q.is_empty());
    }

    #[test]
    fn accept_without_request() {
        let mut q = InputQueue::<'_, 2>::new();
        assert_eq!(q.accept(b'a'), None);
    }
}
