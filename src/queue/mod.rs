//! Request queues.
//!
//! Output items are stored as NUL-terminated byte strings in a fixed byte buffer. Two
//! storage policies implement [`OutputQueue`]:
//!
//! - [`ShiftQueue`] moves the remaining items down to offset zero whenever the head
//!   item is flushed.
//! - [`RingQueue`] advances the head in place and lets items wrap around.
//!
//! Input requests live in a fixed slot table, see [`InputQueue`].

mod input;
mod output;

pub use input::{Accept, InputQueue, Received, RequestError};
pub use output::{RingQueue, ShiftQueue};

use crate::Error;

/// The output queue used by [`PortB`](crate::PortB) unless another is named.
#[cfg(not(feature = "ring-queue"))]
pub type DefaultQueue = ShiftQueue<{ crate::OUTPUT_SIZE }>;

/// The output queue used by [`PortB`](crate::PortB) unless another is named.
#[cfg(feature = "ring-queue")]
pub type DefaultQueue = RingQueue<{ crate::OUTPUT_SIZE }>;

/// FIFO of NUL-terminated output items with a byte cursor into the head item.
pub trait OutputQueue {
    /// Total byte capacity.
    fn capacity(&self) -> usize;

    /// Number of queued items, including the one being transmitted.
    fn len(&self) -> usize;

    /// Returns `true` if no item is queued.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes held by queued items, terminators included.
    fn bytes(&self) -> usize;

    /// Bytes still free.
    fn free(&self) -> usize {
        self.capacity() - self.bytes()
    }

    /// Appends `item` followed by `suffix` and a NUL as one new item.
    ///
    /// NUL ends an item, so `item` and `suffix` are each cut at their first NUL. Fails with [`Error::Overflow`] without modifying the queue if the item does
    /// not fit.
    fn push(&mut self, item: &[u8], suffix: &[u8]) -> Result<(), Error>;

    /// The byte under the read cursor. NUL marks the end of the head item, and is
    /// also what an empty queue returns.
    fn peek(&self) -> u8;

    /// Moves the read cursor one byte forward within the head item.
    fn advance(&mut self);

    /// Removes the head item and places the cursor at the start of the next one.
    fn pop(&mut self);

    /// Removes every item.
    fn clear(&mut self);

    /// Bytes from the read cursor to the tail. The second slice is only non-empty when
    /// the data wraps around the end of the buffer.
    fn bufs(&self) -> (&[u8], &[u8]);
}

/// Size an item takes in an output queue: the item, its suffix and the NUL.
pub const fn stored_size(item: &[u8], suffix: &[u8]) -> usize {
    item.len() + suffix.len() + 1
}

/// `bytes` up to, not including, its first NUL.
pub(crate) fn until_nul(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(nul) => &bytes[..nul],
        None => bytes,
    }
}
