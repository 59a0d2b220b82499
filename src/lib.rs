#![no_std]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

use core::fmt::{self, Display};

#[macro_use]
mod log;

mod config;
mod irq;
mod port;
pub mod queue;
pub mod regs;
#[cfg(test)]
mod sim;
mod transfer;

pub use config::{
    Config, DEFAULT_TIMEOUT, ENTER, LineEnding, MAX_INPUT_ITEMS, MAX_OUTPUT_ITEM_SIZE,
    OUTPUT_SIZE,
};
pub use irq::IrqSignal;
pub use port::{Channel, Console, Direction, InitError, PortB, Stats};
pub use queue::{DefaultQueue, OutputQueue, Received, RequestError, RingQueue, ShiftQueue};
pub use regs::{Mmio, Parity, Registers, Speed, Status};

/// Error returned by requests and steppers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An argument does not describe a valid request.
    Undefined,
    /// The item or request does not fit in its queue.
    Overflow,
    /// There was nothing to act on.
    Empty,
    /// The port is busy in the other direction.
    Busy,
    /// The hardware did not become ready within the polling budget.
    NotReady,
    /// The hardware reported line errors. Only the bits in [`Status::ERRORS`] are set.
    Line(Status),
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Undefined => f.write_str("undefined request argument"),
            Error::Overflow => f.write_str("queue overflow"),
            Error::Empty => f.write_str("nothing queued"),
            Error::Busy => f.write_str("port busy in the other direction"),
            Error::NotReady => f.write_str("port not ready"),
            Error::Line(status) => write!(f, "line error (status {:#04x})", status.bits()),
        }
    }
}

impl core::error::Error for Error {}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter<'_>) {
        match self {
            Error::Undefined => defmt::write!(f, "Undefined"),
            Error::Overflow => defmt::write!(f, "Overflow"),
            Error::Empty => defmt::write!(f, "Empty"),
            Error::Busy => defmt::write!(f, "Busy"),
            Error::NotReady => defmt::write!(f, "NotReady"),
            Error::Line(status) => defmt::write!(f, "Line({=u8:#x})", status.bits()),
        }
    }
}

/// Successful outcome of one stepper call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    /// Nothing is queued for this direction.
    Idle,
    /// The transfer is under way, or waiting for the next interrupt.
    Continue,
    /// The head item has been fully sent or received.
    Complete,
}
