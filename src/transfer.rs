//! The byte steppers.
//!
//! [`PortB::send`] and [`PortB::receive`] move one byte of the head item per call. With
//! the direction's interrupt enabled a call only acts after the handler has raised the
//! [`IrqSignal`](crate::IrqSignal) and never waits. Polled, a call spins on the status
//! register for at most [`Config::timeout`](crate::Config::timeout) reads.

use crate::port::Direction;
use crate::queue::{Accept, OutputQueue};
use crate::regs::{IrqEnable, Registers, Status};
use crate::{Error, PortB, Step};

impl<R: Registers, Q: OutputQueue> PortB<'_, R, Q> {
    /// Sends the next byte of the head output item.
    ///
    /// Returns [`Step::Complete`] once the call after the item's last byte finds its
    /// end, and [`Step::Idle`] when nothing is queued. `first` marks the call made
    /// right after queueing, which may open the transmission with a newline (see
    /// [`Config::lead_newline`](crate::Config::lead_newline)).
    pub fn send(&mut self, first: bool) -> Result<Step, Error> {
        if self.output.is_empty() {
            return Ok(Step::Idle);
        }
        if self.direction == Direction::Receiving {
            return Err(Error::Busy);
        }

        let irq = self.regs.irq_enabled(IrqEnable::TX);
        let lead = first && irq && self.config.lead_newline && self.direction == Direction::Idle;

        let status = if irq {
            let triggered = self.signal.take_trigger();
            // An idle port has no interrupt coming: its first byte starts the chain.
            if !triggered && self.direction == Direction::Transmitting {
                return Ok(Step::Continue);
            }
            self.signal.take_reason()
        } else {
            self.regs.status()
        };

        let errors = self.regs.error_mask(Some(status));
        if !errors.is_empty() {
            warn!("line error while sending: {=u8:#x}", errors.bits());
            return Err(Error::Line(errors));
        }

        let byte = if lead { b'\n' } else { self.output.peek() };
        if byte == 0 {
            self.retire(Direction::Transmitting);
            return Ok(Step::Complete);
        }

        if irq {
            if status.contains(Status::TX_BUSY) {
                return Err(Error::NotReady);
            }
        } else {
            self.regs.wait_tx_ready(self.config.timeout)?;
        }

        self.direction = Direction::Transmitting;
        self.regs.write_data(byte);
        trace!("sent {=u8:#x}", byte);
        if !lead {
            self.output.advance();
        }
        Ok(Step::Continue)
    }

    /// Receives the next byte into the head input request.
    ///
    /// Returns [`Step::Complete`] when the byte was the terminator, after which the
    /// request can be collected with [`PortB::take_received`]. Returns [`Step::Idle`]
    /// when no request is waiting.
    pub fn receive(&mut self, first: bool) -> Result<Step, Error> {
        if self.input.is_empty() {
            return Ok(Step::Idle);
        }
        if self.direction == Direction::Transmitting {
            return Err(Error::Busy);
        }

        let status = if self.regs.irq_enabled(IrqEnable::RX) {
            if !self.signal.take_trigger() {
                return Ok(Step::Continue);
            }
            self.signal.take_reason()
        } else {
            let errors = self.regs.error_mask(None);
            if !errors.is_empty() {
                warn!("line error while receiving: {=u8:#x}", errors.bits());
                return Err(Error::Line(errors));
            }
            match self.regs.wait_rx_ready(self.config.timeout) {
                Ok(status) => status,
                // Nothing typed yet is expected right after queueing.
                Err(Error::NotReady) if first => return Ok(Step::Continue),
                Err(err) => return Err(err),
            }
        };

        let errors = self.regs.error_mask(Some(status));
        if !errors.is_empty() {
            warn!("line error while receiving: {=u8:#x}", errors.bits());
            return Err(Error::Line(errors));
        }
        if !status.contains(Status::RX_READY) {
            return Ok(Step::Continue);
        }

        self.direction = Direction::Receiving;
        let byte = self.regs.read_data();
        trace!("received {=u8:#x}", byte);
        match self.input.accept(byte) {
            Some(Accept::Line) => {
                if self.input.head_overflowed() {
                    debug!("input line truncated");
                }
                self.retire(Direction::Receiving);
                Ok(Step::Complete)
            }
            Some(Accept::Stored | Accept::Discarded) => Ok(Step::Continue),
            None => {
                self.direction = Direction::Idle;
                Ok(Step::Idle)
            }
        }
    }
}
