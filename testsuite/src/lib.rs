#![no_std]

pub mod pl011;

use cortex_m_semihosting::debug::{self, EXIT_FAILURE, EXIT_SUCCESS};
use panic_semihosting as _;
use portb::{Error, OutputQueue, PortB, Registers, Step};

pub use cortex_m_rt::entry;

pub fn exit_success() -> ! {
    debug::exit(EXIT_SUCCESS);
    #[allow(clippy::empty_loop)]
    loop {}
}

pub fn exit_failure() -> ! {
    debug::exit(EXIT_FAILURE);
    #[allow(clippy::empty_loop)]
    loop {}
}

/// Calls `send` until the output queue runs empty, retrying while the transmitter
/// is busy. Returns the number of completed items.
pub fn drain<R: Registers, Q: OutputQueue>(port: &mut PortB<'_, R, Q>) -> Result<usize, Error> {
    let mut completed = 0;
    loop {
        match port.send(false) {
            Ok(Step::Idle) => return Ok(completed),
            Ok(Step::Complete) => completed += 1,
            Ok(Step::Continue) | Err(Error::NotReady) => {}
            Err(err) => return Err(err),
        }
    }
}
