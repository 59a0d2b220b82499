//! Signal from the interrupt handler to the steppers.
//!
//! Specifically for the case of one interrupt handler feeding one port.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::regs::Status;

/// Trigger flag and interrupt reason shared between the port's interrupt handler and
/// [`PortB`](crate::PortB).
///
/// The handler calls [`IrqSignal::raise`] with the status register it captured. The
/// steppers consume the trigger and consult the reason instead of reading the status
/// register themselves.
///
/// ```
/// use portb::{IrqSignal, Status};
///
/// static PORT_B_IRQ: IrqSignal = IrqSignal::new();
///
/// // In the interrupt handler:
/// PORT_B_IRQ.raise(Status::RX_READY.bits());
/// assert!(PORT_B_IRQ.is_raised());
/// ```
#[derive(Debug)]
pub struct IrqSignal {
    trigger: AtomicBool,
    reason: AtomicU8,
}

impl IrqSignal {
    /// Creates a cleared signal.
    pub const fn new() -> Self {
        Self {
            trigger: AtomicBool::new(false),
            reason: AtomicU8::new(0),
        }
    }

    /// Records an interrupt with the status register value read by the handler.
    pub fn raise(&self, status: u8) {
        critical_section::with(|_| {
            self.reason.store(status, Ordering::Relaxed);
            // Release: the reason must be visible before the trigger.
            self.trigger.store(true, Ordering::Release);
        });
    }

    /// Returns `true` if an interrupt has been recorded and not consumed yet.
    pub fn is_raised(&self) -> bool {
        self.trigger.load(Ordering::Acquire)
    }

    /// The captured reason, without consuming it.
    pub fn reason(&self) -> Status {
        Status::from_bits_retain(self.reason.load(Ordering::Acquire))
    }

    /// Consumes the trigger, returning whether it was set.
    pub(crate) fn take_trigger(&self) -> bool {
        critical_section::with(|_| {
            let raised = self.trigger.load(Ordering::Acquire);
            if raised {
                self.trigger.store(false, Ordering::Relaxed);
            }
            raised
        })
    }

    /// Consumes the captured reason.
    pub(crate) fn take_reason(&self) -> Status {
        critical_section::with(|_| {
            let reason = self.reason.load(Ordering::Acquire);
            self.reason.store(0, Ordering::Relaxed);
            Status::from_bits_retain(reason)
        })
    }

    /// Drops any recorded interrupt.
    pub(crate) fn clear(&self) {
        critical_section::with(|_| {
            self.trigger.store(false, Ordering::Relaxed);
            self.reason.store(0, Ordering::Relaxed);
        });
    }
}

impl Default for IrqSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn trigger_is_consumed_once() {
        let signal = IrqSignal::new();
        assert!(!signal.take_trigger());

        signal.raise(Status::TX_BUSY.bits());
        assert!(signal.is_raised());
        assert!(signal.take_trigger());
        assert!(!signal.take_trigger());

        // The reason outlives the trigger until it is consulted.
        assert_eq!(signal.reason(), Status::TX_BUSY);
        assert_eq!(signal.take_reason(), Status::TX_BUSY);
        assert_eq!(signal.take_reason(), Status::empty());
    }

    #[test]
    fn later_interrupt_replaces_reason() {
        let signal = IrqSignal::new();
        signal.raise(Status::RX_READY.bits());
        signal.raise((Status::RX_READY | Status::OVERRUN).bits());
        assert_eq!(signal.take_reason(), Status::RX_READY | Status::OVERRUN);

        signal.raise(Status::RX_READY.bits());
        signal.clear();
        assert!(!signal.is_raised());
        assert_eq!(signal.reason(), Status::empty());
    }
}
