//! Register access for the Port B controller.
//!
//! The controller exposes four byte-wide registers spaced one word apart. On the
//! big-endian MIPS boards the byte sits in the last lane of its word, so [`Mmio`]
//! adds 3 to every offset there.

use bitflags::bitflags;
use core::ptr;

use crate::Error;

/// Physical base address of the Port A register block.
pub const PORT_A_BASE: usize = 0xBF80_0030;

/// Physical base address of the Port B register block.
pub const PORT_B_BASE: usize = 0xBF80_0040;

const BYTE_LANE: usize = if cfg!(target_endian = "big") { 3 } else { 0 };

/// A register of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reg {
    /// Control register (CNR): enable, speed, loopback, parity.
    Control,
    /// Status register: ready and line error bits.
    Status,
    /// Interrupt enable register (IER).
    IrqEnable,
    /// Data register. Reads return the receive holding register, writes go to the
    /// transmit holding register.
    Data,
}

impl Reg {
    /// Offset of the register's word from the block base.
    pub const fn offset(self) -> usize {
        match self {
            Reg::Control => 0x00,
            Reg::Status => 0x04,
            Reg::IrqEnable => 0x08,
            Reg::Data => 0x0C,
        }
    }
}

bitflags! {
    /// Control register bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Control: u8 {
        /// Port enable ("E_P"), set alongside every other change.
        const ENABLE = 0x01;
        /// Speed selector field.
        const SPEED = 0x06;
        /// Internal loopback.
        const LOOPBACK = 0x08;
        /// Even parity when set, odd when clear.
        const EVEN_PARITY = 0x10;
    }
}

bitflags! {
    /// Status register bits, also the layout of the interrupt reason byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Status: u8 {
        /// A byte has been received ("ENDRC").
        const RX_READY = 0x02;
        /// Parity error.
        const PARITY_ERROR = 0x04;
        /// Framing error.
        const FRAMING_ERROR = 0x08;
        /// Receiver overrun.
        const OVERRUN = 0x10;
        /// Transmitter is still shifting out the previous byte ("BTR").
        const TX_BUSY = 0x20;

        /// Every line error bit.
        const ERRORS = Self::PARITY_ERROR.bits() | Self::FRAMING_ERROR.bits() | Self::OVERRUN.bits();
    }
}

bitflags! {
    /// Interrupt enable register bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct IrqEnable: u8 {
        /// Transmitter interrupt ("EITR").
        const TX = 0x01;
        /// Receiver interrupt ("EIRC").
        const RX = 0x02;
    }
}

/// Transmit speed, encoded in [`Control::SPEED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Speed {
    /// 19200 baud.
    Baud19200,
    /// 38400 baud.
    Baud38400,
    /// 115200 baud.
    Baud115200,
}

impl Speed {
    const fn bits(self) -> u8 {
        match self {
            Speed::Baud19200 => 0x04,
            Speed::Baud38400 => 0x02,
            Speed::Baud115200 => 0x00,
        }
    }

    /// Nominal rate in baud.
    pub const fn baud(self) -> u32 {
        match self {
            Speed::Baud19200 => 19_200,
            Speed::Baud38400 => 38_400,
            Speed::Baud115200 => 115_200,
        }
    }
}

/// Parity control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    /// Odd parity.
    Odd,
    /// Even parity.
    Even,
}

/// Raw byte access to the controller's registers.
///
/// [`Mmio`] implements this for the real device. Anything else that can answer
/// register reads and writes (a different UART, a simulator) can stand in for it.
pub trait Registers {
    /// Reads a register.
    fn read(&mut self, reg: Reg) -> u8;

    /// Writes a register.
    fn write(&mut self, reg: Reg, value: u8);
}

impl<T: Registers + ?Sized> Registers for &mut T {
    #[inline]
    fn read(&mut self, reg: Reg) -> u8 {
        (**self).read(reg)
    }

    #[inline]
    fn write(&mut self, reg: Reg, value: u8) {
        (**self).write(reg, value)
    }
}

/// Memory-mapped register block.
#[derive(Debug)]
pub struct Mmio {
    base: *mut u8,
}

impl Mmio {
    /// Creates a register block at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the address of a Port controller register block mapped as
    /// device memory, and nothing else may access that block while the returned
    /// value is alive.
    pub unsafe fn new(base: usize) -> Self {
        Self {
            base: ptr::with_exposed_provenance_mut(base),
        }
    }

    /// Creates the register block of Port B.
    ///
    /// # Safety
    ///
    /// Same contract as [`Mmio::new`].
    pub unsafe fn port_b() -> Self {
        // SAFETY: Forwarded to the caller.
        unsafe { Self::new(PORT_B_BASE) }
    }

    #[inline]
    fn addr(&self, reg: Reg) -> *mut u8 {
        self.base.wrapping_add(reg.offset() + BYTE_LANE)
    }
}

// SAFETY: The block is only reachable through this value, which the constructor's
// caller guarantees to be unique. Moving it to another context moves that ownership.
unsafe impl Send for Mmio {}

impl Registers for Mmio {
    #[inline]
    fn read(&mut self, reg: Reg) -> u8 {
        // SAFETY: `new` guarantees the block is mapped, and every `Reg` offset lies
        // inside it.
        unsafe { self.addr(reg).read_volatile() }
    }

    #[inline]
    fn write(&mut self, reg: Reg, value: u8) {
        // SAFETY: `new` guarantees the block is mapped, and every `Reg` offset lies
        // inside it.
        unsafe { self.addr(reg).write_volatile(value) }
    }
}

/// A point-in-time copy of the three control/status registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Control register.
    pub control: Control,
    /// Status register.
    pub status: Status,
    /// Interrupt enable register.
    pub irq_enable: IrqEnable,
}

/// Typed access to the registers, plus the two saved-register shadows.
#[derive(Debug)]
pub struct RegisterBlock<R> {
    hw: R,
    saved_control: u8,
    saved_ier: u8,
}

impl<R: Registers> RegisterBlock<R> {
    /// Wraps a register implementation.
    pub const fn new(hw: R) -> Self {
        Self {
            hw,
            saved_control: 0,
            saved_ier: 0,
        }
    }

    /// Gives the register implementation back.
    pub fn into_inner(self) -> R {
        self.hw
    }

    /// Reads the control register.
    pub fn control(&mut self) -> Control {
        Control::from_bits_retain(self.hw.read(Reg::Control))
    }

    /// Reads the status register.
    pub fn status(&mut self) -> Status {
        Status::from_bits_retain(self.hw.read(Reg::Status))
    }

    /// Reads the interrupt enable register.
    pub fn irq_enable(&mut self) -> IrqEnable {
        IrqEnable::from_bits_retain(self.hw.read(Reg::IrqEnable))
    }

    /// Reads all three control/status registers.
    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot {
            control: self.control(),
            status: self.status(),
            irq_enable: self.irq_enable(),
        }
    }

    /// Stores the current control register in its shadow.
    pub fn save_control(&mut self) {
        self.saved_control = self.hw.read(Reg::Control);
    }

    /// The control register as saved by [`RegisterBlock::save_control`].
    pub fn saved_control(&self) -> Control {
        Control::from_bits_retain(self.saved_control)
    }

    fn update_control(&mut self, field: Control, value: Control) {
        let control = (self.control() - field) | value | Control::ENABLE;
        self.hw.write(Reg::Control, control.bits());
    }

    /// Sets the line speed.
    pub fn set_speed(&mut self, speed: Speed) {
        self.update_control(Control::SPEED, Control::from_bits_retain(speed.bits()));
    }

    /// Enables or disables internal loopback.
    pub fn set_loopback(&mut self, enable: bool) {
        let value = if enable {
            Control::LOOPBACK
        } else {
            Control::empty()
        };
        self.update_control(Control::LOOPBACK, value);
    }

    /// Sets the parity mode.
    pub fn set_parity(&mut self, parity: Parity) {
        let value = match parity {
            Parity::Even => Control::EVEN_PARITY,
            Parity::Odd => Control::empty(),
        };
        self.update_control(Control::EVEN_PARITY, value);
    }

    /// Enables or disables the interrupts in `irq`.
    pub fn set_irq(&mut self, irq: IrqEnable, enable: bool) {
        let current = self.irq_enable();
        let next = if enable { current | irq } else { current - irq };
        self.hw.write(Reg::IrqEnable, next.bits());
    }

    /// Returns `true` if every interrupt in `irq` is enabled.
    pub fn irq_enabled(&mut self, irq: IrqEnable) -> bool {
        self.irq_enable().contains(irq)
    }

    /// Line error bits of `captured`, or of the live status register when `None`.
    pub fn error_mask(&mut self, captured: Option<Status>) -> Status {
        let status = match captured {
            Some(status) => status,
            None => self.status(),
        };
        status & Status::ERRORS
    }

    /// Spins until the transmitter can take a byte, at most `timeout` status reads.
    ///
    /// Returns the status that showed the transmitter ready.
    pub fn wait_tx_ready(&mut self, timeout: u32) -> Result<Status, Error> {
        self.wait(timeout, |status| !status.contains(Status::TX_BUSY))
    }

    /// Spins until a received byte is available, at most `timeout` status reads.
    ///
    /// Returns the status that showed the byte.
    pub fn wait_rx_ready(&mut self, timeout: u32) -> Result<Status, Error> {
        self.wait(timeout, |status| status.contains(Status::RX_READY))
    }

    fn wait(&mut self, timeout: u32, ready: impl Fn(Status) -> bool) -> Result<Status, Error> {
        let mut remaining = timeout.max(1);
        loop {
            let status = self.status();
            if ready(status) {
                return Ok(status);
            }
            remaining -= 1;
            if remaining == 0 {
                return Err(Error::NotReady);
            }
        }
    }

    /// Writes the transmit holding register.
    pub fn write_data(&mut self, byte: u8) {
        self.hw.write(Reg::Data, byte);
    }

    /// Reads the receive holding register.
    pub fn read_data(&mut self) -> u8 {
        self.hw.read(Reg::Data)
    }

    /// Runs `f` with the interrupts in `irq` disabled, then restores the interrupt
    /// enable register to exactly what it was.
    ///
    /// The previous value is kept in the saved-IER shadow for the duration.
    pub fn with_irq_suspended<T>(&mut self, irq: IrqEnable, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = self.hw.read(Reg::IrqEnable);
        self.saved_ier = saved;
        let suspended = IrqEnable::from_bits_retain(saved) - irq;
        if suspended.bits() != saved {
            self.hw.write(Reg::IrqEnable, suspended.bits());
        }

        let result = f(self);

        if self.hw.read(Reg::IrqEnable) != saved {
            self.hw.write(Reg::IrqEnable, saved);
        }
        self.saved_ier = saved;
        result
    }

    /// The interrupt enable register as saved by the last
    /// [`RegisterBlock::with_irq_suspended`].
    pub fn saved_irq_enable(&self) -> IrqEnable {
        IrqEnable::from_bits_retain(self.saved_ier)
    }
}
