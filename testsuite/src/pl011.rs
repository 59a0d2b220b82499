//! PL011 UART0 of the LM3S6965 (QEMU) presented as a Port B register block.
//!
//! The driver's control and interrupt enable registers are kept as shadows. Control
//! writes are translated to the PL011 line control and control registers, interrupt
//! enable writes never reach the PL011 so no interrupt is ever raised. Status is
//! composed from the flag and receive status registers.

use core::ptr::{with_exposed_provenance, with_exposed_provenance_mut};

use portb::regs::{Control, Reg, Registers, Status};

const UART0_BASE: usize = 0x4000_C000;

const DR: usize = 0x000; // Data
const RSR: usize = 0x004; // Receive status / error clear
const FR: usize = 0x018; // Flags
const IBRD: usize = 0x024; // Integer baud divisor
const FBRD: usize = 0x028; // Fractional baud divisor
const LCRH: usize = 0x02C; // Line control
const CR: usize = 0x030; // Control

const RSR_FE: u32 = 1 << 0;
const RSR_PE: u32 = 1 << 1;
const RSR_OE: u32 = 1 << 3;

const FR_RXFE: u32 = 1 << 4;
const FR_TXFF: u32 = 1 << 5;

const LCRH_PEN: u32 = 1 << 1;
const LCRH_EPS: u32 = 1 << 2;
const LCRH_WLEN_8: u32 = 0b11 << 5;

const CR_UARTEN: u32 = 1 << 0;
const CR_LBE: u32 = 1 << 7;
const CR_TXE: u32 = 1 << 8;
const CR_RXE: u32 = 1 << 9;

/// UART clock of the emulated board.
const CLOCK_HZ: u32 = 12_000_000;

pub struct Pl011 {
    base: usize,
    control: u8,
    ier: u8,
}

impl Pl011 {
    /// UART0, the first `-serial` of QEMU.
    pub fn uart0() -> Self {
        Self {
            base: UART0_BASE,
            control: 0,
            ier: 0,
        }
    }

    fn read32(&self, offset: usize) -> u32 {
        let reg = with_exposed_provenance::<u32>(self.base + offset);
        // SAFETY: UART0 is mapped on the lm3s6965evb and only used through this value.
        unsafe { reg.read_volatile() }
    }

    fn write32(&mut self, offset: usize, value: u32) {
        let reg = with_exposed_provenance_mut::<u32>(self.base + offset);
        // SAFETY: See `read32`.
        unsafe { reg.write_volatile(value) }
    }

    fn apply_control(&mut self) {
        let control = Control::from_bits_retain(self.control);

        let baud = match (control & Control::SPEED).bits() {
            0x04 => 19_200,
            0x02 => 38_400,
            _ => 115_200,
        };
        // Divisor in 1/64ths: IBRD.FBRD = clock / (16 * baud).
        let divisor = (CLOCK_HZ * 4 + baud / 2) / baud;

        let mut lcrh = LCRH_WLEN_8 | LCRH_PEN;
        if control.contains(Control::EVEN_PARITY) {
            lcrh |= LCRH_EPS;
        }

        let mut cr = CR_TXE | CR_RXE;
        if control.contains(Control::ENABLE) {
            cr |= CR_UARTEN;
        }
        if control.contains(Control::LOOPBACK) {
            cr |= CR_LBE;
        }

        self.write32(CR, 0);
        self.write32(IBRD, divisor >> 6);
        self.write32(FBRD, divisor & 0x3F);
        // LCRH latches the divisors.
        self.write32(LCRH, lcrh);
        self.write32(CR, cr);
    }

    fn status(&self) -> Status {
        let flags = self.read32(FR);
        let errors = self.read32(RSR);

        let mut status = Status::empty();
        if flags & FR_RXFE == 0 {
            status |= Status::RX_READY;
        }
        if flags & FR_TXFF != 0 {
            status |= Status::TX_BUSY;
        }
        if errors & RSR_PE != 0 {
            status |= Status::PARITY_ERROR;
        }
        if errors & RSR_FE != 0 {
            status |= Status::FRAMING_ERROR;
        }
        if errors & RSR_OE != 0 {
            status |= Status::OVERRUN;
        }
        status
    }
}

impl Registers for Pl011 {
    fn read(&mut self, reg: Reg) -> u8 {
        match reg {
            Reg::Control => self.control,
            Reg::Status => self.status().bits(),
            Reg::IrqEnable => self.ier,
            Reg::Data => self.read32(DR) as u8,
        }
    }

    fn write(&mut self, reg: Reg, value: u8) {
        match reg {
            Reg::Control => {
                self.control = value;
                self.apply_control();
            }
            Reg::Status => self.write32(RSR, 0),
            Reg::IrqEnable => self.ier = value,
            Reg::Data => self.write32(DR, value as u32),
        }
    }
}
