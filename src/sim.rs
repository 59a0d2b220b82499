//! Register-level model of the controller for host tests.

use core::cell::{Cell, RefCell};

use heapless::{Deque, Vec};

use crate::regs::{Reg, Registers, Status};

/// Answers register accesses from plain state. Receive bytes are queued with
/// [`Sim::feed`], transmitted bytes are collected for [`Sim::sent`].
#[derive(Debug, Default)]
pub struct Sim {
    control: Cell<u8>,
    ier: Cell<u8>,
    tx_busy: Cell<bool>,
    errors: Cell<Status>,
    rx: RefCell<Deque<u8, 64>>,
    tx: RefCell<Vec<u8, 256>>,
    status_reads: Cell<usize>,
}

impl Sim {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&self, bytes: &[u8]) {
        let mut rx = self.rx.borrow_mut();
        for &byte in bytes {
            rx.push_back(byte).unwrap();
        }
    }

    pub fn set_tx_busy(&self, busy: bool) {
        self.tx_busy.set(busy);
    }

    pub fn set_line_errors(&self, errors: Status) {
        self.errors.set(errors & Status::ERRORS);
    }

    pub fn sent(&self) -> Vec<u8, 256> {
        self.tx.borrow().clone()
    }

    pub fn pending_rx(&self) -> usize {
        self.rx.borrow().len()
    }

    pub fn status_reads(&self) -> usize {
        self.status_reads.get()
    }

    pub fn status(&self) -> Status {
        let mut status = self.errors.get();
        if !self.rx.borrow().is_empty() {
            status |= Status::RX_READY;
        }
        if self.tx_busy.get() {
            status |= Status::TX_BUSY;
        }
        status
    }
}

impl Registers for &Sim {
    fn read(&mut self, reg: Reg) -> u8 {
        match reg {
            Reg::Control => self.control.get(),
            Reg::Status => {
                self.status_reads.set(self.status_reads.get() + 1);
                self.status().bits()
            }
            Reg::IrqEnable => self.ier.get(),
            Reg::Data => self.rx.borrow_mut().pop_front().unwrap_or(0),
        }
    }

    fn write(&mut self, reg: Reg, value: u8) {
        match reg {
            Reg::Control => self.control.set(value),
            Reg::Status => {}
            Reg::IrqEnable => self.ier.set(value),
            Reg::Data => self.tx.borrow_mut().push(value).unwrap(),
        }
    }
}
