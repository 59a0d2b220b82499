//! Driver configuration and capacity limits.

use crate::regs::{Parity, Speed};

/// Largest stored output item, including its line terminator and NUL.
pub const MAX_OUTPUT_ITEM_SIZE: usize = 1024;

/// Byte capacity of the default output queue.
pub const OUTPUT_SIZE: usize = 10 * MAX_OUTPUT_ITEM_SIZE;

/// Number of input request slots.
pub const MAX_INPUT_ITEMS: usize = 10;

/// Polling budget used when interrupts are disabled for a direction.
pub const DEFAULT_TIMEOUT: u32 = 1_000_000;

/// Received byte that terminates an input line.
pub const ENTER: u8 = 0x0D;

/// Line delimiter appended to output items pushed with `newline = true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineEnding {
    /// `"\n\r"`, what the board's terminal expects.
    #[default]
    LfCr,
    /// `"\r\n"`.
    CrLf,
    /// `"\r"` alone.
    Cr,
    /// `"\n"` alone.
    Lf,
}

impl LineEnding {
    /// The delimiter bytes.
    pub const fn as_bytes(self) -> &'static [u8] {
        match self {
            LineEnding::LfCr => b"\n\r",
            LineEnding::CrLf => b"\r\n",
            LineEnding::Cr => b"\r",
            LineEnding::Lf => b"\n",
        }
    }
}

/// Settings applied by [`PortB::init`](crate::PortB::init).
///
/// ```
/// use portb::{Config, LineEnding};
///
/// let config = Config::new()
///     .rx_irq(true)
///     .line_ending(LineEnding::CrLf)
///     .timeout(10_000);
/// assert!(config.rx_irq && !config.tx_irq);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Line speed.
    pub speed: Speed,
    /// Parity control mode.
    pub parity: Parity,
    /// Internal loopback.
    pub loopback: bool,
    /// Interrupt-driven receive.
    pub rx_irq: bool,
    /// Interrupt-driven transmit.
    pub tx_irq: bool,
    /// Spin budget for a polled byte transfer.
    pub timeout: u32,
    /// Delimiter appended by newline pushes.
    pub line_ending: LineEnding,
    /// Silently drop empty items and items that are a lone `\n`, `\r` or `\t`.
    pub skip_empty: bool,
    /// In interrupt mode, start each transmission with a `'\n'` that is not part of
    /// the queued item.
    pub lead_newline: bool,
}

impl Config {
    /// Even parity, no loopback, 38400 baud, both directions polled.
    pub const fn new() -> Self {
        Self {
            speed: Speed::Baud38400,
            parity: Parity::Even,
            loopback: false,
            rx_irq: false,
            tx_irq: false,
            timeout: DEFAULT_TIMEOUT,
            line_ending: LineEnding::LfCr,
            skip_empty: false,
            lead_newline: false,
        }
    }

    /// Sets the line speed.
    pub const fn speed(mut self, speed: Speed) -> Self {
        self.speed = speed;
        self
    }

    /// Sets the parity mode.
    pub const fn parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    /// Enables or disables loopback.
    pub const fn loopback(mut self, loopback: bool) -> Self {
        self.loopback = loopback;
        self
    }

    /// Enables or disables interrupt-driven receive.
    pub const fn rx_irq(mut self, enable: bool) -> Self {
        self.rx_irq = enable;
        self
    }

    /// Enables or disables interrupt-driven transmit.
    pub const fn tx_irq(mut self, enable: bool) -> Self {
        self.tx_irq = enable;
        self
    }

    /// Sets the polling budget.
    pub const fn timeout(mut self, timeout: u32) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the appended line delimiter.
    pub const fn line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Enables or disables empty-request suppression.
    pub const fn skip_empty(mut self, skip: bool) -> Self {
        self.skip_empty = skip;
        self
    }

    /// Enables or disables the leading newline in interrupt mode.
    pub const fn lead_newline(mut self, lead: bool) -> Self {
        self.lead_newline = lead;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
