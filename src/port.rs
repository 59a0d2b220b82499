use core::fmt::{self, Write as _};

use heapless::String;

use crate::queue::{
    DefaultQueue, InputQueue, OutputQueue, Received, RequestError, stored_size, until_nul,
};
use crate::regs::{IrqEnable, RegisterBlock, Registers, Snapshot, Status};
use crate::{Config, Error, IrqSignal, MAX_INPUT_ITEMS, MAX_OUTPUT_ITEM_SIZE, Step};

/// Which transfer currently holds the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// No item is in flight.
    #[default]
    Idle,
    /// An output item is being sent.
    Transmitting,
    /// An input line is being received.
    Receiving,
}

/// One direction of the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    /// Receive.
    Rx,
    /// Transmit.
    Tx,
}

impl Channel {
    const fn irq(self) -> IrqEnable {
        match self {
            Channel::Rx => IrqEnable::RX,
            Channel::Tx => IrqEnable::TX,
        }
    }
}

/// High-water marks of the output queue since [`PortB::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stats {
    /// Most items queued at once.
    pub max_items: usize,
    /// Most bytes queued at once.
    pub max_bytes: usize,
    /// Largest stored item.
    pub max_item_size: usize,
}

/// The debug console used by [`PortB::print`] and [`PortB::getchar`].
pub trait Console: fmt::Write {
    /// Blocks until a character is typed and returns it.
    fn read_byte(&mut self) -> u8;
}

/// Returned by [`PortB::init`] when the port reports line errors.
///
/// Hands the hardware back so the caller can retry.
#[derive(Debug)]
pub struct InitError<R> {
    /// The status register, masked to its line error bits.
    pub status: Status,
    /// The register implementation passed to [`PortB::init`].
    pub hw: R,
}

impl<R> fmt::Display for InitError<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "port reports line errors (status {:#04x})", self.status.bits())
    }
}

impl<R: fmt::Debug> core::error::Error for InitError<R> {}

/// The Port B driver.
///
/// Owns the register block, both request queues and the port direction. The only
/// state shared with the interrupt handler is the [`IrqSignal`].
///
/// ```no_run
/// use portb::{Config, IrqSignal, Mmio, PortB, Step};
///
/// static PORT_B_IRQ: IrqSignal = IrqSignal::new();
///
/// // SAFETY: Port B is mapped and not accessed elsewhere.
/// let hw = unsafe { Mmio::port_b() };
/// let Ok(mut port) = PortB::<_>::init(hw, &PORT_B_IRQ, Config::new()) else {
///     panic!("line errors");
/// };
///
/// port.out_request(format_args!("ready after {} ms", 12)).ok();
/// while let Ok(Step::Continue) = port.send(false) {}
/// ```
#[derive(Debug)]
pub struct PortB<'a, R, Q = DefaultQueue> {
    pub(crate) regs: RegisterBlock<R>,
    pub(crate) signal: &'a IrqSignal,
    pub(crate) config: Config,
    pub(crate) direction: Direction,
    pub(crate) output: Q,
    pub(crate) input: InputQueue<'a, MAX_INPUT_ITEMS>,
    stats: Stats,
}

impl<'a, R: Registers, Q: OutputQueue + Default> PortB<'a, R, Q> {
    /// Brings the port up with `config`.
    ///
    /// Applies the line settings, resets both queues, drops any stale interrupt and
    /// enables the interrupts `config` asks for. Fails if the port already reports
    /// line errors.
    pub fn init(hw: R, signal: &'a IrqSignal, config: Config) -> Result<Self, InitError<R>> {
        let mut regs = RegisterBlock::new(hw);
        regs.save_control();
        regs.set_parity(config.parity);
        regs.set_loopback(config.loopback);
        regs.set_speed(config.speed);

        let errors = regs.error_mask(None);
        if !errors.is_empty() {
            warn!("port reports line errors at init: {=u8:#x}", errors.bits());
            return Err(InitError {
                status: errors,
                hw: regs.into_inner(),
            });
        }

        signal.clear();
        regs.set_irq(IrqEnable::RX, config.rx_irq);
        regs.set_irq(IrqEnable::TX, config.tx_irq);

        info!(
            "port up: {=u32} baud, rx irq {=bool}, tx irq {=bool}",
            config.speed.baud(),
            config.rx_irq,
            config.tx_irq
        );
        Ok(Self {
            regs,
            signal,
            config,
            direction: Direction::Idle,
            output: Q::default(),
            input: InputQueue::new(),
            stats: Stats::default(),
        })
    }
}

impl<'a, R: Registers, Q: OutputQueue> PortB<'a, R, Q> {
    /// Shuts the port down and hands the hardware back.
    ///
    /// Disables both interrupts, retires an item left in flight and abandons every
    /// other request.
    pub fn term(mut self) -> R {
        self.regs.set_irq(IrqEnable::all(), false);
        if self.direction != Direction::Idle {
            self.retire(self.direction);
        }

        info!(
            "port down: max {=usize} items, {=usize} bytes, item size {=usize}",
            self.stats.max_items,
            self.stats.max_bytes,
            self.stats.max_item_size
        );
        self.output.clear();
        self.input.clear();
        self.regs.into_inner()
    }

    /// Renders `args` and queues it as an output item with the line ending, then sends
    /// its first byte.
    ///
    /// ```ignore
    /// port.out_request(format_args!("temp {}", 21))?;
    /// ```
    pub fn out_request(&mut self, args: fmt::Arguments<'_>) -> Result<Step, Error> {
        if self.direction == Direction::Receiving {
            return Err(Error::Busy);
        }
        let errors = self.regs.error_mask(None);
        if !errors.is_empty() {
            return Err(Error::Line(errors));
        }

        let mut item = String::<MAX_OUTPUT_ITEM_SIZE>::new();
        item.write_fmt(args).map_err(|_| Error::Overflow)?;
        self.push(item.as_bytes(), true, false)?;
        if self.output.is_empty() {
            return Err(Error::Empty);
        }

        match self.send(true) {
            Err(Error::NotReady) => Ok(Step::Continue),
            result => result,
        }
    }

    /// Queues a pre-rendered output item without sending anything.
    ///
    /// The item ends at its first NUL. With `newline` the configured line ending is
    /// appended unless the item already ends with it. With `log` the queue contents
    /// are traced afterwards.
    pub fn push(&mut self, item: &[u8], newline: bool, log: bool) -> Result<(), Error> {
        let item = until_nul(item);
        if self.config.skip_empty && matches!(item, [] | [b'\n'] | [b'\r'] | [b'\t']) {
            debug!("dropped empty item");
            return Ok(());
        }

        let ending = self.config.line_ending.as_bytes();
        let suffix: &[u8] = if newline && !item.ends_with(ending) {
            ending
        } else {
            &[]
        };
        if item.is_empty() && suffix.is_empty() {
            return Ok(());
        }
        let size = stored_size(item, suffix);
        if size > MAX_OUTPUT_ITEM_SIZE {
            warn!("output item of {=usize} bytes too large", size);
            return Err(Error::Overflow);
        }

        let output = &mut self.output;
        let pushed = self
            .regs
            .with_irq_suspended(IrqEnable::TX, |_| output.push(item, suffix));
        if let Err(err) = pushed {
            warn!("output queue full, {=usize} bytes free", self.output.free());
            return Err(err);
        }

        self.stats.max_items = self.stats.max_items.max(self.output.len());
        self.stats.max_bytes = self.stats.max_bytes.max(self.output.bytes());
        self.stats.max_item_size = self.stats.max_item_size.max(size);
        debug!(
            "queued output item: {=usize} items, {=usize} bytes",
            self.output.len(),
            self.output.bytes()
        );

        if log {
            let (first, second) = self.output.bufs();
            trace!("output queue: {=[u8]:a} {=[u8]:a}", first, second);
        }
        Ok(())
    }

    /// Queues an input request for at most `max` bytes into `buf`, terminator
    /// included, then receives its first byte.
    ///
    /// `buf` may only be `None` when `max` is 0, which accepts a bare terminator.
    /// Completed requests are collected with [`PortB::take_received`]. A request
    /// that is refused hands `buf` back in the [`RequestError`]; once queued the
    /// buffer stays with the port until it is collected.
    pub fn in_request(
        &mut self,
        buf: Option<&'a mut [u8]>,
        max: usize,
    ) -> Result<Step, RequestError<'a>> {
        if buf.as_ref().map_or(max != 0, |buf| buf.len() < max) {
            return Err(RequestError::new(Error::Undefined, buf));
        }
        if self.direction == Direction::Transmitting {
            return Err(RequestError::new(Error::Busy, buf));
        }
        let errors = self.regs.error_mask(None);
        if !errors.is_empty() {
            return Err(RequestError::new(Error::Line(errors), buf));
        }

        let named = buf.is_some();
        let input = &mut self.input;
        self.regs
            .with_irq_suspended(IrqEnable::RX, |_| input.push(buf.unwrap_or_default(), max))
            .map_err(|err| RequestError::new(err.error, err.buf.filter(|_| named)))?;
        debug!("queued input request of {=usize} bytes", max);

        self.receive(true)
            .map_err(|error| RequestError::new(error, None))
    }

    /// Takes the oldest completed input request.
    pub fn take_received(&mut self) -> Option<Received<'a>> {
        self.input.take_received()
    }

    /// Returns `true` if the interrupt for `channel` is enabled.
    pub fn is_irq_enabled(&mut self, channel: Channel) -> bool {
        self.regs.irq_enabled(channel.irq())
    }

    /// Enables or disables the interrupt for `channel`.
    pub fn set_irq(&mut self, channel: Channel, enable: bool) {
        debug!("irq {} {=bool}", channel, enable);
        self.regs.set_irq(channel.irq(), enable);
    }

    /// Which transfer currently holds the port.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Number of queued output items.
    pub fn out_items(&self) -> usize {
        self.output.len()
    }

    /// Bytes held by queued output items.
    pub fn out_bytes(&self) -> usize {
        self.output.bytes()
    }

    /// Number of input requests waiting for their terminator.
    pub fn in_items(&self) -> usize {
        self.input.len()
    }

    /// Queue high-water marks.
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Reads the control, status and interrupt enable registers.
    pub fn registers(&mut self) -> Snapshot {
        self.regs.snapshot()
    }

    /// The control register as found by [`PortB::init`].
    pub fn saved_control(&self) -> crate::regs::Control {
        self.regs.saved_control()
    }

    /// Writes `log` to the debug console with the port's interrupts suspended.
    pub fn print<C: Console>(&mut self, console: &mut C, log: &str) -> fmt::Result {
        self.regs
            .with_irq_suspended(IrqEnable::all(), |_| console.write_str(log))
    }

    /// Reads one character from the debug console with the port's interrupts
    /// suspended.
    pub fn getchar<C: Console>(&mut self, console: &mut C) -> u8 {
        self.regs
            .with_irq_suspended(IrqEnable::all(), |_| console.read_byte())
    }

    /// Ends the transfer in `direction`: flushes its head item and frees the port.
    pub(crate) fn retire(&mut self, direction: Direction) {
        match direction {
            Direction::Transmitting => self.output.pop(),
            Direction::Receiving => self.input.complete(),
            Direction::Idle => {}
        }
        self.direction = Direction::Idle;
        debug!("retired {}", direction);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::queue::ShiftQueue;
    use crate::regs::{Control, Reg, Speed};
    use crate::sim::Sim;

    type TestPort<'a> = PortB<'a, &'a Sim, ShiftQueue<64>>;

    fn port<'a>(sim: &'a Sim, signal: &'a IrqSignal, config: Config) -> TestPort<'a> {
        PortB::init(sim, signal, config.timeout(8)).unwrap()
    }

    struct TestConsole<'a> {
        sim: &'a Sim,
        out: String<32>,
        ier_seen: u8,
    }

    impl fmt::Write for TestConsole<'_> {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            let mut hw = self.sim;
            self.ier_seen = hw.read(Reg::IrqEnable);
            self.out.push_str(s).map_err(|_| fmt::Error)
        }
    }

    impl Console for TestConsole<'_> {
        fn read_byte(&mut self) -> u8 {
            let mut hw = self.sim;
            self.ier_seen = hw.read(Reg::IrqEnable);
            b'?'
        }
    }

    #[test]
    fn init_applies_line_settings() {
        let sim = Sim::new();
        let signal = IrqSignal::new();
        signal.raise(Status::RX_READY.bits());
        let config = Config::new().speed(Speed::Baud19200).rx_irq(true);
        let mut port = port(&sim, &signal, config);

        assert!(!signal.is_raised());
        let regs = port.registers();
        assert_eq!(
            regs.control,
            Control::ENABLE | Control::EVEN_PARITY | Control::from_bits_retain(0x04)
        );
        assert_eq!(regs.irq_enable, IrqEnable::RX);
        assert!(port.is_irq_enabled(Channel::Rx));
        assert!(!port.is_irq_enabled(Channel::Tx));
        assert_eq!(port.saved_control(), Control::empty());
    }

    #[test]
    fn init_with_line_errors_returns_hardware() {
        let sim = Sim::new();
        let signal = IrqSignal::new();
        sim.set_line_errors(Status::FRAMING_ERROR);

        signal.raise(Status::RX_READY.bits());

        let config = Config::new().rx_irq(true).tx_irq(true);
        let err = TestPort::init(&sim, &signal, config).unwrap_err();
        assert_eq!(err.status, Status::FRAMING_ERROR);
        assert!(core::ptr::eq(err.hw, &sim));
        let mut hw = err.hw;
        assert_eq!(hw.read(Reg::IrqEnable), 0);
        assert!(signal.is_raised());
    }

    #[test]
    fn term_disables_irqs_and_drops_item_in_flight() {
        let sim = Sim::new();
        let signal = IrqSignal::new();
        let mut port = port(&sim, &signal, Config::new().rx_irq(true).tx_irq(true));
        port.push(b"abc", false, false).unwrap();
        port.send(true).unwrap();
        assert_eq!(port.direction(), Direction::Transmitting);

        let mut hw = port.term();
        assert_eq!(hw.read(Reg::IrqEnable), 0);
        assert_eq!(&sim.sent()[..], b"a");
    }

    #[test]
    fn push_appends_line_ending_once() {
        let sim = Sim::new();
        let signal = IrqSignal::new();
        let mut port = port(&sim, &signal, Config::new());

        port.push(b"ab", true, false).unwrap();
        assert_eq!(port.out_bytes(), 5);
        port.push(b"cd\n\r", true, false).unwrap();
        assert_eq!(port.out_bytes(), 10);
        // Everything after a NUL is ignored.
        port.push(b"e\0fgh", false, true).unwrap();
        assert_eq!(port.out_bytes(), 12);
        assert_eq!(port.out_items(), 3);
    }

    #[test]
    fn empty_items_are_never_queued() {
        let sim = Sim::new();
        let signal = IrqSignal::new();
        let mut port = port(&sim, &signal, Config::new());
        port.push(b"", false, false).unwrap();
        port.push(b"\0abc", false, false).unwrap();
        assert_eq!(port.out_items(), 0);

        // A bare line ending is still a line.
        port.push(b"", true, false).unwrap();
        assert_eq!(port.out_items(), 1);
    }

    #[test]
    fn skip_empty_drops_lone_whitespace() {
        let sim = Sim::new();
        let signal = IrqSignal::new();
        let mut port = port(&sim, &signal, Config::new().skip_empty(true));
        for item in [&b""[..], b"\n", b"\r", b"\t"] {
            port.push(item, true, false).unwrap();
        }
        assert_eq!(port.out_items(), 0);
        assert_eq!(port.out_request(format_args!("")), Err(Error::Empty));

        port.push(b"\t\t", false, false).unwrap();
        assert_eq!(port.out_items(), 1);
    }

    #[test]
    fn oversized_items_overflow() {
        let sim = Sim::new();
        let signal = IrqSignal::new();
        let mut port = port(&sim, &signal, Config::new());

        assert_eq!(port.out_request(format_args!("{:1100}", "")), Err(Error::Overflow));
        assert_eq!(
            port.push(&[b'x'; MAX_OUTPUT_ITEM_SIZE], false, false),
            Err(Error::Overflow)
        );
        // Fits the item limit, not the 64-byte queue.
        assert_eq!(port.push(&[b'x'; 64], false, false), Err(Error::Overflow));
        assert_eq!(port.out_items(), 0);
        assert_eq!(port.stats(), Stats::default());
    }

    #[test]
    fn push_restores_tx_irq() {
        let sim = Sim::new();
        let signal = IrqSignal::new();
        let mut port = port(&sim, &signal, Config::new().tx_irq(true));
        port.push(b"a", false, false).unwrap();
        assert!(port.is_irq_enabled(Channel::Tx));
        assert_eq!(port.registers().irq_enable, IrqEnable::TX);
    }

    #[test]
    fn out_request_renders_and_starts_sending() {
        let sim = Sim::new();
        let signal = IrqSignal::new();
        let mut port = port(&sim, &signal, Config::new());

        assert_eq!(port.out_request(format_args!("t={}", 7)), Ok(Step::Continue));
        assert_eq!(&sim.sent()[..], b"t");
        while port.send(false) == Ok(Step::Continue) {}
        assert_eq!(&sim.sent()[..], b"t=7\n\r");
    }

    #[test]
    fn out_request_tolerates_busy_transmitter() {
        let sim = Sim::new();
        let signal = IrqSignal::new();
        let mut port = port(&sim, &signal, Config::new());
        sim.set_tx_busy(true);

        assert_eq!(port.out_request(format_args!("x")), Ok(Step::Continue));
        assert_eq!(port.out_items(), 1);
        assert!(sim.sent().is_empty());
    }

    #[test]
    fn out_request_reports_line_errors() {
        let sim = Sim::new();
        let signal = IrqSignal::new();
        let mut port = port(&sim, &signal, Config::new());
        sim.set_line_errors(Status::OVERRUN);

        assert_eq!(port.out_request(format_args!("x")), Err(Error::Line(Status::OVERRUN)));
        assert_eq!(port.out_items(), 0);
    }

    #[test]
    fn in_request_validates_buffer() {
        let sim = Sim::new();
        let signal = IrqSignal::new();
        let mut buf = [0u8; 2];
        let mut port = port(&sim, &signal, Config::new());

        assert_eq!(port.in_request(None, 1).map_err(Error::from), Err(Error::Undefined));
        let refused = port.in_request(Some(&mut buf[..]), 3).unwrap_err();
        assert_eq!(refused.error, Error::Undefined);
        assert_eq!(refused.buf.map(|buf| buf.len()), Some(2));
        assert_eq!(port.in_items(), 0);
    }

    #[test]
    fn in_request_slots_are_bounded() {
        let sim = Sim::new();
        let signal = IrqSignal::new();
        let mut port = port(&sim, &signal, Config::new());
        for _ in 0..MAX_INPUT_ITEMS {
            assert_eq!(port.in_request(None, 0), Ok(Step::Continue));
        }
        assert_eq!(port.in_request(None, 0).map_err(Error::from), Err(Error::Overflow));
        assert_eq!(port.in_items(), MAX_INPUT_ITEMS);
    }

    #[test]
    fn in_request_hands_buffer_back_on_overflow() {
        let sim = Sim::new();
        let signal = IrqSignal::new();
        let mut line = [0u8; 4];
        let mut port = port(&sim, &signal, Config::new());
        for _ in 0..MAX_INPUT_ITEMS {
            port.in_request(None, 0).unwrap();
        }

        let refused = port.in_request(Some(&mut line[..]), 4).unwrap_err();
        assert_eq!(refused.error, Error::Overflow);
        let Some(line) = refused.buf else {
            panic!("buffer kept by a refused request");
        };

        sim.feed(b"\r");
        assert_eq!(port.receive(false), Ok(Step::Complete));
        assert!(port.take_received().is_some());

        assert_eq!(port.in_request(Some(line), 4), Ok(Step::Continue));
        for _ in 1..MAX_INPUT_ITEMS {
            sim.feed(b"\r");
            assert_eq!(port.receive(false), Ok(Step::Complete));
            assert_eq!(port.take_received().unwrap().line(), b"");
        }
        sim.feed(b"ok\r");
        let steps: [_; 3] = core::array::from_fn(|_| port.receive(false));
        assert_eq!(steps, [Ok(Step::Continue), Ok(Step::Continue), Ok(Step::Complete)]);
        assert_eq!(port.take_received().unwrap().line(), b"ok");
    }

    #[test]
    fn stats_track_high_water_marks() {
        let sim = Sim::new();
        let signal = IrqSignal::new();
        let mut port = port(&sim, &signal, Config::new());
        port.push(b"abcdef", false, false).unwrap();
        port.push(b"x", false, false).unwrap();
        while port.send(false) != Ok(Step::Idle) {}
        port.push(b"y", false, false).unwrap();

        assert_eq!(
            port.stats(),
            Stats {
                max_items: 2,
                max_bytes: 9,
                max_item_size: 7,
            }
        );
    }

    #[test]
    fn set_irq_switches_one_channel() {
        let sim = Sim::new();
        let signal = IrqSignal::new();
        let mut port = port(&sim, &signal, Config::new());
        port.set_irq(Channel::Tx, true);
        assert!(port.is_irq_enabled(Channel::Tx));
        assert!(!port.is_irq_enabled(Channel::Rx));
        port.set_irq(Channel::Tx, false);
        assert!(!port.is_irq_enabled(Channel::Tx));
    }

    #[test]
    fn console_bridge_suspends_irqs() {
        let sim = Sim::new();
        let signal = IrqSignal::new();
        let mut port = port(&sim, &signal, Config::new().rx_irq(true).tx_irq(true));
        let mut console = TestConsole {
            sim: &sim,
            out: String::new(),
            ier_seen: 0xff,
        };

        port.print(&mut console, "regs ok").unwrap();
        assert_eq!(console.out, "regs ok");
        assert_eq!(console.ier_seen, 0);

        console.ier_seen = 0xff;
        assert_eq!(port.getchar(&mut console), b'?');
        assert_eq!(console.ier_seen, 0);
        assert_eq!(port.registers().irq_enable, IrqEnable::all());
    }
}
