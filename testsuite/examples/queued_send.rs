#![no_std]
#![no_main]

use cortex_m_semihosting::hprintln;
use portb::regs::Reg;
use portb::{Channel, Config, Error, IrqSignal, LineEnding, PortB, Registers, Step};
use testsuite::pl011::Pl011;
use testsuite::{entry, exit_failure, exit_success};

static PORT_IRQ: IrqSignal = IrqSignal::new();

#[entry]
fn main() -> ! {
    let config = Config::new()
        .tx_irq(true)
        .skip_empty(true)
        .line_ending(LineEnding::CrLf);
    let Ok(mut port) = PortB::<_>::init(Pl011::uart0(), &PORT_IRQ, config) else {
        hprintln!("init failed");
        exit_failure();
    };

    for item in [&b"first"[..], b"", b"\t", b"sec\0ond"] {
        if let Err(err) = port.push(item, true, true) {
            hprintln!("push failed: {}", err);
            exit_failure();
        }
    }
    hprintln!("queued {} items, {} bytes", port.out_items(), port.out_bytes());

    // The first byte of an idle port starts the chain. After that every byte waits
    // for an interrupt, raised here from the polled status.
    let mut completed = 0;
    let mut step = port.send(true);
    loop {
        match step {
            Ok(Step::Idle) => break,
            Ok(Step::Complete) => completed += 1,
            Ok(Step::Continue) | Err(Error::NotReady) => {}
            Err(err) => {
                hprintln!("send failed: {}", err);
                exit_failure();
            }
        }
        let status = port.registers().status;
        PORT_IRQ.raise(status.bits());
        step = port.send(false);
    }
    hprintln!("sent {} items", completed);
    hprintln!("tx irq enabled: {}", port.is_irq_enabled(Channel::Tx));

    let mut uart = port.term();
    hprintln!("irq enable after term: {:#04x}", uart.read(Reg::IrqEnable));
    exit_success();
}
