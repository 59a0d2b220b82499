#![no_std]
#![no_main]

use cortex_m_semihosting::hprintln;
use portb::{Config, Error, IrqSignal, PortB};
use testsuite::pl011::Pl011;
use testsuite::{entry, exit_failure, exit_success};

static PORT_IRQ: IrqSignal = IrqSignal::new();

#[entry]
fn main() -> ! {
    // Nothing is connected to the UART input, so every polled receive times out.
    let mut line = [0u8; 16];
    let config = Config::new().timeout(1_000);
    let Ok(mut port) = PortB::<_>::init(Pl011::uart0(), &PORT_IRQ, config) else {
        hprintln!("init failed");
        exit_failure();
    };

    let queued = port.in_request(Some(&mut line[..]), 16).map_err(Error::from);
    hprintln!("in_request: {:?}", queued);
    hprintln!("pending requests: {}", port.in_items());

    match port.receive(false) {
        Err(Error::NotReady) => hprintln!("receive: not ready"),
        other => {
            hprintln!("unexpected: {:?}", other);
            exit_failure();
        }
    }
    hprintln!("direction: {:?}", port.direction());
    hprintln!("undefined: {:?}", port.in_request(None, 4).map_err(Error::from));
    hprintln!("received: {}", port.take_received().is_some());

    let _uart = port.term();
    hprintln!("terminated");
    exit_success();
}
