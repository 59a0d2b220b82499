#![no_std]
#![no_main]

use cortex_m_semihosting::hprintln;
use portb::{Config, IrqSignal, PortB, Speed};
use testsuite::pl011::Pl011;
use testsuite::{drain, entry, exit_failure, exit_success};

static PORT_IRQ: IrqSignal = IrqSignal::new();

#[entry]
fn main() -> ! {
    let config = Config::new().speed(Speed::Baud115200);
    let Ok(mut port) = PortB::<_>::init(Pl011::uart0(), &PORT_IRQ, config) else {
        hprintln!("init failed");
        exit_failure();
    };

    // Each request sends one byte of the head item.
    for n in 1..=3 {
        if let Err(err) = port.out_request(format_args!("line {}", n)) {
            hprintln!("out_request failed: {}", err);
            exit_failure();
        }
    }
    hprintln!("queued {} items, {} bytes", port.out_items(), port.out_bytes());

    match drain(&mut port) {
        Ok(completed) => hprintln!("sent {} items", completed),
        Err(err) => {
            hprintln!("send failed: {}", err);
            exit_failure();
        }
    }

    let stats = port.stats();
    hprintln!(
        "stats: {} items, {} bytes, item size {}",
        stats.max_items,
        stats.max_bytes,
        stats.max_item_size
    );

    let _uart = port.term();
    exit_success();
}
