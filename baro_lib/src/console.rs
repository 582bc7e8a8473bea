// print!/println! over UART0. main() must initialize the UART and park
// the transmit half in CONSOLE_TX before the macros produce output;
// until then everything written here is dropped.

use core::fmt;
use embedded_hal::prelude::_embedded_hal_serial_Write;
use rp2040_hal as hal;
use rp2040_hal::gpio::bank0::{Gpio0, Gpio1};
use rp2040_hal::pac;

pub static mut CONSOLE_TX: Option<hal::uart::Writer<pac::UART0, ConsolePins>> = None;

pub type ConsolePins = (
    hal::gpio::Pin<Gpio0, hal::gpio::FunctionUart, hal::gpio::PullNone>,
    hal::gpio::Pin<Gpio1, hal::gpio::FunctionUart, hal::gpio::PullNone>,
);

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ($crate::console::_print(format_args!($($arg)*)));
}

#[macro_export]
macro_rules! println {
    ($fmt:expr) => ($crate::print!(concat!($fmt, "\n")));
    ($fmt:expr, $($arg:tt)*) => ($crate::print!(concat!($fmt, "\n"), $($arg)*));
}

pub fn _print(args: fmt::Arguments) {
    use core::fmt::Write;
    let _ = Console.write_fmt(args);
}

/// `fmt::Write` handle for the shared UART; also usable as the target
/// of the text renderer and the diagnostic stream.
pub struct Console;

impl core::fmt::Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.bytes() {
            write_byte(c);
        }
        Ok(())
    }
}

fn write_byte(c: u8) {
    unsafe {
        if let Some(writer) = CONSOLE_TX.as_mut() {
            let _ = nb::block!(writer.write(c));
        }
    }
}
