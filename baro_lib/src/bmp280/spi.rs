//! SPI transport for the BMP280: chip-select framing and the
//! read/write bit convention on the register address.

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::spi::{Transfer, Write};
use embedded_hal::digital::v2::OutputPin;

use super::Transport;

/// Bit 7 of the address byte selects read (1) or write (0).
const READ_BIT: u8 = 0x80;

/// Exclusive owner of the sensor's SPI bus, chip-select line and a
/// blocking delay source. Chip-select is active low.
pub struct SpiTransport<SPI, CS, D> {
    spi: SPI,
    cs: CS,
    delay: D,
}

impl<SPI, CS, D, E> SpiTransport<SPI, CS, D>
where
    SPI: Transfer<u8, Error = E> + Write<u8, Error = E>,
    CS: OutputPin,
    D: DelayMs<u32>,
{
    /// Deasserts chip-select so the device stays idle until the first
    /// transaction.
    pub fn new(spi: SPI, mut cs: CS, delay: D) -> Self {
        let _ = cs.set_high();
        Self { spi, cs, delay }
    }
}

impl<SPI, CS, D, E> Transport for SpiTransport<SPI, CS, D>
where
    SPI: Transfer<u8, Error = E> + Write<u8, Error = E>,
    CS: OutputPin,
    D: DelayMs<u32>,
{
    type Error = E;

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    fn read(&mut self, register: u8, buffer: &mut [u8]) -> Result<(), E> {
        let _ = self.cs.set_low();
        let result = self
            .spi
            .write(&[register | READ_BIT])
            .and_then(|_| self.spi.transfer(buffer).map(|_| ()));
        let _ = self.cs.set_high();
        result
    }

    fn write(&mut self, register: u8, data: &[u8]) -> Result<(), E> {
        let _ = self.cs.set_low();
        let result = self
            .spi
            .write(&[register & !READ_BIT])
            .and_then(|_| self.spi.write(data));
        let _ = self.cs.set_high();
        result
    }
}
