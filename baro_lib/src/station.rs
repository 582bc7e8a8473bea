//! The acquisition loop: initialize the sensor once, then read,
//! correct, present and sleep until a failure ends sampling.

use core::fmt::Write;

use embedded_hal::blocking::delay::DelayMs;

use crate::altitude::AltitudeFactor;
use crate::bmp280::{Bmp280, Error, Transport};
use crate::render::Render;

/// Settle time before the first poll, so the sensor's first conversion
/// in normal mode can finish.
const FIRST_CONVERSION_MS: u32 = 20;

pub struct StationConfig {
    pub altitude_m: f64,
    pub update_interval_ms: u32,
}

/// Why sampling ended. There is no retry path; both cases are final.
#[derive(Debug, PartialEq, Eq)]
pub enum Stop<E> {
    /// The sensor never became usable; nothing was read or presented.
    InitFailed(Error<E>),
    /// A read or compensation failure ended the loop after `samples`
    /// successfully presented readings.
    ReadFailed { samples: u32, cause: Error<E> },
}

/// Runs the station until the first failure. `diag` carries the
/// verbose per-sample console output; pass `None` for a quiet build.
pub fn run<T, R, D, W>(
    sensor: &mut Bmp280<T>,
    renderer: &mut R,
    delay: &mut D,
    mut diag: Option<&mut W>,
    config: &StationConfig,
) -> Stop<T::Error>
where
    T: Transport,
    R: Render,
    D: DelayMs<u32>,
    W: Write,
{
    if let Err(cause) = sensor.init() {
        return Stop::InitFailed(cause);
    }

    if let Some(out) = diag.as_mut() {
        if let Some(id) = sensor.chip_id() {
            let _ = writeln!(out, "chip-id: {:#04x}", id);
        }
        let _ = writeln!(out, "Temperature, Pressure");
    }

    let factor = AltitudeFactor::for_site(config.altitude_m);
    delay.delay_ms(FIRST_CONVERSION_MS);

    let mut samples = 0;
    loop {
        let sample = match sensor.read_sample() {
            Ok(sample) => sample,
            Err(cause) => return Stop::ReadFailed { samples, cause },
        };
        let pressure_hpa = factor.correct(sample.pressure_hpa);

        if let Some(out) = diag.as_mut() {
            let _ = writeln!(
                out,
                "{:.2} deg C, {:.2} hPa",
                sample.temperature_c, pressure_hpa
            );
        }
        renderer.render(sample.temperature_c, pressure_hpa);
        samples += 1;

        delay.delay_ms(config.update_interval_ms);
    }
}
