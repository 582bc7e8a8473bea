//! BMP280 temperature/pressure sensor driver.
//!
//! Register map, init sequence and compensation math follow the Bosch
//! datasheet. All bus traffic goes through a [`Transport`], so the
//! register protocol stays independent of the physical interface.

pub mod spi;

pub const ID_REG: u8 = 0xd0;
pub const CHIP_ID: u8 = 0x58;
pub const RESET_REG: u8 = 0xe0;
pub const RESET_CMD: u8 = 0xb6;
pub const CTRL_MEAS_REG: u8 = 0xf4;
pub const CONFIG_REG: u8 = 0xf5;
pub const PRESS_MSB_REG: u8 = 0xf7;

pub const CALIBRATION_OFFSET: u8 = 0x88;
pub const CALIBRATION_LEN: usize = 24;

/// Power-up settling time before the first register access.
/// The datasheet minimum is 2 ms.
const STARTUP_DELAY_MS: u32 = 5;
const RESET_DELAY_MS: u32 = 2;

/// Bus primitives the driver needs: a blocking delay and blocking
/// register reads/writes. Implementations own the bus exclusively.
pub trait Transport {
    type Error;

    fn delay_ms(&mut self, ms: u32);
    fn read(&mut self, register: u8, buffer: &mut [u8]) -> Result<(), Self::Error>;
    fn write(&mut self, register: u8, data: &[u8]) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    /// The bus transaction itself failed.
    Bus(E),
    /// The chip identifier register held an unexpected value.
    UnknownChip(u8),
    /// Compensation could not produce a value from the raw reading.
    Compensation,
}

impl<E> Error<E> {
    /// Small integer result code for console reports, following the
    /// vendor convention (-2 device not found, -4 communication
    /// failure, -5 compensation failure).
    pub fn rc(&self) -> i8 {
        match self {
            Error::UnknownChip(_) => -2,
            Error::Bus(_) => -4,
            Error::Compensation => -5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Oversampling {
    Skip,
    X1,
    X2,
    X4,
    X8,
    X16,
}

impl Oversampling {
    pub fn bits(self) -> u8 {
        match self {
            Oversampling::Skip => 0b000,
            Oversampling::X1 => 0b001,
            Oversampling::X2 => 0b010,
            Oversampling::X4 => 0b011,
            Oversampling::X8 => 0b100,
            Oversampling::X16 => 0b101,
        }
    }

    pub fn from_bits(bits: u8) -> Self {
        match bits {
            0b000 => Oversampling::Skip,
            0b001 => Oversampling::X1,
            0b010 => Oversampling::X2,
            0b011 => Oversampling::X4,
            0b100 => Oversampling::X8,
            _ => Oversampling::X16,
        }
    }
}

/// IIR filter coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Off,
    Coeff2,
    Coeff4,
    Coeff8,
    Coeff16,
}

impl Filter {
    pub fn bits(self) -> u8 {
        match self {
            Filter::Off => 0b000,
            Filter::Coeff2 => 0b001,
            Filter::Coeff4 => 0b010,
            Filter::Coeff8 => 0b011,
            Filter::Coeff16 => 0b100,
        }
    }

    pub fn from_bits(bits: u8) -> Self {
        match bits {
            0b000 => Filter::Off,
            0b001 => Filter::Coeff2,
            0b010 => Filter::Coeff4,
            0b011 => Filter::Coeff8,
            _ => Filter::Coeff16,
        }
    }
}

/// Standby time between conversions in normal mode; together with the
/// oversampling settings this fixes the output data rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandbyTime {
    Ms0_5,
    Ms62_5,
    Ms125,
    Ms250,
    Ms500,
    Ms1000,
    Ms2000,
    Ms4000,
}

impl StandbyTime {
    pub fn bits(self) -> u8 {
        match self {
            StandbyTime::Ms0_5 => 0b000,
            StandbyTime::Ms62_5 => 0b001,
            StandbyTime::Ms125 => 0b010,
            StandbyTime::Ms250 => 0b011,
            StandbyTime::Ms500 => 0b100,
            StandbyTime::Ms1000 => 0b101,
            StandbyTime::Ms2000 => 0b110,
            StandbyTime::Ms4000 => 0b111,
        }
    }

    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0b000 => StandbyTime::Ms0_5,
            0b001 => StandbyTime::Ms62_5,
            0b010 => StandbyTime::Ms125,
            0b011 => StandbyTime::Ms250,
            0b100 => StandbyTime::Ms500,
            0b101 => StandbyTime::Ms1000,
            0b110 => StandbyTime::Ms2000,
            _ => StandbyTime::Ms4000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerMode {
    Sleep = 0b00,
    Forced = 0b01,
    Normal = 0b11,
}

/// Measurement configuration as held in the 0xF4/0xF5 registers.
/// Read from the device, adjusted in memory, written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub temperature_oversampling: Oversampling,
    pub pressure_oversampling: Oversampling,
    pub filter: Filter,
    pub standby: StandbyTime,
}

/// One uncompensated 20-bit reading pair from a burst read.
#[derive(Debug, Clone, Copy)]
pub struct RawSample {
    pub temperature: i32,
    pub pressure: i32,
}

impl RawSample {
    fn from_bytes(b: &[u8; 6]) -> Self {
        let pressure = (b[0] as i32) << 12 | (b[1] as i32) << 4 | (b[2] as i32) >> 4;
        let temperature = (b[3] as i32) << 12 | (b[4] as i32) << 4 | (b[5] as i32) >> 4;
        Self {
            temperature,
            pressure,
        }
    }
}

/// A compensated reading in physical units.
#[derive(Debug, Clone, Copy)]
pub struct CalibratedSample {
    pub temperature_c: f64,
    pub pressure_hpa: f64,
}

/// Factory trim words, read once during init. `t_fine` carries the
/// temperature state the pressure formula depends on, so every sample
/// must run the temperature pass first.
#[derive(Debug, Clone, Copy)]
pub struct Calibration {
    dig_t1: u16,
    dig_t2: i16,
    dig_t3: i16,
    dig_p1: u16,
    dig_p2: i16,
    dig_p3: i16,
    dig_p4: i16,
    dig_p5: i16,
    dig_p6: i16,
    dig_p7: i16,
    dig_p8: i16,
    dig_p9: i16,
    t_fine: i32,
}

impl Calibration {
    pub fn from_bytes(b: &[u8; CALIBRATION_LEN]) -> Self {
        Self {
            dig_t1: u16::from_le_bytes([b[0], b[1]]),
            dig_t2: i16::from_le_bytes([b[2], b[3]]),
            dig_t3: i16::from_le_bytes([b[4], b[5]]),
            dig_p1: u16::from_le_bytes([b[6], b[7]]),
            dig_p2: i16::from_le_bytes([b[8], b[9]]),
            dig_p3: i16::from_le_bytes([b[10], b[11]]),
            dig_p4: i16::from_le_bytes([b[12], b[13]]),
            dig_p5: i16::from_le_bytes([b[14], b[15]]),
            dig_p6: i16::from_le_bytes([b[16], b[17]]),
            dig_p7: i16::from_le_bytes([b[18], b[19]]),
            dig_p8: i16::from_le_bytes([b[20], b[21]]),
            dig_p9: i16::from_le_bytes([b[22], b[23]]),
            t_fine: 0,
        }
    }

    /// Bosch 32-bit integer compensation; result in 0.01 degC steps.
    pub fn compensate_temperature(&mut self, adc_t: i32) -> i32 {
        let var1 = (((adc_t >> 3) - ((self.dig_t1 as i32) << 1)) * (self.dig_t2 as i32)) >> 11;
        let var2 = (((((adc_t >> 4) - (self.dig_t1 as i32))
            * ((adc_t >> 4) - (self.dig_t1 as i32)))
            >> 12)
            * (self.dig_t3 as i32))
            >> 14;
        self.t_fine = var1 + var2;
        (self.t_fine * 5 + 128) >> 8
    }

    /// Bosch 64-bit integer compensation; result in Pa. Returns `None`
    /// when the trim data cannot produce a value (`dig_p1 == 0`).
    pub fn compensate_pressure(&self, adc_p: i32) -> Option<u32> {
        let mut var1 = (self.t_fine as i64) - 128000;
        let mut var2 = var1 * var1 * (self.dig_p6 as i64);
        var2 += (var1 * (self.dig_p5 as i64)) << 17;
        var2 += (self.dig_p4 as i64) << 35;
        var1 = ((var1 * var1 * (self.dig_p3 as i64)) >> 8) + ((var1 * (self.dig_p2 as i64)) << 12);
        var1 = (((1i64 << 47) + var1) * (self.dig_p1 as i64)) >> 33;
        if var1 == 0 {
            return None;
        }
        let mut p = 1_048_576 - (adc_p as i64);
        p = (((p << 31) - var2) * 3125) / var1;
        var1 = ((self.dig_p9 as i64) * (p >> 13) * (p >> 13)) >> 25;
        var2 = ((self.dig_p8 as i64) * p) >> 19;
        p = ((p + var1 + var2) >> 8) + ((self.dig_p7 as i64) << 4);
        Some((p / 256) as u32)
    }
}

/// One BMP280 instance: the injected transport plus the runtime state
/// populated during init. Owned exclusively and passed by `&mut`.
pub struct Bmp280<T> {
    transport: T,
    chip_id: Option<u8>,
    cal: Option<Calibration>,
}

impl<T: Transport> Bmp280<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            chip_id: None,
            cal: None,
        }
    }

    /// Identifier read during a successful probe.
    pub fn chip_id(&self) -> Option<u8> {
        self.chip_id
    }

    /// Full startup sequence: settle, probe, read trim, configure,
    /// power up. Each step assumes the previous one completed, so the
    /// first failure aborts the whole sequence.
    pub fn init(&mut self) -> Result<(), Error<T::Error>> {
        self.transport.delay_ms(STARTUP_DELAY_MS);
        self.probe()?;

        let mut config = self.config()?;
        config.filter = Filter::Coeff2;
        config.temperature_oversampling = Oversampling::X4;
        config.pressure_oversampling = Oversampling::X4;
        config.standby = StandbyTime::Ms1000;
        self.set_config(&config)?;

        // the mode switch outcome is the init result
        self.set_power_mode(PowerMode::Normal)
    }

    fn probe(&mut self) -> Result<(), Error<T::Error>> {
        let mut id = [0u8; 1];
        self.transport.read(ID_REG, &mut id).map_err(Error::Bus)?;
        if id[0] != CHIP_ID {
            return Err(Error::UnknownChip(id[0]));
        }
        self.chip_id = Some(id[0]);

        self.reset()?;

        let mut trim = [0u8; CALIBRATION_LEN];
        self.transport
            .read(CALIBRATION_OFFSET, &mut trim)
            .map_err(Error::Bus)?;
        self.cal = Some(Calibration::from_bytes(&trim));
        Ok(())
    }

    /// Soft reset, then wait for the register file to come back.
    pub fn reset(&mut self) -> Result<(), Error<T::Error>> {
        self.transport
            .write(RESET_REG, &[RESET_CMD])
            .map_err(Error::Bus)?;
        self.transport.delay_ms(RESET_DELAY_MS);
        Ok(())
    }

    /// Current measurement configuration, burst-read from 0xF4..0xF5.
    pub fn config(&mut self) -> Result<Config, Error<T::Error>> {
        let mut regs = [0u8; 2];
        self.transport
            .read(CTRL_MEAS_REG, &mut regs)
            .map_err(Error::Bus)?;
        Ok(Config {
            temperature_oversampling: Oversampling::from_bits(regs[0] >> 5),
            pressure_oversampling: Oversampling::from_bits((regs[0] >> 2) & 0b111),
            standby: StandbyTime::from_bits(regs[1] >> 5),
            filter: Filter::from_bits((regs[1] >> 2) & 0b111),
        })
    }

    /// Write the configuration back, leaving the power mode bits alone.
    pub fn set_config(&mut self, config: &Config) -> Result<(), Error<T::Error>> {
        let value = (config.standby.bits() << 5) | (config.filter.bits() << 2);
        self.transport
            .write(CONFIG_REG, &[value])
            .map_err(Error::Bus)?;

        let osrs = (config.temperature_oversampling.bits() << 5)
            | (config.pressure_oversampling.bits() << 2);
        self.update_register(CTRL_MEAS_REG, 0b1111_1100, osrs)
    }

    pub fn set_power_mode(&mut self, mode: PowerMode) -> Result<(), Error<T::Error>> {
        self.update_register(CTRL_MEAS_REG, 0b0000_0011, mode as u8)
    }

    fn update_register(&mut self, register: u8, mask: u8, bits: u8) -> Result<(), Error<T::Error>> {
        let mut current = [0u8; 1];
        self.transport
            .read(register, &mut current)
            .map_err(Error::Bus)?;
        let value = (current[0] & !mask) | (bits & mask);
        self.transport.write(register, &[value]).map_err(Error::Bus)
    }

    /// One burst read at 0xF7 plus both compensation passes. The trim
    /// data bound at init is reused for every sample.
    pub fn read_sample(&mut self) -> Result<CalibratedSample, Error<T::Error>> {
        let mut buf = [0u8; 6];
        self.transport
            .read(PRESS_MSB_REG, &mut buf)
            .map_err(Error::Bus)?;
        let raw = RawSample::from_bytes(&buf);

        let cal = self.cal.as_mut().ok_or(Error::Compensation)?;
        let centi_celsius = cal.compensate_temperature(raw.temperature);
        let pascal = cal
            .compensate_pressure(raw.pressure)
            .ok_or(Error::Compensation)?;

        Ok(CalibratedSample {
            temperature_c: f64::from(centi_celsius) * 0.01,
            pressure_hpa: f64::from(pascal) * 0.01,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Calibration vector and raw readings from the BMP280 datasheet
    // (section 3.12); expected output 25.08 degC / 100653 Pa.
    const DATASHEET_TRIM: [u8; CALIBRATION_LEN] = [
        0x70, 0x6b, // dig_t1 = 27504
        0x43, 0x67, // dig_t2 = 26435
        0x18, 0xfc, // dig_t3 = -1000
        0x7d, 0x8e, // dig_p1 = 36477
        0x43, 0xd6, // dig_p2 = -10685
        0xd0, 0x0b, // dig_p3 = 3024
        0x27, 0x0b, // dig_p4 = 2855
        0x8c, 0x00, // dig_p5 = 140
        0xf9, 0xff, // dig_p6 = -7
        0x8c, 0x3c, // dig_p7 = 15500
        0xf8, 0xc6, // dig_p8 = -14600
        0x70, 0x17, // dig_p9 = 6000
    ];
    const DATASHEET_RAW_TEMP: i32 = 519888;
    const DATASHEET_RAW_PRESS: i32 = 415148;

    fn datasheet_burst() -> [u8; 6] {
        // 415148 = 0x655ac, 519888 = 0x7eed0, MSB-aligned 20-bit fields
        [0x65, 0x5a, 0xc0, 0x7e, 0xed, 0x00]
    }

    /// Simulated device behind the transport seam: a register file
    /// that answers the probe, serves trim and data bursts, and keeps
    /// written control registers for read-modify-write cycles.
    struct FakeDevice {
        chip_id: u8,
        ctrl_meas: u8,
        config: u8,
        data_reads: u32,
    }

    impl FakeDevice {
        fn new() -> Self {
            Self {
                chip_id: CHIP_ID,
                ctrl_meas: 0,
                config: 0,
                data_reads: 0,
            }
        }
    }

    impl Transport for FakeDevice {
        type Error = ();

        fn delay_ms(&mut self, _ms: u32) {}

        fn read(&mut self, register: u8, buffer: &mut [u8]) -> Result<(), ()> {
            match register {
                ID_REG => buffer[0] = self.chip_id,
                CALIBRATION_OFFSET => buffer.copy_from_slice(&DATASHEET_TRIM),
                CTRL_MEAS_REG => {
                    buffer[0] = self.ctrl_meas;
                    if buffer.len() > 1 {
                        buffer[1] = self.config;
                    }
                }
                CONFIG_REG => buffer[0] = self.config,
                PRESS_MSB_REG => {
                    self.data_reads += 1;
                    buffer.copy_from_slice(&datasheet_burst());
                }
                _ => buffer.fill(0),
            }
            Ok(())
        }

        fn write(&mut self, register: u8, data: &[u8]) -> Result<(), ()> {
            match register {
                CTRL_MEAS_REG => self.ctrl_meas = data[0],
                CONFIG_REG => self.config = data[0],
                _ => {}
            }
            Ok(())
        }
    }

    #[test]
    fn datasheet_vector_compensates_to_reference_values() {
        let mut cal = Calibration::from_bytes(&DATASHEET_TRIM);
        let centi = cal.compensate_temperature(DATASHEET_RAW_TEMP);
        assert_eq!(centi, 2508);

        let pascal = cal.compensate_pressure(DATASHEET_RAW_PRESS).unwrap();
        let hpa = f64::from(pascal) * 0.01;
        assert!((hpa - 1006.53).abs() < 0.1, "got {hpa} hPa");
    }

    #[test]
    fn zeroed_trim_fails_compensation() {
        let mut cal = Calibration::from_bytes(&[0u8; CALIBRATION_LEN]);
        cal.compensate_temperature(DATASHEET_RAW_TEMP);
        assert_eq!(cal.compensate_pressure(DATASHEET_RAW_PRESS), None);
    }

    #[test]
    fn init_programs_filter_oversampling_and_mode() {
        let mut sensor = Bmp280::new(FakeDevice::new());
        sensor.init().unwrap();

        // standby 1000 ms, filter coeff 2
        assert_eq!(sensor.transport.config, 0b101_001_00);
        // 4x temperature, 4x pressure, normal mode
        assert_eq!(sensor.transport.ctrl_meas, 0b011_011_11);
        assert_eq!(sensor.chip_id(), Some(CHIP_ID));
    }

    #[test]
    fn init_rejects_unknown_chip() {
        let mut device = FakeDevice::new();
        device.chip_id = 0x60;
        let mut sensor = Bmp280::new(device);

        assert_eq!(sensor.init(), Err(Error::UnknownChip(0x60)));
        // without trim data the compensation step cannot run
        assert_eq!(sensor.read_sample().unwrap_err(), Error::Compensation);
        assert_eq!(sensor.transport.data_reads, 1);
    }

    #[test]
    fn read_sample_scales_to_physical_units() {
        let mut sensor = Bmp280::new(FakeDevice::new());
        sensor.init().unwrap();

        let sample = sensor.read_sample().unwrap();
        assert!((sample.temperature_c - 25.08).abs() < 1e-9);
        assert!((sample.pressure_hpa - 1006.53).abs() < 0.1);
    }

    #[test]
    fn raw_sample_decodes_msb_aligned_fields() {
        let raw = RawSample::from_bytes(&datasheet_burst());
        assert_eq!(raw.pressure, DATASHEET_RAW_PRESS);
        assert_eq!(raw.temperature, DATASHEET_RAW_TEMP);
    }
}
