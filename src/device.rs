//! High-level driver API for the INA219
//!
//! This module provides the user-facing handle: configuration register
//! read-modify-write, raw register access with explicit signedness, scaled
//! measurements and single-point current calibration.

use device_driver::RegisterInterface;
use embedded_hal::i2c::{ErrorKind, I2c};

use crate::calibration::{CALIBRATION_MASK, LinearCalibration};
use crate::config::{AdcSetting, BusVoltageRange, ConfigWord, Gain, Ina219Config, OperatingMode};
use crate::gate::DiagnosticSink;
use crate::interface::{GatedInterface, ReadCompletion};
use crate::measurement::{BusVoltageFlags, DeviceProfile, Measurements};
use crate::registers::field_sets::Configuration;
use crate::registers::{Register, RegisterDevice};
use crate::Error;

/// Settle time after each configuration write during [`Ina219Driver::init`]
pub const SETTLE_DELAY_US: u32 = 100;

/// Main driver for the INA219
pub struct Ina219Driver<I> {
    device: RegisterDevice<I>,
    profile: DeviceProfile,
}

impl<I> Ina219Driver<I>
where
    I: RegisterInterface<AddressType = u8> + ReadCompletion,
{
    /// Create a driver using the SEN0291 scaling profile
    ///
    /// The INA219 has no identification register, so nothing is read here.
    /// Use [`init()`](Self::init) or [`configure()`](Self::configure) to bring
    /// the device into a known state.
    pub fn new(interface: I) -> Self {
        Self::with_profile(interface, DeviceProfile::SEN0291)
    }

    /// Create a driver with explicit scaling constants
    pub fn with_profile(interface: I, profile: DeviceProfile) -> Self {
        Self {
            device: RegisterDevice::new(interface),
            profile,
        }
    }

    /// Scaling profile in use
    pub const fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Reset and apply a full configuration field by field
    ///
    /// Each field is written with its own read-modify-write followed by a
    /// blocking settle delay of [`SETTLE_DELAY_US`]; the calibration register
    /// is programmed last.
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration to apply
    /// * `delay` - Delay provider implementing `embedded_hal::delay::DelayNs`
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAdcConfig`] before touching the device if either
    /// ADC setting cannot be encoded, or a bus error from the interface.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let mut wattmeter = Ina219Driver::new(GatedInterface::default(i2c));
    /// wattmeter.init(&Ina219Config::default(), &mut delay)?;
    /// ```
    pub fn init<D>(&mut self, config: &Ina219Config, delay: &mut D) -> Result<(), Error<I::Error>>
    where
        D: embedded_hal::delay::DelayNs,
    {
        if config.config_word().is_none() {
            return Err(Error::InvalidAdcConfig);
        }

        self.reset()?;
        delay.delay_us(SETTLE_DELAY_US);

        self.set_bus_range(config.bus_range)?;
        delay.delay_us(SETTLE_DELAY_US);
        self.set_gain(config.gain)?;
        delay.delay_us(SETTLE_DELAY_US);
        self.set_bus_adc(config.bus_adc)?;
        delay.delay_us(SETTLE_DELAY_US);
        self.set_shunt_adc(config.shunt_adc)?;
        delay.delay_us(SETTLE_DELAY_US);
        self.set_mode(config.mode)?;
        delay.delay_us(SETTLE_DELAY_US);

        self.write_calibration(config.calibration)
    }

    /// Overwrite the configuration and calibration registers without reading
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAdcConfig`] if either ADC setting cannot be
    /// encoded (nothing is written), or a bus error from the interface.
    pub fn configure(&mut self, config: &Ina219Config) -> Result<(), Error<I::Error>> {
        let word = config.config_word().ok_or(Error::InvalidAdcConfig)?;
        self.write_config(word)?;
        self.write_calibration(config.calibration)
    }

    /// Reset the device by writing `0x8000` to the configuration register
    ///
    /// This is a plain write, the current configuration is not read first.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn reset(&mut self) -> Result<(), Error<I::Error>> {
        self.write_config(ConfigWord::RESET)
    }

    /// Reset the device and program a calibration value
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn reset_with_calibration(&mut self, calibration: u16) -> Result<(), Error<I::Error>> {
        self.reset()?;
        self.write_calibration(calibration)
    }

    // ==================== RAW REGISTER ACCESS ====================

    /// Write a 16-bit value to a register (MSB first)
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn write_register(&mut self, register: Register, value: u16) -> Result<(), Error<I::Error>> {
        self.device
            .interface
            .write_register(register.address(), 16, &value.to_be_bytes())?;
        Ok(())
    }

    /// Read the two raw bytes of a register, MSB first
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_register_raw(&mut self, register: Register) -> Result<[u8; 2], Error<I::Error>> {
        let mut buffer = [0u8; 2];
        self.device
            .interface
            .read_register(register.address(), 16, &mut buffer)?;
        Ok(buffer)
    }

    /// Read a register as an unsigned 16-bit value
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_u16(&mut self, register: Register) -> Result<u16, Error<I::Error>> {
        Ok(u16::from_be_bytes(self.read_register_raw(register)?))
    }

    /// Read a register as a two's-complement 16-bit value
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_i16(&mut self, register: Register) -> Result<i16, Error<I::Error>> {
        Ok(i16::from_be_bytes(self.read_register_raw(register)?))
    }

    // ==================== CONFIGURATION ====================

    /// Read the configuration register
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_config(&mut self) -> Result<ConfigWord, Error<I::Error>> {
        Ok(ConfigWord::from_bits(self.read_u16(Register::Configuration)?))
    }

    /// Overwrite the configuration register
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn write_config(&mut self, word: ConfigWord) -> Result<(), Error<I::Error>> {
        self.write_register(Register::Configuration, word.bits())
    }

    /// Set the operating mode (bits 0-2)
    ///
    /// Like every field setter this is a read-modify-write; nothing is written
    /// if the read does not complete.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn set_mode(&mut self, mode: OperatingMode) -> Result<(), Error<I::Error>> {
        self.update_config(|w| w.set_mode(mode as u8))
    }

    /// Set the bus voltage range (bit 13)
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn set_bus_range(&mut self, range: BusVoltageRange) -> Result<(), Error<I::Error>> {
        self.update_config(|w| w.set_brng(range as u8))
    }

    /// Set the shunt PGA gain (bits 11-12)
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn set_gain(&mut self, gain: Gain) -> Result<(), Error<I::Error>> {
        self.update_config(|w| w.set_pga(gain as u8))
    }

    /// Set the bus ADC resolution/averaging (bits 7-10)
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAdcConfig`] without touching the device if a
    /// resolution below 12 bits is combined with averaging, or a bus error.
    pub fn set_bus_adc(&mut self, setting: AdcSetting) -> Result<(), Error<I::Error>> {
        let code = Self::adc_code(setting)?;
        self.update_config(|w| w.set_badc(code))
    }

    /// Set the shunt ADC resolution/averaging (bits 3-6)
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAdcConfig`] without touching the device if a
    /// resolution below 12 bits is combined with averaging, or a bus error.
    pub fn set_shunt_adc(&mut self, setting: AdcSetting) -> Result<(), Error<I::Error>> {
        let code = Self::adc_code(setting)?;
        self.update_config(|w| w.set_sadc(code))
    }

    /// Read-modify-write of the configuration register
    ///
    /// The write is skipped when the read did not return device data, so a
    /// failed read never clobbers the other fields and the fault stays latched.
    fn update_config<F>(&mut self, f: F) -> Result<(), Error<I::Error>>
    where
        F: FnOnce(&mut Configuration),
    {
        let mut reg = self.device.configuration().read()?;
        if !self.device.interface.last_read_completed() {
            #[cfg(feature = "defmt")]
            defmt::warn!("Configuration read failed, field update skipped");
            return Ok(());
        }
        f(&mut reg);
        self.device.configuration().write(|w| *w = reg)?;
        Ok(())
    }

    fn adc_code(setting: AdcSetting) -> Result<u8, Error<I::Error>> {
        setting.code().ok_or_else(|| {
            #[cfg(feature = "defmt")]
            defmt::warn!("Rejected ADC setting {}: averaging needs 12-bit resolution", setting);
            Error::InvalidAdcConfig
        })
    }

    // ==================== MEASUREMENTS ====================

    /// Read the raw bus voltage register (status bits included)
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_bus_voltage_raw(&mut self) -> Result<u16, Error<I::Error>> {
        self.read_u16(Register::BusVoltage)
    }

    /// Read the bus voltage (IN- to GND) in volts
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_bus_voltage_v(&mut self) -> Result<f32, Error<I::Error>> {
        let raw = self.read_bus_voltage_raw()?;
        Ok(self.profile.bus_voltage_v(raw))
    }

    /// Read the math overflow and conversion ready flags
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_bus_flags(&mut self) -> Result<BusVoltageFlags, Error<I::Error>> {
        let reg = self.device.bus_voltage().read()?;
        Ok(BusVoltageFlags {
            math_overflow: reg.ovf(),
            conversion_ready: reg.cnvr(),
        })
    }

    /// Read the raw signed shunt voltage register
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_shunt_voltage_raw(&mut self) -> Result<i16, Error<I::Error>> {
        self.read_i16(Register::ShuntVoltage)
    }

    /// Read the shunt voltage (IN+ to IN-) in millivolts
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_shunt_voltage_mv(&mut self) -> Result<f32, Error<I::Error>> {
        let raw = self.read_shunt_voltage_raw()?;
        Ok(self.profile.shunt_voltage_mv(raw))
    }

    /// Read the raw signed current register
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_current_raw(&mut self) -> Result<i16, Error<I::Error>> {
        self.read_i16(Register::Current)
    }

    /// Read the current in milliamps
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_current_ma(&mut self) -> Result<f32, Error<I::Error>> {
        let raw = self.read_current_raw()?;
        Ok(self.profile.current_ma(raw))
    }

    /// Read the raw signed power register
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_power_raw(&mut self) -> Result<i16, Error<I::Error>> {
        self.read_i16(Register::Power)
    }

    /// Read the power in milliwatts
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_power_mw(&mut self) -> Result<f32, Error<I::Error>> {
        let raw = self.read_power_raw()?;
        Ok(self.profile.power_mw(raw))
    }

    /// Read all measurement registers
    ///
    /// Power is read last; reading it clears the conversion ready flag on the
    /// device, which is captured with the bus voltage beforehand.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_measurements(&mut self) -> Result<Measurements, Error<I::Error>> {
        let bus_raw = self.read_bus_voltage_raw()?;
        let shunt_raw = self.read_shunt_voltage_raw()?;
        let current_raw = self.read_current_raw()?;
        let power_raw = self.read_power_raw()?;

        Ok(Measurements {
            bus_voltage_v: self.profile.bus_voltage_v(bus_raw),
            shunt_voltage_mv: self.profile.shunt_voltage_mv(shunt_raw),
            current_ma: self.profile.current_ma(current_raw),
            power_mw: self.profile.power_mw(power_raw),
            flags: BusVoltageFlags::from_raw(bus_raw),
        })
    }

    // ==================== CALIBRATION ====================

    /// Read the calibration register
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_calibration(&mut self) -> Result<u16, Error<I::Error>> {
        Ok(self.device.calibration().read()?.fs())
    }

    /// Write the calibration register (bit 0 is cleared)
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn write_calibration(&mut self, value: u16) -> Result<(), Error<I::Error>> {
        self.device.calibration().write(|w| {
            w.set_fs(value & CALIBRATION_MASK);
        })?;
        Ok(())
    }

    /// Single-point linear current calibration
    ///
    /// Scales the current calibration register by
    /// `reference_ma / device_ma` and writes the result back. A register
    /// reading of zero is replaced by
    /// [`DEFAULT_CALIBRATION`](crate::calibration::DEFAULT_CALIBRATION).
    ///
    /// # Arguments
    ///
    /// * `reference_ma` - Current shown by an external reference meter
    /// * `device_ma` - Current reported by this device at the same time
    ///
    /// # Returns
    ///
    /// The calibration value written to the device, or `None` if the register
    /// could not be read and nothing was written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroDeviceReading`] or
    /// [`Error::CalibrationOutOfRange`] without writing, or a bus error.
    pub fn linear_calibrate(
        &mut self,
        reference_ma: f32,
        device_ma: f32,
    ) -> Result<Option<u16>, Error<I::Error>> {
        // Rejected before the register is read
        if device_ma == 0.0 {
            return Err(Error::ZeroDeviceReading);
        }

        let prior = self.read_calibration()?;
        if !self.device.interface.last_read_completed() {
            #[cfg(feature = "defmt")]
            defmt::warn!("Calibration read failed, register left unchanged");
            return Ok(None);
        }

        let value = LinearCalibration::new(reference_ma, device_ma)
            .apply(prior)
            .map_err(Error::from_calibration)?;

        #[cfg(feature = "defmt")]
        defmt::debug!("Calibration {=u16} -> {=u16}", prior, value);

        self.write_calibration(value)?;
        Ok(Some(value))
    }

    // ==================== ACCESS ====================

    /// Consume the driver and return the underlying interface
    pub fn release(self) -> I {
        self.device.interface
    }

    /// Get a reference to the underlying interface
    pub const fn interface(&self) -> &I {
        &self.device.interface
    }

    /// Get a mutable reference to the underlying interface
    pub const fn interface_mut(&mut self) -> &mut I {
        &mut self.device.interface
    }

    /// Get a mutable reference to the underlying register device (for advanced usage)
    pub const fn device_mut(&mut self) -> &mut RegisterDevice<I> {
        &mut self.device
    }
}

impl<I2C, S> Ina219Driver<GatedInterface<I2C, S>>
where
    I2C: I2c,
    S: DiagnosticSink,
{
    /// Status of the last performed bus transaction (`None` = success)
    pub const fn last_error(&self) -> Option<ErrorKind> {
        self.device.interface.last_error()
    }

    /// Whether a bus fault is latched
    ///
    /// While this is `true` with checking enabled, reads return zeros.
    pub const fn is_faulted(&self) -> bool {
        self.device.interface.gate().is_faulted()
    }

    /// Check whether the device acknowledges its address
    pub fn is_connected(&mut self) -> bool {
        self.device.interface.probe()
    }
}
