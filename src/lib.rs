#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod calibration;
pub mod config;
pub mod device;
pub mod gate;
pub mod interface;
pub mod measurement;
pub mod registers;

// Re-export main types
pub use calibration::{CalibrationError, DEFAULT_CALIBRATION, LinearCalibration};
pub use config::{
    AdcResolution, AdcSamples, AdcSetting, BusVoltageRange, ConfigWord, Gain, Ina219Config,
    OperatingMode,
};
pub use device::{Ina219Driver, SETTLE_DELAY_US};
pub use gate::{DiagnosticSink, ErrorGate, GateConfig, GateDecision};
pub use interface::{GatedInterface, I2cInterface, ReadCompletion};
pub use measurement::{BusVoltageFlags, DeviceProfile, Measurements};
pub use registers::Register;

/// 7-bit I2C address of one INA219
///
/// The SEN0291 module selects one of four addresses with its A0/A1 DIP
/// switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceAddress(u8);

impl DeviceAddress {
    /// A0 = 0, A1 = 0
    pub const X40: Self = Self(0x40);
    /// A0 = 1, A1 = 0
    pub const X41: Self = Self(0x41);
    /// A0 = 0, A1 = 1
    pub const X44: Self = Self(0x44);
    /// A0 = 1, A1 = 1 (as shipped)
    pub const X45: Self = Self(0x45);
    /// Module default address (0x45)
    pub const DEFAULT: Self = Self::X45;

    /// Wrap a 7-bit address, rejecting values above 0x7F
    #[must_use]
    pub const fn new(address: u8) -> Option<Self> {
        if address <= 0x7F {
            Some(Self(address))
        } else {
            None
        }
    }

    /// Raw 7-bit address
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for DeviceAddress {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<DeviceAddress> for u8 {
    fn from(address: DeviceAddress) -> Self {
        address.0
    }
}

/// Driver errors
///
/// With a [`GatedInterface`] the bus error type is [`core::convert::Infallible`]
/// and transport faults are reported through the interface's error gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Communication error with the device
    Bus(E),
    /// ADC resolution below 12 bits requested together with averaging
    InvalidAdcConfig,
    /// Calibration requested with a device reading of zero
    ZeroDeviceReading,
    /// Calibration result does not fit the 16-bit register
    CalibrationOutOfRange,
}

impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Self::Bus(error)
    }
}

impl<E> Error<E> {
    pub(crate) const fn from_calibration(error: CalibrationError) -> Self {
        match error {
            CalibrationError::ZeroDeviceReading => Self::ZeroDeviceReading,
            CalibrationError::OutOfRange => Self::CalibrationOutOfRange,
        }
    }
}
