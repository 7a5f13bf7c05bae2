//! Measurement scaling
//!
//! Raw register counts are converted with the constants of a
//! [`DeviceProfile`]. The bus voltage register carries two status flags in its
//! low bits which are shifted out before scaling.

/// Scaling constants of one board variant
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceProfile {
    /// Bus voltage per count after removing the status bits (V)
    pub bus_voltage_lsb_v: f32,
    /// Shunt voltage per count (mV)
    pub shunt_voltage_lsb_mv: f32,
    /// Current per count (mA)
    pub current_lsb_ma: f32,
    /// Power per count (mW)
    pub power_lsb_mw: f32,
}

impl DeviceProfile {
    /// DFRobot SEN0291 Gravity I2C wattmeter
    ///
    /// Ships strapped to 0x45 ([`DeviceAddress::DEFAULT`](crate::DeviceAddress::DEFAULT)).
    /// With the default calibration of 4096 the current register counts 1 mA
    /// and the power register 20 mW.
    pub const SEN0291: Self = Self {
        bus_voltage_lsb_v: 0.004,
        shunt_voltage_lsb_mv: 1.0,
        current_lsb_ma: 1.0,
        power_lsb_mw: 20.0,
    };

    /// Bus voltage in volts from the raw register word
    #[must_use]
    pub fn bus_voltage_v(&self, raw: u16) -> f32 {
        f32::from(bus_voltage_counts(raw)) * self.bus_voltage_lsb_v
    }

    /// Shunt voltage in millivolts from the signed register value
    #[must_use]
    pub fn shunt_voltage_mv(&self, raw: i16) -> f32 {
        f32::from(raw) * self.shunt_voltage_lsb_mv
    }

    /// Current in milliamps from the signed register value
    #[must_use]
    pub fn current_ma(&self, raw: i16) -> f32 {
        f32::from(raw) * self.current_lsb_ma
    }

    /// Power in milliwatts from the signed register value
    #[must_use]
    pub fn power_mw(&self, raw: i16) -> f32 {
        f32::from(raw) * self.power_lsb_mw
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self::SEN0291
    }
}

/// Number of status bits below the bus voltage magnitude
pub const BUS_VOLTAGE_STATUS_BITS: u32 = 3;

/// Bus voltage magnitude with the status flags removed
#[must_use]
pub const fn bus_voltage_counts(raw: u16) -> u16 {
    raw >> BUS_VOLTAGE_STATUS_BITS
}

/// Status flags from the low bits of the bus voltage register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusVoltageFlags {
    /// OVF: power or current calculation overflowed
    pub math_overflow: bool,
    /// CNVR: a conversion completed since the last power read
    pub conversion_ready: bool,
}

impl BusVoltageFlags {
    /// Extract the flags from a raw bus voltage word
    #[must_use]
    pub const fn from_raw(raw: u16) -> Self {
        Self {
            math_overflow: raw & 0x0001 != 0,
            conversion_ready: raw & 0x0002 != 0,
        }
    }
}

/// One snapshot of all measurement registers in physical units
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurements {
    /// Bus voltage (IN- to GND) in volts
    pub bus_voltage_v: f32,
    /// Shunt voltage (IN+ to IN-) in millivolts
    pub shunt_voltage_mv: f32,
    /// Current in milliamps
    pub current_ma: f32,
    /// Power in milliwatts
    pub power_mw: f32,
    /// Status flags read with the bus voltage
    pub flags: BusVoltageFlags,
}

impl Measurements {
    /// Whether every quantity reads exactly zero
    ///
    /// A suppressed bus returns all-zero registers, so this is a hint to check
    /// the interface's error gate.
    #[must_use]
    pub fn is_all_zero(&self) -> bool {
        self.bus_voltage_v == 0.0
            && self.shunt_voltage_mv == 0.0
            && self.current_ma == 0.0
            && self.power_mw == 0.0
    }
}
