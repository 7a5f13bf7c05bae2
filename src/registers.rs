//! Register definitions for the INA219
//!
//! The INA219 exposes six 16-bit registers, all transferred MSB first. Only
//! the registers with internal structure are described through the register
//! DSL; the plain signed measurement registers (shunt voltage, power, current)
//! are read as raw words by the driver.
//!
//! ## Register Map
//! - **0x00** Configuration (unsigned, packed bit fields)
//! - **0x01** Shunt voltage (signed)
//! - **0x02** Bus voltage (unsigned, low 3 bits are status flags)
//! - **0x03** Power (signed)
//! - **0x04** Current (signed)
//! - **0x05** Calibration (unsigned, bit 0 always 0)

device_driver::create_device!(
    device_name: Ina219,
    dsl: {
        config {
            type RegisterAddressType = u8;
            type DefaultByteOrder = BE;
        }

        /// CONFIG - Configuration (0x00)
        /// Power-on value: 0x399F
        register Configuration {
            const ADDRESS = 0x00;
            const SIZE_BITS = 16;

            /// Operating mode (3 bits)
            mode: uint = 0..3,
            /// Shunt ADC resolution/averaging code (4 bits)
            sadc: uint = 3..7,
            /// Bus ADC resolution/averaging code (4 bits)
            badc: uint = 7..11,
            /// PGA gain code (0 = /1 .. 3 = /8)
            pga: uint = 11..13,
            /// Bus voltage range (0 = 16 V, 1 = 32 V)
            brng: uint = 13..14,
            reserved_14: uint = 14..15,
            /// Reset bit, self-clearing
            rst: bool = 15,
        },

        /// BUS_VOLTAGE - Bus Voltage (0x02)
        register BusVoltage {
            const ADDRESS = 0x02;
            const SIZE_BITS = 16;

            /// Math overflow flag (OVF)
            ovf: bool = 0,
            /// Conversion ready flag (CNVR)
            cnvr: bool = 1,
            reserved_2: uint = 2..3,
            /// Bus voltage in 4 mV steps
            bd: uint = 3..16,
        },

        /// CALIBRATION - Calibration (0x05)
        register Calibration {
            const ADDRESS = 0x05;
            const SIZE_BITS = 16;

            /// Calibration value (bit 0 is fixed at zero by the hardware)
            fs: uint = 0..16,
        }
    }
);

/// Generated register block, wrapped by [`Ina219Driver`](crate::Ina219Driver)
pub use Ina219 as RegisterDevice;

/// Register index on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// Configuration register (0x00)
    Configuration = 0x00,
    /// Shunt voltage register (0x01)
    ShuntVoltage = 0x01,
    /// Bus voltage register (0x02)
    BusVoltage = 0x02,
    /// Power register (0x03)
    Power = 0x03,
    /// Current register (0x04)
    Current = 0x04,
    /// Calibration register (0x05)
    Calibration = 0x05,
}

impl Register {
    /// Register index byte sent on the bus
    #[must_use]
    pub const fn address(self) -> u8 {
        self as u8
    }

    /// Whether the register holds a two's-complement value
    ///
    /// Shunt voltage, power and current are signed; configuration,
    /// bus voltage and calibration are unsigned.
    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::ShuntVoltage | Self::Power | Self::Current)
    }
}

impl TryFrom<u8> for Register {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::Configuration),
            0x01 => Ok(Self::ShuntVoltage),
            0x02 => Ok(Self::BusVoltage),
            0x03 => Ok(Self::Power),
            0x04 => Ok(Self::Current),
            0x05 => Ok(Self::Calibration),
            other => Err(other),
        }
    }
}
