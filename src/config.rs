//! Configuration register model
//!
//! The configuration register (0x00) packs five sub-fields into one 16-bit
//! word:
//!
//! ```text
//!  15  14  13  12 11  10  9  8  7  6  5  4  3  2  1  0
//! RST  -  BRNG  PG     BADC         SADC         MODE
//! ```
//!
//! [`ConfigWord`] is the pure value form used for full overwrites and for
//! inspecting a word read back from the device. Each `with_*` method replaces
//! exactly one field and leaves every other bit, reserved bits included,
//! untouched.

/// Bus voltage full-scale range (BRNG, bit 13)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusVoltageRange {
    /// 16 V full-scale
    V16 = 0,
    /// 32 V full-scale (power-on default)
    V32 = 1,
}

impl BusVoltageRange {
    /// Full-scale range in volts
    #[must_use]
    pub const fn volts(self) -> u8 {
        match self {
            Self::V16 => 16,
            Self::V32 => 32,
        }
    }

    pub(crate) const fn from_bits(bits: u8) -> Self {
        if bits & 0x01 == 0 { Self::V16 } else { Self::V32 }
    }
}

/// Shunt PGA gain and range (PG, bits 11-12)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gain {
    /// Gain 1, ±40 mV
    Div1 = 0,
    /// Gain /2, ±80 mV
    Div2 = 1,
    /// Gain /4, ±160 mV
    Div4 = 2,
    /// Gain /8, ±320 mV (power-on default)
    Div8 = 3,
}

impl Gain {
    /// Shunt voltage full-scale range in millivolts
    #[must_use]
    pub const fn range_mv(self) -> u16 {
        match self {
            Self::Div1 => 40,
            Self::Div2 => 80,
            Self::Div4 => 160,
            Self::Div8 => 320,
        }
    }

    pub(crate) const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::Div1,
            1 => Self::Div2,
            2 => Self::Div4,
            _ => Self::Div8,
        }
    }
}

/// ADC resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcResolution {
    /// 9-bit, 84 µs conversion
    Bits9 = 0,
    /// 10-bit, 148 µs conversion
    Bits10 = 1,
    /// 11-bit, 276 µs conversion
    Bits11 = 2,
    /// 12-bit, 532 µs conversion
    Bits12 = 3,
}

/// Number of samples averaged per result
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcSamples {
    /// Single sample (no averaging)
    S1 = 0,
    /// 2 samples
    S2 = 1,
    /// 4 samples
    S4 = 2,
    /// 8 samples
    S8 = 3,
    /// 16 samples
    S16 = 4,
    /// 32 samples
    S32 = 5,
    /// 64 samples
    S64 = 6,
    /// 128 samples
    S128 = 7,
}

impl AdcSamples {
    /// Number of samples averaged
    #[must_use]
    pub const fn count(self) -> u8 {
        1 << (self as u8)
    }

    const fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => Self::S1,
            1 => Self::S2,
            2 => Self::S4,
            3 => Self::S8,
            4 => Self::S16,
            5 => Self::S32,
            6 => Self::S64,
            _ => Self::S128,
        }
    }
}

/// Combined resolution/averaging request for one ADC (BADC or SADC)
///
/// Averaging is only available at 12-bit resolution, so a request for a lower
/// resolution together with more than one sample has no encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcSetting {
    /// Conversion resolution
    pub resolution: AdcResolution,
    /// Samples averaged per result
    pub samples: AdcSamples,
}

impl AdcSetting {
    /// 12-bit, single sample (power-on default)
    pub const DEFAULT: Self = Self::new(AdcResolution::Bits12, AdcSamples::S1);

    /// Create a setting from a resolution and sample count
    #[must_use]
    pub const fn new(resolution: AdcResolution, samples: AdcSamples) -> Self {
        Self {
            resolution,
            samples,
        }
    }

    /// Create a 12-bit averaging setting
    #[must_use]
    pub const fn averaged(samples: AdcSamples) -> Self {
        Self::new(AdcResolution::Bits12, samples)
    }

    /// Encode into the 4-bit field code
    ///
    /// Returns `None` when a resolution below 12 bits is combined with more
    /// than one sample.
    #[must_use]
    pub const fn code(self) -> Option<u8> {
        let resolution = self.resolution as u8;
        let samples = self.samples as u8;
        if resolution < AdcResolution::Bits12 as u8 {
            if samples > AdcSamples::S1 as u8 {
                return None;
            }
            Some(resolution)
        } else {
            Some(ADC_AVERAGING | samples)
        }
    }

    /// Decode a 4-bit field code
    ///
    /// With bit 3 clear the low two bits select the resolution (bit 2 is a
    /// don't-care); with bit 3 set the low three bits select the averaging
    /// count at 12-bit resolution.
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        if code & ADC_AVERAGING == 0 {
            let resolution = match code & 0x03 {
                0 => AdcResolution::Bits9,
                1 => AdcResolution::Bits10,
                2 => AdcResolution::Bits11,
                _ => AdcResolution::Bits12,
            };
            Self::new(resolution, AdcSamples::S1)
        } else {
            Self::averaged(AdcSamples::from_bits(code))
        }
    }

    /// Conversion time in microseconds (datasheet typical)
    #[must_use]
    pub const fn conversion_time_us(self) -> u32 {
        match self.resolution {
            AdcResolution::Bits9 => 84,
            AdcResolution::Bits10 => 148,
            AdcResolution::Bits11 => 276,
            AdcResolution::Bits12 => 532 * self.samples.count() as u32,
        }
    }
}

impl Default for AdcSetting {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Operating mode (MODE, bits 0-2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatingMode {
    /// Power-down
    PowerDown = 0,
    /// Shunt voltage, triggered
    ShuntTriggered = 1,
    /// Bus voltage, triggered
    BusTriggered = 2,
    /// Shunt and bus, triggered
    ShuntAndBusTriggered = 3,
    /// ADC off (disabled)
    AdcOff = 4,
    /// Shunt voltage, continuous
    ShuntContinuous = 5,
    /// Bus voltage, continuous
    BusContinuous = 6,
    /// Shunt and bus, continuous (power-on default)
    ShuntAndBusContinuous = 7,
}

impl OperatingMode {
    pub(crate) const fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => Self::PowerDown,
            1 => Self::ShuntTriggered,
            2 => Self::BusTriggered,
            3 => Self::ShuntAndBusTriggered,
            4 => Self::AdcOff,
            5 => Self::ShuntContinuous,
            6 => Self::BusContinuous,
            _ => Self::ShuntAndBusContinuous,
        }
    }

    /// Whether conversions run without an explicit trigger
    #[must_use]
    pub const fn is_continuous(self) -> bool {
        matches!(
            self,
            Self::ShuntContinuous | Self::BusContinuous | Self::ShuntAndBusContinuous
        )
    }
}

/// Fixed high bit of an ADC code selecting averaging mode
const ADC_AVERAGING: u8 = 0x08;

const MODE_SHIFT: u16 = 0;
const MODE_MASK: u16 = 0x07;
const SADC_SHIFT: u16 = 3;
const SADC_MASK: u16 = 0x0F;
const BADC_SHIFT: u16 = 7;
const BADC_MASK: u16 = 0x0F;
const PG_SHIFT: u16 = 11;
const PG_MASK: u16 = 0x03;
const BRNG_SHIFT: u16 = 13;
const BRNG_MASK: u16 = 0x01;

/// Raw 16-bit configuration register value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigWord(u16);

impl ConfigWord {
    /// Reset pattern: bit 15 set, everything else clear
    pub const RESET: Self = Self(0x8000);

    /// Register content after power-on or reset
    ///
    /// The ADC fields hold code `0x3` (12-bit, single sample). [`ConfigWord::pack`]
    /// encodes that setting as `0x8`, so it decodes to the same fields but never
    /// reproduces this word bit-for-bit.
    pub const POWER_ON_DEFAULT: Self = Self(0x399F);

    /// Wrap a raw register value
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Raw register value
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Pack all five fields into a fresh word (reserved and reset bits clear)
    ///
    /// Returns `None` if either ADC setting has no valid encoding.
    #[must_use]
    pub const fn pack(
        range: BusVoltageRange,
        gain: Gain,
        bus_adc: AdcSetting,
        shunt_adc: AdcSetting,
        mode: OperatingMode,
    ) -> Option<Self> {
        let (Some(bus), Some(shunt)) = (bus_adc.code(), shunt_adc.code()) else {
            return None;
        };
        Some(Self(
            ((range as u16) << BRNG_SHIFT)
                | ((gain as u16) << PG_SHIFT)
                | ((bus as u16) << BADC_SHIFT)
                | ((shunt as u16) << SADC_SHIFT)
                | ((mode as u16) << MODE_SHIFT),
        ))
    }

    const fn field(self, shift: u16, mask: u16) -> u8 {
        ((self.0 >> shift) & mask) as u8
    }

    const fn with_field(self, shift: u16, mask: u16, value: u8) -> Self {
        Self((self.0 & !(mask << shift)) | (((value as u16) & mask) << shift))
    }

    /// Bus voltage range field
    #[must_use]
    pub const fn bus_range(self) -> BusVoltageRange {
        BusVoltageRange::from_bits(self.field(BRNG_SHIFT, BRNG_MASK))
    }

    /// PGA gain field
    #[must_use]
    pub const fn gain(self) -> Gain {
        Gain::from_bits(self.field(PG_SHIFT, PG_MASK))
    }

    /// Raw 4-bit bus ADC code
    #[must_use]
    pub const fn bus_adc_code(self) -> u8 {
        self.field(BADC_SHIFT, BADC_MASK)
    }

    /// Raw 4-bit shunt ADC code
    #[must_use]
    pub const fn shunt_adc_code(self) -> u8 {
        self.field(SADC_SHIFT, SADC_MASK)
    }

    /// Decoded bus ADC setting
    #[must_use]
    pub const fn bus_adc(self) -> AdcSetting {
        AdcSetting::from_code(self.bus_adc_code())
    }

    /// Decoded shunt ADC setting
    #[must_use]
    pub const fn shunt_adc(self) -> AdcSetting {
        AdcSetting::from_code(self.shunt_adc_code())
    }

    /// Operating mode field
    #[must_use]
    pub const fn mode(self) -> OperatingMode {
        OperatingMode::from_bits(self.field(MODE_SHIFT, MODE_MASK))
    }

    /// Reset bit (bit 15)
    #[must_use]
    pub const fn is_reset(self) -> bool {
        self.0 & Self::RESET.0 != 0
    }

    /// Replace the bus voltage range field
    #[must_use]
    pub const fn with_bus_range(self, range: BusVoltageRange) -> Self {
        self.with_field(BRNG_SHIFT, BRNG_MASK, range as u8)
    }

    /// Replace the PGA gain field
    #[must_use]
    pub const fn with_gain(self, gain: Gain) -> Self {
        self.with_field(PG_SHIFT, PG_MASK, gain as u8)
    }

    /// Replace the bus ADC field
    ///
    /// Returns `None` (word unchanged by the caller) for an unencodable
    /// setting.
    #[must_use]
    pub const fn with_bus_adc(self, setting: AdcSetting) -> Option<Self> {
        match setting.code() {
            Some(code) => Some(self.with_field(BADC_SHIFT, BADC_MASK, code)),
            None => None,
        }
    }

    /// Replace the shunt ADC field
    #[must_use]
    pub const fn with_shunt_adc(self, setting: AdcSetting) -> Option<Self> {
        match setting.code() {
            Some(code) => Some(self.with_field(SADC_SHIFT, SADC_MASK, code)),
            None => None,
        }
    }

    /// Replace the operating mode field
    #[must_use]
    pub const fn with_mode(self, mode: OperatingMode) -> Self {
        self.with_field(MODE_SHIFT, MODE_MASK, mode as u8)
    }
}

impl From<ConfigWord> for u16 {
    fn from(word: ConfigWord) -> Self {
        word.0
    }
}

impl From<u16> for ConfigWord {
    fn from(bits: u16) -> Self {
        Self(bits)
    }
}

/// Full device configuration applied by `Ina219Driver::init`
///
/// The default matches the module's recommended start-up sequence:
/// 32 V range, gain /8, both ADCs at 12 bits averaging 8 samples, shunt and
/// bus continuous, calibration 4096.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ina219Config {
    /// Bus voltage range
    pub bus_range: BusVoltageRange,
    /// Shunt PGA gain
    pub gain: Gain,
    /// Bus ADC resolution/averaging
    pub bus_adc: AdcSetting,
    /// Shunt ADC resolution/averaging
    pub shunt_adc: AdcSetting,
    /// Operating mode
    pub mode: OperatingMode,
    /// Initial calibration register value (bit 0 is cleared on write)
    pub calibration: u16,
}

impl Default for Ina219Config {
    fn default() -> Self {
        Self {
            bus_range: BusVoltageRange::V32,
            gain: Gain::Div8,
            bus_adc: AdcSetting::averaged(AdcSamples::S8),
            shunt_adc: AdcSetting::averaged(AdcSamples::S8),
            mode: OperatingMode::ShuntAndBusContinuous,
            calibration: crate::calibration::DEFAULT_CALIBRATION,
        }
    }
}

impl Ina219Config {
    /// Packed configuration word for this configuration
    ///
    /// Returns `None` if either ADC setting has no valid encoding.
    #[must_use]
    pub const fn config_word(&self) -> Option<ConfigWord> {
        ConfigWord::pack(
            self.bus_range,
            self.gain,
            self.bus_adc,
            self.shunt_adc,
            self.mode,
        )
    }
}
