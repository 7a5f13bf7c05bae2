//! Single-point linear current calibration
//!
//! The current measurement error of the module is dominated by the tolerance
//! of the shunt resistor (about 3% uncalibrated). Comparing one reading of the
//! device against an external reference meter and scaling the calibration
//! register by the ratio removes most of it.
//!
//! # Example
//!
//! ```ignore
//! // INA219 showed 950 mA while the multimeter showed 1000 mA
//! let written = wattmeter.linear_calibrate(1000.0, 950.0)?;
//! assert_eq!(written, Some(4310)); // starting from 4096
//! ```

/// Seed used when the calibration register reads as zero
///
/// A zero calibration register keeps the current and power registers at zero
/// forever, so scaling it would never converge.
pub const DEFAULT_CALIBRATION: u16 = 4096;

/// Bit 0 of the calibration register is not implemented in hardware
pub const CALIBRATION_MASK: u16 = 0xFFFE;

/// Reasons a calibration cannot be computed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// The device reading was zero
    ZeroDeviceReading,
    /// The scaled value is negative, not finite, or exceeds 16 bits
    OutOfRange,
}

/// A reference-vs-device current pair taken at one operating point
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinearCalibration {
    /// Current measured by the external reference meter (mA)
    pub reference_ma: f32,
    /// Current reported by the device at the same time (mA)
    pub device_ma: f32,
}

impl LinearCalibration {
    /// Create a calibration point
    #[must_use]
    pub const fn new(reference_ma: f32, device_ma: f32) -> Self {
        Self {
            reference_ma,
            device_ma,
        }
    }

    /// Scale a prior calibration register value by `reference / device`
    ///
    /// A prior value of zero is replaced by [`DEFAULT_CALIBRATION`]. The result
    /// is truncated toward zero and bit 0 is cleared.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::ZeroDeviceReading`] if the device reading is
    /// zero and [`CalibrationError::OutOfRange`] if the result does not fit the
    /// register.
    pub fn apply(&self, prior: u16) -> Result<u16, CalibrationError> {
        if self.device_ma == 0.0 {
            return Err(CalibrationError::ZeroDeviceReading);
        }

        let prior = if prior == 0 {
            DEFAULT_CALIBRATION
        } else {
            prior
        };

        // The product of a 16-bit prior and an f32 reading is exact in f64
        let scaled = f64::from(prior) * f64::from(self.reference_ma) / f64::from(self.device_ma);
        if !scaled.is_finite() || scaled < 0.0 || scaled >= 65536.0 {
            return Err(CalibrationError::OutOfRange);
        }

        // Float to int casts truncate toward zero
        Ok((scaled as u16) & CALIBRATION_MASK)
    }
}
