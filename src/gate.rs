//! Sticky bus fault state
//!
//! Every bus transaction of a [`GatedInterface`](crate::GatedInterface) passes
//! through an [`ErrorGate`]. Transport faults are never returned to the
//! caller; they are latched here and must be polled.
//!
//! | `last_error` | `check_enabled` | next transaction                      |
//! |--------------|-----------------|---------------------------------------|
//! | `None`       | any             | attempted, status recorded            |
//! | `Some(_)`    | `false`         | retried, status overwrites the fault  |
//! | `Some(_)`    | `true`          | suppressed, reads return zeros        |
//!
//! With checking enabled the first fault after a clean state is reported once
//! through a [`DiagnosticSink`].

use embedded_hal::i2c::ErrorKind;

/// Side channel that receives the device address when a fault is latched
///
/// Implement this for a display, LED pattern or log line. `()` discards
/// diagnostics.
pub trait DiagnosticSink {
    /// Show a byte, rendered as hex by the sink
    fn show_hex(&mut self, value: u8);
}

impl DiagnosticSink for () {
    fn show_hex(&mut self, _value: u8) {}
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn show_hex(&mut self, value: u8) {
        (**self).show_hex(value);
    }
}

/// Gate behaviour selected at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GateConfig {
    /// Fail fast: once a fault is latched, stop touching the bus
    ///
    /// When `false` (default) faulted transactions keep being retried and a
    /// later success clears the fault.
    pub check_enabled: bool,
}

impl GateConfig {
    /// Self-healing gate (retry after faults)
    pub const RETRY: Self = Self {
        check_enabled: false,
    };

    /// Fail-fast gate (suppress after the first fault)
    pub const CHECKED: Self = Self {
        check_enabled: true,
    };
}

/// What the gate allows for the next transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GateDecision {
    /// No fault latched, perform the transaction
    Attempt,
    /// Fault latched but checking disabled, perform it again
    Retry,
    /// Fault latched with checking enabled, skip the bus
    Suppress,
}

/// Latched fault state of one bus handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ErrorGate {
    last_error: Option<ErrorKind>,
    check_enabled: bool,
}

impl ErrorGate {
    /// Create a clean gate
    #[must_use]
    pub const fn new(config: GateConfig) -> Self {
        Self {
            last_error: None,
            check_enabled: config.check_enabled,
        }
    }

    /// Decide how the next transaction is handled
    #[must_use]
    pub const fn decide(&self) -> GateDecision {
        match (self.last_error, self.check_enabled) {
            (None, _) => GateDecision::Attempt,
            (Some(_), false) => GateDecision::Retry,
            (Some(_), true) => GateDecision::Suppress,
        }
    }

    /// Store the status of a performed transaction
    ///
    /// Returns `true` when this status latches a new fault while checking is
    /// enabled, i.e. exactly when a diagnostic must be shown.
    pub fn record(&mut self, status: Option<ErrorKind>) -> bool {
        let was_clean = self.last_error.is_none();
        self.last_error = status;
        was_clean && status.is_some() && self.check_enabled
    }

    /// Status of the last performed transaction (`None` = success)
    #[must_use]
    pub const fn last_error(&self) -> Option<ErrorKind> {
        self.last_error
    }

    /// Whether a fault is currently latched
    #[must_use]
    pub const fn is_faulted(&self) -> bool {
        self.last_error.is_some()
    }

    /// Whether fail-fast checking is enabled
    #[must_use]
    pub const fn check_enabled(&self) -> bool {
        self.check_enabled
    }

    /// Enable or disable fail-fast checking
    ///
    /// Disabling it while a fault is latched lets the next transaction retry.
    pub fn set_check_enabled(&mut self, enable: bool) {
        self.check_enabled = enable;
    }
}

impl Default for ErrorGate {
    fn default() -> Self {
        Self::new(GateConfig::default())
    }
}
