//! Bus interface implementations for the INA219
//!
//! Both interfaces implement the `device-driver` register traits over an
//! `embedded-hal` I2C bus using the INA219 wire format:
//!
//! - write: `[register][value MSB][value LSB]`
//! - read: `[register]`, repeated start, then 2 bytes MSB first
//!
//! [`GatedInterface`] routes every transaction through an
//! [`ErrorGate`] and never fails; [`I2cInterface`] returns bus errors to the
//! caller.

use core::convert::Infallible;

use device_driver::RegisterInterface;
use embedded_hal::i2c::{Error as _, ErrorKind, I2c};

use crate::DeviceAddress;
use crate::gate::{DiagnosticSink, ErrorGate, GateConfig, GateDecision};

/// Longest frame written to the device: register index + 16-bit value
const MAX_FRAME: usize = 3;

fn frame(address: u8, write_data: &[u8]) -> ([u8; MAX_FRAME], usize) {
    let mut buffer = [0u8; MAX_FRAME];
    buffer[0] = address;
    let len = write_data.len().min(MAX_FRAME - 1);
    buffer[1..=len].copy_from_slice(&write_data[..len]);
    (buffer, len + 1)
}

/// Reports whether the last register read returned device data
///
/// A read-modify-write must not write back a value merged into a buffer that
/// never came from the device.
pub trait ReadCompletion {
    /// `true` if the most recent read reached the device and succeeded
    fn last_read_completed(&self) -> bool;
}

/// I2C interface that latches faults instead of returning them
///
/// Transport errors are recorded in the interface's [`ErrorGate`] and are
/// visible through [`last_error()`](Self::last_error). With checking enabled a
/// latched fault suppresses all further traffic: writes do nothing and reads
/// yield zeros.
pub struct GatedInterface<I2C, S = ()> {
    i2c: I2C,
    address: DeviceAddress,
    gate: ErrorGate,
    sink: S,
    read_completed: bool,
}

impl<I2C> GatedInterface<I2C> {
    /// Create a gated interface at the module's default address (0x45)
    ///
    /// # Example
    /// ```ignore
    /// let interface = GatedInterface::default(i2c);
    /// let mut wattmeter = Ina219Driver::new(interface);
    /// ```
    pub const fn default(i2c: I2C) -> Self {
        Self::new(i2c, DeviceAddress::DEFAULT, GateConfig::RETRY)
    }

    /// Create a gated interface without a diagnostic sink
    pub const fn new(i2c: I2C, address: DeviceAddress, config: GateConfig) -> Self {
        Self::with_sink(i2c, address, config, ())
    }
}

impl<I2C, S> GatedInterface<I2C, S> {
    /// Create a gated interface that reports latched faults to `sink`
    pub const fn with_sink(i2c: I2C, address: DeviceAddress, config: GateConfig, sink: S) -> Self {
        Self {
            i2c,
            address,
            gate: ErrorGate::new(config),
            sink,
            read_completed: true,
        }
    }

    /// Device address this interface talks to
    pub const fn address(&self) -> DeviceAddress {
        self.address
    }

    /// Status of the last performed transaction (`None` = success)
    pub const fn last_error(&self) -> Option<ErrorKind> {
        self.gate.last_error()
    }

    /// Current gate state
    pub const fn gate(&self) -> &ErrorGate {
        &self.gate
    }

    /// Mutable gate state, e.g. to toggle checking at runtime
    pub const fn gate_mut(&mut self) -> &mut ErrorGate {
        &mut self.gate
    }

    /// Consume the interface and return the I2C peripheral
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C, S> GatedInterface<I2C, S>
where
    I2C: I2c,
    S: DiagnosticSink,
{
    /// Run one bus operation under the gate
    ///
    /// Returns `true` only if the operation was performed and succeeded.
    fn transact<F>(&mut self, op: F) -> bool
    where
        F: FnOnce(&mut I2C, u8) -> Result<(), I2C::Error>,
    {
        let address = self.address.get();
        if self.gate.decide() == GateDecision::Suppress {
            #[cfg(feature = "defmt")]
            defmt::trace!("INA219 {=u8:#04x}: transaction suppressed", address);
            return false;
        }

        let status = op(&mut self.i2c, address).err().map(|e| e.kind());
        if self.gate.record(status) {
            #[cfg(feature = "defmt")]
            defmt::warn!("INA219 {=u8:#04x}: bus fault latched: {}", address, status);
            self.sink.show_hex(address);
        }
        status.is_none()
    }

    /// Write raw bytes to the device
    ///
    /// A no-op while a fault is latched with checking enabled.
    pub fn write(&mut self, bytes: &[u8]) {
        self.transact(|i2c, address| i2c.write(address, bytes));
    }

    /// Write `frame`, then read `buffer.len()` bytes with a repeated start
    ///
    /// The buffer is zero-filled when the transaction is suppressed or fails,
    /// and [`last_read_completed()`](ReadCompletion::last_read_completed)
    /// reports `false` until the next successful read.
    pub fn write_read(&mut self, frame: &[u8], buffer: &mut [u8]) {
        let ok = self.transact(|i2c, address| i2c.write_read(address, frame, buffer));
        if !ok {
            buffer.fill(0);
        }
        self.read_completed = ok;
    }

    /// Check whether the device acknowledges its address
    ///
    /// Writes the configuration register index and reports whether the gate is
    /// clean afterwards.
    pub fn probe(&mut self) -> bool {
        self.write(&[0x00]);
        !self.gate.is_faulted()
    }
}

impl<I2C, S> ReadCompletion for GatedInterface<I2C, S> {
    fn last_read_completed(&self) -> bool {
        self.read_completed
    }
}

impl<I2C, S> RegisterInterface for GatedInterface<I2C, S>
where
    I2C: I2c,
    S: DiagnosticSink,
{
    type Error = Infallible;
    type AddressType = u8;

    fn read_register(
        &mut self,
        address: Self::AddressType,
        _size_bits: u32,
        read_data: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.write_read(&[address], read_data);
        Ok(())
    }

    fn write_register(
        &mut self,
        address: Self::AddressType,
        _size_bits: u32,
        write_data: &[u8],
    ) -> Result<(), Self::Error> {
        let (buffer, len) = frame(address, write_data);
        self.write(&buffer[..len]);
        Ok(())
    }
}

/// Plain I2C interface that returns bus errors
pub struct I2cInterface<I2C> {
    i2c: I2C,
    address: DeviceAddress,
}

impl<I2C> I2cInterface<I2C> {
    /// Create a new I2C interface with the module's default address (0x45)
    pub const fn default(i2c: I2C) -> Self {
        Self {
            i2c,
            address: DeviceAddress::DEFAULT,
        }
    }

    /// Create a new I2C interface with a custom device address
    pub const fn new(i2c: I2C, address: DeviceAddress) -> Self {
        Self { i2c, address }
    }

    /// Device address this interface talks to
    pub const fn address(&self) -> DeviceAddress {
        self.address
    }

    /// Consume the interface and return the I2C peripheral
    pub fn release(self) -> I2C {
        self.i2c
    }
}

// Failed reads surface as errors before any write-back
impl<I2C> ReadCompletion for I2cInterface<I2C> {
    fn last_read_completed(&self) -> bool {
        true
    }
}

impl<I2C, E> RegisterInterface for I2cInterface<I2C>
where
    I2C: I2c<Error = E>,
{
    type Error = E;
    type AddressType = u8;

    fn read_register(
        &mut self,
        address: Self::AddressType,
        _size_bits: u32,
        read_data: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.i2c.write_read(self.address.get(), &[address], read_data)
    }

    fn write_register(
        &mut self,
        address: Self::AddressType,
        _size_bits: u32,
        write_data: &[u8],
    ) -> Result<(), Self::Error> {
        let (buffer, len) = frame(address, write_data);
        self.i2c.write(self.address.get(), &buffer[..len])
    }
}
