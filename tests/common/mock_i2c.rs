//! Mock I2C bus simulating one INA219

use embedded_hal::i2c::{
    self, ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation as I2cOperation,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Records bus operations seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Bytes written to the device
    Write {
        /// Target address
        address: u8,
        /// Frame content
        bytes: Vec<u8>,
    },
    /// Bytes read from the device
    Read {
        /// Target address
        address: u8,
        /// Register pointer at the time of the read
        register: u8,
        /// Number of bytes read
        len: usize,
    },
}

/// Shared state for the mock bus (uses interior mutability)
#[derive(Debug)]
struct MockState {
    /// Address the simulated device answers on
    address: u8,

    /// Simulated 16-bit registers
    registers: HashMap<u8, u16>,

    /// Register pointer set by the last write
    pointer: u8,

    /// Successful operations log for verification
    operations: Vec<Operation>,

    /// Number of `transaction` calls, failed ones included
    transactions: usize,

    /// Failure injection
    fail_remaining: usize,
    fail_always: bool,
    fail_kind: ErrorKind,
}

impl MockState {
    fn new(address: u8) -> Self {
        let mut registers = HashMap::new();
        registers.insert(0x00, 0x399F);
        registers.insert(0x01, 0x0000);
        registers.insert(0x02, 0x0000);
        registers.insert(0x03, 0x0000);
        registers.insert(0x04, 0x0000);
        registers.insert(0x05, 0x0000);

        Self {
            address,
            registers,
            pointer: 0,
            operations: Vec::new(),
            transactions: 0,
            fail_remaining: 0,
            fail_always: false,
            fail_kind: ErrorKind::Bus,
        }
    }

    fn take_failure(&mut self) -> Option<ErrorKind> {
        if self.fail_always {
            return Some(self.fail_kind);
        }
        if self.fail_remaining > 0 {
            self.fail_remaining -= 1;
            return Some(self.fail_kind);
        }
        None
    }

    fn write(&mut self, address: u8, bytes: &[u8]) {
        if let Some(&register) = bytes.first() {
            self.pointer = register;
        }
        if let [register, hi, lo] = *bytes {
            let mut value = u16::from_be_bytes([hi, lo]);
            // RST self-clears and restores the power-on configuration
            if register == 0x00 && value & 0x8000 != 0 {
                value = 0x399F;
            }
            self.registers.insert(register, value);
        }
        self.operations.push(Operation::Write {
            address,
            bytes: bytes.to_vec(),
        });
    }

    fn read(&mut self, address: u8, buffer: &mut [u8]) {
        let value = self.registers.get(&self.pointer).copied().unwrap_or(0);
        let bytes = value.to_be_bytes();
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = bytes.get(i).copied().unwrap_or(0);
        }
        self.operations.push(Operation::Read {
            address,
            register: self.pointer,
            len: buffer.len(),
        });
    }
}

/// Mock I2C bus for testing
#[derive(Clone)]
pub struct MockI2c {
    state: Rc<RefCell<MockState>>,
}

impl MockI2c {
    /// Create a mock device answering on 0x45
    pub fn new() -> Self {
        Self::with_address(0x45)
    }

    /// Create a mock device answering on `address`
    pub fn with_address(address: u8) -> Self {
        Self {
            state: Rc::new(RefCell::new(MockState::new(address))),
        }
    }

    /// Set a register value
    pub fn set_register(&self, register: u8, value: u16) {
        self.state.borrow_mut().registers.insert(register, value);
    }

    /// Set a signed register value
    pub fn set_register_signed(&self, register: u8, value: i16) {
        self.set_register(register, value as u16);
    }

    /// Get a register value
    pub fn get_register(&self, register: u8) -> u16 {
        self.state
            .borrow()
            .registers
            .get(&register)
            .copied()
            .unwrap_or(0)
    }

    /// Fail the next `count` transactions with `kind`
    pub fn fail_next(&self, count: usize, kind: ErrorKind) {
        let mut state = self.state.borrow_mut();
        state.fail_remaining = count;
        state.fail_kind = kind;
    }

    /// Fail every transaction until disabled
    pub fn set_failing(&self, enable: bool) {
        self.state.borrow_mut().fail_always = enable;
    }

    /// Get the successful operations log
    pub fn operations(&self) -> Vec<Operation> {
        self.state.borrow().operations.clone()
    }

    /// Clear the operations log and transaction counter
    pub fn clear_operations(&self) {
        let mut state = self.state.borrow_mut();
        state.operations.clear();
        state.transactions = 0;
    }

    /// Number of times the transport was invoked
    pub fn transaction_count(&self) -> usize {
        self.state.borrow().transactions
    }

    /// Frames written, in order
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.operations()
            .into_iter()
            .filter_map(|op| match op {
                Operation::Write { bytes, .. } => Some(bytes),
                Operation::Read { .. } => None,
            })
            .collect()
    }

    /// Number of 2-byte reads performed
    pub fn read_count(&self) -> usize {
        self.operations()
            .iter()
            .filter(|op| matches!(op, Operation::Read { .. }))
            .count()
    }
}

impl Default for MockI2c {
    fn default() -> Self {
        Self::new()
    }
}

/// Mock error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError(pub ErrorKind);

impl i2c::Error for MockError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

impl ErrorType for MockI2c {
    type Error = MockError;
}

impl I2c for MockI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [I2cOperation<'_>],
    ) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        state.transactions += 1;

        if let Some(kind) = state.take_failure() {
            return Err(MockError(kind));
        }
        if address != state.address {
            return Err(MockError(ErrorKind::NoAcknowledge(
                NoAcknowledgeSource::Address,
            )));
        }

        for operation in operations.iter_mut() {
            match operation {
                I2cOperation::Write(bytes) => state.write(address, bytes),
                I2cOperation::Read(buffer) => state.read(address, buffer),
            }
        }
        Ok(())
    }
}
