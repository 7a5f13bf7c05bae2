//! Unit tests for the sticky bus fault gate

use crate::common::mock_i2c::MockI2c;
use crate::common::{create_gated_driver, create_mock_driver};
use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use ina219_wattmeter::{
    AdcSamples, AdcSetting, BusVoltageRange, DeviceAddress, GateConfig, Gain, GatedInterface,
    I2cInterface, Ina219Driver, OperatingMode, Register,
};

#[test]
fn test_clean_bus_reports_no_error() {
    let (mut driver, bus) = create_mock_driver();
    bus.set_register(0x04, 100);

    assert_eq!(driver.read_current_raw().unwrap(), 100);
    assert_eq!(driver.last_error(), None);
    assert!(!driver.is_faulted());
}

#[test]
fn test_fault_is_captured_not_returned() {
    let (mut driver, bus) = create_mock_driver();
    bus.fail_next(1, ErrorKind::Bus);

    let result = driver.write_register(Register::Calibration, 4096);

    assert!(result.is_ok(), "transport faults are never returned");
    assert_eq!(driver.last_error(), Some(ErrorKind::Bus));
}

#[test]
fn test_failed_read_yields_zeros() {
    let (mut driver, bus) = create_mock_driver();
    bus.set_register(0x02, 0x1007);
    bus.fail_next(1, ErrorKind::ArbitrationLoss);

    assert_eq!(driver.read_register_raw(Register::BusVoltage).unwrap(), [0, 0]);
    assert!(driver.is_faulted());
}

#[test]
fn test_failed_config_read_skips_field_write() {
    let (mut driver, bus) = create_mock_driver();
    bus.set_register(0x00, 0x3F1F);
    bus.fail_next(1, ErrorKind::Bus);

    driver.set_mode(OperatingMode::ShuntContinuous).unwrap();

    assert_eq!(bus.get_register(0x00), 0x3F1F, "other fields must survive");
    assert!(bus.writes().is_empty());
    assert_eq!(driver.last_error(), Some(ErrorKind::Bus));

    // Bus recovered: the same call now applies the field
    driver.set_mode(OperatingMode::ShuntContinuous).unwrap();
    assert_eq!(bus.get_register(0x00), 0x3F1D);
    assert_eq!(driver.last_error(), None);
}

#[test]
fn test_failed_config_read_skips_every_setter() {
    let (mut driver, bus) = create_mock_driver();
    bus.set_register(0x00, 0x3F1F);

    bus.fail_next(1, ErrorKind::Bus);
    driver.set_gain(Gain::Div1).unwrap();
    bus.fail_next(1, ErrorKind::Bus);
    driver.set_bus_range(BusVoltageRange::V16).unwrap();
    bus.fail_next(1, ErrorKind::Bus);
    driver.set_bus_adc(AdcSetting::averaged(AdcSamples::S2)).unwrap();
    bus.fail_next(1, ErrorKind::Bus);
    driver.set_shunt_adc(AdcSetting::averaged(AdcSamples::S2)).unwrap();

    assert_eq!(bus.get_register(0x00), 0x3F1F);
    assert!(bus.writes().is_empty());
    assert!(driver.is_faulted());
}

#[test]
fn test_default_interfaces_use_module_address() {
    let gated = GatedInterface::default(MockI2c::new());
    assert_eq!(gated.address(), DeviceAddress::DEFAULT);

    let plain = I2cInterface::default(MockI2c::new());
    assert_eq!(plain.address(), DeviceAddress::X45);
}

#[test]
fn test_unchecked_gate_retries_and_heals() {
    let (mut driver, bus, sink) = create_gated_driver(GateConfig::RETRY);
    bus.set_register(0x04, 42);
    bus.fail_next(2, ErrorKind::Bus);

    assert_eq!(driver.read_current_raw().unwrap(), 0);
    assert_eq!(driver.read_current_raw().unwrap(), 0);
    assert_eq!(driver.last_error(), Some(ErrorKind::Bus));

    // Third attempt reaches the device and clears the fault
    assert_eq!(driver.read_current_raw().unwrap(), 42);
    assert_eq!(driver.last_error(), None);
    assert_eq!(bus.transaction_count(), 3);

    assert!(sink.shown().is_empty(), "no diagnostics without checking");
}

#[test]
fn test_checked_gate_suppresses_reads() {
    let (mut driver, bus, _sink) = create_gated_driver(GateConfig::CHECKED);
    bus.set_register(0x04, 42);
    bus.fail_next(1, ErrorKind::Bus);

    driver.read_current_raw().unwrap();
    assert!(driver.is_faulted());
    let attempts = bus.transaction_count();

    for _ in 0..10 {
        assert_eq!(driver.read_register_raw(Register::Current).unwrap(), [0, 0]);
        assert_eq!(driver.read_u16(Register::Calibration).unwrap(), 0);
    }

    assert_eq!(bus.transaction_count(), attempts, "transport must not be invoked");
    assert_eq!(driver.last_error(), Some(ErrorKind::Bus));
}

#[test]
fn test_checked_gate_suppresses_writes() {
    let (mut driver, bus, _sink) = create_gated_driver(GateConfig::CHECKED);
    bus.fail_next(1, ErrorKind::Other);
    driver.write_register(Register::Calibration, 4096).unwrap();
    bus.clear_operations();

    driver.write_register(Register::Calibration, 8192).unwrap();
    driver.set_mode(OperatingMode::PowerDown).unwrap();
    driver.reset().unwrap();

    assert_eq!(bus.transaction_count(), 0);
    assert_eq!(bus.get_register(0x05), 0);
    assert_eq!(bus.get_register(0x00), 0x399F);
}

#[test]
fn test_checked_gate_shows_diagnostic_once() {
    let (mut driver, bus, sink) = create_gated_driver(GateConfig::CHECKED);
    bus.set_failing(true);

    for _ in 0..5 {
        driver.read_current_raw().unwrap();
    }

    assert_eq!(sink.shown(), vec![0x45]);
    assert_eq!(bus.transaction_count(), 1);
}

#[test]
fn test_diagnostic_shows_configured_address() {
    let bus = MockI2c::with_address(0x40);
    let sink = crate::common::test_utils::RecordingSink::default();
    let interface =
        GatedInterface::with_sink(bus.clone(), DeviceAddress::X40, GateConfig::CHECKED, sink.clone());
    let mut driver = Ina219Driver::new(interface);
    bus.fail_next(1, ErrorKind::Bus);

    driver.read_power_raw().unwrap();

    assert_eq!(sink.shown(), vec![0x40]);
}

#[test]
fn test_disabling_check_resumes_traffic() {
    let (mut driver, bus, _sink) = create_gated_driver(GateConfig::CHECKED);
    bus.set_register(0x04, 7);
    bus.fail_next(1, ErrorKind::Bus);
    driver.read_current_raw().unwrap();

    driver.interface_mut().gate_mut().set_check_enabled(false);

    assert_eq!(driver.read_current_raw().unwrap(), 7);
    assert!(!driver.is_faulted());
}

#[test]
fn test_is_connected_wrong_address() {
    let bus = MockI2c::with_address(0x41);
    let interface = GatedInterface::new(bus.clone(), DeviceAddress::X44, GateConfig::RETRY);
    let mut driver = Ina219Driver::new(interface);

    assert!(!driver.is_connected());
    assert_eq!(
        driver.last_error(),
        Some(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))
    );
}

#[test]
fn test_is_connected_writes_config_index() {
    let (mut driver, bus) = create_mock_driver();

    assert!(driver.is_connected());
    assert_eq!(bus.writes(), vec![vec![0x00]]);
}

#[test]
fn test_independent_gates_per_handle() {
    let (mut first, first_bus, _) = create_gated_driver(GateConfig::CHECKED);
    let (mut second, _second_bus, _) = create_gated_driver(GateConfig::CHECKED);
    first_bus.set_failing(true);

    first.read_current_raw().unwrap();
    second.read_current_raw().unwrap();

    assert!(first.is_faulted());
    assert!(!second.is_faulted());
}

#[test]
fn test_ungated_interface_returns_bus_errors() {
    let bus = MockI2c::new();
    let mut driver = Ina219Driver::new(I2cInterface::default(bus.clone()));
    bus.fail_next(1, ErrorKind::Bus);

    let result = driver.read_current_raw();
    assert!(matches!(result, Err(ina219_wattmeter::Error::Bus(_))));

    // Next read goes through
    bus.set_register(0x04, 9);
    assert_eq!(driver.read_current_raw().unwrap(), 9);
}
