//! The capability seam between the registry and the native PSU driver.
//!
//! The actual Heinzinger/FUG driver lives in an externally built library
//! that programs the supplies through a USB DAC bridge. This module only
//! pins down what the registry needs from it: a way to open a handle with
//! explicit safety limits, and the handle operations themselves.

use crate::error::DriverError;
use crate::key::DeviceKey;

/// Safety limits handed to the driver when a device is opened.
///
/// Initialization always takes explicit upper bounds; there is no
/// "unlimited" configuration. Voltages are in volts, currents in
/// milliamps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceConfig {
    /// Upper bound for the output voltage, in volts.
    pub max_voltage_v: f64,
    /// Upper bound for the output current, in milliamps.
    pub max_current_ma: f64,
    /// Upper bound for the analog programming input, in volts.
    pub max_input_voltage_v: f64,
    /// Forward the driver's verbose logging.
    pub verbose: bool,
}

impl Default for DeviceConfig {
    /// The bench defaults: 30 kV, 25 mA, 10 V programming input, quiet.
    fn default() -> Self {
        Self {
            max_voltage_v: 30_000.0,
            max_current_ma: 25.0,
            max_input_voltage_v: 10.0,
            verbose: false,
        }
    }
}

/// One live handle to a power supply.
///
/// Command methods return `Ok(true)` on success and `Ok(false)` when the
/// driver reports a failure flag; `Err` means the call itself blew up
/// inside the driver. A failure is always reported, never silently turned
/// into a wrong value.
///
/// Configure the voltage and current setpoints before calling
/// [`switch_on`](PsuDriver::switch_on).
pub trait PsuDriver {
    /// Program the output voltage setpoint, in volts.
    fn set_voltage(&mut self, volts: f64) -> Result<bool, DriverError>;

    /// Program the output current limit, in milliamps.
    fn set_current(&mut self, milliamps: f64) -> Result<bool, DriverError>;

    /// Measure the actual output voltage, in volts.
    fn read_voltage(&mut self) -> Result<f64, DriverError>;

    /// Measure the actual output current, in milliamps.
    fn read_current(&mut self) -> Result<f64, DriverError>;

    /// Enable the output.
    fn switch_on(&mut self) -> Result<bool, DriverError>;

    /// Disable the output. Setpoints are preserved.
    fn switch_off(&mut self) -> Result<bool, DriverError>;

    /// Whether the output relay is currently closed.
    fn is_relay_on(&mut self) -> Result<bool, DriverError>;
}

/// Opens device handles.
///
/// Injected into [`PsuRegistry`](crate::registry::PsuRegistry) at
/// construction, so the native library is a swappable dependency and tests
/// can supply a scripted double.
pub trait DriverFactory {
    /// Open the device behind `key` with the given safety limits.
    ///
    /// Must either return a fully working handle or an error; a handle
    /// that is only half open is the factory's bug, not the registry's.
    fn open(
        &self,
        key: &DeviceKey,
        config: &DeviceConfig,
    ) -> Result<Box<dyn PsuDriver>, DriverError>;
}
