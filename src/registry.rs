//! The device instance registry: at most one live handle per key.
//!
//! A key is present iff initialization for it succeeded and cleanup has not
//! been called yet. The registry owns each handle exclusively; dropping an
//! entry releases whatever resources the driver holds for it.
//!
//! Failure contract, uniform across the registry:
//! * commands (`set_voltage`, `set_current`, `switch_on`, `switch_off`)
//!   return a success flag and never panic or propagate driver errors;
//! * reads (`read_voltage`, `read_current`) return the measured value or a
//!   typed [`RegistryError`], never a masked zero;
//! * the relay query degrades to `false` on any uncertainty, treating an
//!   unknown state as "not delivering power".

use std::collections::HashMap;

use log::{debug, error, info, warn};

use crate::driver::{DeviceConfig, DriverFactory, PsuDriver};
use crate::error::{DriverError, RegistryError};
use crate::key::DeviceKey;

/// Tracks the live handles to the physically distinct supplies.
///
/// Not thread safe; see the crate docs for the concurrency model.
pub struct PsuRegistry {
    factory: Box<dyn DriverFactory>,
    handles: HashMap<DeviceKey, Box<dyn PsuDriver>>,
}

impl PsuRegistry {
    /// Create an empty registry that opens devices through `factory`.
    pub fn new(factory: Box<dyn DriverFactory>) -> Self {
        Self {
            factory,
            handles: HashMap::new(),
        }
    }

    /// Open the device behind `key` with the given safety limits.
    ///
    /// Idempotent: if the key is already present this reports success
    /// without touching the device again. On a construction failure the
    /// registry is left unchanged and the attempt is not retried; a later
    /// call may try again.
    pub fn initialize(&mut self, key: DeviceKey, config: &DeviceConfig) -> bool {
        if self.handles.contains_key(&key) {
            info!("PSU {key} already initialized");
            return true;
        }
        match self.factory.open(&key, config) {
            Ok(handle) => {
                info!(
                    "PSU {key} initialized (max {:.0} V, {:.3} mA)",
                    config.max_voltage_v, config.max_current_ma
                );
                self.handles.insert(key, handle);
                true
            }
            Err(e) => {
                error!("failed to initialize PSU {key}: {e}");
                false
            }
        }
    }

    /// Direct access to an already open handle. Never initializes.
    pub fn get_mut(&mut self, key: &DeviceKey) -> Option<&mut dyn PsuDriver> {
        match self.handles.get_mut(key) {
            Some(handle) => Some(&mut **handle),
            None => None,
        }
    }

    /// Access the handle behind `key`, initializing it first if needed.
    ///
    /// Returns `None` only when initialization fails.
    pub fn ensure(&mut self, key: DeviceKey, config: &DeviceConfig) -> Option<&mut dyn PsuDriver> {
        if !self.initialize(key.clone(), config) {
            return None;
        }
        self.get_mut(&key)
    }

    /// Whether a live handle exists for `key`.
    pub fn contains(&self, key: &DeviceKey) -> bool {
        self.handles.contains_key(key)
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Snapshot of the currently registered keys.
    pub fn keys(&self) -> Vec<DeviceKey> {
        self.handles.keys().cloned().collect()
    }

    /// Program the output voltage setpoint of `key`, in volts.
    pub fn set_voltage(&mut self, key: &DeviceKey, volts: f64) -> bool {
        self.command(key, "set_voltage", |handle| handle.set_voltage(volts))
    }

    /// Program the output current limit of `key`, in milliamps.
    pub fn set_current(&mut self, key: &DeviceKey, milliamps: f64) -> bool {
        self.command(key, "set_current", |handle| handle.set_current(milliamps))
    }

    /// Enable the output of `key`. Configure setpoints first.
    pub fn switch_on(&mut self, key: &DeviceKey) -> bool {
        self.command(key, "switch_on", |handle| handle.switch_on())
    }

    /// Disable the output of `key`.
    pub fn switch_off(&mut self, key: &DeviceKey) -> bool {
        self.command(key, "switch_off", |handle| handle.switch_off())
    }

    /// Measure the actual output voltage of `key`, in volts.
    pub fn read_voltage(&mut self, key: &DeviceKey) -> Result<f64, RegistryError> {
        let handle = self
            .handles
            .get_mut(key)
            .ok_or_else(|| RegistryError::NotInitialized(key.clone()))?;
        match handle.read_voltage() {
            Ok(volts) => {
                debug!("PSU {key} measured {volts:.2} V");
                Ok(volts)
            }
            Err(e) => {
                error!("read_voltage on PSU {key} failed: {e}");
                Err(e.into())
            }
        }
    }

    /// Measure the actual output current of `key`, in milliamps.
    pub fn read_current(&mut self, key: &DeviceKey) -> Result<f64, RegistryError> {
        let handle = self
            .handles
            .get_mut(key)
            .ok_or_else(|| RegistryError::NotInitialized(key.clone()))?;
        match handle.read_current() {
            Ok(milliamps) => {
                debug!("PSU {key} measured {milliamps:.4} mA");
                Ok(milliamps)
            }
            Err(e) => {
                error!("read_current on PSU {key} failed: {e}");
                Err(e.into())
            }
        }
    }

    /// Whether the output relay of `key` is closed.
    ///
    /// Fail-safe: an absent key or a driver failure both report `false`.
    pub fn is_relay_on(&mut self, key: &DeviceKey) -> bool {
        let Some(handle) = self.handles.get_mut(key) else {
            warn!("is_relay_on: PSU {key} not initialized, assuming off");
            return false;
        };
        match handle.is_relay_on() {
            Ok(state) => state,
            Err(e) => {
                warn!("is_relay_on on PSU {key} failed, assuming off: {e}");
                false
            }
        }
    }

    /// Release the handle for `key`, dropping whatever driver resources it
    /// holds. Succeeds even when the key was never present.
    pub fn cleanup(&mut self, key: &DeviceKey) -> bool {
        if self.handles.remove(key).is_some() {
            info!("released PSU {key}");
        } else {
            debug!("cleanup of PSU {key}: nothing to release");
        }
        true
    }

    /// Release every handle present at call time.
    pub fn cleanup_all(&mut self) -> bool {
        // Snapshot first; removing entries while iterating the map is not
        // permitted.
        for key in self.keys() {
            self.cleanup(&key);
        }
        true
    }

    /// Scoped access to one supply.
    ///
    /// Initializes `key` if needed and returns a guard that switches the
    /// output off and releases the handle when dropped, whether the scope
    /// exits normally, early, or by panic. `None` when initialization
    /// fails.
    pub fn session(&mut self, key: DeviceKey, config: &DeviceConfig) -> Option<PsuSession<'_>> {
        if !self.initialize(key.clone(), config) {
            return None;
        }
        Some(PsuSession {
            registry: self,
            key,
        })
    }

    fn command<F>(&mut self, key: &DeviceKey, what: &str, op: F) -> bool
    where
        F: FnOnce(&mut dyn PsuDriver) -> Result<bool, DriverError>,
    {
        let Some(handle) = self.handles.get_mut(key) else {
            error!("{what}: PSU {key} not initialized");
            return false;
        };
        match op(&mut **handle) {
            Ok(true) => true,
            Ok(false) => {
                warn!("{what} on PSU {key} reported failure");
                false
            }
            Err(e) => {
                error!("{what} on PSU {key} failed: {e}");
                false
            }
        }
    }
}

/// Guard around one registered supply.
///
/// Dropping the session attempts `switch_off` and then releases the
/// handle. The switch-off is best effort; its result is logged by the
/// registry like any other command.
pub struct PsuSession<'a> {
    registry: &'a mut PsuRegistry,
    key: DeviceKey,
}

impl PsuSession<'_> {
    pub fn key(&self) -> &DeviceKey {
        &self.key
    }

    /// Program the output voltage setpoint, in volts.
    pub fn set_voltage(&mut self, volts: f64) -> bool {
        self.registry.set_voltage(&self.key, volts)
    }

    /// Program the output current limit, in milliamps.
    pub fn set_current(&mut self, milliamps: f64) -> bool {
        self.registry.set_current(&self.key, milliamps)
    }

    pub fn switch_on(&mut self) -> bool {
        self.registry.switch_on(&self.key)
    }

    pub fn switch_off(&mut self) -> bool {
        self.registry.switch_off(&self.key)
    }

    /// Measure the actual output voltage, in volts.
    pub fn read_voltage(&mut self) -> Result<f64, RegistryError> {
        self.registry.read_voltage(&self.key)
    }

    /// Measure the actual output current, in milliamps.
    pub fn read_current(&mut self) -> Result<f64, RegistryError> {
        self.registry.read_current(&self.key)
    }

    pub fn is_relay_on(&mut self) -> bool {
        self.registry.is_relay_on(&self.key)
    }
}

impl Drop for PsuSession<'_> {
    fn drop(&mut self) {
        // Output off before releasing, even when unwinding.
        self.registry.switch_off(&self.key);
        self.registry.cleanup(&self.key);
    }
}
