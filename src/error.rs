//! Our error types for the instrument helpers in this crate.

use thiserror::Error;

use crate::key::DeviceKey;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Error type for serial instrument links (ISEG).
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    #[error("Serial communication error")]
    SerialError(I),
    #[error("Communication timeout")]
    Timeout,
    #[error("Response exceeded the line buffer")]
    BufferError,
    #[error("Response was not valid text")]
    InvalidResponse,
}

/// Failures crossing the native PSU driver boundary.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The native driver library could not be located or loaded. Fatal to
    /// every subsequent operation until resolved.
    #[error("native PSU driver unavailable: {0}")]
    Unavailable(String),
    /// Opening a handle for one device failed. Local to that device, other
    /// keys are unaffected.
    #[error("failed to open PSU device: {0}")]
    OpenFailed(String),
    /// A call on an open handle failed inside the driver.
    #[error("PSU driver operation failed: {0}")]
    Operation(String),
}

/// Failures reported by [`PsuRegistry`](crate::registry::PsuRegistry) read
/// operations, where a numeric result is expected and a bare `false` would
/// be ambiguous.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("PSU {0} not initialized")]
    NotInitialized(DeviceKey),
    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Failure to load the Moxa gateway configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),
}
