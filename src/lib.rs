//! Bench control for the high voltage power supplies in the lab.
//!
//! Three thin instrument layers live in this crate:
//!
//! * [`registry`] - a device instance registry over the native Heinzinger/FUG
//!   USB driver, keyed by logical index or USB path, enforcing at most one
//!   live handle per device. Includes a scoped session guard that switches
//!   the output off before releasing the handle, on every exit path.
//! * [`iseg`] - a driver for ISEG high voltage supplies speaking SCPI-style
//!   ASCII commands over RS-232.
//! * [`moxa`] - best-effort TCP probing of Moxa NPort serial-to-Ethernet
//!   gateways.
//!
//! The native USB driver itself (bulk transfers, DAC programming) is not
//! implemented here. It is a black box behind the [`driver::PsuDriver`] and
//! [`driver::DriverFactory`] capability traits, injected at registry
//! construction so tests can substitute a scripted double.
//!
//! Unit convention: voltages are in volts, currents in milliamps,
//! throughout the crate. E.g. `30_000.0` is 30 kV and `25.0` is 25 mA.
//!
//! Nothing in this crate is thread safe. Every operation blocks until the
//! underlying driver call returns; callers that share a registry between
//! threads must add their own serialization (a `Mutex` around the registry
//! is enough).

pub mod command;
pub mod driver;
pub mod error;
pub mod iseg;
pub mod key;
pub mod moxa;
pub mod registry;

#[cfg(test)]
mod mock_serial;
