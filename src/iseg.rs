//! Driver for ISEG high voltage supplies speaking SCPI-style ASCII
//! commands over RS-232.
//!
//! The serial side of the instrument should be configured like so:
//! * Baud rate: 9600
//! * Data bits: 8
//! * Stop bits: 1
//! * Parity: None
//!
//! Commands are single ASCII lines terminated with CR LF. The instrument
//! echoes every command line before answering, so a query produces two
//! lines on the wire: the echo, then the reply. Responses to commands that
//! are not queries may be the echo alone, or nothing at all; both are
//! normal and reported as-is rather than as errors.
//!
//! There is no retry logic here. One command, one best-effort read.

use core::fmt::Write as _;

use crate::error::Result;
use embedded_io::Error;

/// You can create an [`IsegPsu`] over any interface which implements
/// [`embedded_io::Read`] & [`embedded_io::Write`], typically a serial port
/// with a read timeout, or a TCP channel of a Moxa gateway.
///
/// `L` bounds both the command and the response line length.
pub struct IsegPsu<S: embedded_io::Read + embedded_io::Write, const L: usize = 128> {
    interface: S,
}

impl<S: embedded_io::Read + embedded_io::Write, const L: usize> IsegPsu<S, L> {
    /// Create a new IsegPsu instance over the given interface.
    pub fn new(interface: S) -> Self {
        Self { interface }
    }

    /// Consume the driver and hand the interface back.
    pub fn release(self) -> S {
        self.interface
    }

    /// Send a raw command line. The CR LF terminator is appended here.
    pub fn send_command(&mut self, command: &str) -> Result<(), S::Error> {
        self.interface
            .write_all(command.as_bytes())
            .map_err(crate::error::Error::SerialError)?;
        self.interface
            .write_all(b"\r\n")
            .map_err(crate::error::Error::SerialError)?;
        self.interface
            .flush()
            .map_err(crate::error::Error::SerialError)?;
        Ok(())
    }

    /// Read one response, discarding the command echo.
    ///
    /// Returns the second line when the instrument answered, the echoed
    /// command when it only echoed, and an empty string when it stayed
    /// silent until the interface timed out.
    pub fn read_response(&mut self) -> Result<heapless::String<L>, S::Error> {
        let echo = self.read_line()?;
        let reply = self.read_line()?;
        if reply.is_empty() { Ok(echo) } else { Ok(reply) }
    }

    /// Send a command and read its response.
    pub fn send_and_read(&mut self, command: &str) -> Result<heapless::String<L>, S::Error> {
        self.send_command(command)?;
        self.read_response()
    }

    /// Query the instrument identification string.
    pub fn identify(&mut self) -> Result<heapless::String<L>, S::Error> {
        self.send_and_read("*IDN?")
    }

    /// Query the nominal output voltage of a channel, in volts.
    pub fn nominal_voltage(&mut self, channel: u8) -> Result<heapless::String<L>, S::Error> {
        let mut command: heapless::String<L> = heapless::String::new();
        write!(command, ":SYStem:USER:VOLTage:NOMinal? (@{channel})")
            .map_err(|_| crate::error::Error::BufferError)?;
        self.send_and_read(&command)
    }

    /// Query the high voltage interlock state.
    ///
    /// The reply contains `HV_NOT_OK` while the interlock is tripped;
    /// clear it with [`Self::clear_interlock`] before enabling output.
    pub fn interlock_status(&mut self) -> Result<heapless::String<L>, S::Error> {
        self.send_and_read(":CONF:HVMICC?")
    }

    /// Acknowledge the interlock, marking the high voltage circuit as OK.
    pub fn clear_interlock(&mut self) -> Result<heapless::String<L>, S::Error> {
        self.send_and_read(":CONF:HVMICC HV_OK")
    }

    /// Program the voltage setpoint of a channel, in volts.
    pub fn set_voltage(&mut self, volts: f64, channel: u8) -> Result<heapless::String<L>, S::Error> {
        let mut command: heapless::String<L> = heapless::String::new();
        write!(command, ":VOLT {volts}, (@{channel})")
            .map_err(|_| crate::error::Error::BufferError)?;
        self.send_and_read(&command)
    }

    /// Enable the high voltage output of a channel.
    pub fn hv_on(&mut self, channel: u8) -> Result<heapless::String<L>, S::Error> {
        let mut command: heapless::String<L> = heapless::String::new();
        write!(command, ":VOLT ON,(@{channel})").map_err(|_| crate::error::Error::BufferError)?;
        self.send_and_read(&command)
    }

    /// Disable the high voltage output of a channel.
    pub fn hv_off(&mut self, channel: u8) -> Result<heapless::String<L>, S::Error> {
        let mut command: heapless::String<L> = heapless::String::new();
        write!(command, ":VOLT OFF,(@{channel})").map_err(|_| crate::error::Error::BufferError)?;
        self.send_and_read(&command)
    }

    /// Read back the programmed voltage setpoint of a channel.
    pub fn voltage_setpoint(&mut self, channel: u8) -> Result<heapless::String<L>, S::Error> {
        let mut command: heapless::String<L> = heapless::String::new();
        write!(command, ":READ:VOLT? (@{channel})").map_err(|_| crate::error::Error::BufferError)?;
        self.send_and_read(&command)
    }

    /// Measure the actual output voltage of a channel.
    pub fn measure_voltage(&mut self, channel: u8) -> Result<heapless::String<L>, S::Error> {
        let mut command: heapless::String<L> = heapless::String::new();
        write!(command, "MEAS:VOLT? (@{channel})").map_err(|_| crate::error::Error::BufferError)?;
        self.send_and_read(&command)
    }

    /// Read one line, stripping CR and the terminating LF.
    ///
    /// A timeout means the instrument is done talking; whatever was
    /// buffered so far is the line.
    fn read_line(&mut self) -> Result<heapless::String<L>, S::Error> {
        let mut raw: heapless::Vec<u8, L> = heapless::Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.interface.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    if byte[0] == b'\n' {
                        break;
                    }
                    if byte[0] == b'\r' {
                        continue;
                    }
                    if raw.push(byte[0]).is_err() {
                        return Err(crate::error::Error::BufferError);
                    }
                }
                Err(e) => {
                    if matches!(
                        e.kind(),
                        embedded_io::ErrorKind::Other | embedded_io::ErrorKind::TimedOut
                    ) {
                        break;
                    }
                    // Other errors should be propagated.
                    return Err(crate::error::Error::SerialError(e));
                }
            }
        }
        let text =
            core::str::from_utf8(&raw).map_err(|_| crate::error::Error::InvalidResponse)?;
        let mut line: heapless::String<L> = heapless::String::new();
        line.push_str(text)
            .map_err(|_| crate::error::Error::BufferError)?;
        Ok(line)
    }
}
