//! Bring up an ISEG supply on a serial port: identify it, program a
//! setpoint, clear the interlock if needed, enable the output and read the
//! voltage back.

use std::env;

use hv_psu_control::iseg::IsegPsu;
use inquire::Select;
use serialport::SerialPort;

// The ISEG default serial configuration.
const BAUD_RATE: u32 = 9600;
const SERIAL_TIMEOUT_MS: u64 = 1000;
const CHANNEL: u8 = 0;
const SETPOINT_V: f64 = 1000.0;
const SETTLE_DELAY_MS: u64 = 2000;

pub struct PortWrapper(Box<dyn SerialPort>);

#[derive(Debug)]
pub struct IoError(std::io::Error);

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            std::io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
            std::io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            std::io::ErrorKind::InvalidData => embedded_io::ErrorKind::InvalidData,
            std::io::ErrorKind::TimedOut => embedded_io::ErrorKind::TimedOut,
            std::io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for PortWrapper {
    type Error = IoError;
}

impl embedded_io::Read for PortWrapper {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        std::io::Read::read(&mut self.0, buf).map_err(IoError)
    }
}

impl embedded_io::Write for PortWrapper {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        std::io::Write::write(&mut self.0, buf).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::Write::flush(&mut self.0).map_err(IoError)
    }
}

fn main() {
    env_logger::init();

    // Get serial port from command line arg or interactive selection
    let port_name = env::args().nth(1).unwrap_or_else(|| {
        let ports = serialport::available_ports().expect("Failed to enumerate serial ports");

        if ports.is_empty() {
            eprintln!("No serial ports found!");
            std::process::exit(1);
        }

        let port_names: Vec<String> = ports.iter().map(|p| p.port_name.clone()).collect();

        Select::new("Select a serial port:", port_names)
            .prompt()
            .expect("Failed to select port")
    });

    println!("Using port: {}", port_name);

    let port = serialport::new(&port_name, BAUD_RATE)
        .timeout(std::time::Duration::from_millis(SERIAL_TIMEOUT_MS))
        .open()
        .expect("Failed to open serial port");

    let mut psu: IsegPsu<PortWrapper, 128> = IsegPsu::new(PortWrapper(port));

    let idn = psu.identify().expect("Identification query failed");
    println!("Instrument: {idn}");

    let nominal = psu
        .nominal_voltage(CHANNEL)
        .expect("Nominal voltage query failed");
    println!("Nominal voltage (channel {CHANNEL}): {nominal}");

    psu.set_voltage(SETPOINT_V, CHANNEL)
        .expect("Failed to program the setpoint");
    println!("Setpoint programmed to {SETPOINT_V} V.");

    // The interlock must be acknowledged before the output will come on.
    let interlock = psu.interlock_status().expect("Interlock query failed");
    if interlock.as_str().contains("HV_NOT_OK") {
        println!("Interlock tripped, clearing it.");
        psu.clear_interlock().expect("Failed to clear the interlock");
    }

    psu.hv_on(CHANNEL).expect("Failed to enable the output");
    println!("Output enabled, waiting for the voltage to settle.");
    std::thread::sleep(std::time::Duration::from_millis(SETTLE_DELAY_MS));

    let setpoint = psu
        .voltage_setpoint(CHANNEL)
        .expect("Setpoint read-back failed");
    println!("Setpoint read-back: {setpoint}");

    let measured = psu.measure_voltage(CHANNEL).expect("Measurement failed");
    println!("Measured voltage: {measured}");

    psu.hv_off(CHANNEL).expect("Failed to disable the output");
    println!("Output disabled.");
}
