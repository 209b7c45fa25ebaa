//! Interactive console for one high voltage supply, mapped 1:1 onto the
//! registry operations.
//!
//! Runs against a simulated driver so it can be tried without bench
//! hardware; on the bench host, swap [`SimulatedFactory`] for the factory
//! backed by the native Heinzinger/FUG library.
//!
//! The session guard makes sure the output is switched off and the handle
//! released on every way out of the loop, including panics.

use hv_psu_control::command::{Command, HELP};
use hv_psu_control::driver::{DeviceConfig, DriverFactory, PsuDriver};
use hv_psu_control::error::DriverError;
use hv_psu_control::key::DeviceKey;
use hv_psu_control::registry::PsuRegistry;
use inquire::Text;

/// Stand-in for one supply: remembers its setpoints and pretends the
/// output settles slightly below the programmed voltage.
struct SimulatedPsu {
    voltage_v: f64,
    current_ma: f64,
    relay: bool,
}

impl PsuDriver for SimulatedPsu {
    fn set_voltage(&mut self, volts: f64) -> Result<bool, DriverError> {
        self.voltage_v = volts;
        Ok(true)
    }

    fn set_current(&mut self, milliamps: f64) -> Result<bool, DriverError> {
        self.current_ma = milliamps;
        Ok(true)
    }

    fn read_voltage(&mut self) -> Result<f64, DriverError> {
        if self.relay {
            Ok(self.voltage_v * 0.998)
        } else {
            Ok(0.0)
        }
    }

    fn read_current(&mut self) -> Result<f64, DriverError> {
        if self.relay {
            Ok(self.current_ma * 0.05)
        } else {
            Ok(0.0)
        }
    }

    fn switch_on(&mut self) -> Result<bool, DriverError> {
        self.relay = true;
        Ok(true)
    }

    fn switch_off(&mut self) -> Result<bool, DriverError> {
        self.relay = false;
        Ok(true)
    }

    fn is_relay_on(&mut self) -> Result<bool, DriverError> {
        Ok(self.relay)
    }
}

struct SimulatedFactory;

impl DriverFactory for SimulatedFactory {
    fn open(
        &self,
        _key: &DeviceKey,
        _config: &DeviceConfig,
    ) -> Result<Box<dyn PsuDriver>, DriverError> {
        Ok(Box::new(SimulatedPsu {
            voltage_v: 0.0,
            current_ma: 0.0,
            relay: false,
        }))
    }
}

fn main() {
    env_logger::init();

    let mut registry = PsuRegistry::new(Box::new(SimulatedFactory));
    let config = DeviceConfig {
        max_voltage_v: 30_000.0,
        max_current_ma: 2.0,
        ..Default::default()
    };

    let Some(mut session) = registry.session(DeviceKey::Index(0), &config) else {
        eprintln!("Failed to initialize PSU 0.");
        std::process::exit(1);
    };

    println!("{HELP}");
    loop {
        // Esc or Ctrl-C ends the prompt; fall through to the guarded
        // shutdown below either way.
        let Ok(line) = Text::new("psu>").prompt() else {
            break;
        };

        match line.parse::<Command>() {
            Ok(Command::SetVoltage(volts)) => {
                if session.set_voltage(volts) {
                    println!("Voltage setpoint {volts:.2} V.");
                } else {
                    println!("Failed to set voltage to {volts:.2} V.");
                }
            }
            Ok(Command::SetCurrent(milliamps)) => {
                if session.set_current(milliamps) {
                    println!("Current limit {milliamps:.3} mA.");
                } else {
                    println!("Failed to set current limit to {milliamps:.3} mA.");
                }
            }
            Ok(Command::On) => {
                if session.switch_on() {
                    println!("Output ON.");
                } else {
                    println!("Failed to switch the output on.");
                }
            }
            Ok(Command::Off) => {
                if session.switch_off() {
                    println!("Output OFF.");
                } else {
                    println!("Failed to switch the output off.");
                }
            }
            Ok(Command::Read) => {
                match session.read_voltage() {
                    Ok(volts) => println!("Measured voltage: {volts:.2} V"),
                    Err(e) => println!("Voltage read failed: {e}"),
                }
                match session.read_current() {
                    Ok(milliamps) => println!("Measured current: {milliamps:.4} mA"),
                    Err(e) => println!("Current read failed: {e}"),
                }
            }
            Ok(Command::Quit) => break,
            Err(e) => println!("{e}"),
        }
    }

    // Dropping the session switches the output off and releases the handle.
    drop(session);
    println!("PSU control finished.");
}
