//! Parser for the interactive PSU console protocol.
//!
//! The console accepts one command per line: `setv <volts>`,
//! `setc <milliamps>`, `on`, `off`, `read`, `quit`. A malformed numeric
//! argument is a parse error; the caller reports it and must not touch the
//! supply.

use core::str::FromStr;

use strum_macros::EnumString;
use thiserror::Error;

/// One line of the summary printed when the console starts.
pub const HELP: &str = "Commands: setv <volts>, setc <milliamps>, on, off, read, quit";

/// The leading keyword of a console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
enum Keyword {
    Setv,
    Setc,
    On,
    Off,
    Read,
    Quit,
}

/// A fully parsed console command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// `setv <volts>` - program the voltage setpoint.
    SetVoltage(f64),
    /// `setc <milliamps>` - program the current limit.
    SetCurrent(f64),
    /// `on` - enable the output.
    On,
    /// `off` - disable the output.
    Off,
    /// `read` - measure voltage and current.
    Read,
    /// `quit` - leave the console, switching the output off first.
    Quit,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    #[error("Invalid format. Use: {0} <number>")]
    InvalidNumber(&'static str),
    #[error("Empty input")]
    Empty,
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, ParseError> {
        let mut tokens = line.split_whitespace();
        let word = tokens.next().ok_or(ParseError::Empty)?;
        let keyword = word
            .parse::<Keyword>()
            .map_err(|_| ParseError::UnknownCommand(word.to_owned()))?;

        let command = match keyword {
            Keyword::Setv => Command::SetVoltage(number(tokens.next(), "setv")?),
            Keyword::Setc => Command::SetCurrent(number(tokens.next(), "setc")?),
            Keyword::On => Command::On,
            Keyword::Off => Command::Off,
            Keyword::Read => Command::Read,
            Keyword::Quit => Command::Quit,
        };
        Ok(command)
    }
}

fn number(token: Option<&str>, keyword: &'static str) -> Result<f64, ParseError> {
    token
        .and_then(|t| t.parse::<f64>().ok())
        .ok_or(ParseError::InvalidNumber(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_command() {
        assert_eq!("setv 3300".parse(), Ok(Command::SetVoltage(3300.0)));
        assert_eq!("setc 0.5".parse(), Ok(Command::SetCurrent(0.5)));
        assert_eq!("on".parse(), Ok(Command::On));
        assert_eq!("off".parse(), Ok(Command::Off));
        assert_eq!("read".parse(), Ok(Command::Read));
        assert_eq!("quit".parse(), Ok(Command::Quit));
    }

    #[test]
    fn tolerates_case_and_whitespace() {
        assert_eq!("  SETV 12.5 ".parse(), Ok(Command::SetVoltage(12.5)));
        assert_eq!("Quit".parse::<Command>(), Ok(Command::Quit));
    }

    #[test]
    fn malformed_numbers_are_format_errors() {
        assert_eq!(
            "setv twelve".parse::<Command>(),
            Err(ParseError::InvalidNumber("setv"))
        );
        assert_eq!(
            "setc".parse::<Command>(),
            Err(ParseError::InvalidNumber("setc"))
        );
    }

    #[test]
    fn unknown_and_empty_input() {
        assert_eq!(
            "ramp 100".parse::<Command>(),
            Err(ParseError::UnknownCommand("ramp".to_owned()))
        );
        assert_eq!("".parse::<Command>(), Err(ParseError::Empty));
        assert_eq!("   ".parse::<Command>(), Err(ParseError::Empty));
    }
}
