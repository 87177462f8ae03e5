//! This module contains types relevant to the PSU register data types.

use core::fmt;

use crate::scaling::{combine32, decode_scaled};

/// Identity of a connected unit, decoded from registers 0 - 3.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceInfo {
    /// Register 0 / 10. E.g. `60062` => `6006`.
    pub model_code: u32,
    /// Registers 1 (high) and 2 (low).
    pub serial_number: u32,
    /// Register 3 / 100. E.g. `128` => `1.28`.
    pub firmware_version: f32,
}

impl DeviceInfo {
    pub fn from_registers(registers: &[u16; 4]) -> Self {
        Self {
            model_code: registers[0] as u32 / 10,
            serial_number: combine32(registers[1], registers[2]),
            firmware_version: decode_scaled(registers[3] as u32, 100),
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RD{} SN:{:08} FW:{}",
            self.model_code, self.serial_number, self.firmware_version
        )
    }
}

/// Used to be less ambiguous and whether something is on or off.
#[repr(u16)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum State {
    /// Disabled.
    #[default]
    Off = 0x00,
    /// Enabled.
    On = 0x01,
}

impl From<State> for bool {
    fn from(value: State) -> Self {
        match value {
            State::Off => false,
            State::On => true,
        }
    }
}

impl From<bool> for State {
    fn from(value: bool) -> Self {
        match value {
            true => State::On,
            false => State::Off,
        }
    }
}

impl From<u16> for State {
    /// Any non-zero register value counts as on.
    fn from(value: u16) -> Self {
        State::from(value != 0)
    }
}

/// Represents the two possible power supply control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// Constant voltage regulation mode.
    Cv,
    /// Constant current regulation mode.
    Cc,
}

impl From<u16> for ControlMode {
    fn from(value: u16) -> Self {
        match value {
            0x00 => ControlMode::Cv,
            _ => ControlMode::Cc,
        }
    }
}

/// Content of the OVP/OCP state register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionState {
    /// No protection tripped.
    Normal,
    /// OVP overvoltage protection tripped.
    OverVoltage,
    /// OCP overcurrent protection tripped.
    OverCurrent,
    /// A value this driver does not know about.
    Unknown(u16),
}

impl From<u16> for ProtectionState {
    fn from(value: u16) -> Self {
        match value {
            0x00 => ProtectionState::Normal,
            0x01 => ProtectionState::OverVoltage,
            0x02 => ProtectionState::OverCurrent,
            other => ProtectionState::Unknown(other),
        }
    }
}

/// Simple type to represent temperature depending on the unit used.
///
/// The PSU reports whole degrees, separately in both units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Temperature {
    Fahrenheit(i32),
    Celsius(i32),
}

impl Temperature {
    /// Convert this temperature into celsius.
    pub fn as_celsius(&self) -> i32 {
        match *self {
            Self::Celsius(inner) => inner,
            Self::Fahrenheit(inner) => round_div((inner - 32) * 5, 9),
        }
    }

    /// Convert this temperature into fahrenheit.
    pub fn as_fahrenheit(&self) -> i32 {
        match *self {
            Self::Celsius(inner) => round_div(inner * 9, 5) + 32,
            Self::Fahrenheit(inner) => inner,
        }
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Celsius(inner) => write!(f, "{}°C", inner),
            Self::Fahrenheit(inner) => write!(f, "{}°F", inner),
        }
    }
}

/// Integer division rounding half away from zero.
fn round_div(numerator: i32, denominator: i32) -> i32 {
    let half = denominator / 2;
    if numerator < 0 {
        (numerator - half) / denominator
    } else {
        (numerator + half) / denominator
    }
}

/// A decoded register value, as returned by
/// [`RdPsu::read_property`](crate::psu::RdPsu::read_property).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// Scaled value in volts or amps.
    Value(f32),
    /// Value of a 32-bit register pair, in watts, amp-hours or watt-hours.
    Wide(f64),
    /// Signed whole value, e.g. a temperature.
    Signed(i32),
    /// Register passed through unmodified.
    Raw(u16),
    /// Three consecutive registers, e.g. a date or a time of day.
    Triple([u16; 3]),
}

impl Reading {
    /// The reading as a float, whatever its shape. `None` for triples.
    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            Reading::Value(value) => Some(value),
            Reading::Wide(value) => Some(value as f32),
            Reading::Signed(value) => Some(value as f32),
            Reading::Raw(value) => Some(value as f32),
            Reading::Triple(_) => None,
        }
    }

    /// The reading as a double. `None` for triples.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Reading::Wide(value) => Some(value),
            Reading::Value(value) => Some(value as f64),
            Reading::Signed(value) => Some(value as f64),
            Reading::Raw(value) => Some(value as f64),
            Reading::Triple(_) => None,
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Value(value) => write!(f, "{}", value),
            Reading::Wide(value) => write!(f, "{}", value),
            Reading::Signed(value) => write!(f, "{}", value),
            Reading::Raw(value) => write!(f, "{}", value),
            Reading::Triple([a, b, c]) => write!(f, "({}, {}, {})", a, b, c),
        }
    }
}

/// A value to write through [`RdPsu::write_property`](crate::psu::RdPsu::write_property).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Setting {
    /// Value in volts or amps, scaled for the connected model before writing.
    Value(f32),
    /// Written to the register unmodified.
    Raw(u16),
    /// Written to three consecutive registers.
    Triple([u16; 3]),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_conversions() {
        let temp = Temperature::Celsius(10);
        assert_eq!(temp.as_celsius(), 10);
        assert_eq!(temp.as_fahrenheit(), 50);

        let temp = Temperature::Celsius(21);
        assert_eq!(temp.as_fahrenheit(), 70);

        let temp = Temperature::Fahrenheit(70);
        assert_eq!(temp.as_fahrenheit(), 70);
        assert_eq!(temp.as_celsius(), 21);

        // Below zero in both units.
        assert_eq!(Temperature::Celsius(-40).as_fahrenheit(), -40);
        assert_eq!(Temperature::Fahrenheit(-4).as_celsius(), -20);
        assert_eq!(Temperature::Celsius(-7).as_fahrenheit(), 19);
    }

    #[test]
    fn device_info_decoding() {
        let info = DeviceInfo::from_registers(&[60062, 0x0001, 0x0002, 128]);
        assert_eq!(info.model_code, 6006);
        assert_eq!(info.serial_number, 65538);
        assert_eq!(info.firmware_version, 1.28);
        assert_eq!(info.to_string(), "RD6006 SN:00065538 FW:1.28");
    }

    #[test]
    fn raw_enum_conversions() {
        assert_eq!(State::from(0u16), State::Off);
        assert_eq!(State::from(2u16), State::On);
        assert_eq!(ControlMode::from(0), ControlMode::Cv);
        assert_eq!(ControlMode::from(1), ControlMode::Cc);
        assert_eq!(ProtectionState::from(0), ProtectionState::Normal);
        assert_eq!(ProtectionState::from(1), ProtectionState::OverVoltage);
        assert_eq!(ProtectionState::from(2), ProtectionState::OverCurrent);
        assert_eq!(ProtectionState::from(9), ProtectionState::Unknown(9));
    }

    #[test]
    fn reading_as_f32() {
        assert_eq!(Reading::Value(1.5).as_f32(), Some(1.5));
        assert_eq!(Reading::Signed(-3).as_f32(), Some(-3.0));
        assert_eq!(Reading::Raw(1).as_f32(), Some(1.0));
        assert_eq!(Reading::Triple([1, 2, 3]).as_f32(), None);
        assert_eq!(Reading::Wide(327_681.234).as_f64(), Some(327_681.234));
        assert_eq!(Reading::Raw(7).as_f64(), Some(7.0));
    }
}
