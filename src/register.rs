//! This module is used to define the registers on the RD60xx PSUs, and the table of named properties built on
//! top of them.

use strum_macros::{EnumIter, EnumString, IntoStaticStr};

use crate::{
    scaling::{
        CHARGE_DIVISOR, ENERGY_DIVISOR, POWER_DIVISOR, Quantity, ScalingFactors, combine32,
        decode_scaled, decode_signed, decode_wide,
    },
    types::Reading,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, EnumIter)]
#[repr(u16)]
pub enum RdRegister {
    /// __R__ - Model id. Model code is this value / 10, e.g. `60062` => RD6006.
    Model = 0,
    /// __R__ - Serial number, high 16 bits.
    SerialHigh = 1,
    /// __R__ - Serial number, low 16 bits.
    SerialLow = 2,
    /// __R__ - Firmware version * 100.
    Firmware = 3,
    /// __R__ - Internal temperature sign. Non-zero means below zero.
    TempInternalSign = 4,
    /// __R__ - Internal temperature magnitude, °C.
    TempInternal = 5,
    /// __R__ - Internal temperature sign, fahrenheit reading.
    TempInternalFSign = 6,
    /// __R__ - Internal temperature magnitude, °F.
    TempInternalF = 7,
    /// __R/W__ - Voltage setting.
    ///
    /// Value is volts * voltage divisor. E.g. 5.0V => `500`.
    VSet = 8,
    /// __R/W__ - Current setting.
    ///
    /// Value is amps * current divisor. E.g. 1.5A => `1500` on an RD6006.
    ISet = 9,
    /// __R__ - Output voltage display value.
    VOut = 10,
    /// __R__ - Output current display value.
    IOut = 11,
    /// __R__ - Output power, high 16 bits. Centiwatts.
    PowerHigh = 12,
    /// __R__ - Output power, low 16 bits.
    PowerLow = 13,
    /// __R__ - Input voltage display value.
    VIn = 14,
    /// __R__ - Protection state.
    ///
    /// See [`ProtectionState`](crate::types::ProtectionState).
    Protect = 16,
    /// __R__ - Constant voltage constant current state.
    /// * `0` - CV.
    /// * `1` - CC.
    ///
    /// See [`ControlMode`](crate::types::ControlMode).
    CvCc = 17,
    /// __R/W__ - Switched output.
    /// * `0` - Off.
    /// * `1` - On.
    Output = 18,
    /// __R__ - Battery mode active flag.
    BatteryMode = 32,
    /// __R__ - Battery voltage.
    BatteryVoltage = 33,
    /// __R__ - External probe temperature sign.
    TempExternalSign = 34,
    /// __R__ - External probe temperature magnitude, °C.
    TempExternal = 35,
    /// __R__ - External probe temperature sign, fahrenheit reading.
    TempExternalFSign = 36,
    /// __R__ - External probe temperature magnitude, °F.
    TempExternalF = 37,
    /// __R__ - Accumulated charge, high 16 bits. mAh.
    AhHigh = 38,
    /// __R__ - Accumulated charge, low 16 bits.
    AhLow = 39,
    /// __R__ - Accumulated energy, high 16 bits. mWh.
    WhHigh = 40,
    /// __R__ - Accumulated energy, low 16 bits.
    WhLow = 41,
    /// __R/W__ - Clock year.
    Year = 48,
    /// __R/W__ - Clock month.
    Month = 49,
    /// __R/W__ - Clock day.
    Day = 50,
    /// __R/W__ - Clock hour.
    Hour = 51,
    /// __R/W__ - Clock minute.
    Minute = 52,
    /// __R/W__ - Clock second.
    Second = 53,
    /// __R/W__ - Backlight brightness level.
    ///
    /// 0 is darkest, and 5 is the brightest.
    Backlight = 72,
    /// __R/W__ - First memory preset (M0) voltage. Presets are 4 registers each.
    ///
    /// See [`PresetSlot`](crate::preset::PresetSlot).
    Memory = 80,
    /// __R/W__ - Over voltage protection level of the active settings.
    Ovp = 82,
    /// __R/W__ - Over current protection level of the active settings.
    Ocp = 83,
}

impl From<RdRegister> for u16 {
    fn from(value: RdRegister) -> Self {
        value as u16
    }
}

/// How a property is laid out in registers and decoded.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Shape {
    /// One register divided by the model's voltage or current divisor.
    Scaled {
        register: RdRegister,
        quantity: Quantity,
    },
    /// A sign flag register immediately followed by its magnitude register.
    Signed { sign: RdRegister },
    /// High and low registers forming a 32-bit value, divided by a fixed divisor. Decoded in f64.
    Combined { high: RdRegister, divisor: u32 },
    /// One register passed through unmodified.
    Raw { register: RdRegister },
    /// Three consecutive registers read and written as one tuple.
    Triple { first: RdRegister },
}

impl Shape {
    /// First register and number of registers this shape covers.
    pub const fn span(&self) -> (u16, usize) {
        match *self {
            Shape::Scaled { register, .. } | Shape::Raw { register } => (register as u16, 1),
            Shape::Signed { sign } => (sign as u16, 2),
            Shape::Combined { high, .. } => (high as u16, 2),
            Shape::Triple { first } => (first as u16, 3),
        }
    }
}

/// Every named property of the PSU, keyed by its logical name.
///
/// ```
/// use core::str::FromStr;
/// use riden_rd_psu::register::Property;
///
/// let property = Property::from_str("battery_voltage").unwrap();
/// assert_eq!(property, Property::BatteryVoltage);
/// assert_eq!(property.name(), "battery_voltage");
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Property {
    Voltage,
    Current,
    VoltageProtection,
    CurrentProtection,
    Enable,
    Backlight,
    Date,
    Time,
    InputVoltage,
    OutputVoltage,
    OutputCurrent,
    OutputPower,
    CapacityAh,
    EnergyWh,
    BatteryMode,
    BatteryVoltage,
    ProtectionState,
    ControlMode,
    TemperatureInternal,
    TemperatureInternalF,
    TemperatureExternal,
    TemperatureExternalF,
}

impl Property {
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub const fn shape(self) -> Shape {
        use Property as P;
        use RdRegister as R;
        match self {
            P::Voltage => Shape::Scaled {
                register: R::VSet,
                quantity: Quantity::Voltage,
            },
            P::Current => Shape::Scaled {
                register: R::ISet,
                quantity: Quantity::Current,
            },
            P::VoltageProtection => Shape::Scaled {
                register: R::Ovp,
                quantity: Quantity::Voltage,
            },
            P::CurrentProtection => Shape::Scaled {
                register: R::Ocp,
                quantity: Quantity::Current,
            },
            P::Enable => Shape::Raw { register: R::Output },
            P::Backlight => Shape::Raw {
                register: R::Backlight,
            },
            P::Date => Shape::Triple { first: R::Year },
            P::Time => Shape::Triple { first: R::Hour },
            P::InputVoltage => Shape::Scaled {
                register: R::VIn,
                quantity: Quantity::Voltage,
            },
            P::OutputVoltage => Shape::Scaled {
                register: R::VOut,
                quantity: Quantity::Voltage,
            },
            P::OutputCurrent => Shape::Scaled {
                register: R::IOut,
                quantity: Quantity::Current,
            },
            P::OutputPower => Shape::Combined {
                high: R::PowerHigh,
                divisor: POWER_DIVISOR,
            },
            P::CapacityAh => Shape::Combined {
                high: R::AhHigh,
                divisor: CHARGE_DIVISOR,
            },
            P::EnergyWh => Shape::Combined {
                high: R::WhHigh,
                divisor: ENERGY_DIVISOR,
            },
            P::BatteryMode => Shape::Raw {
                register: R::BatteryMode,
            },
            P::BatteryVoltage => Shape::Scaled {
                register: R::BatteryVoltage,
                quantity: Quantity::Voltage,
            },
            P::ProtectionState => Shape::Raw {
                register: R::Protect,
            },
            P::ControlMode => Shape::Raw { register: R::CvCc },
            P::TemperatureInternal => Shape::Signed {
                sign: R::TempInternalSign,
            },
            P::TemperatureInternalF => Shape::Signed {
                sign: R::TempInternalFSign,
            },
            P::TemperatureExternal => Shape::Signed {
                sign: R::TempExternalSign,
            },
            P::TemperatureExternalF => Shape::Signed {
                sign: R::TempExternalFSign,
            },
        }
    }

    /// Whether the property accepts writes.
    pub const fn is_writable(self) -> bool {
        matches!(
            self,
            Property::Voltage
                | Property::Current
                | Property::VoltageProtection
                | Property::CurrentProtection
                | Property::Enable
                | Property::Backlight
                | Property::Date
                | Property::Time
        )
    }
}

/// A contiguous run of registers read in one transaction, addressed by absolute register number.
pub struct RegisterBlock<'a> {
    start: u16,
    registers: &'a [u16],
}

impl<'a> RegisterBlock<'a> {
    pub fn new(start: u16, registers: &'a [u16]) -> Self {
        Self { start, registers }
    }

    /// Value of an absolute register address inside this block.
    ///
    /// Panics if the address lies outside the block.
    pub fn at(&self, address: u16) -> u16 {
        self.registers[(address - self.start) as usize]
    }

    pub fn get(&self, register: RdRegister) -> u16 {
        self.at(register as u16)
    }

    /// Decode a property from this block. The block must cover the property's span.
    pub fn decode(&self, property: Property, scaling: &ScalingFactors) -> Reading {
        match property.shape() {
            Shape::Scaled { register, quantity } => Reading::Value(decode_scaled(
                self.get(register) as u32,
                scaling.divisor(quantity),
            )),
            Shape::Signed { sign } => {
                let sign = sign as u16;
                Reading::Signed(decode_signed(self.at(sign + 1), self.at(sign)))
            }
            Shape::Combined { high, divisor } => {
                let high = high as u16;
                Reading::Wide(decode_wide(
                    combine32(self.at(high), self.at(high + 1)),
                    divisor,
                ))
            }
            Shape::Raw { register } => Reading::Raw(self.get(register)),
            Shape::Triple { first } => {
                let first = first as u16;
                Reading::Triple([self.at(first), self.at(first + 1), self.at(first + 2)])
            }
        }
    }

    /// Decode a property as a float. Triples decode to NaN.
    pub fn value(&self, property: Property, scaling: &ScalingFactors) -> f32 {
        self.decode(property, scaling)
            .as_f32()
            .unwrap_or(f32::NAN)
    }

    /// Decode a 32-bit property as a double. Triples decode to NaN.
    pub fn wide(&self, property: Property, scaling: &ScalingFactors) -> f64 {
        self.decode(property, scaling)
            .as_f64()
            .unwrap_or(f64::NAN)
    }

    /// Decode a signed property. Other shapes yield their first register.
    pub fn signed(&self, property: Property) -> i32 {
        match property.shape() {
            Shape::Signed { sign } => {
                let sign = sign as u16;
                decode_signed(self.at(sign + 1), self.at(sign))
            }
            shape => self.at(shape.span().0) as i32,
        }
    }
}
