use core::fmt;

use strum::EnumCount;
use strum_macros::{EnumCount as EnumCountMacro, EnumIter};
use thiserror::Error;

use crate::scaling::{Quantity, ScalingFactors, decode_scaled, encode_scaled};

/// The base address of the first preset registers.
///
/// Base address of preset = PRESET_OFFSET + {slot number} * [`PresetOffsets::COUNT`].
///
/// There are 10 slots: M0 - M9. M0 holds the active settings.
pub const PRESET_OFFSET: u16 = 80;

/// These are the offsets from the base address of each preset slot.
#[derive(Debug, Copy, Clone, EnumCountMacro, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u16)]
pub enum PresetOffsets {
    /// __R/W__ - Voltage setting.
    VSet = 0x00,
    /// __R/W__ - Current setting.
    ISet = 0x01,
    /// __R/W__ - Over voltage protection.
    SOvp = 0x02,
    /// __R/W__ - Over current protection.
    SOcp = 0x03,
}

impl PresetOffsets {
    /// Return the address of this register in the given slot.
    pub fn address_in_slot(&self, slot: PresetSlot) -> u16 {
        slot.base_address() + *self as u16
    }
}

/// This enum represents all possible preset slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
#[repr(u16)]
pub enum PresetSlot {
    M0 = 0,
    M1 = 1,
    M2 = 2,
    M3 = 3,
    M4 = 4,
    M5 = 5,
    M6 = 6,
    M7 = 7,
    M8 = 8,
    M9 = 9,
}

impl PresetSlot {
    /// Address of the slot's first register.
    pub fn base_address(&self) -> u16 {
        PRESET_OFFSET + *self as u16 * PresetOffsets::COUNT as u16
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetError {
    #[error("Preset slot {0} does not exist, slots are 0 - 9")]
    InvalidSlot(u8),
}

impl TryFrom<u8> for PresetSlot {
    type Error = PresetError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use PresetSlot as PS;
        match value {
            0 => Ok(PS::M0),
            1 => Ok(PS::M1),
            2 => Ok(PS::M2),
            3 => Ok(PS::M3),
            4 => Ok(PS::M4),
            5 => Ok(PS::M5),
            6 => Ok(PS::M6),
            7 => Ok(PS::M7),
            8 => Ok(PS::M8),
            9 => Ok(PS::M9),
            other => Err(PresetError::InvalidSlot(other)),
        }
    }
}

impl fmt::Display for PresetSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.index())
    }
}

/// One stored (voltage, current, OVP, OCP) configuration. Volts and amps.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemoryPreset {
    pub voltage: f32,
    pub current: f32,
    pub over_voltage: f32,
    pub over_current: f32,
}

impl MemoryPreset {
    /// A preset with the given output, and protections left at zero.
    pub fn new(voltage: f32, current: f32) -> Self {
        Self {
            voltage,
            current,
            ..Default::default()
        }
    }

    /// Set over-voltage protection level in preset.
    pub fn with_ovp(mut self, voltage: f32) -> Self {
        self.over_voltage = voltage;
        self
    }

    /// Set over-current protection level in preset.
    pub fn with_ocp(mut self, current: f32) -> Self {
        self.over_current = current;
        self
    }

    pub fn from_registers(
        registers: &[u16; PresetOffsets::COUNT],
        scaling: &ScalingFactors,
    ) -> Self {
        let volts = |raw: u16| decode_scaled(raw as u32, scaling.divisor(Quantity::Voltage));
        let amps = |raw: u16| decode_scaled(raw as u32, scaling.divisor(Quantity::Current));
        Self {
            voltage: volts(registers[PresetOffsets::VSet as usize]),
            current: amps(registers[PresetOffsets::ISet as usize]),
            over_voltage: volts(registers[PresetOffsets::SOvp as usize]),
            over_current: amps(registers[PresetOffsets::SOcp as usize]),
        }
    }

    /// Raw register values for this preset, or `None` if a value does not fit its register.
    pub fn to_registers(&self, scaling: &ScalingFactors) -> Option<[u16; PresetOffsets::COUNT]> {
        let mut write_buffer = [0u16; PresetOffsets::COUNT];
        let voltage_divisor = scaling.divisor(Quantity::Voltage);
        let current_divisor = scaling.divisor(Quantity::Current);

        write_buffer[PresetOffsets::VSet as usize] = encode_scaled(self.voltage, voltage_divisor)?;
        write_buffer[PresetOffsets::ISet as usize] = encode_scaled(self.current, current_divisor)?;
        write_buffer[PresetOffsets::SOvp as usize] =
            encode_scaled(self.over_voltage, voltage_divisor)?;
        write_buffer[PresetOffsets::SOcp as usize] =
            encode_scaled(self.over_current, current_divisor)?;
        Some(write_buffer)
    }
}

impl fmt::Display for MemoryPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:4.1}V, {:3.3}A, OVP:{:4.1}V, OCP:{:3.3}A",
            self.voltage, self.current, self.over_voltage, self.over_current
        )
    }
}
