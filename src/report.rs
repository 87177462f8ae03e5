//! Aggregate views built from large block reads.
//!
//! Both views are plain data. The [`Display`](core::fmt::Display) impl of [`StatusReport`] renders the console
//! layout; what to do with it is up to the caller.

use core::fmt;

use crate::{
    preset::MemoryPreset,
    register::{Property, RdRegister, RegisterBlock},
    scaling::ScalingFactors,
    types::{ControlMode, DeviceInfo, ProtectionState, Reading, State},
};

/// Number of registers covered by the status block read, starting at register 0.
pub const STATUS_BLOCK_LEN: usize = 84;

/// First register of the charge overview block.
pub const CHARGE_BLOCK_START: u16 = RdRegister::TempInternalSign as u16;

/// Number of registers covered by the charge overview block (registers 4 - 41).
pub const CHARGE_BLOCK_LEN: usize = 38;

/// Number of memory preset slots.
pub const PRESET_COUNT: usize = 10;

/// Everything the PSU reports, read in one go.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub info: DeviceInfo,
    pub input_voltage: f32,
    /// °C
    pub temperature_internal: i32,
    /// External probe, °C
    pub temperature_external: i32,
    pub output_voltage: f32,
    pub output_current: f32,
    pub output_power: f64,
    pub voltage_setting: f32,
    pub current_setting: f32,
    pub voltage_protection: f32,
    pub current_protection: f32,
    pub protection_state: ProtectionState,
    pub control_mode: ControlMode,
    pub output: State,
    pub battery_mode: State,
    pub battery_voltage: f32,
    pub capacity_ah: f64,
    pub energy_wh: f64,
    pub presets: [MemoryPreset; PRESET_COUNT],
}

impl StatusReport {
    /// Decode the report from the 84-register status block and the separately read presets.
    pub fn from_block(
        registers: &[u16; STATUS_BLOCK_LEN],
        scaling: &ScalingFactors,
        presets: [MemoryPreset; PRESET_COUNT],
    ) -> Self {
        let block = RegisterBlock::new(0, registers);
        let identity = [
            block.get(RdRegister::Model),
            block.get(RdRegister::SerialHigh),
            block.get(RdRegister::SerialLow),
            block.get(RdRegister::Firmware),
        ];

        Self {
            info: DeviceInfo::from_registers(&identity),
            input_voltage: block.value(Property::InputVoltage, scaling),
            temperature_internal: block.signed(Property::TemperatureInternal),
            temperature_external: block.signed(Property::TemperatureExternal),
            output_voltage: block.value(Property::OutputVoltage, scaling),
            output_current: block.value(Property::OutputCurrent, scaling),
            output_power: block.wide(Property::OutputPower, scaling),
            voltage_setting: block.value(Property::Voltage, scaling),
            current_setting: block.value(Property::Current, scaling),
            voltage_protection: block.value(Property::VoltageProtection, scaling),
            current_protection: block.value(Property::CurrentProtection, scaling),
            protection_state: ProtectionState::from(block.get(RdRegister::Protect)),
            control_mode: ControlMode::from(block.get(RdRegister::CvCc)),
            output: State::from(block.get(RdRegister::Output)),
            battery_mode: State::from(block.get(RdRegister::BatteryMode)),
            battery_voltage: block.value(Property::BatteryVoltage, scaling),
            capacity_ah: block.wide(Property::CapacityAh, scaling),
            energy_wh: block.wide(Property::EnergyWh, scaling),
            presets,
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== Device")?;
        writeln!(f, "Model   : {}", self.info.model_code)?;
        writeln!(f, "SN      : {:08}", self.info.serial_number)?;
        writeln!(f, "Firmware: {}", self.info.firmware_version)?;
        writeln!(f, "Input   : {}V", self.input_voltage)?;
        writeln!(f, "Temp    : {}°C", self.temperature_internal)?;
        writeln!(f, "TempProb: {}°C", self.temperature_external)?;
        writeln!(f, "== Output")?;
        writeln!(f, "State   : {:?} ({:?})", self.output, self.control_mode)?;
        writeln!(f, "Voltage : {}V", self.output_voltage)?;
        writeln!(f, "Current : {}A", self.output_current)?;
        writeln!(f, "Power   : {}W", self.output_power)?;
        writeln!(f, "== Settings")?;
        writeln!(f, "Voltage : {}V", self.voltage_setting)?;
        writeln!(f, "Current : {}A", self.current_setting)?;
        writeln!(f, "== Protection")?;
        writeln!(f, "Voltage : {}V", self.voltage_protection)?;
        writeln!(f, "Current : {}A", self.current_protection)?;
        writeln!(f, "State   : {:?}", self.protection_state)?;
        writeln!(f, "== Battery")?;
        if bool::from(self.battery_mode) {
            writeln!(f, "Active")?;
            writeln!(f, "Voltage : {}V", self.battery_voltage)?;
        }
        writeln!(f, "Capacity: {}Ah", self.capacity_ah)?;
        writeln!(f, "Energy  : {}Wh", self.energy_wh)?;
        writeln!(f, "== Memories")?;
        for (slot, preset) in self.presets.iter().enumerate() {
            writeln!(f, "M{}: {}", slot, preset)?;
        }
        Ok(())
    }
}

/// Battery charging telemetry, from one block read of registers 4 - 41.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeOverview {
    /// Output enable register, unmodified.
    pub enable: u16,
    pub battvoltage: f32,
    /// Current setting, amps.
    pub current: f32,
    /// Output power, watts.
    pub measpower: f64,
    /// Input voltage, volts.
    pub voltage: f32,
    /// External probe, °C.
    pub meastemp_external: i32,
    /// °C
    pub meastemp_internal: i32,
    /// Accumulated energy, watt-hours.
    pub measwh: f64,
}

impl ChargeOverview {
    /// Decode from the block starting at [`CHARGE_BLOCK_START`].
    pub fn from_block(registers: &[u16; CHARGE_BLOCK_LEN], scaling: &ScalingFactors) -> Self {
        let block = RegisterBlock::new(CHARGE_BLOCK_START, registers);
        Self {
            enable: block.get(RdRegister::Output),
            battvoltage: block.value(Property::BatteryVoltage, scaling),
            current: block.value(Property::Current, scaling),
            measpower: block.wide(Property::OutputPower, scaling),
            voltage: block.value(Property::InputVoltage, scaling),
            meastemp_external: block.signed(Property::TemperatureExternal),
            meastemp_internal: block.signed(Property::TemperatureInternal),
            measwh: block.wide(Property::EnergyWh, scaling),
        }
    }

    /// The overview as a named mapping.
    pub fn entries(&self) -> [(&'static str, Reading); 8] {
        [
            ("enable", Reading::Raw(self.enable)),
            ("battvoltage", Reading::Value(self.battvoltage)),
            ("current", Reading::Value(self.current)),
            ("measpower", Reading::Wide(self.measpower)),
            ("voltage", Reading::Value(self.voltage)),
            ("meastemp_external", Reading::Signed(self.meastemp_external)),
            ("meastemp_internal", Reading::Signed(self.meastemp_internal)),
            ("measwh", Reading::Wide(self.measwh)),
        ]
    }

    /// Look up one entry of [`Self::entries`] by name.
    pub fn get(&self, name: &str) -> Option<Reading> {
        self.entries()
            .into_iter()
            .find(|(key, _)| *key == name)
            .map(|(_, reading)| reading)
    }
}
