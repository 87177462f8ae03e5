use fugit::MillisDurationU32;

use crate::{
    error::{Error, Result},
    preset::{MemoryPreset, PresetOffsets, PresetSlot},
    register::{Property, RegisterBlock, Shape},
    report::{
        CHARGE_BLOCK_LEN, CHARGE_BLOCK_START, ChargeOverview, PRESET_COUNT, STATUS_BLOCK_LEN,
        StatusReport,
    },
    retry::{RetryCounter, RetryOn},
    scaling::{ProductModel, ScalingFactors, encode_scaled, scaling_for_model},
    transport::Transport,
    types::{ControlMode, DeviceInfo, ProtectionState, Reading, Setting, State, Temperature},
};
use strum::{EnumCount, IntoEnumIterator};

/// Number of identity registers, starting at register 0.
const IDENTITY_LEN: usize = 4;

/// Read the identity registers through `retry` and decode them.
pub fn identify<T: Transport>(
    transport: &mut T,
    retry: &mut RetryCounter,
) -> Result<DeviceInfo, T::Error> {
    let mut registers = [0u16; IDENTITY_LEN];
    retry.run(transport, RetryOn::NoResponseOrInvalid, |t| {
        t.read_registers(0, &mut registers)
    })?;
    Ok(DeviceInfo::from_registers(&registers))
}

/// Handle to one connected RD60xx PSU.
///
/// You can create an RdPsu using any [`Transport`], typically an [`RtuTransport`](crate::rtu::RtuTransport).
///
/// For it's methods, we generally use the nomenclature that "set" means to write a configuration and "get" means
/// to read back a configuration value. Where as "read" means to get a measured value.
///
/// Every register access goes through the handle's retry counter. Transient failures are retried up to the
/// retry budget; once it is used up every call returns [`Error::CommunicationDegraded`] until
/// [`Self::clear_retry`] is called.
pub struct RdPsu<T: Transport> {
    transport: T,
    info: DeviceInfo,
    scaling: ScalingFactors,
    retry: RetryCounter,
}

impl<T: Transport> RdPsu<T> {
    /// Identify the device on `transport` and create a handle for it, with the default retry budget.
    pub fn new(transport: T) -> Result<Self, T::Error> {
        Self::with_retry_budget(transport, crate::retry::DEFAULT_RETRY_BUDGET)
    }

    /// Identify the device on `transport` and create a handle for it.
    pub fn with_retry_budget(mut transport: T, retry_budget: u32) -> Result<Self, T::Error> {
        let mut retry = RetryCounter::new(retry_budget);
        let info = identify(&mut transport, &mut retry)?;
        let scaling = scaling_for_model(info.model_code);

        if ProductModel::from_code(info.model_code).is_none() {
            log::warn!(
                "Unrecognised model code {}, assuming RD6006 scaling {:?}",
                info.model_code,
                scaling
            );
        }
        log::debug!("Connected to {}", info);

        Ok(Self {
            transport,
            info,
            scaling,
            retry,
        })
    }

    /// Probe `transport` and only create a handle if it identifies as `expected_model_code`.
    pub fn open_expected(mut transport: T, expected_model_code: u32) -> Result<Self, T::Error> {
        if !Self::probe(&mut transport, expected_model_code) {
            return Err(Error::NotReachable);
        }
        Self::new(transport)
    }

    /// Check whether the device on `transport` identifies as `expected_model_code`.
    ///
    /// A single attempt, without retries. Any failure counts as not reachable.
    pub fn probe(transport: &mut T, expected_model_code: u32) -> bool {
        let mut registers = [0u16; IDENTITY_LEN];
        match transport.read_registers(0, &mut registers) {
            Ok(()) => {
                let info = DeviceInfo::from_registers(&registers);
                log::debug!("Probe found model code {}", info.model_code);
                info.model_code == expected_model_code
            }
            Err(e) => {
                log::debug!("Probe failed: {:?}", e);
                false
            }
        }
    }

    pub fn device_info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn serial_number(&self) -> u32 {
        self.info.serial_number
    }

    pub fn firmware_version(&self) -> f32 {
        self.info.firmware_version
    }

    pub fn model_code(&self) -> u32 {
        self.info.model_code
    }

    /// `None` when the model code is not in the model table.
    pub fn product_model(&self) -> Option<ProductModel> {
        ProductModel::from_code(self.info.model_code)
    }

    pub fn scaling_factors(&self) -> &ScalingFactors {
        &self.scaling
    }

    /// Give back the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    // Retry wrapped register access.

    /// Read a single register. Retries when the device does not respond.
    pub fn read_register(&mut self, register: impl Into<u16>) -> Result<u16, T::Error> {
        let register = register.into();
        self.retry
            .run(&mut self.transport, RetryOn::NoResponse, |t| t.read_register(register))
    }

    /// Read consecutive registers into `registers`. Retries on silence and on malformed responses.
    pub fn read_registers(
        &mut self,
        start: impl Into<u16>,
        registers: &mut [u16],
    ) -> Result<(), T::Error> {
        let start = start.into();
        self.retry
            .run(&mut self.transport, RetryOn::NoResponseOrInvalid, |t| {
                t.read_registers(start, &mut *registers)
            })
    }

    /// Write a single register. Retries when the device does not respond.
    pub fn write_register(
        &mut self,
        register: impl Into<u16>,
        value: u16,
    ) -> Result<(), T::Error> {
        let register = register.into();
        self.retry.run(&mut self.transport, RetryOn::NoResponse, |t| {
            t.write_register(register, value)
        })
    }

    /// Whether the retry budget is used up.
    pub fn is_failed(&self) -> bool {
        self.retry.is_failed()
    }

    /// Leave the failed state, allowing further register access.
    pub fn clear_retry(&mut self) {
        self.retry.clear();
    }

    pub fn failed_attempts(&self) -> u32 {
        self.retry.failed_attempts()
    }

    pub fn retry_budget(&self) -> u32 {
        self.retry.budget()
    }

    // Timeouts.

    pub fn read_timeout(&self) -> MillisDurationU32 {
        self.transport.read_timeout()
    }

    pub fn set_read_timeout(&mut self, timeout: MillisDurationU32) {
        self.transport.set_read_timeout(timeout);
    }

    pub fn write_timeout(&self) -> MillisDurationU32 {
        self.transport.write_timeout()
    }

    pub fn set_write_timeout(&mut self, timeout: MillisDurationU32) {
        self.transport.set_write_timeout(timeout);
    }

    // Property table access.

    /// Read and decode any named property.
    pub fn read_property(&mut self, property: Property) -> Result<Reading, T::Error> {
        let (start, count) = property.shape().span();
        let mut buffer = [0u16; 3];
        let registers = &mut buffer[..count];
        if count == 1 {
            registers[0] = self.read_register(start)?;
        } else {
            self.read_registers(start, registers)?;
        }
        Ok(RegisterBlock::new(start, registers).decode(property, &self.scaling))
    }

    /// Encode and write any writable named property.
    pub fn write_property(&mut self, property: Property, setting: Setting) -> Result<(), T::Error> {
        if !property.is_writable() {
            return Err(Error::ReadOnly(property.name()));
        }
        match (property.shape(), setting) {
            (Shape::Scaled { register, quantity }, Setting::Value(value)) => {
                let raw = encode_scaled(value, self.scaling.divisor(quantity))
                    .ok_or(Error::InvalidRange)?;
                self.write_register(register, raw)
            }
            (Shape::Raw { register }, Setting::Raw(raw)) => self.write_register(register, raw),
            (Shape::Triple { first }, Setting::Triple(values)) => {
                for (address, value) in (first as u16..).zip(values) {
                    self.write_register(address, value)?;
                }
                Ok(())
            }
            _ => Err(Error::SettingMismatch(property.name())),
        }
    }

    fn read_value(&mut self, property: Property) -> Result<f32, T::Error> {
        match self.read_property(property)? {
            Reading::Value(value) => Ok(value),
            _ => Err(Error::SettingMismatch(property.name())),
        }
    }

    fn read_wide(&mut self, property: Property) -> Result<f64, T::Error> {
        match self.read_property(property)? {
            Reading::Wide(value) => Ok(value),
            _ => Err(Error::SettingMismatch(property.name())),
        }
    }

    fn read_raw(&mut self, property: Property) -> Result<u16, T::Error> {
        match self.read_property(property)? {
            Reading::Raw(value) => Ok(value),
            _ => Err(Error::SettingMismatch(property.name())),
        }
    }

    fn read_signed(&mut self, property: Property) -> Result<i32, T::Error> {
        match self.read_property(property)? {
            Reading::Signed(value) => Ok(value),
            _ => Err(Error::SettingMismatch(property.name())),
        }
    }

    fn read_triple(&mut self, property: Property) -> Result<(u16, u16, u16), T::Error> {
        match self.read_property(property)? {
            Reading::Triple([a, b, c]) => Ok((a, b, c)),
            _ => Err(Error::SettingMismatch(property.name())),
        }
    }

    // Settings.

    /// Set the output target voltage, in volts.
    pub fn set_voltage(&mut self, volts: f32) -> Result<(), T::Error> {
        self.write_property(Property::Voltage, Setting::Value(volts))
    }

    /// Get the output target voltage, in volts.
    pub fn get_voltage(&mut self) -> Result<f32, T::Error> {
        self.read_value(Property::Voltage)
    }

    /// Set the output current limit, in amps.
    pub fn set_current(&mut self, amps: f32) -> Result<(), T::Error> {
        self.write_property(Property::Current, Setting::Value(amps))
    }

    /// Get the output current limit, in amps.
    pub fn get_current(&mut self) -> Result<f32, T::Error> {
        self.read_value(Property::Current)
    }

    /// Set the over voltage protection level, in volts.
    pub fn set_voltage_protection(&mut self, volts: f32) -> Result<(), T::Error> {
        self.write_property(Property::VoltageProtection, Setting::Value(volts))
    }

    pub fn get_voltage_protection(&mut self) -> Result<f32, T::Error> {
        self.read_value(Property::VoltageProtection)
    }

    /// Set the over current protection level, in amps.
    pub fn set_current_protection(&mut self, amps: f32) -> Result<(), T::Error> {
        self.write_property(Property::CurrentProtection, Setting::Value(amps))
    }

    pub fn get_current_protection(&mut self) -> Result<f32, T::Error> {
        self.read_value(Property::CurrentProtection)
    }

    /// Enable/disable the output.
    pub fn set_output_state(&mut self, state: impl Into<State>) -> Result<(), T::Error> {
        let state: State = state.into();
        self.write_property(Property::Enable, Setting::Raw(state as u16))
    }

    /// Read whether the output is enabled or disabled.
    pub fn get_output_state(&mut self) -> Result<State, T::Error> {
        Ok(State::from(self.read_raw(Property::Enable)?))
    }

    /// Set the backlight brightness level. 0 - 5 on current firmware.
    pub fn set_backlight(&mut self, level: u16) -> Result<(), T::Error> {
        self.write_property(Property::Backlight, Setting::Raw(level))
    }

    pub fn get_backlight(&mut self) -> Result<u16, T::Error> {
        self.read_raw(Property::Backlight)
    }

    /// Get the clock date as (year, month, day).
    pub fn get_date(&mut self) -> Result<(u16, u16, u16), T::Error> {
        self.read_triple(Property::Date)
    }

    /// Set the clock date from (year, month, day).
    pub fn set_date(&mut self, (year, month, day): (u16, u16, u16)) -> Result<(), T::Error> {
        self.write_property(Property::Date, Setting::Triple([year, month, day]))
    }

    /// Get the clock time as (hours, minutes, seconds).
    pub fn get_time(&mut self) -> Result<(u16, u16, u16), T::Error> {
        self.read_triple(Property::Time)
    }

    /// Set the clock time from (hours, minutes, seconds).
    pub fn set_time(&mut self, (hours, minutes, seconds): (u16, u16, u16)) -> Result<(), T::Error> {
        self.write_property(Property::Time, Setting::Triple([hours, minutes, seconds]))
    }

    // Measurements.

    /// Return the measured supply input voltage in volts.
    pub fn read_input_voltage(&mut self) -> Result<f32, T::Error> {
        self.read_value(Property::InputVoltage)
    }

    /// Return the measured output voltage in volts.
    pub fn read_output_voltage(&mut self) -> Result<f32, T::Error> {
        self.read_value(Property::OutputVoltage)
    }

    /// Return the measured output current in amps.
    pub fn read_output_current(&mut self) -> Result<f32, T::Error> {
        self.read_value(Property::OutputCurrent)
    }

    /// Return the measured output power in watts.
    pub fn read_output_power(&mut self) -> Result<f64, T::Error> {
        self.read_wide(Property::OutputPower)
    }

    /// Return the accumulated output charge in amp-hours.
    pub fn read_capacity_ah(&mut self) -> Result<f64, T::Error> {
        self.read_wide(Property::CapacityAh)
    }

    /// Return the accumulated output energy in watt-hours.
    pub fn read_energy_wh(&mut self) -> Result<f64, T::Error> {
        self.read_wide(Property::EnergyWh)
    }

    /// Whether the PSU is in battery charging mode.
    pub fn read_battery_mode(&mut self) -> Result<State, T::Error> {
        Ok(State::from(self.read_raw(Property::BatteryMode)?))
    }

    pub fn read_battery_voltage(&mut self) -> Result<f32, T::Error> {
        self.read_value(Property::BatteryVoltage)
    }

    /// Return which protection has been triggered, if any.
    pub fn read_protection_state(&mut self) -> Result<ProtectionState, T::Error> {
        Ok(ProtectionState::from(self.read_raw(Property::ProtectionState)?))
    }

    /// Get the currently active control mode. (CV or CC.)
    pub fn read_control_mode(&mut self) -> Result<ControlMode, T::Error> {
        Ok(ControlMode::from(self.read_raw(Property::ControlMode)?))
    }

    /// Return the measured internal temperature.
    pub fn read_temperature_internal(&mut self) -> Result<Temperature, T::Error> {
        Ok(Temperature::Celsius(
            self.read_signed(Property::TemperatureInternal)?,
        ))
    }

    /// Return the internal temperature as the PSU reports it in fahrenheit.
    pub fn read_temperature_internal_f(&mut self) -> Result<Temperature, T::Error> {
        Ok(Temperature::Fahrenheit(
            self.read_signed(Property::TemperatureInternalF)?,
        ))
    }

    /// Return the measured external temperature probe.
    pub fn read_temperature_external(&mut self) -> Result<Temperature, T::Error> {
        Ok(Temperature::Celsius(
            self.read_signed(Property::TemperatureExternal)?,
        ))
    }

    pub fn read_temperature_external_f(&mut self) -> Result<Temperature, T::Error> {
        Ok(Temperature::Fahrenheit(
            self.read_signed(Property::TemperatureExternalF)?,
        ))
    }

    // Presets.

    /// Read one memory preset slot.
    pub fn get_preset(&mut self, slot: PresetSlot) -> Result<MemoryPreset, T::Error> {
        let mut registers = [0u16; PresetOffsets::COUNT];
        self.read_registers(slot.base_address(), &mut registers)?;
        Ok(MemoryPreset::from_registers(&registers, &self.scaling))
    }

    /// Store a preset in a memory slot.
    ///
    /// __Note:__ M0 holds the active settings, so writing it changes the output immediately.
    pub fn set_preset(&mut self, slot: PresetSlot, preset: &MemoryPreset) -> Result<(), T::Error> {
        let registers = preset
            .to_registers(&self.scaling)
            .ok_or(Error::InvalidRange)?;
        for (address, value) in (slot.base_address()..).zip(registers) {
            self.write_register(address, value)?;
        }
        Ok(())
    }

    // Aggregates.

    /// Read everything: the 84-register status block, then each memory preset.
    pub fn status_report(&mut self) -> Result<StatusReport, T::Error> {
        let mut registers = [0u16; STATUS_BLOCK_LEN];
        self.read_registers(0u16, &mut registers)?;

        let mut presets = [MemoryPreset::default(); PRESET_COUNT];
        for (preset, slot) in presets.iter_mut().zip(PresetSlot::iter()) {
            *preset = self.get_preset(slot)?;
        }
        Ok(StatusReport::from_block(&registers, &self.scaling, presets))
    }

    /// Read the battery charging telemetry in one transaction.
    pub fn charge_overview(&mut self) -> Result<ChargeOverview, T::Error> {
        let mut registers = [0u16; CHARGE_BLOCK_LEN];
        self.read_registers(CHARGE_BLOCK_START, &mut registers)?;
        Ok(ChargeOverview::from_block(&registers, &self.scaling))
    }
}

impl<T: Transport> core::fmt::Display for RdPsu<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.info)
    }
}
