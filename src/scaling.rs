//! Scaling factors for different PSU models
//!
//! RD60xx models share one register map but not one ADC/DAC resolution, so voltage and current registers must
//! be divided by a model dependent factor to get volts and amps. The mapping is kept in [`MODEL_TABLE`] so a new
//! model only needs a new row.

/// Divisor for the 32-bit output power registers (raw in centiwatts).
pub const POWER_DIVISOR: u32 = 100;
/// Divisor for the 32-bit accumulated charge registers (raw in mAh).
pub const CHARGE_DIVISOR: u32 = 1000;
/// Divisor for the 32-bit accumulated energy registers (raw in mWh).
pub const ENERGY_DIVISOR: u32 = 1000;

/// Scaling factors for converting raw voltage and current register values to volts and amps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalingFactors {
    /// Raw voltage register / `voltage_divisor` = volts.
    pub voltage_divisor: u32,
    /// Raw current register / `current_divisor` = amps.
    pub current_divisor: u32,
}

/// The physical quantity a scaled register holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Voltage,
    Current,
}

impl ScalingFactors {
    pub const fn new(voltage_divisor: u32, current_divisor: u32) -> Self {
        Self {
            voltage_divisor,
            current_divisor,
        }
    }

    /// Divisor to use for the given quantity.
    pub const fn divisor(&self, quantity: Quantity) -> u32 {
        match quantity {
            Quantity::Voltage => self.voltage_divisor,
            Quantity::Current => self.current_divisor,
        }
    }
}

/// Scaling used by the RD6006 and by any model code we do not recognise.
pub const DEFAULT_SCALING: ScalingFactors = ScalingFactors::new(100, 1000);

/// Known RD60xx models. The discriminant is the model code, i.e. register 0 / 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ProductModel {
    Rd6006 = 6006,
    Rd6012 = 6012,
    Rd6018 = 6018,
    Rd6024 = 6024,
}

/// Model code to scaling factor lookup table.
pub const MODEL_TABLE: [(ProductModel, ScalingFactors); 4] = [
    (ProductModel::Rd6006, ScalingFactors::new(100, 1000)),
    (ProductModel::Rd6012, ScalingFactors::new(100, 100)),
    (ProductModel::Rd6018, ScalingFactors::new(100, 100)),
    (ProductModel::Rd6024, ScalingFactors::new(100, 100)),
];

impl ProductModel {
    pub const fn model_code(&self) -> u32 {
        *self as u32
    }

    /// Look up a model code in [`MODEL_TABLE`].
    pub fn from_code(model_code: u32) -> Option<Self> {
        MODEL_TABLE
            .iter()
            .find(|(model, _)| model.model_code() == model_code)
            .map(|(model, _)| *model)
    }

    /// Get scaling factors for this product model.
    pub fn scaling_factors(&self) -> ScalingFactors {
        MODEL_TABLE
            .iter()
            .find(|(model, _)| model == self)
            .map(|(_, scaling)| *scaling)
            .unwrap_or(DEFAULT_SCALING)
    }
}

/// Scaling factors for a model code, falling back to [`DEFAULT_SCALING`] for unknown codes.
pub fn scaling_for_model(model_code: u32) -> ScalingFactors {
    ProductModel::from_code(model_code)
        .map(|model| model.scaling_factors())
        .unwrap_or(DEFAULT_SCALING)
}

/// Convert a raw register value into physical units.
#[inline]
pub fn decode_scaled(raw: u32, divisor: u32) -> f32 {
    raw as f32 / divisor as f32
}

/// Convert a 32-bit register pair into physical units.
///
/// Done in f64, as f32 cannot hold every 32-bit count exactly.
#[inline]
pub fn decode_wide(raw: u32, divisor: u32) -> f64 {
    raw as f64 / divisor as f64
}

/// Convert a physical value into a raw register value, rounding to the nearest step.
///
/// Returns `None` for negative, non finite or too large values.
pub fn encode_scaled(value: f32, divisor: u32) -> Option<u16> {
    let scaled = value * divisor as f32;
    // Negated comparison so NaN is rejected too.
    if !(scaled >= 0.0 && scaled < u16::MAX as f32 + 0.5) {
        return None;
    }
    Some((scaled + 0.5) as u16)
}

/// Combine two registers into a 32-bit value, high register first.
#[inline]
pub const fn combine32(high: u16, low: u16) -> u32 {
    (high as u32) << 16 | low as u32
}

/// Decode a magnitude paired with a sign flag register. Any non-zero flag means negative.
#[inline]
pub const fn decode_signed(magnitude: u16, sign_flag: u16) -> i32 {
    if sign_flag != 0 {
        -(magnitude as i32)
    } else {
        magnitude as i32
    }
}
