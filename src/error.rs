//! Our error types for the RD60xx PSUs.

use thiserror::Error;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Custom error type for Riden RD60xx PSU communications.
///
/// `I` is the error type of the underlying serial interface.
#[derive(Error, Debug)]
pub enum Error<I: core::fmt::Debug> {
    /// The device did not identify as the requested model, or did not answer the probe.
    #[error("Device not reachable or not the expected model")]
    NotReachable,
    /// The retry budget is exhausted. Call `clear_retry` before trying again.
    #[error("Retry budget exhausted, communication degraded")]
    CommunicationDegraded,
    #[error("Malformed response received")]
    MalformedResponse,
    /// The device answered with a Modbus exception code.
    #[error("Device reported Modbus exception {0:#04x}")]
    Exception(u8),
    #[error("Serial communication error")]
    SerialError(I),
    #[error("Modbus protocol error: {0}")]
    ModbusError(rmodbus::ErrorKind),
    #[error("Invalid range")]
    InvalidRange,
    #[error("Property {0} is read-only")]
    ReadOnly(&'static str),
    #[error("Setting does not match the shape of property {0}")]
    SettingMismatch(&'static str),
}

impl<I: core::fmt::Debug> From<rmodbus::ErrorKind> for Error<I> {
    fn from(err: rmodbus::ErrorKind) -> Self {
        Error::ModbusError(err)
    }
}
