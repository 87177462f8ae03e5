//! The register transport boundary.
//!
//! The driver only ever talks to a device through [`Transport`]: numbered holding register reads and single
//! register writes. [`RtuTransport`](crate::rtu::RtuTransport) provides a Modbus RTU implementation over any
//! `embedded_io` serial interface, but anything able to move 16-bit registers will do.

use fugit::MillisDurationU32;
use thiserror::Error;

/// Default read and write timeout for a serial link to an RD60xx.
pub const DEFAULT_TIMEOUT: MillisDurationU32 = MillisDurationU32::millis(500);

pub type TransportResult<T, I> = core::result::Result<T, TransportError<I>>;

/// Failures a transport can report for a single request/response exchange.
///
/// Only [`TransportError::NoResponse`] and [`TransportError::InvalidResponse`] are considered transient, every
/// other kind is passed straight back to the caller.
#[derive(Error, Debug)]
pub enum TransportError<I: core::fmt::Debug> {
    /// Nothing was received before the read timeout elapsed.
    #[error("No response from device")]
    NoResponse,
    /// Something was received, but it was truncated, failed its CRC or did not answer our request.
    #[error("Invalid response received")]
    InvalidResponse,
    /// The request itself cannot be represented on the wire (e.g. too many registers).
    #[error("Invalid request")]
    InvalidRequest,
    /// The device answered with a Modbus exception.
    #[error("Device reported Modbus exception {0:#04x}")]
    Exception(u8),
    #[error("Serial communication error")]
    Serial(I),
    #[error("Modbus protocol error: {0}")]
    Modbus(rmodbus::ErrorKind),
}

impl<I: core::fmt::Debug> From<rmodbus::ErrorKind> for TransportError<I> {
    fn from(err: rmodbus::ErrorKind) -> Self {
        TransportError::Modbus(err)
    }
}

/// Register level access to a single device.
pub trait Transport {
    /// Error type of the underlying interface.
    type Error: core::fmt::Debug;

    /// Read `registers.len()` consecutive holding registers starting at `start`.
    fn read_registers(
        &mut self,
        start: u16,
        registers: &mut [u16],
    ) -> TransportResult<(), Self::Error>;

    /// Read a single holding register.
    fn read_register(&mut self, register: u16) -> TransportResult<u16, Self::Error> {
        let mut value = [0u16; 1];
        self.read_registers(register, &mut value)?;
        Ok(value[0])
    }

    /// Write a single holding register.
    fn write_register(&mut self, register: u16, value: u16) -> TransportResult<(), Self::Error>;

    fn read_timeout(&self) -> MillisDurationU32;

    fn set_read_timeout(&mut self, timeout: MillisDurationU32);

    fn write_timeout(&self) -> MillisDurationU32;

    fn set_write_timeout(&mut self, timeout: MillisDurationU32);
}

/// Line level control of a serial interface: its read and write timeouts, and dropping unread input.
pub trait LineControl: embedded_io::ErrorType {
    fn read_timeout(&self) -> MillisDurationU32;

    fn set_read_timeout(&mut self, timeout: MillisDurationU32);

    fn write_timeout(&self) -> MillisDurationU32;

    fn set_write_timeout(&mut self, timeout: MillisDurationU32);

    /// Drop any bytes received but not yet read, e.g. the tail of a late reply.
    fn discard_input(&mut self) -> Result<(), Self::Error>;
}
