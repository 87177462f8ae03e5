//! Adapter from a `serialport` port to the `embedded_io` traits, and USB discovery of connected
//! PSUs.

use std::time::Duration;

use fugit::MillisDurationU32;
use serialport::{ClearBuffer, DataBits, Parity, SerialPort, SerialPortType, StopBits};
use thiserror::Error;

use crate::{
    config::ConnectionConfig, psu::RdPsu, rtu::RtuTransport, transport::LineControl,
};

/// USB vendor id of the CH340 bridge in the RD60xx.
pub const USB_VID: u16 = 0x1A86;
/// USB product id of the CH340 bridge in the RD60xx.
pub const USB_PID: u16 = 0x7523;

#[derive(Debug)]
pub struct IoError(std::io::Error);

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        use embedded_io::ErrorKind as E;
        use std::io::ErrorKind as S;
        match self.0.kind() {
            S::NotFound => E::NotFound,
            S::PermissionDenied => E::PermissionDenied,
            S::BrokenPipe => E::BrokenPipe,
            S::InvalidInput => E::InvalidInput,
            S::InvalidData => E::InvalidData,
            // Serial ports report an expired read timeout as either of these. Only this counts as
            // silence, anything else is a hard error.
            S::TimedOut | S::WouldBlock => E::TimedOut,
            S::Interrupted => E::Interrupted,
            S::Unsupported => E::Unsupported,
            S::OutOfMemory => E::OutOfMemory,
            _ => E::Other,
        }
    }
}

/// A serial port whose read and write timeouts are tracked separately.
///
/// `serialport` only has one timeout per port, so the matching one is applied before each read or
/// write.
pub struct SerialInterface {
    port: Box<dyn SerialPort>,
    read_timeout: MillisDurationU32,
    write_timeout: MillisDurationU32,
    applied: MillisDurationU32,
}

impl SerialInterface {
    /// Open `port_name` as 8N1 with the baud rate and timeouts of `config`.
    pub fn open(port_name: &str, config: &ConnectionConfig) -> Result<Self, serialport::Error> {
        let port = serialport::new(port_name, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(to_std(config.read_timeout))
            .open()?;
        log::debug!("Opened {} at {} baud", port_name, config.baud_rate);

        Ok(Self::from_port(port, config))
    }

    /// Wrap an already opened port. Its current timeout is replaced on first use.
    pub fn from_port(port: Box<dyn SerialPort>, config: &ConnectionConfig) -> Self {
        Self {
            port,
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
            applied: MillisDurationU32::millis(u32::MAX),
        }
    }

    pub fn name(&self) -> Option<String> {
        self.port.name()
    }

    fn apply_timeout(&mut self, timeout: MillisDurationU32) -> Result<(), IoError> {
        if self.applied != timeout {
            self.port
                .set_timeout(to_std(timeout))
                .map_err(|e| IoError(e.into()))?;
            self.applied = timeout;
        }
        Ok(())
    }
}

fn to_std(timeout: MillisDurationU32) -> Duration {
    Duration::from_millis(timeout.to_millis() as u64)
}

impl embedded_io::ErrorType for SerialInterface {
    type Error = IoError;
}

impl embedded_io::Read for SerialInterface {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.apply_timeout(self.read_timeout)?;
        std::io::Read::read(&mut self.port, buf).map_err(IoError)
    }
}

impl embedded_io::Write for SerialInterface {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.apply_timeout(self.write_timeout)?;
        std::io::Write::write(&mut self.port, buf).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::Write::flush(&mut self.port).map_err(IoError)
    }
}

impl LineControl for SerialInterface {
    fn read_timeout(&self) -> MillisDurationU32 {
        self.read_timeout
    }

    fn set_read_timeout(&mut self, timeout: MillisDurationU32) {
        self.read_timeout = timeout;
    }

    fn write_timeout(&self) -> MillisDurationU32 {
        self.write_timeout
    }

    fn set_write_timeout(&mut self, timeout: MillisDurationU32) {
        self.write_timeout = timeout;
    }

    fn discard_input(&mut self) -> Result<(), Self::Error> {
        self.port
            .clear(ClearBuffer::Input)
            .map_err(|e| IoError(e.into()))
    }
}

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Failed to enumerate serial ports: {0}")]
    Enumerate(#[from] serialport::Error),
    #[error("No PSU with the expected model found")]
    NotFound,
}

/// Whether a port looks like the USB serial bridge of an RD60xx.
pub fn is_psu_port(port_type: &SerialPortType) -> bool {
    matches!(port_type, SerialPortType::UsbPort(info) if info.vid == USB_VID && info.pid == USB_PID)
}

/// Names of all serial ports with the RD60xx USB ids.
pub fn candidate_ports() -> Result<Vec<String>, serialport::Error> {
    Ok(serialport::available_ports()?
        .into_iter()
        .filter(|port| is_psu_port(&port.port_type))
        .map(|port| port.port_name)
        .collect())
}

/// Find the first USB connected PSU identifying as `expected_model_code`, and open a handle to it.
pub fn discover(
    config: &ConnectionConfig,
    expected_model_code: u32,
) -> Result<RdPsu<RtuTransport<SerialInterface>>, DiscoveryError> {
    for port_name in candidate_ports()? {
        log::debug!("Probing {} for RD{}", port_name, expected_model_code);
        let transport = match config.open(&port_name) {
            Ok(transport) => transport,
            Err(e) => {
                log::warn!("Could not open {}: {}", port_name, e);
                continue;
            }
        };
        match RdPsu::open_expected(transport, expected_model_code) {
            Ok(psu) => {
                log::info!("Found {} on {}", psu, port_name);
                return Ok(psu);
            }
            Err(e) => log::debug!("Skipping {}: {}", port_name, e),
        }
    }
    Err(DiscoveryError::NotFound)
}
