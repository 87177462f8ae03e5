//! Connection settings for a serial link to an RD60xx.

use fugit::MillisDurationU32;

use crate::transport::DEFAULT_TIMEOUT;

/// Factory default Modbus address of the PSU.
pub const DEFAULT_ADDRESS: u8 = 0x01;

/// Factory default baud rate of the PSU.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// How to reach a PSU. The serial line itself is always 8 data bits, no parity, 1 stop bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Modbus unit id, configurable on the front panel.
    pub address: u8,
    pub baud_rate: u32,
    pub read_timeout: MillisDurationU32,
    pub write_timeout: MillisDurationU32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ConnectionConfig {
    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_read_timeout(mut self, timeout: MillisDurationU32) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: MillisDurationU32) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Open `port_name` with these settings.
    #[cfg(feature = "serialport")]
    pub fn open(
        &self,
        port_name: &str,
    ) -> Result<crate::rtu::RtuTransport<crate::serial::SerialInterface>, serialport::Error> {
        let interface = crate::serial::SerialInterface::open(port_name, self)?;
        Ok(crate::rtu::RtuTransport::new(interface, self.address))
    }
}
