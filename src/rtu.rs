//! Modbus RTU transport over a serial interface.

use embedded_io::Error;
use fugit::MillisDurationU32;

use crate::transport::{LineControl, Transport, TransportError, TransportResult};

/// Largest number of holding registers a single Modbus read may request.
pub const MAX_READ_REGISTERS: usize = 125;

/// Size of an exception response: unit id + function + exception code + CRC.
const EXCEPTION_FRAME_LEN: usize = 5;

/// Size of a write single register response, which echoes the request.
const WRITE_SINGLE_FRAME_LEN: usize = 8;

/// You can create an RtuTransport using any interface which implements [embedded_io::Read] &
/// [embedded_io::Write], plus [`LineControl`] so timeouts can be forwarded to the port and stale input dropped.
///
/// `L` is the size of the frame buffer. The default fits the largest read this crate makes (84 registers).
pub struct RtuTransport<S: embedded_io::Read + embedded_io::Write, const L: usize = 256> {
    interface: S,
    /// Default for PSU is 0x01.
    unit_id: u8,
}

impl<S, const L: usize> RtuTransport<S, L>
where
    S: embedded_io::Read + embedded_io::Write + LineControl,
{
    /// Create a new RtuTransport with the given interface and unit ID.
    pub fn new(interface: S, unit_id: u8) -> Self {
        Self { interface, unit_id }
    }

    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    pub fn interface(&self) -> &S {
        &self.interface
    }

    pub fn interface_mut(&mut self) -> &mut S {
        &mut self.interface
    }

    pub fn into_inner(self) -> S {
        self.interface
    }

    /// Read a response of `expected` bytes into `buff`.
    ///
    /// Stops early on an exception frame. A read that times out before any byte arrived is reported as
    /// [`TransportError::NoResponse`], one that times out part way through as
    /// [`TransportError::InvalidResponse`].
    fn receive(
        &mut self,
        buff: &mut heapless::Vec<u8, L>,
        expected: usize,
    ) -> TransportResult<(), S::Error> {
        let mut temp_buf = [0u8; 32];
        while buff.len() < expected {
            let wanted = core::cmp::min(temp_buf.len(), expected - buff.len());
            match self.interface.read(&mut temp_buf[..wanted]) {
                Ok(0) => return Err(Self::silence(buff)),
                Ok(bytes_read) => {
                    buff.extend_from_slice(&temp_buf[..bytes_read])
                        .map_err(|_| TransportError::InvalidResponse)?;
                    if buff.len() >= EXCEPTION_FRAME_LEN && buff[1] & 0x80 != 0 {
                        return Err(TransportError::Exception(buff[2]));
                    }
                }
                Err(e) if e.kind() == embedded_io::ErrorKind::TimedOut => {
                    return Err(Self::silence(buff));
                }
                Err(e) => return Err(TransportError::Serial(e)),
            }
        }
        Ok(())
    }

    fn silence(buff: &heapless::Vec<u8, L>) -> TransportError<S::Error> {
        if buff.is_empty() {
            TransportError::NoResponse
        } else {
            TransportError::InvalidResponse
        }
    }

    /// Send a request frame, after dropping whatever is left over from earlier exchanges.
    fn send(&mut self, frame: &[u8]) -> TransportResult<(), S::Error> {
        self.interface
            .discard_input()
            .map_err(TransportError::Serial)?;
        self.interface
            .write_all(frame)
            .map_err(TransportError::Serial)?;
        self.interface.flush().map_err(TransportError::Serial)
    }
}

impl<S, const L: usize> Transport for RtuTransport<S, L>
where
    S: embedded_io::Read + embedded_io::Write + LineControl,
{
    type Error = S::Error;

    fn read_registers(
        &mut self,
        start: u16,
        registers: &mut [u16],
    ) -> TransportResult<(), Self::Error> {
        if registers.is_empty() || registers.len() > MAX_READ_REGISTERS {
            return Err(TransportError::InvalidRequest);
        }
        let count = registers.len() as u16;

        let mut buff: heapless::Vec<u8, L> = heapless::Vec::new();
        let mut req = rmodbus::client::ModbusRequest::new(self.unit_id, rmodbus::ModbusProto::Rtu);
        req.generate_get_holdings(start, count, &mut buff)?;
        self.send(&buff)?;

        // Reuse same buffer when reading back: unit id + function + byte count + data + CRC.
        buff.clear();
        self.receive(&mut buff, 5 + 2 * registers.len())?;

        let mut parsed_data: heapless::Vec<u16, MAX_READ_REGISTERS> = heapless::Vec::new();
        req.parse_u16(&buff, &mut parsed_data)
            .map_err(|_| TransportError::InvalidResponse)?;
        if parsed_data.len() != registers.len() {
            return Err(TransportError::InvalidResponse);
        }
        registers.copy_from_slice(&parsed_data);
        Ok(())
    }

    fn write_register(&mut self, register: u16, value: u16) -> TransportResult<(), Self::Error> {
        let mut request: heapless::Vec<u8, L> = heapless::Vec::new();
        let mut response: heapless::Vec<u8, L> = heapless::Vec::new();

        let mut req = rmodbus::client::ModbusRequest::new(self.unit_id, rmodbus::ModbusProto::Rtu);
        req.generate_set_holding(register, value, &mut request)?;
        self.send(&request)?;

        self.receive(&mut response, WRITE_SINGLE_FRAME_LEN)?;
        // A successful write single register is echoed back verbatim.
        if request.as_slice() != response.as_slice() {
            Err(TransportError::InvalidResponse)
        } else {
            Ok(())
        }
    }

    fn read_timeout(&self) -> MillisDurationU32 {
        self.interface.read_timeout()
    }

    fn set_read_timeout(&mut self, timeout: MillisDurationU32) {
        self.interface.set_read_timeout(timeout);
    }

    fn write_timeout(&self) -> MillisDurationU32 {
        self.interface.write_timeout()
    }

    fn set_write_timeout(&mut self, timeout: MillisDurationU32) {
        self.interface.set_write_timeout(timeout);
    }
}
