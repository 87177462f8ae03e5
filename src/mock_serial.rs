//! We use this mocking module in unit tests to emulate a serial port.
//!
//! Queued replies only arrive on the line once a request has been flushed, one reply per request, like a
//! device answering a master. Bytes can also be put on the line directly to emulate a late reply.

use fugit::MillisDurationU32;

use crate::transport::{DEFAULT_TIMEOUT, LineControl};

const BUFFER_SIZE: usize = 512;
const MAX_QUEUED_REPLIES: usize = 16;

/// Our mock type used to emulate a serial port.
pub struct MockSerial {
    /// Buffer to store data written to the mock serial port
    write_buffer: heapless::Vec<u8, BUFFER_SIZE>,
    /// Buffer containing pre-configured response data to be read
    read_buffer: heapless::Vec<u8, BUFFER_SIZE>,
    /// Current position in the read buffer
    read_position: usize,
    /// End of the bytes that have arrived on the line so far
    arrived: usize,
    /// End of each queued reply, released one per flushed request
    reply_ends: heapless::Deque<usize, MAX_QUEUED_REPLIES>,
    /// Flag to simulate write errors
    should_error_on_write: bool,
    /// Flag to simulate read errors
    should_error_on_read: bool,
    /// Flag to simulate the port going away, e.g. a USB unplug
    link_lost: bool,
    read_timeout: MillisDurationU32,
    write_timeout: MillisDurationU32,
}

#[derive(Debug)]
pub enum MockSerialError {
    /// Simulated timeout error, returned once no more bytes have arrived
    Timeout,
    /// Simulated buffer overflow
    BufferOverflow,
    /// Generic simulated error for testing
    SimulatedError,
    /// Simulated loss of the port, reported with no more specific kind
    LinkLost,
}

impl core::fmt::Display for MockSerialError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl core::error::Error for MockSerialError {}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::Timeout => embedded_io::ErrorKind::TimedOut,
            MockSerialError::BufferOverflow => embedded_io::ErrorKind::OutOfMemory,
            MockSerialError::SimulatedError => embedded_io::ErrorKind::BrokenPipe,
            MockSerialError::LinkLost => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }

        self.write_buffer
            .extend_from_slice(buf)
            .map_err(|_| MockSerialError::BufferOverflow)?;

        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        // The request is out, the device answers.
        if let Some(end) = self.reply_ends.pop_front() {
            self.arrived = end;
        }
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.link_lost {
            return Err(MockSerialError::LinkLost);
        }
        if self.should_error_on_read {
            return Err(MockSerialError::SimulatedError);
        }

        if self.read_position >= self.arrived {
            return Err(MockSerialError::Timeout);
        }

        let available_bytes = self.arrived - self.read_position;
        let bytes_to_read = core::cmp::min(buf.len(), available_bytes);

        buf[..bytes_to_read].copy_from_slice(
            &self.read_buffer[self.read_position..self.read_position + bytes_to_read],
        );

        self.read_position += bytes_to_read;
        Ok(bytes_to_read)
    }
}

impl LineControl for MockSerial {
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
        self.read_position = self.arrived;
        Ok(())
    }
}

impl MockSerial {
    /// Create a new MockSerial instance with empty buffers
    pub fn new() -> Self {
        Self {
            write_buffer: heapless::Vec::new(),
            read_buffer: heapless::Vec::new(),
            read_position: 0,
            arrived: 0,
            reply_ends: heapless::Deque::new(),
            should_error_on_write: false,
            should_error_on_read: false,
            link_lost: false,
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Drop everything pending, then queue `data` as the reply to the next request
    pub fn set_read_data(&mut self, data: &[u8]) -> Result<(), MockSerialError> {
        self.read_buffer.clear();
        self.read_position = 0;
        self.arrived = 0;
        self.reply_ends.clear();
        self.queue_read_data(data)
    }

    /// Queue `data` as the reply to the request after those already answered
    pub fn queue_read_data(&mut self, data: &[u8]) -> Result<(), MockSerialError> {
        self.read_buffer
            .extend_from_slice(data)
            .map_err(|_| MockSerialError::BufferOverflow)?;
        self.reply_ends
            .push_back(self.read_buffer.len())
            .map_err(|_| MockSerialError::BufferOverflow)
    }

    /// Put `data` on the line right away, without waiting for a request.
    ///
    /// Only valid while no queued reply is pending.
    pub fn push_arrived_data(&mut self, data: &[u8]) -> Result<(), MockSerialError> {
        self.read_buffer
            .extend_from_slice(data)
            .map_err(|_| MockSerialError::BufferOverflow)?;
        self.arrived = self.read_buffer.len();
        Ok(())
    }

    /// Get a reference to the data that was written to this mock serial port
    pub fn written_data(&self) -> &[u8] {
        &self.write_buffer
    }

    /// Configure whether write operations should fail with an error
    pub fn set_write_error(&mut self, should_error: bool) {
        self.should_error_on_write = should_error;
    }

    /// Configure whether read operations should fail with an error
    pub fn set_read_error(&mut self, should_error: bool) {
        self.should_error_on_read = should_error;
    }

    /// Configure whether reads fail as if the port had disappeared
    pub fn set_link_lost(&mut self, lost: bool) {
        self.link_lost = lost;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Error, Read, Write};

    #[test]
    fn test_write_multiple_times() {
        let mut mock = MockSerial::new();
        mock.write(b"Hello, ").unwrap();
        mock.write(b"World!").unwrap();
        assert_eq!(mock.written_data(), b"Hello, World!");
    }

    #[test]
    fn test_reply_arrives_after_flush() {
        let mut mock = MockSerial::new();
        mock.set_read_data(b"Hi there").unwrap();

        let mut buffer = [0u8; 5];
        assert!(matches!(mock.read(&mut buffer), Err(MockSerialError::Timeout)));

        mock.write(b"?").unwrap();
        mock.flush().unwrap();
        assert_eq!(mock.read(&mut buffer).unwrap(), 5);
        assert_eq!(&buffer, b"Hi th");
        assert_eq!(mock.read(&mut buffer).unwrap(), 3);

        let result = mock.read(&mut buffer);
        assert!(matches!(result, Err(MockSerialError::Timeout)));
    }

    #[test]
    fn test_queued_replies_one_per_request() {
        let mut mock = MockSerial::new();
        mock.set_read_data(b"first").unwrap();
        mock.queue_read_data(b"second").unwrap();

        let mut buffer = [0u8; 11];
        mock.flush().unwrap();
        assert_eq!(mock.read(&mut buffer).unwrap(), 5);
        assert_eq!(&buffer[..5], b"first");

        mock.flush().unwrap();
        assert_eq!(mock.read(&mut buffer).unwrap(), 6);
        assert_eq!(&buffer[..6], b"second");
    }

    #[test]
    fn test_discard_drops_only_arrived_bytes() {
        let mut mock = MockSerial::new();
        mock.push_arrived_data(b"late").unwrap();
        mock.queue_read_data(b"reply").unwrap();

        mock.discard_input().unwrap();
        mock.flush().unwrap();

        let mut buffer = [0u8; 8];
        assert_eq!(mock.read(&mut buffer).unwrap(), 5);
        assert_eq!(&buffer[..5], b"reply");
    }

    #[test]
    fn test_error_flags() {
        let mut mock = MockSerial::new();
        mock.set_write_error(true);
        assert!(matches!(
            mock.write(b"test"),
            Err(MockSerialError::SimulatedError)
        ));
        assert!(mock.written_data().is_empty());

        mock.push_arrived_data(b"data").unwrap();
        mock.set_read_error(true);
        let mut buffer = [0u8; 4];
        assert!(mock.read(&mut buffer).is_err());

        mock.set_read_error(false);
        mock.set_link_lost(true);
        assert!(matches!(mock.read(&mut buffer), Err(MockSerialError::LinkLost)));
    }

    #[test]
    fn test_error_kinds() {
        assert!(matches!(
            MockSerialError::Timeout.kind(),
            embedded_io::ErrorKind::TimedOut
        ));
        assert!(matches!(
            MockSerialError::SimulatedError.kind(),
            embedded_io::ErrorKind::BrokenPipe
        ));
        assert!(matches!(
            MockSerialError::LinkLost.kind(),
            embedded_io::ErrorKind::Other
        ));
    }
}
