//! A register-level transport double for driver tests.

use fugit::MillisDurationU32;

use crate::transport::{DEFAULT_TIMEOUT, Transport, TransportError, TransportResult};

pub const REGISTER_COUNT: usize = 128;
const MAX_WRITES: usize = 64;
const MAX_SCRIPTED: usize = 16;

#[derive(Debug)]
pub struct MockIoError;

/// Failure to inject for an upcoming transport call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    NoResponse,
    InvalidResponse,
    Exception(u8),
    Serial,
}

impl Failure {
    fn into_error(self) -> TransportError<MockIoError> {
        match self {
            Failure::NoResponse => TransportError::NoResponse,
            Failure::InvalidResponse => TransportError::InvalidResponse,
            Failure::Exception(code) => TransportError::Exception(code),
            Failure::Serial => TransportError::Serial(MockIoError),
        }
    }
}

/// Emulates a device as a flat bank of holding registers.
pub struct MockTransport {
    pub registers: [u16; REGISTER_COUNT],
    /// Successful writes, in order.
    pub writes: heapless::Vec<(u16, u16), MAX_WRITES>,
    /// Number of calls made, failed or not.
    pub attempts: usize,
    scripted: heapless::Deque<Failure, MAX_SCRIPTED>,
    always: Option<Failure>,
    read_timeout: MillisDurationU32,
    write_timeout: MillisDurationU32,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            registers: [0; REGISTER_COUNT],
            writes: heapless::Vec::new(),
            attempts: 0,
            scripted: heapless::Deque::new(),
            always: None,
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// A device answering registers 0 - 3 with the given identity.
    pub fn with_identity(model_raw: u16, serial: u32, firmware_raw: u16) -> Self {
        let mut mock = Self::new();
        mock.registers[0] = model_raw;
        mock.registers[1] = (serial >> 16) as u16;
        mock.registers[2] = serial as u16;
        mock.registers[3] = firmware_raw;
        mock
    }

    pub fn set(&mut self, register: u16, value: u16) {
        self.registers[register as usize] = value;
    }

    /// Fail the next calls, one failure per call.
    pub fn fail_next(&mut self, failures: &[Failure]) {
        for failure in failures {
            self.scripted
                .push_back(*failure)
                .expect("too many scripted failures");
        }
    }

    /// Fail every call until cleared with `None`.
    pub fn fail_always(&mut self, failure: Option<Failure>) {
        self.always = failure;
    }

    fn attempt(&mut self) -> TransportResult<(), MockIoError> {
        self.attempts += 1;
        if let Some(failure) = self.scripted.pop_front().or(self.always) {
            return Err(failure.into_error());
        }
        Ok(())
    }
}

impl Transport for MockTransport {
    type Error = MockIoError;

    fn read_registers(
        &mut self,
        start: u16,
        registers: &mut [u16],
    ) -> TransportResult<(), Self::Error> {
        self.attempt()?;
        let start = start as usize;
        let end = start + registers.len();
        if end > REGISTER_COUNT {
            return Err(TransportError::Exception(0x02));
        }
        registers.copy_from_slice(&self.registers[start..end]);
        Ok(())
    }

    fn write_register(&mut self, register: u16, value: u16) -> TransportResult<(), Self::Error> {
        self.attempt()?;
        if register as usize >= REGISTER_COUNT {
            return Err(TransportError::Exception(0x02));
        }
        self.registers[register as usize] = value;
        self.writes
            .push((register, value))
            .expect("too many writes recorded");
        Ok(())
    }

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
}
