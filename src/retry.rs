//! Bounded retry around transport calls.

use crate::{
    error::{Error, Result},
    transport::{Transport, TransportError, TransportResult},
};

/// Retry budget used unless the caller asks for another one.
pub const DEFAULT_RETRY_BUDGET: u32 = 5;

/// Which transient failures a call may retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOn {
    /// Only retry when the device stayed silent.
    NoResponse,
    /// Also retry on malformed frames. Used for block reads.
    NoResponseOrInvalid,
}

/// Counts consecutive failed attempts against a fixed budget.
///
/// The counter is shared by every operation on a handle: a success anywhere resets it, and once it reaches the
/// budget every call fails with [`Error::CommunicationDegraded`] without touching the transport, until
/// [`RetryCounter::clear`] is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryCounter {
    budget: u32,
    failed_attempts: u32,
}

impl Default for RetryCounter {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_BUDGET)
    }
}

impl RetryCounter {
    pub const fn new(budget: u32) -> Self {
        Self {
            budget,
            failed_attempts: 0,
        }
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    pub fn is_failed(&self) -> bool {
        self.failed_attempts >= self.budget
    }

    pub fn clear(&mut self) {
        self.failed_attempts = 0;
    }

    /// Run `op` against `transport` until it succeeds, fails permanently, or the budget runs out.
    pub fn run<T, R, F>(
        &mut self,
        transport: &mut T,
        retry_on: RetryOn,
        mut op: F,
    ) -> Result<R, T::Error>
    where
        T: Transport,
        F: FnMut(&mut T) -> TransportResult<R, T::Error>,
    {
        while !self.is_failed() {
            match op(transport) {
                Ok(value) => {
                    self.failed_attempts = 0;
                    return Ok(value);
                }
                Err(TransportError::NoResponse) => {
                    self.failed_attempts += 1;
                    log::warn!(
                        "No response from device (attempt {}/{})",
                        self.failed_attempts,
                        self.budget
                    );
                }
                Err(TransportError::InvalidResponse)
                    if retry_on == RetryOn::NoResponseOrInvalid =>
                {
                    self.failed_attempts += 1;
                    log::warn!(
                        "Invalid response from device (attempt {}/{})",
                        self.failed_attempts,
                        self.budget
                    );
                }
                Err(TransportError::InvalidResponse) => return Err(Error::MalformedResponse),
                Err(TransportError::InvalidRequest) => return Err(Error::InvalidRange),
                Err(TransportError::Exception(code)) => return Err(Error::Exception(code)),
                Err(TransportError::Serial(e)) => return Err(Error::SerialError(e)),
                Err(TransportError::Modbus(kind)) => return Err(Error::ModbusError(kind)),
            }
        }
        log::error!(
            "Retry budget of {} exhausted, communication degraded",
            self.budget
        );
        Err(Error::CommunicationDegraded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_transport::{Failure, MockTransport};

    fn read_one(
        retry: &mut RetryCounter,
        mock: &mut MockTransport,
    ) -> Result<u16, crate::mock_transport::MockIoError> {
        retry.run(mock, RetryOn::NoResponse, |t| t.read_register(8))
    }

    #[test]
    fn exhaustion_stops_after_budget_attempts() {
        let mut mock = MockTransport::new();
        mock.fail_always(Some(Failure::NoResponse));
        let mut retry = RetryCounter::default();

        let result = read_one(&mut retry, &mut mock);
        assert!(matches!(result, Err(Error::CommunicationDegraded)));
        assert_eq!(mock.attempts, DEFAULT_RETRY_BUDGET as usize);
        assert!(retry.is_failed());
        assert_eq!(retry.failed_attempts(), retry.budget());
    }

    #[test]
    fn failed_state_short_circuits_until_cleared() {
        let mut mock = MockTransport::new();
        mock.fail_always(Some(Failure::NoResponse));
        let mut retry = RetryCounter::new(3);
        assert!(read_one(&mut retry, &mut mock).is_err());
        assert_eq!(mock.attempts, 3);

        // Device recovers, but the handle stays failed until cleared.
        mock.fail_always(None);
        mock.set(8, 42);
        assert!(matches!(
            read_one(&mut retry, &mut mock),
            Err(Error::CommunicationDegraded)
        ));
        assert_eq!(mock.attempts, 3);

        retry.clear();
        assert_eq!(read_one(&mut retry, &mut mock).unwrap(), 42);
        assert_eq!(retry.failed_attempts(), 0);
    }

    #[test]
    fn success_resets_counter() {
        let mut mock = MockTransport::new();
        mock.set(8, 7);
        mock.fail_next(&[Failure::NoResponse, Failure::NoResponse]);
        let mut retry = RetryCounter::default();

        assert_eq!(read_one(&mut retry, &mut mock).unwrap(), 7);
        assert_eq!(mock.attempts, 3);
        assert_eq!(retry.failed_attempts(), 0);
    }

    #[test]
    fn invalid_response_only_retried_when_allowed() {
        let mut mock = MockTransport::new();
        mock.fail_next(&[Failure::InvalidResponse]);
        let mut retry = RetryCounter::default();
        assert!(matches!(
            read_one(&mut retry, &mut mock),
            Err(Error::MalformedResponse)
        ));
        assert_eq!(retry.failed_attempts(), 0);

        mock.set(10, 3);
        mock.fail_next(&[Failure::InvalidResponse, Failure::NoResponse]);
        let mut block = [0u16; 2];
        retry
            .run(&mut mock, RetryOn::NoResponseOrInvalid, |t| {
                t.read_registers(10, &mut block)
            })
            .unwrap();
        assert_eq!(block, [3, 0]);
    }

    #[test]
    fn hard_failures_are_not_retried() {
        let mut mock = MockTransport::new();
        mock.fail_next(&[Failure::Exception(0x02)]);
        let mut retry = RetryCounter::default();
        assert!(matches!(
            read_one(&mut retry, &mut mock),
            Err(Error::Exception(0x02))
        ));

        mock.fail_next(&[Failure::Serial]);
        assert!(matches!(
            read_one(&mut retry, &mut mock),
            Err(Error::SerialError(_))
        ));
        assert_eq!(mock.attempts, 2);
    }

    #[test]
    fn zero_budget_is_always_failed() {
        let mut mock = MockTransport::new();
        let mut retry = RetryCounter::new(0);
        assert!(retry.is_failed());
        assert!(read_one(&mut retry, &mut mock).is_err());
        assert_eq!(mock.attempts, 0);
    }
}
