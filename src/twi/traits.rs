// Licensed under the Apache-2.0 license

//! # TWI Hardware Abstraction Traits
//!
//! Two layers, each built from the one below:
//!
//! ```text
//! TwiHardwareCore (register primitives: start, stop, address, byte I/O)
//!     └── TwiMaster (transactions: transmit, receive, write_read)
//! ```
//!
//! `TwiMaster` is provided for every `TwiHardwareCore` by a blanket
//! implementation, so a hardware back end only implements the primitives.

use crate::twi::common::{header, Direction, TwiConfig};
use crate::twi::error::Error;

/// Register primitives of the bus state machine.
///
/// Every primitive except [`stop`](Self::stop) waits for the completion flag
/// and checks the status register. The caller must not start a primitive
/// before the previous one completed.
pub trait TwiHardwareCore {
    /// Back-end error type. It must absorb the driver's own [`Error`] so the
    /// shared transactions can report address validation failures.
    type Error: embedded_hal::i2c::Error + core::fmt::Debug + From<Error>;

    /// Powers up the peripheral, programs the bit rate with prescaler 1 and
    /// enables it.
    fn init(&mut self, config: &TwiConfig);

    /// Issues a start condition, or a repeated start if the bus is held.
    ///
    /// # Errors
    ///
    /// Returns the reported status unless it is "start" or "repeated start".
    fn start(&mut self) -> Result<(), Self::Error>;

    /// Issues a stop condition. The hardware does not signal completion.
    fn stop(&mut self);

    /// Transmits an SLA+R/W header already combined by the caller.
    ///
    /// # Errors
    ///
    /// Returns the reported status unless the address was acknowledged.
    fn write_address(&mut self, header: u8) -> Result<(), Self::Error>;

    /// Transmits one data byte.
    ///
    /// # Errors
    ///
    /// Returns the reported status unless the byte was acknowledged.
    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error>;

    /// Receives one data byte, answering with ACK when `ack` is set (more
    /// bytes wanted) or NACK otherwise (last byte).
    ///
    /// # Errors
    ///
    /// Returns the reported status if it does not match the requested reply.
    fn read_byte(&mut self, ack: bool) -> Result<u8, Self::Error>;
}

/// Master transactions built from the register primitives.
///
/// Failures return early. Apart from [`receive`](Self::receive) after its
/// data phase started, no stop is issued on error; the bus stays in whatever
/// state the hardware left it and recovery is up to the caller.
pub trait TwiMaster: TwiHardwareCore {
    /// Writes `data` to `address`. With `send_stop` false the bus is kept for
    /// a repeated start.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error; the remaining bytes are not sent.
    fn transmit(&mut self, address: u8, data: &[u8], send_stop: bool) -> Result<(), Self::Error> {
        let sla = header(address, Direction::Write)?;
        self.start()?;
        self.write_address(sla)?;
        for &byte in data {
            self.write_byte(byte)?;
        }
        if send_stop {
            self.stop();
        }
        Ok(())
    }

    /// Single-byte form of [`transmit`](Self::transmit).
    ///
    /// # Errors
    ///
    /// See [`transmit`](Self::transmit).
    fn transmit_byte(&mut self, address: u8, byte: u8, send_stop: bool) -> Result<(), Self::Error> {
        self.transmit(address, &[byte], send_stop)
    }

    /// Fills `buffer` from `address`, ACKing every byte but the last.
    ///
    /// An empty buffer does not touch the bus.
    ///
    /// # Errors
    ///
    /// Start and address failures return without a stop. A failing byte
    /// aborts the remaining reads and the stop is still issued.
    fn receive(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        let sla = header(address, Direction::Read)?;
        let Some((last, head)) = buffer.split_last_mut() else {
            return Ok(());
        };
        self.start()?;
        self.write_address(sla)?;
        let result = read_run(self, head, last);
        self.stop();
        result
    }

    /// Reads one byte from `address`.
    ///
    /// # Errors
    ///
    /// See [`receive`](Self::receive).
    fn receive_byte(&mut self, address: u8) -> Result<u8, Self::Error> {
        let mut byte = [0u8; 1];
        self.receive(address, &mut byte)?;
        let [value] = byte;
        Ok(value)
    }

    /// Writes `bytes`, then reads `buffer` after a repeated start.
    ///
    /// # Errors
    ///
    /// See [`transmit`](Self::transmit) and [`receive`](Self::receive).
    fn write_read(
        &mut self,
        address: u8,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        if buffer.is_empty() {
            return self.transmit(address, bytes, true);
        }
        self.transmit(address, bytes, false)?;
        self.receive(address, buffer)
    }
}

impl<T: TwiHardwareCore + ?Sized> TwiMaster for T {}

/// Reads `head` with ACK and `last` with NACK.
pub(crate) fn read_run<T: TwiHardwareCore + ?Sized>(
    bus: &mut T,
    head: &mut [u8],
    last: &mut u8,
) -> Result<(), T::Error> {
    for byte in head.iter_mut() {
        *byte = bus.read_byte(true)?;
    }
    *last = bus.read_byte(false)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twi::common::TwiStatus;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        Start,
        Stop,
        Address(u8),
        Write(u8),
        Read { ack: bool },
    }

    /// Records primitive calls and fails on request.
    #[derive(Default)]
    struct MockCore {
        calls: Vec<Call>,
        fail_address: Option<TwiStatus>,
        fail_write_at: Option<(usize, TwiStatus)>,
        fail_read_at: Option<(usize, TwiStatus)>,
        rx: VecDeque<u8>,
        writes: usize,
        reads: usize,
    }

    impl TwiHardwareCore for MockCore {
        type Error = Error;

        fn init(&mut self, _config: &TwiConfig) {}

        fn start(&mut self) -> Result<(), Error> {
            self.calls.push(Call::Start);
            Ok(())
        }

        fn stop(&mut self) {
            self.calls.push(Call::Stop);
        }

        fn write_address(&mut self, header: u8) -> Result<(), Error> {
            self.calls.push(Call::Address(header));
            match self.fail_address {
                Some(status) => Err(Error::Status(status)),
                None => Ok(()),
            }
        }

        fn write_byte(&mut self, byte: u8) -> Result<(), Error> {
            self.calls.push(Call::Write(byte));
            let index = self.writes;
            self.writes += 1;
            match self.fail_write_at {
                Some((at, status)) if at == index => Err(Error::Status(status)),
                _ => Ok(()),
            }
        }

        fn read_byte(&mut self, ack: bool) -> Result<u8, Error> {
            self.calls.push(Call::Read { ack });
            let index = self.reads;
            self.reads += 1;
            match self.fail_read_at {
                Some((at, status)) if at == index => Err(Error::Status(status)),
                _ => Ok(self.rx.pop_front().unwrap_or(0xFF)),
            }
        }
    }

    #[test]
    fn test_transmit_sequence() {
        let mut bus = MockCore::default();
        assert_eq!(bus.transmit(0x50, &[0x01, 0x02], true), Ok(()));
        assert_eq!(
            bus.calls,
            vec![
                Call::Start,
                Call::Address(0xA0),
                Call::Write(0x01),
                Call::Write(0x02),
                Call::Stop
            ]
        );
    }

    #[test]
    fn test_transmit_empty() {
        let mut bus = MockCore::default();
        assert_eq!(bus.transmit(0x3C, &[], true), Ok(()));
        assert_eq!(bus.calls, vec![Call::Start, Call::Address(0x78), Call::Stop]);
    }

    #[test]
    fn test_transmit_keeps_bus() {
        let mut bus = MockCore::default();
        assert_eq!(bus.transmit_byte(0x3C, 0x10, false), Ok(()));
        assert_eq!(
            bus.calls,
            vec![Call::Start, Call::Address(0x78), Call::Write(0x10)]
        );
    }

    #[test]
    fn test_transmit_aborts_on_data_nack() {
        let mut bus = MockCore {
            fail_write_at: Some((1, TwiStatus::DataTransmittedNack)),
            ..Default::default()
        };
        assert_eq!(
            bus.transmit(0x50, &[1, 2, 3], true),
            Err(Error::Status(TwiStatus::DataTransmittedNack))
        );
        assert_eq!(
            bus.calls,
            vec![Call::Start, Call::Address(0xA0), Call::Write(1), Call::Write(2)]
        );
    }

    #[test]
    fn test_transmit_address_nack_no_stop() {
        let mut bus = MockCore {
            fail_address: Some(TwiStatus::WriteAddressNack),
            ..Default::default()
        };
        assert_eq!(
            bus.transmit(0x50, &[1], true),
            Err(Error::Status(TwiStatus::WriteAddressNack))
        );
        assert_eq!(bus.calls, vec![Call::Start, Call::Address(0xA0)]);
    }

    #[test]
    fn test_transmit_rejects_wide_address() {
        let mut bus = MockCore::default();
        assert_eq!(bus.transmit(0x90, &[1], true), Err(Error::InvalidAddress(0x90)));
        assert!(bus.calls.is_empty());
    }

    #[test]
    fn test_receive_ack_sequencing() {
        let mut bus = MockCore {
            rx: VecDeque::from(vec![0x11, 0x22, 0x33, 0x44]),
            ..Default::default()
        };
        let mut buffer = [0u8; 4];
        assert_eq!(bus.receive(0x50, &mut buffer), Ok(()));
        assert_eq!(buffer, [0x11, 0x22, 0x33, 0x44]);
        assert_eq!(
            bus.calls,
            vec![
                Call::Start,
                Call::Address(0xA1),
                Call::Read { ack: true },
                Call::Read { ack: true },
                Call::Read { ack: true },
                Call::Read { ack: false },
                Call::Stop
            ]
        );
    }

    #[test]
    fn test_receive_single_byte_is_nack_only() {
        let mut bus = MockCore {
            rx: VecDeque::from(vec![0x5A]),
            ..Default::default()
        };
        assert_eq!(bus.receive_byte(0x48), Ok(0x5A));
        assert_eq!(
            bus.calls,
            vec![
                Call::Start,
                Call::Address(0x91),
                Call::Read { ack: false },
                Call::Stop
            ]
        );
    }

    #[test]
    fn test_receive_empty_buffer_is_noop() {
        let mut bus = MockCore::default();
        assert_eq!(bus.receive(0x50, &mut []), Ok(()));
        assert!(bus.calls.is_empty());
    }

    #[test]
    fn test_receive_aborts_and_stops_on_read_failure() {
        let mut bus = MockCore {
            fail_read_at: Some((1, TwiStatus::ArbitrationLost)),
            ..Default::default()
        };
        let mut buffer = [0u8; 4];
        assert_eq!(
            bus.receive(0x50, &mut buffer),
            Err(Error::Status(TwiStatus::ArbitrationLost))
        );
        assert_eq!(
            bus.calls,
            vec![
                Call::Start,
                Call::Address(0xA1),
                Call::Read { ack: true },
                Call::Read { ack: true },
                Call::Stop
            ]
        );
    }

    #[test]
    fn test_receive_address_nack_no_stop() {
        let mut bus = MockCore {
            fail_address: Some(TwiStatus::ReadAddressNack),
            ..Default::default()
        };
        assert_eq!(
            bus.receive_byte(0x50),
            Err(Error::Status(TwiStatus::ReadAddressNack))
        );
        assert_eq!(bus.calls, vec![Call::Start, Call::Address(0xA1)]);
    }

    #[test]
    fn test_write_read_uses_repeated_start() {
        let mut bus = MockCore {
            rx: VecDeque::from(vec![0xAB, 0xCD]),
            ..Default::default()
        };
        let mut buffer = [0u8; 2];
        assert_eq!(bus.write_read(0x50, &[0x10], &mut buffer), Ok(()));
        assert_eq!(buffer, [0xAB, 0xCD]);
        assert_eq!(
            bus.calls,
            vec![
                Call::Start,
                Call::Address(0xA0),
                Call::Write(0x10),
                Call::Start,
                Call::Address(0xA1),
                Call::Read { ack: true },
                Call::Read { ack: false },
                Call::Stop
            ]
        );
    }
}
