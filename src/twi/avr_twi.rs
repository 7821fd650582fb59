// Licensed under the Apache-2.0 license

//! Polled master-mode driver for the AVR two-wire interface.
//!
//! Each register primitive writes TWCR to trigger one bus step, waits for
//! TWINT through the configured [`WaitPolicy`] and checks TWSR against the
//! status codes the step may legally produce.

use crate::common::{Logger, NoOpLogger};
use crate::twi::common::{TwiConfig, TwiStatus, STATUS_MASK};
use crate::twi::error::Error;
use crate::twi::registers::{TwiRegisters, TWEA, TWEN, TWINT, TWPS_MASK, TWSTA, TWSTO};
use crate::twi::traits::TwiHardwareCore;
use crate::twi::wait::{Unbounded, WaitPolicy};

pub struct AvrTwi<R: TwiRegisters, W: WaitPolicy = Unbounded, L: Logger = NoOpLogger> {
    regs: R,
    wait: W,
    logger: L,
}

impl<R: TwiRegisters> AvrTwi<R> {
    /// Driver that waits without a timeout and does not log.
    pub fn new(regs: R) -> Self {
        Self {
            regs,
            wait: Unbounded,
            logger: NoOpLogger,
        }
    }
}

impl<R: TwiRegisters, W: WaitPolicy, L: Logger> AvrTwi<R, W, L> {
    pub fn with_policy(regs: R, wait: W, logger: L) -> Self {
        Self { regs, wait, logger }
    }

    pub fn registers(&self) -> &R {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    pub fn logger_mut(&mut self) -> &mut L {
        &mut self.logger
    }

    /// Gives back the register access.
    pub fn release(self) -> R {
        self.regs
    }

    /// Triggers the action encoded in `flags` and waits for TWINT.
    fn execute(&mut self, flags: u8) -> Result<TwiStatus, Error> {
        self.regs.set_control(TWINT | TWEN | flags);
        let regs = &mut self.regs;
        let waited = self.wait.wait(|| {
            if regs.control() & TWINT == 0 {
                Err(nb::Error::WouldBlock)
            } else {
                Ok(())
            }
        });
        if let Err(e) = waited {
            self.logger.error("twi: timed out waiting for TWINT");
            return Err(e);
        }
        let raw = self.regs.status();
        TwiStatus::from_register(raw).ok_or_else(|| {
            self.logger.error("twi: unknown status");
            Error::UnknownStatus(raw & STATUS_MASK)
        })
    }

    fn expect(&mut self, status: TwiStatus, accepted: &[TwiStatus]) -> Result<(), Error> {
        if accepted.contains(&status) {
            Ok(())
        } else {
            self.logger.error(status.description());
            Err(Error::Status(status))
        }
    }
}

impl<R: TwiRegisters, W: WaitPolicy, L: Logger> TwiHardwareCore for AvrTwi<R, W, L> {
    type Error = Error;

    fn init(&mut self, config: &TwiConfig) {
        self.regs.power_up();
        // Prescaler 1
        let twsr = self.regs.status();
        self.regs.set_status(twsr & !TWPS_MASK);
        self.regs.set_bit_rate(config.bit_rate());
        self.regs.set_control(TWEN);
        self.logger.debug("twi: enabled");
    }

    fn start(&mut self) -> Result<(), Error> {
        let status = self.execute(TWSTA)?;
        self.expect(
            status,
            &[
                TwiStatus::StartTransmitted,
                TwiStatus::RepeatedStartTransmitted,
            ],
        )
    }

    fn stop(&mut self) {
        self.regs.set_control(TWINT | TWSTO | TWEN);
    }

    fn write_address(&mut self, header: u8) -> Result<(), Error> {
        self.regs.set_data(header);
        let status = self.execute(0)?;
        self.expect(
            status,
            &[TwiStatus::WriteAddressAck, TwiStatus::ReadAddressAck],
        )
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), Error> {
        self.regs.set_data(byte);
        let status = self.execute(0)?;
        self.expect(status, &[TwiStatus::DataTransmittedAck])
    }

    fn read_byte(&mut self, ack: bool) -> Result<u8, Error> {
        let (flags, expected) = if ack {
            (TWEA, TwiStatus::DataReceivedAck)
        } else {
            (0, TwiStatus::DataReceivedNack)
        };
        let status = self.execute(flags)?;
        self.expect(status, &[expected])?;
        Ok(self.regs.data())
    }
}
