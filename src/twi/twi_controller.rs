// Licensed under the Apache-2.0 license

//! High-level TWI controller.
//!
//! Wraps any [`TwiMaster`] and exposes it through the embedded-hal 1.0 `I2c`
//! trait and the embedded-hal 0.2 blocking traits, so existing device drivers
//! can run on the bus.
//!
//! Unlike the raw [`TwiMaster`] transactions, every operation here ends with a
//! stop once a start went through, failed ones included.

use crate::common::{Logger, NoOpLogger};
use crate::twi::common::{header, Direction, TwiConfig};
use crate::twi::traits::{read_run, TwiMaster};
use embedded_hal::i2c::{Operation, SevenBitAddress};

pub struct TwiController<H: TwiMaster, L: Logger = NoOpLogger> {
    pub hardware: H,
    pub config: TwiConfig,
    pub logger: L,
}

impl<H: TwiMaster, L: Logger> TwiController<H, L> {
    /// Initializes `hardware` with `config` and wraps it.
    pub fn new(mut hardware: H, config: TwiConfig, logger: L) -> Self {
        hardware.init(&config);
        Self {
            hardware,
            config,
            logger,
        }
    }

    fn report<T>(&mut self, what: &str, result: Result<T, H::Error>) -> Result<T, H::Error> {
        if result.is_err() {
            self.logger.error(what);
        }
        result
    }

    /// Runs `operations` as one transfer and releases the bus afterwards,
    /// also when a step failed once a start went through.
    fn run(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), H::Error> {
        let write_sla = header(address, Direction::Write)?;
        let read_sla = header(address, Direction::Read)?;
        let mut held = false;
        let result = self.run_held(write_sla, read_sla, operations, &mut held);
        if held {
            self.hardware.stop();
        }
        result
    }

    fn run_held(
        &mut self,
        write_sla: u8,
        read_sla: u8,
        operations: &mut [Operation<'_>],
        held: &mut bool,
    ) -> Result<(), H::Error> {
        let mut previous: Option<Direction> = None;
        let mut rest = operations;
        while let Some((operation, tail)) = core::mem::take(&mut rest).split_first_mut() {
            let read_follows = next_is_read(tail);
            match operation {
                Operation::Write(bytes) => {
                    if previous != Some(Direction::Write) {
                        self.hardware.start()?;
                        *held = true;
                        self.hardware.write_address(write_sla)?;
                    }
                    for &byte in bytes.iter() {
                        self.hardware.write_byte(byte)?;
                    }
                    previous = Some(Direction::Write);
                }
                Operation::Read(buffer) => {
                    if let Some((last, head)) = buffer.split_last_mut() {
                        if previous != Some(Direction::Read) {
                            self.hardware.start()?;
                            *held = true;
                            self.hardware.write_address(read_sla)?;
                        }
                        // Adjacent reads form one transfer; only its final byte is NACKed
                        if read_follows {
                            for byte in head.iter_mut().chain(core::iter::once(last)) {
                                *byte = self.hardware.read_byte(true)?;
                            }
                        } else {
                            read_run(&mut self.hardware, head, last)?;
                        }
                        previous = Some(Direction::Read);
                    }
                }
            }
            rest = tail;
        }
        Ok(())
    }
}

/// True if the next operation that moves data is a read.
fn next_is_read(rest: &[Operation<'_>]) -> bool {
    rest.iter()
        .find(|op| !matches!(op, Operation::Read(buffer) if buffer.is_empty()))
        .is_some_and(|op| matches!(op, Operation::Read(_)))
}

impl<H: TwiMaster, L: Logger> embedded_hal::i2c::ErrorType for TwiController<H, L> {
    type Error = H::Error;
}

impl<H: TwiMaster, L: Logger> embedded_hal::i2c::I2c for TwiController<H, L> {
    fn read(&mut self, addr: SevenBitAddress, buffer: &mut [u8]) -> Result<(), Self::Error> {
        let result = self.run(addr, &mut [Operation::Read(buffer)]);
        self.report("twi: read failed", result)
    }

    fn write(&mut self, addr: SevenBitAddress, bytes: &[u8]) -> Result<(), Self::Error> {
        let result = self.run(addr, &mut [Operation::Write(bytes)]);
        self.report("twi: write failed", result)
    }

    fn write_read(
        &mut self,
        addr: SevenBitAddress,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        let result = self.run(
            addr,
            &mut [Operation::Write(bytes), Operation::Read(buffer)],
        );
        self.report("twi: write_read failed", result)
    }

    fn transaction(
        &mut self,
        addr: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let result = self.run(addr, operations);
        self.report("twi: transaction failed", result)
    }
}

impl<H: TwiMaster, L: Logger> embedded_hal_old::blocking::i2c::Write for TwiController<H, L> {
    type Error = H::Error;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        embedded_hal::i2c::I2c::write(self, address, bytes)
    }
}

impl<H: TwiMaster, L: Logger> embedded_hal_old::blocking::i2c::Read for TwiController<H, L> {
    type Error = H::Error;

    fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        embedded_hal::i2c::I2c::read(self, address, buffer)
    }
}

impl<H: TwiMaster, L: Logger> embedded_hal_old::blocking::i2c::WriteRead
    for TwiController<H, L>
{
    type Error = H::Error;

    fn write_read(
        &mut self,
        address: u8,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        embedded_hal::i2c::I2c::write_read(self, address, bytes, buffer)
    }
}
