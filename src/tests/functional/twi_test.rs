// Licensed under the Apache-2.0 license

//! On-target TWI checks against a 24Cxx-style EEPROM.
//!
//! Writes a pattern at one-byte word address 0x00, ACK-polls until the write
//! cycle ends and reads it back through a repeated start. Progress goes to
//! the injected logger.

use crate::common::Logger;
use core::fmt::Write as _;
use embedded_hal::i2c::I2c;
use heapless::String;

const PATTERN: [u8; 4] = [0xA5, 0x5A, 0x3C, 0xC3];
const FIRST_ADDRESS: u8 = 0x08;
const LAST_ADDRESS: u8 = 0x77;
const READY_POLLS: u32 = 1000;

#[derive(Debug, PartialEq, Eq)]
pub enum FunctionalError<E> {
    Bus(E),
    /// The device never answered during the scan.
    NotFound(u8),
    /// The device kept NACKing after a write cycle.
    NotReady(u8),
    Mismatch { offset: u8, expected: u8, found: u8 },
}

/// Runs the functional suite and reports PASSED/FAILED per check.
///
/// # Errors
///
/// Returns the first failing check.
pub fn run_twi_tests<B: I2c, L: Logger>(
    bus: &mut B,
    logger: &mut L,
    eeprom: u8,
) -> Result<(), FunctionalError<B::Error>> {
    logger.debug("=== TWI Functional Tests ===");

    let result = test_scan(bus, logger, eeprom);
    report(logger, "bus scan", result)?;
    let result = test_write_read_back(bus, eeprom);
    report(logger, "write and read back", result)?;
    let result = test_sequential_read(bus, eeprom);
    report(logger, "sequential read", result)?;

    logger.debug("=== All TWI Tests Passed ===");
    Ok(())
}

fn report<L: Logger, T, E>(logger: &mut L, name: &str, result: Result<T, E>) -> Result<T, E> {
    let mut line: String<64> = String::new();
    let verdict = if result.is_ok() { "PASSED" } else { "FAILED" };
    let _ = write!(line, "{name}... {verdict}");
    if result.is_ok() {
        logger.debug(&line);
    } else {
        logger.error(&line);
    }
    result
}

/// Address-only write; the ACK tells whether a device answers.
fn probe<B: I2c>(bus: &mut B, address: u8) -> bool {
    bus.write(address, &[]).is_ok()
}

fn test_scan<B: I2c, L: Logger>(
    bus: &mut B,
    logger: &mut L,
    eeprom: u8,
) -> Result<(), FunctionalError<B::Error>> {
    let mut found = false;
    for address in FIRST_ADDRESS..=LAST_ADDRESS {
        if probe(bus, address) {
            let mut line: String<32> = String::new();
            let _ = write!(line, "device at 0x{address:02X}");
            logger.debug(&line);
            found |= address == eeprom;
        }
    }
    if found {
        Ok(())
    } else {
        Err(FunctionalError::NotFound(eeprom))
    }
}

fn wait_ready<B: I2c>(bus: &mut B, eeprom: u8) -> Result<(), FunctionalError<B::Error>> {
    for _ in 0..READY_POLLS {
        if probe(bus, eeprom) {
            return Ok(());
        }
    }
    Err(FunctionalError::NotReady(eeprom))
}

fn test_write_read_back<B: I2c>(bus: &mut B, eeprom: u8) -> Result<(), FunctionalError<B::Error>> {
    let mut frame = [0u8; PATTERN.len() + 1];
    for (slot, &byte) in frame.iter_mut().skip(1).zip(PATTERN.iter()) {
        *slot = byte;
    }
    bus.write(eeprom, &frame).map_err(FunctionalError::Bus)?;
    wait_ready(bus, eeprom)?;

    let mut readback = [0u8; PATTERN.len()];
    bus.write_read(eeprom, &[0x00], &mut readback)
        .map_err(FunctionalError::Bus)?;
    compare(&PATTERN, &readback)
}

/// Current-address read continues where the previous read stopped.
fn test_sequential_read<B: I2c>(bus: &mut B, eeprom: u8) -> Result<(), FunctionalError<B::Error>> {
    let mut head = [0u8; 2];
    let mut tail = [0u8; 2];
    bus.write_read(eeprom, &[0x00], &mut head)
        .map_err(FunctionalError::Bus)?;
    bus.read(eeprom, &mut tail).map_err(FunctionalError::Bus)?;

    let mut joined = [0u8; PATTERN.len()];
    for (slot, &byte) in joined.iter_mut().zip(head.iter().chain(tail.iter())) {
        *slot = byte;
    }
    compare(&PATTERN, &joined)
}

fn compare<E>(expected: &[u8], found: &[u8]) -> Result<(), FunctionalError<E>> {
    for (offset, (&want, &got)) in (0u8..).zip(expected.iter().zip(found.iter())) {
        if want != got {
            return Err(FunctionalError::Mismatch {
                offset,
                expected: want,
                found: got,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twi::avr_twi::AvrTwi;
    use crate::twi::common::{TwiConfig, TwiStatus};
    use crate::twi::error::Error;
    use crate::twi::simulated::{SimTarget, SimulatedTwi};
    use crate::twi::twi_controller::TwiController;

    #[derive(Default)]
    struct Transcript {
        lines: Vec<String<64>>,
        errors: usize,
    }

    impl Logger for Transcript {
        fn debug(&mut self, msg: &str) {
            self.lines.push(String::try_from(msg).unwrap());
        }
        fn error(&mut self, msg: &str) {
            self.errors += 1;
            self.lines.push(String::try_from(msg).unwrap());
        }
    }

    fn bus(targets: &[SimTarget]) -> TwiController<AvrTwi<SimulatedTwi>> {
        let mut sim = SimulatedTwi::new();
        for target in targets {
            sim.attach(target.clone()).unwrap();
        }
        TwiController::new(AvrTwi::new(sim), TwiConfig::default(), crate::common::NoOpLogger)
    }

    #[test]
    fn test_suite_passes_against_simulated_eeprom() {
        let mut bus = bus(&[SimTarget::new(0x3C), SimTarget::new(0x50)]);
        let mut log = Transcript::default();

        assert_eq!(run_twi_tests(&mut bus, &mut log, 0x50), Ok(()));
        assert_eq!(log.errors, 0);
        assert!(log.lines.iter().any(|l| l.as_str() == "device at 0x3C"));
        assert!(log.lines.iter().any(|l| l.as_str() == "device at 0x50"));
        assert_eq!(
            log.lines.last().map(|l| l.as_str()),
            Some("=== All TWI Tests Passed ===")
        );
        let eeprom = bus.hardware.registers().target(0x50).unwrap();
        assert_eq!(&eeprom.memory()[..4], &PATTERN);
    }

    #[test]
    fn test_suite_reports_missing_device() {
        let mut bus = bus(&[SimTarget::new(0x3C)]);
        let mut log = Transcript::default();

        assert_eq!(
            run_twi_tests(&mut bus, &mut log, 0x50),
            Err(FunctionalError::NotFound(0x50))
        );
        assert_eq!(log.errors, 1);
        assert_eq!(
            log.lines.last().map(|l| l.as_str()),
            Some("bus scan... FAILED")
        );
        assert!(!bus.hardware.registers().bus_held());
    }

    #[test]
    fn test_write_failure_is_bus_error() {
        let mut bus = bus(&[SimTarget::new(0x50).ack_limit(2)]);
        assert_eq!(
            test_write_read_back(&mut bus, 0x50),
            Err(FunctionalError::Bus(Error::Status(
                TwiStatus::DataTransmittedNack
            )))
        );
    }

    #[test]
    fn test_compare_reports_offset() {
        assert_eq!(
            compare::<()>(&[1, 2, 3], &[1, 9, 3]),
            Err(FunctionalError::Mismatch {
                offset: 1,
                expected: 2,
                found: 9
            })
        );
    }
}
