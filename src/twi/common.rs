// Licensed under the Apache-2.0 license

//! Common types and constants for the TWI driver modules.
//!
//! This module provides the hardware status table, transfer direction and the
//! bus clock configuration shared across the driver implementation.

use crate::twi::error::Error;
use fugit::{HertzU32, KilohertzU32, RateExtU32};

/// Mask selecting the status bits of TWSR (the low two bits hold the prescaler).
pub const STATUS_MASK: u8 = 0xF8;

/// Status codes reported in TWSR once TWINT is set.
///
/// Discriminants are the masked register values from the ATmega TWI status
/// tables (`<util/twi.h>`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TwiStatus {
    /// Illegal start or stop condition
    BusError = 0x00,
    StartTransmitted = 0x08,
    RepeatedStartTransmitted = 0x10,
    WriteAddressAck = 0x18,
    WriteAddressNack = 0x20,
    DataTransmittedAck = 0x28,
    DataTransmittedNack = 0x30,
    /// Arbitration lost in SLA+R/W or data bytes
    ArbitrationLost = 0x38,
    ReadAddressAck = 0x40,
    ReadAddressNack = 0x48,
    DataReceivedAck = 0x50,
    DataReceivedNack = 0x58,

    // Slave receiver
    SlaveWriteAddressAck = 0x60,
    ArbitrationLostSlaveWriteAck = 0x68,
    GeneralCallAck = 0x70,
    ArbitrationLostGeneralCallAck = 0x78,
    SlaveDataReceivedAck = 0x80,
    SlaveDataReceivedNack = 0x88,
    GeneralCallDataAck = 0x90,
    GeneralCallDataNack = 0x98,
    SlaveStop = 0xA0,

    // Slave transmitter
    SlaveReadAddressAck = 0xA8,
    ArbitrationLostSlaveReadAck = 0xB0,
    SlaveDataTransmittedAck = 0xB8,
    SlaveDataTransmittedNack = 0xC0,
    SlaveLastDataTransmitted = 0xC8,

    /// No relevant state information, TWINT not set
    NoInformation = 0xF8,
}

impl TwiStatus {
    /// Decodes a raw TWSR value, ignoring the prescaler bits.
    ///
    /// Returns `None` for the masked values the hardware never reports.
    #[must_use]
    pub const fn from_register(value: u8) -> Option<Self> {
        match value & STATUS_MASK {
            0x00 => Some(Self::BusError),
            0x08 => Some(Self::StartTransmitted),
            0x10 => Some(Self::RepeatedStartTransmitted),
            0x18 => Some(Self::WriteAddressAck),
            0x20 => Some(Self::WriteAddressNack),
            0x28 => Some(Self::DataTransmittedAck),
            0x30 => Some(Self::DataTransmittedNack),
            0x38 => Some(Self::ArbitrationLost),
            0x40 => Some(Self::ReadAddressAck),
            0x48 => Some(Self::ReadAddressNack),
            0x50 => Some(Self::DataReceivedAck),
            0x58 => Some(Self::DataReceivedNack),
            0x60 => Some(Self::SlaveWriteAddressAck),
            0x68 => Some(Self::ArbitrationLostSlaveWriteAck),
            0x70 => Some(Self::GeneralCallAck),
            0x78 => Some(Self::ArbitrationLostGeneralCallAck),
            0x80 => Some(Self::SlaveDataReceivedAck),
            0x88 => Some(Self::SlaveDataReceivedNack),
            0x90 => Some(Self::GeneralCallDataAck),
            0x98 => Some(Self::GeneralCallDataNack),
            0xA0 => Some(Self::SlaveStop),
            0xA8 => Some(Self::SlaveReadAddressAck),
            0xB0 => Some(Self::ArbitrationLostSlaveReadAck),
            0xB8 => Some(Self::SlaveDataTransmittedAck),
            0xC0 => Some(Self::SlaveDataTransmittedNack),
            0xC8 => Some(Self::SlaveLastDataTransmitted),
            0xF8 => Some(Self::NoInformation),
            _ => None,
        }
    }

    /// Raw status code as found in the upper bits of TWSR.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::BusError => "bus error",
            Self::StartTransmitted => "start transmitted",
            Self::RepeatedStartTransmitted => "repeated start transmitted",
            Self::WriteAddressAck => "SLA+W transmitted, ACK received",
            Self::WriteAddressNack => "SLA+W transmitted, NACK received",
            Self::DataTransmittedAck => "data transmitted, ACK received",
            Self::DataTransmittedNack => "data transmitted, NACK received",
            Self::ArbitrationLost => "arbitration lost",
            Self::ReadAddressAck => "SLA+R transmitted, ACK received",
            Self::ReadAddressNack => "SLA+R transmitted, NACK received",
            Self::DataReceivedAck => "data received, ACK returned",
            Self::DataReceivedNack => "data received, NACK returned",
            Self::SlaveWriteAddressAck => "own SLA+W received, ACK returned",
            Self::ArbitrationLostSlaveWriteAck => "arbitration lost, own SLA+W received",
            Self::GeneralCallAck => "general call received, ACK returned",
            Self::ArbitrationLostGeneralCallAck => "arbitration lost, general call received",
            Self::SlaveDataReceivedAck => "slave data received, ACK returned",
            Self::SlaveDataReceivedNack => "slave data received, NACK returned",
            Self::GeneralCallDataAck => "general call data received, ACK returned",
            Self::GeneralCallDataNack => "general call data received, NACK returned",
            Self::SlaveStop => "stop or repeated start received as slave",
            Self::SlaveReadAddressAck => "own SLA+R received, ACK returned",
            Self::ArbitrationLostSlaveReadAck => "arbitration lost, own SLA+R received",
            Self::SlaveDataTransmittedAck => "slave data transmitted, ACK received",
            Self::SlaveDataTransmittedNack => "slave data transmitted, NACK received",
            Self::SlaveLastDataTransmitted => "last slave data transmitted, ACK received",
            Self::NoInformation => "no relevant state information",
        }
    }
}

/// Value of the R/W bit in the address header.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Direction {
    Write = 0,
    Read = 1,
}

/// Combines a 7-bit address and direction into the SLA+R/W header byte.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] if `address` does not fit seven bits.
pub const fn header(address: u8, direction: Direction) -> Result<u8, Error> {
    if address > 0x7F {
        return Err(Error::InvalidAddress(address));
    }
    Ok((address << 1) | direction as u8)
}

/// Common SCL frequencies.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum TwiSpeed {
    Standard = 100,
    Medium = 250,
    Fast = 400,
}

impl TwiSpeed {
    #[must_use]
    pub const fn frequency(self) -> KilohertzU32 {
        KilohertzU32::from_raw(self as u32)
    }
}

/// Default CPU clock of an ATmega328P board.
pub const DEFAULT_CPU_CLOCK: HertzU32 = HertzU32::from_raw(16_000_000);

/// Computes the TWBR divisor for a prescaler of 1.
///
/// `bitrate = cpu / (2000 * kHz) - 8`, the integer form used by the hardware
/// documentation. Returns `None` when the result is negative or wider than
/// eight bits.
#[must_use]
pub const fn bit_rate_divisor(cpu_clock: HertzU32, bus_frequency: KilohertzU32) -> Option<u8> {
    let divisor = match 2000u32.checked_mul(bus_frequency.raw()) {
        Some(0) | None => return None,
        Some(divisor) => divisor,
    };
    let quotient = cpu_clock.raw() / divisor;
    if quotient < 8 || quotient - 8 > u8::MAX as u32 {
        return None;
    }
    Some((quotient - 8) as u8)
}

/// Validated bus clock configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TwiConfig {
    cpu_clock: HertzU32,
    bus_frequency: KilohertzU32,
    bit_rate: u8,
}

impl TwiConfig {
    #[must_use]
    pub const fn cpu_clock(&self) -> HertzU32 {
        self.cpu_clock
    }

    /// Requested SCL frequency.
    #[must_use]
    pub const fn bus_frequency(&self) -> KilohertzU32 {
        self.bus_frequency
    }

    /// Value programmed into TWBR.
    #[must_use]
    pub const fn bit_rate(&self) -> u8 {
        self.bit_rate
    }

    /// SCL frequency produced by the programmed divisor.
    #[must_use]
    pub fn actual_frequency(&self) -> HertzU32 {
        (self.cpu_clock.raw() / (16 + 2 * u32::from(self.bit_rate))).Hz()
    }
}

impl Default for TwiConfig {
    fn default() -> Self {
        // 16 MHz / 100 kHz gives TWBR = 72
        Self {
            cpu_clock: DEFAULT_CPU_CLOCK,
            bus_frequency: TwiSpeed::Standard.frequency(),
            bit_rate: 72,
        }
    }
}

pub struct TwiConfigBuilder {
    cpu_clock: HertzU32,
    bus_frequency: KilohertzU32,
}

impl Default for TwiConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TwiConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cpu_clock: DEFAULT_CPU_CLOCK,
            bus_frequency: TwiSpeed::Standard.frequency(),
        }
    }
    #[must_use]
    pub fn cpu_clock(mut self, clock: HertzU32) -> Self {
        self.cpu_clock = clock;
        self
    }
    #[must_use]
    pub fn speed(mut self, speed: TwiSpeed) -> Self {
        self.bus_frequency = speed.frequency();
        self
    }
    #[must_use]
    pub fn bus_frequency(mut self, frequency: KilohertzU32) -> Self {
        self.bus_frequency = frequency;
        self
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidFrequency`] if the divisor for the requested
    /// frequency cannot be programmed into TWBR.
    pub fn build(self) -> Result<TwiConfig, Error> {
        let bit_rate =
            bit_rate_divisor(self.cpu_clock, self.bus_frequency).ok_or(Error::InvalidFrequency)?;
        Ok(TwiConfig {
            cpu_clock: self.cpu_clock,
            bus_frequency: self.bus_frequency,
            bit_rate,
        })
    }
}
