// Licensed under the Apache-2.0 license

//! Software model of the TWI peripheral for host-side testing.
//!
//! [`SimulatedTwi`] implements [`TwiRegisters`] and reacts to control register
//! writes the way the master-mode hardware does: start vs. repeated start,
//! SLA+R/W acknowledged only by attached targets, ACK/NACK on received bytes
//! depending on TWEA, and a stop that never sets TWINT. Every bus event is
//! recorded so tests can assert exact sequences.
//!
//! Attached [`SimTarget`]s behave like small register-pointer memories (the
//! common EEPROM/sensor layout): the first byte of a write selects the
//! pointer, further bytes are stored, reads return bytes from the pointer on.

use crate::twi::common::{TwiStatus, STATUS_MASK};
use crate::twi::registers::{TwiRegisters, TWEA, TWEN, TWINT, TWPS_MASK, TWSTA, TWSTO};
use heapless::Vec;

/// Capacity of the event and TWDR logs. Once either fills up further entries
/// are dropped and [`SimulatedTwi::is_truncated`] reports it.
pub const MAX_EVENTS: usize = 256;
pub const MAX_TARGETS: usize = 4;

/// Observable bus activity.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SimEvent {
    Start,
    RepeatedStart,
    Stop,
    /// SLA+R/W header and whether a target acknowledged it.
    Address { header: u8, ack: bool },
    /// Data byte sent by the master and whether it was acknowledged.
    Write { byte: u8, ack: bool },
    /// Data byte received by the master and the reply the master gave.
    Read { byte: u8, ack: bool },
}

/// Register-pointer memory device.
#[derive(Clone, Debug)]
pub struct SimTarget {
    address: u8,
    memory: [u8; 256],
    pointer: u8,
    expect_pointer: bool,
    accepted: usize,
    ack_limit: Option<usize>,
}

impl SimTarget {
    #[must_use]
    pub fn new(address: u8) -> Self {
        Self {
            address,
            memory: [0; 256],
            pointer: 0,
            expect_pointer: false,
            accepted: 0,
            ack_limit: None,
        }
    }

    /// Preloads memory starting at `offset`, wrapping at the end.
    #[must_use]
    pub fn with_memory(mut self, offset: u8, bytes: &[u8]) -> Self {
        let mut at = offset;
        for &byte in bytes {
            if let Some(cell) = self.memory.get_mut(usize::from(at)) {
                *cell = byte;
            }
            at = at.wrapping_add(1);
        }
        self
    }

    /// ACKs only the first `count` data bytes of every write transfer.
    #[must_use]
    pub fn ack_limit(mut self, count: usize) -> Self {
        self.ack_limit = Some(count);
        self
    }

    #[must_use]
    pub fn address(&self) -> u8 {
        self.address
    }

    #[must_use]
    pub fn memory(&self) -> &[u8; 256] {
        &self.memory
    }

    #[must_use]
    pub fn pointer(&self) -> u8 {
        self.pointer
    }

    fn begin_write(&mut self) {
        self.expect_pointer = true;
        self.accepted = 0;
    }

    fn write(&mut self, byte: u8) -> bool {
        if self.ack_limit.is_some_and(|limit| self.accepted >= limit) {
            return false;
        }
        self.accepted += 1;
        if self.expect_pointer {
            self.pointer = byte;
            self.expect_pointer = false;
        } else {
            if let Some(cell) = self.memory.get_mut(usize::from(self.pointer)) {
                *cell = byte;
            }
            self.pointer = self.pointer.wrapping_add(1);
        }
        true
    }

    fn read(&mut self) -> u8 {
        let byte = self
            .memory
            .get(usize::from(self.pointer))
            .copied()
            .unwrap_or(0xFF);
        self.pointer = self.pointer.wrapping_add(1);
        byte
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    /// Start sent, waiting for the address header.
    Held,
    Transmit(Option<usize>),
    Receive(Option<usize>),
}

pub struct SimulatedTwi {
    twcr: u8,
    twsr: u8,
    twdr: u8,
    twbr: u8,
    powered: bool,
    phase: Phase,
    busy: bool,
    latency: u32,
    pending: u32,
    hung: bool,
    forced: Option<(u32, TwiStatus)>,
    targets: Vec<SimTarget, MAX_TARGETS>,
    events: Vec<SimEvent, MAX_EVENTS>,
    data_writes: Vec<u8, MAX_EVENTS>,
    truncated: bool,
}

impl Default for SimulatedTwi {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedTwi {
    #[must_use]
    pub fn new() -> Self {
        Self {
            twcr: 0,
            twsr: TwiStatus::NoInformation.code(),
            twdr: 0xFF,
            twbr: 0,
            powered: false,
            phase: Phase::Idle,
            busy: false,
            latency: 0,
            pending: 0,
            hung: false,
            forced: None,
            targets: Vec::new(),
            events: Vec::new(),
            data_writes: Vec::new(),
            truncated: false,
        }
    }

    /// Attaches a target; gives it back if the bus is full.
    ///
    /// # Errors
    ///
    /// Returns the target when [`MAX_TARGETS`] are already attached.
    pub fn attach(&mut self, target: SimTarget) -> Result<(), SimTarget> {
        self.targets.push(target)
    }

    /// Builder form of [`attach`](Self::attach).
    ///
    /// # Errors
    ///
    /// Returns the target when [`MAX_TARGETS`] are already attached.
    pub fn with_target(mut self, target: SimTarget) -> Result<Self, SimTarget> {
        self.attach(target)?;
        Ok(self)
    }

    #[must_use]
    pub fn target(&self, address: u8) -> Option<&SimTarget> {
        self.targets.iter().find(|t| t.address == address)
    }

    /// Number of TWCR reads that still show TWINT clear after each action.
    pub fn set_latency(&mut self, polls: u32) {
        self.latency = polls;
    }

    /// Stops completing actions, as a stuck bus would.
    pub fn hang(&mut self) {
        self.hung = true;
    }

    /// Reports `status` for the next completed action instead of the modelled one.
    pub fn force_next_status(&mut self, status: TwiStatus) {
        self.force_status_after(0, status);
    }

    /// Lets `actions` actions complete normally, then reports `status` once.
    pub fn force_status_after(&mut self, actions: u32, status: TwiStatus) {
        self.forced = Some((actions, status));
    }

    #[must_use]
    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Every value written to TWDR, in order.
    #[must_use]
    pub fn data_writes(&self) -> &[u8] {
        &self.data_writes
    }

    pub fn clear_log(&mut self) {
        self.events.clear();
        self.data_writes.clear();
        self.truncated = false;
    }

    /// True if a log filled up and entries were dropped since the last
    /// [`clear_log`](Self::clear_log).
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    #[must_use]
    pub fn bit_rate(&self) -> u8 {
        self.twbr
    }

    #[must_use]
    pub fn prescaler(&self) -> u8 {
        self.twsr & TWPS_MASK
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.twcr & TWEN != 0
    }

    #[must_use]
    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// True between a start condition and the next stop.
    #[must_use]
    pub fn bus_held(&self) -> bool {
        self.phase != Phase::Idle
    }

    fn record(&mut self, event: SimEvent) {
        if self.events.push(event).is_err() {
            self.truncated = true;
        }
    }

    fn complete(&mut self, status: TwiStatus) {
        let status = match self.forced {
            Some((0, forced)) => {
                self.forced = None;
                forced
            }
            Some((remaining, forced)) => {
                self.forced = Some((remaining - 1, forced));
                status
            }
            None => status,
        };
        self.twsr = status.code() | (self.twsr & TWPS_MASK);
        self.busy = true;
        self.pending = self.latency;
    }

    fn address_phase(&mut self) {
        let header = self.twdr;
        let read = header & 1 != 0;
        let index = self
            .targets
            .iter()
            .position(|t| t.address == header >> 1);
        let ack = index.is_some();
        self.record(SimEvent::Address { header, ack });
        if read {
            self.phase = Phase::Receive(index);
            self.complete(if ack {
                TwiStatus::ReadAddressAck
            } else {
                TwiStatus::ReadAddressNack
            });
        } else {
            if let Some(target) = index.and_then(|i| self.targets.get_mut(i)) {
                target.begin_write();
            }
            self.phase = Phase::Transmit(index);
            self.complete(if ack {
                TwiStatus::WriteAddressAck
            } else {
                TwiStatus::WriteAddressNack
            });
        }
    }

    fn transmit_phase(&mut self, index: Option<usize>) {
        let byte = self.twdr;
        let ack = index
            .and_then(|i| self.targets.get_mut(i))
            .is_some_and(|t| t.write(byte));
        self.record(SimEvent::Write { byte, ack });
        self.complete(if ack {
            TwiStatus::DataTransmittedAck
        } else {
            TwiStatus::DataTransmittedNack
        });
    }

    fn receive_phase(&mut self, index: Option<usize>, ack: bool) {
        // An absent target leaves SDA released, which reads as ones
        let byte = index
            .and_then(|i| self.targets.get_mut(i))
            .map_or(0xFF, SimTarget::read);
        self.twdr = byte;
        self.record(SimEvent::Read { byte, ack });
        self.complete(if ack {
            TwiStatus::DataReceivedAck
        } else {
            TwiStatus::DataReceivedNack
        });
    }
}

impl TwiRegisters for SimulatedTwi {
    fn control(&mut self) -> u8 {
        if self.busy && !self.hung {
            if self.pending == 0 {
                self.busy = false;
                self.twcr |= TWINT;
            } else {
                self.pending -= 1;
            }
        }
        self.twcr
    }

    fn set_control(&mut self, value: u8) {
        // Writing one to TWINT clears it
        self.twcr = value & !TWINT;
        if value & TWEN == 0 || value & TWINT == 0 {
            return;
        }

        if value & TWSTO != 0 {
            self.record(SimEvent::Stop);
            self.phase = Phase::Idle;
            self.busy = false;
            self.twcr &= !TWSTO;
            self.twsr = TwiStatus::NoInformation.code() | (self.twsr & TWPS_MASK);
            return;
        }

        if value & TWSTA != 0 {
            let status = if self.phase == Phase::Idle {
                self.record(SimEvent::Start);
                TwiStatus::StartTransmitted
            } else {
                self.record(SimEvent::RepeatedStart);
                TwiStatus::RepeatedStartTransmitted
            };
            self.phase = Phase::Held;
            self.complete(status);
            return;
        }

        match self.phase {
            Phase::Idle => self.complete(TwiStatus::BusError),
            Phase::Held => self.address_phase(),
            Phase::Transmit(index) => self.transmit_phase(index),
            Phase::Receive(index) => self.receive_phase(index, value & TWEA != 0),
        }
    }

    fn status(&mut self) -> u8 {
        self.twsr
    }

    fn set_status(&mut self, value: u8) {
        self.twsr = (self.twsr & STATUS_MASK) | (value & TWPS_MASK);
    }

    fn data(&mut self) -> u8 {
        self.twdr
    }

    fn set_data(&mut self, value: u8) {
        self.twdr = value;
        if self.data_writes.push(value).is_err() {
            self.truncated = true;
        }
    }

    fn set_bit_rate(&mut self, value: u8) {
        self.twbr = value;
    }

    fn power_up(&mut self) {
        self.powered = true;
    }
}
