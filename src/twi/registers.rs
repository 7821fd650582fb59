// Licensed under the Apache-2.0 license

//! Register-level access to the TWI peripheral.
//!
//! The driver never touches memory directly; it goes through [`TwiRegisters`] so
//! the same code runs against real hardware ([`MmioRegisters`]) or a software
//! model of the peripheral.

/// TWCR: interrupt flag, set by hardware on completion, cleared by writing one.
pub const TWINT: u8 = 0x80;
/// TWCR: enable acknowledge.
pub const TWEA: u8 = 0x40;
/// TWCR: generate a start condition.
pub const TWSTA: u8 = 0x20;
/// TWCR: generate a stop condition.
pub const TWSTO: u8 = 0x10;
/// TWCR: enable the peripheral.
pub const TWEN: u8 = 0x04;

/// TWSR prescaler bits.
pub const TWPS_MASK: u8 = 0x03;

/// PRR: power reduction TWI bit.
pub const PRTWI: u8 = 0x80;

/// Access to the TWI register set.
pub trait TwiRegisters {
    /// Reads TWCR.
    fn control(&mut self) -> u8;
    /// Writes TWCR. Writing with [`TWINT`] set starts the encoded action.
    fn set_control(&mut self, value: u8);
    /// Reads TWSR including the prescaler bits.
    fn status(&mut self) -> u8;
    /// Writes TWSR; only the prescaler bits are writable on hardware.
    fn set_status(&mut self, value: u8);
    fn data(&mut self) -> u8;
    fn set_data(&mut self, value: u8);
    fn set_bit_rate(&mut self, value: u8);

    /// Ungates the peripheral clock. No-op where the part has no power reduction register.
    fn power_up(&mut self) {}
}

impl<R: TwiRegisters + ?Sized> TwiRegisters for &mut R {
    fn control(&mut self) -> u8 {
        (**self).control()
    }
    fn set_control(&mut self, value: u8) {
        (**self).set_control(value);
    }
    fn status(&mut self) -> u8 {
        (**self).status()
    }
    fn set_status(&mut self, value: u8) {
        (**self).set_status(value);
    }
    fn data(&mut self) -> u8 {
        (**self).data()
    }
    fn set_data(&mut self, value: u8) {
        (**self).set_data(value);
    }
    fn set_bit_rate(&mut self, value: u8) {
        (**self).set_bit_rate(value);
    }
    fn power_up(&mut self) {
        (**self).power_up();
    }
}

/// Data-space addresses of the TWI registers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RegisterMap {
    pub twbr: usize,
    pub twsr: usize,
    pub twdr: usize,
    pub twcr: usize,
    pub prr: Option<usize>,
}

impl RegisterMap {
    /// ATmega48/88/168/328 family.
    pub const ATMEGA328P: Self = Self {
        twbr: 0xB8,
        twsr: 0xB9,
        twdr: 0xBB,
        twcr: 0xBC,
        prr: Some(0x64),
    };
}

/// Volatile memory-mapped register access.
pub struct MmioRegisters {
    map: RegisterMap,
}

impl MmioRegisters {
    /// # Safety
    ///
    /// `map` must describe the TWI registers of the running device and the
    /// caller must be the only user of the peripheral for the lifetime of the
    /// returned value.
    #[must_use]
    pub const unsafe fn new(map: RegisterMap) -> Self {
        Self { map }
    }

    /// # Safety
    ///
    /// See [`MmioRegisters::new`].
    #[must_use]
    pub const unsafe fn atmega328p() -> Self {
        Self::new(RegisterMap::ATMEGA328P)
    }

    fn read(address: usize) -> u8 {
        // SAFETY: the address came from the map accepted by `new`.
        unsafe { core::ptr::read_volatile(address as *const u8) }
    }

    fn write(address: usize, value: u8) {
        // SAFETY: the address came from the map accepted by `new`.
        unsafe { core::ptr::write_volatile(address as *mut u8, value) }
    }
}

impl TwiRegisters for MmioRegisters {
    fn control(&mut self) -> u8 {
        Self::read(self.map.twcr)
    }
    fn set_control(&mut self, value: u8) {
        Self::write(self.map.twcr, value);
    }
    fn status(&mut self) -> u8 {
        Self::read(self.map.twsr)
    }
    fn set_status(&mut self, value: u8) {
        Self::write(self.map.twsr, value);
    }
    fn data(&mut self) -> u8 {
        Self::read(self.map.twdr)
    }
    fn set_data(&mut self, value: u8) {
        Self::write(self.map.twdr, value);
    }
    fn set_bit_rate(&mut self, value: u8) {
        Self::write(self.map.twbr, value);
    }
    fn power_up(&mut self) {
        if let Some(prr) = self.map.prr {
            Self::write(prr, Self::read(prr) & !PRTWI);
        }
    }
}
