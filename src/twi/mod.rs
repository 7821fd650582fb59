// Licensed under the Apache-2.0 license

//! AVR two-wire interface (TWI) driver module.
//!
//! A polled master-mode driver for the I2C-compatible TWI peripheral of
//! ATmega parts, designed for bare-metal and `no_std` environments. Register
//! primitives live in [`avr_twi`], transactions in [`traits`], and
//! [`twi_controller`] adapts the bus to the embedded-hal traits.

pub mod avr_twi;
pub mod common;
pub mod error;
pub mod registers;
#[cfg(any(test, feature = "sim"))]
pub mod simulated;
pub mod traits;
pub mod twi_controller;
pub mod wait;

pub use avr_twi::AvrTwi;
pub use common::{Direction, TwiConfig, TwiConfigBuilder, TwiSpeed, TwiStatus};
pub use error::Error;
pub use registers::{MmioRegisters, RegisterMap, TwiRegisters};
pub use traits::{TwiHardwareCore, TwiMaster};
pub use twi_controller::TwiController;
pub use wait::{AbortHook, SpinLimit, Unbounded, WaitPolicy};
