// Licensed under the Apache-2.0 license

//! Completion-flag wait strategies.
//!
//! Every register primitive except stop ends by polling TWINT. The driver
//! expresses one poll as an `nb::Result` and hands it to a [`WaitPolicy`],
//! which decides how long to keep spinning.

use crate::twi::error::Error;

pub trait WaitPolicy {
    /// Calls `poll` until it stops returning `WouldBlock`.
    ///
    /// # Errors
    ///
    /// Propagates errors from `poll`, or [`Error::Timeout`] if the policy gives up.
    fn wait<F>(&mut self, poll: F) -> Result<(), Error>
    where
        F: FnMut() -> nb::Result<(), Error>;
}

/// Spin until the hardware answers, however long that takes.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unbounded;

impl WaitPolicy for Unbounded {
    fn wait<F>(&mut self, mut poll: F) -> Result<(), Error>
    where
        F: FnMut() -> nb::Result<(), Error>,
    {
        nb::block!(poll())
    }
}

/// Give up after a fixed number of unsuccessful polls.
#[derive(Clone, Copy, Debug)]
pub struct SpinLimit(pub u32);

impl WaitPolicy for SpinLimit {
    fn wait<F>(&mut self, mut poll: F) -> Result<(), Error>
    where
        F: FnMut() -> nb::Result<(), Error>,
    {
        let mut remaining = self.0;
        loop {
            match poll() {
                Ok(()) => return Ok(()),
                Err(nb::Error::Other(e)) => return Err(e),
                Err(nb::Error::WouldBlock) => {
                    if remaining == 0 {
                        return Err(Error::Timeout);
                    }
                    remaining -= 1;
                }
            }
        }
    }
}

/// Consult a caller hook after every unsuccessful poll; `true` aborts the wait.
pub struct AbortHook<F: FnMut() -> bool>(pub F);

impl<H: FnMut() -> bool> WaitPolicy for AbortHook<H> {
    fn wait<F>(&mut self, mut poll: F) -> Result<(), Error>
    where
        F: FnMut() -> nb::Result<(), Error>,
    {
        loop {
            match poll() {
                Ok(()) => return Ok(()),
                Err(nb::Error::Other(e)) => return Err(e),
                Err(nb::Error::WouldBlock) => {
                    if (self.0)() {
                        return Err(Error::Timeout);
                    }
                }
            }
        }
    }
}
