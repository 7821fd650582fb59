// Licensed under the Apache-2.0 license

//! Logging sinks shared by the driver layers.

use embedded_io::Write;

/// Minimal logging interface injected into drivers.
///
/// Implementations must not block for long; the driver calls them from inside
/// bus transactions.
pub trait Logger {
    fn debug(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
}

/// Logger that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn debug(&mut self, _msg: &str) {}
    fn error(&mut self, _msg: &str) {}
}

/// Logger writing one line per message to a byte sink such as a UART.
///
/// Write errors are dropped: a failing log sink must never abort a bus
/// transaction.
pub struct SerialLogger<W: Write> {
    sink: W,
}

impl<W: Write> SerialLogger<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    /// Returns the wrapped sink.
    pub fn release(self) -> W {
        self.sink
    }

    fn line(&mut self, level: &str, msg: &str) {
        let _ = self.sink.write_all(level.as_bytes());
        let _ = self.sink.write_all(msg.as_bytes());
        let _ = self.sink.write_all(b"\r\n");
    }
}

impl<W: Write> Logger for SerialLogger<W> {
    fn debug(&mut self, msg: &str) {
        self.line("[DEBUG] ", msg);
    }

    fn error(&mut self, msg: &str) {
        self.line("[ERROR] ", msg);
    }
}

impl<L: Logger + ?Sized> Logger for &mut L {
    fn debug(&mut self, msg: &str) {
        (**self).debug(msg);
    }

    fn error(&mut self, msg: &str) {
        (**self).error(msg);
    }
}
