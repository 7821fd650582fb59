// Licensed under the Apache-2.0 license

use crate::twi::common::TwiStatus;
use core::fmt;
use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

/// Failure of a TWI operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The hardware reported a status other than the one the step expects.
    Status(TwiStatus),
    /// TWSR held a value outside the status table.
    UnknownStatus(u8),
    /// The wait policy gave up before TWINT was set.
    Timeout,
    /// Address does not fit seven bits.
    InvalidAddress(u8),
    /// Requested bus frequency cannot be programmed into TWBR.
    InvalidFrequency,
}

impl Error {
    /// Literal status code reported by the hardware, if this error carries one.
    #[must_use]
    pub const fn status_code(&self) -> Option<u8> {
        match self {
            Self::Status(status) => Some(status.code()),
            Self::UnknownStatus(raw) => Some(*raw),
            _ => None,
        }
    }
}

impl From<TwiStatus> for Error {
    fn from(status: TwiStatus) -> Self {
        Self::Status(status)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => {
                write!(f, "{} (0x{:02X})", status.description(), status.code())
            }
            Self::UnknownStatus(raw) => write!(f, "unknown status 0x{raw:02X}"),
            Self::Timeout => f.write_str("timed out waiting for TWINT"),
            Self::InvalidAddress(address) => write!(f, "invalid 7-bit address 0x{address:02X}"),
            Self::InvalidFrequency => f.write_str("bus frequency not achievable"),
        }
    }
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Status(TwiStatus::WriteAddressNack | TwiStatus::ReadAddressNack) => {
                ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
            }
            Self::Status(TwiStatus::DataTransmittedNack) => {
                ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)
            }
            Self::Status(TwiStatus::ArbitrationLost) => ErrorKind::ArbitrationLoss,
            Self::Status(TwiStatus::BusError) => ErrorKind::Bus,
            _ => ErrorKind::Other,
        }
    }
}
