use std::fmt;
use std::io;

use crate::fec::FecError;

#[derive(Debug)]
pub enum TransmitError {
    /// The MTU leaves no room for even one 48-byte fragment.
    MtuTooSmall { mtu: usize },
    Fec(FecError),
    Io(io::Error),
}

impl fmt::Display for TransmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TransmitError::*;
        match self {
            MtuTooSmall { mtu } => write!(f, "MTU {mtu} too small for any fragment"),
            Fec(e) => write!(f, "FEC encode error: {e}"),
            Io(e) => write!(f, "send error: {e}"),
        }
    }
}

impl std::error::Error for TransmitError {}

impl From<FecError> for TransmitError {
    fn from(e: FecError) -> Self {
        TransmitError::Fec(e)
    }
}

impl From<io::Error> for TransmitError {
    fn from(e: io::Error) -> Self {
        TransmitError::Io(e)
    }
}
