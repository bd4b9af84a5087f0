use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FecError {
    /// k, m or c is zero, or c exceeds k.
    BadGeometry { k: u16, m: u16, c: u8 },
    /// Protected buffer length is not divisible into k + m symbols.
    BadBufferLength { len: usize, symbols: usize },
    /// Peeling stalled with data symbols still missing.
    Unrecoverable { missing: usize },
    /// The embedded payload length field exceeds the protected region.
    CorruptLengthField { claimed: usize, available: usize },
}

impl fmt::Display for FecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use FecError::*;
        match self {
            BadGeometry { k, m, c } => write!(f, "bad FEC geometry k={k} m={m} c={c}"),
            BadBufferLength { len, symbols } => {
                write!(f, "buffer of {len} bytes not divisible into {symbols} symbols")
            }
            Unrecoverable { missing } => {
                write!(f, "recovery stalled with {missing} data symbols missing")
            }
            CorruptLengthField { claimed, available } => write!(
                f,
                "embedded length {claimed} exceeds protected region of {available} bytes"
            ),
        }
    }
}

impl std::error::Error for FecError {}
