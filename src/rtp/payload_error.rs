use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    TooShort { need: usize, got: usize },
    UnknownFourcc(u32),
    UnknownInterlacing(u8),
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use PayloadError::*;
        match self {
            TooShort { need, got } => {
                write!(f, "payload header needs {need} bytes, packet has {got}")
            }
            UnknownFourcc(fcc) => {
                let b = fcc.to_be_bytes();
                write!(
                    f,
                    "unknown FourCC {:?}",
                    b.map(|c| if c.is_ascii_graphic() { c as char } else { '.' })
                )
            }
            UnknownInterlacing(v) => write!(f, "unknown interlacing kind {v}"),
        }
    }
}

impl std::error::Error for PayloadError {}
