use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecompressError {
    NotConfigured,
    /// The input bytes do not form a frame this decompressor can decode.
    MalformedInput(String),
    /// The output buffer is smaller than one decoded frame.
    OutputTooSmall { need: usize, got: usize },
    UnsupportedConversion { from: String, to: String },
}

impl fmt::Display for DecompressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use DecompressError::*;
        match self {
            NotConfigured => write!(f, "decompressor used before reconfigure"),
            MalformedInput(why) => write!(f, "malformed input: {why}"),
            OutputTooSmall { need, got } => {
                write!(f, "output buffer too small: need {need}, got {got}")
            }
            UnsupportedConversion { from, to } => {
                write!(f, "unsupported conversion {from} -> {to}")
            }
        }
    }
}

impl std::error::Error for DecompressError {}
