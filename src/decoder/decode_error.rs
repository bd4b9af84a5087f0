use std::fmt;

use crate::display::DisplayError;
use crate::video::Codec;

#[derive(Debug)]
pub enum DecodeError {
    /// No line decoder or block decompressor reaches any display codec.
    NoDecoder { codec: Codec },
    DisplayReconfigure(DisplayError),
    FramebufferCheckout(DisplayError),
    DecompressorSetup { from: Codec, to: Codec },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use DecodeError::*;
        match self {
            NoDecoder { codec } => write!(f, "unable to find decoder for input codec {codec}"),
            DisplayReconfigure(e) => write!(f, "unable to reconfigure display: {e}"),
            FramebufferCheckout(e) => write!(f, "unable to check out framebuffer: {e}"),
            DecompressorSetup { from, to } => {
                write!(f, "decompressor setup failed for {from} -> {to}")
            }
        }
    }
}

impl std::error::Error for DecodeError {}
