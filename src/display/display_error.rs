use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayError {
    /// The sink refused the new video description.
    ReconfigureRefused(String),
    /// No framebuffer is available; the pipeline must skip this checkout.
    NoFrame,
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use DisplayError::*;
        match self {
            ReconfigureRefused(why) => write!(f, "display refused reconfiguration: {why}"),
            NoFrame => write!(f, "no framebuffer available"),
        }
    }
}

impl std::error::Error for DisplayError {}
