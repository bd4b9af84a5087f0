use std::fmt;
use std::io;

#[derive(Debug)]
pub enum NetError {
    Io(io::Error),
    /// The requested port pair could not be reserved.
    PortPair { port: u16, source: io::Error },
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use NetError::*;
        match self {
            Io(e) => write!(f, "socket error: {e}"),
            PortPair { port, source } => {
                write!(f, "unable to bind RTP/RTCP port pair {port}/{}: {source}", port + 1)
            }
        }
    }
}

impl std::error::Error for NetError {}

impl From<io::Error> for NetError {
    fn from(e: io::Error) -> Self {
        NetError::Io(e)
    }
}
