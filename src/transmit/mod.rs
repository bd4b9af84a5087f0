pub mod fragmenter;
pub mod transmit_error;
pub mod transmitter;

pub use fragmenter::Fragmenter;
pub use transmit_error::TransmitError;
pub use transmitter::{spawn_transmit_worker, OutgoingFrame, Transmitter};
