pub mod net_error;
pub mod socket;

pub use net_error::NetError;
pub use socket::{VideoSocket, RECV_TIMEOUT};
