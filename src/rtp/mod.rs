pub mod payload_error;
pub mod payload_header;
pub mod rtp_error;
pub mod rtp_packet;

pub use payload_error::PayloadError;
pub use payload_header::{PayloadHeader, FEC_HDR_LEN, VIDEO_HDR_LEN};
pub use rtp_error::RtpError;
pub use rtp_packet::{RtpPacket, PT_VIDEO, PT_VIDEO_FEC, RTP_HEADER_LEN};
