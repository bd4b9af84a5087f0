//! Minimal RTP packet model + encode/decode per RFC 3550.
//!
//! No session logic lives here, only the immutable packet struct and safe
//! serialization. CSRC lists are accepted on decode and skipped; header
//! extensions are skipped likewise (the engine never emits either).

use bytes::Bytes;

use super::rtp_error::RtpError;

pub const RTP_VERSION: u8 = 2;
pub const RTP_HEADER_LEN: usize = 12;

/// Payload type of a video stream without FEC protection.
pub const PT_VIDEO: u8 = 20;
/// Payload type of a video stream wrapped in LDGM-style FEC.
pub const PT_VIDEO_FEC: u8 = 24;

/// Complete RTP packet (fixed header + payload).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacket {
    pub payload_type: u8,
    pub marker: bool,
    pub sequence: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    /// Payload with any trailing padding already removed.
    pub payload: Bytes,
}

impl RtpPacket {
    pub fn new(
        payload_type: u8,
        marker: bool,
        sequence: u16,
        timestamp: u32,
        ssrc: u32,
        payload: Bytes,
    ) -> Self {
        Self {
            payload_type,
            marker,
            sequence,
            timestamp,
            ssrc,
            payload,
        }
    }

    /// Encode into a fresh Vec<u8> (network byte order).
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(RTP_HEADER_LEN + self.payload.len());
        out.push(RTP_VERSION << 6);
        out.push(((self.marker as u8) << 7) | (self.payload_type & 0x7F));
        out.extend_from_slice(&self.sequence.to_be_bytes());
        out.extend_from_slice(&self.timestamp.to_be_bytes());
        out.extend_from_slice(&self.ssrc.to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Decode from raw bytes, skipping CSRC entries and header extensions.
    pub fn decode(buf: &[u8]) -> Result<Self, RtpError> {
        if buf.len() < RTP_HEADER_LEN {
            return Err(RtpError::TooShort);
        }
        let version = buf[0] >> 6;
        if version != RTP_VERSION {
            return Err(RtpError::BadVersion(version));
        }
        let has_padding = buf[0] & 0x20 != 0;
        let has_extension = buf[0] & 0x10 != 0;
        let csrc_count = (buf[0] & 0x0F) as usize;
        let marker = buf[1] & 0x80 != 0;
        let payload_type = buf[1] & 0x7F;
        let sequence = u16::from_be_bytes([buf[2], buf[3]]);
        let timestamp = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let ssrc = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]);

        let mut pos = RTP_HEADER_LEN;
        if buf.len() < pos + csrc_count * 4 {
            return Err(RtpError::CsrcCountMismatch {
                expected: csrc_count,
                buf_left: buf.len() - pos,
            });
        }
        pos += csrc_count * 4;

        if has_extension {
            if buf.len() < pos + 4 {
                return Err(RtpError::TooShort);
            }
            let words = u16::from_be_bytes([buf[pos + 2], buf[pos + 3]]) as usize;
            pos += 4 + words * 4;
            if buf.len() < pos {
                return Err(RtpError::TooShort);
            }
        }

        let mut end = buf.len();
        if has_padding {
            let pad = *buf.last().ok_or(RtpError::TooShort)? as usize;
            if pad == 0 || end - pos < pad {
                return Err(RtpError::PaddingTooShort);
            }
            end -= pad;
        }

        Ok(Self {
            payload_type,
            marker,
            sequence,
            timestamp,
            ssrc,
            payload: Bytes::copy_from_slice(&buf[pos..end]),
        })
    }
}
