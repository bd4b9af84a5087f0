//! Application payload header prefixing every video fragment.
//!
//! Six big-endian 32-bit words, two more when the stream is FEC-protected:
//!
//! | Word | Bits   | Meaning                                   |
//! |------|--------|-------------------------------------------|
//! | 0    | 31..22 | substream index                           |
//! | 0    | 21..0  | buffer id (22-bit rolling)                |
//! | 1    | 31..0  | byte offset of fragment within frame      |
//! | 2    | 31..0  | total buffer length in bytes              |
//! | 3    | 31..16 | width                                     |
//! | 3    | 15..0  | height                                    |
//! | 4    | 31..0  | pixel format FourCC                       |
//! | 5    | 31..29 | interlacing kind                          |
//! | 5    | 28..19 | fps numerator                             |
//! | 5    | 18..15 | fps denominator                           |
//! | 5    | 14     | fps 1.001 divisor flag                    |
//! | 6    | 31..19 | FEC k   (PT_VIDEO_FEC only)               |
//! | 6    | 18..6  | FEC m                                     |
//! | 6    | 5..0   | FEC c                                     |
//! | 7    | 31..0  | FEC seed                                  |

use byteorder::{BigEndian, ByteOrder};

use super::payload_error::PayloadError;
use super::rtp_packet::{PT_VIDEO, PT_VIDEO_FEC};
use crate::fec::FecParams;
use crate::video::{Codec, Fps, Interlacing, VideoDesc};

pub const VIDEO_HDR_LEN: usize = 24;
pub const FEC_HDR_LEN: usize = 32;

pub const MAX_SUBSTREAM: u32 = 0x3FF;
pub const BUFFER_ID_MASK: u32 = 0x3F_FFFF;

/// Parsed payload header of one fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadHeader {
    pub substream: u32,
    pub buffer_id: u32,
    pub offset: u32,
    pub buffer_length: u32,
    pub desc: VideoDesc,
    pub fec: Option<FecParams>,
}

impl PayloadHeader {
    /// Encoded length: 24 bytes, or 32 with the FEC words.
    pub fn wire_len(&self) -> usize {
        if self.fec.is_some() {
            FEC_HDR_LEN
        } else {
            VIDEO_HDR_LEN
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.wire_len()];
        BigEndian::write_u32(
            &mut buf[0..],
            (self.substream & MAX_SUBSTREAM) << 22 | (self.buffer_id & BUFFER_ID_MASK),
        );
        BigEndian::write_u32(&mut buf[4..], self.offset);
        BigEndian::write_u32(&mut buf[8..], self.buffer_length);
        BigEndian::write_u32(
            &mut buf[12..],
            (self.desc.width & 0xFFFF) << 16 | (self.desc.height & 0xFFFF),
        );
        BigEndian::write_u32(&mut buf[16..], self.desc.codec.fourcc());
        let fps = self.desc.fps;
        BigEndian::write_u32(
            &mut buf[20..],
            u32::from(self.desc.interlacing.to_wire()) << 29
                | u32::from(fps.num & 0x3FF) << 19
                | u32::from(fps.den & 0xF) << 15
                | u32::from(fps.div1001) << 14,
        );
        if let Some(fec) = self.fec {
            BigEndian::write_u32(
                &mut buf[24..],
                u32::from(fec.k & 0x1FFF) << 19
                    | u32::from(fec.m & 0x1FFF) << 6
                    | u32::from(fec.c & 0x3F),
            );
            BigEndian::write_u32(&mut buf[28..], fec.seed);
        }
        buf
    }

    /// Parse the header of a `payload_type` packet. Returns the header and
    /// its length so the caller can slice off the fragment bytes.
    pub fn decode(payload_type: u8, payload: &[u8]) -> Result<(Self, usize), PayloadError> {
        let need = match payload_type {
            PT_VIDEO_FEC => FEC_HDR_LEN,
            _ => VIDEO_HDR_LEN,
        };
        if payload.len() < need {
            return Err(PayloadError::TooShort {
                need,
                got: payload.len(),
            });
        }
        let word0 = BigEndian::read_u32(&payload[0..]);
        let offset = BigEndian::read_u32(&payload[4..]);
        let buffer_length = BigEndian::read_u32(&payload[8..]);
        let word3 = BigEndian::read_u32(&payload[12..]);
        let fourcc = BigEndian::read_u32(&payload[16..]);
        let word5 = BigEndian::read_u32(&payload[20..]);

        let codec = Codec::from_fourcc(fourcc).ok_or(PayloadError::UnknownFourcc(fourcc))?;
        let il_raw = (word5 >> 29) as u8;
        let interlacing =
            Interlacing::from_wire(il_raw).ok_or(PayloadError::UnknownInterlacing(il_raw))?;
        let fps = Fps::new(
            ((word5 >> 19) & 0x3FF) as u16,
            ((word5 >> 15) & 0xF) as u8,
            word5 & (1 << 14) != 0,
        );

        let fec = if payload_type == PT_VIDEO_FEC {
            let word6 = BigEndian::read_u32(&payload[24..]);
            Some(FecParams::new(
                (word6 >> 19) as u16,
                ((word6 >> 6) & 0x1FFF) as u16,
                (word6 & 0x3F) as u8,
                BigEndian::read_u32(&payload[28..]),
            ))
        } else {
            None
        };

        Ok((
            Self {
                substream: word0 >> 22,
                buffer_id: word0 & BUFFER_ID_MASK,
                offset,
                buffer_length,
                desc: VideoDesc::new(word3 >> 16, word3 & 0xFFFF, codec, interlacing, fps),
                fec,
            },
            need,
        ))
    }
}
