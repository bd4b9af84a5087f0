//! Frame-to-packet fragmentation, the dual of the receive pipeline.

use bytes::Bytes;
use rand::Rng;
use rand::thread_rng;

use super::transmit_error::TransmitError;
use crate::config::{FecMode, PipelineConfig};
use crate::fec::{self, FecParams};
use crate::rtp::payload_header::{BUFFER_ID_MASK, FEC_HDR_LEN, VIDEO_HDR_LEN};
use crate::rtp::{PayloadHeader, RtpPacket, PT_VIDEO, PT_VIDEO_FEC};
use crate::video::VideoDesc;

/// IP + UDP + RTP framing reserved out of the MTU.
const WIRE_OVERHEAD: usize = 40;
/// Fragments are sized in multiples of this, so pixel group boundaries
/// survive refragmentation.
const FRAGMENT_QUANTUM: usize = 48;

/// Splits frames into RTP packets carrying the application payload header.
///
/// Keeps the rolling 22-bit buffer id and the RTP sequence counter; one
/// fragmenter per outgoing stream.
pub struct Fragmenter {
    mtu: usize,
    marker_retransmits: u32,
    fec_mode: FecMode,
    buffer_id: u32,
    sequence: u16,
}

impl Fragmenter {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            mtu: config.mtu,
            marker_retransmits: config.marker_retransmit_count,
            fec_mode: config.fec_mode,
            buffer_id: thread_rng().gen_range(0..=BUFFER_ID_MASK),
            sequence: rand::random::<u16>(),
        }
    }

    fn next_sequence(&mut self) -> u16 {
        let seq = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        seq
    }

    /// Fragment one frame (all substreams) into ready-to-send packets.
    ///
    /// The final fragment of each substream carries the marker bit and is
    /// emitted `1 + marker_retransmit_count` times to mask trailing loss;
    /// receivers absorb the duplicates.
    pub fn fragment_frame(
        &mut self,
        desc: VideoDesc,
        substreams: &[Vec<u8>],
        timestamp: u32,
        ssrc: u32,
    ) -> Result<Vec<RtpPacket>, TransmitError> {
        let buffer_id = self.buffer_id;
        self.buffer_id = (self.buffer_id + 1) & BUFFER_ID_MASK;

        let mut packets = Vec::new();
        for (substream, data) in substreams.iter().enumerate() {
            let (bytes, payload_type, fec_params) = match self.fec_mode {
                FecMode::Off => (data.clone(), PT_VIDEO, None),
                FecMode::Ldgm { k, m, c } => {
                    let params = FecParams::new(k, m, c, rand::random::<u32>());
                    (fec::encode(data, &params)?, PT_VIDEO_FEC, Some(params))
                }
            };

            let header_len = if fec_params.is_some() {
                FEC_HDR_LEN
            } else {
                VIDEO_HDR_LEN
            };
            let budget = self.mtu.saturating_sub(WIRE_OVERHEAD + header_len);
            let fragment_len = budget / FRAGMENT_QUANTUM * FRAGMENT_QUANTUM;
            if fragment_len == 0 {
                return Err(TransmitError::MtuTooSmall { mtu: self.mtu });
            }

            let total = bytes.len() as u32;
            let mut offset = 0usize;
            loop {
                let end = (offset + fragment_len).min(bytes.len());
                let last = end == bytes.len();
                let header = PayloadHeader {
                    substream: substream as u32,
                    buffer_id,
                    offset: offset as u32,
                    buffer_length: total,
                    desc,
                    fec: fec_params,
                };
                let mut payload = header.encode();
                payload.extend_from_slice(&bytes[offset..end]);
                let payload = Bytes::from(payload);

                let copies = if last { 1 + self.marker_retransmits } else { 1 };
                for _ in 0..copies {
                    packets.push(RtpPacket::new(
                        payload_type,
                        last,
                        self.next_sequence(),
                        timestamp,
                        ssrc,
                        payload.clone(),
                    ));
                }
                if last {
                    break;
                }
                offset = end;
            }
        }
        Ok(packets)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::video::{Codec, Fps, Interlacing};

    fn desc() -> VideoDesc {
        VideoDesc::new(64, 4, Codec::Uyvy, Interlacing::Progressive, Fps::whole(30))
    }

    fn config(mtu: usize) -> PipelineConfig {
        PipelineConfig {
            mtu,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn fragments_are_quantized_and_cover_the_frame() {
        let mut frag = Fragmenter::new(&config(1500));
        let data = vec![0xABu8; 10_000];
        let packets = frag
            .fragment_frame(desc(), &[data.clone()], 90_000, 7)
            .unwrap();

        let expected_fragment = (1500 - 40 - VIDEO_HDR_LEN) / 48 * 48;
        let mut covered = 0usize;
        let mut markers = 0;
        for packet in &packets {
            let (hdr, hdr_len) = PayloadHeader::decode(packet.payload_type, &packet.payload).unwrap();
            let body = packet.payload.len() - hdr_len;
            assert!(body <= expected_fragment);
            assert_eq!(hdr.buffer_length, 10_000);
            if packet.marker {
                markers += 1;
            } else {
                assert_eq!(body, expected_fragment);
                covered += body;
            }
        }
        // last fragment counted once plus its 5 retransmissions
        assert_eq!(markers, 6);
        let tail = 10_000 - covered;
        assert!(tail > 0 && tail <= expected_fragment);
    }

    #[test]
    fn sequence_numbers_are_consecutive() {
        let mut frag = Fragmenter::new(&config(1500));
        let packets = frag
            .fragment_frame(desc(), &[vec![0u8; 5000]], 0, 1)
            .unwrap();
        for pair in packets.windows(2) {
            assert_eq!(pair[1].sequence, pair[0].sequence.wrapping_add(1));
        }
    }

    #[test]
    fn buffer_id_rolls_per_frame() {
        let mut frag = Fragmenter::new(&config(1500));
        let first = frag.fragment_frame(desc(), &[vec![0u8; 10]], 0, 1).unwrap();
        let second = frag.fragment_frame(desc(), &[vec![0u8; 10]], 0, 1).unwrap();
        let (h1, _) = PayloadHeader::decode(first[0].payload_type, &first[0].payload).unwrap();
        let (h2, _) = PayloadHeader::decode(second[0].payload_type, &second[0].payload).unwrap();
        assert_eq!(h2.buffer_id, (h1.buffer_id + 1) & BUFFER_ID_MASK);
    }

    #[test]
    fn tiny_mtu_is_rejected() {
        let mut frag = Fragmenter::new(&config(100));
        assert!(matches!(
            frag.fragment_frame(desc(), &[vec![0u8; 10]], 0, 1),
            Err(TransmitError::MtuTooSmall { .. })
        ));
    }

    #[test]
    fn fec_mode_emits_protected_packets() {
        let mut cfg = config(1500);
        cfg.fec_mode = FecMode::Ldgm { k: 8, m: 4, c: 3 };
        let mut frag = Fragmenter::new(&cfg);
        let packets = frag
            .fragment_frame(desc(), &[vec![0x5Au8; 2000]], 0, 1)
            .unwrap();
        let (hdr, _) = PayloadHeader::decode(packets[0].payload_type, &packets[0].payload).unwrap();
        assert_eq!(packets[0].payload_type, PT_VIDEO_FEC);
        let params = hdr.fec.unwrap();
        assert_eq!((params.k, params.m, params.c), (8, 4, 3));
        // protected buffer is larger than the original payload
        assert!(hdr.buffer_length > 2000);
    }

    #[test]
    fn stereo_substreams_are_tagged() {
        let mut frag = Fragmenter::new(&config(1500));
        let packets = frag
            .fragment_frame(desc(), &[vec![1u8; 100], vec![2u8; 100]], 0, 1)
            .unwrap();
        let ids: Vec<u32> = packets
            .iter()
            .map(|p| PayloadHeader::decode(p.payload_type, &p.payload).unwrap().0.substream)
            .collect();
        assert!(ids.contains(&0) && ids.contains(&1));
    }
}
