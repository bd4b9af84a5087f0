//! Groups released packets into frame units, one per timestamp.

use std::sync::Arc;

use super::frame_unit::{FrameUnit, SubstreamState};
use super::packet_ring::PacketGroup;
use crate::log::{LogLevel, LogSink};
use crate::rtp::{PayloadHeader, PT_VIDEO, PT_VIDEO_FEC};
use crate::stats::PipelineStats;
use crate::video::VideoMode;
use crate::{sink_log, sink_warn};

/// Result of assembling one packet group.
#[derive(Debug)]
pub enum Assembly {
    Unit(FrameUnit),
    /// An out-of-range substream index revealed the sender's real mode; the
    /// group is consumed and the pipeline must reconfigure before the next
    /// frame.
    ModeChange(VideoMode),
    /// Nothing usable was assembled.
    Dropped,
}

/// Per-participant assembler. Holds the currently expected video mode; the
/// expected substream count is derived from it.
pub struct FrameAssembler {
    mode: VideoMode,
    logger: Arc<dyn LogSink>,
    stats: Arc<PipelineStats>,
}

impl FrameAssembler {
    pub fn new(mode: VideoMode, logger: Arc<dyn LogSink>, stats: Arc<PipelineStats>) -> Self {
        Self {
            mode,
            logger,
            stats,
        }
    }

    pub fn mode(&self) -> VideoMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: VideoMode) {
        self.mode = mode;
    }

    pub fn assemble(&mut self, group: PacketGroup) -> Assembly {
        let expected = self.mode.substream_count();
        let mut unit: Option<FrameUnit> = None;

        for packet in &group.packets {
            if packet.payload_type != PT_VIDEO && packet.payload_type != PT_VIDEO_FEC {
                sink_warn!(
                    self.logger,
                    "unknown payload type {}, packet dropped",
                    packet.payload_type
                );
                self.stats.bump_wire_errors();
                continue;
            }
            let (hdr, hdr_len) = match PayloadHeader::decode(packet.payload_type, &packet.payload)
            {
                Ok(parsed) => parsed,
                Err(e) => {
                    sink_warn!(self.logger, "malformed payload header: {e}");
                    self.stats.bump_wire_errors();
                    continue;
                }
            };

            if hdr.substream >= expected {
                match VideoMode::infer_from_substream(hdr.substream) {
                    Some(new_mode) => {
                        sink_log!(
                            self.logger,
                            LogLevel::Info,
                            "received substream {} while expecting at most {}, guessing mode: {}",
                            hdr.substream,
                            expected,
                            new_mode.description()
                        );
                        self.mode = new_mode;
                        return Assembly::ModeChange(new_mode);
                    }
                    None => {
                        sink_warn!(
                            self.logger,
                            "substream {} exceeds expected count {} and matches no known mode, \
                             packet dropped",
                            hdr.substream,
                            expected
                        );
                        self.stats.bump_wire_errors();
                        continue;
                    }
                }
            }

            let unit = unit.get_or_insert_with(|| FrameUnit {
                timestamp: group.timestamp,
                ext_timestamp: group.ext_timestamp,
                first_arrival: group.first_arrival,
                desc: hdr.desc,
                fec: hdr.fec,
                substreams: (0..expected).map(|_| None).collect(),
                corrupted: false,
            });

            // FEC parameters must agree across the whole frame.
            if unit.fec != hdr.fec {
                sink_warn!(
                    self.logger,
                    "FEC parameters diverge within frame ts={}, frame dropped",
                    group.timestamp
                );
                return Assembly::Dropped;
            }

            let slot = &mut unit.substreams[hdr.substream as usize];
            let state = slot
                .get_or_insert_with(|| SubstreamState::new(hdr.buffer_length, hdr.buffer_id));
            if state.expected_bytes != hdr.buffer_length {
                sink_warn!(
                    self.logger,
                    "buffer length changed within substream {} of ts={} ({} -> {})",
                    hdr.substream,
                    group.timestamp,
                    state.expected_bytes,
                    hdr.buffer_length
                );
                unit.corrupted = true;
                continue;
            }

            let data = &packet.payload[hdr_len..];
            let offset = hdr.offset as usize;
            if offset + data.len() > state.buffer.len() {
                sink_warn!(
                    self.logger,
                    "fragment at {}+{} overflows buffer of {} bytes",
                    offset,
                    data.len(),
                    state.buffer.len()
                );
                unit.corrupted = true;
                continue;
            }
            if state.fragments.insert(hdr.offset, data.len() as u32) {
                state.buffer[offset..offset + data.len()].copy_from_slice(data);
            }
            if packet.marker {
                state.marker_seen = true;
            }
        }

        match unit {
            Some(unit) => Assembly::Unit(unit),
            None => Assembly::Dropped,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::fec::FecParams;
    use crate::log::NoopLogSink;
    use crate::rtp::RtpPacket;
    use crate::video::{Codec, Fps, Interlacing, VideoDesc};
    use bytes::Bytes;
    use std::sync::atomic::Ordering;
    use std::time::Instant;

    fn desc() -> VideoDesc {
        VideoDesc::new(64, 4, Codec::Uyvy, Interlacing::Progressive, Fps::whole(30))
    }

    fn packet(
        substream: u32,
        offset: u32,
        data: &[u8],
        total: u32,
        marker: bool,
        fec: Option<FecParams>,
    ) -> RtpPacket {
        let hdr = PayloadHeader {
            substream,
            buffer_id: 1,
            offset,
            buffer_length: total,
            desc: desc(),
            fec,
        };
        let pt = if fec.is_some() { PT_VIDEO_FEC } else { PT_VIDEO };
        let mut payload = hdr.encode();
        payload.extend_from_slice(data);
        RtpPacket::new(pt, marker, 0, 9000, 1, Bytes::from(payload))
    }

    fn group(packets: Vec<RtpPacket>) -> PacketGroup {
        PacketGroup {
            timestamp: 9000,
            ext_timestamp: 9000,
            first_arrival: Instant::now(),
            packets,
        }
    }

    fn assembler(mode: VideoMode) -> (FrameAssembler, Arc<PipelineStats>) {
        let stats = Arc::new(PipelineStats::new());
        (
            FrameAssembler::new(mode, Arc::new(NoopLogSink), Arc::clone(&stats)),
            stats,
        )
    }

    #[test]
    fn two_fragments_complete_a_frame() {
        let (mut asm, _) = assembler(VideoMode::Normal);
        let got = asm.assemble(group(vec![
            packet(0, 0, &[1; 10], 20, false, None),
            packet(0, 10, &[2; 10], 20, true, None),
        ]));
        match got {
            Assembly::Unit(unit) => {
                assert!(unit.is_complete());
                let sub = unit.substreams[0].as_ref().unwrap();
                assert_eq!(&sub.buffer[..10], &[1; 10]);
                assert_eq!(&sub.buffer[10..], &[2; 10]);
            }
            other => panic!("expected Unit, got {other:?}"),
        }
    }

    #[test]
    fn missing_fragment_leaves_unit_incomplete() {
        let (mut asm, _) = assembler(VideoMode::Normal);
        let got = asm.assemble(group(vec![packet(0, 10, &[2; 10], 20, true, None)]));
        match got {
            Assembly::Unit(unit) => assert!(!unit.is_complete()),
            other => panic!("expected Unit, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_marker_retransmits_are_idempotent() {
        let (mut asm, _) = assembler(VideoMode::Normal);
        let last = packet(0, 10, &[2; 10], 20, true, None);
        let got = asm.assemble(group(vec![
            packet(0, 0, &[1; 10], 20, false, None),
            last.clone(),
            last.clone(),
            last,
        ]));
        match got {
            Assembly::Unit(unit) => {
                let sub = unit.substreams[0].as_ref().unwrap();
                assert!(unit.is_complete());
                assert_eq!(sub.received_bytes(), 20);
            }
            other => panic!("expected Unit, got {other:?}"),
        }
    }

    #[test]
    fn substream_one_infers_stereo() {
        let (mut asm, _) = assembler(VideoMode::Normal);
        let got = asm.assemble(group(vec![packet(1, 0, &[0; 4], 4, true, None)]));
        assert!(matches!(got, Assembly::ModeChange(VideoMode::Stereo)));
        assert_eq!(asm.mode(), VideoMode::Stereo);
    }

    #[test]
    fn substream_three_infers_tiled_4k() {
        let (mut asm, _) = assembler(VideoMode::Normal);
        let got = asm.assemble(group(vec![packet(3, 0, &[0; 4], 4, true, None)]));
        assert!(matches!(got, Assembly::ModeChange(VideoMode::Tiled4K)));
    }

    #[test]
    fn unknown_out_of_range_substream_drops_packet() {
        let (mut asm, stats) = assembler(VideoMode::Normal);
        let got = asm.assemble(group(vec![packet(7, 0, &[0; 4], 4, true, None)]));
        assert!(matches!(got, Assembly::Dropped));
        assert_eq!(asm.mode(), VideoMode::Normal);
        assert_eq!(stats.wire_errors.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn diverging_fec_params_drop_frame() {
        let (mut asm, _) = assembler(VideoMode::Normal);
        let got = asm.assemble(group(vec![
            packet(0, 0, &[1; 10], 20, false, Some(FecParams::new(4, 2, 2, 1))),
            packet(0, 10, &[2; 10], 20, true, Some(FecParams::new(4, 2, 2, 99))),
        ]));
        assert!(matches!(got, Assembly::Dropped));
    }

    #[test]
    fn changed_buffer_length_marks_corruption() {
        let (mut asm, _) = assembler(VideoMode::Normal);
        let got = asm.assemble(group(vec![
            packet(0, 0, &[1; 10], 20, false, None),
            packet(0, 10, &[2; 10], 24, true, None),
        ]));
        match got {
            Assembly::Unit(unit) => assert!(unit.corrupted),
            other => panic!("expected Unit, got {other:?}"),
        }
    }

    #[test]
    fn stereo_needs_both_substreams() {
        let (mut asm, _) = assembler(VideoMode::Stereo);
        let got = asm.assemble(group(vec![
            packet(0, 0, &[1; 8], 8, true, None),
            packet(1, 0, &[2; 8], 8, true, None),
        ]));
        match got {
            Assembly::Unit(unit) => {
                assert!(unit.is_complete());
                assert_eq!(unit.substreams.len(), 2);
            }
            other => panic!("expected Unit, got {other:?}"),
        }
    }
}
