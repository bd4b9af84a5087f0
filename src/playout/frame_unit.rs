use std::time::Instant;

use super::fragment_map::FragmentMap;
use crate::fec::FecParams;
use crate::video::VideoDesc;

/// Reassembly state of one substream within a frame.
#[derive(Debug)]
pub struct SubstreamState {
    pub expected_bytes: u32,
    pub buffer_id: u32,
    pub fragments: FragmentMap,
    /// Contiguous assembly buffer, `expected_bytes` long.
    pub buffer: Vec<u8>,
    pub marker_seen: bool,
}

impl SubstreamState {
    pub fn new(expected_bytes: u32, buffer_id: u32) -> Self {
        Self {
            expected_bytes,
            buffer_id,
            fragments: FragmentMap::new(),
            buffer: vec![0; expected_bytes as usize],
            marker_seen: false,
        }
    }

    pub fn received_bytes(&self) -> u64 {
        self.fragments.covered_bytes()
    }

    pub fn is_complete(&self) -> bool {
        self.marker_seen && self.received_bytes() == u64::from(self.expected_bytes)
    }
}

/// All packets of one `(ssrc, timestamp)` assembled into per-substream
/// buffers. Born on the first packet of a new timestamp, sealed when complete
/// or when the playout deadline fires, freed after decode.
#[derive(Debug)]
pub struct FrameUnit {
    pub timestamp: u32,
    pub ext_timestamp: u64,
    pub first_arrival: Instant,
    pub desc: VideoDesc,
    pub fec: Option<FecParams>,
    /// Indexed by substream id; length equals the mode's substream count.
    pub substreams: Vec<Option<SubstreamState>>,
    /// Expected-byte disagreement or fragment overflow was seen.
    pub corrupted: bool,
}

impl FrameUnit {
    /// Complete when every expected substream is fully covered and carries a
    /// marker packet.
    pub fn is_complete(&self) -> bool {
        !self.substreams.is_empty()
            && self
                .substreams
                .iter()
                .all(|s| s.as_ref().is_some_and(|s| s.is_complete()))
    }

    /// Sum of expected bytes across substreams, for frame-size statistics.
    pub fn frame_size(&self) -> u64 {
        self.substreams
            .iter()
            .flatten()
            .map(|s| u64::from(s.expected_bytes))
            .sum()
    }
}
