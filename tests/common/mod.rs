#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use tilecast::config::PipelineConfig;
use tilecast::decompress::DecompressRegistry;
use tilecast::display::{BufferDisplay, Display, TileLayout};
use tilecast::log::NoopLogSink;
use tilecast::participant::Participant;
use tilecast::rtp::RtpPacket;
use tilecast::transmit::Fragmenter;
use tilecast::video::{Codec, Fps, Interlacing, VideoDesc};

pub const SSRC: u32 = 0x1234_5678;

pub fn desc(width: u32, height: u32, codec: Codec) -> VideoDesc {
    VideoDesc::new(width, height, codec, Interlacing::Progressive, Fps::whole(30))
}

/// Deterministic payload for frame `index`, tagged with the index in the
/// first four bytes so displays can verify ordering.
pub fn frame_payload(index: u32, len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    data[..4].copy_from_slice(&index.to_be_bytes());
    for (i, byte) in data.iter_mut().enumerate().skip(4) {
        *byte = (i as u32).wrapping_mul(31).wrapping_add(index) as u8;
    }
    data
}

/// Everything a receive-side scenario needs, driven on a synthetic clock.
pub struct Scenario {
    pub display: Arc<BufferDisplay>,
    pub participant: Participant,
    pub fragmenter: Fragmenter,
    pub t0: Instant,
}

impl Scenario {
    pub fn new(native: Vec<Codec>, layout: TileLayout) -> Self {
        Self::with_setup(native, layout, PipelineConfig::default(), DecompressRegistry::with_builtins())
    }

    pub fn with_setup(
        native: Vec<Codec>,
        layout: TileLayout,
        config: PipelineConfig,
        registry: DecompressRegistry,
    ) -> Self {
        let display = Arc::new(BufferDisplay::new(native, layout));
        let participant = Participant::new(
            SSRC,
            Arc::clone(&display) as Arc<dyn Display>,
            Arc::new(registry),
            config.clone(),
            Arc::new(NoopLogSink),
            Instant::now(),
        );
        Self {
            display,
            participant,
            fragmenter: Fragmenter::new(&config),
            t0: Instant::now(),
        }
    }

    /// Packets of one frame, `index` frames into the stream.
    pub fn frame_packets(&mut self, desc: VideoDesc, substreams: &[Vec<u8>], index: u32) -> Vec<RtpPacket> {
        self.fragmenter
            .fragment_frame(desc, substreams, index.wrapping_mul(3000), SSRC)
            .unwrap()
    }

    /// Feed packets as arriving `index` frame periods after the start.
    pub fn feed(&mut self, packets: Vec<RtpPacket>, index: u32) -> Instant {
        let arrival = self.t0 + Duration::from_millis(u64::from(index) * 33);
        for packet in packets {
            self.participant.handle_packet(packet, arrival);
        }
        arrival
    }

    /// Drive the pipeline at `now` until `done` holds or a wall-clock
    /// deadline expires. Returns whether the condition was met.
    pub fn pump_until(&mut self, now: Instant, done: impl Fn(&Self) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            self.participant.drive(now);
            if done(self) {
                return true;
            }
            if Instant::now() > deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// Send one whole frame and wait for the pipeline to finish with it
    /// (displayed or dropped).
    pub fn run_frame(&mut self, desc: VideoDesc, substreams: &[Vec<u8>], index: u32) -> bool {
        let packets = self.frame_packets(desc, substreams, index);
        self.run_frame_filtered(desc, packets, index, |_, _| true)
    }

    /// Same, with a packet filter deciding which packets survive the wire.
    pub fn run_frame_filtered(
        &mut self,
        _desc: VideoDesc,
        packets: Vec<RtpPacket>,
        index: u32,
        keep: impl FnMut(usize, &RtpPacket) -> bool,
    ) -> bool {
        let mut keep = keep;
        let surviving: Vec<RtpPacket> = packets
            .into_iter()
            .enumerate()
            .filter_map(|(i, p)| if keep(i, &p) { Some(p) } else { None })
            .collect();
        if surviving.is_empty() {
            return true;
        }
        let arrival = self.feed(surviving, index);
        let release = arrival + Duration::from_millis(45);
        let settled_at = self.settled_count() + 1;
        self.pump_until(release, |s| s.settled_count() >= settled_at)
    }

    /// Frames the pipeline has fully resolved, one way or the other.
    pub fn settled_count(&self) -> u64 {
        let stats = self.participant.stats();
        stats.displayed.load(std::sync::atomic::Ordering::Relaxed)
            + stats.dropped.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn displayed(&self) -> u64 {
        self.participant
            .stats()
            .displayed
            .load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.participant
            .stats()
            .dropped
            .load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn corrupted(&self) -> u64 {
        self.participant
            .stats()
            .corrupted
            .load(std::sync::atomic::Ordering::Relaxed)
    }
}
