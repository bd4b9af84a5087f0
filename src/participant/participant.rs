//! One remote sender: its packet ring, playout buffer and decode pipeline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::PipelineConfig;
use crate::decoder::{SubmitOutcome, VideoPipeline};
use crate::decompress::DecompressRegistry;
use crate::display::Display;
use crate::log::LogSink;
use crate::playout::{
    playout_delay_for, Assembly, FrameAssembler, FrameUnit, InsertOutcome, PacketRing,
    PlayoutBuffer,
};
use crate::rtp::RtpPacket;
use crate::stats::PipelineStats;
use crate::{sink_debug, sink_warn};

/// A participant is created on the first packet from an unseen SSRC and owns
/// the complete receive path for that source.
pub struct Participant {
    ssrc: u32,
    ring: PacketRing,
    assembler: FrameAssembler,
    playout: PlayoutBuffer,
    pipeline: VideoPipeline,
    /// Unit handed back by a full reassembly slot, retried next tick.
    pending: Option<FrameUnit>,
    last_activity: Instant,
    config: PipelineConfig,
    stats: Arc<PipelineStats>,
    logger: Arc<dyn LogSink>,
}

impl Participant {
    pub fn new(
        ssrc: u32,
        display: Arc<dyn Display>,
        decompressors: Arc<DecompressRegistry>,
        config: PipelineConfig,
        logger: Arc<dyn LogSink>,
        now: Instant,
    ) -> Self {
        let stats = Arc::new(PipelineStats::new());
        let delay = Duration::from_millis(config.playout_delay_intra_ms);
        let mode = config.requested_mode;
        Self {
            ssrc,
            ring: PacketRing::new(delay),
            assembler: FrameAssembler::new(mode, Arc::clone(&logger), Arc::clone(&stats)),
            playout: PlayoutBuffer::new(delay, &config),
            pipeline: VideoPipeline::new(
                display,
                decompressors,
                mode,
                Arc::clone(&logger),
                Arc::clone(&stats),
            ),
            pending: None,
            last_activity: now,
            config,
            stats,
            logger,
        }
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    /// Fatal pipeline error; the registry tears this participant down.
    pub fn is_dead(&self) -> bool {
        self.pipeline.is_dead()
    }

    /// Store one packet. Never blocks on downstream state.
    pub fn handle_packet(&mut self, packet: RtpPacket, now: Instant) {
        self.last_activity = now;
        match self.ring.insert(packet, now) {
            InsertOutcome::Stored | InsertOutcome::Duplicate => {}
            InsertOutcome::TooOld => {
                sink_debug!(self.logger, "packet outside playout window discarded");
            }
        }
    }

    /// Advance the receive pipeline: apply delay revisions, assemble released
    /// packet groups, prune the backlog, and feed the decode stage without
    /// blocking.
    pub fn drive(&mut self, now: Instant) {
        if let Some(change) = self.pipeline.poll_fps_change() {
            let delay = playout_delay_for(change.fps, change.interframe, &self.config);
            self.ring.set_playout_delay(delay);
            self.playout.set_playout_delay(delay);
        }

        for group in self.ring.take_ready(now) {
            match self.assembler.assemble(group) {
                Assembly::Unit(unit) => {
                    self.stats.observe_frame_size(unit.frame_size());
                    if !self.playout.insert(unit) {
                        self.stats.bump_dropped();
                    }
                }
                Assembly::ModeChange(mode) => {
                    self.pipeline.set_video_mode(mode);
                    self.stats.bump_dropped();
                }
                Assembly::Dropped => self.stats.bump_dropped(),
            }
        }

        let pruned = self.playout.prune(now);
        for _ in 0..pruned {
            self.stats.bump_dropped();
        }

        loop {
            let unit = match self.pending.take() {
                Some(unit) => unit,
                None => match self.playout.try_pop(now) {
                    Some(unit) => unit,
                    None => break,
                },
            };
            match self.pipeline.try_submit(unit) {
                SubmitOutcome::Accepted => {}
                SubmitOutcome::Busy(unit) => {
                    self.pending = Some(unit);
                    break;
                }
                SubmitOutcome::Dead(_) => {
                    sink_warn!(self.logger, "decode pipeline is gone, frame dropped");
                    self.stats.bump_dropped();
                    break;
                }
            }
        }
    }

    /// Frames buffered upstream of the decode stage.
    pub fn backlog(&self) -> usize {
        self.playout.len() + usize::from(self.pending.is_some())
    }

    /// Poison and join the pipeline workers.
    pub fn shutdown(&mut self) {
        self.pipeline.shutdown();
    }
}
