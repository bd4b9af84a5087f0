//! SSRC-keyed bookkeeping of live participants.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::participant::Participant;
use crate::config::PipelineConfig;
use crate::decompress::DecompressRegistry;
use crate::display::Display;
use crate::log::LogSink;
use crate::rtp::RtpPacket;
use crate::{sink_info, sink_warn};

/// Produces a display sink for each new participant.
pub type DisplayFactory = Box<dyn Fn(u32) -> Arc<dyn Display> + Send>;

const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(60);

/// Creates participants on first sight of an SSRC, drives them, and removes
/// them on fatal errors or inactivity. Fatally torn-down SSRCs are kept as
/// tombstones so their traffic stays ignored.
pub struct ParticipantRegistry {
    participants: HashMap<u32, Participant>,
    dead_ssrcs: HashSet<u32>,
    display_factory: DisplayFactory,
    decompressors: Arc<DecompressRegistry>,
    config: PipelineConfig,
    logger: Arc<dyn LogSink>,
}

impl ParticipantRegistry {
    pub fn new(
        display_factory: DisplayFactory,
        decompressors: Arc<DecompressRegistry>,
        config: PipelineConfig,
        logger: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            participants: HashMap::new(),
            dead_ssrcs: HashSet::new(),
            display_factory,
            decompressors,
            config,
            logger,
        }
    }

    /// Route one packet to its participant, creating it when the SSRC is new.
    pub fn dispatch(&mut self, packet: RtpPacket, now: Instant) {
        let ssrc = packet.ssrc;
        if self.dead_ssrcs.contains(&ssrc) {
            return;
        }
        let participant = self.participants.entry(ssrc).or_insert_with(|| {
            sink_info!(self.logger, "new participant ssrc={ssrc:#010x}");
            Participant::new(
                ssrc,
                (self.display_factory)(ssrc),
                Arc::clone(&self.decompressors),
                self.config.clone(),
                Arc::clone(&self.logger),
                now,
            )
        });
        participant.handle_packet(packet, now);
    }

    /// Drive every pipeline and collect the fallen: fatal participants are
    /// torn down and tombstoned, silent ones expire.
    pub fn drive_all(&mut self, now: Instant) {
        let mut remove = Vec::new();
        for (&ssrc, participant) in self.participants.iter_mut() {
            participant.drive(now);
            if participant.is_dead() {
                sink_warn!(
                    self.logger,
                    "participant ssrc={ssrc:#010x} hit a fatal error, marking dead"
                );
                remove.push((ssrc, true));
            } else if now.duration_since(participant.last_activity()) > INACTIVITY_TIMEOUT {
                sink_info!(self.logger, "participant ssrc={ssrc:#010x} timed out");
                remove.push((ssrc, false));
            }
        }
        for (ssrc, tombstone) in remove {
            if let Some(mut participant) = self.participants.remove(&ssrc) {
                participant.shutdown();
            }
            if tombstone {
                self.dead_ssrcs.insert(ssrc);
            }
        }
    }

    /// Remove one participant explicitly.
    pub fn remove(&mut self, ssrc: u32) {
        if let Some(mut participant) = self.participants.remove(&ssrc) {
            participant.shutdown();
        }
    }

    pub fn get(&self, ssrc: u32) -> Option<&Participant> {
        self.participants.get(&ssrc)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Largest frame observed across participants, for receive-buffer sizing.
    pub fn max_frame_size(&self) -> u64 {
        self.participants
            .values()
            .map(|p| p.stats().max_frame_size())
            .max()
            .unwrap_or(0)
    }

    /// Tear everything down, logging final statistics per participant.
    pub fn shutdown(&mut self) {
        for (_, mut participant) in self.participants.drain() {
            participant.shutdown();
        }
    }
}
