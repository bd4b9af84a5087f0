//! Per-source ordered packet store, the first stage of the receive pipeline.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use super::wrap_ext::{SeqUnwrapper, TsUnwrapper};
use crate::rtp::RtpPacket;

/// What happened to an inserted packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Stored,
    /// Same sequence number already present in the timestamp group; first wins.
    Duplicate,
    /// Packet belongs to a group older than the acceptance window or one that
    /// was already released downstream.
    TooOld,
}

/// All packets of one timestamp, released together.
#[derive(Debug)]
pub struct PacketGroup {
    pub timestamp: u32,
    pub ext_timestamp: u64,
    pub first_arrival: Instant,
    /// Ordered by extended sequence number.
    pub packets: Vec<RtpPacket>,
}

#[derive(Debug)]
struct GroupSlot {
    timestamp: u32,
    first_arrival: Instant,
    packets: BTreeMap<u32, RtpPacket>,
}

/// One ring per SSRC. Stores packets ordered by `(timestamp, sequence)` in
/// wrap-extended spaces and releases whole timestamp groups once their
/// playout deadline passes.
#[derive(Debug)]
pub struct PacketRing {
    groups: BTreeMap<u64, GroupSlot>,
    ts_ext: TsUnwrapper,
    seq_ext: SeqUnwrapper,
    playout_delay: Duration,
    reject_window: Duration,
    released_up_to: Option<u64>,
}

impl PacketRing {
    pub fn new(playout_delay: Duration) -> Self {
        Self {
            groups: BTreeMap::new(),
            ts_ext: TsUnwrapper::default(),
            seq_ext: SeqUnwrapper::default(),
            playout_delay,
            reject_window: playout_delay * 2,
            released_up_to: None,
        }
    }

    /// Also widens the acceptance window to twice the new delay.
    pub fn set_playout_delay(&mut self, delay: Duration) {
        self.playout_delay = delay;
        self.reject_window = delay * 2;
    }

    pub fn playout_delay(&self) -> Duration {
        self.playout_delay
    }

    pub fn insert(&mut self, packet: RtpPacket, now: Instant) -> InsertOutcome {
        let ext_ts = self.ts_ext.extend(packet.timestamp);
        if matches!(self.released_up_to, Some(limit) if ext_ts <= limit) {
            return InsertOutcome::TooOld;
        }
        let slot = self.groups.entry(ext_ts).or_insert_with(|| GroupSlot {
            timestamp: packet.timestamp,
            first_arrival: now,
            packets: BTreeMap::new(),
        });
        if now.duration_since(slot.first_arrival) > self.reject_window {
            return InsertOutcome::TooOld;
        }
        let ext_seq = self.seq_ext.extend(packet.sequence);
        if slot.packets.contains_key(&ext_seq) {
            return InsertOutcome::Duplicate;
        }
        slot.packets.insert(ext_seq, packet);
        InsertOutcome::Stored
    }

    /// Remove and return every group whose release deadline has passed, in
    /// timestamp order. Later packets for released groups are rejected.
    pub fn take_ready(&mut self, now: Instant) -> Vec<PacketGroup> {
        let ready: Vec<u64> = self
            .groups
            .iter()
            .filter(|(_, slot)| now.duration_since(slot.first_arrival) >= self.playout_delay)
            .map(|(&ts, _)| ts)
            .collect();
        let mut out = Vec::with_capacity(ready.len());
        for ext_ts in ready {
            if let Some(slot) = self.groups.remove(&ext_ts) {
                self.released_up_to = Some(self.released_up_to.map_or(ext_ts, |l| l.max(ext_ts)));
                out.push(PacketGroup {
                    timestamp: slot.timestamp,
                    ext_timestamp: ext_ts,
                    first_arrival: slot.first_arrival,
                    packets: slot.packets.into_values().collect(),
                });
            }
        }
        out
    }

    /// Free storage for all groups before `ext_ts`.
    pub fn remove_before(&mut self, ext_ts: u64) {
        self.groups.retain(|&ts, _| ts >= ext_ts);
        if ext_ts > 0 {
            let limit = ext_ts - 1;
            self.released_up_to = Some(self.released_up_to.map_or(limit, |l| l.max(limit)));
        }
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}
