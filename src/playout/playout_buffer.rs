//! Playout-delay gating and ordered admission of frame units.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use super::frame_unit::FrameUnit;
use crate::config::PipelineConfig;
use crate::video::Fps;

/// Initial and revised playout delay for a stream.
///
/// Intra-only codecs get a fixed delay; inter-frame codecs scale with the
/// frame period so that reference frames have time to arrive.
pub fn playout_delay_for(fps: Fps, interframe: bool, config: &PipelineConfig) -> Duration {
    if interframe {
        fps.frame_period()
            .mul_f64(config.playout_delay_inter_multiplier)
    } else {
        Duration::from_millis(config.playout_delay_intra_ms)
    }
}

/// Holds assembled frame units keyed by extended timestamp and admits them to
/// the pipeline at their release time, in strictly increasing timestamp order.
#[derive(Debug)]
pub struct PlayoutBuffer {
    units: BTreeMap<u64, FrameUnit>,
    playout_delay: Duration,
    max_age: Duration,
    backlog_max: usize,
    last_emitted: Option<u64>,
}

impl PlayoutBuffer {
    pub fn new(playout_delay: Duration, config: &PipelineConfig) -> Self {
        Self {
            units: BTreeMap::new(),
            playout_delay,
            max_age: Duration::from_millis(config.max_frame_age_ms),
            backlog_max: config.backlog_max_units,
            last_emitted: None,
        }
    }

    pub fn playout_delay(&self) -> Duration {
        self.playout_delay
    }

    pub fn set_playout_delay(&mut self, delay: Duration) {
        self.playout_delay = delay;
    }

    /// False (and the unit is discarded) when the unit would violate the
    /// ordering guarantee, i.e. a frame with this timestamp was already
    /// emitted.
    pub fn insert(&mut self, unit: FrameUnit) -> bool {
        if matches!(self.last_emitted, Some(last) if unit.ext_timestamp <= last) {
            return false;
        }
        self.units.insert(unit.ext_timestamp, unit);
        true
    }

    /// Earliest unit whose release time has passed. Units always hold at
    /// least one packet, so a deadline-expired incomplete unit is released
    /// too; completeness is the next stage's concern.
    pub fn try_pop(&mut self, now: Instant) -> Option<FrameUnit> {
        let (&ts, unit) = self.units.iter().next()?;
        if now.duration_since(unit.first_arrival) < self.playout_delay {
            return None;
        }
        self.last_emitted = Some(ts);
        self.units.remove(&ts)
    }

    /// Drop units older than the maximum age, and oldest-first down to the
    /// configured backlog depth. Returns how many were discarded.
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.units.len();
        self.units
            .retain(|_, unit| now.duration_since(unit.first_arrival) <= self.max_age);
        while self.units.len() > self.backlog_max {
            if let Some((&ts, _)) = self.units.iter().next() {
                self.units.remove(&ts);
                self.last_emitted = Some(self.last_emitted.map_or(ts, |l| l.max(ts)));
            }
        }
        before - self.units.len()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::video::{Codec, Interlacing, VideoDesc};

    fn unit(ext_ts: u64, arrival: Instant) -> FrameUnit {
        FrameUnit {
            timestamp: ext_ts as u32,
            ext_timestamp: ext_ts,
            first_arrival: arrival,
            desc: VideoDesc::new(8, 8, Codec::Uyvy, Interlacing::Progressive, Fps::whole(30)),
            fec: None,
            substreams: vec![None],
            corrupted: false,
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    #[test]
    fn releases_in_timestamp_order_after_delay() {
        let delay = Duration::from_millis(40);
        let mut buf = PlayoutBuffer::new(delay, &config());
        let t0 = Instant::now();
        buf.insert(unit(2000, t0));
        buf.insert(unit(1000, t0));
        assert!(buf.try_pop(t0).is_none());
        let first = buf.try_pop(t0 + delay).unwrap();
        let second = buf.try_pop(t0 + delay).unwrap();
        assert!(first.ext_timestamp < second.ext_timestamp);
    }

    #[test]
    fn rejects_units_behind_the_emission_point() {
        let delay = Duration::from_millis(0);
        let mut buf = PlayoutBuffer::new(delay, &config());
        let t0 = Instant::now();
        buf.insert(unit(2000, t0));
        assert!(buf.try_pop(t0).is_some());
        assert!(!buf.insert(unit(1000, t0)));
        assert!(buf.insert(unit(3000, t0)));
    }

    #[test]
    fn prune_drops_aged_units() {
        let mut cfg = config();
        cfg.max_frame_age_ms = 100;
        let mut buf = PlayoutBuffer::new(Duration::from_millis(40), &cfg);
        let t0 = Instant::now();
        buf.insert(unit(1000, t0));
        buf.insert(unit(2000, t0 + Duration::from_millis(150)));
        assert_eq!(buf.prune(t0 + Duration::from_millis(120)), 1);
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn prune_enforces_backlog_depth() {
        let mut cfg = config();
        cfg.backlog_max_units = 2;
        let mut buf = PlayoutBuffer::new(Duration::from_millis(40), &cfg);
        let t0 = Instant::now();
        for ts in [1000u64, 2000, 3000, 4000] {
            buf.insert(unit(ts, t0));
        }
        assert_eq!(buf.prune(t0), 2);
        assert_eq!(buf.len(), 2);
        // the survivors are the newest, and older inserts are now refused
        assert!(!buf.insert(unit(1500, t0)));
    }

    #[test]
    fn delay_policy_scales_for_interframe_codecs() {
        let cfg = config();
        let intra = playout_delay_for(Fps::whole(30), false, &cfg);
        assert_eq!(intra, Duration::from_millis(40));
        let inter = playout_delay_for(Fps::whole(30), true, &cfg);
        // 2.2 x 33.3 ms
        assert!(inter > Duration::from_millis(70) && inter < Duration::from_millis(77));
    }
}
