//! Runtime tunables for the receive and transmit pipelines.

use std::collections::HashMap;
use std::fs;

use crate::video::VideoMode;

/// Whether outgoing video is wrapped in FEC, and with which geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FecMode {
    Off,
    Ldgm { k: u16, m: u16, c: u8 },
}

/// One record of every policy knob the pipeline consults.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Initial playout delay for intra-only codecs, in milliseconds.
    pub playout_delay_intra_ms: u64,
    /// Playout delay for inter-frame codecs, as a multiple of the frame period.
    pub playout_delay_inter_multiplier: f64,
    pub fec_mode: FecMode,
    pub mtu: usize,
    /// Ceiling for the dynamically grown socket receive buffer, in bytes.
    pub rmem_target: usize,
    /// Maximum frame units the playout buffer holds before pruning.
    pub backlog_max_units: usize,
    pub max_frame_age_ms: u64,
    /// Extra copies of the final fragment of each frame.
    pub marker_retransmit_count: u32,
    /// Video mode to start receiving in. Stereo and tiled-4K senders are
    /// inferred from the wire; dual-link cannot be and must be requested.
    pub requested_mode: VideoMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            playout_delay_intra_ms: 40,
            playout_delay_inter_multiplier: 2.2,
            fec_mode: FecMode::Off,
            mtu: 1500,
            rmem_target: 4 * 1024 * 1024,
            backlog_max_units: 32,
            max_frame_age_ms: 500,
            marker_retransmit_count: 5,
            requested_mode: VideoMode::Normal,
        }
    }
}

impl PipelineConfig {
    /// Load overrides from a `key = value` file; unknown keys are ignored,
    /// unparsable values keep their default.
    pub fn load(path: &str) -> Result<Self, String> {
        let content =
            fs::read_to_string(path).map_err(|e| format!("Error reading file {path}: {e}"))?;
        let mut values = HashMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(pos) = line.find('=') {
                let key = line[..pos].trim().to_string();
                let value = line[pos + 1..].trim().trim_matches('"').to_string();
                values.insert(key, value);
            }
        }
        Ok(Self::from_values(&values))
    }

    fn from_values(values: &HashMap<String, String>) -> Self {
        let mut cfg = Self::default();

        if let Some(v) = values.get("playout_delay_intra_ms").and_then(|v| v.parse().ok()) {
            cfg.playout_delay_intra_ms = v;
        }
        if let Some(v) = values
            .get("playout_delay_inter_multiplier")
            .and_then(|v| v.parse().ok())
        {
            cfg.playout_delay_inter_multiplier = v;
        }
        if let Some(v) = values.get("mtu").and_then(|v| v.parse().ok()) {
            cfg.mtu = v;
        }
        if let Some(v) = values.get("rmem_target").and_then(|v| v.parse().ok()) {
            cfg.rmem_target = v;
        }
        if let Some(v) = values.get("backlog_max_units").and_then(|v| v.parse().ok()) {
            cfg.backlog_max_units = v;
        }
        if let Some(v) = values.get("max_frame_age_ms").and_then(|v| v.parse().ok()) {
            cfg.max_frame_age_ms = v;
        }
        if let Some(v) = values
            .get("marker_retransmit_count")
            .and_then(|v| v.parse().ok())
        {
            cfg.marker_retransmit_count = v;
        }
        if let Some(mode) = values.get("video_mode").and_then(|v| VideoMode::from_name(v)) {
            cfg.requested_mode = mode;
        }
        match values.get("fec_mode").map(String::as_str) {
            Some("off") | None => {}
            Some(spec) => {
                // "ldgm:k:m:c"
                let mut parts = spec.split(':');
                if parts.next() == Some("ldgm") {
                    let k = parts.next().and_then(|v| v.parse().ok());
                    let m = parts.next().and_then(|v| v.parse().ok());
                    let c = parts.next().and_then(|v| v.parse().ok());
                    if let (Some(k), Some(m), Some(c)) = (k, m, c) {
                        cfg.fec_mode = FecMode::Ldgm { k, m, c };
                    }
                }
            }
        }
        cfg
    }
}
