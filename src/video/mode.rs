/// How one logical frame is split into independently transported substreams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoMode {
    #[default]
    Normal,
    /// Two substreams, one per link of a dual-link source.
    DualLink,
    /// Two substreams, left and right eye.
    Stereo,
    /// Four substreams, one per 2x2 quadrant of a 4K frame.
    Tiled4K,
}

impl VideoMode {
    pub fn tiles_x(self) -> u32 {
        match self {
            VideoMode::Normal | VideoMode::DualLink => 1,
            VideoMode::Stereo | VideoMode::Tiled4K => 2,
        }
    }

    pub fn tiles_y(self) -> u32 {
        match self {
            VideoMode::Normal | VideoMode::Stereo => 1,
            VideoMode::DualLink | VideoMode::Tiled4K => 2,
        }
    }

    /// Substreams one frame is expected to arrive in.
    pub fn substream_count(self) -> u32 {
        self.tiles_x() * self.tiles_y()
    }

    /// Guess the sender's mode from an out-of-range substream index.
    ///
    /// The guess is valid because the highest substream of a frame always
    /// carries a marker packet, so it is seen early. Indexes other than 1 and
    /// 3 are unknown senders and yield `None`.
    pub fn infer_from_substream(substream: u32) -> Option<Self> {
        match substream {
            1 => Some(VideoMode::Stereo),
            3 => Some(VideoMode::Tiled4K),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "normal" => Some(VideoMode::Normal),
            "dual-link" => Some(VideoMode::DualLink),
            "3D" => Some(VideoMode::Stereo),
            "tiled-4K" => Some(VideoMode::Tiled4K),
            _ => None,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            VideoMode::Normal => "normal",
            VideoMode::DualLink => "dual-link",
            VideoMode::Stereo => "3D",
            VideoMode::Tiled4K => "tiled-4K",
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::VideoMode;

    #[test]
    fn substream_counts() {
        assert_eq!(VideoMode::Normal.substream_count(), 1);
        assert_eq!(VideoMode::DualLink.substream_count(), 2);
        assert_eq!(VideoMode::Stereo.substream_count(), 2);
        assert_eq!(VideoMode::Tiled4K.substream_count(), 4);
    }

    #[test]
    fn inference_covers_stereo_and_4k_only() {
        assert_eq!(
            VideoMode::infer_from_substream(1),
            Some(VideoMode::Stereo)
        );
        assert_eq!(
            VideoMode::infer_from_substream(3),
            Some(VideoMode::Tiled4K)
        );
        assert_eq!(VideoMode::infer_from_substream(2), None);
        assert_eq!(VideoMode::infer_from_substream(7), None);
    }
}
