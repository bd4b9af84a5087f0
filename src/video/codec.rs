//! Pixel format identifiers and per-format geometry helpers.

/// Pixel formats the engine can carry on the wire.
///
/// `Vuy2` and `Dvs8` are vendor aliases for `Uyvy` and are folded into it
/// before any decoder lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    Uyvy,
    Yuyv,
    Vuy2,
    Dvs8,
    Rgba,
    Rgb,
    V210,
    R10k,
    Dxt1,
    Dxt1Yuv,
    Dxt5,
    Jpeg,
    H264,
}

impl Codec {
    pub fn from_fourcc(fcc: u32) -> Option<Self> {
        match &fcc.to_be_bytes() {
            b"UYVY" => Some(Codec::Uyvy),
            b"YUY2" => Some(Codec::Yuyv),
            b"2vuy" => Some(Codec::Vuy2),
            b"DVS8" => Some(Codec::Dvs8),
            b"RGBA" => Some(Codec::Rgba),
            b"RGB2" => Some(Codec::Rgb),
            b"v210" => Some(Codec::V210),
            b"R10k" => Some(Codec::R10k),
            b"DXT1" => Some(Codec::Dxt1),
            b"DXTY" => Some(Codec::Dxt1Yuv),
            b"DXT5" => Some(Codec::Dxt5),
            b"JPEG" => Some(Codec::Jpeg),
            b"H264" => Some(Codec::H264),
            _ => None,
        }
    }

    pub fn fourcc(self) -> u32 {
        let bytes: &[u8; 4] = match self {
            Codec::Uyvy => b"UYVY",
            Codec::Yuyv => b"YUY2",
            Codec::Vuy2 => b"2vuy",
            Codec::Dvs8 => b"DVS8",
            Codec::Rgba => b"RGBA",
            Codec::Rgb => b"RGB2",
            Codec::V210 => b"v210",
            Codec::R10k => b"R10k",
            Codec::Dxt1 => b"DXT1",
            Codec::Dxt1Yuv => b"DXTY",
            Codec::Dxt5 => b"DXT5",
            Codec::Jpeg => b"JPEG",
            Codec::H264 => b"H264",
        };
        u32::from_be_bytes(*bytes)
    }

    /// Fold vendor aliases into the canonical format.
    pub fn canonical(self) -> Self {
        match self {
            Codec::Vuy2 | Codec::Dvs8 => Codec::Uyvy,
            other => other,
        }
    }

    /// Bytes per pixel of the uncompressed representation.
    ///
    /// Fractional for sub-byte-per-component formats; compressed formats
    /// report their average block density.
    pub fn bpp(self) -> f64 {
        match self {
            Codec::Uyvy | Codec::Yuyv | Codec::Vuy2 | Codec::Dvs8 => 2.0,
            Codec::Rgba => 4.0,
            Codec::Rgb => 3.0,
            Codec::V210 => 8.0 / 3.0,
            Codec::R10k => 4.0,
            Codec::Dxt1 | Codec::Dxt1Yuv => 0.5,
            Codec::Dxt5 => 1.0,
            Codec::Jpeg | Codec::H264 => 1.0,
        }
    }

    /// Length in bytes of one line of `width` pixels.
    pub fn linesize(self, width: usize) -> usize {
        match self {
            // v210 packs 6 pixels into 16 bytes, padded to 48-pixel groups
            Codec::V210 => width.div_ceil(48) * 128,
            other => (width as f64 * other.bpp()).ceil() as usize,
        }
    }

    /// Compressed formats whose bytes are meaningless to a line copier.
    pub fn is_opaque(self) -> bool {
        matches!(
            self,
            Codec::Dxt1 | Codec::Dxt1Yuv | Codec::Dxt5 | Codec::Jpeg | Codec::H264
        )
    }

    /// Codecs with inter-frame prediction; a skipped frame damages successors.
    pub fn is_interframe(self) -> bool {
        matches!(self, Codec::H264)
    }

    pub fn name(self) -> &'static str {
        match self {
            Codec::Uyvy => "UYVY",
            Codec::Yuyv => "YUYV",
            Codec::Vuy2 => "2vuy",
            Codec::Dvs8 => "DVS8",
            Codec::Rgba => "RGBA",
            Codec::Rgb => "RGB",
            Codec::V210 => "v210",
            Codec::R10k => "R10k",
            Codec::Dxt1 => "DXT1",
            Codec::Dxt1Yuv => "DXT1-YUV",
            Codec::Dxt5 => "DXT5",
            Codec::Jpeg => "JPEG",
            Codec::H264 => "H.264",
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::Codec;

    #[test]
    fn fourcc_roundtrip() {
        for codec in [
            Codec::Uyvy,
            Codec::Rgba,
            Codec::Rgb,
            Codec::V210,
            Codec::Dxt1,
            Codec::Dxt5,
            Codec::Jpeg,
            Codec::H264,
        ] {
            assert_eq!(Codec::from_fourcc(codec.fourcc()), Some(codec));
        }
    }

    #[test]
    fn unknown_fourcc_is_none() {
        assert_eq!(Codec::from_fourcc(u32::from_be_bytes(*b"ZZZZ")), None);
    }

    #[test]
    fn aliases_fold_to_uyvy() {
        assert_eq!(Codec::Vuy2.canonical(), Codec::Uyvy);
        assert_eq!(Codec::Dvs8.canonical(), Codec::Uyvy);
        assert_eq!(Codec::Rgba.canonical(), Codec::Rgba);
    }

    #[test]
    fn v210_linesize_is_block_padded() {
        // 1280 = 26.67 blocks of 48 -> 27 blocks of 128 B
        assert_eq!(Codec::V210.linesize(1280), 27 * 128);
        assert_eq!(Codec::Uyvy.linesize(1280), 2560);
    }
}
