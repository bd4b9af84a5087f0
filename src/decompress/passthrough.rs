//! Decompressor for displays that take a compressed codec natively.

use super::{DecompressError, Decompressor};
use crate::display::DisplayShifts;
use crate::video::{Codec, VideoDesc};

/// Hands compressed bytes through untouched.
///
/// Valid only for `from == to` conversions of opaque codecs, where the sink
/// decodes the bitstream itself.
#[derive(Debug, Default)]
pub struct PassthroughDecompressor {
    out_len: Option<usize>,
}

impl PassthroughDecompressor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decompressor for PassthroughDecompressor {
    fn reconfigure(
        &mut self,
        desc: VideoDesc,
        _shifts: DisplayShifts,
        _pitch: usize,
        out_codec: Codec,
    ) -> Result<usize, DecompressError> {
        if desc.codec.canonical() != out_codec.canonical() {
            return Err(DecompressError::UnsupportedConversion {
                from: desc.codec.to_string(),
                to: out_codec.to_string(),
            });
        }
        let len = out_codec.linesize(desc.width as usize) * desc.height as usize;
        self.out_len = Some(len);
        Ok(len)
    }

    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        _frame_seq: u32,
    ) -> Result<(), DecompressError> {
        let out_len = self.out_len.ok_or(DecompressError::NotConfigured)?;
        if output.len() < input.len().min(out_len) {
            return Err(DecompressError::OutputTooSmall {
                need: input.len().min(out_len),
                got: output.len(),
            });
        }
        let n = input.len().min(output.len());
        output[..n].copy_from_slice(&input[..n]);
        Ok(())
    }

    fn accepts_corrupted_frame(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::video::{Fps, Interlacing};

    fn desc(codec: Codec) -> VideoDesc {
        VideoDesc::new(8, 2, codec, Interlacing::Progressive, Fps::whole(30))
    }

    #[test]
    fn copies_bytes_for_matching_codec() {
        let mut dec = PassthroughDecompressor::new();
        let len = dec
            .reconfigure(desc(Codec::Dxt1), DisplayShifts::default(), 0, Codec::Dxt1)
            .unwrap();
        assert_eq!(len, 8); // 8x2 at 0.5 bpp
        let input = [7u8; 8];
        let mut out = [0u8; 8];
        dec.decompress(&input, &mut out, 1).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn refuses_cross_codec_conversion() {
        let mut dec = PassthroughDecompressor::new();
        assert!(matches!(
            dec.reconfigure(desc(Codec::Dxt1), DisplayShifts::default(), 0, Codec::Uyvy),
            Err(DecompressError::UnsupportedConversion { .. })
        ));
    }

    #[test]
    fn decode_before_reconfigure_fails() {
        let mut dec = PassthroughDecompressor::new();
        let mut out = [0u8; 4];
        assert_eq!(
            dec.decompress(&[1, 2], &mut out, 0),
            Err(DecompressError::NotConfigured)
        );
    }
}
