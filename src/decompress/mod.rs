//! Pluggable block decompressors and their selection registry.

pub mod decompress_error;
pub mod passthrough;
pub mod registry;

pub use decompress_error::DecompressError;
pub use passthrough::PassthroughDecompressor;
pub use registry::{DecompressEntry, DecompressRegistry};

use crate::display::DisplayShifts;
use crate::video::{Codec, VideoDesc};

/// One block decoder instance, bound to a single tile.
///
/// Lifecycle: constructed through the registry, `reconfigure`d whenever the
/// stream description changes, then fed one compressed tile per frame.
/// Teardown is `Drop`.
pub trait Decompressor: Send {
    /// Prepare for tiles described by `desc`, producing `out_codec` pixels
    /// packed at the given shifts with the given row pitch. Returns the
    /// number of output bytes one decoded tile occupies.
    fn reconfigure(
        &mut self,
        desc: VideoDesc,
        shifts: DisplayShifts,
        pitch: usize,
        out_codec: Codec,
    ) -> Result<usize, DecompressError>;

    /// Decode one tile. `frame_seq` is the rolling buffer id of the frame,
    /// which inter-frame decoders use to detect discontinuities.
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        frame_seq: u32,
    ) -> Result<(), DecompressError>;

    /// Whether partially received input is acceptable.
    fn accepts_corrupted_frame(&self) -> bool {
        false
    }
}
