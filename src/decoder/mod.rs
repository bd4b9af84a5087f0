//! The per-participant decode pipeline: reassembly, FEC recovery, line and
//! block decoding, and the display handoff.

pub mod decode_error;
pub mod decompress_worker;
pub mod line_decoder;
pub mod messages;
pub mod pipeline;
pub mod reassembly_worker;
pub mod state;

pub use decode_error::DecodeError;
pub use line_decoder::{LineDecoder, LINE_TRANSFORMS};
pub use messages::{DecompressJob, ReassemblyJob, TileBuffer};
pub use pipeline::{FpsChange, SubmitOutcome, VideoPipeline};
pub use state::{DecodePath, DecoderState};
