use crate::playout::FrameUnit;
use crate::video::VideoDesc;

/// One substream's bytes on their way to the decode stage.
#[derive(Debug)]
pub struct TileBuffer {
    pub data: Vec<u8>,
    /// Rolling buffer id, forwarded to inter-frame decoders.
    pub buffer_id: u32,
    /// Received `(offset, len)` ranges; the line path copies exactly these.
    pub spans: Vec<(u32, u32)>,
}

/// Input of the reassembly task.
#[derive(Debug)]
pub enum ReassemblyJob {
    Unit(Box<FrameUnit>),
    Poison,
}

/// Input of the decompress task. Poison is forwarded by the reassembly task
/// so the decompress task drains in order before exiting.
#[derive(Debug)]
pub enum DecompressJob {
    Frame {
        /// Indexed by substream; `None` when nothing of that tile arrived.
        tiles: Vec<Option<TileBuffer>>,
        desc: VideoDesc,
    },
    Poison,
}
