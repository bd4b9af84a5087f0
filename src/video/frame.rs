use crate::video::desc::VideoDesc;

/// One destination surface of a framebuffer.
#[derive(Debug, Clone)]
pub struct Tile {
    pub width: u32,
    pub height: u32,
    /// Row stride in bytes; at least `codec.linesize(width)`, possibly larger
    /// when the display allocates wider surfaces.
    pub linesize: usize,
    pub data: Vec<u8>,
}

impl Tile {
    pub fn new(width: u32, height: u32, linesize: usize) -> Self {
        Self {
            width,
            height,
            linesize,
            data: vec![0; linesize * height as usize],
        }
    }
}

/// A framebuffer checked out of a display: the descriptor it was allocated
/// for plus one tile per surface (one for merged layouts, one per substream
/// for separate layouts).
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub desc: VideoDesc,
    pub tiles: Vec<Tile>,
}

impl VideoFrame {
    pub fn new(desc: VideoDesc, tiles: Vec<Tile>) -> Self {
        Self { desc, tiles }
    }

    pub fn tile(&self, index: usize) -> Option<&Tile> {
        self.tiles.get(index)
    }

    pub fn tile_mut(&mut self, index: usize) -> Option<&mut Tile> {
        self.tiles.get_mut(index)
    }
}
