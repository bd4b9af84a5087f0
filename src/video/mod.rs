pub mod codec;
pub mod desc;
pub mod frame;
pub mod interlacing;
pub mod mode;

pub use codec::Codec;
pub use desc::{Fps, VideoDesc};
pub use frame::{Tile, VideoFrame};
pub use interlacing::{ChangeIlFn, Interlacing};
pub use mode::VideoMode;
