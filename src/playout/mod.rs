pub mod fragment_map;
pub mod frame_assembler;
pub mod frame_unit;
pub mod packet_ring;
pub mod playout_buffer;
pub mod wrap_ext;

pub use fragment_map::FragmentMap;
pub use frame_assembler::{Assembly, FrameAssembler};
pub use frame_unit::{FrameUnit, SubstreamState};
pub use packet_ring::{InsertOutcome, PacketGroup, PacketRing};
pub use playout_buffer::{playout_delay_for, PlayoutBuffer};
