//! tilecast is a real-time video streaming engine that moves compressed and
//! uncompressed video between peers over RTP.
//!
//! The receive side demultiplexes RTP streams by SSRC, reassembles
//! application-layer frames from packets, optionally runs forward error
//! correction, decodes the result and hands finished frames to a display
//! sink. The transmit side fragments coded frames across RTP packets with a
//! custom payload header. Multiple participants, and multiple substreams per
//! participant (stereo and tiled video), are first-class.
//!
//! The crate is structured into modules along the pipeline stages.

/// Runtime tunables for the receive and transmit pipelines.
pub mod config;
/// The per-participant decode pipeline and its worker threads.
pub mod decoder;
/// Block decompressor plug-ins and their selection registry.
pub mod decompress;
/// The display sink contract and the in-memory reference sink.
pub mod display;
/// Application-layer forward error correction.
pub mod fec;
/// Logging traits, sinks and leveled macros.
pub mod log;
/// UDP transport for RTP sessions.
pub mod net;
/// Per-SSRC participant state and bookkeeping.
pub mod participant;
/// Packet ring, frame assembly and playout-delay gating.
pub mod playout;
/// The shared ingest task feeding every participant.
pub mod receiver;
/// RTP packet model and the application payload header.
pub mod rtp;
/// Per-participant pipeline counters.
pub mod stats;
/// Frame fragmentation and the outbound sender.
pub mod transmit;
/// Video descriptors, pixel formats, modes and framebuffers.
pub mod video;
