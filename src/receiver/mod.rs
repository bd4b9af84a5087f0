//! Shared ingest task: one socket loop feeding every participant's ring.

pub mod video_receiver;

pub use video_receiver::VideoReceiver;
