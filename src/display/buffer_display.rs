//! In-memory display sink.
//!
//! Keeps the last shown frame and counts checkouts and handoffs. Serves as
//! the reference sink for integration tests and headless runs.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use super::{Display, DisplayError, DisplayShifts, PutFrameFlags, PutFrameResult, TileLayout};
use crate::video::{Codec, Interlacing, Tile, VideoDesc, VideoFrame};

#[derive(Debug)]
struct Configured {
    desc: VideoDesc,
    tile_count: usize,
}

/// A display that renders into plain memory.
pub struct BufferDisplay {
    native: Vec<Codec>,
    layout: TileLayout,
    interlacings: Vec<Interlacing>,
    configured: Mutex<Option<Configured>>,
    last_frame: Mutex<Option<VideoFrame>>,
    get_calls: AtomicU64,
    put_calls: AtomicU64,
    shown: AtomicU64,
    reconfigure_calls: AtomicU64,
    /// Test hook: refuse every `put_frame` while set.
    reject_puts: AtomicBool,
    /// Test hook: refuse the next `reconfigure`.
    refuse_reconfigure: AtomicBool,
}

impl BufferDisplay {
    pub fn new(native: Vec<Codec>, layout: TileLayout) -> Self {
        Self {
            native,
            layout,
            interlacings: vec![
                Interlacing::Progressive,
                Interlacing::InterlacedMerged,
                Interlacing::SegmentedFrame,
            ],
            configured: Mutex::new(None),
            last_frame: Mutex::new(None),
            get_calls: AtomicU64::new(0),
            put_calls: AtomicU64::new(0),
            shown: AtomicU64::new(0),
            reconfigure_calls: AtomicU64::new(0),
            reject_puts: AtomicBool::new(false),
            refuse_reconfigure: AtomicBool::new(false),
        }
    }

    pub fn with_interlacings(mut self, interlacings: Vec<Interlacing>) -> Self {
        self.interlacings = interlacings;
        self
    }

    pub fn frames_shown(&self) -> u64 {
        self.shown.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> u64 {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> u64 {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn reconfigure_calls(&self) -> u64 {
        self.reconfigure_calls.load(Ordering::SeqCst)
    }

    pub fn set_reject_puts(&self, reject: bool) {
        self.reject_puts.store(reject, Ordering::SeqCst);
    }

    pub fn refuse_next_reconfigure(&self) {
        self.refuse_reconfigure.store(true, Ordering::SeqCst);
    }

    /// Copy of the most recently shown frame.
    pub fn last_frame(&self) -> Option<VideoFrame> {
        self.last_frame.lock().ok()?.clone()
    }
}

impl Display for BufferDisplay {
    fn reconfigure(&self, desc: VideoDesc, tile_count: usize) -> Result<(), DisplayError> {
        self.reconfigure_calls.fetch_add(1, Ordering::SeqCst);
        if self.refuse_reconfigure.swap(false, Ordering::SeqCst) {
            return Err(DisplayError::ReconfigureRefused("test refusal".to_string()));
        }
        if let Ok(mut configured) = self.configured.lock() {
            *configured = Some(Configured { desc, tile_count });
        }
        Ok(())
    }

    fn get_frame(&self) -> Result<VideoFrame, DisplayError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let configured = self.configured.lock().map_err(|_| DisplayError::NoFrame)?;
        let configured = configured.as_ref().ok_or(DisplayError::NoFrame)?;
        let desc = configured.desc;
        let linesize = desc.codec.linesize(desc.width as usize);
        let tiles = (0..configured.tile_count)
            .map(|_| Tile::new(desc.width, desc.height, linesize))
            .collect();
        Ok(VideoFrame::new(desc, tiles))
    }

    fn put_frame(&self, frame: VideoFrame, _flags: PutFrameFlags) -> PutFrameResult {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_puts.load(Ordering::SeqCst) {
            return PutFrameResult::Rejected(frame);
        }
        self.shown.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_frame.lock() {
            *last = Some(frame);
        }
        PutFrameResult::Shown
    }

    fn native_codecs(&self) -> Vec<Codec> {
        self.native.clone()
    }

    fn supported_interlacings(&self) -> Vec<Interlacing> {
        self.interlacings.clone()
    }

    fn tile_layout(&self) -> TileLayout {
        self.layout
    }
}
