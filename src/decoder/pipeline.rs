//! Per-participant decode pipeline: two worker threads joined by one-slot
//! handoffs, plus the shared decoder state they synchronize on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::JoinHandle;

use super::messages::ReassemblyJob;
use super::reassembly_worker::spawn_reassembly_worker;
use super::decompress_worker::spawn_decompress_worker;
use super::state::DecoderState;
use crate::decompress::DecompressRegistry;
use crate::display::Display;
use crate::log::LogSink;
use crate::playout::FrameUnit;
use crate::stats::PipelineStats;
use crate::video::{Fps, VideoMode};
use crate::{sink_error, sink_info};

/// Posted by the reassembly task after a reconfiguration so the playout
/// layer can revise its delay.
#[derive(Debug, Clone, Copy)]
pub struct FpsChange {
    pub fps: Fps,
    pub interframe: bool,
}

/// State shared by the pipeline handle and both workers.
pub(crate) struct SharedDecoder {
    pub state: Mutex<DecoderState>,
    /// Signaled whenever the decompress task returns a frame to the display;
    /// reconfiguration waits here until no frame is in flight.
    pub buffer_swapped: Condvar,
    pub dead: AtomicBool,
    pub pending_fps: Mutex<Option<FpsChange>>,
}

impl SharedDecoder {
    pub fn wait_for_framebuffer_swap(&self) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        while state.in_flight > 0 {
            match self.buffer_swapped.wait(state) {
                Ok(guard) => state = guard,
                Err(_) => return,
            }
        }
    }
}

/// Outcome of a non-blocking frame submission.
#[derive(Debug)]
pub enum SubmitOutcome {
    Accepted,
    /// The reassembly slot is occupied; the unit is handed back.
    Busy(FrameUnit),
    /// The pipeline hit a fatal error and must be torn down.
    Dead(FrameUnit),
}

/// Handle owned by the participant. Dropping it poisons and joins both
/// workers.
pub struct VideoPipeline {
    shared: Arc<SharedDecoder>,
    job_tx: Option<SyncSender<ReassemblyJob>>,
    reassembly: Option<JoinHandle<()>>,
    decompress: Option<JoinHandle<()>>,
    slow: bool,
    logger: Arc<dyn LogSink>,
    stats: Arc<PipelineStats>,
}

impl VideoPipeline {
    pub fn new(
        display: Arc<dyn Display>,
        registry: Arc<DecompressRegistry>,
        mode: VideoMode,
        logger: Arc<dyn LogSink>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        let shared = Arc::new(SharedDecoder {
            state: Mutex::new(DecoderState::new(mode)),
            buffer_swapped: Condvar::new(),
            dead: AtomicBool::new(false),
            pending_fps: Mutex::new(None),
        });
        let (job_tx, job_rx) = mpsc::sync_channel::<ReassemblyJob>(1);
        let (handoff_tx, handoff_rx) = mpsc::sync_channel(1);

        let decompress = spawn_decompress_worker(
            Arc::clone(&logger),
            Arc::clone(&shared),
            Arc::clone(&display),
            Arc::clone(&stats),
            handoff_rx,
        );
        let reassembly = spawn_reassembly_worker(
            Arc::clone(&logger),
            Arc::clone(&shared),
            display,
            registry,
            Arc::clone(&stats),
            job_rx,
            handoff_tx,
        );

        Self {
            shared,
            job_tx: Some(job_tx),
            reassembly: Some(reassembly),
            decompress: Some(decompress),
            slow: false,
            logger,
            stats,
        }
    }

    /// Submit one frame unit without blocking. The ingest loop must never
    /// stall on downstream state; a full slot hands the unit back and the
    /// backlog stays in the playout buffer.
    pub fn try_submit(&mut self, unit: FrameUnit) -> SubmitOutcome {
        if self.is_dead() {
            return SubmitOutcome::Dead(unit);
        }
        let Some(tx) = self.job_tx.as_ref() else {
            return SubmitOutcome::Dead(unit);
        };
        match tx.try_send(ReassemblyJob::Unit(Box::new(unit))) {
            Ok(()) => {
                self.slow = false;
                SubmitOutcome::Accepted
            }
            Err(TrySendError::Full(ReassemblyJob::Unit(unit))) => {
                if !self.slow {
                    sink_error!(self.logger, "this machine is too slow to play the stream");
                    self.slow = true;
                }
                SubmitOutcome::Busy(*unit)
            }
            Err(TrySendError::Full(ReassemblyJob::Poison)) => unreachable!("poison is never retried"),
            Err(TrySendError::Disconnected(ReassemblyJob::Unit(unit))) => {
                self.shared.dead.store(true, Ordering::SeqCst);
                SubmitOutcome::Dead(*unit)
            }
            Err(TrySendError::Disconnected(ReassemblyJob::Poison)) => {
                unreachable!("poison is never retried")
            }
        }
    }

    /// Switch the expected video mode (after inference) and force a
    /// reconfiguration on the next frame.
    pub fn set_video_mode(&self, mode: VideoMode) {
        if let Ok(mut state) = self.shared.state.lock() {
            state.video_mode = mode;
            state.received_desc = None;
        }
    }

    /// Take the pending delay revision, if the decoder posted one.
    pub fn poll_fps_change(&self) -> Option<FpsChange> {
        self.shared.pending_fps.lock().ok()?.take()
    }

    pub fn is_dead(&self) -> bool {
        self.shared.dead.load(Ordering::SeqCst)
    }

    /// Poison both workers in order and wait for them to exit. The
    /// decompress task finishes the frame it is working on first.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.job_tx.take() {
            let _ = tx.send(ReassemblyJob::Poison);
        }
        if let Some(handle) = self.reassembly.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.decompress.take() {
            let _ = handle.join();
        }
        sink_info!(self.logger, "decoder statistics: {}", self.stats.summary());
    }
}

impl Drop for VideoPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}
