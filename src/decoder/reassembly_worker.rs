//! Reassembly task: completeness checks, FEC recovery and reconfiguration,
//! feeding the decompress task through the one-slot handoff.

use std::sync::atomic::Ordering;
use std::sync::mpsc::{Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::messages::{DecompressJob, ReassemblyJob, TileBuffer};
use super::pipeline::{FpsChange, SharedDecoder};
use super::state::{reconfigure_decoder, DecodePath};
use crate::decompress::DecompressRegistry;
use crate::display::Display;
use crate::fec;
use crate::log::LogSink;
use crate::playout::FrameUnit;
use crate::stats::PipelineStats;
use crate::{sink_debug, sink_error, sink_info, sink_warn};

#[allow(clippy::expect_used)]
pub(crate) fn spawn_reassembly_worker(
    logger: Arc<dyn LogSink>,
    shared: Arc<SharedDecoder>,
    display: Arc<dyn Display>,
    registry: Arc<DecompressRegistry>,
    stats: Arc<PipelineStats>,
    job_rx: Receiver<ReassemblyJob>,
    out_tx: SyncSender<DecompressJob>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("decoder-reassembly".into())
        .spawn(move || {
            loop {
                let job = match job_rx.recv() {
                    Ok(job) => job,
                    Err(_) => ReassemblyJob::Poison,
                };
                match job {
                    ReassemblyJob::Poison => {
                        // propagate in order so the decompress task drains first
                        let _ = out_tx.send(DecompressJob::Poison);
                        break;
                    }
                    ReassemblyJob::Unit(unit) => {
                        process_unit(*unit, &logger, &shared, &display, &registry, &stats, &out_tx);
                    }
                }
            }
        })
        .expect("spawn decoder-reassembly")
}

fn process_unit(
    unit: FrameUnit,
    logger: &Arc<dyn LogSink>,
    shared: &Arc<SharedDecoder>,
    display: &Arc<dyn Display>,
    registry: &Arc<DecompressRegistry>,
    stats: &Arc<PipelineStats>,
    out_tx: &SyncSender<DecompressJob>,
) {
    if shared.dead.load(Ordering::SeqCst) {
        stats.bump_dropped();
        return;
    }

    let needs_reconfigure = match shared.state.lock() {
        Ok(state) => state.received_desc != Some(unit.desc),
        Err(_) => return,
    };
    if needs_reconfigure {
        // single synchronization point with the display thread
        shared.wait_for_framebuffer_swap();
        let Ok(mut state) = shared.state.lock() else {
            return;
        };
        sink_info!(logger, "new incoming video format detected: {}", unit.desc);
        if let Err(e) = reconfigure_decoder(&mut state, display, registry, unit.desc, logger) {
            drop(state);
            sink_error!(logger, "{e}; tearing down participant pipeline");
            shared.dead.store(true, Ordering::SeqCst);
            stats.bump_dropped();
            return;
        }
        drop(state);
        if let Ok(mut pending) = shared.pending_fps.lock() {
            *pending = Some(FpsChange {
                fps: unit.desc.fps,
                interframe: unit.desc.codec.is_interframe(),
            });
        }
    }

    let tiles = match unit.fec {
        None => match plain_tiles(unit, logger, shared, stats) {
            Some(tiles) => tiles,
            None => return,
        },
        Some(params) => match recovered_tiles(unit, params, logger, stats) {
            Some(tiles) => tiles,
            None => return,
        },
    };

    let (tiles, desc) = tiles;
    if let Ok(mut state) = shared.state.lock() {
        state.in_flight += 1;
    }
    if out_tx.send(DecompressJob::Frame { tiles, desc }).is_err() {
        if let Ok(mut state) = shared.state.lock() {
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        shared.dead.store(true, Ordering::SeqCst);
    }
}

type Tiles = (Vec<Option<TileBuffer>>, crate::video::VideoDesc);

/// Byte-count verification and handoff buffers for an unprotected frame.
fn plain_tiles(
    unit: FrameUnit,
    logger: &Arc<dyn LogSink>,
    shared: &Arc<SharedDecoder>,
    stats: &Arc<PipelineStats>,
) -> Option<Tiles> {
    let mut corrupted = unit.corrupted;
    for (i, slot) in unit.substreams.iter().enumerate() {
        let complete = slot.as_ref().is_some_and(|s| s.is_complete());
        if !complete {
            corrupted = true;
            if let Some(s) = slot {
                sink_debug!(
                    logger,
                    "frame incomplete - substream {i}, buffer {}: expected {} bytes, got {}",
                    s.buffer_id,
                    s.expected_bytes,
                    s.received_bytes()
                );
            } else {
                sink_debug!(logger, "frame incomplete - substream {i}: no packets");
            }
        }
    }
    if corrupted {
        stats.bump_corrupted();
        let drop_frame = match shared.state.lock() {
            Ok(state) => {
                matches!(state.path, DecodePath::Block(_)) && !state.accepts_corrupted
            }
            Err(_) => true,
        };
        if drop_frame {
            stats.bump_dropped();
            return None;
        }
    }

    let desc = unit.desc;
    let tiles = unit
        .substreams
        .into_iter()
        .map(|slot| {
            slot.map(|s| TileBuffer {
                spans: s.fragments.spans().to_vec(),
                buffer_id: s.buffer_id,
                data: s.buffer,
            })
        })
        .collect();
    Some((tiles, desc))
}

/// FEC recovery of every substream; any failure drops the whole frame.
fn recovered_tiles(
    unit: FrameUnit,
    params: fec::FecParams,
    logger: &Arc<dyn LogSink>,
    stats: &Arc<PipelineStats>,
) -> Option<Tiles> {
    if unit.corrupted {
        stats.bump_corrupted();
        stats.bump_dropped();
        return None;
    }
    let desc = unit.desc;
    let symbols = usize::from(params.k) + usize::from(params.m);
    if symbols == 0 {
        sink_warn!(logger, "FEC frame with empty geometry dropped");
        stats.bump_dropped();
        return None;
    }
    let mut tiles = Vec::with_capacity(unit.substreams.len());
    for (i, slot) in unit.substreams.into_iter().enumerate() {
        let Some(s) = slot else {
            sink_warn!(logger, "substream {i} absent, FEC frame dropped");
            stats.bump_dropped();
            return None;
        };
        let expected = s.expected_bytes as usize;
        if expected == 0 || expected % symbols != 0 {
            sink_warn!(
                logger,
                "FEC buffer of {expected} bytes not divisible into {symbols} symbols, frame dropped"
            );
            stats.bump_dropped();
            return None;
        }
        let symbol_size = expected / symbols;
        let presence = fec::symbol_presence(s.fragments.spans(), symbol_size, symbols);
        let mut buffer = s.buffer;
        match fec::recover(&mut buffer, &presence, &params) {
            Ok(payload) => {
                tiles.push(Some(TileBuffer {
                    spans: vec![(0, payload.len() as u32)],
                    buffer_id: s.buffer_id,
                    data: payload,
                }));
            }
            Err(e) => {
                sink_warn!(logger, "FEC recovery failed for substream {i}: {e}");
                stats.bump_dropped();
                return None;
            }
        }
    }
    Some((tiles, desc))
}
