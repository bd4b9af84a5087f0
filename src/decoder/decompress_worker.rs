//! Decompress task: decodes tiles into the checked-out framebuffer and
//! performs the double-buffered display handoff.

use std::sync::atomic::Ordering;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::messages::{DecompressJob, TileBuffer};
use super::pipeline::SharedDecoder;
use super::state::{DecodePath, DecoderState};
use crate::display::{Display, PutFrameFlags, PutFrameResult};
use crate::log::LogSink;
use crate::stats::PipelineStats;
use crate::video::VideoDesc;
use crate::{sink_error, sink_info, sink_warn};

const STATS_INTERVAL_FRAMES: u64 = 600;

#[allow(clippy::expect_used)]
pub(crate) fn spawn_decompress_worker(
    logger: Arc<dyn LogSink>,
    shared: Arc<SharedDecoder>,
    display: Arc<dyn Display>,
    stats: Arc<PipelineStats>,
    job_rx: Receiver<DecompressJob>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("decoder-decompress".into())
        .spawn(move || {
            loop {
                match job_rx.recv() {
                    Ok(DecompressJob::Frame { tiles, desc }) => {
                        process_frame(&logger, &shared, &display, &stats, tiles, desc);
                    }
                    Ok(DecompressJob::Poison) | Err(_) => break,
                }
            }
        })
        .expect("spawn decoder-decompress")
}

fn process_frame(
    logger: &Arc<dyn LogSink>,
    shared: &Arc<SharedDecoder>,
    display: &Arc<dyn Display>,
    stats: &Arc<PipelineStats>,
    tiles: Vec<Option<TileBuffer>>,
    desc: VideoDesc,
) {
    let Ok(mut state) = shared.state.lock() else {
        return;
    };

    let decoded = decode_into_frame(&mut state, &tiles, logger);
    if decoded {
        hand_off(logger, shared, display, stats, &mut state, desc);
    } else {
        stats.bump_dropped();
    }

    state.in_flight = state.in_flight.saturating_sub(1);
    shared.buffer_swapped.notify_all();
}

/// Runs the line or block path for every tile. False drops the frame.
fn decode_into_frame(
    state: &mut DecoderState,
    tiles: &[Option<TileBuffer>],
    logger: &Arc<dyn LogSink>,
) -> bool {
    let DecoderState {
        path,
        frame,
        merged_fb,
        pitch,
        video_mode,
        out_codec,
        ..
    } = state;
    let Some(frame) = frame.as_mut() else {
        return false;
    };
    let Some(out_codec) = *out_codec else {
        return false;
    };

    match path {
        DecodePath::Unset => false,
        DecodePath::Line(decoders) => {
            for (i, slot) in tiles.iter().enumerate() {
                let Some(tile) = slot else { continue };
                let Some(decoder) = decoders.get(i) else {
                    continue;
                };
                let dst_index = if *merged_fb { 0 } else { i };
                let Some(dst) = frame.tile_mut(dst_index) else {
                    continue;
                };
                for &(off, len) in &tile.spans {
                    let start = off as usize;
                    let end = start + len as usize;
                    if end > tile.data.len() {
                        continue;
                    }
                    decoder.copy_fragment(&mut dst.data, &tile.data[start..end], start);
                }
            }
            true
        }
        DecodePath::Block(decompressors) => {
            let tiles_x = video_mode.tiles_x() as usize;
            for (i, slot) in tiles.iter().enumerate() {
                let Some(tile) = slot else { continue };
                let Some(decompressor) = decompressors.get_mut(i) else {
                    continue;
                };
                let output = if *merged_fb {
                    let tile_w = frame.desc.width as usize / tiles_x.max(1);
                    let tile_h = frame.desc.height as usize / video_mode.tiles_y() as usize;
                    let offset =
                        (i / tiles_x) * tile_h * *pitch + (i % tiles_x) * out_codec.linesize(tile_w);
                    frame.tile_mut(0).and_then(|t| t.data.get_mut(offset..))
                } else {
                    frame.tile_mut(i).map(|t| &mut t.data[..])
                };
                let Some(output) = output else { continue };
                if let Err(e) = decompressor.decompress(&tile.data, output, tile.buffer_id) {
                    sink_warn!(logger, "decompression failed: {e}, frame dropped");
                    return false;
                }
            }
            true
        }
    }
}

/// Interlace rewrite and the put/get framebuffer swap.
fn hand_off(
    logger: &Arc<dyn LogSink>,
    shared: &Arc<SharedDecoder>,
    display: &Arc<dyn Display>,
    stats: &Arc<PipelineStats>,
    state: &mut DecoderState,
    desc: VideoDesc,
) {
    if let (Some(change_il), Some(frame), Some(out_codec)) =
        (state.change_il, state.frame.as_mut(), state.out_codec)
    {
        for tile in frame.tiles.iter_mut() {
            let linesize = out_codec.linesize(tile.width as usize);
            change_il(&mut tile.data, linesize, tile.height as usize);
        }
    }

    let Some(frame) = state.frame.take() else {
        stats.bump_dropped();
        return;
    };
    let flags = PutFrameFlags {
        non_blocking: desc.codec.is_interframe(),
    };
    match display.put_frame(frame, flags) {
        PutFrameResult::Shown => {
            let shown = stats.bump_displayed();
            if shown % STATS_INTERVAL_FRAMES == 0 {
                sink_info!(logger, "decoder statistics: {}", stats.summary());
            }
            match display.get_frame() {
                Ok(next) => state.frame = Some(next),
                Err(e) => {
                    sink_error!(logger, "framebuffer checkout failed after put: {e}");
                    shared.dead.store(true, Ordering::SeqCst);
                }
            }
        }
        PutFrameResult::Rejected(frame) => {
            stats.bump_dropped();
            state.frame = Some(frame);
        }
    }
}
