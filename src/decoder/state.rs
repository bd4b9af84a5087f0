//! Decoder state shared between the reassembly and decompress tasks, and the
//! pipeline reconfiguration that rebuilds it when the stream changes.

use std::sync::Arc;

use super::decode_error::DecodeError;
use super::line_decoder::{copy_line_native, LineDecodeFn, LineDecoder, LINE_TRANSFORMS};
use crate::decompress::{DecompressRegistry, Decompressor};
use crate::display::{Display, DisplayShifts, TileLayout};
use crate::log::LogSink;
use crate::sink_info;
use crate::video::interlacing::select_il_conversion;
use crate::video::{ChangeIlFn, Codec, VideoDesc, VideoFrame, VideoMode};

/// Which decode path the current stream uses.
pub enum DecodePath {
    Unset,
    Line(Vec<LineDecoder>),
    Block(Vec<Box<dyn Decompressor>>),
}

/// Everything the decode stage knows about the current stream, guarded by
/// one mutex in the pipeline.
pub struct DecoderState {
    pub video_mode: VideoMode,
    /// Descriptor of the incoming stream, `None` until the first frame (and
    /// reset on mode inference to force reconfiguration).
    pub received_desc: Option<VideoDesc>,
    /// Descriptor the display was last configured with.
    pub display_desc: Option<VideoDesc>,
    pub path: DecodePath,
    pub accepts_corrupted: bool,
    pub out_codec: Option<Codec>,
    pub pitch: usize,
    pub shifts: DisplayShifts,
    pub merged_fb: bool,
    pub change_il: Option<ChangeIlFn>,
    /// The one framebuffer checked out of the display.
    pub frame: Option<VideoFrame>,
    /// Frames handed to the decompress task and not yet put back to the
    /// display. Reconfiguration waits for this to drain.
    pub in_flight: u32,
}

impl DecoderState {
    pub fn new(mode: VideoMode) -> Self {
        Self {
            video_mode: mode,
            received_desc: None,
            display_desc: None,
            path: DecodePath::Unset,
            accepts_corrupted: false,
            out_codec: None,
            pitch: 0,
            shifts: DisplayShifts::default(),
            merged_fb: true,
            change_il: None,
            frame: None,
            in_flight: 0,
        }
    }
}

enum Choice {
    LineNative,
    LineTransform(LineDecodeFn),
    Block(Vec<Box<dyn Decompressor>>),
}

/// Codec selection. Native copy beats line transforms, line transforms beat
/// block decompression; among line transforms the static table's declaration
/// order decides, among decompressors the registry priority does.
fn choose_codec_and_decoder(
    in_codec: Codec,
    mode: VideoMode,
    natives: &[Codec],
    registry: &DecompressRegistry,
    logger: &Arc<dyn LogSink>,
) -> Result<(Codec, Choice), DecodeError> {
    for &out in natives {
        if in_codec == out {
            // Opaque formats cannot compose tiled modes in a line copier,
            // and RGB formats may need channel-shift repacking.
            if in_codec.is_opaque() && mode != VideoMode::Normal {
                continue;
            }
            if in_codec == Codec::Rgba || in_codec == Codec::Rgb {
                continue;
            }
            return Ok((out, Choice::LineNative));
        }
    }

    for &(from, to, func) in LINE_TRANSFORMS {
        if from == in_codec && natives.contains(&to) {
            return Ok((to, Choice::LineTransform(func)));
        }
    }

    for &out in natives {
        if let Some((instances, entry)) =
            registry.instantiate(in_codec, out, mode.substream_count() as usize)
        {
            sink_info!(
                logger,
                "selected decompressor {} (magic {:#x}) for {} -> {}",
                entry.name,
                entry.magic,
                in_codec,
                out
            );
            return Ok((out, Choice::Block(instances)));
        }
    }

    Err(DecodeError::NoDecoder { codec: in_codec })
}

/// Rebuild the decode path for a new stream descriptor.
///
/// The caller must have drained in-flight frames first; this function tears
/// the old state down, picks the decode path against the display's codecs,
/// reconfigures the display when its descriptor changed, checks out a fresh
/// framebuffer and rebuilds the per-tile decoders.
pub fn reconfigure_decoder(
    state: &mut DecoderState,
    display: &Arc<dyn Display>,
    registry: &DecompressRegistry,
    desc: VideoDesc,
    logger: &Arc<dyn LogSink>,
) -> Result<(), DecodeError> {
    state.path = DecodePath::Unset;
    state.accepts_corrupted = false;
    state.change_il = None;

    let mode = state.video_mode;
    let tiles_x = mode.tiles_x();
    let tiles_y = mode.tiles_y();
    let in_codec = desc.codec.canonical();
    let natives: Vec<Codec> = display
        .native_codecs()
        .into_iter()
        .map(Codec::canonical)
        .collect();

    let (out_codec, choice) = choose_codec_and_decoder(in_codec, mode, &natives, registry, logger)?;

    let merged = display.tile_layout() == TileLayout::Merged;
    let mut display_desc = desc;
    display_desc.codec = out_codec;
    let tile_count = if merged {
        display_desc.width = desc.width * tiles_x;
        display_desc.height = desc.height * tiles_y;
        1
    } else {
        mode.substream_count() as usize
    };

    if !out_codec.is_opaque() {
        if let Some((out_il, func)) =
            select_il_conversion(desc.interlacing, &display.supported_interlacings())
        {
            display_desc.interlacing = out_il;
            state.change_il = func;
        }
    }

    if state.display_desc != Some(display_desc) {
        display
            .reconfigure(display_desc, tile_count)
            .map_err(DecodeError::DisplayReconfigure)?;
        let frame = display
            .get_frame()
            .map_err(DecodeError::FramebufferCheckout)?;
        state.frame = Some(frame);
        state.display_desc = Some(display_desc);
    }

    state.shifts = display.shifts().unwrap_or_default();
    let linewidth = if merged {
        desc.width * tiles_x
    } else {
        desc.width
    };
    state.pitch = display
        .pitch()
        .unwrap_or_else(|| out_codec.linesize(linewidth as usize));
    state.merged_fb = merged;
    state.out_codec = Some(out_codec);

    match choice {
        Choice::LineNative | Choice::LineTransform(_) => {
            let decode_line = match choice {
                Choice::LineTransform(func) => func,
                _ => copy_line_native,
            };
            let src_linesize = in_codec.linesize(desc.width as usize);
            let dst_linesize = out_codec.linesize(desc.width as usize);
            let mut decoders = Vec::with_capacity(mode.substream_count() as usize);
            for substream in 0..mode.substream_count() {
                let x = substream % tiles_x;
                let y = substream / tiles_x;
                let base_offset = if merged {
                    (y * desc.height) as usize * state.pitch
                        + out_codec.linesize((x * desc.width) as usize)
                } else {
                    0
                };
                decoders.push(LineDecoder {
                    base_offset,
                    src_bpp: in_codec.bpp(),
                    dst_bpp: out_codec.bpp(),
                    shifts: state.shifts,
                    decode_line,
                    dst_linesize,
                    dst_pitch: if merged { state.pitch } else { dst_linesize },
                    src_linesize,
                });
            }
            state.path = DecodePath::Line(decoders);
        }
        Choice::Block(mut instances) => {
            let tile_pitch = if merged {
                state.pitch
            } else {
                out_codec.linesize(desc.width as usize)
            };
            for instance in instances.iter_mut() {
                instance
                    .reconfigure(desc, state.shifts, tile_pitch, out_codec)
                    .map_err(|_| DecodeError::DecompressorSetup {
                        from: in_codec,
                        to: out_codec,
                    })?;
            }
            state.accepts_corrupted = instances[0].accepts_corrupted_frame();
            state.path = DecodePath::Block(instances);
        }
    }

    state.received_desc = Some(desc);
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::display::BufferDisplay;
    use crate::log::NoopLogSink;
    use crate::video::{Fps, Interlacing};

    fn desc(codec: Codec) -> VideoDesc {
        VideoDesc::new(32, 8, codec, Interlacing::Progressive, Fps::whole(30))
    }

    fn logger() -> Arc<dyn LogSink> {
        Arc::new(NoopLogSink)
    }

    #[test]
    fn native_codec_picks_line_path() {
        let display: Arc<dyn Display> =
            Arc::new(BufferDisplay::new(vec![Codec::Uyvy], TileLayout::Merged));
        let registry = DecompressRegistry::with_builtins();
        let mut state = DecoderState::new(VideoMode::Normal);
        reconfigure_decoder(&mut state, &display, &registry, desc(Codec::Uyvy), &logger()).unwrap();
        assert!(matches!(&state.path, DecodePath::Line(d) if d.len() == 1));
        assert_eq!(state.out_codec, Some(Codec::Uyvy));
        assert!(state.frame.is_some());
    }

    #[test]
    fn rgb_to_rgba_uses_transform_table() {
        let display: Arc<dyn Display> =
            Arc::new(BufferDisplay::new(vec![Codec::Rgba], TileLayout::Merged));
        let registry = DecompressRegistry::with_builtins();
        let mut state = DecoderState::new(VideoMode::Normal);
        reconfigure_decoder(&mut state, &display, &registry, desc(Codec::Rgb), &logger()).unwrap();
        assert!(matches!(state.path, DecodePath::Line(_)));
        assert_eq!(state.out_codec, Some(Codec::Rgba));
    }

    #[test]
    fn opaque_codec_picks_block_path() {
        let display: Arc<dyn Display> =
            Arc::new(BufferDisplay::new(vec![Codec::Dxt1], TileLayout::Merged));
        let registry = DecompressRegistry::with_builtins();
        let mut state = DecoderState::new(VideoMode::Normal);
        reconfigure_decoder(&mut state, &display, &registry, desc(Codec::Dxt1), &logger()).unwrap();
        assert!(matches!(&state.path, DecodePath::Block(d) if d.len() == 1));
        assert!(!state.accepts_corrupted);
    }

    #[test]
    fn unknown_codec_is_fatal() {
        let display: Arc<dyn Display> =
            Arc::new(BufferDisplay::new(vec![Codec::Uyvy], TileLayout::Merged));
        let registry = DecompressRegistry::with_builtins();
        let mut state = DecoderState::new(VideoMode::Normal);
        let got = reconfigure_decoder(&mut state, &display, &registry, desc(Codec::Jpeg), &logger());
        assert!(matches!(got, Err(DecodeError::NoDecoder { codec: Codec::Jpeg })));
    }

    #[test]
    fn stereo_merged_doubles_display_width() {
        let display = Arc::new(BufferDisplay::new(vec![Codec::Uyvy], TileLayout::Merged));
        let display_dyn: Arc<dyn Display> = Arc::clone(&display) as Arc<dyn Display>;
        let registry = DecompressRegistry::with_builtins();
        let mut state = DecoderState::new(VideoMode::Stereo);
        reconfigure_decoder(
            &mut state,
            &display_dyn,
            &registry,
            desc(Codec::Uyvy),
            &logger(),
        )
        .unwrap();
        let frame = state.frame.as_ref().unwrap();
        assert_eq!(frame.desc.width, 64);
        match &state.path {
            DecodePath::Line(decoders) => {
                assert_eq!(decoders.len(), 2);
                assert_eq!(decoders[0].base_offset, 0);
                // second eye starts one tile to the right
                assert_eq!(decoders[1].base_offset, Codec::Uyvy.linesize(32));
            }
            _ => panic!("expected line path"),
        }
    }

    #[test]
    fn unchanged_display_desc_skips_reconfigure() {
        let display = Arc::new(BufferDisplay::new(vec![Codec::Uyvy], TileLayout::Merged));
        let display_dyn: Arc<dyn Display> = Arc::clone(&display) as Arc<dyn Display>;
        let registry = DecompressRegistry::with_builtins();
        let mut state = DecoderState::new(VideoMode::Normal);
        reconfigure_decoder(&mut state, &display_dyn, &registry, desc(Codec::Uyvy), &logger())
            .unwrap();
        // same descriptor again, e.g. after a mode probe
        reconfigure_decoder(&mut state, &display_dyn, &registry, desc(Codec::Uyvy), &logger())
            .unwrap();
        assert_eq!(display.reconfigure_calls(), 1);
    }

    #[test]
    fn upper_field_stream_gets_interlace_conversion() {
        let display: Arc<dyn Display> = Arc::new(
            BufferDisplay::new(vec![Codec::Uyvy], TileLayout::Merged)
                .with_interlacings(vec![Interlacing::InterlacedMerged]),
        );
        let registry = DecompressRegistry::with_builtins();
        let mut state = DecoderState::new(VideoMode::Normal);
        let mut d = desc(Codec::Uyvy);
        d.interlacing = Interlacing::UpperFieldFirst;
        reconfigure_decoder(&mut state, &display, &registry, d, &logger()).unwrap();
        assert!(state.change_il.is_some());
        assert_eq!(
            state.display_desc.unwrap().interlacing,
            Interlacing::InterlacedMerged
        );
    }
}
