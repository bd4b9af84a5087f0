//! Interlacing kinds and the field-order rewrites between them.

/// How the lines of a frame are organized in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interlacing {
    Progressive,
    UpperFieldFirst,
    LowerFieldFirst,
    InterlacedMerged,
    SegmentedFrame,
}

impl Interlacing {
    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(Interlacing::Progressive),
            1 => Some(Interlacing::UpperFieldFirst),
            2 => Some(Interlacing::LowerFieldFirst),
            3 => Some(Interlacing::InterlacedMerged),
            4 => Some(Interlacing::SegmentedFrame),
            _ => None,
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            Interlacing::Progressive => 0,
            Interlacing::UpperFieldFirst => 1,
            Interlacing::LowerFieldFirst => 2,
            Interlacing::InterlacedMerged => 3,
            Interlacing::SegmentedFrame => 4,
        }
    }

    /// Suffix used in format log lines, e.g. "1920x1080 @25.00i".
    pub fn suffix(self) -> &'static str {
        match self {
            Interlacing::Progressive => "p",
            Interlacing::UpperFieldFirst | Interlacing::LowerFieldFirst => "f",
            Interlacing::InterlacedMerged => "i",
            Interlacing::SegmentedFrame => "psf",
        }
    }
}

/// In-place line rewrite between two interlacing kinds.
pub type ChangeIlFn = fn(data: &mut [u8], linesize: usize, height: usize);

/// Field-separated (all upper lines, then all lower lines) to interleaved.
pub fn il_upper_to_merged(data: &mut [u8], linesize: usize, height: usize) {
    let mut tmp = vec![0u8; linesize * height];
    let upper_lines = height.div_ceil(2);
    for y in 0..height {
        let src_line = if y % 2 == 0 {
            y / 2
        } else {
            upper_lines + y / 2
        };
        tmp[y * linesize..(y + 1) * linesize]
            .copy_from_slice(&data[src_line * linesize..src_line * linesize + linesize]);
    }
    data[..linesize * height].copy_from_slice(&tmp);
}

/// Interleaved to field-separated (all upper lines, then all lower lines).
pub fn il_merged_to_upper(data: &mut [u8], linesize: usize, height: usize) {
    let mut tmp = vec![0u8; linesize * height];
    let upper_lines = height.div_ceil(2);
    for y in 0..height {
        let dst_line = if y % 2 == 0 {
            y / 2
        } else {
            upper_lines + y / 2
        };
        tmp[dst_line * linesize..dst_line * linesize + linesize]
            .copy_from_slice(&data[y * linesize..(y + 1) * linesize]);
    }
    data[..linesize * height].copy_from_slice(&tmp);
}

/// Static transcode table consulted when the display cannot show the source
/// field order natively.
pub const IL_TRANSCODE: &[(Interlacing, Interlacing, ChangeIlFn)] = &[
    (
        Interlacing::UpperFieldFirst,
        Interlacing::InterlacedMerged,
        il_upper_to_merged,
    ),
    (
        Interlacing::InterlacedMerged,
        Interlacing::UpperFieldFirst,
        il_merged_to_upper,
    ),
];

/// Picks the conversion for `source` against what the display supports.
///
/// Returns `(output_kind, None)` when the display shows `source` natively,
/// `(output_kind, Some(f))` when a rewrite is needed, and `None` when no
/// combination works.
pub fn select_il_conversion(
    source: Interlacing,
    supported: &[Interlacing],
) -> Option<(Interlacing, Option<ChangeIlFn>)> {
    if supported.contains(&source) {
        return Some((source, None));
    }
    for out in supported {
        for (from, to, func) in IL_TRANSCODE {
            if *from == source && to == out {
                return Some((*out, Some(*func)));
            }
        }
    }
    None
}
