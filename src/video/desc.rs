use crate::video::codec::Codec;
use crate::video::interlacing::Interlacing;

/// Frame rate as carried on the wire: a small rational with an optional
/// NTSC-style 1.001 divisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fps {
    /// Numerator, 10 bits on the wire.
    pub num: u16,
    /// Denominator, 4 bits on the wire. Zero is normalized to one.
    pub den: u8,
    /// Divide the result by 1.001 (29.97, 59.94 and friends).
    pub div1001: bool,
}

impl Fps {
    pub fn new(num: u16, den: u8, div1001: bool) -> Self {
        Self { num, den, div1001 }
    }

    pub fn whole(num: u16) -> Self {
        Self {
            num,
            den: 1,
            div1001: false,
        }
    }

    pub fn as_f64(self) -> f64 {
        let den = if self.den == 0 { 1 } else { self.den };
        let fps = f64::from(self.num) / f64::from(den);
        if self.div1001 { fps / 1.001 } else { fps }
    }

    /// Duration of one frame. Falls back to 1 s when the rate is zero.
    pub fn frame_period(self) -> std::time::Duration {
        let fps = self.as_f64();
        if fps <= 0.0 {
            return std::time::Duration::from_secs(1);
        }
        std::time::Duration::from_secs_f64(1.0 / fps)
    }
}

impl Default for Fps {
    fn default() -> Self {
        Fps::whole(30)
    }
}

/// Description of the currently negotiated video stream.
///
/// Carried (in packed form) in every payload header; any change against the
/// receiver's current descriptor triggers a pipeline reconfiguration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoDesc {
    pub width: u32,
    pub height: u32,
    pub codec: Codec,
    pub interlacing: Interlacing,
    pub fps: Fps,
}

impl VideoDesc {
    pub fn new(width: u32, height: u32, codec: Codec, interlacing: Interlacing, fps: Fps) -> Self {
        Self {
            width,
            height,
            codec,
            interlacing,
            fps,
        }
    }
}

impl std::fmt::Display for VideoDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{} @{:.2}{}, codec {}",
            self.width,
            self.height,
            self.fps.as_f64(),
            self.interlacing.suffix(),
            self.codec
        )
    }
}
