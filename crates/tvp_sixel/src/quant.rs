//! Mapping samples onto palette registers.

use crate::palette::{Rgb, CUBE_START, GRAY_RAMP_START, XTERM_256};
use crate::{Result, SixelError};

/// Quantization step used by the dithering engine.
pub trait Quantize {
    /// Palette index for a sample.
    fn quantize(&self, value: u8) -> u8;

    /// Sample value a palette index stands for when measuring the
    /// quantization error.
    fn dequantize(&self, index: u8) -> u8;
}

/// Divide `x` by `n`, rounding up once the remainder reaches `n / 2`.
///
/// `n / 2` is an integer division, so for odd `n` a remainder of `(n - 1) / 2`
/// already rounds up and the error bound is `(n + 1) / 2`. With `n == 1`
/// every sample rounds up; `select(255, 1)` saturates at 255.
///
/// # Panics
/// Panics if `n == 0`.
#[inline]
pub fn select(x: u8, n: u8) -> u8 {
    let q = x / n;
    let r = x % n;
    q.saturating_add(u8::from(r >= n / 2))
}

/// Linear quantizer onto `levels + 1` evenly spaced gray levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinearQuantizer {
    levels: u8,
    divisor: u8,
}

impl LinearQuantizer {
    pub fn new(levels: u8) -> Result<Self> {
        if levels == 0 {
            return Err(SixelError::InvalidLevelCount(levels));
        }
        Ok(Self {
            levels,
            divisor: 255 / levels,
        })
    }

    #[inline]
    pub fn levels(&self) -> u8 {
        self.levels
    }

    /// Width of one quantization step in sample units.
    #[inline]
    pub fn divisor(&self) -> u8 {
        self.divisor
    }
}

impl Quantize for LinearQuantizer {
    #[inline]
    fn quantize(&self, value: u8) -> u8 {
        // e.g. levels = 100: 255 / 2 rounds to 128
        select(value, self.divisor).min(self.levels)
    }

    /// `index * (255 / levels)`. The gray palette displays index `i` at
    /// `round(255 * i / levels)`; the two agree only when `levels` divides 255.
    #[inline]
    fn dequantize(&self, index: u8) -> u8 {
        index.saturating_mul(self.divisor)
    }
}

/// Integer luminance using fixed-point weights of 0.2126/0.7152/0.0722.
///
/// The weights sum to 65536, so the result always fits in a `u8`.
#[inline]
pub fn luminance(c: Rgb) -> u8 {
    ((13933 * c.r as u32 + 46871 * c.g as u32 + 4732 * c.b as u32) >> 16) as u8
}

/// Nearest entry of the 256-color table, choosing between the gray ramp and
/// the color cube.
///
/// The gray candidate wins only when it is strictly closer; ties go to the cube.
pub fn truncate_xterm(c: Rgb) -> u8 {
    let l = luminance(c) as u32;
    // luminance 250..=255 would land one past the ramp
    let gs_index = (((l * 8 + 42) / 85).min(23)) as usize + GRAY_RAMP_START;
    let gs = XTERM_256[gs_index].r;

    let rr = cube_step(c.r);
    let gr = cube_step(c.g);
    let br = cube_step(c.b);
    let cc_index = CUBE_START + 36 * rr as usize + 6 * gr as usize + br as usize;

    let cc_dist = dist_sq(c, Rgb::new(rr * 51, gr * 51, br * 51));
    let gs_dist = dist_sq(c, Rgb::gray(gs));

    if gs_dist < cc_dist {
        gs_index as u8
    } else {
        cc_index as u8
    }
}

/// Round a component to the nearest of the six cube levels (0..=5).
#[inline]
fn cube_step(v: u8) -> u8 {
    ((v as u16 + 25) / 51) as u8
}

#[inline]
fn dist_sq(a: Rgb, b: Rgb) -> u32 {
    let dr = a.r as i32 - b.r as i32;
    let dg = a.g as i32 - b.g as i32;
    let db = a.b as i32 - b.b as i32;
    (dr * dr + dg * dg + db * db) as u32
}
