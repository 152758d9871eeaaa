//! Floyd-Steinberg error diffusion over a reusable 8-bit working buffer.
//!
//! Pixels are visited in strict row-major order. Each pixel's error is pushed
//! to its right and lower neighbors before they are visited:
//!
//! ```text
//!        x   7
//!    3   5   1     (sixteenths, truncating integer math)
//! ```
//!
//! All additions saturate at 0 and 255.

use crate::palette::Rgb;
use crate::pixel::{PixelBuffer, PixelFormat};
use crate::quant::Quantize;
use crate::{Result, SixelError};

/// Error shares for the right, below-left, below and below-right neighbors.
#[inline]
pub fn diffusion_terms(err: i16) -> [i16; 4] {
    [err * 7 / 16, err * 3 / 16, err * 5 / 16, err / 16]
}

/// Add a signed delta to a sample, clamping to `0..=255`.
#[inline]
pub fn add_saturating(x: u8, delta: i16) -> u8 {
    (x as i16 + delta).clamp(0, 255) as u8
}

/// Dither `buf` in place; afterwards it holds palette indices.
pub fn floyd_steinberg<Q: Quantize>(
    buf: &mut [u8],
    width: usize,
    height: usize,
    quantizer: &Q,
) -> Result<()> {
    check_len(buf, width, height)?;

    let mut i = 0;
    for r in 0..height {
        for c in 0..width {
            let old = buf[i];
            let q = quantizer.quantize(old);
            buf[i] = q;
            let err = old as i16 - quantizer.dequantize(q) as i16;
            if err != 0 {
                diffuse_error(buf, width, height, r, c, err);
            }
            i += 1;
        }
    }
    Ok(())
}

/// Spread the error of pixel `(row, col)` over its unvisited neighbors.
///
/// Neighbors outside the image are skipped; their share is dropped.
#[inline]
pub fn diffuse_error(
    buf: &mut [u8],
    width: usize,
    height: usize,
    row: usize,
    col: usize,
    err: i16,
) {
    let [right, below_left, below, below_right] = diffusion_terms(err);
    let i = row * width + col;
    let has_right = col + 1 < width;
    if has_right {
        buf[i + 1] = add_saturating(buf[i + 1], right);
    }
    if row + 1 < height {
        let j = i + width;
        buf[j] = add_saturating(buf[j], below);
        if col > 0 {
            buf[j - 1] = add_saturating(buf[j - 1], below_left);
        }
        if has_right {
            buf[j + 1] = add_saturating(buf[j + 1], below_right);
        }
    }
}

/// Quantize every sample in place without diffusing error.
pub fn quantize_in_place<Q: Quantize>(buf: &mut [u8], quantizer: &Q) {
    for px in buf.iter_mut() {
        *px = quantizer.quantize(*px);
    }
}

fn check_len(buf: &[u8], width: usize, height: usize) -> Result<()> {
    let expected = width * height;
    if buf.len() != expected {
        return Err(SixelError::BufferSizeMismatch {
            expected,
            actual: buf.len(),
        });
    }
    Ok(())
}

/// Working copy of a frame, kept across frames of equal size.
#[derive(Clone, Debug, Default)]
pub struct DitherBuffer {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl DitherBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Row `y` of the working buffer.
    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    /// Size the buffer for a frame. Returns `true` if the dimensions changed.
    pub fn prepare(&mut self, width: usize, height: usize) -> bool {
        if self.width == width && self.height == height {
            return false;
        }
        log::debug!(
            "dither buffer resized {}x{} -> {}x{}",
            self.width,
            self.height,
            width,
            height
        );
        self.width = width;
        self.height = height;
        self.data.resize(width * height, 0);
        true
    }

    /// Copy an 8-bit gray frame into the buffer.
    pub fn load_gray(&mut self, image: &PixelBuffer<'_>) -> Result<()> {
        expect_format(image, PixelFormat::Gray8)?;
        self.prepare(image.width(), image.height());
        for (dst, src) in self.data.chunks_exact_mut(image.width()).zip(image.rows()) {
            dst.copy_from_slice(src);
        }
        Ok(())
    }

    /// Fill the buffer with one index per RGB pixel.
    pub fn map_rgb<F>(&mut self, image: &PixelBuffer<'_>, mut map: F) -> Result<()>
    where
        F: FnMut(Rgb) -> u8,
    {
        expect_format(image, PixelFormat::Rgb888)?;
        self.prepare(image.width(), image.height());
        for (dst, src) in self.data.chunks_exact_mut(image.width()).zip(image.rows()) {
            for (d, px) in dst.iter_mut().zip(src.chunks_exact(3)) {
                *d = map(Rgb::new(px[0], px[1], px[2]));
            }
        }
        Ok(())
    }

    /// Floyd-Steinberg over the whole buffer.
    pub fn dither<Q: Quantize>(&mut self, quantizer: &Q) -> Result<()> {
        floyd_steinberg(&mut self.data, self.width, self.height, quantizer)
    }

    /// Plain per-pixel quantization.
    pub fn quantize<Q: Quantize>(&mut self, quantizer: &Q) {
        quantize_in_place(&mut self.data, quantizer);
    }
}

fn expect_format(image: &PixelBuffer<'_>, expected: PixelFormat) -> Result<()> {
    if image.format() != expected {
        return Err(SixelError::FormatMismatch {
            expected,
            actual: image.format(),
        });
    }
    Ok(())
}
