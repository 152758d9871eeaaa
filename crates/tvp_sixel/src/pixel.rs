//! Borrowed input frames.

use crate::{Result, SixelError};

/// Sample layout of an input frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// One 8-bit intensity sample per pixel.
    Gray8,
    /// Three 8-bit samples per pixel in R, G, B order.
    Rgb888,
}

impl PixelFormat {
    /// Resolve a format from its channel count and bit depth.
    ///
    /// Only 8-bit samples with one or three channels are accepted.
    pub fn from_layout(channels: u8, bit_depth: u8) -> Result<Self> {
        match (channels, bit_depth) {
            (1, 8) => Ok(PixelFormat::Gray8),
            (3, 8) => Ok(PixelFormat::Rgb888),
            _ => Err(SixelError::UnsupportedFormat {
                channels,
                bit_depth,
            }),
        }
    }

    /// Bytes per pixel.
    #[inline]
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb888 => 3,
        }
    }
}

/// A read-only view of a caller-owned frame.
///
/// Rows start every `stride` bytes; bytes past `width * channels` in a row are
/// padding and never read.
#[derive(Clone, Copy, Debug)]
pub struct PixelBuffer<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    stride: usize,
    format: PixelFormat,
}

impl<'a> PixelBuffer<'a> {
    pub fn new(
        data: &'a [u8],
        width: usize,
        height: usize,
        stride: usize,
        format: PixelFormat,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SixelError::InvalidDimensions { width, height });
        }
        let row_len = width
            .checked_mul(format.channels())
            .ok_or(SixelError::InvalidDimensions { width, height })?;
        if stride < row_len {
            return Err(SixelError::InvalidStride {
                stride,
                min: row_len,
            });
        }
        // The last row does not need its padding.
        let expected = stride
            .checked_mul(height - 1)
            .and_then(|n| n.checked_add(row_len))
            .ok_or(SixelError::InvalidDimensions { width, height })?;
        if data.len() < expected {
            return Err(SixelError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
            format,
        })
    }

    /// Tightly packed frame (`stride == width * channels`).
    pub fn packed(data: &'a [u8], width: usize, height: usize, format: PixelFormat) -> Result<Self> {
        Self::new(data, width, height, width.saturating_mul(format.channels()), format)
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
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Samples of row `y` without padding.
    ///
    /// # Panics
    /// Panics if `y >= height`.
    #[inline]
    pub fn row(&self, y: usize) -> &'a [u8] {
        let start = y * self.stride;
        &self.data[start..start + self.width * self.format.channels()]
    }

    /// Rows from top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        (0..self.height).map(move |y| self.row(y))
    }
}
