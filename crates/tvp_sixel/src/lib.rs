//! # tvp_sixel
//!
//! A SIXEL terminal image codec built for pushing video frames to a terminal.
//!
//! ## Features
//!
//! - **Palettes**: evenly spaced gray levels or the fixed xterm 256-color table
//! - **Quantizer**: half-up linear gray quantization and luminance-aware 256-color truncation
//! - **Dithering**: raster-order Floyd-Steinberg with saturating error diffusion
//! - **Encoder**: lane-chunked sixel packing (SSE2 on x86), edge detection and run-length compression
//!
//! ## Quick Start
//!
//! ```
//! use tvp_sixel::{sixel_encode, EncodeOptions, PixelBuffer, PixelFormat};
//!
//! // 4x2 horizontal gray ramp
//! let gray = [0u8, 85, 170, 255, 0, 85, 170, 255];
//! let image = PixelBuffer::new(&gray, 4, 2, 4, PixelFormat::Gray8)?;
//! let sixel = sixel_encode(&image, &EncodeOptions::default())?;
//! assert!(sixel.starts_with(b"\x1bPq"));
//! assert!(sixel.ends_with(b"\x1b\\"));
//! # Ok::<(), tvp_sixel::SixelError>(())
//! ```
//!
//! For a stream of frames, keep a [`SixelEncoder`] around: it owns the palette
//! and reuses its working buffers as long as the frame size does not change.

use thiserror::Error;

pub mod band;
pub mod dither;
pub mod encoder;
pub mod palette;
pub mod pixel;
pub mod quant;

pub use band::{bands, expand_segment, Band, BandEncoder, EdgeList, RowView, Segment};
pub use dither::{diffuse_error, diffusion_terms, floyd_steinberg, DitherBuffer};
pub use encoder::{
    sixel_encode, sixel_encode_to, ColorMode, DiffusionMethod, EncodeOptions, SixelEncoder,
};
pub use palette::{Palette, Rgb};
pub use pixel::{PixelBuffer, PixelFormat};
pub use quant::{luminance, select, truncate_xterm, LinearQuantizer, Quantize};

/// Errors that can occur during SIXEL encoding.
#[derive(Debug, Error)]
pub enum SixelError {
    /// Invalid image dimensions (width or height is zero)
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    /// Buffer size doesn't match expected size for dimensions and stride
    #[error("buffer size mismatch: expected at least {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Row stride shorter than one row of pixels
    #[error("invalid row stride {stride}, need at least {min}")]
    InvalidStride { stride: usize, min: usize },

    /// Sample layout the codec cannot handle
    #[error("unsupported pixel format: {channels} channel(s) at {bit_depth} bits")]
    UnsupportedFormat { channels: u8, bit_depth: u8 },

    /// Pixel format does not match the configured color mode
    #[error("pixel format mismatch: expected {expected:?}, got {actual:?}")]
    FormatMismatch {
        expected: PixelFormat,
        actual: PixelFormat,
    },

    /// Gray palettes need at least one step between black and white
    #[error("invalid palette level count {0}, must be at least 1")]
    InvalidLevelCount(u8),

    /// Palette register outside the palette
    #[error("palette index {index} out of range 0..={ncols}")]
    PaletteIndexOutOfRange { index: usize, ncols: usize },

    /// Packing lane width must be at least one column
    #[error("invalid lane width {0}")]
    InvalidLaneWidth(usize),

    /// Malformed sixel segment
    #[error("invalid SIXEL data: {0}")]
    InvalidData(String),

    /// Internal consistency check failed
    #[error("internal invariant violated: {0}")]
    Internal(&'static str),

    /// Writing the encoded frame failed
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for SIXEL operations.
pub type Result<T> = core::result::Result<T, SixelError>;

/// Number of image rows packed into one sixel character.
pub const SIXEL_BAND_HEIGHT: usize = 6;

/// Offset added to a 6-bit column mask to make it printable.
pub const SIXEL_BASE: u8 = 0x3F;
