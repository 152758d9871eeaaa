//! SIXEL frame encoder.
//!
//! A [`SixelEncoder`] owns everything that survives between frames: the
//! palette (and its rendered preamble), the working buffer, the band
//! encoder's scratch and the output buffer. Buffers are only resized when
//! the frame dimensions change.
//!
//! Each frame is emitted as:
//!
//! ```text
//! ESC P q  <palette preamble>  <band 0: #0..$ #1..$ ... #n..->  ...  ESC \
//! ```

use std::io::Write;

use crate::band::{bands, BandEncoder, SIMD_LANES};
use crate::dither::DitherBuffer;
use crate::palette::Palette;
use crate::pixel::{PixelBuffer, PixelFormat};
use crate::quant::{truncate_xterm, LinearQuantizer};
use crate::Result;

/// DCS introducer selecting SIXEL mode.
pub const SIXEL_INTRODUCER: &[u8] = b"\x1bPq";

/// String terminator: ESC \
pub const SIXEL_TERMINATOR: &[u8] = b"\x1b\\";

/// How gray frames are reduced to palette levels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DiffusionMethod {
    /// Floyd-Steinberg error diffusion.
    #[default]
    FloydSteinberg,
    /// Round every pixel to the nearest level independently.
    None,
}

/// Palette and input format of a pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorMode {
    /// 8-bit gray input on `levels + 1` gray registers.
    Gray {
        levels: u8,
        diffusion: DiffusionMethod,
    },
    /// 24-bit RGB input on the fixed 256-color terminal palette.
    Xterm256,
}

impl Default for ColorMode {
    fn default() -> Self {
        ColorMode::Gray {
            levels: 5,
            diffusion: DiffusionMethod::FloydSteinberg,
        }
    }
}

impl ColorMode {
    /// Input format this mode accepts.
    pub fn input_format(&self) -> PixelFormat {
        match self {
            ColorMode::Gray { .. } => PixelFormat::Gray8,
            ColorMode::Xterm256 => PixelFormat::Rgb888,
        }
    }
}

/// Options for the SIXEL encoder.
#[derive(Clone, Debug)]
pub struct EncodeOptions {
    /// Palette and quantization pipeline.
    pub mode: ColorMode,

    /// Columns packed per step by the band encoder (at least 1).
    ///
    /// Output is identical for every lane width; 16 selects the SSE2 kernel
    /// on x86.
    pub lane_width: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            mode: ColorMode::default(),
            lane_width: SIMD_LANES,
        }
    }
}

#[derive(Clone, Debug)]
enum Pipeline {
    Gray {
        quantizer: LinearQuantizer,
        diffusion: DiffusionMethod,
    },
    Xterm256,
}

/// Reusable SIXEL codec context.
///
/// Not meant to be shared between threads while encoding; give each producer
/// its own encoder.
#[derive(Clone, Debug)]
pub struct SixelEncoder {
    options: EncodeOptions,
    palette: Palette,
    pipeline: Pipeline,
    work: DitherBuffer,
    bands: BandEncoder,
    out: Vec<u8>,
}

impl SixelEncoder {
    pub fn new(options: EncodeOptions) -> Result<Self> {
        let (palette, pipeline) = match options.mode {
            ColorMode::Gray { levels, diffusion } => (
                Palette::gray(levels)?,
                Pipeline::Gray {
                    quantizer: LinearQuantizer::new(levels)?,
                    diffusion,
                },
            ),
            ColorMode::Xterm256 => (Palette::xterm256(), Pipeline::Xterm256),
        };
        let bands = BandEncoder::new(options.lane_width)?;
        Ok(Self {
            options,
            palette,
            pipeline,
            work: DitherBuffer::new(),
            bands,
            out: Vec::new(),
        })
    }

    #[inline]
    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    #[inline]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Palette indices of the last encoded frame, row-major.
    #[inline]
    pub fn indices(&self) -> &[u8] {
        self.work.as_slice()
    }

    /// Encode a frame and hand it to `writer` in a single write.
    ///
    /// Nothing is written if the frame is rejected. A failed write leaves the
    /// terminal with a partial sequence; retry by encoding the frame again.
    pub fn encode<W: Write>(&mut self, image: &PixelBuffer<'_>, writer: &mut W) -> Result<()> {
        self.render(image)?;
        writer.write_all(&self.out)?;
        writer.flush()?;
        Ok(())
    }

    /// Encode a frame into a new byte vector.
    pub fn encode_to_vec(&mut self, image: &PixelBuffer<'_>) -> Result<Vec<u8>> {
        self.render(image)?;
        Ok(self.out.clone())
    }

    fn render(&mut self, image: &PixelBuffer<'_>) -> Result<()> {
        self.load(image)?;

        let (width, height) = (self.work.width(), self.work.height());
        let ncols = self.palette.ncols();

        self.out.clear();
        self.out.extend_from_slice(SIXEL_INTRODUCER);
        self.out.extend_from_slice(self.palette.preamble().as_bytes());
        for band in bands(self.work.as_slice(), width, height) {
            self.bands.encode_band(&band, ncols, &mut self.out)?;
        }
        self.out.extend_from_slice(SIXEL_TERMINATOR);

        log::trace!(
            "encoded {}x{} frame: {} bands, {} registers, {} bytes",
            width,
            height,
            height.div_ceil(crate::SIXEL_BAND_HEIGHT),
            self.palette.len(),
            self.out.len()
        );
        Ok(())
    }

    /// Fill the working buffer with palette indices.
    fn load(&mut self, image: &PixelBuffer<'_>) -> Result<()> {
        match &self.pipeline {
            Pipeline::Gray {
                quantizer,
                diffusion,
            } => {
                self.work.load_gray(image)?;
                match diffusion {
                    DiffusionMethod::FloydSteinberg => self.work.dither(quantizer)?,
                    DiffusionMethod::None => self.work.quantize(quantizer),
                }
            }
            Pipeline::Xterm256 => self.work.map_rgb(image, truncate_xterm)?,
        }
        Ok(())
    }
}

/// Encode one frame with a throwaway encoder.
///
/// # Example
/// ```
/// use tvp_sixel::{sixel_encode, ColorMode, EncodeOptions, PixelBuffer, PixelFormat};
///
/// let rgb = [255u8, 0, 0, 0, 0, 255]; // red, blue
/// let image = PixelBuffer::packed(&rgb, 2, 1, PixelFormat::Rgb888)?;
/// let opts = EncodeOptions {
///     mode: ColorMode::Xterm256,
///     ..Default::default()
/// };
/// let sixel = sixel_encode(&image, &opts)?;
/// assert!(sixel.ends_with(b"\x1b\\"));
/// # Ok::<(), tvp_sixel::SixelError>(())
/// ```
#[must_use = "this returns the encoded SIXEL bytes"]
pub fn sixel_encode(image: &PixelBuffer<'_>, opts: &EncodeOptions) -> Result<Vec<u8>> {
    SixelEncoder::new(opts.clone())?.encode_to_vec(image)
}

/// Encode one frame straight into `writer`.
pub fn sixel_encode_to<W: Write>(
    image: &PixelBuffer<'_>,
    opts: &EncodeOptions,
    writer: &mut W,
) -> Result<()> {
    SixelEncoder::new(opts.clone())?.encode(image, writer)
}
