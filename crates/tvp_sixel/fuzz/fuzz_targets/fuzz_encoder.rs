#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tvp_sixel::{
    sixel_encode, ColorMode, DiffusionMethod, EncodeOptions, PixelBuffer, PixelFormat,
};

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    width: u8,
    height: u8,
    stride_pad: u8,
    rgb: bool,
    levels: u8,
    dither: bool,
    lane_width: u8,
    pixels: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    let width = (input.width as usize).clamp(1, 128);
    let height = (input.height as usize).clamp(1, 128);
    let format = if input.rgb {
        PixelFormat::Rgb888
    } else {
        PixelFormat::Gray8
    };
    let stride = width * format.channels() + input.stride_pad as usize % 8;

    // Short buffers must be rejected, never read past
    let image = match PixelBuffer::new(&input.pixels, width, height, stride, format) {
        Ok(image) => image,
        Err(_) => return,
    };

    let mode = if input.rgb {
        ColorMode::Xterm256
    } else {
        ColorMode::Gray {
            levels: input.levels,
            diffusion: if input.dither {
                DiffusionMethod::FloydSteinberg
            } else {
                DiffusionMethod::None
            },
        }
    };
    let opts = EncodeOptions {
        mode,
        lane_width: input.lane_width as usize,
    };

    // Zero levels or lanes are errors, everything else must encode
    match sixel_encode(&image, &opts) {
        Ok(sixel) => assert!(sixel.ends_with(b"\x1b\\")),
        Err(_) => assert!(input.lane_width == 0 || (!input.rgb && input.levels == 0)),
    }
});
