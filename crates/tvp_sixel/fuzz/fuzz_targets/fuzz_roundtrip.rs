#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tvp_sixel::encoder::{SIXEL_INTRODUCER, SIXEL_TERMINATOR};
use tvp_sixel::{expand_segment, ColorMode, EncodeOptions, PixelBuffer, PixelFormat, SixelEncoder};

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    width: u8,
    height: u8,
    levels: u8,
    pixels: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    let width = (input.width as usize).clamp(1, 64);
    let height = (input.height as usize).clamp(1, 64);
    let levels = input.levels.max(1);

    if input.pixels.len() < width * height {
        return;
    }
    let pixels = &input.pixels[..width * height];
    let image = PixelBuffer::packed(pixels, width, height, PixelFormat::Gray8)
        .expect("packed buffer is large enough");

    let opts = EncodeOptions {
        mode: ColorMode::Gray {
            levels,
            diffusion: Default::default(),
        },
        ..Default::default()
    };
    let mut encoder = SixelEncoder::new(opts).expect("valid options");
    let sixel = encoder.encode_to_vec(&image).expect("encode");

    let preamble = encoder.palette().preamble().as_bytes();
    let body = &sixel[SIXEL_INTRODUCER.len()..sixel.len() - SIXEL_TERMINATOR.len()];
    let mut rest = &body[preamble.len()..];

    // Every pixel must be painted by exactly one register
    let mut painted = vec![None; width * height];
    let mut segment_no = 0;
    while !rest.is_empty() {
        let (segment, used) = expand_segment(rest, width).expect("encoder output must parse");
        rest = &rest[used..];

        let band = segment_no / (levels as usize + 1);
        assert_eq!(segment.color, segment_no % (levels as usize + 1));
        assert_eq!(segment.sixels.len(), width);
        for (col, mask) in segment.masks().into_iter().enumerate() {
            for bit in 0..6 {
                if mask & (1 << bit) != 0 {
                    let row = band * 6 + bit;
                    assert!(row < height);
                    let px = &mut painted[row * width + col];
                    assert!(px.is_none());
                    *px = Some(segment.color as u8);
                }
            }
        }
        segment_no += 1;
    }

    let decoded: Vec<u8> = painted.into_iter().map(|px| px.expect("unpainted pixel")).collect();
    assert_eq!(decoded.as_slice(), encoder.indices());
});
