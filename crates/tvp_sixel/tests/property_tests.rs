use proptest::prelude::*;
use tvp_sixel::band::SIMD_LANES;
use tvp_sixel::*;

fn index_image(
    max_w: usize,
    max_h: usize,
    ncols: u8,
) -> impl Strategy<Value = (usize, usize, Vec<u8>)> {
    (1..=max_w, 1..=max_h).prop_flat_map(move |(w, h)| {
        (
            Just(w),
            Just(h),
            proptest::collection::vec(0..=ncols, w * h),
        )
    })
}

proptest! {
    #[test]
    fn test_select_error_within_rounded_half_step(x in any::<u8>(), levels in 1u8..=255) {
        let n = 255 / levels;
        let q = select(x, n);
        let back = q as i32 * n as i32;
        prop_assert!((x as i32 - back).abs() <= (n as i32 + 1) / 2);
        prop_assert_eq!(q, (x / n).saturating_add(u8::from(x % n >= n / 2)));
    }

    #[test]
    fn test_quantizer_error_bounded(x in any::<u8>(), levels in 1u8..=64) {
        let q = LinearQuantizer::new(levels).unwrap();
        let idx = q.quantize(x);
        prop_assert!(idx <= levels);
        let err = x as i32 - q.dequantize(idx) as i32;
        // the top level absorbs the 255 % levels remainder
        prop_assert!(err.abs() <= q.divisor() as i32 + 255 % levels as i32);
    }

    #[test]
    fn test_diffused_error_is_conserved_up_to_truncation(err in -255i16..=255) {
        // interior pixel with all four neighbors and no saturation
        let mut buf = [120u8; 6];
        diffuse_error(&mut buf, 3, 2, 0, 1, err);
        let delta: i32 = buf.iter().map(|&v| v as i32 - 120).sum();
        let terms: i32 = diffusion_terms(err).iter().map(|&t| t as i32).sum();
        prop_assert_eq!(delta, terms);
        prop_assert!((err as i32 - terms).abs() <= 3);
        prop_assert_eq!(buf[0], 120);
        prop_assert_eq!(buf[1], 120);
    }

    #[test]
    fn test_dithered_indices_stay_in_palette(
        (w, h, pixels) in index_image(40, 20, 255),
        levels in 1u8..=16,
    ) {
        let mut buf = pixels;
        let q = LinearQuantizer::new(levels).unwrap();
        floyd_steinberg(&mut buf, w, h, &q).unwrap();
        prop_assert!(buf.iter().all(|&i| i <= levels));
    }

    #[test]
    fn test_edge_list_invariants(
        (w, h, indices) in index_image(70, 6, 3),
        lanes in 1usize..=48,
        pc in 0u8..=3,
    ) {
        let band = Band::new(&indices, w, h, 0);
        let mut enc = BandEncoder::new(lanes).unwrap();
        let edges = enc.detect_edges(&band, pc).unwrap().clone();

        let positions = edges.positions();
        prop_assert_eq!(positions.first(), Some(&0));
        prop_assert_eq!(positions.last(), Some(&w));
        prop_assert_eq!(positions.len(), edges.values().len() + 1);
        prop_assert!(positions.windows(2).all(|p| p[0] < p[1]));
        prop_assert!(edges.values().windows(2).all(|v| v[0] != v[1]));

        let mut expanded = Vec::with_capacity(w);
        for (len, ch) in edges.runs() {
            expanded.extend(std::iter::repeat_n(ch, len));
        }
        let direct: Vec<u8> = (0..w).map(|c| band.sixel(c, pc)).collect();
        prop_assert_eq!(expanded, direct);
    }

    #[test]
    fn test_segment_round_trip((w, h, indices) in index_image(90, 6, 4), pc in 0u8..=4) {
        let band = Band::new(&indices, w, h, 0);
        let mut enc = BandEncoder::new(SIMD_LANES).unwrap();
        let mut out = Vec::new();
        enc.encode_segment(&band, pc, 4, &mut out).unwrap();

        let (segment, used) = expand_segment(&out, w).unwrap();
        prop_assert_eq!(used, out.len());
        prop_assert_eq!(segment.color, pc as usize);
        prop_assert_eq!(segment.terminator, if pc == 4 { b'-' } else { b'$' });
        let masks: Vec<u8> = (0..w).map(|c| band.mask(c, pc)).collect();
        prop_assert_eq!(segment.masks(), masks);
    }

    #[test]
    fn test_band_output_independent_of_lane_width(
        (w, h, indices) in index_image(80, 13, 2),
        lanes in 1usize..=40,
    ) {
        let encode = |lanes: usize| {
            let mut enc = BandEncoder::new(lanes).unwrap();
            let mut out = Vec::new();
            for band in bands(&indices, w, h) {
                enc.encode_band(&band, 2, &mut out).unwrap();
            }
            out
        };
        prop_assert_eq!(encode(lanes), encode(SIMD_LANES));
    }

    #[test]
    fn test_truncation_skips_base_colors(r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
        let idx = truncate_xterm(Rgb::new(r, g, b));
        prop_assert!(idx >= 16);
        if r == g && g == b {
            let ramp = 232 + ((luminance(Rgb::gray(r)) as u32 * 8 + 42) / 85).min(23) as u8;
            let cube = 16 + 43 * ((r as u16 + 25) / 51) as u8;
            prop_assert!(idx == ramp || idx == cube, "gray {} -> {}", r, idx);
        }
    }
}
