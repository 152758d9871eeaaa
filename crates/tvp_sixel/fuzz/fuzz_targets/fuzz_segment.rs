#![no_main]

use libfuzzer_sys::fuzz_target;
use tvp_sixel::expand_segment;

const MAX_WIDTH: usize = 4096;

fuzz_target!(|data: &[u8]| {
    // The segment parser should never panic, regardless of input
    if let Ok((segment, used)) = expand_segment(data, MAX_WIDTH) {
        assert!(used <= data.len());
        assert!(segment.sixels.len() <= MAX_WIDTH);
        assert!(segment.terminator == b'$' || segment.terminator == b'-');
    }
});
