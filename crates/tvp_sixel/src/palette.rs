//! Fixed SIXEL palettes and their color-register preamble.

use crate::{Result, SixelError};

/// Color type for palette entries (RGB).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    #[inline]
    pub const fn gray(v: u8) -> Self {
        Self { r: v, g: v, b: v }
    }
}

/// Component values of the 6x6x6 color cube.
pub const CUBE_LEVELS: [u8; 6] = [0, 51, 102, 153, 204, 255];

/// First index of the color cube in the 256-color table.
pub const CUBE_START: usize = 16;

/// First index of the 24-step gray ramp in the 256-color table.
pub const GRAY_RAMP_START: usize = 232;

/// The standard terminal 256-color table.
///
/// 16 base colors, a 6x6x6 cube at `16 + 36r + 6g + b`, then a 24-step gray
/// ramp at `232..=255` with value `round(255 * k / 24)`.
pub const XTERM_256: [Rgb; 256] = xterm_table();

const fn xterm_table() -> [Rgb; 256] {
    let base = [
        Rgb::new(0x00, 0x00, 0x00),
        Rgb::new(0x80, 0x00, 0x00),
        Rgb::new(0x00, 0x80, 0x00),
        Rgb::new(0x80, 0x80, 0x00),
        Rgb::new(0x00, 0x00, 0x80),
        Rgb::new(0x80, 0x00, 0x80),
        Rgb::new(0x00, 0x80, 0x80),
        Rgb::new(0xC0, 0xC0, 0xC0),
        Rgb::new(0x80, 0x80, 0x80),
        Rgb::new(0xFF, 0x00, 0x00),
        Rgb::new(0x00, 0xFF, 0x00),
        Rgb::new(0xFF, 0xFF, 0x00),
        Rgb::new(0x00, 0x00, 0xFF),
        Rgb::new(0xFF, 0x00, 0xFF),
        Rgb::new(0x00, 0xFF, 0xFF),
        Rgb::new(0xFF, 0xFF, 0xFF),
    ];

    let mut table = [Rgb::gray(0); 256];
    let mut i = 0;
    while i < 16 {
        table[i] = base[i];
        i += 1;
    }

    let mut r = 0;
    while r < 6 {
        let mut g = 0;
        while g < 6 {
            let mut b = 0;
            while b < 6 {
                table[CUBE_START + 36 * r + 6 * g + b] =
                    Rgb::new(CUBE_LEVELS[r], CUBE_LEVELS[g], CUBE_LEVELS[b]);
                b += 1;
            }
            g += 1;
        }
        r += 1;
    }

    let mut k = 0;
    while k < 24 {
        table[GRAY_RAMP_START + k] = Rgb::gray(((255 * k + 12) / 24) as u8);
        k += 1;
    }
    table
}

/// An immutable, index-addressable set of color registers.
///
/// The preamble (one `#i;2;r;g;b` definition per register, ascending) is
/// rendered once at construction and reused for every frame.
#[derive(Clone, Debug)]
pub struct Palette {
    entries: Vec<Rgb>,
    preamble: String,
    gray_levels: Option<u8>,
}

impl Palette {
    /// `levels + 1` evenly spaced gray registers from black to white.
    ///
    /// Register `i` is defined at `round(100 * i / levels)` percent and its
    /// entry holds the displayed value `round(255 * i / levels)`, so the top
    /// register is always white. This is not the value the dithering engine
    /// measures error against: [`LinearQuantizer::dequantize`] uses
    /// `i * (255 / levels)`, which falls short of the entry when `levels`
    /// does not divide 255.
    ///
    /// [`LinearQuantizer::dequantize`]: crate::quant::Quantize::dequantize
    pub fn gray(levels: u8) -> Result<Self> {
        if levels == 0 {
            return Err(SixelError::InvalidLevelCount(levels));
        }
        let n = levels as usize;
        let mut entries = Vec::with_capacity(n + 1);
        let mut preamble = String::with_capacity((n + 1) * 16);
        for i in 0..=n {
            entries.push(Rgb::gray(((255 * i + n / 2) / n) as u8));
            let s = (200 * i + n) / (2 * n);
            write_register(&mut preamble, i, s, s, s);
        }
        Ok(Self {
            entries,
            preamble,
            gray_levels: Some(levels),
        })
    }

    /// The fixed 256-entry terminal palette.
    pub fn xterm256() -> Self {
        let mut preamble = String::with_capacity(256 * 16);
        for (i, c) in XTERM_256.iter().enumerate() {
            write_register(&mut preamble, i, percent(c.r), percent(c.g), percent(c.b));
        }
        Self {
            entries: XTERM_256.to_vec(),
            preamble,
            gray_levels: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest valid register index.
    #[inline]
    pub fn ncols(&self) -> u8 {
        (self.entries.len() - 1) as u8
    }

    /// Level count this palette was built from, for gray palettes.
    #[inline]
    pub fn gray_levels(&self) -> Option<u8> {
        self.gray_levels
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<Rgb> {
        self.entries.get(index).copied()
    }

    #[inline]
    pub fn entries(&self) -> &[Rgb] {
        &self.entries
    }

    /// Color register definitions, ready to follow the DCS introducer.
    #[inline]
    pub fn preamble(&self) -> &str {
        &self.preamble
    }
}

/// 0-255 component to the 0-100 SIXEL percentage scale, rounded half-up.
#[inline]
fn percent(c: u8) -> usize {
    (200 * c as usize + 255) / 510
}

fn write_register(out: &mut String, index: usize, r: usize, g: usize, b: usize) {
    out.push('#');
    write_number(out, index);
    out.push_str(";2;");
    write_number(out, r);
    out.push(';');
    write_number(out, g);
    out.push(';');
    write_number(out, b);
}

/// Fast number to string without allocation
#[inline]
pub(crate) fn write_number(out: &mut String, n: usize) {
    let mut buf = [0u8; 20];
    let digits = format_decimal(&mut buf, n);
    for &d in digits {
        out.push(d as char);
    }
}

/// Byte-buffer variant of [`write_number`].
#[inline]
pub(crate) fn push_number(out: &mut Vec<u8>, n: usize) {
    let mut buf = [0u8; 20];
    out.extend_from_slice(format_decimal(&mut buf, n));
}

/// Render `n` as ASCII decimal digits into the tail of `buf`.
#[inline]
pub(crate) fn format_decimal(buf: &mut [u8; 20], mut n: usize) -> &[u8] {
    let mut i = buf.len();
    loop {
        i -= 1;
        buf[i] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    &buf[i..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_gray_preamble() {
        let palette = Palette::gray(5).unwrap();
        assert_eq!(palette.len(), 6);
        assert_eq!(palette.ncols(), 5);
        assert_eq!(
            palette.preamble(),
            "#0;2;0;0;0#1;2;20;20;20#2;2;40;40;40#3;2;60;60;60#4;2;80;80;80#5;2;100;100;100"
        );
    }

    #[test]
    fn test_gray_preamble_rounds_half_up() {
        let palette = Palette::gray(8).unwrap();
        // 100 * 1 / 8 = 12.5
        assert!(palette.preamble().starts_with("#0;2;0;0;0#1;2;13;13;13#"));
        let palette = Palette::gray(3).unwrap();
        assert_eq!(
            palette.preamble(),
            "#0;2;0;0;0#1;2;33;33;33#2;2;67;67;67#3;2;100;100;100"
        );
    }

    #[test]
    fn test_gray_single_level() {
        let palette = Palette::gray(1).unwrap();
        assert_eq!(palette.entries(), &[Rgb::gray(0), Rgb::gray(255)]);
        assert_eq!(palette.preamble(), "#0;2;0;0;0#1;2;100;100;100");
    }

    #[test]
    fn test_gray_entries_are_displayed_levels() {
        let palette = Palette::gray(4).unwrap();
        let values: Vec<u8> = palette.entries().iter().map(|c| c.r).collect();
        assert_eq!(values, vec![0, 64, 128, 191, 255]);
        assert!(palette.preamble().ends_with("#3;2;75;75;75#4;2;100;100;100"));

        // diffusion reference levels step by 255 / 4 = 63 instead
        use crate::quant::{LinearQuantizer, Quantize};
        let q = LinearQuantizer::new(4).unwrap();
        let reference: Vec<u8> = (0..=4).map(|i| q.dequantize(i)).collect();
        assert_eq!(reference, vec![0, 63, 126, 189, 252]);
    }

    #[test]
    fn test_gray_zero_levels() {
        assert!(matches!(
            Palette::gray(0),
            Err(SixelError::InvalidLevelCount(0))
        ));
    }

    #[test]
    fn test_xterm_cube_and_ramp() {
        assert_eq!(XTERM_256[16], Rgb::new(0, 0, 0));
        assert_eq!(XTERM_256[16 + 36 * 5 + 6 * 2 + 1], Rgb::new(255, 102, 51));
        assert_eq!(XTERM_256[231], Rgb::new(255, 255, 255));
        assert_eq!(XTERM_256[232], Rgb::gray(0));
        // round(255 * 12 / 24) = round(127.5)
        assert_eq!(XTERM_256[244], Rgb::gray(128));
        // round(255 * 23 / 24) = round(244.375)
        assert_eq!(XTERM_256[255], Rgb::gray(244));
        assert_eq!(XTERM_256[9], Rgb::new(255, 0, 0));
    }

    #[test]
    fn test_xterm_preamble() {
        let palette = Palette::xterm256();
        assert_eq!(palette.len(), 256);
        assert_eq!(palette.ncols(), 255);
        assert_eq!(palette.gray_levels(), None);
        assert!(palette.preamble().starts_with("#0;2;0;0;0#1;2;50;0;0#"));
        assert!(palette.preamble().ends_with("#255;2;96;96;96"));
        assert_eq!(palette.preamble().matches('#').count(), 256);
    }

    #[test]
    fn test_write_number() {
        let mut s = String::new();
        write_number(&mut s, 0);
        s.push(' ');
        write_number(&mut s, 1234567);
        assert_eq!(s, "0 1234567");
    }
}
