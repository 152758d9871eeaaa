//! Band encoder: packs 6-row bands into sixel characters, finds the columns
//! where the character changes and run-length encodes the result.
//!
//! One segment is produced per band and palette register:
//!
//! ```text
//! #<pc><runs>$     more registers follow in this band
//! #<pc><runs>-     last register, advance to the next band
//! ```
//!
//! Runs of one to three columns are written literally, longer runs as
//! `!<count><char>`.

use crate::palette::push_number;
use crate::{Result, SixelError, SIXEL_BAND_HEIGHT, SIXEL_BASE};

#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::{
    __m128i, _mm_add_epi8, _mm_and_si128, _mm_cmpeq_epi8, _mm_loadu_si128, _mm_or_si128,
    _mm_set1_epi8, _mm_setzero_si128, _mm_storeu_si128,
};

#[cfg(target_arch = "x86")]
use core::arch::x86::{
    __m128i, _mm_add_epi8, _mm_and_si128, _mm_cmpeq_epi8, _mm_loadu_si128, _mm_or_si128,
    _mm_set1_epi8, _mm_setzero_si128, _mm_storeu_si128,
};

/// Column count of the SSE2 packing kernel.
pub const SIMD_LANES: usize = 16;

/// Initial carry; never equal to a sixel character.
const NO_CARRY: u8 = 0;

/// One row of a band: either a full-width slice or past the bottom of the image.
#[derive(Clone, Copy, Debug)]
pub enum RowView<'a> {
    Present(&'a [u8]),
    Absent,
}

impl RowView<'_> {
    #[inline]
    fn member(&self, col: usize, pc: u8) -> u8 {
        match self {
            RowView::Present(row) => u8::from(row[col] == pc),
            RowView::Absent => 0,
        }
    }
}

/// Up to six consecutive rows of an index buffer.
#[derive(Clone, Copy, Debug)]
pub struct Band<'a> {
    rows: [RowView<'a>; SIXEL_BAND_HEIGHT],
    width: usize,
}

impl<'a> Band<'a> {
    /// The band whose first row is `top`.
    ///
    /// # Panics
    /// Panics if `indices` holds fewer than `width * height` bytes.
    pub fn new(indices: &'a [u8], width: usize, height: usize, top: usize) -> Self {
        let rows = std::array::from_fn(|k| {
            let y = top + k;
            if y < height {
                RowView::Present(&indices[y * width..(y + 1) * width])
            } else {
                RowView::Absent
            }
        });
        Self { rows, width }
    }

    /// Band from explicit row views. Present rows must be `width` long.
    pub fn from_rows(rows: [RowView<'a>; SIXEL_BAND_HEIGHT], width: usize) -> Self {
        Self { rows, width }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn rows(&self) -> &[RowView<'a>; SIXEL_BAND_HEIGHT] {
        &self.rows
    }

    /// Number of rows inside the image.
    pub fn valid_rows(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| matches!(r, RowView::Present(_)))
            .count()
    }

    /// 6-bit membership mask of column `col` for register `pc`.
    #[inline]
    pub fn mask(&self, col: usize, pc: u8) -> u8 {
        self.rows
            .iter()
            .enumerate()
            .fold(0, |acc, (bit, row)| acc | (row.member(col, pc) << bit))
    }

    /// Printable sixel character of column `col` for register `pc`.
    #[inline]
    pub fn sixel(&self, col: usize, pc: u8) -> u8 {
        self.mask(col, pc) + SIXEL_BASE
    }
}

/// Split an index buffer into bands, top to bottom.
pub fn bands(indices: &[u8], width: usize, height: usize) -> impl Iterator<Item = Band<'_>> {
    (0..height)
        .step_by(SIXEL_BAND_HEIGHT)
        .map(move |top| Band::new(indices, width, height, top))
}

/// Columns where a band's sixel character changes.
///
/// `positions` ends with a sentinel equal to the band width, so there is
/// always exactly one more position than there are values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EdgeList {
    positions: Vec<usize>,
    values: Vec<u8>,
}

impl EdgeList {
    pub fn with_capacity(width: usize) -> Self {
        Self {
            positions: Vec::with_capacity(width + 1),
            values: Vec::with_capacity(width),
        }
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.values.clear();
    }

    #[inline]
    fn push(&mut self, position: usize, value: u8) {
        self.positions.push(position);
        self.values.push(value);
    }

    fn finish(&mut self, width: usize) {
        self.positions.push(width);
    }

    #[inline]
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    #[inline]
    pub fn values(&self) -> &[u8] {
        &self.values
    }

    /// Verify the sentinel and ordering invariants.
    pub fn check(&self, width: usize) -> Result<()> {
        if self.values.len() + 1 != self.positions.len() {
            return Err(SixelError::Internal("edge vectors don't match"));
        }
        if self.positions.last() != Some(&width) {
            return Err(SixelError::Internal("edge list sentinel is not the band width"));
        }
        if self.positions.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SixelError::Internal("edge positions not strictly increasing"));
        }
        Ok(())
    }

    /// `(run length, character)` pairs, left to right.
    pub fn runs(&self) -> impl Iterator<Item = (usize, u8)> + '_ {
        self.positions
            .windows(2)
            .zip(&self.values)
            .map(|(w, &v)| (w[1] - w[0], v))
    }
}

/// Per-register segment encoder with reusable scratch.
#[derive(Clone, Debug)]
pub struct BandEncoder {
    lane_width: usize,
    chunk: Vec<u8>,
    edges: EdgeList,
}

impl BandEncoder {
    /// `lane_width` columns are packed per step; any value >= 1 yields
    /// identical output.
    pub fn new(lane_width: usize) -> Result<Self> {
        if lane_width == 0 {
            return Err(SixelError::InvalidLaneWidth(lane_width));
        }
        Ok(Self {
            lane_width,
            chunk: vec![0; lane_width],
            edges: EdgeList::default(),
        })
    }

    #[inline]
    pub fn lane_width(&self) -> usize {
        self.lane_width
    }

    /// Build the edge list of `band` for register `pc`.
    pub fn detect_edges(&mut self, band: &Band<'_>, pc: u8) -> Result<&EdgeList> {
        let width = band.width();
        let lanes = self.lane_width;
        self.edges.clear();

        let mut carry = NO_CARRY;
        let mut c = 0;
        while c + lanes <= width {
            pack_chunk(band.rows(), c, pc, &mut self.chunk);
            for (i, &ch) in self.chunk.iter().enumerate() {
                if ch != carry {
                    self.edges.push(c + i, ch);
                }
                carry = ch;
            }
            c += lanes;
        }

        for col in c..width {
            let ch = band.sixel(col, pc);
            if ch != carry {
                self.edges.push(col, ch);
            }
            carry = ch;
        }

        self.edges.finish(width);
        self.edges.check(width)?;
        Ok(&self.edges)
    }

    /// Append the segment of register `pc` to `out`.
    pub fn encode_segment(
        &mut self,
        band: &Band<'_>,
        pc: u8,
        ncols: u8,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        if pc > ncols {
            return Err(SixelError::PaletteIndexOutOfRange {
                index: pc as usize,
                ncols: ncols as usize,
            });
        }
        self.detect_edges(band, pc)?;

        out.push(b'#');
        push_number(out, pc as usize);
        write_runs(&self.edges, out);
        out.push(if pc == ncols { b'-' } else { b'$' });
        Ok(())
    }

    /// Append the segments of every register `0..=ncols` to `out`.
    pub fn encode_band(&mut self, band: &Band<'_>, ncols: u8, out: &mut Vec<u8>) -> Result<()> {
        for pc in 0..=ncols {
            self.encode_segment(band, pc, ncols, out)?;
        }
        Ok(())
    }
}

fn write_runs(edges: &EdgeList, out: &mut Vec<u8>) {
    for (len, val) in edges.runs() {
        match len {
            0..=3 => out.extend(std::iter::repeat_n(val, len)),
            _ => {
                out.push(b'!');
                push_number(out, len);
                out.push(val);
            }
        }
    }
}

/// Pack `chunk.len()` columns starting at `start` into sixel characters.
fn pack_chunk(rows: &[RowView<'_>; SIXEL_BAND_HEIGHT], start: usize, pc: u8, chunk: &mut [u8]) {
    #[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
    {
        if chunk.len() == SIMD_LANES && try_pack_chunk_simd(rows, start, pc, chunk) {
            return;
        }
    }

    pack_chunk_scalar(rows, start, pc, chunk);
}

fn pack_chunk_scalar(
    rows: &[RowView<'_>; SIXEL_BAND_HEIGHT],
    start: usize,
    pc: u8,
    chunk: &mut [u8],
) {
    chunk.fill(0);
    for (bit, row) in rows.iter().enumerate() {
        if let RowView::Present(row) = row {
            let src = &row[start..start + chunk.len()];
            for (dst, &px) in chunk.iter_mut().zip(src) {
                *dst |= u8::from(px == pc) << bit;
            }
        }
    }
    for dst in chunk.iter_mut() {
        *dst += SIXEL_BASE;
    }
}

#[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
fn try_pack_chunk_simd(
    rows: &[RowView<'_>; SIXEL_BAND_HEIGHT],
    start: usize,
    pc: u8,
    chunk: &mut [u8],
) -> bool {
    #[cfg(target_arch = "x86")]
    {
        if !std::is_x86_feature_detected!("sse2") {
            return false;
        }
    }

    for row in rows {
        if let RowView::Present(row) = row {
            if row.len() < start + SIMD_LANES {
                return false;
            }
        }
    }

    unsafe { pack_chunk_sse2(rows, start, pc, chunk) };
    true
}

/// # Safety
/// Every present row must hold at least `start + 16` bytes and `chunk` must
/// be 16 bytes long.
#[cfg(any(target_arch = "x86_64", target_arch = "x86"))]
#[target_feature(enable = "sse2")]
unsafe fn pack_chunk_sse2(
    rows: &[RowView<'_>; SIXEL_BAND_HEIGHT],
    start: usize,
    pc: u8,
    chunk: &mut [u8],
) {
    debug_assert_eq!(chunk.len(), SIMD_LANES);
    let target = _mm_set1_epi8(pc as i8);
    let mut acc = _mm_setzero_si128();
    for (bit, row) in rows.iter().enumerate() {
        // absent rows contribute nothing, even for register 0
        if let RowView::Present(row) = row {
            let v = _mm_loadu_si128(row.as_ptr().add(start) as *const __m128i);
            let eq = _mm_cmpeq_epi8(v, target);
            acc = _mm_or_si128(acc, _mm_and_si128(eq, _mm_set1_epi8((1u8 << bit) as i8)));
        }
    }
    let sixels = _mm_add_epi8(acc, _mm_set1_epi8(SIXEL_BASE as i8));
    _mm_storeu_si128(chunk.as_mut_ptr() as *mut __m128i, sixels);
}

/// One decoded segment: register, per-column characters and terminator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub color: usize,
    pub sixels: Vec<u8>,
    pub terminator: u8,
}

impl Segment {
    /// Per-column 6-bit masks.
    pub fn masks(&self) -> Vec<u8> {
        self.sixels.iter().map(|&c| c - SIXEL_BASE).collect()
    }
}

/// Expand the segment at the start of `data`, undoing run-length compression.
///
/// A segment never expands past `max_width` columns; longer runs are
/// rejected before anything is allocated for them.
///
/// Returns the segment and the number of bytes consumed.
pub fn expand_segment(data: &[u8], max_width: usize) -> Result<(Segment, usize)> {
    if data.first() != Some(&b'#') {
        return Err(SixelError::InvalidData("segment must start with '#'".into()));
    }
    let mut pos = 1;
    let color = parse_number(data, &mut pos)?;

    let mut sixels = Vec::new();
    while let Some(&b) = data.get(pos) {
        pos += 1;
        match b {
            b'$' | b'-' => {
                return Ok((
                    Segment {
                        color,
                        sixels,
                        terminator: b,
                    },
                    pos,
                ));
            }
            b'!' => {
                let start = pos - 1;
                let count = parse_number(data, &mut pos)?;
                if count > max_width - sixels.len() {
                    return Err(too_wide(max_width, start));
                }
                let ch = match data.get(pos) {
                    Some(&ch) if is_sixel(ch) => ch,
                    _ => {
                        return Err(SixelError::InvalidData(format!(
                            "repeat at byte {pos} has no sixel character"
                        )))
                    }
                };
                pos += 1;
                sixels.extend(std::iter::repeat_n(ch, count));
            }
            ch if is_sixel(ch) => {
                if sixels.len() == max_width {
                    return Err(too_wide(max_width, pos - 1));
                }
                sixels.push(ch);
            }
            other => {
                return Err(SixelError::InvalidData(format!(
                    "unexpected byte 0x{other:02x} at {}",
                    pos - 1
                )))
            }
        }
    }
    Err(SixelError::InvalidData("segment is not terminated".into()))
}

fn too_wide(max_width: usize, at: usize) -> SixelError {
    SixelError::InvalidData(format!(
        "segment grows past {max_width} columns at byte {at}"
    ))
}

#[inline]
fn is_sixel(b: u8) -> bool {
    (SIXEL_BASE..=SIXEL_BASE + 0x3F).contains(&b)
}

fn parse_number(data: &[u8], pos: &mut usize) -> Result<usize> {
    let start = *pos;
    let mut n: usize = 0;
    while let Some(&d) = data.get(*pos) {
        if !d.is_ascii_digit() {
            break;
        }
        n = n
            .checked_mul(10)
            .and_then(|n| n.checked_add((d - b'0') as usize))
            .ok_or_else(|| SixelError::InvalidData(format!("number at {start} overflows")))?;
        *pos += 1;
    }
    if *pos == start {
        return Err(SixelError::InvalidData(format!("expected number at {start}")));
    }
    Ok(n)
}
