//! Fixed 5x7 bitmap font for caption text.
//!
//! Captions are dates, so the glyph set covers digits and the separators
//! dates are written with. Anything else renders as a blank cell of the
//! same advance. Each glyph row is a 5-bit mask, leftmost pixel in the
//! high bit.

/// Glyph cell width in font pixels.
pub const GLYPH_WIDTH: u32 = 5;

/// Glyph cell height in font pixels.
pub const GLYPH_HEIGHT: u32 = 7;

/// Blank font pixels between adjacent glyphs.
pub const GLYPH_SPACING: u32 = 1;

/// Image pixels per font pixel. Yields 28px-tall text.
pub const SCALE: u32 = 4;

type Glyph = [u8; GLYPH_HEIGHT as usize];

const BLANK: Glyph = [0; GLYPH_HEIGHT as usize];

/// Returns the bitmap for `ch`, or `None` if the font has no glyph for it.
#[must_use]
pub const fn glyph(ch: char) -> Option<&'static Glyph> {
    Some(match ch {
        '0' => &[0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => &[0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => &[0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => &[0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => &[0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => &[0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => &[0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => &[0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => &[0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => &[0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        '-' => &[0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        '/' => &[0b00001, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b10000],
        ':' => &[0b00000, 0b01100, 0b01100, 0b00000, 0b01100, 0b01100, 0b00000],
        '.' => &[0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100],
        ' ' => &BLANK,
        _ => return None,
    })
}

/// Whether the font pixel at (`col`, `row`) of `glyph` is set.
#[must_use]
pub const fn is_set(glyph: &Glyph, col: u32, row: u32) -> bool {
    glyph[row as usize] & (1 << (GLYPH_WIDTH - 1 - col)) != 0
}

/// Horizontal distance in image pixels from one glyph's origin to the
/// next.
#[must_use]
pub const fn advance() -> u32 {
    (GLYPH_WIDTH + GLYPH_SPACING) * SCALE
}

/// Rendered size of `text` in image pixels as `(width, height)`.
///
/// Empty text measures `(0, 0)`. No trailing spacing is counted.
#[must_use]
pub fn text_size(text: &str) -> (u32, u32) {
    let count = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
    if count == 0 {
        return (0, 0);
    }
    let width = count
        .saturating_mul(advance())
        .saturating_sub(GLYPH_SPACING * SCALE);
    (width, GLYPH_HEIGHT * SCALE)
}
