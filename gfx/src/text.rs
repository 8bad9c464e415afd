//! Text rendering with the built-in 8x8 font.

use rasterkit_abi::font::{FONT_CHAR_WIDTH, get_glyph_or_fallback};

use crate::FrameBuffer;

/// Draw one character cell at `(x, y)`.
///
/// Only lit glyph bits are written, so the surface shows through the
/// background of each cell. Codepoints outside the font substitute the
/// fallback glyph.
pub fn draw_char(fb: &mut FrameBuffer<'_>, x: i32, y: i32, ch: u8, col: u32) {
    let px = fb.layout().encode(col);
    let glyph = get_glyph_or_fallback(ch);

    for (row, &bits) in glyph.iter().enumerate() {
        let py = y + row as i32;
        for cx in 0..FONT_CHAR_WIDTH {
            if bits & (1 << cx) != 0 {
                fb.put_px(x.saturating_add(cx), py, px);
            }
        }
    }
}

/// Draw a string left to right, 8 pixels per character, no spacing.
pub fn draw_text(fb: &mut FrameBuffer<'_>, x: i32, y: i32, text: &str, col: u32) {
    let mut cx = x;
    for ch in text.bytes() {
        draw_char(fb, cx, y, ch, col);
        cx = cx.saturating_add(FONT_CHAR_WIDTH);
    }
}
