//! Per-frame composition: row ordering, run emission, disposal clears.

use alloc::boxed::Box;

use rasterkit_abi::pixel::PixelLayout;
use rasterkit_fs::ByteStream;
use rasterkit_gfx::FrameBuffer;

use super::GifDecoder;
use super::lzw::LzwDecoder;
use crate::DecodeError;

/// GIF's four interlace passes: start rows 0/4/2/1, steps 8/8/4/2.
const INTERLACE_START: [i32; 4] = [0, 4, 2, 1];
const INTERLACE_STEP: [i32; 4] = [8, 8, 4, 2];

/// Yields destination rows in storage order: linear, or the four interlace
/// passes.
pub(super) struct RowWalk {
    height: i32,
    interlaced: bool,
    pass: usize,
    y: i32,
}

impl RowWalk {
    pub(super) fn new(height: i32, interlaced: bool) -> Self {
        Self {
            height,
            interlaced,
            pass: 0,
            y: 0,
        }
    }
}

impl Iterator for RowWalk {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        if !self.interlaced {
            if self.y >= self.height {
                return None;
            }
            let row = self.y;
            self.y += 1;
            return Some(row);
        }
        while self.pass < 4 {
            if self.y < self.height {
                let row = self.y;
                self.y += INTERLACE_STEP[self.pass];
                return Some(row);
            }
            self.pass += 1;
            if self.pass < 4 {
                self.y = INTERLACE_START[self.pass];
            }
        }
        None
    }
}

/// Decode one frame's pixel data and paint it at `(x0, y0)`.
///
/// Equal consecutive indices on a scanline collapse into a single
/// `fill_rect` run. Transparent runs are skipped, except under disposal 2
/// where they restore the background. Palette-indexed (`Gray8`) targets
/// receive raw indices; everything else gets the palette color.
pub(super) fn draw_frame<R: ByteStream>(
    fb: &mut FrameBuffer<'_>,
    r: &mut R,
    gif: &GifDecoder,
    x0: i32,
    y0: i32,
    w: i32,
    h: i32,
    interlaced: bool,
) -> Result<(), DecodeError> {
    let min_code_size = r.read_u8()?;
    // ~16 KiB of dictionary state; kept off the stack.
    let mut lzw = Box::new(LzwDecoder::new(min_code_size)?);
    let ncolors = gif.table_size;

    for row in RowWalk::new(h, interlaced) {
        let yp = y0 + row;
        let mut run_idx = 0usize;
        let mut run_start = x0;
        let mut run_len = 0i32;

        for x in x0..x0 + w {
            let idx = lzw.next_index(r)? as usize;
            if idx >= ncolors {
                return Err(DecodeError::Corrupt);
            }
            if run_len > 0 && idx == run_idx {
                run_len += 1;
            } else {
                emit_run(fb, gif, run_start, yp, run_len, run_idx);
                run_idx = idx;
                run_start = x;
                run_len = 1;
            }
        }
        emit_run(fb, gif, run_start, yp, run_len, run_idx);
    }
    Ok(())
}

fn emit_run(fb: &mut FrameBuffer<'_>, gif: &GifDecoder, x: i32, y: i32, len: i32, idx: usize) {
    if len <= 0 {
        return;
    }
    let col = if Some(idx as u8) != gif.transparent {
        gif.color_for(fb.layout(), idx)
    } else if gif.disposal == 2 {
        gif.background_color(fb.layout())
    } else {
        return;
    };
    fb.fill_rect(x, y, len, 1, col);
}

/// Disposal-2 transition: clear the parts of the previous frame's
/// rectangle not covered by the new one, as up to four strips of
/// background color.
pub(super) fn clear_exposed(
    fb: &mut FrameBuffer<'_>,
    prev: (i32, i32, i32, i32),
    new: (i32, i32, i32, i32),
    bg: u32,
) {
    let (px, py, pw, ph) = prev;
    let (nx, ny, nw, nh) = new;

    let top = (ny - py).clamp(0, ph);
    if top > 0 {
        fb.fill_rect(px, py, pw, top, bg);
    }
    let bottom = ((py + ph) - (ny + nh)).clamp(0, ph);
    if bottom > 0 {
        fb.fill_rect(px, py + ph - bottom, pw, bottom, bg);
    }

    let mid_y0 = py.max(ny);
    let mid_y1 = (py + ph).min(ny + nh);
    if mid_y1 > mid_y0 {
        let left = (nx - px).clamp(0, pw);
        if left > 0 {
            fb.fill_rect(px, mid_y0, left, mid_y1 - mid_y0, bg);
        }
        let right = ((px + pw) - (nx + nw)).clamp(0, pw);
        if right > 0 {
            fb.fill_rect(px + pw - right, mid_y0, right, mid_y1 - mid_y0, bg);
        }
    }
}

impl GifDecoder {
    /// Raw index for palette-indexed targets, palette color otherwise.
    pub(super) fn color_for(&self, layout: PixelLayout, idx: usize) -> u32 {
        if layout == PixelLayout::Gray8 {
            idx as u32
        } else {
            self.palette[idx]
        }
    }

    pub(super) fn background_color(&self, layout: PixelLayout) -> u32 {
        self.color_for(layout, self.bg_index as usize)
    }
}
