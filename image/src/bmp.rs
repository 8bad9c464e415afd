//! Streamed BMP decoding: uncompressed 24 and 32 bpp only.

use log::warn;
use rasterkit_fs::ByteStream;
use rasterkit_gfx::FrameBuffer;

use crate::DecodeError;

/// Bytes of header needed up front: the 14-byte file header plus the DIB
/// fields through `biBitCount`.
const HEADER_LEN: usize = 30;
const WINDOW: usize = 4096;

/// Decode a BMP from `reader` and paint it with its top-left corner at
/// `(x0, y0)`.
///
/// The pixel array streams through a fixed window, bottom row first, one
/// B/G/R byte at a time (the alpha byte of 32-bpp files is discarded).
/// Rows are taken as exactly `width * bytes_per_pixel` bytes; the 4-byte
/// row padding some writers emit is not honoured, so images whose rows are
/// not already aligned will skew. Anything outside the supported subset is
/// reported without touching the framebuffer.
pub fn load_bmp<R: ByteStream>(
    fb: &mut FrameBuffer<'_>,
    reader: &mut R,
    x0: i32,
    y0: i32,
) -> Result<(), DecodeError> {
    let mut head = [0u8; HEADER_LEN];
    reader.read_exact(&mut head)?;
    if &head[0..2] != b"BM" {
        warn!("bmp: missing BM signature");
        return Err(DecodeError::BadSignature);
    }

    let off_bits = u32::from_le_bytes([head[10], head[11], head[12], head[13]]);
    let width = i32::from_le_bytes([head[18], head[19], head[20], head[21]]);
    let height = i32::from_le_bytes([head[22], head[23], head[24], head[25]]);
    let bit_count = u16::from_le_bytes([head[28], head[29]]);

    if bit_count != 24 && bit_count != 32 {
        warn!("bmp: unsupported bit depth {bit_count}");
        return Err(DecodeError::Unsupported);
    }
    if width <= 0 || height <= 0 {
        warn!("bmp: unsupported dimensions {width}x{height}");
        return Err(DecodeError::Unsupported);
    }

    let bytes_px = (bit_count / 8) as usize;
    let row_bytes = width as usize * bytes_px;
    if row_bytes % 4 != 0 {
        warn!("bmp: row length {row_bytes} not 4-byte aligned; rows will not be padded");
    }

    reader.seek(off_bits as u64)?;

    let mut window = [0u8; WINDOW];
    let mut pix = [0u8; 4];
    let mut channel = 0usize;
    let mut in_row = 0usize;
    let mut x: i32 = 0;
    let mut y: i32 = height - 1;

    loop {
        let n = reader.read(&mut window)?;
        if n == 0 {
            return Err(DecodeError::Truncated);
        }
        for &byte in &window[..n] {
            pix[channel] = byte;
            channel += 1;
            if channel == bytes_px {
                channel = 0;
                let col =
                    ((pix[2] as u32) << 16) | ((pix[1] as u32) << 8) | pix[0] as u32;
                if x < width {
                    fb.set_pixel(x0 + x, y0 + y, col);
                }
                x += 1;
            }
            in_row += 1;
            if in_row == row_bytes {
                in_row = 0;
                x = 0;
                y -= 1;
                if y < 0 {
                    return Ok(());
                }
            }
        }
    }
}
