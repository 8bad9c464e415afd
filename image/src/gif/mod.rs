//! Animated GIF playback into a framebuffer.
//!
//! [`load_gif`] drives the whole pipeline: signature and logical-screen
//! parsing, color table management, the block loop over extensions and
//! image descriptors, LZW decompression, per-frame composition, disposal
//! handling, and the cancellable inter-frame delay.

mod lzw;
mod render;

use alloc::boxed::Box;

use bitflags::bitflags;
use log::{debug, warn};
use rasterkit_abi::rgb;
use rasterkit_fs::ByteStream;
use rasterkit_gfx::FrameBuffer;

use crate::context::GifOptions;
use crate::error::DecodeError;

const BLOCK_IMAGE: u8 = 0x2C;
const BLOCK_EXTENSION: u8 = 0x21;
const BLOCK_TRAILER: u8 = 0x3B;

const EXT_PLAIN: u8 = 0x01;
const EXT_GRAPHICS: u8 = 0xF9;
const EXT_COMMENT: u8 = 0xFE;
const EXT_APPLICATION: u8 = 0xFF;

/// Delay tick the player sleeps in; cancellation is observed at every
/// tick boundary.
const TICK_MS: u32 = 10;
/// Minimum inter-frame delay in ticks (a zero-delay GIF plays at 100 ms).
const MIN_DELAY_TICKS: u16 = 10;

bitflags! {
    /// Logical screen descriptor flag byte. The low three bits carry the
    /// global table size exponent and are masked off separately.
    struct ScreenFlags: u8 {
        const GLOBAL_TABLE = 0x80;
        const SORTED = 0x08;
    }
}

bitflags! {
    /// Image descriptor flag byte; low three bits are the local table size
    /// exponent.
    struct FrameFlags: u8 {
        const LOCAL_TABLE = 0x80;
        const INTERLACED = 0x40;
        const SORTED = 0x20;
    }
}

const TABLE_SIZE_MASK: u8 = 0x07;

/// Decode state scoped to a single [`load_gif`] call.
pub(crate) struct GifDecoder {
    screen_w: u16,
    screen_h: u16,
    bg_index: u8,

    /// Active color table, global unless a frame overlaid a local one.
    palette: [u32; 256],
    table_size: usize,
    /// Snapshot of the global table while a local one is active.
    backup: [u32; 256],
    backup_size: usize,
    local_active: bool,

    /// Current graphics-control state.
    delay_cs: u16,
    disposal: u8,
    transparent: Option<u8>,

    /// Previous frame's rectangle and disposal, for the transition clear.
    prev_rect: Option<(i32, i32, i32, i32)>,
    prev_disposal: u8,
}

impl GifDecoder {
    fn new() -> Self {
        Self {
            screen_w: 0,
            screen_h: 0,
            bg_index: 0,
            palette: [0; 256],
            table_size: 0,
            backup: [0; 256],
            backup_size: 0,
            local_active: false,
            delay_cs: 0,
            disposal: 0,
            transparent: None,
            prev_rect: None,
            prev_disposal: 0,
        }
    }

    fn check_head<R: ByteStream>(&mut self, r: &mut R) -> Result<(), DecodeError> {
        let mut head = [0u8; 6];
        r.read_exact(&mut head)?;
        if &head[0..4] != b"GIF8" || (head[4] != b'7' && head[4] != b'9') || head[5] != b'a' {
            warn!("gif: bad signature");
            return Err(DecodeError::BadSignature);
        }
        Ok(())
    }

    fn read_screen<R: ByteStream>(&mut self, r: &mut R) -> Result<(), DecodeError> {
        let mut lsd = [0u8; 7];
        r.read_exact(&mut lsd)?;
        self.screen_w = u16::from_le_bytes([lsd[0], lsd[1]]);
        self.screen_h = u16::from_le_bytes([lsd[2], lsd[3]]);
        let flags = ScreenFlags::from_bits_retain(lsd[4]);
        self.bg_index = lsd[5];

        if flags.contains(ScreenFlags::GLOBAL_TABLE) {
            let count = 2usize << (lsd[4] & TABLE_SIZE_MASK);
            self.read_color_table(r, count)?;
        }
        debug!(
            "gif: screen {}x{} colors {}",
            self.screen_w, self.screen_h, self.table_size
        );
        Ok(())
    }

    fn read_color_table<R: ByteStream>(
        &mut self,
        r: &mut R,
        count: usize,
    ) -> Result<(), DecodeError> {
        let mut entry = [0u8; 3];
        for i in 0..count {
            r.read_exact(&mut entry)?;
            self.palette[i] = rgb(entry[0], entry[1], entry[2]);
        }
        self.table_size = count;
        Ok(())
    }

    fn restore_global_table(&mut self) {
        self.palette = self.backup;
        self.table_size = self.backup_size;
        self.local_active = false;
    }

    /// Handle blocks until a frame has been rendered or the trailer ends
    /// the stream. `true` means a frame was produced.
    fn next_frame<R: ByteStream>(
        &mut self,
        fb: &mut FrameBuffer<'_>,
        r: &mut R,
        ox: i32,
        oy: i32,
    ) -> Result<bool, DecodeError> {
        loop {
            match r.read_u8()? {
                BLOCK_IMAGE => {
                    self.read_frame(fb, r, ox, oy)?;
                    return Ok(true);
                }
                BLOCK_EXTENSION => self.read_extension(r)?,
                BLOCK_TRAILER => return Ok(false),
                other => {
                    warn!("gif: unknown block 0x{other:02x}");
                    return Err(DecodeError::Corrupt);
                }
            }
        }
    }

    fn read_extension<R: ByteStream>(&mut self, r: &mut R) -> Result<(), DecodeError> {
        match r.read_u8()? {
            EXT_GRAPHICS => {
                let len = r.read_u8()? as usize;
                let mut block = [0u8; 4];
                if len != block.len() {
                    return Err(DecodeError::Corrupt);
                }
                r.read_exact(&mut block)?;
                self.disposal = (block[0] >> 2) & 0x7;
                self.delay_cs = u16::from_le_bytes([block[1], block[2]]);
                self.transparent = if block[0] & 0x01 != 0 {
                    Some(block[3])
                } else {
                    None
                };
                lzw::drain_sub_blocks(r)
            }
            EXT_PLAIN | EXT_COMMENT | EXT_APPLICATION => lzw::drain_sub_blocks(r),
            other => {
                debug!("gif: skipping unknown extension 0x{other:02x}");
                lzw::drain_sub_blocks(r)
            }
        }
    }

    fn read_frame<R: ByteStream>(
        &mut self,
        fb: &mut FrameBuffer<'_>,
        r: &mut R,
        ox: i32,
        oy: i32,
    ) -> Result<(), DecodeError> {
        let mut desc = [0u8; 9];
        r.read_exact(&mut desc)?;
        let fx = u16::from_le_bytes([desc[0], desc[1]]) as i32;
        let fy = u16::from_le_bytes([desc[2], desc[3]]) as i32;
        let fw = u16::from_le_bytes([desc[4], desc[5]]) as i32;
        let fh = u16::from_le_bytes([desc[6], desc[7]]) as i32;
        let flags = FrameFlags::from_bits_retain(desc[8]);

        if flags.contains(FrameFlags::LOCAL_TABLE) {
            self.backup = self.palette;
            self.backup_size = self.table_size;
            let count = 2usize << (desc[8] & TABLE_SIZE_MASK);
            self.read_color_table(r, count)?;
            self.local_active = true;
        }

        let rect = (ox + fx, oy + fy, fw, fh);
        if self.prev_disposal == 2 {
            if let Some(prev) = self.prev_rect {
                let bg = self.background_color(fb.layout());
                render::clear_exposed(fb, prev, rect, bg);
            }
        }

        debug!(
            "gif: frame {}x{} at {},{} disposal {} transparent {:?}",
            fw, fh, rect.0, rect.1, self.disposal, self.transparent
        );
        render::draw_frame(
            fb,
            r,
            self,
            rect.0,
            rect.1,
            fw,
            fh,
            flags.contains(FrameFlags::INTERLACED),
        )?;
        lzw::drain_sub_blocks(r)?;

        self.prev_rect = Some(rect);
        self.prev_disposal = self.disposal;
        Ok(())
    }
}

/// Play a GIF from `reader`, compositing frames at `(x, y)`.
///
/// After each frame the per-frame callback (if any) runs, then the player
/// sleeps the frame delay in 10 ms ticks, checking the cancellation token
/// between ticks. Returns when the trailer block ends the stream, with
/// [`DecodeError::Cancelled`] when the token fired, or with whatever error
/// aborted the decode; rows already painted stay on the framebuffer.
pub fn load_gif<R: ByteStream>(
    fb: &mut FrameBuffer<'_>,
    reader: &mut R,
    x: i32,
    y: i32,
    opts: &mut GifOptions<'_>,
) -> Result<(), DecodeError> {
    let mut gif = Box::new(GifDecoder::new());
    gif.check_head(reader)?;
    gif.read_screen(reader)?;

    while gif.next_frame(fb, reader, x, y)? {
        if gif.local_active {
            gif.restore_global_table();
        }
        if let Some(cb) = opts.on_frame.as_mut() {
            cb();
        }
        let ticks = gif.delay_cs.max(MIN_DELAY_TICKS);
        for _ in 0..ticks {
            if opts.cancel.is_cancelled() {
                return Err(DecodeError::Cancelled);
            }
            opts.clock.sleep_ms(TICK_MS);
        }
    }
    Ok(())
}
