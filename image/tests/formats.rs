//! End-to-end decodes of hand-assembled BMP and GIF files.

use rasterkit_abi::pixel::PixelLayout;
use rasterkit_fs::SliceStream;
use rasterkit_gfx::FrameBuffer;
use rasterkit_image::{CancelToken, Clock, DecodeError, GifOptions, NoDelay, load_bmp, load_gif};

// ---------------------------------------------------------------------------
// BMP
// ---------------------------------------------------------------------------

fn bmp_headers(width: i32, height: i32, bit_count: u16, image_bytes: u32) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&(54 + image_bytes).to_le_bytes());
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&54u32.to_le_bytes()); // bfOffBits
    out.extend_from_slice(&40u32.to_le_bytes()); // biSize
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // planes
    out.extend_from_slice(&bit_count.to_le_bytes());
    out.extend_from_slice(&[0; 24]); // compression through palette fields
    assert_eq!(out.len(), 54);
    out
}

#[test]
fn bmp_24bpp_bottom_up() {
    // 2x2: red green / blue white, stored bottom row first as B,G,R.
    let mut file = bmp_headers(2, 2, 24, 12);
    file.extend_from_slice(&[
        0xFF, 0x00, 0x00, // (0,1) blue
        0xFF, 0xFF, 0xFF, // (1,1) white
        0x00, 0x00, 0xFF, // (0,0) red
        0x00, 0xFF, 0x00, // (1,0) green
    ]);

    let mut buf = [0u8; 8];
    let mut fb = FrameBuffer::new(&mut buf, 2, 2, PixelLayout::Rgb565).unwrap();
    load_bmp(&mut fb, &mut SliceStream::new(&file), 0, 0).unwrap();
    assert_eq!(fb.pixel(0, 0), Some(0xF800));
    assert_eq!(fb.pixel(1, 0), Some(0x07E0));
    assert_eq!(fb.pixel(0, 1), Some(0x001F));
    assert_eq!(fb.pixel(1, 1), Some(0xFFFF));
}

#[test]
fn bmp_32bpp_discards_alpha() {
    let mut file = bmp_headers(1, 1, 32, 4);
    file.extend_from_slice(&[0x40, 0x80, 0xC0, 0xFF]); // B G R A
    let mut buf = [0u8; 2];
    let mut fb = FrameBuffer::new(&mut buf, 1, 1, PixelLayout::Rgb565).unwrap();
    load_bmp(&mut fb, &mut SliceStream::new(&file), 0, 0).unwrap();
    assert_eq!(fb.pixel(0, 0), Some(PixelLayout::Rgb565.encode(0xC08040)));
}

#[test]
fn bmp_offset_paint_clips() {
    let mut file = bmp_headers(2, 2, 24, 12);
    file.extend_from_slice(&[0x11; 12]);
    let mut buf = [0u8; 9];
    let mut fb = FrameBuffer::new(&mut buf, 3, 3, PixelLayout::Gray8).unwrap();
    load_bmp(&mut fb, &mut SliceStream::new(&file), 2, 2).unwrap();
    // Only the top-left source pixel lands inside the 3x3 target.
    assert_eq!(fb.pixel(2, 2), Some(0x11));
    assert_eq!(fb.data().iter().filter(|&&v| v != 0).count(), 1);
}

#[test]
fn bmp_rejects_unsupported_depth_without_painting() {
    let mut file = bmp_headers(2, 2, 8, 4);
    file.extend_from_slice(&[1, 2, 3, 4]);
    let mut buf = [0u8; 4];
    let mut fb = FrameBuffer::new(&mut buf, 2, 2, PixelLayout::Gray8).unwrap();
    assert_eq!(
        load_bmp(&mut fb, &mut SliceStream::new(&file), 0, 0),
        Err(DecodeError::Unsupported)
    );
    assert_eq!(fb.data(), &[0; 4]);
}

#[test]
fn bmp_rejects_bad_magic() {
    let mut file = bmp_headers(1, 1, 24, 3);
    file[0] = b'X';
    file.extend_from_slice(&[0; 3]);
    let mut buf = [0u8; 1];
    let mut fb = FrameBuffer::new(&mut buf, 1, 1, PixelLayout::Gray8).unwrap();
    assert_eq!(
        load_bmp(&mut fb, &mut SliceStream::new(&file), 0, 0),
        Err(DecodeError::BadSignature)
    );
}

#[test]
fn bmp_truncated_pixels_keep_painted_rows() {
    let mut file = bmp_headers(2, 2, 24, 12);
    file.extend_from_slice(&[0x22; 6]); // only the bottom row
    let mut buf = [0u8; 4];
    let mut fb = FrameBuffer::new(&mut buf, 2, 2, PixelLayout::Gray8).unwrap();
    let err = load_bmp(&mut fb, &mut SliceStream::new(&file), 0, 0).unwrap_err();
    assert!(matches!(err, DecodeError::Truncated | DecodeError::Stream(_)));
    assert_eq!(fb.pixel(0, 1), Some(0x22));
    assert_eq!(fb.pixel(0, 0), Some(0));
}

// ---------------------------------------------------------------------------
// GIF
// ---------------------------------------------------------------------------

/// GIF89a header + 2-color global table (black, white) for a WxH screen.
fn gif_prelude(w: u16, h: u16) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"GIF89a");
    out.extend_from_slice(&w.to_le_bytes());
    out.extend_from_slice(&h.to_le_bytes());
    out.extend_from_slice(&[0x80, 0x00, 0x00]); // GCT present, bg 0, no aspect
    out.extend_from_slice(&[0x00, 0x00, 0x00]); // index 0: black
    out.extend_from_slice(&[0xFF, 0xFF, 0xFF]); // index 1: white
    out
}

fn image_descriptor(x: u16, y: u16, w: u16, h: u16, flags: u8) -> Vec<u8> {
    let mut out = vec![0x2C];
    out.extend_from_slice(&x.to_le_bytes());
    out.extend_from_slice(&y.to_le_bytes());
    out.extend_from_slice(&w.to_le_bytes());
    out.extend_from_slice(&h.to_le_bytes());
    out.push(flags);
    out
}

/// The 2x2 checkerboard 0,1/1,0: min code size 2, codes 4 0 1 1 0 5.
const CHECKER_DATA: &[u8] = &[0x02, 0x03, 0x44, 0x02, 0x05, 0x00];

fn checkerboard_gif() -> Vec<u8> {
    let mut file = gif_prelude(2, 2);
    file.extend_from_slice(&image_descriptor(0, 0, 2, 2, 0x00));
    file.extend_from_slice(CHECKER_DATA);
    file.push(0x3B);
    file
}

fn run_gif(fb: &mut FrameBuffer<'_>, file: &[u8], x: i32, y: i32) -> Result<(), DecodeError> {
    let cancel = CancelToken::new();
    let mut clock = NoDelay;
    let mut opts = GifOptions {
        clock: &mut clock,
        cancel: &cancel,
        on_frame: None,
    };
    load_gif(fb, &mut SliceStream::new(file), x, y, &mut opts)
}

#[test]
fn gif_checkerboard_into_palette_target() {
    // Palette-indexed targets receive the raw indices.
    let mut buf = [9u8; 4];
    let mut fb = FrameBuffer::new(&mut buf, 2, 2, PixelLayout::Gray8).unwrap();
    run_gif(&mut fb, &checkerboard_gif(), 0, 0).unwrap();
    assert_eq!(fb.data(), &[0, 1, 1, 0]);
}

#[test]
fn gif_checkerboard_into_rgb565_target() {
    let mut buf = [0u8; 8];
    let mut fb = FrameBuffer::new(&mut buf, 2, 2, PixelLayout::Rgb565).unwrap();
    run_gif(&mut fb, &checkerboard_gif(), 0, 0).unwrap();
    assert_eq!(fb.pixel(0, 0), Some(0x0000));
    assert_eq!(fb.pixel(1, 0), Some(0xFFFF));
    assert_eq!(fb.pixel(0, 1), Some(0xFFFF));
    assert_eq!(fb.pixel(1, 1), Some(0x0000));
}

#[test]
fn gif_draw_offset_applies() {
    let mut buf = [7u8; 16];
    let mut fb = FrameBuffer::new(&mut buf, 4, 4, PixelLayout::Gray8).unwrap();
    run_gif(&mut fb, &checkerboard_gif(), 1, 1).unwrap();
    assert_eq!(fb.pixel(1, 1), Some(0));
    assert_eq!(fb.pixel(2, 1), Some(1));
    assert_eq!(fb.pixel(0, 0), Some(7));
    assert_eq!(fb.pixel(3, 3), Some(7));
}

#[test]
fn gif_extensions_are_skipped() {
    let mut file = gif_prelude(2, 2);
    // Comment, application (NETSCAPE 2.0) and plain text blocks in front.
    file.extend_from_slice(&[0x21, 0xFE, 0x03, b'h', b'i', b'!', 0x00]);
    file.extend_from_slice(&[0x21, 0xFF, 0x0B]);
    file.extend_from_slice(b"NETSCAPE2.0");
    file.extend_from_slice(&[0x03, 0x01, 0x00, 0x00, 0x00]);
    file.extend_from_slice(&[0x21, 0x01, 0x02, 0xAA, 0xBB, 0x00]);
    file.extend_from_slice(&image_descriptor(0, 0, 2, 2, 0x00));
    file.extend_from_slice(CHECKER_DATA);
    file.push(0x3B);

    let mut buf = [0u8; 4];
    let mut fb = FrameBuffer::new(&mut buf, 2, 2, PixelLayout::Gray8).unwrap();
    run_gif(&mut fb, &file, 0, 0).unwrap();
    assert_eq!(fb.data(), &[0, 1, 1, 0]);
}

#[test]
fn gif_transparency_skips_pixels() {
    let mut file = gif_prelude(2, 2);
    // Graphic control: transparent index 1, disposal 0.
    file.extend_from_slice(&[0x21, 0xF9, 0x04, 0x01, 0x00, 0x00, 0x01, 0x00]);
    file.extend_from_slice(&image_descriptor(0, 0, 2, 2, 0x00));
    file.extend_from_slice(CHECKER_DATA);
    file.push(0x3B);

    let mut buf = [9u8; 4];
    let mut fb = FrameBuffer::new(&mut buf, 2, 2, PixelLayout::Gray8).unwrap();
    run_gif(&mut fb, &file, 0, 0).unwrap();
    // Index-1 pixels are transparent: the backdrop shows through.
    assert_eq!(fb.data(), &[0, 9, 9, 0]);
}

#[test]
fn gif_interlaced_rows_land_in_storage_order() {
    // 2x4 image, stored rows [0,1] [1,0] [1,1] [0,0]; interlace passes for
    // height 4 deliver them to y = 0, 2, 1, 3.
    let mut file = gif_prelude(2, 4);
    file.extend_from_slice(&image_descriptor(0, 0, 2, 4, 0x40));
    file.extend_from_slice(&[0x02, 0x04, 0x44, 0x62, 0x08, 0x05, 0x00]);
    file.push(0x3B);

    let mut buf = [0u8; 8];
    let mut fb = FrameBuffer::new(&mut buf, 2, 4, PixelLayout::Gray8).unwrap();
    run_gif(&mut fb, &file, 0, 0).unwrap();
    assert_eq!(fb.data(), &[0, 1, 1, 1, 1, 0, 0, 0]);
}

#[test]
fn gif_disposal_two_restores_background_between_frames() {
    let mut file = gif_prelude(2, 2);
    // Frame 1: full 2x2, all white, disposal 2.
    file.extend_from_slice(&[0x21, 0xF9, 0x04, 0x08, 0x00, 0x00, 0x00, 0x00]);
    file.extend_from_slice(&image_descriptor(0, 0, 2, 2, 0x00));
    file.extend_from_slice(&[0x02, 0x02, 0x8C, 0x53, 0x00]);
    // Frame 2: 1x1 at the origin, index 1.
    file.extend_from_slice(&[0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00]);
    file.extend_from_slice(&image_descriptor(0, 0, 1, 1, 0x00));
    file.extend_from_slice(&[0x02, 0x02, 0x4C, 0x01, 0x00]);
    file.push(0x3B);

    let mut buf = [0u8; 4];
    let mut fb = FrameBuffer::new(&mut buf, 2, 2, PixelLayout::Gray8).unwrap();
    run_gif(&mut fb, &file, 0, 0).unwrap();
    // The parts of frame 1 outside frame 2 were cleared to background 0.
    assert_eq!(fb.data(), &[1, 0, 0, 0]);
}

#[test]
fn gif_callback_runs_once_per_frame() {
    let file = {
        let mut f = gif_prelude(2, 2);
        f.extend_from_slice(&[0x21, 0xF9, 0x04, 0x08, 0x00, 0x00, 0x00, 0x00]);
        f.extend_from_slice(&image_descriptor(0, 0, 2, 2, 0x00));
        f.extend_from_slice(&[0x02, 0x02, 0x8C, 0x53, 0x00]);
        f.extend_from_slice(&image_descriptor(0, 0, 2, 2, 0x00));
        f.extend_from_slice(CHECKER_DATA);
        f.push(0x3B);
        f
    };

    let mut frames = 0u32;
    let cancel = CancelToken::new();
    let mut clock = NoDelay;
    let mut on_frame = || frames += 1;
    let mut opts = GifOptions {
        clock: &mut clock,
        cancel: &cancel,
        on_frame: Some(&mut on_frame),
    };
    let mut buf = [0u8; 4];
    let mut fb = FrameBuffer::new(&mut buf, 2, 2, PixelLayout::Gray8).unwrap();
    load_gif(&mut fb, &mut SliceStream::new(&file), 0, 0, &mut opts).unwrap();
    assert_eq!(frames, 2);
}

struct CountingClock {
    calls: u32,
    total_ms: u32,
}

impl Clock for CountingClock {
    fn sleep_ms(&mut self, ms: u32) {
        self.calls += 1;
        self.total_ms += ms;
    }
}

#[test]
fn gif_zero_delay_paces_at_hundred_ms() {
    let mut clock = CountingClock {
        calls: 0,
        total_ms: 0,
    };
    let cancel = CancelToken::new();
    let mut opts = GifOptions {
        clock: &mut clock,
        cancel: &cancel,
        on_frame: None,
    };
    let mut buf = [0u8; 4];
    let mut fb = FrameBuffer::new(&mut buf, 2, 2, PixelLayout::Gray8).unwrap();
    load_gif(
        &mut fb,
        &mut SliceStream::new(&checkerboard_gif()),
        0,
        0,
        &mut opts,
    )
    .unwrap();
    assert_eq!(clock.calls, 10);
    assert_eq!(clock.total_ms, 100);
}

#[test]
fn gif_cancellation_stops_after_current_frame() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let mut clock = CountingClock {
        calls: 0,
        total_ms: 0,
    };
    let mut opts = GifOptions {
        clock: &mut clock,
        cancel: &cancel,
        on_frame: None,
    };
    let mut buf = [9u8; 4];
    let mut fb = FrameBuffer::new(&mut buf, 2, 2, PixelLayout::Gray8).unwrap();
    let err = load_gif(
        &mut fb,
        &mut SliceStream::new(&checkerboard_gif()),
        0,
        0,
        &mut opts,
    )
    .unwrap_err();
    assert_eq!(err, DecodeError::Cancelled);
    // The frame that was already composited stays.
    assert_eq!(fb.data(), &[0, 1, 1, 0]);
    // No sleep happened after the token fired.
    assert_eq!(clock.calls, 0);
}

#[test]
fn gif_bad_signature() {
    let mut file = checkerboard_gif();
    file[4] = b'0';
    let mut buf = [0u8; 4];
    let mut fb = FrameBuffer::new(&mut buf, 2, 2, PixelLayout::Gray8).unwrap();
    assert_eq!(
        run_gif(&mut fb, &file, 0, 0),
        Err(DecodeError::BadSignature)
    );
}

#[test]
fn gif_unknown_block_is_corrupt() {
    let mut file = gif_prelude(2, 2);
    file.push(0x99);
    let mut buf = [0u8; 4];
    let mut fb = FrameBuffer::new(&mut buf, 2, 2, PixelLayout::Gray8).unwrap();
    assert_eq!(run_gif(&mut fb, &file, 0, 0), Err(DecodeError::Corrupt));
}

#[test]
fn gif_truncated_header_is_a_stream_error() {
    let file = b"GIF89a\x02\x00";
    let mut buf = [0u8; 4];
    let mut fb = FrameBuffer::new(&mut buf, 2, 2, PixelLayout::Gray8).unwrap();
    assert!(matches!(
        run_gif(&mut fb, file, 0, 0),
        Err(DecodeError::Stream(_))
    ));
}

#[test]
fn gif_out_of_range_index_is_corrupt() {
    // Minimum code size 3 claims 8 colors but the table only has 2:
    // emitting index 7 must fail. Codes: clear(8), 7, end(9), 4-bit wide.
    let mut file = gif_prelude(2, 2);
    file.extend_from_slice(&image_descriptor(0, 0, 2, 2, 0x00));
    // 8 = 0b1000, 7 = 0b0111, 9 = 0b1001 packed LSB-first.
    file.extend_from_slice(&[0x03, 0x02, 0x78, 0x09, 0x00]);
    file.push(0x3B);
    let mut buf = [0u8; 4];
    let mut fb = FrameBuffer::new(&mut buf, 2, 2, PixelLayout::Gray8).unwrap();
    assert_eq!(run_gif(&mut fb, &file, 0, 0), Err(DecodeError::Corrupt));
}
